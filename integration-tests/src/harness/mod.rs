pub mod client;
pub mod tracing;
pub mod upstream;

pub use client::get_body;
pub use tracing::{CapturedEvent, init_test_tracing};
pub use upstream::{Reply, TestUpstream, dead_url};
