mod endpoint;
#[allow(clippy::module_inception)]
mod registry;


pub use endpoint::*;
pub use registry::*;
