mod agent;
mod candidate;
mod prober;

#[cfg(test)]
mod tests;

pub use agent::*;
pub use candidate::*;
pub use prober::*;

use serde::Serializer;
use std::time::Duration;

pub(crate) fn serialize_ms<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_nanos() as f64 / 1_000_000.0)
}
