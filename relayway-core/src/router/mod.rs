mod dispatcher;
mod error;
mod job;
mod queue;
#[allow(clippy::module_inception)]
mod router;
mod selection;
mod status;

#[cfg(test)]
mod tests;

pub use error::*;
pub use job::EndpointTarget;
pub(crate) use job::join_url;
pub use router::*;
pub use status::*;
