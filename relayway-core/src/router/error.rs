use std::time::Duration;

/// The only errors a caller of the router ever sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error(
        "all endpoints exhausted after {} attempt(s) [{}]: {last_error}",
        .attempted_endpoints.len(),
        .attempted_endpoints.join(", ")
    )]
    Exhausted {
        attempted_endpoints: Vec<String>,
        last_error: String,
    },

    #[error("request not completed within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("router is shut down")]
    Shutdown,
}

impl RouterError {
    pub fn attempted_endpoints(&self) -> &[String] {
        match self {
            RouterError::Exhausted {
                attempted_endpoints,
                ..
            } => attempted_endpoints,
            _ => &[],
        }
    }
}
