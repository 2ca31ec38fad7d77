use crate::registry::EndpointId;
use crate::router::RouterError;
use crate::upstream::UpstreamError;
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::oneshot;

/// What an operation receives for each attempt: enough to build a request.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointTarget {
    pub id: EndpointId,
    pub url: String,
}

impl EndpointTarget {
    /// Join `path` onto the endpoint's base URL with exactly one slash.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.url, path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }

    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Type-erased queued work. Resolves its caller at most once.
#[async_trait]
pub(crate) trait Dispatch: Send {
    /// The caller stopped waiting (timeout or dropped future).
    fn is_abandoned(&self) -> bool;

    /// Run the operation against one endpoint. On success the caller is resolved.
    async fn attempt(&mut self, target: EndpointTarget) -> Result<(), UpstreamError>;

    fn reject(self: Box<Self>, err: RouterError);
}

pub(crate) struct Job<T, F> {
    op: F,
    reply: Option<oneshot::Sender<Result<T, RouterError>>>,
}

impl<T, F> Job<T, F> {
    pub(crate) fn new(op: F, reply: oneshot::Sender<Result<T, RouterError>>) -> Self {
        Self {
            op,
            reply: Some(reply),
        }
    }
}

#[async_trait]
impl<T, F, Fut> Dispatch for Job<T, F>
where
    T: Send + 'static,
    F: Fn(EndpointTarget) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
{
    fn is_abandoned(&self) -> bool {
        self.reply.as_ref().is_none_or(|tx| tx.is_closed())
    }

    async fn attempt(&mut self, target: EndpointTarget) -> Result<(), UpstreamError> {
        let value = (self.op)(target).await?;

        if let Some(tx) = self.reply.take() {
            let _ = tx.send(Ok(value));
        }

        Ok(())
    }

    fn reject(mut self: Box<Self>, err: RouterError) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(Err(err));
        }
    }
}
