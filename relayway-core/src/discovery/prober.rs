use crate::router::join_url;
use crate::upstream::{UpstreamError, check_response};
use async_trait::async_trait;
use http::header::SERVER;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid candidate url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("probe timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Cheap capability hints gathered from a probe response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeFeatures {
    pub json_body: bool,
    pub server: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub status: u16,
    #[serde(serialize_with = "crate::discovery::serialize_ms")]
    pub latency: Duration,
    pub features: ProbeFeatures,
}

/// Checks whether a candidate URL is alive. Only 2xx answers count as alive.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, base_url: &str) -> Result<ProbeReport, ProbeError>;
}

/// `GET <base_url><probe_path>` with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    probe_path: String,
}

impl HttpProber {
    pub fn new(probe_path: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            probe_path: probe_path.into(),
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, base_url: &str) -> Result<ProbeReport, ProbeError> {
        let url = join_url(base_url, &self.probe_path);
        let started = Instant::now();

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = resp.status().as_u16();
        let server = resp
            .headers()
            .get(SERVER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let resp = check_response(resp)?;
        let body = resp.bytes().await.map_err(UpstreamError::from)?;
        let latency = started.elapsed();

        Ok(ProbeReport {
            status,
            latency,
            features: ProbeFeatures {
                json_body: serde_json::from_slice::<serde_json::Value>(&body).is_ok(),
                server,
            },
        })
    }
}
