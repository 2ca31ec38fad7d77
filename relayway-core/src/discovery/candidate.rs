use crate::discovery::ProbeError;
use crate::registry::{EndpointId, EndpointSpec};
use url::Url;

/// A URL that discovery may probe and, if it answers, register.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryCandidate {
    /// Explicit id; derived from the URL's host and port when absent.
    pub id: Option<String>,
    pub url: String,
    pub priority: i32,
    pub rate_ceiling: u32,
}

impl DiscoveryCandidate {
    pub fn new(url: impl Into<String>, rate_ceiling: u32) -> Self {
        Self {
            id: None,
            url: url.into(),
            priority: 0,
            rate_ceiling,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn endpoint_id(&self) -> Result<EndpointId, ProbeError> {
        if let Some(id) = &self.id {
            return Ok(EndpointId(id.clone()));
        }

        let url = parse_http_url(&self.url)?;
        let host = url.host_str().ok_or_else(|| ProbeError::InvalidUrl {
            url: self.url.clone(),
            reason: "missing host".to_string(),
        })?;

        Ok(match url.port() {
            Some(port) => EndpointId(format!("{host}:{port}")),
            None => EndpointId(host.to_string()),
        })
    }

    pub fn to_spec(&self) -> Result<EndpointSpec, ProbeError> {
        parse_http_url(&self.url)?;

        Ok(EndpointSpec {
            id: self.endpoint_id()?,
            url: self.url.clone(),
            priority: self.priority,
            rate_ceiling: self.rate_ceiling,
        })
    }
}

/// Parse `raw` and require an http(s) scheme.
pub fn parse_http_url(raw: &str) -> Result<Url, ProbeError> {
    let url = Url::parse(raw).map_err(|e| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProbeError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn id_is_derived_from_host_and_port() {
        let c = DiscoveryCandidate::new("http://127.0.0.1:8545/rpc", 10);
        assert_eq!(c.endpoint_id().unwrap(), EndpointId::from("127.0.0.1:8545"));

        let c = DiscoveryCandidate::new("https://rpc.example.org", 10);
        assert_eq!(c.endpoint_id().unwrap(), EndpointId::from("rpc.example.org"));
    }

    #[test]
    fn explicit_id_wins() {
        let c = DiscoveryCandidate::new("https://rpc.example.org", 10).with_id("main");
        assert_eq!(c.endpoint_id().unwrap(), EndpointId::from("main"));
    }

    #[test]
    fn non_http_urls_are_rejected() {
        let err = DiscoveryCandidate::new("ws://node:8546", 10)
            .to_spec()
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidUrl { .. }));

        assert!(DiscoveryCandidate::new("not a url", 10).to_spec().is_err());
    }
}
