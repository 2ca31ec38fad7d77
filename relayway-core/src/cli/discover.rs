use crate::cli::conf::dump_json;
use crate::conf::load_config;
use crate::conf::types::DiscoveryConfig;
use crate::discovery::{DiscoveryAgent, DiscoveryReport, DiscoverySettings, HttpProber};
use crate::router::{Router, RouterStatus};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Serialize)]
struct DiscoverOutput {
    report: DiscoveryReport,
    status: RouterStatus,
}

/// One discovery pass against the configured candidates.
pub async fn discover(path: PathBuf) -> anyhow::Result<()> {
    let cfg = load_config(&path)?.config;
    let router = cfg.build_router();

    let report = run_discovery(&router, &cfg.discovery).await?;

    dump_json(&DiscoverOutput {
        report,
        status: router.status(),
    })?;

    router.shutdown();
    Ok(())
}

pub(crate) async fn run_discovery(
    router: &Router,
    discovery: &DiscoveryConfig,
) -> anyhow::Result<DiscoveryReport> {
    let agent = build_agent(router, discovery)?;
    Ok(agent.run_once(&discovery.to_candidates()).await)
}

/// First discovery pass now, then one every `discovery.interval_seconds` until the
/// router shuts down.
pub(crate) async fn start_discovery(
    router: &Router,
    discovery: &DiscoveryConfig,
) -> anyhow::Result<(DiscoveryReport, JoinHandle<()>)> {
    let agent = build_agent(router, discovery)?;
    let candidates = discovery.to_candidates();

    let report = agent.run_once(&candidates).await;
    let handle = agent.spawn_after(candidates, discovery.interval());

    Ok((report, handle))
}

fn build_agent(router: &Router, discovery: &DiscoveryConfig) -> anyhow::Result<DiscoveryAgent> {
    let settings = DiscoverySettings::from(discovery);
    let prober = HttpProber::new(settings.probe_path.clone(), settings.probe_timeout)?;
    Ok(DiscoveryAgent::new(router.clone(), Arc::new(prober), settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::RelaywayConfig;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn periodic_discovery_runs_until_router_shutdown() {
        // Arrange
        let cfg = RelaywayConfig {
            discovery: DiscoveryConfig {
                enable: true,
                interval_seconds: 30,
                ..Default::default()
            },
            ..Default::default()
        };
        let router = cfg.build_router();

        // Act
        let (report, handle) = start_discovery(&router, &cfg.discovery).await.unwrap();
        tokio::time::sleep(Duration::from_secs(95)).await;
        let running = !handle.is_finished();
        router.shutdown();
        handle.await.unwrap();

        // Assert
        assert_eq!(report.registered_count(), 0);
        assert!(running);
    }
}
