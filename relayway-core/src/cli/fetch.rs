use crate::cli::conf::dump_json;
use crate::cli::discover::start_discovery;
use crate::conf::load_config;
use crate::logging::LogMode;
use crate::registry::EndpointId;
use crate::router::{EndpointTarget, RouterError};
use crate::upstream::{UpstreamError, check_response};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub path: PathBuf,
    pub target: String,
    pub count: usize,
    pub priority: i32,
    pub parallel: bool,
    pub mode: LogMode,
}

#[derive(Debug, Serialize)]
struct FetchOutcome {
    request: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<EndpointId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Issue `count` GETs for `target` through the router and report each outcome.
pub async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.path)?.config;
    let router = cfg.build_router();

    let discovery = if cfg.discovery.enable {
        let (_, handle) = start_discovery(&router, &cfg.discovery).await?;
        Some(handle)
    } else {
        None
    };

    let client = reqwest::Client::builder().build()?;

    let results: Vec<Result<(EndpointId, usize), RouterError>> = if args.parallel {
        join_all((0..args.count).map(|_| {
            router.submit(http_get(client.clone(), args.target.clone()), args.priority)
        }))
        .await
    } else {
        let mut results = Vec::with_capacity(args.count);
        for _ in 0..args.count {
            let op = http_get(client.clone(), args.target.clone());
            results.push(router.submit(op, args.priority).await);
        }
        results
    };

    let mut failures = 0;
    for (i, result) in results.into_iter().enumerate() {
        let outcome = match result {
            Ok((endpoint, bytes)) => FetchOutcome {
                request: i + 1,
                endpoint: Some(endpoint),
                bytes: Some(bytes),
                error: None,
            },
            Err(e) => {
                failures += 1;
                FetchOutcome {
                    request: i + 1,
                    endpoint: None,
                    bytes: None,
                    error: Some(e.to_string()),
                }
            }
        };
        print_outcome(&outcome, args.mode)?;
    }

    dump_json(&router.status())?;
    router.shutdown();
    if let Some(handle) = discovery {
        handle.await?;
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} request(s) failed", args.count);
    }

    Ok(())
}

fn http_get(
    client: reqwest::Client,
    path: String,
) -> impl Fn(EndpointTarget) -> BoxFuture<'static, Result<(EndpointId, usize), UpstreamError>>
+ Send
+ 'static {
    move |target: EndpointTarget| {
        let client = client.clone();
        let url = target.url_for(&path);

        async move {
            let resp = check_response(client.get(&url).send().await?)?;
            let body = resp.bytes().await?;
            Ok::<_, UpstreamError>((target.id, body.len()))
        }
        .boxed()
    }
}

fn print_outcome(outcome: &FetchOutcome, mode: LogMode) -> anyhow::Result<()> {
    match mode {
        LogMode::Raw => println!("{}", serde_json::to_string(outcome)?),
        LogMode::Pretty => match (&outcome.endpoint, &outcome.error) {
            (Some(endpoint), _) => println!(
                "{} #{} {} bytes via {}",
                "✔".green().bold(),
                outcome.request,
                outcome.bytes.unwrap_or_default(),
                endpoint.cyan()
            ),
            (None, error) => println!(
                "{} #{} {}",
                "✘".red().bold(),
                outcome.request,
                error.as_deref().unwrap_or("unknown error").red()
            ),
        },
    }

    Ok(())
}
