use futures::FutureExt;
use futures::future::BoxFuture;
use relayway_core::registry::EndpointId;
use relayway_core::router::EndpointTarget;
use relayway_core::upstream::{UpstreamError, check_response};
use std::time::Duration;

/// Router operation: `GET <endpoint><path>` and return who answered plus the body.
pub fn get_body(
    path: &str,
) -> impl Fn(EndpointTarget) -> BoxFuture<'static, Result<(EndpointId, String), UpstreamError>>
+ Send
+ 'static {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .expect("failed to build client");
    let path = path.to_string();

    move |target: EndpointTarget| {
        let client = client.clone();
        let url = target.url_for(&path);

        async move {
            let resp = check_response(client.get(&url).send().await?)?;
            let body = resp.text().await?;
            Ok::<_, UpstreamError>((target.id, body))
        }
        .boxed()
    }
}
