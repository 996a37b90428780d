//! Stream connector: opens the streaming GET and classifies the response.

use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::client::auth::AuthProvider;
use crate::error::{Error, Result};
use crate::shared::dispatch::SubscriberHub;
use crate::types::{ResponseBody, ResponseInfo, StreamNotice};

/// `Accept` header value for stream requests.
pub(crate) const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Query parameter carrying the bearer token on streaming URIs.
pub(crate) const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Open the streaming GET against `url`.
///
/// The bearer token is fetched from the provider and appended as the
/// `access_token` query parameter; streaming endpoints cannot rely on
/// custom request headers. A non-200 response is fully buffered, surfaced
/// as a `response` notice on the hub, and returned as [`Error::Http`];
/// transport failures before any response map to [`Error::Network`]. Only
/// a 200 hands back the live response for incremental body consumption.
pub(crate) async fn open_stream(
    client: &reqwest::Client,
    url: &Url,
    auth: &dyn AuthProvider,
    hub: &SubscriberHub,
) -> Result<reqwest::Response> {
    let token = auth.access_token().await?;
    let mut request_url = url.clone();
    request_url
        .query_pairs_mut()
        .append_pair(ACCESS_TOKEN_PARAM, &token);

    // Errors and logs carry the URL without the token query.
    let display_url = url.as_str();
    debug!(url = display_url, "opening event stream");

    let response = client
        .get(request_url)
        .header(reqwest::header::ACCEPT, ACCEPT_EVENT_STREAM)
        .send()
        .await
        .map_err(|err| Error::network(display_url, err))?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!(
            url = display_url,
            status = status.as_u16(),
            "event stream connect rejected"
        );
        return Err(reject_response(display_url, response, hub).await);
    }

    debug!(url = display_url, "event stream connected");
    Ok(response)
}

/// Buffer a non-200 stream response, emit the `response` notice, and build
/// the rejection error. The notice carries the decoded JSON body when it
/// decodes and the raw text otherwise; decode failures never block the
/// rejection itself.
async fn reject_response(url: &str, response: reqwest::Response, hub: &SubscriberHub) -> Error {
    let (status, parsed, raw) = buffer_body(response).await;
    let body = match &parsed {
        Some(value) => ResponseBody::Json(value.clone()),
        None => ResponseBody::Raw(raw),
    };
    hub.notify(StreamNotice::Response(ResponseInfo { status, body }));

    let message = parsed.as_ref().and_then(server_message);
    Error::http(status, url, message.as_deref(), parsed)
}

/// Shape a non-2xx REST response into [`Error::Http`] (no notices; the
/// REST surface has no subscribers).
pub(crate) async fn error_from_response(url: &str, response: reqwest::Response) -> Error {
    let (status, parsed, _) = buffer_body(response).await;
    let message = parsed.as_ref().and_then(server_message);
    Error::http(status, url, message.as_deref(), parsed)
}

async fn buffer_body(response: reqwest::Response) -> (u16, Option<serde_json::Value>, String) {
    let status = response.status().as_u16();
    let raw = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str(&raw).ok();
    (status, parsed, raw)
}

// The server's human-readable detail, when the error body carries one.
fn server_message(body: &serde_json::Value) -> Option<String> {
    body.get("error_description")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}
