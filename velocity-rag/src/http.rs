//! JSON-over-HTTP plumbing shared by the hosted embedding and chat clients.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on any single call to a hosted model.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// A client with [`REQUEST_TIMEOUT`] applied.
pub(crate) fn client() -> std::result::Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

/// POST `body` to `url` with bearer auth and decode the JSON reply.
///
/// Failures come back as a one-line description for the caller to wrap in
/// its own error variant.
pub(crate) async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> std::result::Result<T, String>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(format!("API returned {status}: {}", error_detail(text)));
    }

    response.json().await.map_err(|e| format!("failed to parse response: {e}"))
}

/// The `error.message` of an OpenAI-style error body, or the body itself.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}
