//! HTTP plumbing shared by the controller and identity-provider clients.
//!
//! Every exchange is bounded by a deadline and races a cancellation token, so
//! an unresponsive server can never hang a run.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;
use crate::settings::ClientSettings;

/// Longest slice of a response body quoted in an error message.
const MAX_BODY_EXCERPT: usize = 512;

/// Build an endpoint URL by appending `suffix` as a path segment of `base`.
///
/// Works whether or not `base` ends with `/`; query strings are kept.
///
/// # Errors
///
/// Returns `ProvisionError::Configuration` if `base` is not an absolute URL.
pub fn endpoint_url(base: &str, suffix: &str) -> Result<Url, ProvisionError> {
    let mut url = Url::parse(base.trim())
        .map_err(|e| ProvisionError::Configuration(format!("invalid server URL {base:?}: {e}")))?;

    if url.cannot_be_a_base() {
        return Err(ProvisionError::Configuration(format!(
            "invalid server URL {base:?}: not a hierarchical URL"
        )));
    }

    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        suffix.trim_start_matches('/')
    );
    url.set_path(&path);
    Ok(url)
}

/// Build the HTTP client used for a run.
pub(crate) fn http_client(settings: &ClientSettings) -> Result<reqwest::Client, ProvisionError> {
    reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .user_agent(concat!("meshkit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProvisionError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Send a request and read the whole body, honoring deadline and cancellation.
pub(crate) async fn exchange(
    request: RequestBuilder,
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(StatusCode, Vec<u8>), ProvisionError> {
    let round_trip = async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, body.to_vec()))
    };

    let timed_out = || ProvisionError::Timeout {
        url: url.to_string(),
        secs: timeout.as_secs(),
    };

    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(ProvisionError::Cancelled),
        result = tokio::time::timeout(timeout, round_trip) => match result {
            Err(_) => Err(timed_out()),
            Ok(Err(e)) if e.is_timeout() => Err(timed_out()),
            Ok(Err(source)) => Err(ProvisionError::Network {
                url: url.to_string(),
                source,
            }),
            Ok(Ok(reply)) => Ok(reply),
        },
    }
}

/// Decode a JSON body, reporting failures as protocol errors.
pub(crate) fn decode_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, ProvisionError> {
    serde_json::from_slice(body).map_err(|e| {
        ProvisionError::protocol(url, format!("malformed JSON body ({e}): {}", excerpt(body)))
    })
}

/// A printable, bounded excerpt of a response body.
pub(crate) fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() <= MAX_BODY_EXCERPT {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_BODY_EXCERPT).collect();
        format!("{cut}...")
    }
}
