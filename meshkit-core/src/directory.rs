//! Controller discovery.
//!
//! Resolves the controller's capability metadata from a bootstrap URL, and
//! reads the optional bootstrap hint left in the config directory by an
//! earlier provisioning.

use std::path::Path;
use std::time::Duration;

use meshkit_auth::{ControllerMetadata, TunnelMetadata};
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;
use crate::net;

/// File name of the persisted bootstrap hint.
pub const METADATA_FILE: &str = "metadata.json";

/// Path suffix of the controller's metadata document.
const CONFIG_SUFFIX: &str = "config";

/// Client for the controller's metadata document.
pub struct ControllerDirectory {
    http: reqwest::Client,
    timeout: Duration,
}

impl ControllerDirectory {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Fetch `GET {bootstrap_url}/config`.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the bootstrap URL is invalid
    /// - `Network`/`Timeout`/`Cancelled` for transport problems
    /// - `Protocol` for a non-success status or a malformed body
    pub async fn resolve(
        &self,
        bootstrap_url: &str,
        cancel: &CancellationToken,
    ) -> Result<ControllerMetadata, ProvisionError> {
        let url = net::endpoint_url(bootstrap_url, CONFIG_SUFFIX)?;
        let url_str = url.to_string();
        tracing::debug!(url = %url_str, "Fetching controller metadata");

        let (status, body) =
            net::exchange(self.http.get(url), &url_str, self.timeout, cancel).await?;

        if !status.is_success() {
            return Err(ProvisionError::protocol(
                &url_str,
                format!("status {status}: {}", net::excerpt(&body)),
            ));
        }

        net::decode_json(&url_str, &body)
    }
}

/// Load the bootstrap hint from `config_dir`.
///
/// Missing or unreadable metadata means the node has not been bootstrapped
/// yet; it is never an error.
pub fn load_local_metadata(config_dir: &Path) -> Option<TunnelMetadata> {
    let path = config_dir.join(METADATA_FILE);

    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No local tunnel metadata");
            return None;
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring unparsable tunnel metadata");
            None
        }
    }
}
