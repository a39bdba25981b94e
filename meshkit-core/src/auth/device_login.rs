//! OpenID Connect login using the Device Authorization Grant (RFC 8628).
//!
//! The user completes authorization in a browser, possibly on another device,
//! while this client polls the provider's token endpoint. The flow:
//! 1. Discover endpoints from `{issuer}/.well-known/openid-configuration`
//! 2. Request a device code and show the verification URL to the user
//! 3. Poll for the access token until granted, denied or expired

use std::time::Duration;

use meshkit_auth::BearerToken;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;
use crate::net;

/// Path of the OIDC discovery document relative to the issuer.
const DISCOVERY_SUFFIX: &str = ".well-known/openid-configuration";

/// Scopes requested for the controller's access token.
const SCOPE: &str = "openid offline_access";

/// Polling interval when the provider doesn't specify one.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on the polling interval after `slow_down` responses.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Identity provider coordinates advertised by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidcProvider {
    /// Issuer URL (the discovery document lives beneath it).
    pub config_url: String,
    /// OAuth client ID registered for this controller.
    pub client_id: String,
}

/// Interactive login client.
pub struct DeviceLogin {
    provider: OidcProvider,
    http: reqwest::Client,
    request_timeout: Duration,
    login_timeout: Duration,
}

impl DeviceLogin {
    pub fn new(
        provider: OidcProvider,
        http: reqwest::Client,
        request_timeout: Duration,
        login_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            http,
            request_timeout,
            login_timeout,
        }
    }

    /// Run the login and return the access token.
    ///
    /// Suspends until the user approves or denies the request, the device
    /// code expires, the login timeout elapses, or `cancel` fires.
    pub async fn login(&self, cancel: &CancellationToken) -> Result<BearerToken, ProvisionError> {
        let discovery = self.discover(cancel).await?;
        let device_endpoint = discovery.device_authorization_endpoint.ok_or_else(|| {
            ProvisionError::Authentication(
                "identity provider does not support device authorization".into(),
            )
        })?;

        let device = self.request_device_code(&device_endpoint, cancel).await?;

        eprintln!();
        eprintln!("Login required.");
        match device.verification_uri_complete.as_deref() {
            Some(uri) => eprintln!("Visit: {uri}"),
            None => eprintln!("Visit: {}", device.verification_uri),
        }
        eprintln!("Code:  {}", device.user_code);
        eprintln!();
        eprintln!("Waiting for authorization...");

        let tokens = self
            .poll_for_token(&discovery.token_endpoint, &device, cancel)
            .await?;

        tracing::info!("Interactive login completed");
        Ok(BearerToken::new(tokens.access_token)?)
    }

    /// Fetch the provider's discovery document.
    async fn discover(&self, cancel: &CancellationToken) -> Result<Discovery, ProvisionError> {
        let issuer = self.provider.config_url.trim().trim_end_matches('/');
        let url = if issuer.ends_with(DISCOVERY_SUFFIX) {
            issuer.to_string()
        } else {
            net::endpoint_url(issuer, DISCOVERY_SUFFIX)?.to_string()
        };

        let (status, body) =
            net::exchange(self.http.get(&url), &url, self.request_timeout, cancel).await?;

        if !status.is_success() {
            return Err(ProvisionError::Authentication(format!(
                "identity provider discovery failed ({status}): {}",
                net::excerpt(&body)
            )));
        }

        net::decode_json(&url, &body)
    }

    /// Request a device code.
    async fn request_device_code(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<DeviceCodeResponse, ProvisionError> {
        let request = self.http.post(endpoint).form(&[
            ("client_id", self.provider.client_id.as_str()),
            ("scope", SCOPE),
        ]);

        let (status, body) = net::exchange(request, endpoint, self.request_timeout, cancel).await?;

        if !status.is_success() {
            return Err(ProvisionError::Authentication(format!(
                "device code request failed ({status}): {}",
                net::excerpt(&body)
            )));
        }

        net::decode_json(endpoint, &body)
    }

    /// Poll for the access token after the user is shown the code.
    async fn poll_for_token(
        &self,
        token_endpoint: &str,
        device: &DeviceCodeResponse,
        cancel: &CancellationToken,
    ) -> Result<TokenSet, ProvisionError> {
        let budget = Duration::from_secs(device.expires_in).min(self.login_timeout);
        let deadline = Instant::now() + budget;
        let mut interval = initial_interval(device.interval);

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(login_timed_out());
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
                _ = tokio::time::sleep(interval.min(deadline - now)) => {}
            }

            if Instant::now() >= deadline {
                return Err(login_timed_out());
            }

            let request = self.http.post(token_endpoint).form(&[
                ("client_id", self.provider.client_id.as_str()),
                ("device_code", device.device_code.as_str()),
                ("grant_type", DEVICE_CODE_GRANT),
            ]);

            let poll = net::exchange(request, token_endpoint, self.request_timeout, cancel);
            let (status, body) = tokio::time::timeout_at(deadline, poll)
                .await
                .map_err(|_| login_timed_out())??;

            if status.is_success() {
                return net::decode_json(token_endpoint, &body);
            }

            let err: DeviceError = net::decode_json(token_endpoint, &body)?;
            match err.error.as_str() {
                "authorization_pending" => continue,
                "slow_down" => {
                    interval = slowed_down(interval);
                    tracing::debug!(interval_secs = interval.as_secs(), "Provider asked to slow down");
                }
                "expired_token" => {
                    return Err(ProvisionError::Authentication(
                        "device code expired before authorization".into(),
                    ))
                }
                "access_denied" => {
                    return Err(ProvisionError::Authentication("access denied by user".into()))
                }
                other => {
                    let detail = err.error_description.as_deref().unwrap_or(other);
                    return Err(ProvisionError::Authentication(detail.to_string()));
                }
            }
        }
    }
}

fn login_timed_out() -> ProvisionError {
    ProvisionError::Authentication("login timed out waiting for authorization".into())
}

/// Polling interval before any `slow_down`.
fn initial_interval(advertised: Option<u64>) -> Duration {
    advertised
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

/// Interval after a `slow_down` response: doubled, between 1 s and the cap.
fn slowed_down(interval: Duration) -> Duration {
    (interval * 2).clamp(Duration::from_secs(1), MAX_POLL_INTERVAL)
}

/// Subset of the OIDC discovery document used here.
#[derive(Debug, Deserialize)]
struct Discovery {
    token_endpoint: String,
    #[serde(default)]
    device_authorization_endpoint: Option<String>,
}

/// Response from the device authorization endpoint.
#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

/// Token endpoint success body.
#[derive(Deserialize)]
struct TokenSet {
    access_token: String,
}

/// Token endpoint error body.
#[derive(Deserialize)]
struct DeviceError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
