//! How a node proves it may join the overlay.
//!
//! ## Components
//!
//! - [`AuthenticationStrategy`] - chosen by the operator: interactive login or
//!   a pre-issued one-time token
//! - [`DeviceLogin`] - OIDC device authorization client for the interactive case
//! - [`Credential`] - what the chosen strategy yields, consumed by signing

mod device_login;

use std::time::Duration;

use meshkit_auth::{BearerToken, ControllerMetadata, OneTimeToken};
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;

pub use device_login::{DeviceLogin, OidcProvider};

/// The operator's choice of authentication.
#[derive(Debug, Clone)]
pub enum AuthenticationStrategy {
    /// Federated login against the controller's identity provider.
    Interactive,
    /// Pre-issued token, validated by the controller at signing time.
    OneTimeToken(OneTimeToken),
}

/// A credential ready to be presented to the controller.
#[derive(Debug, Clone)]
pub enum Credential {
    Bearer(BearerToken),
    OneTime(OneTimeToken),
}

impl AuthenticationStrategy {
    /// Obtain a credential.
    ///
    /// The interactive variant suspends until the user finishes authorizing in
    /// a browser; the token variant returns immediately.
    pub async fn obtain(
        &self,
        metadata: &ControllerMetadata,
        http: &reqwest::Client,
        request_timeout: Duration,
        login_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Credential, ProvisionError> {
        match self {
            AuthenticationStrategy::OneTimeToken(token) => Ok(Credential::OneTime(token.clone())),
            AuthenticationStrategy::Interactive => {
                let provider = oidc_provider(metadata)?;
                tracing::info!(issuer = %provider.config_url, "Starting interactive login");
                let login = DeviceLogin::new(provider, http.clone(), request_timeout, login_timeout);
                login.login(cancel).await.map(Credential::Bearer)
            }
        }
    }
}

/// Identity provider coordinates from controller metadata.
///
/// # Errors
///
/// Returns `Protocol` if the controller didn't advertise them.
pub fn oidc_provider(metadata: &ControllerMetadata) -> Result<OidcProvider, ProvisionError> {
    let config_url = metadata.oidc_config_url.trim();
    let client_id = metadata.oidc_client_id.trim();

    if config_url.is_empty() || client_id.is_empty() {
        return Err(ProvisionError::Protocol {
            url: "controller metadata".into(),
            detail: "no OIDC configuration URL or client ID advertised".into(),
        });
    }

    Ok(OidcProvider {
        config_url: config_url.to_string(),
        client_id: client_id.to_string(),
    })
}
