//! Certificate signing against the controller.
//!
//! Two entry points, one per credential kind. Both return typed errors; the
//! caller decides that any failure ends the run.

use std::time::Duration;

use meshkit_auth::{
    BearerToken, ControllerError, ControllerMetadata, EnrollmentRequest, OneTimeToken,
    SigningRequest, SigningResponse,
};
use reqwest::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;

use crate::auth::Credential;
use crate::error::ProvisionError;
use crate::net;

/// Path suffix of the enrollment endpoint under the bootstrap URL.
const ENROLL_SUFFIX: &str = "enroll";

/// Client for the controller's signing and enrollment endpoints.
pub struct SigningClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl SigningClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Sign `public_key_pem` with whichever credential the run obtained.
    pub async fn sign(
        &self,
        credential: &Credential,
        metadata: &ControllerMetadata,
        bootstrap_url: &str,
        public_key_pem: &str,
        cancel: &CancellationToken,
    ) -> Result<SigningResponse, ProvisionError> {
        match credential {
            Credential::Bearer(token) => {
                self.sign_with_credential(metadata, token, public_key_pem, cancel)
                    .await
            }
            Credential::OneTime(token) => {
                self.sign_with_one_time_token(bootstrap_url, token, public_key_pem, cancel)
                    .await
            }
        }
    }

    /// `POST {signEndpoint}` with `Authorization: Bearer`.
    ///
    /// # Errors
    ///
    /// `Protocol` for a missing signing endpoint, a non-success status (the
    /// raw body is kept as detail) or a malformed body; transport errors as
    /// `Network`/`Timeout`/`Cancelled`.
    pub async fn sign_with_credential(
        &self,
        metadata: &ControllerMetadata,
        bearer: &BearerToken,
        public_key_pem: &str,
        cancel: &CancellationToken,
    ) -> Result<SigningResponse, ProvisionError> {
        let endpoint = metadata.sign_endpoint.trim();
        if endpoint.is_empty() {
            return Err(ProvisionError::protocol(
                "controller metadata",
                "no signing endpoint advertised",
            ));
        }

        let request = self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, bearer.authorization_header())
            .json(&SigningRequest::new(public_key_pem));

        let (status, body) = net::exchange(request, endpoint, self.timeout, cancel).await?;

        if !status.is_success() {
            return Err(ProvisionError::protocol(
                endpoint,
                format!("status {status}: {}", net::excerpt(&body)),
            ));
        }

        decode_signing_response(endpoint, &body)
    }

    /// `POST {bootstrap_url}/enroll` with the one-time token in the body.
    ///
    /// # Errors
    ///
    /// `ControllerRejected` carrying the controller's message for a
    /// non-success status; `Protocol` if that error body, or a success body,
    /// cannot be decoded.
    pub async fn sign_with_one_time_token(
        &self,
        bootstrap_url: &str,
        token: &OneTimeToken,
        public_key_pem: &str,
        cancel: &CancellationToken,
    ) -> Result<SigningResponse, ProvisionError> {
        let url = net::endpoint_url(bootstrap_url, ENROLL_SUFFIX)?;
        let url_str = url.to_string();

        let request = self.http.post(url).json(&EnrollmentRequest {
            ott: token.expose().to_string(),
            public_key: public_key_pem.to_string(),
        });

        let (status, body) = net::exchange(request, &url_str, self.timeout, cancel).await?;

        if !status.is_success() {
            let rejection: ControllerError = net::decode_json(&url_str, &body)?;
            tracing::debug!(%status, controller_status = %rejection.status, "Enrollment rejected");
            return Err(ProvisionError::ControllerRejected {
                status: rejection.status,
                message: rejection.message,
            });
        }

        decode_signing_response(&url_str, &body)
    }
}

fn decode_signing_response(url: &str, body: &[u8]) -> Result<SigningResponse, ProvisionError> {
    let response: SigningResponse = net::decode_json(url, body)?;
    if response.certificate.trim().is_empty() {
        return Err(ProvisionError::protocol(url, "empty certificate in signing response"));
    }
    Ok(response)
}
