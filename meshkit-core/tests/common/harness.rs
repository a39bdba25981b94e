//! Test harness for provisioning runs.
//!
//! A wiremock server plays both the controller (under `/api`) and its identity
//! provider (under `/openid`), so a full run never leaves localhost.

use std::path::{Path, PathBuf};

use meshkit_core::{ClientSettings, ConfigDir, ProvisionMode, Provisioner};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CERT_PEM: &str = "-----BEGIN NEBULA CERTIFICATE-----\nAAAA\n-----END NEBULA CERTIFICATE-----\n";
pub const CA_PEM: &str = "-----BEGIN NEBULA CERTIFICATE-----\nCCCC\n-----END NEBULA CERTIFICATE-----\n";
pub const ACCESS_TOKEN: &str = "T";

/// Fake controller plus identity provider.
pub struct TestController {
    pub server: MockServer,
}

impl TestController {
    /// Start a controller that advertises signing and OIDC endpoints.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ca": CA_PEM,
                "certEndpoint": format!("{uri}/api/cert"),
                "oidcClientID": "meshkit-test",
                "oidcConfigURL": format!("{uri}/openid"),
                "signEndpoint": format!("{uri}/api/sign"),
                "nodeConfigEndpoint": format!("{uri}/api/node"),
            })))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Bootstrap URL clients are given.
    pub fn bootstrap_url(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    /// Identity provider that grants a token on the first poll.
    pub async fn mount_identity_provider(&self) {
        let uri = self.server.uri();

        Mock::given(method("GET"))
            .and(path("/openid/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": format!("{uri}/openid"),
                "device_authorization_endpoint": format!("{uri}/openid/device"),
                "token_endpoint": format!("{uri}/openid/token"),
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/openid/device"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "dev-1",
                "user_code": "ABCD-EFGH",
                "verification_uri": format!("{uri}/device"),
                "expires_in": 60,
                "interval": 0,
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/openid/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
            })))
            .mount(&self.server)
            .await;
    }
}

/// Signing response advertising a single lighthouse.
pub fn signed_body() -> serde_json::Value {
    json!({
        "certificate": CERT_PEM,
        "static_host_map": { "lh1": ["1.2.3.4:4242"] },
        "lighthouses": ["lh1"],
        "blocklist": [],
    })
}

/// Settings with short timeouts and no template lookup.
pub fn test_settings() -> ClientSettings {
    ClientSettings::default()
        .with_request_timeout(Some(5))
        .with_login_timeout(Some(10))
}

/// A provisioner that only looks for templates in `templates`.
pub fn provisioner(templates: Vec<PathBuf>) -> Provisioner {
    Provisioner::new(test_settings()).with_template_search_path(templates)
}

pub fn login(server_url: &str) -> ProvisionMode {
    ProvisionMode::Login {
        server_url: Some(server_url.to_string()),
    }
}

pub fn config_dir(path: &Path) -> ConfigDir {
    ConfigDir::open(path).expect("config dir")
}

/// Sorted file names in `dir`.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
