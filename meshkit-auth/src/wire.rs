//! JSON bodies exchanged with the controller, plus the local bootstrap hint.
//!
//! Field names follow the controller's wire format exactly; Rust names are
//! snake_case throughout.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Controller capability metadata served at `{base}/config`.
///
/// Fetched once per run and passed by value to every later stage. Fields the
/// controller omits decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerMetadata {
    #[serde(rename = "certEndpoint")]
    pub cert_endpoint: String,
    #[serde(rename = "oidcClientID")]
    pub oidc_client_id: String,
    #[serde(rename = "oidcConfigURL")]
    pub oidc_config_url: String,
    #[serde(rename = "signEndpoint")]
    pub sign_endpoint: String,
    #[serde(rename = "nodeConfigEndpoint")]
    pub node_config_endpoint: String,
    /// PEM-encoded CA certificate of the overlay.
    #[serde(rename = "ca")]
    pub ca_cert: String,
}

/// Bootstrap hint persisted next to the node configuration (`metadata.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelMetadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub controller_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tunnel_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
}

impl TunnelMetadata {
    /// The controller URL, if one was recorded.
    #[must_use]
    pub fn controller_url(&self) -> Option<&str> {
        let url = self.controller_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// Body of a bearer-authenticated signing request.
///
/// `duration` and `ip` are understood by the controller but no caller in this
/// workspace sets them; they are omitted from the JSON when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequest {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl SigningRequest {
    /// A request carrying only the PEM public key.
    #[must_use]
    pub fn new(public_key_pem: impl Into<String>) -> Self {
        Self {
            public_key: public_key_pem.into(),
            duration: None,
            ip: None,
        }
    }
}

/// Body of a one-time-token enrollment request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub ott: String,
    pub public_key: String,
}

impl std::fmt::Debug for EnrollmentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentRequest")
            .field("ott", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// A signed certificate plus the topology needed to join the overlay.
///
/// `certificate` is mandatory; the collections tolerate `null` or absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningResponse {
    pub certificate: String,
    #[serde(rename = "static_host_map", default, deserialize_with = "null_as_default")]
    pub static_hosts: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lighthouses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocklist: Vec<String>,
}

/// Error body returned by the enrollment endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerError {
    pub status: String,
    pub message: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_metadata_partial_body() {
        let body = r#"{
            "signEndpoint": "https://ctrl.example.com/sign",
            "oidcClientID": "abc",
            "oidcConfigURL": "https://idp/openid",
            "ca": "<CA-PEM>"
        }"#;
        let meta: ControllerMetadata = serde_json::from_str(body).unwrap();

        assert_eq!(meta.sign_endpoint, "https://ctrl.example.com/sign");
        assert_eq!(meta.oidc_client_id, "abc");
        assert_eq!(meta.oidc_config_url, "https://idp/openid");
        assert_eq!(meta.ca_cert, "<CA-PEM>");
        assert!(meta.cert_endpoint.is_empty());
        assert!(meta.node_config_endpoint.is_empty());
    }

    #[test]
    fn test_signing_request_omits_unset_fields() {
        let json = serde_json::to_string(&SigningRequest::new("<PEM>")).unwrap();
        assert_eq!(json, r#"{"public_key":"<PEM>"}"#);

        let full = SigningRequest {
            public_key: "<PEM>".into(),
            duration: Some(3600),
            ip: Some("10.0.0.5/24".into()),
        };
        let value = serde_json::to_value(&full).unwrap();
        assert_eq!(value["duration"], 3600);
        assert_eq!(value["ip"], "10.0.0.5/24");
    }

    #[test]
    fn test_enrollment_request_wire_names() {
        let req = EnrollmentRequest {
            ott: "tok".into(),
            public_key: "<PEM>".into(),
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"ott":"tok","public_key":"<PEM>"}"#
        );
        assert!(!format!("{req:?}").contains("tok\""));
    }

    #[test]
    fn test_signing_response_null_collections() {
        let body = r#"{"certificate":"<PEM>","static_host_map":null,"lighthouses":null}"#;
        let resp: SigningResponse = serde_json::from_str(body).unwrap();

        assert!(resp.static_hosts.is_empty());
        assert!(resp.lighthouses.is_empty());
        assert!(resp.blocklist.is_empty());
    }

    #[test]
    fn test_signing_response_requires_certificate() {
        let body = r#"{"static_host_map":{},"lighthouses":[],"blocklist":[]}"#;
        assert!(serde_json::from_str::<SigningResponse>(body).is_err());
    }

    #[test]
    fn test_tunnel_metadata_controller_url() {
        let meta: TunnelMetadata =
            serde_json::from_str(r#"{"controller_url":" https://ctrl/api ","tunnel_name":"home"}"#)
                .unwrap();
        assert_eq!(meta.controller_url(), Some("https://ctrl/api"));
        assert_eq!(TunnelMetadata::default().controller_url(), None);
    }

    #[test]
    fn test_controller_error_body() {
        let err: ControllerError =
            serde_json::from_str(r#"{"status":"error","message":"token already used"}"#).unwrap();
        assert_eq!(err.message, "token already used");
    }
}
