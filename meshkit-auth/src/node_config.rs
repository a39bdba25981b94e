//! Minimal node configuration derived from a signing response.
//!
//! The derived file only carries what the controller decides (PKI material,
//! static hosts, lighthouses); everything else comes from the operator's
//! default template, which the overlay daemon merges alongside it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wire::SigningResponse;

/// File names of the artifacts a run produces inside the config directory.
///
/// The derived config refers to these by bare name, never by full path, so the
/// directory can be relocated as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub public_key: String,
    pub private_key: String,
    pub certificate: String,
    pub ca_certificate: String,
    pub node_config: String,
    pub default_template: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            public_key: "node.pub".into(),
            private_key: "node.key".into(),
            certificate: "node.crt".into(),
            ca_certificate: "ca.crt".into(),
            node_config: "zz_controller_config.yml".into(),
            default_template: "default.yml".into(),
        }
    }
}

/// `pki` section of the node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkiConfig {
    pub ca: String,
    pub cert: String,
    pub key: String,
    pub blocklist: Vec<String>,
}

/// `lighthouse` section of the node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LighthouseConfig {
    pub am_lighthouse: bool,
    pub hosts: Vec<String>,
}

/// The controller-derived node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub pki: PkiConfig,
    pub static_host_map: BTreeMap<String, Vec<String>>,
    pub lighthouse: LighthouseConfig,
}

impl NodeConfig {
    /// Build the configuration for a freshly signed node.
    ///
    /// Static hosts and blocklist are copied verbatim; the local node is never
    /// a lighthouse.
    #[must_use]
    pub fn derive(response: &SigningResponse, names: &ArtifactNames) -> Self {
        Self {
            pki: PkiConfig {
                ca: names.ca_certificate.clone(),
                cert: names.certificate.clone(),
                key: names.private_key.clone(),
                blocklist: response.blocklist.clone(),
            },
            static_host_map: response.static_hosts.clone(),
            lighthouse: LighthouseConfig {
                am_lighthouse: false,
                hosts: response.lighthouses.clone(),
            },
        }
    }
}
