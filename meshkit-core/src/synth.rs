//! Writes the signed identity and derived node configuration.
//!
//! This is the only stage that writes controller-issued artifacts. All three
//! are rendered in memory first, so a rendering failure leaves the directory
//! untouched; then each file is replaced in turn.

use std::path::{Path, PathBuf};

use meshkit_auth::{ArtifactNames, NodeConfig, SigningResponse};

use crate::error::ProvisionError;
use crate::keystore::{remove_existing, GeneratedKeyPair};

/// Paths written by a successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub certificate: PathBuf,
    pub ca_certificate: PathBuf,
    pub node_config: PathBuf,
    /// Set when a default template was copied in during this run.
    pub seeded_template: Option<PathBuf>,
}

/// Persists signing results into a config directory.
#[derive(Debug, Clone)]
pub struct ConfigSynthesizer {
    names: ArtifactNames,
    template_search_path: Vec<PathBuf>,
}

impl ConfigSynthesizer {
    /// A synthesizer seeding `default.yml` from the first existing candidate.
    pub fn new(names: ArtifactNames, template_search_path: Vec<PathBuf>) -> Self {
        Self {
            names,
            template_search_path,
        }
    }

    /// Standard template search path.
    ///
    /// In order: the explicit override, `default.yml` in the process working
    /// directory, then `default.yml` in the per-user config directory.
    pub fn default_search_path(explicit: Option<&Path>, names: &ArtifactNames) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(&names.default_template));
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "meshkit") {
            candidates.push(dirs.config_dir().join(&names.default_template));
        }
        candidates
    }

    /// Write certificate, CA certificate and derived config into `dir`.
    ///
    /// # Errors
    ///
    /// `Filesystem` if any artifact cannot be written; `Protocol` if the
    /// derived config cannot be rendered.
    pub fn write(
        &self,
        response: &SigningResponse,
        keypair: &GeneratedKeyPair,
        ca_cert: &str,
        dir: &Path,
    ) -> Result<WrittenArtifacts, ProvisionError> {
        let mut names = self.names.clone();
        if let Some(key_name) = keypair.private_key_path.file_name() {
            names.private_key = key_name.to_string_lossy().into_owned();
        }

        let node_config = NodeConfig::derive(response, &names);
        let rendered = serde_yaml::to_string(&node_config).map_err(|e| ProvisionError::Protocol {
            url: "signing response".into(),
            detail: format!("cannot render node config: {e}"),
        })?;

        let certificate = dir.join(&names.certificate);
        replace_file(&certificate, response.certificate.as_bytes())?;

        let ca_certificate = dir.join(&names.ca_certificate);
        replace_file(&ca_certificate, ca_cert.as_bytes())?;

        let node_config_path = dir.join(&names.node_config);
        replace_file(&node_config_path, rendered.as_bytes())?;

        let seeded_template = self.seed_template(dir)?;

        Ok(WrittenArtifacts {
            certificate,
            ca_certificate,
            node_config: node_config_path,
            seeded_template,
        })
    }

    /// Copy a default template into `dir` unless one is already there.
    fn seed_template(&self, dir: &Path) -> Result<Option<PathBuf>, ProvisionError> {
        let target = dir.join(&self.names.default_template);
        if target.exists() {
            return Ok(None);
        }

        let Some(source) = self
            .template_search_path
            .iter()
            .find(|candidate| candidate.is_file() && !same_file(candidate, &target))
        else {
            tracing::warn!(
                dir = %dir.display(),
                "No {} template found, config will be minimal",
                self.names.default_template
            );
            return Ok(None);
        };

        let contents = std::fs::read(source).map_err(|e| ProvisionError::filesystem(source, e))?;
        std::fs::write(&target, contents).map_err(|e| ProvisionError::filesystem(&target, e))?;
        tracing::info!(from = %source.display(), to = %target.display(), "Seeded default template");

        Ok(Some(target))
    }
}

/// Remove `path` if present and write `contents` as a new file.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), ProvisionError> {
    remove_existing(path)?;
    std::fs::write(path, contents).map_err(|e| ProvisionError::filesystem(path, e))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
