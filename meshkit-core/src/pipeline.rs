//! The provisioning pipeline.
//!
//! Stages run strictly in order:
//! 1. Resolve the bootstrap URL (flag, else local `metadata.json` for login)
//! 2. Resolve controller metadata
//! 3. Authenticate (interactive login or one-time token)
//! 4. Generate the keypair
//! 5. Sign
//! 6. Synthesize config
//!
//! The first failure aborts the run. Nothing is retried or rolled back; in
//! particular a keypair written in stage 4 stays on disk if signing fails.

use std::fmt;
use std::path::{Path, PathBuf};

use meshkit_auth::identity::{Fingerprint, OsRandom, RandomSource};
use meshkit_auth::{ArtifactNames, OneTimeToken};
use tokio_util::sync::CancellationToken;

use crate::auth::AuthenticationStrategy;
use crate::directory::{load_local_metadata, ControllerDirectory};
use crate::error::ProvisionError;
use crate::keystore::KeyPairProvisioner;
use crate::net;
use crate::settings::ClientSettings;
use crate::signing::SigningClient;
use crate::synth::{ConfigSynthesizer, WrittenArtifacts};

/// A pipeline stage, for failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveBootstrap,
    ResolveController,
    Authenticate,
    GenerateKeyPair,
    Sign,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::ResolveBootstrap => "Could not determine controller URL",
            Stage::ResolveController => "Could not obtain controller info",
            Stage::Authenticate => "Could not obtain access token",
            Stage::GenerateKeyPair => "Could not generate node keypair",
            Stage::Sign => "Could not obtain signed certificate",
            Stage::Synthesize => "Could not write node config",
        };
        f.write_str(text)
    }
}

/// A failure tagged with the stage it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{stage}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: ProvisionError,
}

/// What to provision.
#[derive(Debug, Clone)]
pub enum ProvisionMode {
    /// Interactive login. Without a server URL the controller URL recorded in
    /// the config directory's `metadata.json` is used.
    Login { server_url: Option<String> },
    /// Non-interactive enrollment with a one-time token.
    Enroll { server_url: String, token: OneTimeToken },
}

impl ProvisionMode {
    /// Check the inputs that need neither the network nor the config directory.
    ///
    /// # Errors
    ///
    /// `Configuration` if enrollment has no server URL.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        match self {
            ProvisionMode::Enroll { server_url, .. } if server_url.trim().is_empty() => Err(
                ProvisionError::Configuration("Cannot enroll without server URL".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub fingerprint: Fingerprint,
    pub public_key: PathBuf,
    pub private_key: PathBuf,
    pub artifacts: WrittenArtifacts,
}

/// A validated configuration directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir(PathBuf);

impl ConfigDir {
    /// Resolve `path` to an absolute directory that exists.
    ///
    /// # Errors
    ///
    /// `Directory` if the path doesn't exist, isn't a directory, or can't be
    /// listed.
    pub fn open(path: &Path) -> Result<Self, ProvisionError> {
        let directory_error = |source| ProvisionError::Directory {
            path: path.to_path_buf(),
            source,
        };

        let resolved = path.canonicalize().map_err(directory_error)?;
        std::fs::read_dir(&resolved).map_err(directory_error)?;
        Ok(Self(resolved))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Drives one provisioning run.
pub struct Provisioner<R = OsRandom> {
    settings: ClientSettings,
    names: ArtifactNames,
    keys: KeyPairProvisioner<R>,
    template_search_path: Vec<PathBuf>,
}

impl Provisioner<OsRandom> {
    /// A provisioner with OS randomness and the standard template search path.
    pub fn new(settings: ClientSettings) -> Self {
        let names = ArtifactNames::default();
        let template_search_path =
            ConfigSynthesizer::default_search_path(settings.template.as_deref(), &names);
        Self {
            settings,
            names,
            keys: KeyPairProvisioner::new(),
            template_search_path,
        }
    }
}

impl<R: RandomSource> Provisioner<R> {
    /// Replace the randomness source used for key generation.
    pub fn with_random_source<S: RandomSource>(self, rng: S) -> Provisioner<S> {
        Provisioner {
            settings: self.settings,
            names: self.names,
            keys: KeyPairProvisioner::with_random_source(rng),
            template_search_path: self.template_search_path,
        }
    }

    /// Replace the template search path.
    pub fn with_template_search_path(mut self, candidates: Vec<PathBuf>) -> Self {
        self.template_search_path = candidates;
        self
    }

    /// Run the pipeline against `config_dir`.
    pub async fn run(
        &mut self,
        mode: ProvisionMode,
        config_dir: &ConfigDir,
        cancel: &CancellationToken,
    ) -> Result<ProvisionOutcome, StageError> {
        let dir = config_dir.path();

        let (bootstrap_url, strategy) =
            resolve_bootstrap(mode, dir).map_err(at(Stage::ResolveBootstrap))?;

        let http = net::http_client(&self.settings).map_err(at(Stage::ResolveController))?;

        tracing::info!(server = %bootstrap_url, "Resolving controller metadata");
        let metadata = ControllerDirectory::new(http.clone(), self.settings.request_timeout)
            .resolve(&bootstrap_url, cancel)
            .await
            .map_err(at(Stage::ResolveController))?;

        let credential = strategy
            .obtain(
                &metadata,
                &http,
                self.settings.request_timeout,
                self.settings.login_timeout,
                cancel,
            )
            .await
            .map_err(at(Stage::Authenticate))?;

        let keypair = self
            .keys
            .generate(dir, &self.names)
            .map_err(at(Stage::GenerateKeyPair))?;
        tracing::info!(fingerprint = %keypair.fingerprint, "Generated node keypair");

        let response = SigningClient::new(http, self.settings.request_timeout)
            .sign(
                &credential,
                &metadata,
                &bootstrap_url,
                &keypair.public_key_pem,
                cancel,
            )
            .await
            .map_err(at(Stage::Sign))?;
        tracing::info!(
            lighthouses = response.lighthouses.len(),
            static_hosts = response.static_hosts.len(),
            blocklisted = response.blocklist.len(),
            "Received signed certificate"
        );

        let synth = ConfigSynthesizer::new(self.names.clone(), self.template_search_path.clone());
        let artifacts = synth
            .write(&response, &keypair, &metadata.ca_cert, dir)
            .map_err(at(Stage::Synthesize))?;
        tracing::info!(path = %artifacts.node_config.display(), "Wrote node config");

        Ok(ProvisionOutcome {
            fingerprint: keypair.fingerprint,
            public_key: keypair.public_key_path,
            private_key: keypair.private_key_path,
            artifacts,
        })
    }
}

fn at(stage: Stage) -> impl FnOnce(ProvisionError) -> StageError {
    move |error| StageError { stage, error }
}

/// Determine the bootstrap URL and authentication strategy for `mode`.
fn resolve_bootstrap(
    mode: ProvisionMode,
    dir: &Path,
) -> Result<(String, AuthenticationStrategy), ProvisionError> {
    mode.validate()?;
    match mode {
        ProvisionMode::Enroll { server_url, token } => Ok((
            server_url.trim().to_string(),
            AuthenticationStrategy::OneTimeToken(token),
        )),
        ProvisionMode::Login { server_url } => {
            let server_url = match non_empty(server_url) {
                Some(url) => url,
                None => load_local_metadata(dir)
                    .and_then(|meta| meta.controller_url().map(str::to_string))
                    .ok_or_else(|| {
                        ProvisionError::Configuration(
                            "No server URL in arguments or metadata.json".into(),
                        )
                    })?,
            };
            Ok((server_url, AuthenticationStrategy::Interactive))
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enroll_requires_server_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_bootstrap(
            ProvisionMode::Enroll {
                server_url: "  ".into(),
                token: OneTimeToken::new("ott").unwrap(),
            },
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, ProvisionError::Configuration(_)));
    }

    #[test]
    fn test_validate_needs_no_directory() {
        let enroll = ProvisionMode::Enroll {
            server_url: String::new(),
            token: OneTimeToken::new("ott").unwrap(),
        };
        assert!(matches!(
            enroll.validate(),
            Err(ProvisionError::Configuration(ref msg)) if msg.contains("server URL")
        ));

        assert!(ProvisionMode::Login { server_url: None }.validate().is_ok());
    }

    #[test]
    fn test_login_prefers_explicit_server() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("metadata.json"),
            r#"{"controller_url":"https://from-metadata/api"}"#,
        )
        .unwrap();

        let (url, strategy) = resolve_bootstrap(
            ProvisionMode::Login {
                server_url: Some("https://from-flag/api".into()),
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(url, "https://from-flag/api");
        assert!(matches!(strategy, AuthenticationStrategy::Interactive));
    }

    #[test]
    fn test_login_falls_back_to_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("metadata.json"),
            r#"{"controller_url":"https://from-metadata/api"}"#,
        )
        .unwrap();

        let (url, _) =
            resolve_bootstrap(ProvisionMode::Login { server_url: None }, dir.path()).unwrap();
        assert_eq!(url, "https://from-metadata/api");
    }

    #[test]
    fn test_login_without_any_server_url() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metadata.json"), r#"{"tunnel_name":"home"}"#).unwrap();

        let err = resolve_bootstrap(ProvisionMode::Login { server_url: None }, dir.path())
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Configuration(_)));
    }

    #[test]
    fn test_config_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigDir::open(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ProvisionError::Directory { .. }));

        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        assert!(ConfigDir::open(&file).is_err());

        assert!(ConfigDir::open(dir.path()).unwrap().path().is_absolute());
    }

    #[test]
    fn test_stage_error_message() {
        let err = StageError {
            stage: Stage::Sign,
            error: ProvisionError::ControllerRejected {
                status: "error".into(),
                message: "token already used".into(),
            },
        };
        assert_eq!(err.to_string(), "Could not obtain signed certificate");
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), "token already used");
    }
}
