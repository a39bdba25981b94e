//! # Meshkit Core
//!
//! Client-side provisioning for mesh overlay nodes: everything that touches the
//! network or the filesystem. Domain types live in `meshkit-auth`.
//!
//! ## Modules
//!
//! - [`directory`] - Controller metadata discovery and the local `metadata.json` hint
//! - [`auth`] - Authentication strategies and the OIDC device login
//! - [`keystore`] - Keypair generation and owner-only persistence
//! - [`signing`] - Certificate signing requests
//! - [`synth`] - Certificate, CA and node config output
//! - [`pipeline`] - The staged provisioning run tying the above together
//!
//! Library code never exits the process; every failure is returned as a
//! [`ProvisionError`] (wrapped in a [`StageError`] by the pipeline).

pub mod auth;
pub mod directory;
pub mod error;
pub mod keystore;
pub mod net;
pub mod pipeline;
pub mod settings;
pub mod signing;
pub mod synth;

pub use auth::{AuthenticationStrategy, Credential};
pub use directory::ControllerDirectory;
pub use error::{ErrorKind, ProvisionError};
pub use keystore::{GeneratedKeyPair, KeyPairProvisioner};
pub use pipeline::{ConfigDir, ProvisionMode, ProvisionOutcome, Provisioner, Stage, StageError};
pub use settings::ClientSettings;
pub use signing::SigningClient;
pub use synth::{ConfigSynthesizer, WrittenArtifacts};
