//! Identity and protocol types for meshkit.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No logging
//!
//! Randomness is injected through [`identity::RandomSource`] so key generation
//! failures can be exercised in tests.

pub mod enrollment;
pub mod identity;
pub mod node_config;
pub mod wire;

pub use enrollment::{BearerToken, EnrollmentError, OneTimeToken};
pub use identity::{Fingerprint, KeyError, OsRandom, PrivateKey, PublicKey, RandomSource};
pub use node_config::{ArtifactNames, LighthouseConfig, NodeConfig, PkiConfig};
pub use wire::{
    ControllerError, ControllerMetadata, EnrollmentRequest, SigningRequest, SigningResponse,
    TunnelMetadata,
};
