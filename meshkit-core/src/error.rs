//! Provisioning error taxonomy.

use std::io;
use std::path::PathBuf;

use meshkit_auth::{EnrollmentError, KeyError};

/// Coarse classification of a [`ProvisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Directory,
    Network,
    Protocol,
    Authentication,
    Filesystem,
    KeyGeneration,
    Cancelled,
}

/// Errors that can occur while provisioning a node identity.
///
/// Every variant is fatal to a run. Library code only returns these; the
/// binary decides how the process ends.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// A required input is missing or malformed.
    #[error("{0}")]
    Configuration(String),

    /// The configuration directory cannot be used.
    #[error("cannot use config directory {}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Transport failure reaching the controller or identity provider.
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A request exceeded its deadline.
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The operation was cancelled by the operator.
    #[error("cancelled")]
    Cancelled,

    /// The controller answered with a non-success status or a malformed body.
    #[error("unexpected response from {url}: {detail}")]
    Protocol { url: String, detail: String },

    /// The enrollment endpoint rejected the request with a structured error.
    #[error("{message}")]
    ControllerRejected { status: String, message: String },

    /// Interactive login was denied, timed out, or the provider misbehaved.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A generated artifact could not be written.
    #[error("cannot access {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Key material could not be produced.
    #[error("key generation failed")]
    KeyGeneration(#[source] KeyError),
}

impl ProvisionError {
    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::Configuration(_) => ErrorKind::Configuration,
            ProvisionError::Directory { .. } => ErrorKind::Directory,
            ProvisionError::Network { .. } | ProvisionError::Timeout { .. } => ErrorKind::Network,
            ProvisionError::Protocol { .. } | ProvisionError::ControllerRejected { .. } => {
                ErrorKind::Protocol
            }
            ProvisionError::Authentication(_) => ErrorKind::Authentication,
            ProvisionError::Filesystem { .. } => ErrorKind::Filesystem,
            ProvisionError::KeyGeneration(_) => ErrorKind::KeyGeneration,
            ProvisionError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProvisionError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn protocol(url: impl Into<String>, detail: impl Into<String>) -> Self {
        ProvisionError::Protocol {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

impl From<EnrollmentError> for ProvisionError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::EmptyAccessToken => ProvisionError::Authentication(err.to_string()),
            _ => ProvisionError::Configuration(err.to_string()),
        }
    }
}
