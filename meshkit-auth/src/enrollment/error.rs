//! Enrollment error types.

/// Errors that can occur while building enrollment credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EnrollmentError {
    /// The one-time token was empty or whitespace.
    #[error("one-time token is empty")]
    EmptyToken,

    /// The identity provider returned an empty access token.
    #[error("access token is empty")]
    EmptyAccessToken,
}
