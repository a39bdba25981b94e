//! Opaque credential wrappers.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::EnrollmentError;

/// A single-use enrollment token issued by the controller out-of-band.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OneTimeToken(String);

impl OneTimeToken {
    /// Wrap a token, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::EmptyToken` if nothing remains after trimming.
    pub fn new(token: &str) -> Result<Self, EnrollmentError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EnrollmentError::EmptyToken);
        }
        Ok(Self(token.to_string()))
    }

    /// The raw token value, for placing on the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OneTimeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimeToken(<redacted>)")
    }
}

/// An access token returned by the identity provider.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap an access token.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::EmptyAccessToken` for an empty value.
    pub fn new(token: impl Into<String>) -> Result<Self, EnrollmentError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(EnrollmentError::EmptyAccessToken);
        }
        Ok(Self(token))
    }

    /// The raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The value of an `Authorization` header carrying this token.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}
