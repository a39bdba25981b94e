//! X25519 node identity types.
//!
//! The overlay handshake uses X25519, so a node identity is a 32-byte scalar
//! plus its public point:
//! - Private keys are zeroized on drop and never printed
//! - Key generation draws from an injectable [`RandomSource`] and fails loudly
//!   instead of falling back to weaker material
//! - Fingerprint format: `SHA256:{url_safe_base64_no_padding}`

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::pem;

/// Length in bytes of both halves of an X25519 keypair.
pub const KEY_LEN: usize = 32;

/// Errors that can occur during key operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum KeyError {
    /// The randomness source could not produce key material.
    #[error("randomness source failed: {0}")]
    Entropy(String),

    /// The provided bytes have an invalid length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The PEM armor is missing, has the wrong label or holds invalid base64.
    #[error("invalid PEM block: {0}")]
    InvalidPem(String),
}

impl KeyError {
    /// Whether this error came from the randomness source.
    ///
    /// Entropy failures are never recoverable: continuing would mean running
    /// with predictable key material.
    #[must_use]
    pub fn is_entropy_failure(&self) -> bool {
        matches!(self, KeyError::Entropy(_))
    }
}

/// Source of key material.
///
/// Production code uses [`OsRandom`]. Tests substitute a failing source to
/// exercise the abort path without touching the real CSPRNG.
pub trait RandomSource {
    /// Fill `dest` entirely with random bytes or fail.
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), KeyError>;
}

/// The operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), KeyError> {
        rand::rngs::OsRng
            .try_fill_bytes(dest)
            .map_err(|e| KeyError::Entropy(e.to_string()))
    }
}

/// A zeroize-on-drop wrapper for secret bytes.
///
/// Used for the PEM-armored private key so the encoded form doesn't linger
/// in memory either.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Get a reference to the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A private X25519 key.
///
/// # Security
///
/// - Zeroized on drop (`StaticSecret` implements `ZeroizeOnDrop`)
/// - No `Debug` implementation to prevent accidental logging
pub struct PrivateKey(x25519_dalek::StaticSecret);

impl PrivateKey {
    /// Generate a new private key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Entropy` if the OS cannot supply randomness.
    pub fn generate() -> Result<Self, KeyError> {
        Self::generate_with(&mut OsRandom)
    }

    /// Generate a new private key from the given randomness source.
    ///
    /// The raw random bytes are kept as-is; clamping happens inside the
    /// scalar multiplication.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Entropy` if the source fails.
    pub fn generate_with(rng: &mut impl RandomSource) -> Result<Self, KeyError> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rng.try_fill(&mut bytes[..])?;
        // StaticSecret only accepts the scalar by value. The buffer here is
        // wiped on return; the by-value argument copy is not reachable.
        Ok(Self(x25519_dalek::StaticSecret::from(*bytes)))
    }

    /// Load a private key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidLength` if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(x25519_dalek::StaticSecret::from(bytes)))
    }

    /// Derive the public key from this private key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(x25519_dalek::PublicKey::from(&self.0))
    }

    /// Export the raw private key bytes.
    ///
    /// # Security
    ///
    /// Handle with extreme care.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.0.to_bytes()
    }

    /// Export the private key as a `NEBULA X25519 PRIVATE KEY` PEM block.
    #[must_use]
    pub fn to_pem(&self) -> SecretBytes {
        let raw = Zeroizing::new(self.0.to_bytes());
        SecretBytes(pem::encode(pem::PRIVATE_KEY_LABEL, &raw[..]).into_bytes())
    }

    /// Load a private key from a `NEBULA X25519 PRIVATE KEY` PEM block.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidPem` or `KeyError::InvalidLength`.
    pub fn from_pem(text: &str) -> Result<Self, KeyError> {
        let raw = Zeroizing::new(pem::decode(pem::PRIVATE_KEY_LABEL, text)?);
        Self::from_bytes(&raw)
    }
}

// Explicitly NO Debug implementation for PrivateKey

/// A public X25519 key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(x25519_dalek::PublicKey);

impl PublicKey {
    /// Load a public key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidLength` if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(x25519_dalek::PublicKey::from(bytes)))
    }

    /// Export the raw public key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.0.to_bytes()
    }

    /// Export the public key as a `NEBULA X25519 PUBLIC KEY` PEM block.
    ///
    /// This is the form the controller expects in signing requests.
    #[must_use]
    pub fn to_pem(&self) -> String {
        pem::encode(pem::PUBLIC_KEY_LABEL, self.0.as_bytes())
    }

    /// Load a public key from a `NEBULA X25519 PUBLIC KEY` PEM block.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidPem` or `KeyError::InvalidLength`.
    pub fn from_pem(text: &str) -> Result<Self, KeyError> {
        Self::from_bytes(&pem::decode(pem::PUBLIC_KEY_LABEL, text)?)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", Fingerprint::from_public_key(self))
    }
}

/// A SHA-256 fingerprint of a public key.
///
/// Format: `SHA256:{base64_no_padding}`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The prefix used for fingerprint strings.
    pub const PREFIX: &'static str = "SHA256:";

    /// Create a fingerprint from a public key.
    #[must_use]
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let hash = Sha256::digest(public_key.to_bytes());
        Self(format!("{}{}", Self::PREFIX, URL_SAFE_NO_PAD.encode(hash)))
    }

    /// Get the fingerprint as a string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingRandom;

    impl RandomSource for FailingRandom {
        fn try_fill(&mut self, _dest: &mut [u8]) -> Result<(), KeyError> {
            Err(KeyError::Entropy("entropy pool unavailable".into()))
        }
    }

    struct FixedRandom(u8);

    impl RandomSource for FixedRandom {
        fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), KeyError> {
            dest.fill(self.0);
            Ok(())
        }
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = PrivateKey::generate().unwrap();
        let b = PrivateKey::generate().unwrap();

        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_failing_random_source_is_entropy_error() {
        let err = PrivateKey::generate_with(&mut FailingRandom)
            .err()
            .expect("generation must fail");

        assert!(err.is_entropy_failure());
        assert!(!KeyError::InvalidPem("x".into()).is_entropy_failure());
    }

    #[test]
    fn test_raw_bytes_are_kept_unclamped() {
        let key = PrivateKey::generate_with(&mut FixedRandom(0xFF)).unwrap();
        assert_eq!(key.to_bytes(), [0xFF; KEY_LEN]);
    }

    #[test]
    fn test_public_key_matches_diffie_hellman_basepoint() {
        let key = PrivateKey::generate_with(&mut FixedRandom(7)).unwrap();
        let expected = x25519_dalek::x25519([7; KEY_LEN], x25519_dalek::X25519_BASEPOINT_BYTES);
        assert_eq!(key.public_key().to_bytes(), expected);
    }

    #[test]
    fn test_public_pem_roundtrip() {
        let key = PrivateKey::generate().unwrap();
        let pem = key.public_key().to_pem();

        assert!(pem.starts_with("-----BEGIN NEBULA X25519 PUBLIC KEY-----\n"));
        assert!(pem.ends_with("-----END NEBULA X25519 PUBLIC KEY-----\n"));
        assert_eq!(PublicKey::from_pem(&pem).unwrap(), key.public_key());
    }

    #[test]
    fn test_private_pem_roundtrip() {
        let key = PrivateKey::generate().unwrap();
        let pem = key.to_pem();
        let text = std::str::from_utf8(pem.as_bytes()).unwrap();

        let restored = PrivateKey::from_pem(text).unwrap();
        assert_eq!(restored.to_bytes(), key.to_bytes());
    }

    #[test]
    fn test_public_pem_rejected_as_private() {
        let key = PrivateKey::generate().unwrap();
        let pem = key.public_key().to_pem();
        assert!(matches!(
            PrivateKey::from_pem(&pem),
            Err(KeyError::InvalidPem(_))
        ));
    }

    #[test]
    fn test_fingerprint_format() {
        let key = PrivateKey::generate().unwrap();
        let fingerprint = Fingerprint::from_public_key(&key.public_key());

        assert!(fingerprint.as_str().starts_with("SHA256:"));
        // 7 (prefix) + 43 (base64 of 32 bytes, no padding)
        assert_eq!(fingerprint.as_str().len(), 50);
    }

    #[test]
    fn test_fingerprint_is_stable_per_key() {
        let key = PrivateKey::generate_with(&mut FixedRandom(3)).unwrap();
        let other = PrivateKey::generate_with(&mut FixedRandom(4)).unwrap();

        assert_eq!(
            Fingerprint::from_public_key(&key.public_key()),
            Fingerprint::from_public_key(&key.public_key())
        );
        assert_ne!(
            Fingerprint::from_public_key(&key.public_key()),
            Fingerprint::from_public_key(&other.public_key())
        );
    }

    #[test]
    fn test_invalid_key_lengths() {
        assert!(PrivateKey::from_bytes(&[0u8; 16]).is_err());
        assert!(PublicKey::from_bytes(&[0u8; 16]).is_err());
        assert!(PrivateKey::from_bytes(&[0u8; 64]).is_err());
        assert!(PublicKey::from_bytes(&[0u8; 64]).is_err());
    }
}
