//! Node identity types for overlay membership.
//!
//! - [`PrivateKey`] - X25519 scalar with automatic zeroization on drop
//! - [`PublicKey`] - the public point submitted to the controller for signing
//! - [`Fingerprint`] - `SHA256:{base64_no_padding}` of the public key
//! - [`RandomSource`] - injectable randomness; [`OsRandom`] in production
//!
//! # Example
//!
//! ```
//! use meshkit_auth::identity::{Fingerprint, PrivateKey};
//!
//! let private_key = PrivateKey::generate().expect("OS randomness available");
//! let public_key = private_key.public_key();
//!
//! let pem = public_key.to_pem();
//! assert!(pem.contains("NEBULA X25519 PUBLIC KEY"));
//!
//! println!("Key fingerprint: {}", Fingerprint::from_public_key(&public_key));
//! ```

mod keys;
pub mod pem;

pub use keys::{
    Fingerprint, KeyError, OsRandom, PrivateKey, PublicKey, RandomSource, SecretBytes, KEY_LEN,
};
