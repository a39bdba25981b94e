//! Ephemeral node keypair generation.
//!
//! Each run replaces the keypair in the config directory. There is no key
//! history: the signed certificate written later in the same run is only
//! valid with the private key generated here.

use std::path::{Path, PathBuf};

use meshkit_auth::identity::{Fingerprint, OsRandom, PrivateKey, RandomSource};
use meshkit_auth::ArtifactNames;

use crate::error::ProvisionError;

/// A freshly generated keypair and where it was written.
#[derive(Debug, Clone)]
pub struct GeneratedKeyPair {
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
    /// PEM form of the public key, exactly as written to `public_key_path`.
    pub public_key_pem: String,
    pub fingerprint: Fingerprint,
}

/// Generates and persists node keypairs.
pub struct KeyPairProvisioner<R = OsRandom> {
    rng: R,
}

impl KeyPairProvisioner<OsRandom> {
    /// A provisioner backed by the OS CSPRNG.
    pub fn new() -> Self {
        Self { rng: OsRandom }
    }
}

impl Default for KeyPairProvisioner<OsRandom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RandomSource> KeyPairProvisioner<R> {
    /// A provisioner drawing key material from `rng`.
    pub fn with_random_source(rng: R) -> Self {
        Self { rng }
    }

    /// Generate a keypair and write it into `dir`, replacing any previous one.
    ///
    /// Key material is generated before any file is touched, so a randomness
    /// failure leaves the directory unchanged.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration` if the randomness source fails
    /// - `Filesystem` if either key file cannot be written
    pub fn generate(
        &mut self,
        dir: &Path,
        names: &ArtifactNames,
    ) -> Result<GeneratedKeyPair, ProvisionError> {
        let private_key =
            PrivateKey::generate_with(&mut self.rng).map_err(ProvisionError::KeyGeneration)?;
        let public_key = private_key.public_key();
        let public_key_pem = public_key.to_pem();

        let public_key_path = dir.join(&names.public_key);
        replace_owner_only(&public_key_path, public_key_pem.as_bytes())?;

        let private_key_path = dir.join(&names.private_key);
        replace_owner_only(&private_key_path, private_key.to_pem().as_bytes())?;

        Ok(GeneratedKeyPair {
            public_key_path,
            private_key_path,
            public_key_pem,
            fingerprint: Fingerprint::from_public_key(&public_key),
        })
    }
}

/// Remove `path` if present, then create it readable only by the owner.
pub(crate) fn replace_owner_only(path: &Path, contents: &[u8]) -> Result<(), ProvisionError> {
    remove_existing(path)?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| ProvisionError::filesystem(path, e))?;
    std::io::Write::write_all(&mut file, contents).map_err(|e| ProvisionError::filesystem(path, e))
}

/// Remove `path`, treating "already absent" as success.
pub(crate) fn remove_existing(path: &Path) -> Result<(), ProvisionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProvisionError::filesystem(path, e)),
    }
}
