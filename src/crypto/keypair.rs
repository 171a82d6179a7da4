//! ed25519 keypair generation.

use std::fmt;

use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;

/// An ed25519 keypair as OpenSSH stores it.
///
/// The secret lives inside a [`SigningKey`], which wipes itself on drop.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a new random keypair from the operating system CSPRNG.
    ///
    /// Fails only when the entropy source does.
    #[inline]
    pub fn generate() -> Result<Self, rand::Error> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng.try_fill_bytes(&mut seed)?;
        Ok(Self::from_seed(&seed))
    }

    /// Builds a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Rebuilds a keypair from the 64-byte OpenSSH private key (seed followed
    /// by public key). Returns `None` if the public half does not belong to
    /// the seed.
    pub fn from_private_key(bytes: &[u8; KEYPAIR_LENGTH]) -> Option<Self> {
        SigningKey::from_keypair_bytes(bytes)
            .ok()
            .map(|signing_key| Self { signing_key })
    }

    /// Returns the raw 32-byte public key.
    #[inline]
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Returns the 32-byte seed.
    pub fn seed(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// Returns the 64-byte private key in OpenSSH order: seed, then public key.
    pub fn private_key(&self) -> [u8; KEYPAIR_LENGTH] {
        self.signing_key.to_keypair_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.private_key() == other.private_key()
    }
}

impl Eq for KeyPair {}
