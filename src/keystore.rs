// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.

//! `KeyStore` — key storage and loading. Out of scope for this crate beyond the trait boundary
//! and a static in-memory double for tests.

use ed25519_dalek::Keypair;

use crate::crypto;
use crate::error::{Error, Result};

/// Loads the node's own signing keys. Modeled synchronously: key loading is local I/O in the
/// source (disk, HSM, env var), not a network call.
pub trait KeyStore: Send + Sync {
    /// Returns the hex-encoded public key and the full signing keypair.
    fn load_keys(&self) -> Result<(String, Keypair)>;
}

/// A `KeyStore` over a keypair fixed at construction time, hex-encoded so it can be reloaded
/// without requiring `Keypair: Clone`.
pub struct StaticKeyStore {
    keypair_hex: String,
    public_key_hex: String,
}

impl StaticKeyStore {
    pub fn new(keypair: &Keypair) -> Self {
        Self {
            keypair_hex: hex::encode(keypair.to_bytes()),
            public_key_hex: crypto::encode_public_key(keypair),
        }
    }

    pub fn generate() -> (Self, Keypair) {
        let mut rng = rand::rngs::OsRng;
        let keypair = Keypair::generate(&mut rng);
        (Self::new(&keypair), keypair)
    }
}

impl KeyStore for StaticKeyStore {
    fn load_keys(&self) -> Result<(String, Keypair)> {
        let bytes = hex::decode(&self.keypair_hex).map_err(|e| Error::Crypto(e.to_string()))?;
        let keypair = Keypair::from_bytes(&bytes).map_err(|e| Error::Crypto(e.to_string()))?;
        Ok((self.public_key_hex.clone(), keypair))
    }
}
