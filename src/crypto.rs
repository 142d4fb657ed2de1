// Copyright the Libr Contributors.
//
// This software is licensed to you under the GNU General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied.

//! Detached-signature primitives over Ed25519, operating on hex-encoded `text` fields.
//!
//! Canonicalization of the signed payload is the caller's responsibility (see
//! [`crate::types::canonical_auto_payload`] and [`crate::types::canonical_manual_payload`]);
//! these primitives only sign and verify whatever bytes they are handed.

use ed25519_dalek::{Keypair, PublicKey, Signature, Signer, Verifier};

use crate::error::{Error, Result};

/// Sign `payload` with `keypair`, returning a hex-encoded detached signature.
pub fn sign(keypair: &Keypair, payload: &[u8]) -> String {
    let sig: Signature = keypair.sign(payload);
    hex::encode(sig.to_bytes())
}

/// Verify `sig_hex` over `payload` under `public_key_hex`.
///
/// Never panics and never returns an error: malformed hex, a wrong-length key, or a
/// wrong-length signature are all treated as verification failure, matching the source's
/// "Verify never throws" contract.
pub fn verify(public_key_hex: &str, payload: &[u8], sig_hex: &str) -> bool {
    let key_bytes = match hex::decode(public_key_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let public_key = match PublicKey::from_bytes(&key_bytes) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let sig_bytes = match hex::decode(sig_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match Signature::from_bytes(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    public_key.verify(payload, &signature).is_ok()
}

/// Hex-encode a public key for wire transmission.
pub fn encode_public_key(keypair: &Keypair) -> String {
    hex::encode(keypair.public.to_bytes())
}

/// Load an Ed25519 keypair from a 64-byte hex-encoded secret+public concatenation, as produced
/// by [`ed25519_dalek::Keypair::to_bytes`].
pub fn keypair_from_hex(hex_bytes: &str) -> Result<Keypair> {
    let bytes = hex::decode(hex_bytes).map_err(|e| Error::Crypto(e.to_string()))?;
    Keypair::from_bytes(&bytes).map_err(|e| Error::Crypto(e.to_string()))
}
