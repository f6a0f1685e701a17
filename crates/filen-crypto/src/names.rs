//! Deterministic filename hashing for server-side lookup.
//!
//! The server never sees plaintext names; it indexes files by
//! HMAC-SHA-256 of the lowercased name under a per-identity key. Equal
//! lowercased names collide on purpose; that is what makes `file/exists`
//! and rename-target checks possible.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::kdf::derive_name_hmac_key;

/// Per-identity name hasher. Construct once per session from the newest
/// master key and the account email.
#[derive(Clone)]
pub struct NameHasher {
    key: [u8; 32],
}

impl NameHasher {
    pub fn new(master_key: &str, email: &str) -> Self {
        Self {
            key: derive_name_hmac_key(master_key, email),
        }
    }

    /// Lowercase hex HMAC-SHA-256 over the lowercased name.
    pub fn hash(&self, name: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .expect("HMAC accepts any key length");
        mac.update(name.to_lowercase().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for NameHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameHasher").finish_non_exhaustive()
    }
}
