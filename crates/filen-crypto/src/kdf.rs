//! Password-derived keys: PBKDF2-HMAC-SHA-512 throughout.

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};

/// Iteration count for the password KDF.
pub const PASSWORD_ITERATIONS: u32 = 200_000;

/// The two credentials derived from a password at login time.
///
/// `master_key` never leaves the client; `login_password` is what the
/// server sees in `/v3/login`.
#[derive(Clone)]
pub struct DerivedCredentials {
    pub master_key: String,
    pub login_password: String,
}

impl std::fmt::Debug for DerivedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedCredentials")
            .field("master_key", &"[REDACTED]")
            .field("login_password", &"[REDACTED]")
            .finish()
    }
}

/// Derive the local master key and the login password from the account
/// password and the server-provided salt.
///
/// Auth version 2 (current): PBKDF2 yields 64 bytes, hex-encoded to 128
/// chars; the first half is the master key, the second half is SHA-512'd
/// once more to form the login password. Auth version 1 (legacy) uses the
/// full 128-hex string for both.
pub fn derive_credentials(
    password: &SecretString,
    salt: &str,
    auth_version: u32,
) -> DerivedCredentials {
    let mut dk = [0u8; 64];
    pbkdf2_hmac::<Sha512>(
        password.expose_secret().as_bytes(),
        salt.as_bytes(),
        PASSWORD_ITERATIONS,
        &mut dk,
    );
    let dk_hex = hex::encode(dk);

    if auth_version >= 2 {
        let master_key = dk_hex[..64].to_string();
        let login_password = hex::encode(Sha512::digest(dk_hex[64..].as_bytes()));
        DerivedCredentials {
            master_key,
            login_password,
        }
    } else {
        DerivedCredentials {
            master_key: dk_hex.clone(),
            login_password: dk_hex,
        }
    }
}

/// Derive the 32-byte AES key for a text envelope from its printable key
/// string: PBKDF2-HMAC-SHA-512(k, k, 1 iteration).
///
/// A single iteration with the key as its own salt is a legacy construction
/// the wire format fixes; it must stay byte-exact.
pub fn derive_envelope_key(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha512>(key.as_bytes(), key.as_bytes(), 1, &mut out);
    out
}

/// Derive the per-identity filename HMAC key from the newest master key and
/// the lowercased account email.
pub fn derive_name_hmac_key(master_key: &str, email: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha512>(
        master_key.as_bytes(),
        email.to_lowercase().as_bytes(),
        1,
        &mut out,
    );
    out
}
