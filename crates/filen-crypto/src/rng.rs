//! Secure random material: IV strings, per-file keys, upload keys, and
//! RFC 4122 v4 identifiers.

use rand::{Rng, RngCore};

/// The 64-character alphabet used for every random string the protocol
/// carries: envelope IVs, file keys, upload keys.
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A random string of `len` characters drawn from [`ALPHABET`] using the
/// thread-local CSPRNG.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// A fresh 32-character per-file key. Its ASCII bytes are the AES-256 key
/// for chunk encryption.
pub fn generate_file_key() -> String {
    random_string(crate::FILE_KEY_LEN)
}

/// A fresh 32-character upload key, sent with every chunk of one upload.
pub fn generate_upload_key() -> String {
    random_string(crate::FILE_KEY_LEN)
}

/// A v4 UUID built from 16 CSPRNG bytes with the RFC 4122 version and
/// variant bits patched in, formatted 8-4-4-4-12.
pub fn generate_uuid() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}
