//! filen-crypto: client-side E2E crypto for the filen CLI
//!
//! Everything the server sees is produced here; nothing leaves the client
//! unencrypted except filename HMACs (which reveal only equality of
//! lowercased names).
//!
//! Key hierarchy:
//! ```text
//! Password ── PBKDF2-SHA-512 (200k) ──► master key (hex, rotates; newest encrypts)
//!   ├── metadata envelope: "002" + 12-char IV + base64(AES-256-GCM)
//!   │     envelope key = PBKDF2-SHA-512(key, key, 1 iter, 32 bytes)  [legacy, byte-exact]
//!   ├── filename HMAC key = PBKDF2-SHA-512(master, lowercase(email), 1 iter, 32 bytes)
//!   └── per-file key (32 random ASCII chars)
//!         └── chunk AEAD: AES-256-GCM, 12-byte random IV prepended, tag appended
//! ```

pub mod chunk;
pub mod envelope;
pub mod kdf;
pub mod names;
pub mod rng;

pub use chunk::{decrypt_chunk, encrypt_chunk};
pub use envelope::{
    decrypt_envelope, decrypt_with_keyring, decode_file_metadata, decode_folder_name,
    encode_folder_name, encrypt_envelope, FileMetadata,
};
pub use kdf::{derive_credentials, derive_envelope_key, derive_name_hmac_key, DerivedCredentials};
pub use names::NameHasher;
pub use rng::{generate_file_key, generate_upload_key, generate_uuid, random_string};

/// AES-GCM nonce length for both envelopes and chunks.
pub const IV_SIZE: usize = 12;

/// GCM authentication tag length.
pub const TAG_SIZE: usize = 16;

/// Length of per-file keys, upload keys, and the envelope IV alphabet draws.
pub const FILE_KEY_LEN: usize = 32;
