//! The "002" text envelope: the only shape metadata takes on the wire.
//!
//! Layout: `"002" + iv + base64(ciphertext‖tag)` where `iv` is 12 ASCII
//! characters from the random-string alphabet and its UTF-8 bytes are the
//! AES-256-GCM nonce. Decoding rejects anything without the "002" prefix.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use filen_core::{FilenError, Result};

use crate::kdf::derive_envelope_key;
use crate::rng::random_string;
use crate::IV_SIZE;

pub const VERSION_TAG: &str = "002";

fn cipher_for(key: &str) -> Result<Aes256Gcm> {
    let ek = derive_envelope_key(key);
    Aes256Gcm::new_from_slice(&ek)
        .map_err(|_| anyhow::anyhow!("envelope cipher construction failed").into())
}

/// Seal a plaintext string under a printable key.
pub fn encrypt_envelope(plaintext: &str, key: &str) -> Result<String> {
    let cipher = cipher_for(key)?;
    let iv = random_string(IV_SIZE);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(iv.as_bytes()), plaintext.as_bytes())
        .map_err(|_| anyhow::anyhow!("envelope encryption failed"))?;
    Ok(format!("{VERSION_TAG}{iv}{}", BASE64.encode(ciphertext)))
}

/// Open an envelope under a single key. Any malformation or tag mismatch
/// collapses into `DecryptFailed`: the caller iterates a key ring and only
/// cares whether this key worked.
pub fn decrypt_envelope(envelope: &str, key: &str) -> Result<String> {
    if !envelope.starts_with(VERSION_TAG) {
        return Err(FilenError::DecryptFailed);
    }
    let iv = envelope
        .get(VERSION_TAG.len()..VERSION_TAG.len() + IV_SIZE)
        .ok_or(FilenError::DecryptFailed)?;
    let body = envelope
        .get(VERSION_TAG.len() + IV_SIZE..)
        .ok_or(FilenError::DecryptFailed)?;
    let ciphertext = BASE64.decode(body).map_err(|_| FilenError::DecryptFailed)?;

    let cipher = cipher_for(key)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv.as_bytes()), ciphertext.as_ref())
        .map_err(|_| FilenError::DecryptFailed)?;
    String::from_utf8(plaintext).map_err(|_| FilenError::DecryptFailed)
}

/// Open an envelope against the identity's master keys, newest first.
pub fn decrypt_with_keyring(envelope: &str, keys: &[String]) -> Result<String> {
    for key in keys.iter().rev() {
        if let Ok(plaintext) = decrypt_envelope(envelope, key) {
            return Ok(plaintext);
        }
    }
    Err(FilenError::DecryptFailed)
}

/// The JSON object inside a file's `metadata` envelope. This is the
/// authoritative record on read; the redundant per-field envelopes the
/// upload endpoints want (`name`, `size`, `mime` under the file key) are
/// write-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime: String,
    /// 32-character per-file key for chunk encryption.
    pub key: String,
    /// Lowercase hex SHA-512 of the plaintext; empty for empty files.
    #[serde(default)]
    pub hash: String,
    #[serde(rename = "lastModified", default)]
    pub last_modified: i64,
}

impl FileMetadata {
    /// Seal under the given (most recent) master key.
    pub fn encode(&self, master_key: &str) -> Result<String> {
        encrypt_envelope(&serde_json::to_string(self)?, master_key)
    }
}

/// Decrypt and parse a file metadata envelope against the key ring.
pub fn decode_file_metadata(envelope: &str, keys: &[String]) -> Result<FileMetadata> {
    let json = decrypt_with_keyring(envelope, keys)?;
    serde_json::from_str(&json).map_err(|_| FilenError::DecryptFailed)
}

/// Decrypt a folder name record. Names are stored either as a JSON object
/// `{"name": ...}` or as a raw string; a leading `{` discriminates.
pub fn decode_folder_name(envelope: &str, keys: &[String]) -> Result<String> {
    let plaintext = decrypt_with_keyring(envelope, keys)?;
    if plaintext.starts_with('{') {
        #[derive(Deserialize)]
        struct NameRecord {
            name: String,
        }
        serde_json::from_str::<NameRecord>(&plaintext)
            .map(|r| r.name)
            .map_err(|_| FilenError::DecryptFailed)
    } else {
        Ok(plaintext)
    }
}

/// Seal a folder name in the JSON form the web clients expect.
pub fn encode_folder_name(name: &str, key: &str) -> Result<String> {
    encrypt_envelope(&serde_json::json!({ "name": name }).to_string(), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let sealed = encrypt_envelope("hello metadata", "master-key-1").unwrap();
        assert!(sealed.starts_with("002"));
        let opened = decrypt_envelope(&sealed, "master-key-1").unwrap();
        assert_eq!(opened, "hello metadata");
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = encrypt_envelope("secret", "key-a").unwrap();
        assert!(matches!(
            decrypt_envelope(&sealed, "key-b"),
            Err(FilenError::DecryptFailed)
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let sealed = encrypt_envelope("x", "k").unwrap();
        let forged = format!("001{}", &sealed[3..]);
        assert!(matches!(
            decrypt_envelope(&forged, "k"),
            Err(FilenError::DecryptFailed)
        ));
    }

    #[test]
    fn rejects_truncated_envelope() {
        assert!(matches!(
            decrypt_envelope("002abc", "k"),
            Err(FilenError::DecryptFailed)
        ));
    }

    #[test]
    fn keyring_tries_newest_first_then_older() {
        let keys: Vec<String> = vec!["oldest".into(), "middle".into(), "newest".into()];
        let sealed_old = encrypt_envelope("written long ago", "oldest").unwrap();
        assert_eq!(
            decrypt_with_keyring(&sealed_old, &keys).unwrap(),
            "written long ago"
        );
        let sealed_new = encrypt_envelope("fresh", "newest").unwrap();
        assert_eq!(decrypt_with_keyring(&sealed_new, &keys).unwrap(), "fresh");
    }

    #[test]
    fn keyring_exhaustion_is_decrypt_failed() {
        let keys: Vec<String> = vec!["a".into(), "b".into()];
        let sealed = encrypt_envelope("x", "c").unwrap();
        assert!(matches!(
            decrypt_with_keyring(&sealed, &keys),
            Err(FilenError::DecryptFailed)
        ));
    }

    #[test]
    fn file_metadata_roundtrip() {
        let meta = FileMetadata {
            name: "report.pdf".into(),
            size: 3_500_000,
            mime: "application/pdf".into(),
            key: "A".repeat(32),
            hash: "ab".repeat(64),
            last_modified: 1_700_000_000_000,
        };
        let sealed = meta.encode("mk").unwrap();
        let keys = vec!["mk".to_string()];
        let decoded = decode_file_metadata(&sealed, &keys).unwrap();
        assert_eq!(decoded.name, "report.pdf");
        assert_eq!(decoded.size, 3_500_000);
        assert_eq!(decoded.last_modified, 1_700_000_000_000);
    }

    #[test]
    fn folder_name_json_and_raw_forms() {
        let keys = vec!["mk".to_string()];

        let json_form = encode_folder_name("Photos", "mk").unwrap();
        assert_eq!(decode_folder_name(&json_form, &keys).unwrap(), "Photos");

        let raw_form = encrypt_envelope("Documents", "mk").unwrap();
        assert_eq!(decode_folder_name(&raw_form, &keys).unwrap(), "Documents");
    }

    #[test]
    fn metadata_json_uses_wire_field_name() {
        let meta = FileMetadata {
            name: "x".into(),
            size: 0,
            mime: String::new(),
            key: String::new(),
            hash: String::new(),
            last_modified: 1,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"lastModified\""));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn envelope_roundtrip(plaintext in ".{0,256}", key in "[a-zA-Z0-9]{1,64}") {
                let sealed = encrypt_envelope(&plaintext, &key).unwrap();
                prop_assert_eq!(decrypt_envelope(&sealed, &key).unwrap(), plaintext);
            }

            #[test]
            fn envelope_other_key_fails(
                plaintext in ".{0,64}",
                key in "[a-z]{8,16}",
                other in "[A-Z]{8,16}",
            ) {
                let sealed = encrypt_envelope(&plaintext, &key).unwrap();
                prop_assert!(decrypt_envelope(&sealed, &other).is_err());
            }
        }
    }
}
