//! Per-chunk AES-256-GCM.
//!
//! Chunk wire format (binary):
//! ```text
//! [12 bytes: random IV][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//! The AES key is the 32 ASCII bytes of the per-file key, used directly;
//! chunk bodies do not go through the envelope KDF.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;

use filen_core::{FilenError, Result};

use crate::{FILE_KEY_LEN, IV_SIZE, TAG_SIZE};

fn chunk_cipher(file_key: &str) -> Result<Aes256Gcm> {
    if file_key.len() != FILE_KEY_LEN {
        return Err(anyhow::anyhow!(
            "file key must be {FILE_KEY_LEN} bytes, got {}",
            file_key.len()
        )
        .into());
    }
    Aes256Gcm::new_from_slice(file_key.as_bytes())
        .map_err(|_| anyhow::anyhow!("chunk cipher construction failed").into())
}

/// Encrypt one plaintext chunk under the per-file key with a fresh IV.
pub fn encrypt_chunk(file_key: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = chunk_cipher(file_key)?;
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| anyhow::anyhow!("chunk encryption failed"))?;

    let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt one chunk body: the literal first 12 bytes are the IV, the rest
/// is ciphertext plus tag.
pub fn decrypt_chunk(file_key: &str, body: &[u8]) -> Result<Vec<u8>> {
    if body.len() < IV_SIZE + TAG_SIZE {
        return Err(FilenError::DecryptFailed);
    }
    let (iv, ciphertext) = body.split_at(IV_SIZE);
    let cipher = chunk_cipher(file_key)?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| FilenError::DecryptFailed)
}
