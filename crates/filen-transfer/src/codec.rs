//! Fixed-size chunk math and plaintext hashing.
//!
//! Chunks are exactly 1 MiB of plaintext; the last chunk is the remainder.
//! The total-file hash is a single SHA-512 stream over plaintext in chunk
//! order; on resume the already-uploaded prefix is re-read locally and fed
//! through a fresh state, so the finalized hash always covers the whole
//! file no matter how many interruptions happened.

use sha2::{Digest, Sha512};
use std::path::Path;
use tokio::io::AsyncReadExt;

use filen_core::Result;

pub const CHUNK_SIZE: u64 = 1_048_576;

/// `ceil(size / 1 MiB)`. Empty files have zero chunks.
pub fn chunk_count(size: u64) -> u32 {
    size.div_ceil(CHUNK_SIZE) as u32
}

/// Plaintext length of chunk `index` within a file of `size` bytes.
pub fn chunk_len(size: u64, index: u32) -> usize {
    let start = index as u64 * CHUNK_SIZE;
    (size.saturating_sub(start)).min(CHUNK_SIZE) as usize
}

/// Lowercase hex SHA-512 over a ciphertext chunk body (IV prefix
/// included): the per-chunk content hash the ingest endpoint verifies.
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Sha512::digest(body))
}

/// Streaming SHA-512 over plaintext. Finalizes to the empty string for
/// zero input, matching the wire rule that empty files carry no hash.
pub struct TotalHasher {
    inner: Sha512,
    bytes: u64,
}

impl TotalHasher {
    pub fn new() -> Self {
        Self {
            inner: Sha512::new(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.bytes += data.len() as u64;
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn finalize_hex(self) -> String {
        if self.bytes == 0 {
            String::new()
        } else {
            hex::encode(self.inner.finalize())
        }
    }
}

impl Default for TotalHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream a local file through SHA-512 in chunk-sized reads.
/// Returns (hash, size); the hash is empty for an empty file.
pub async fn hash_local_file(path: &Path) -> Result<(String, u64)> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = TotalHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE as usize];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let size = hasher.bytes();
    Ok((hasher.finalize_hex(), size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_boundaries() {
        assert_eq!(chunk_count(0), 0);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(CHUNK_SIZE), 1);
        assert_eq!(chunk_count(CHUNK_SIZE + 1), 2);
        assert_eq!(chunk_count(3_500_000), 4);
    }

    #[test]
    fn chunk_len_of_last_chunk() {
        assert_eq!(chunk_len(3_500_000, 0), CHUNK_SIZE as usize);
        assert_eq!(chunk_len(3_500_000, 3), 3_500_000 - 3 * CHUNK_SIZE as usize);
        // exact multiple: the last chunk is full-size
        assert_eq!(chunk_len(2 * CHUNK_SIZE, 1), CHUNK_SIZE as usize);
    }

    #[test]
    fn empty_input_hashes_to_empty_string() {
        assert_eq!(TotalHasher::new().finalize_hex(), "");
    }

    #[test]
    fn total_hash_matches_one_shot_digest() {
        let data = b"some plaintext worth hashing";
        let mut hasher = TotalHasher::new();
        hasher.update(data);
        assert_eq!(
            hasher.finalize_hex(),
            hex::encode(sha2::Sha512::digest(data))
        );
    }

    #[tokio::test]
    async fn hash_local_file_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0u32..100_000).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let (hash, size) = hash_local_file(&path).await.unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(hash, hex::encode(sha2::Sha512::digest(&data)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Feeding the prefix [0, split) and then the tail [split, len)
            /// through one streaming state equals hashing the whole input,
            /// which is the invariant the resume path leans on.
            #[test]
            fn split_point_continuation(
                data in proptest::collection::vec(any::<u8>(), 0..65_536),
                split_frac in 0.0f64..=1.0,
            ) {
                let split = ((data.len() as f64) * split_frac) as usize;
                let mut staged = TotalHasher::new();
                staged.update(&data[..split]);
                staged.update(&data[split..]);

                let mut whole = TotalHasher::new();
                whole.update(&data);

                prop_assert_eq!(staged.finalize_hex(), whole.finalize_hex());
            }

            #[test]
            fn chunk_lens_sum_to_size(size in 0u64..50_000_000) {
                let total: u64 = (0..chunk_count(size))
                    .map(|i| chunk_len(size, i) as u64)
                    .sum();
                prop_assert_eq!(total, size);
            }
        }
    }
}
