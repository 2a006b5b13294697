//! Content hashing for identity comparison.
//!
//! MD5 by default, matching the `file-hash` metadata earlier uploads stored.
//! BLAKE3 only compares equal against objects uploaded with BLAKE3.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Read size for streaming hashes.
const CHUNK_SIZE: usize = 8192;

/// Hash algorithm type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    /// MD5 (default).
    #[default]
    Md5,
    /// BLAKE3.
    Blake3,
}

/// Hash bytes with the given algorithm, as lowercase hex.
pub fn hash_bytes(data: &[u8], algorithm: HashType) -> String {
    match algorithm {
        HashType::Md5 => hex(&Md5::digest(data)),
        HashType::Blake3 => blake3::hash(data).to_hex().to_string(),
    }
}

/// Hash a file in fixed-size chunks.
pub fn hash_file(path: &Path, algorithm: HashType) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; CHUNK_SIZE];

    match algorithm {
        HashType::Md5 => {
            let mut hasher = Md5::new();
            loop {
                let bytes_read = file.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }
            Ok(hex(&hasher.finalize()))
        }
        HashType::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                let bytes_read = file.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }
            Ok(hasher.finalize().to_hex().to_string())
        }
    }
}

/// Hash a file, yielding an empty string when it cannot be read.
///
/// An empty hash means "unavailable" and makes the comparator fall back to
/// sizes.
pub fn content_hash(path: &Path, algorithm: HashType) -> String {
    match hash_file(path, algorithm) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Error calculating hash for {}: {}", path.display(), e);
            String::new()
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
