//! Streaming file digests for verifying downloaded artifacts.
use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::EngineError;

/// Bytes read per iteration while hashing.
pub const CHUNK_SIZE: usize = 8192;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// SHA-224.
    Sha224,
    /// SHA-256.
    #[default]
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(EngineError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        })
    }
}

/// Hash everything `reader` yields and return the lowercase hex digest.
///
/// # Errors
///
/// Returns any read error from `reader`.
pub fn hash_reader(reader: &mut impl Read, algorithm: HashAlgorithm) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Sha224 => digest_chunks::<Sha224>(reader),
        HashAlgorithm::Sha256 => digest_chunks::<Sha256>(reader),
        HashAlgorithm::Sha384 => digest_chunks::<Sha384>(reader),
        HashAlgorithm::Sha512 => digest_chunks::<Sha512>(reader),
    }
}

fn digest_chunks<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(buffer.get(..n).unwrap_or_default());
    }
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    hex
}

/// Compute the hex digest of a file.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file cannot be opened or read.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let mut file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    Ok(hash_reader(&mut file, algorithm).map_err(|e| EngineError::io(path, e))?)
}

/// Check a file against an expected hex digest (case-insensitive).
///
/// # Errors
///
/// Returns [`EngineError::ChecksumMismatch`] when the digests differ, or
/// [`EngineError::Io`] when the file cannot be read.
pub fn verify_file(path: &Path, expected: &str, algorithm: HashAlgorithm) -> Result<()> {
    let actual = hash_file(path, algorithm)?;
    let expected = expected.trim().to_ascii_lowercase();
    if actual != expected {
        return Err(EngineError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}
