//! Checksums for bundles and their repository sidecar files.
//!
//! Maven repositories expect `.sha1` next to every upload; Trellis also
//! writes `.sha256` and records the SHA-256 digest in the build report.

use camino::Utf8Path;
use serde::{Serialize, Serializer};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Read};
use thiserror::Error;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A digest string was not 64 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid SHA-256 digest: {reason}")]
pub struct InvalidDigest {
    /// What was wrong with the value.
    pub reason: String,
}

/// A validated hex-encoded SHA-256 digest.
///
/// # Examples
///
/// ```
/// use trellis_packager::checksum::Sha256Digest;
///
/// let digest = Sha256Digest::of(b"fallingtrees");
/// assert_eq!(digest.as_str().len(), 64);
/// assert!(Sha256Digest::try_from(digest.as_str()).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Digest of an in-memory buffer.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = InvalidDigest;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() != DIGEST_HEX_LEN {
            return Err(InvalidDigest {
                reason: format!(
                    "expected {DIGEST_HEX_LEN} hex characters, got {}",
                    value.len()
                ),
            });
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
        {
            return Err(InvalidDigest {
                reason: format!("unexpected character '{bad}'"),
            });
        }
        Ok(Self(value.to_owned()))
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Sha256Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// SHA-256 of a file, read in chunks.
///
/// # Errors
///
/// Returns any I/O error raised while reading `path`.
pub fn compute_sha256(path: &Utf8Path) -> io::Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(Sha256Digest(format!("{:x}", hasher.finalize())))
}

/// Lowercase hex SHA-1, the checksum Maven clients verify.
#[must_use]
pub fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}
