//! Checksums of published files.
//!
//! Release files list every index file with its size and several digests,
//! so a single pass over the file computes all of them at once.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use tracing::debug;

use crate::{Result, StorageError};

/// Read buffer size for streaming checksums.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Size and digests of a file, all digests in lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecksumInfo {
    /// File size in bytes
    pub size: u64,
    /// MD5 digest, also the pool key
    pub md5: String,
    /// SHA-1 digest
    pub sha1: String,
    /// SHA-256 digest
    pub sha256: String,
    /// SHA-512 digest
    pub sha512: String,
}

impl ChecksumInfo {
    /// Compute checksums of in-memory data.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = MultiHasher::default();
        hasher.update(data);
        hasher.finish()
    }

    /// Compute checksums of everything `reader` yields.
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = MultiHasher::default();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }
}

/// Computes checksums for a file on disk.
///
/// This is the seam between the repository and whatever computes digests.
/// Implementations receive absolute paths.
pub trait ChecksumSource {
    /// Compute the checksums of the file at `path`.
    fn checksums_for_file(&self, path: &Path) -> Result<ChecksumInfo>;
}

/// Default [`ChecksumSource`] that re-reads and hashes the file on every
/// call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileChecksummer;

impl ChecksumSource for FileChecksummer {
    fn checksums_for_file(&self, path: &Path) -> Result<ChecksumInfo> {
        let file = File::open(path).map_err(|e| StorageError::filesystem(path, e))?;
        let info = ChecksumInfo::from_reader(BufReader::new(file))
            .map_err(|e| StorageError::filesystem(path, e))?;

        debug!(
            "checksummed {}: size={} md5={}",
            path.display(),
            info.size,
            info.md5
        );
        Ok(info)
    }
}

impl<T: ChecksumSource + ?Sized> ChecksumSource for &T {
    fn checksums_for_file(&self, path: &Path) -> Result<ChecksumInfo> {
        (**self).checksums_for_file(path)
    }
}

#[derive(Default)]
struct MultiHasher {
    size: u64,
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
    sha512: Sha512,
}

impl MultiHasher {
    fn update(&mut self, data: &[u8]) {
        self.size += data.len() as u64;
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
        self.sha512.update(data);
    }

    fn finish(self) -> ChecksumInfo {
        ChecksumInfo {
            size: self.size,
            md5: hex::encode(self.md5.finalize()),
            sha1: hex::encode(self.sha1.finalize()),
            sha256: hex::encode(self.sha256.finalize()),
            sha512: hex::encode(self.sha512.finalize()),
        }
    }
}
