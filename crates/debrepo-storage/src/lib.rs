//! Storage layout for Debian package archives.
//!
//! An archive root holds two disjoint subtrees:
//!
//! - **Pool**: content-addressed storage. A package file lives at
//!   `pool/<md5[0..2]>/<md5[2..4]>/<filename>`, keyed by the MD5 digest of
//!   its contents.
//! - **Public tree**: the browsable archive served to APT clients. Published
//!   package files are hard links into the pool, placed at
//!   `public/<prefix>/pool/<component>/<subdir>/<source>/<filename>` where
//!   `subdir` buckets source packages by first letter (or by the first four
//!   letters for `lib*` sources).
//!
//! ```text
//! <root>
//! ├── pool
//! │   └── ab
//! │       └── ae
//! │           └── package.deb
//! └── public
//!     └── <prefix>
//!         ├── dists/...            (metadata, written via create_file)
//!         └── pool
//!             └── main
//!                 └── p
//!                     └── package
//!                         └── package.deb   (hard link into pool)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use debrepo_storage::Repository;
//!
//! # fn example() -> debrepo_storage::Result<()> {
//! let repo = Repository::new("/srv/archive");
//! let rel = repo.link_from_pool(
//!     "squeeze",
//!     "main",
//!     "libfoo_1.0_amd64.deb",
//!     "d41d8cd98f00b204e9800998ecf8427e",
//!     "libfoo",
//! )?;
//! assert_eq!(rel, "pool/main/libf/libfoo/libfoo_1.0_amd64.deb");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

// Checksum collaborator
pub mod checksum;

// Configuration
pub mod config;

// Pure path derivation
pub mod layout;

// Archive root abstraction
pub mod repository;

pub use checksum::{ChecksumInfo, ChecksumSource, FileChecksummer};
pub use config::RepositoryConfig;
pub use layout::ArchiveLayout;
pub use repository::Repository;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filename has no usable base name (empty, `/`, `.` or `..`).
    #[error("filename {0:?} is invalid")]
    InvalidFilename(String),

    /// MD5 digest is too short or not hex.
    #[error("digest {0:?} is invalid: expected at least 4 hex characters")]
    InvalidDigest(String),

    /// Source package name is too short to bucket.
    #[error("package source {0:?} too short")]
    SourceTooShort(String),

    /// Underlying filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Filesystem {
        /// Path the operation was applied to.
        path: PathBuf,
        /// Original I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Pool and public tree are on different filesystems.
    #[error(
        "cannot hard link {} -> {}: pool and public tree are on different filesystems",
        destination.display(),
        source_path.display()
    )]
    CrossDevice {
        /// Pool file that was to be linked.
        source_path: PathBuf,
        /// Published location of the link.
        destination: PathBuf,
        /// Original I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was caused by malformed caller input.
    ///
    /// Invalid input is always detected before the filesystem is touched.
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilename(_) | Self::InvalidDigest(_) | Self::SourceTooShort(_)
        )
    }

    /// Whether the error is a filesystem not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Filesystem { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Version information for the storage crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Content-addressed pool directory under the archive root.
pub const POOL_DIR: &str = "pool";

/// Published tree directory under the archive root.
pub const PUBLIC_DIR: &str = "public";

/// Permissions for directories created in the public tree (`rwxr-xr-x`).
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Minimum number of digest characters consumed by pool bucketing.
pub const MIN_DIGEST_LEN: usize = 4;

/// Minimum length of a source package name.
pub const MIN_SOURCE_LEN: usize = 2;
