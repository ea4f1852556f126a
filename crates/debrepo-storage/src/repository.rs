//! Archive root abstraction.
//!
//! [`Repository`] owns an archive root and performs the filesystem side of
//! publishing: creating directories and files in the public tree, and hard
//! linking pool files into their published location.
//!
//! Operations are synchronous and uncoordinated. Two processes publishing
//! into the same root rely on the atomicity of `mkdir` and `link` alone.

use std::fs::{self, DirBuilder, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::checksum::{ChecksumInfo, ChecksumSource, FileChecksummer};
use crate::layout::{self, ArchiveLayout};
use crate::{RepositoryConfig, Result, StorageError};

/// Package pool and published tree under a single root directory.
#[derive(Debug, Clone)]
pub struct Repository<C = FileChecksummer> {
    layout: ArchiveLayout,
    dir_mode: u32,
    checksums: C,
}

impl Repository {
    /// Create a repository rooted at `root` with default settings.
    ///
    /// The root is not validated and does not need to exist yet;
    /// directories are created on demand.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::from_config(&RepositoryConfig::new(root))
    }

    /// Create a repository from a configuration.
    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::with_checksum_source(config, FileChecksummer)
    }
}

impl<C: ChecksumSource> Repository<C> {
    /// Create a repository that computes checksums through `checksums`.
    pub fn with_checksum_source(config: &RepositoryConfig, checksums: C) -> Self {
        Self {
            layout: ArchiveLayout::new(&config.root),
            dir_mode: config.dir_mode,
            checksums,
        }
    }

    /// Archive root directory.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Path layout of this repository.
    pub const fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Full path of a package file in the pool, given any name of the file
    /// and the MD5 digest of its contents.
    pub fn pool_path(&self, filename: &str, md5: &str) -> Result<PathBuf> {
        self.layout.pool_path(filename, md5)
    }

    /// Root of the published tree.
    pub fn public_path(&self) -> PathBuf {
        self.layout.public_path()
    }

    /// Create a directory (and any missing parents) under the public tree.
    ///
    /// Succeeds if the directory already exists.
    pub fn mkdir<P: AsRef<Path>>(&self, relative: P) -> Result<()> {
        self.create_dir_all(&self.layout.public_join(relative))
    }

    /// Create or truncate a file under the public tree for writing.
    ///
    /// Parent directories are not created; call [`Repository::mkdir`]
    /// first. The file is closed when the returned handle is dropped.
    pub fn create_file<P: AsRef<Path>>(&self, relative: P) -> Result<File> {
        let path = self.layout.public_join(relative);
        let file = File::create(&path).map_err(|e| StorageError::filesystem(&path, e))?;
        debug!("created {}", path.display());
        Ok(file)
    }

    /// Hard link a pool file into the published tree of `prefix`.
    ///
    /// Returns the path of the published file relative to the prefix
    /// directory (`pool/<component>/<subdir>/<source>/<basename>`), suitable
    /// for the `Filename:` field of a package index. If the destination
    /// already exists nothing is linked and the same path is returned, so
    /// republishing is idempotent.
    ///
    /// All arguments are validated before the filesystem is touched.
    pub fn link_from_pool(
        &self,
        prefix: &str,
        component: &str,
        filename: &str,
        md5: &str,
        source: &str,
    ) -> Result<String> {
        let source_path = self.layout.pool_path(filename, md5)?;
        let basename = layout::base_name(filename)?;
        let rel_path = layout::published_rel_path(component, source, basename)?;
        let published_dir = self.layout.published_dir(prefix, component, source)?;

        self.create_dir_all(&published_dir)?;
        let destination = published_dir.join(basename);

        match fs::symlink_metadata(&destination) {
            Ok(_) => {
                debug!("already published: {}", destination.display());
                return Ok(rel_path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::filesystem(&destination, e)),
        }

        match fs::hard_link(&source_path, &destination) {
            Ok(()) => {
                debug!(
                    "linked {} -> {}",
                    destination.display(),
                    source_path.display()
                );
                Ok(rel_path)
            }
            Err(e) => {
                link_error(e, source_path, destination)?;
                Ok(rel_path)
            }
        }
    }

    /// Checksums of a file under the public tree.
    ///
    /// Every call re-reads the file.
    pub fn checksums_for_file<P: AsRef<Path>>(&self, relative: P) -> Result<ChecksumInfo> {
        self.checksums
            .checksums_for_file(&self.layout.public_join(relative))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }
        builder
            .create(path)
            .map_err(|e| StorageError::filesystem(path, e))
    }
}

/// Classify a failed `hard_link` call.
///
/// A destination that appeared after the existence check was linked by
/// another publisher and counts as success.
fn link_error(e: std::io::Error, source_path: PathBuf, destination: PathBuf) -> Result<()> {
    match e.kind() {
        ErrorKind::AlreadyExists => {
            debug!("published concurrently: {}", destination.display());
            Ok(())
        }
        ErrorKind::CrossesDevices => {
            warn!(
                "cannot link {} across filesystems: {e}",
                source_path.display()
            );
            Err(StorageError::CrossDevice {
                source_path,
                destination,
                source: e,
            })
        }
        ErrorKind::NotFound => Err(StorageError::filesystem(source_path, e)),
        _ => Err(StorageError::filesystem(destination, e)),
    }
}
