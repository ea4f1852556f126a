//! Path derivation for the pool and the published tree.
//!
//! Everything here is pure path arithmetic. Nothing touches the
//! filesystem, so the same inputs always produce the same paths.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::{MIN_DIGEST_LEN, MIN_SOURCE_LEN, POOL_DIR, PUBLIC_DIR, Result, StorageError};

/// Prefix that switches source bucketing to four characters.
const LIB_PREFIX: &str = "lib";

/// Bucket width for `lib*` source packages.
const LIB_BUCKET_LEN: usize = 4;

/// Derives every path of an archive from its root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    /// Create a layout for the given root. The root is not validated and
    /// does not need to exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Archive root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a package file in the pool:
    /// `<root>/pool/<md5[0..2]>/<md5[2..4]>/<basename>`.
    ///
    /// Only the base name of `filename` is used; directory components never
    /// influence the result.
    pub fn pool_path(&self, filename: &str, md5: &str) -> Result<PathBuf> {
        let basename = base_name(filename)?;
        let (first, second) = digest_buckets(md5)?;

        Ok(self
            .root
            .join(POOL_DIR)
            .join(first)
            .join(second)
            .join(basename))
    }

    /// Root of the published tree: `<root>/public`.
    pub fn public_path(&self) -> PathBuf {
        self.root.join(PUBLIC_DIR)
    }

    /// Absolute path of `relative` under the published tree.
    pub fn public_join<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.public_path().join(relative)
    }

    /// Directory a source package's files are published into:
    /// `<root>/public/<prefix>/pool/<component>/<subdir>/<source>`.
    pub fn published_dir(&self, prefix: &str, component: &str, source: &str) -> Result<PathBuf> {
        let subdir = source_subdir(source)?;
        Ok(self
            .public_path()
            .join(prefix)
            .join(POOL_DIR)
            .join(component)
            .join(subdir)
            .join(source))
    }
}

/// Base name of `filename`, rejecting inputs without one.
///
/// Trailing separators are ignored, so `"dir/file.deb/"` yields
/// `"file.deb"`. Empty strings, `/`, `.` and `..` (or paths ending in
/// them, such as `"file.deb/."`) have no base name.
pub fn base_name(filename: &str) -> Result<&str> {
    // `Path::file_name` normalizes a trailing `.` away, so `foo.deb/.`
    // would otherwise name `foo.deb`.
    let last = filename
        .trim_end_matches(std::path::is_separator)
        .rsplit(std::path::is_separator)
        .next();
    if last == Some(".") {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }

    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::InvalidFilename(filename.to_string()))
}

/// Split the leading four hex characters of an MD5 digest into the two
/// pool bucket segments.
pub fn digest_buckets(md5: &str) -> Result<(&str, &str)> {
    let bytes = md5.as_bytes();
    if bytes.len() < MIN_DIGEST_LEN || !bytes[..MIN_DIGEST_LEN].iter().all(u8::is_ascii_hexdigit) {
        return Err(StorageError::InvalidDigest(md5.to_string()));
    }

    // First four bytes are ASCII, so these are char boundaries.
    Ok((&md5[0..2], &md5[2..4]))
}

/// Bucket directory for a source package.
///
/// `lib*` sources of four or more characters bucket on their first four
/// characters (`libfoo` -> `libf`); every other source buckets on its first
/// character (`bar` -> `b`, and the bare name `lib` -> `l`).
pub fn source_subdir(source: &str) -> Result<&str> {
    if source.chars().count() < MIN_SOURCE_LEN {
        return Err(StorageError::SourceTooShort(source.to_string()));
    }

    let subdir = if source.starts_with(LIB_PREFIX) && source.chars().count() >= LIB_BUCKET_LEN {
        char_prefix(source, LIB_BUCKET_LEN)
    } else {
        char_prefix(source, 1)
    };

    trace!("source {source} buckets into {subdir}");
    Ok(subdir)
}

/// Relative path of a published package file, as embedded in index
/// metadata: `pool/<component>/<subdir>/<source>/<basename>`.
///
/// Always `/`-separated and never includes the archive root, the
/// `public/` directory or the publish prefix.
pub fn published_rel_path(component: &str, source: &str, basename: &str) -> Result<String> {
    let subdir = source_subdir(source)?;
    Ok([POOL_DIR, component, subdir, source, basename].join("/"))
}

fn char_prefix(s: &str, chars: usize) -> &str {
    s.char_indices().nth(chars).map_or(s, |(end, _)| &s[..end])
}
