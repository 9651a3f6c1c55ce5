//! Path confinement for caller-supplied image paths.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{ImageError, ImageResult};

/// Default maximum accepted file size in MB.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 20;

/// Confines caller-supplied paths to a configured base directory.
///
/// Every path is resolved to its canonical form (symlinks followed) and must
/// be the base directory itself or a descendant of it. The validator only
/// reads filesystem metadata; it never creates or modifies anything.
pub struct PathValidator {
    base_dir: PathBuf,
    max_file_size_mb: u64,
}

impl PathValidator {
    /// Create a validator rooted at `base_dir` with the default size limit.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_max_size(base_dir, DEFAULT_MAX_FILE_SIZE_MB)
    }

    /// Create a validator with an explicit maximum file size in MB.
    pub fn with_max_size(base_dir: impl Into<PathBuf>, max_file_size_mb: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_file_size_mb,
        }
    }

    /// Resolve `path` and check confinement, existence, and size.
    ///
    /// Returns the canonical path on success. Fails with `AccessDenied` when
    /// the resolved path escapes the base directory (via `..`, symlinks, or
    /// an unresolvable root), `NotFound` when it does not exist, and
    /// `FileTooLarge` when it exceeds the configured limit.
    pub fn confine(&self, path: &str) -> ImageResult<PathBuf> {
        // An unresolvable base directory cannot vouch for anything.
        let base = self
            .base_dir
            .canonicalize()
            .map_err(|_| ImageError::AccessDenied)?;

        let resolved = match Path::new(path).canonicalize() {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Missing file: decide between NotFound and AccessDenied from
                // the lexically normalized absolute path, so confinement is
                // still reported for paths that point outside the base.
                let absolute = self.absolutize(Path::new(path))?;
                if absolute == base || absolute.starts_with(&base) {
                    return Err(ImageError::NotFound(path.to_string()));
                }
                return Err(ImageError::AccessDenied);
            }
            Err(_) => return Err(ImageError::AccessDenied),
        };

        if resolved != base && !resolved.starts_with(&base) {
            return Err(ImageError::AccessDenied);
        }

        let metadata = std::fs::metadata(&resolved)?;
        if metadata.len() > self.max_file_size_mb * 1024 * 1024 {
            return Err(ImageError::FileTooLarge {
                max_mb: self.max_file_size_mb,
            });
        }

        debug!(path = %resolved.display(), "path confined to base directory");
        Ok(resolved)
    }

    /// Normalize a path lexically (no filesystem access), anchoring relative
    /// paths at the current working directory.
    fn absolutize(&self, path: &Path) -> ImageResult<PathBuf> {
        let anchored = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let mut out = PathBuf::new();
        for component in anchored.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}
