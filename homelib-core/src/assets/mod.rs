//! Cover image directory

use crate::error::AssetError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Result type for asset operations
pub type AssetResult<T> = std::result::Result<T, AssetError>;

/// Where cover images live on the store side.
///
/// Stored books reference covers by the absolute path this returns from
/// [`import_file`](AssetStore::import_file) or [`write`](AssetStore::write).
pub trait AssetStore: Send + Sync {
    /// Directory holding the images
    fn root(&self) -> &Path;

    /// Create the directory if absent
    fn ensure_root(&self) -> AssetResult<()>;

    /// Whether an image with this filename is present
    fn exists(&self, name: &str) -> bool;

    /// Read an image by filename
    fn read(&self, name: &str) -> AssetResult<Vec<u8>>;

    /// Copy a file in under `name`, replacing any same-named image
    fn import_file(&self, name: &str, source: &Path) -> AssetResult<PathBuf>;

    /// Store raw bytes under `name`, replacing any same-named image
    fn write(&self, name: &str, data: &[u8]) -> AssetResult<PathBuf>;

    /// Remove an image previously returned by this store
    fn delete(&self, path: &Path) -> AssetResult<()>;
}

/// Turn an untrusted relative path into one that cannot leave its root
pub fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => return None,
        }
    }
    if normalized.as_os_str().is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Asset store backed by a local directory
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    /// Create a store rooted at `root`; relative roots are made absolute
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    fn full_path(&self, name: &str) -> AssetResult<PathBuf> {
        let relative = safe_relative_path(name)
            .ok_or_else(|| AssetError::UnsafeReference(name.to_string()))?;
        Ok(self.root.join(relative))
    }
}

impl AssetStore for LocalAssetStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> AssetResult<()> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root).map_err(|source| AssetError::Io {
                path: self.root.clone(),
                source,
            })?;
            tracing::info!("Created covers directory: {}", self.root.display());
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.full_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, name: &str) -> AssetResult<Vec<u8>> {
        let path = self.full_path(name)?;
        fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => AssetError::Missing(path),
            _ => AssetError::Io { path, source },
        })
    }

    fn import_file(&self, name: &str, source: &Path) -> AssetResult<PathBuf> {
        self.ensure_root()?;
        let target = self.full_path(name)?;
        fs::copy(source, &target).map_err(|e| AssetError::Io {
            path: target.clone(),
            source: e,
        })?;
        Ok(target)
    }

    fn write(&self, name: &str, data: &[u8]) -> AssetResult<PathBuf> {
        self.ensure_root()?;
        let target = self.full_path(name)?;
        fs::write(&target, data).map_err(|source| AssetError::Io {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    fn delete(&self, path: &Path) -> AssetResult<()> {
        if !path.starts_with(&self.root) {
            return Err(AssetError::UnsafeReference(path.display().to_string()));
        }
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AssetError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
