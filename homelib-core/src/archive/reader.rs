//! Archive unpacking

use super::manifest::decode_manifest;
use super::MANIFEST_ENTRY;
use crate::assets::safe_relative_path;
use crate::error::{AssetError, FormatError, Result};
use crate::types::ArchiveManifest;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// An archive opened for import.
///
/// Packaged archives are extracted into a scoped temporary directory which
/// is removed when this value is dropped (or explicitly via [`close`]),
/// whatever happened in between.
///
/// [`close`]: UnpackedArchive::close
pub struct UnpackedArchive {
    manifest: ArchiveManifest,
    dir: Option<TempDir>,
}

impl UnpackedArchive {
    /// Open an archive, unpacking into the system temporary directory
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_in(path, None)
    }

    /// Open an archive, unpacking under `temp_root` when given
    pub fn open_in(path: &Path, temp_root: Option<&Path>) -> Result<Self> {
        let mut file = File::open(path)?;

        if is_zip(&mut file)? {
            Self::unpack(file, temp_root)
        } else {
            tracing::debug!("{} is not packaged, reading as plain manifest", path.display());
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            let text = manifest_text(bytes)?;
            Ok(Self {
                manifest: decode_manifest(&text)?,
                dir: None,
            })
        }
    }

    fn unpack(file: File, temp_root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("homelib-import");
        let dir = match temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tracing::info!("Extracting archive to: {}", dir.path().display());

        let invalid = |e: &dyn std::fmt::Display| FormatError::InvalidArchive(e.to_string());
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| invalid(&e))?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| invalid(&e))?;
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!("Skipping archive entry outside the archive root: {}", entry.name());
                continue;
            };
            let target = dir.path().join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                // Read fully first so a corrupt entry is told apart from a failed write
                let mut bytes = Vec::new();
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|e| invalid(&format!("{}: {}", entry.name(), e)))?;
                fs::write(&target, bytes)?;
            }
        }

        let manifest_path = dir.path().join(MANIFEST_ENTRY);
        if !manifest_path.is_file() {
            return Err(FormatError::MissingManifest(MANIFEST_ENTRY.to_string()).into());
        }
        let text = manifest_text(fs::read(&manifest_path)?)?;

        Ok(Self {
            manifest: decode_manifest(&text)?,
            dir: Some(dir),
        })
    }

    pub fn manifest(&self) -> &ArchiveManifest {
        &self.manifest
    }

    /// Move the manifest out, leaving an empty one behind
    pub fn take_manifest(&mut self) -> ArchiveManifest {
        std::mem::take(&mut self.manifest)
    }

    /// Where the archive was unpacked; `None` for plain manifests
    pub fn unpack_dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Resolve an archive-relative asset reference to an unpacked file
    pub fn resolve_asset(&self, reference: &str) -> std::result::Result<PathBuf, AssetError> {
        let relative = safe_relative_path(reference)
            .ok_or_else(|| AssetError::UnsafeReference(reference.to_string()))?;
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| AssetError::Missing(relative.clone()))?;

        let candidate = dir.path().join(relative);
        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(AssetError::Missing(candidate))
        }
    }

    /// Remove the unpack directory now, reporting failures
    pub fn close(self) -> io::Result<()> {
        match self.dir {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

fn is_zip(file: &mut File) -> io::Result<bool> {
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    file.rewind()?;
    Ok(filled == magic.len() && magic == ZIP_MAGIC)
}

fn manifest_text(bytes: Vec<u8>) -> std::result::Result<String, FormatError> {
    String::from_utf8(bytes)
        .map_err(|_| FormatError::Malformed("manifest is not valid UTF-8".to_string()))
}
