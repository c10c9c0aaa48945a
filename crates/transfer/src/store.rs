use std::path::{Path, PathBuf};

use crate::source::FileSource;
use crate::validation::validate_oid;
use crate::TransferError;

/// Read-only view of a local object directory.
///
/// Objects live at `<root>/<oid[0..2]>/<oid[2..4]>/<oid>`, the layout used
/// by `.git/lfs/objects`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns where `oid` is stored. Does not touch the filesystem.
    pub fn object_path(&self, oid: &str) -> Result<PathBuf, TransferError> {
        validate_oid(oid)?;
        if oid.len() < 5 || !oid.is_char_boundary(2) || !oid.is_char_boundary(4) {
            return Err(TransferError::InvalidOid(format!(
                "oid too short for fan-out layout: {oid}"
            )));
        }
        Ok(self.root.join(&oid[0..2]).join(&oid[2..4]).join(oid))
    }

    /// Opens the stored object as a byte source.
    pub fn source(&self, oid: &str) -> Result<FileSource, TransferError> {
        let path = self.object_path(oid)?;
        if !path.is_file() {
            tracing::debug!(oid = %oid, path = %path.display(), "object missing from local store");
            return Err(TransferError::ObjectNotFound(oid.to_string()));
        }
        FileSource::new(path)
    }
}
