//! Byte sources an upload reads from.
//!
//! A source is opened once per transfer and read sequentially to the end.
//! The reader it hands out owns every resource it holds, so dropping the
//! request body releases the file on every exit path.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::TransferError;

/// Reader returned by [`ByteSource::open`].
pub type SourceReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Future returned by [`ByteSource::open`].
pub type OpenFuture<'a> =
    Pin<Box<dyn Future<Output = Result<SourceReader, TransferError>> + Send + 'a>>;

/// Something that can provide an object's bytes and their length.
///
/// Implemented for files on disk and in-memory buffers. Callers supply
/// their own implementation to stream from elsewhere.
pub trait ByteSource: Send + Sync {
    /// Length of the content in bytes.
    fn len(&self) -> i64;

    /// Returns true when the source has no content.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a fresh reader positioned at the first byte.
    fn open(&self) -> OpenFuture<'_>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A file on disk. The length is captured when the source is created.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: i64,
}

impl FileSource {
    /// Creates a source for `path`, reading its current length.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, TransferError> {
        let path = path.into();
        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(TransferError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }
        Ok(Self {
            path,
            len: meta.len() as i64,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, used as the oid by path-based uploads.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> i64 {
        self.len
    }

    fn open(&self) -> OpenFuture<'_> {
        Box::pin(async move {
            let file = tokio::fs::File::open(&self.path).await?;
            Ok(Box::new(file) as SourceReader)
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// Content held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> i64 {
        self.data.len() as i64
    }

    fn open(&self) -> OpenFuture<'_> {
        let cursor = std::io::Cursor::new(self.data.clone());
        Box::pin(async move { Ok(Box::new(cursor) as SourceReader) })
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.data.len())
    }
}
