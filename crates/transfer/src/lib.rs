//! Local side of an LFS object transfer.
//!
//! Provides the byte sources an upload reads from, the on-disk object
//! layout used to find them, and a body stream that enforces the
//! negotiated size while reporting progress.

mod body;
mod progress;
mod source;
mod store;
mod validation;

pub use body::{LastActivity, SizedBodyStream};
pub use progress::{ProgressCallback, ProgressReporter, SpeedCalculator, TransferProgress};
pub use source::{ByteSource, FileSource, MemorySource, OpenFuture, SourceReader};
pub use store::LocalObjectStore;
pub use validation::validate_oid;

/// Read size used when streaming a source into a request body: 64 KiB.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid oid: {0}")]
    InvalidOid(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("size mismatch for {oid}: declared {declared} bytes, source has {actual}")]
    SizeMismatch {
        oid: String,
        declared: i64,
        actual: i64,
    },
}
