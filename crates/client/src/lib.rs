//! LFS object upload client.
//!
//! Uploads one object per call in three steps against the object API:
//!
//! 1. **Negotiate**: `POST <base>/objects` with `{oid, size}`; the server
//!    answers with `_links` naming where to send the bytes
//! 2. **Transfer**: `PUT` the raw bytes to the `upload` link
//! 3. **Verify**: `POST {oid, size}` to the `verify` link, only when the
//!    server offered one
//!
//! Every failure comes back as a [`ClassifiedError`] naming the URL of the
//! step that failed, so callers can tell a rejected negotiation from a
//! failed transfer or an unconfirmed upload.

pub mod classifier;
pub mod client;
pub mod error;
pub mod upload;

// Re-export primary types for convenience.
pub use classifier::ErrorClassifier;
pub use client::TransferClient;
pub use error::{ClassifiedError, ClientError, Stage, TemplateError};
pub use upload::{UploadReport, Uploader};
