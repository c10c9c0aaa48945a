//! Wire types for the LFS object API.
//!
//! The object API hands out per-object transfer steps as named link
//! relations. This crate only models the payloads; the HTTP exchanges live
//! in `lfs-client`.

pub mod constants;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{MEDIA_TYPE, OCTET_STREAM, Relation};
pub use types::{Link, ObjectResource};

/// Errors produced while validating object API payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("object resource has no {0} link")]
    MissingLink(&'static str),

    #[error("{relation} link has an invalid href: {href:?}")]
    InvalidHref { relation: String, href: String },
}
