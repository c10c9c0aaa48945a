use crate::TransferError;

/// Validates that an oid can be used as a single path component.
///
/// The oid is opaque to this crate, but it is joined onto the local
/// object directory, so it must not be able to escape it.
///
/// Rejects:
/// - Empty oids
/// - Path separators (`/` and `\`)
/// - `.` and `..`
/// - Control characters and NUL
pub fn validate_oid(oid: &str) -> Result<(), TransferError> {
    if oid.is_empty() {
        return Err(TransferError::InvalidOid("empty oid".into()));
    }

    if oid == "." || oid == ".." {
        return Err(TransferError::InvalidOid(format!(
            "directory reference not allowed: {oid}"
        )));
    }

    if let Some(c) = oid.chars().find(|c| *c == '/' || *c == '\\') {
        return Err(TransferError::InvalidOid(format!(
            "path separator {c:?} not allowed: {oid}"
        )));
    }

    if oid.chars().any(char::is_control) {
        return Err(TransferError::InvalidOid(format!(
            "control character not allowed: {oid:?}"
        )));
    }

    Ok(())
}
