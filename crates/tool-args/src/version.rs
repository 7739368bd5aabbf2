//! Version helpers for the startup compatibility gate

use thiserror::Error;

/// Backend version does not match the supported `major.minor`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported backend version: {actual} (this server supports {supported}.x)")]
pub struct VersionMismatch {
    /// Version reported by the backend
    pub actual: String,
    /// Supported `major.minor`
    pub supported: String,
}

/// `major.minor` prefix of a dotted version string.
///
/// Inputs with fewer than two components are returned unchanged.
#[must_use]
pub fn major_minor(version: &str) -> &str {
    let mut dots = version.match_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((second, _))) => &version[..second],
        _ => version,
    }
}

/// Compare `actual` against a supported `major.minor`.
///
/// Patch-level differences are always compatible.
pub fn check_compatibility(actual: &str, supported: &str) -> Result<(), VersionMismatch> {
    if major_minor(actual) == major_minor(supported) {
        return Ok(());
    }
    Err(VersionMismatch {
        actual: actual.to_string(),
        supported: supported.to_string(),
    })
}
