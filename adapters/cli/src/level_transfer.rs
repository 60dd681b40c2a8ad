//! Single-line transfer strings for sharing whole levels.
//!
//! A transfer string looks like `blockwarp:v1:<grids>:<payload>` where the
//! payload is the level document as JSON, base64-encoded without padding.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use blockwarp_core::LevelDocument;
use thiserror::Error;

const TRANSFER_DOMAIN: &str = "blockwarp";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the grid count and payload.
pub(crate) const TRANSFER_HEADER: &str = "blockwarp:v1";
/// Delimiter used to separate the prefix, grid count and payload.
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while encoding or decoding level transfer strings.
#[derive(Debug, Error)]
pub(crate) enum LevelTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("transfer string was empty")]
    EmptyPayload,
    /// The version segment was missing.
    #[error("transfer string is missing the version")]
    MissingVersion,
    /// The grid count segment was missing.
    #[error("transfer string is missing the grid count")]
    MissingGridCount,
    /// The payload segment was missing.
    #[error("transfer string is missing the payload")]
    MissingPayload,
    /// The prefix segment named another format.
    #[error("transfer prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment named an unsupported version.
    #[error("transfer version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid count could not be parsed or disagrees with the payload.
    #[error("grid count '{0}' does not describe the payload")]
    InvalidGridCount(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode level payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload could not be converted to or from JSON.
    #[error("could not convert level payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Reports whether the text looks like a transfer string rather than a path.
#[must_use]
pub(crate) fn is_transfer_string(value: &str) -> bool {
    value
        .trim()
        .strip_prefix(TRANSFER_DOMAIN)
        .map_or(false, |rest| rest.starts_with(FIELD_DELIMITER))
}

/// Encodes the level into a single-line string suitable for clipboard transfer.
pub(crate) fn encode(document: &LevelDocument) -> Result<String, LevelTransferError> {
    let json = serde_json::to_vec(document)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{TRANSFER_HEADER}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{encoded}",
        document.grids.len()
    ))
}

/// Decodes a level from its transfer string.
pub(crate) fn decode(value: &str) -> Result<LevelDocument, LevelTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LevelTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(LevelTransferError::MissingVersion)?;
    let grid_count = parts.next().ok_or(LevelTransferError::MissingGridCount)?;
    let payload = parts.next().ok_or(LevelTransferError::MissingPayload)?;

    if domain != TRANSFER_DOMAIN {
        return Err(LevelTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(LevelTransferError::UnsupportedVersion(version.to_owned()));
    }
    let expected = grid_count
        .trim()
        .parse::<usize>()
        .map_err(|_| LevelTransferError::InvalidGridCount(grid_count.to_owned()))?;

    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let document: LevelDocument = serde_json::from_slice(&bytes)?;
    if document.grids.len() != expected {
        return Err(LevelTransferError::InvalidGridCount(grid_count.to_owned()));
    }
    Ok(document)
}
