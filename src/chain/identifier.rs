//! Identifier parsing for job and memo ids.
//!
//! Ids arrive as decimal strings in webhook payloads and are bound to
//! `uint` contract parameters, so they are parsed straight into `U256`.

use alloy::primitives::U256;
use thiserror::Error;
use tracing::debug;

/// Failure to interpret a job or memo identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Input was empty, non-decimal, or out of `uint256` range
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Parse a decimal identifier into an unsigned 256-bit integer.
///
/// Surrounding whitespace is ignored. Signs, hex prefixes and digit
/// separators are rejected.
pub fn parse_unsigned_int(text: &str) -> Result<U256, IdentifierError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentifierError::InvalidIdentifier(text.to_string()));
    }

    U256::from_str_radix(trimmed, 10)
        .map_err(|_| IdentifierError::InvalidIdentifier(text.to_string()))
}

/// Parse an optional identifier, treating failure as absence.
///
/// Logs the identifier being dropped under `label`.
pub fn parse_optional(label: &str, text: Option<&str>) -> Option<U256> {
    text.and_then(|value| match parse_unsigned_int(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("Ignoring {}: {}", label, e);
            None
        }
    })
}
