//! Session identifiers
//!
//! A `SessionId` is a 16-byte random value rendered in canonical
//! hyphenated hex form, matching `^[a-fA-F0-9-]{36}$`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, canonically-formatted session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Generate a new random session ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse and validate a canonical 36-character session ID
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `raw` is not 36 characters of hex
    /// digits and dashes, or does not parse as a UUID.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() != 36 || !raw.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(Error::Validation(format!(
                "sessionId must match ^[a-fA-F0-9-]{{36}}$, got {raw:?}"
            )));
        }
        uuid::Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| Error::Validation(format!("invalid sessionId {raw:?}: {e}")))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        let id = SessionId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(SessionId::parse(&text).unwrap(), id);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(SessionId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn rejects_non_hex_characters() {
        let bad = "zzzzzzzz-1111-1111-1111-111111111111";
        assert!(SessionId::parse(bad).is_err());
    }

    #[test]
    fn accepts_canonical_form() {
        let id = SessionId::parse("11111111-1111-1111-1111-111111111111").unwrap();
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
    }
}
