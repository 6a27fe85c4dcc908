//! Objective identity and the ids derived from it.

use std::fmt;

use uuid::Uuid;

use crate::domain::error::ValidationError;
use crate::domain::lines::SlotIndex;
use crate::protocol::packets::MAX_IDENTIFIER_BYTES;

/// Stable identity of a viewer (the player's UUID).
pub type ViewerId = Uuid;

/// Prefix of every generated objective name.
pub const OBJECTIVE_PREFIX: &str = "sb-";

const RANDOM_SUFFIX_LEN: usize = 6;

/// Longest objective name accepted.  Team ids append a slot number of up to
/// two digits and must still fit the 16-byte identifier limit.
pub const MAX_OBJECTIVE_NAME_BYTES: usize = MAX_IDENTIFIER_BYTES - 2;

/// Name of a board's objective; unique per viewer so several boards can be
/// swapped on one client without clashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectiveName(String);

impl ObjectiveName {
    /// Validates a caller-chosen objective name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] or
    /// [`ValidationError::NameTooLong`] for names outside `1..=14` bytes.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.len() > MAX_OBJECTIVE_NAME_BYTES {
            return Err(ValidationError::NameTooLong {
                len: name.len(),
                name,
                max: MAX_OBJECTIVE_NAME_BYTES,
            });
        }
        Ok(Self(name))
    }

    /// Generates `sb-` followed by six random hex digits (9 bytes).
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{OBJECTIVE_PREFIX}{}", &random[..RANDOM_SUFFIX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Team id of the row in `slot`: the objective name followed by the slot.
    pub fn team_id(&self, slot: SlotIndex) -> String {
        format!("{}{}", self.0, slot.get())
    }
}

impl fmt::Display for ObjectiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectiveName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name_shape() {
        let name = ObjectiveName::generate();
        assert!(name.as_str().starts_with(OBJECTIVE_PREFIX));
        assert_eq!(name.as_str().len(), 9);
        assert!(name.as_str()[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_names_differ() {
        assert_ne!(ObjectiveName::generate(), ObjectiveName::generate());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        assert_eq!(ObjectiveName::new(""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_name_over_14_bytes_is_rejected() {
        let result = ObjectiveName::new("a".repeat(15));
        assert!(matches!(
            result,
            Err(ValidationError::NameTooLong { len: 15, max: 14, .. })
        ));
        assert!(ObjectiveName::new("a".repeat(14)).is_ok());
    }

    #[test]
    fn test_longest_name_keeps_every_team_id_within_16_bytes() {
        let name = ObjectiveName::new("abcdefghijklmn").unwrap();
        for slot in 0..15 {
            let team = name.team_id(SlotIndex::new(slot).unwrap());
            assert!(team.len() <= MAX_IDENTIFIER_BYTES, "{team}");
        }
    }

    #[test]
    fn test_team_id_appends_slot() {
        let name = ObjectiveName::new("sb-abc123").unwrap();
        let slot = SlotIndex::new(12).unwrap();
        assert_eq!(name.team_id(slot), "sb-abc12312");
    }
}
