//! Semantic scoreboard packets.
//!
//! These types describe *what* the engine wants a client to do, independent of
//! the protocol era.  [`crate::protocol::codec::encode_packet`] turns one of
//! them into era-specific bytes.
//!
//! Text payloads are carried as [`WireText`], which already holds both the JSON
//! and legacy renderings; the codec picks whichever the target era needs.

use serde::{Deserialize, Serialize};

use crate::text::WireText;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Longest objective or team identifier the client accepts, in bytes.
pub const MAX_IDENTIFIER_BYTES: usize = 16;

/// Longest objective title a legacy-era client displays, in characters.
pub const LEGACY_TITLE_CHARS: usize = 32;

/// Longest team prefix or suffix in the legacy era, in characters.
pub const LEGACY_AFFIX_CHARS: usize = 16;

/// Longest score entry name, in characters.
pub const MAX_ENTRY_CHARS: usize = 40;

// ── Number formats ────────────────────────────────────────────────────────────

/// How the client renders the number to the right of a sidebar row.
///
/// Only clients from 1.20.3 onwards understand number formats; older eras
/// always show the plain score and the codec drops the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    /// Hide the number entirely.
    Blank,
    /// Show the number with a style, given as a JSON style object
    /// (e.g. `{"color":"red"}`).
    Styled(String),
    /// Replace the number with a fixed JSON text component.
    Fixed(String),
}

impl NumberFormat {
    /// Wire tag written before the format payload.
    pub fn tag(&self) -> i32 {
        match self {
            NumberFormat::Blank => 0,
            NumberFormat::Styled(_) => 1,
            NumberFormat::Fixed(_) => 2,
        }
    }
}

// ── Display slots ─────────────────────────────────────────────────────────────

/// Screen position an objective can be displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DisplaySlot {
    List = 0,
    Sidebar = 1,
    BelowName = 2,
}

impl TryFrom<i32> for DisplaySlot {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            0 => Ok(DisplaySlot::List),
            1 => Ok(DisplaySlot::Sidebar),
            2 => Ok(DisplaySlot::BelowName),
            _ => Err(()),
        }
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

/// Objective packet mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectiveAction {
    /// Mode 0: register the objective with its title.
    Create {
        title: WireText,
        number_format: Option<NumberFormat>,
    },
    /// Mode 1: unregister the objective.
    Remove,
    /// Mode 2: change the title (and, in the modern era, the number format).
    Update {
        title: WireText,
        number_format: Option<NumberFormat>,
    },
}

impl ObjectiveAction {
    pub fn mode(&self) -> u8 {
        match self {
            ObjectiveAction::Create { .. } => 0,
            ObjectiveAction::Remove => 1,
            ObjectiveAction::Update { .. } => 2,
        }
    }
}

/// Team packet mode.  Adding or removing single entries later (modes 3 and 4)
/// is never needed: every sidebar row's team holds exactly one entry from
/// creation to removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamAction {
    /// Mode 0: create the team showing `text`, with its member entries.
    Create { text: WireText, entries: Vec<String> },
    /// Mode 1: remove the team.
    Remove,
    /// Mode 2: change the text shown by the team.
    Update { text: WireText },
}

impl TeamAction {
    pub fn mode(&self) -> u8 {
        match self {
            TeamAction::Create { .. } => 0,
            TeamAction::Remove => 1,
            TeamAction::Update { .. } => 2,
        }
    }
}

// ── Packets ───────────────────────────────────────────────────────────────────

/// Every clientbound packet the sidebar engine emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreboardPacket {
    Objective {
        name: String,
        action: ObjectiveAction,
    },
    DisplayObjective {
        slot: DisplaySlot,
        name: String,
    },
    Team {
        name: String,
        action: TeamAction,
    },
    /// Set the score of `entry`; the entry name encodes the line's slot, which
    /// also breaks ties between equal scores on the client.
    SetScore {
        entry: String,
        objective: String,
        value: i32,
        number_format: Option<NumberFormat>,
    },
    ResetScore {
        entry: String,
        objective: String,
    },
}

impl ScoreboardPacket {
    /// Short human-readable packet kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreboardPacket::Objective { action, .. } => match action {
                ObjectiveAction::Create { .. } => "objective-create",
                ObjectiveAction::Remove => "objective-remove",
                ObjectiveAction::Update { .. } => "objective-update",
            },
            ScoreboardPacket::DisplayObjective { .. } => "display-objective",
            ScoreboardPacket::Team { action, .. } => match action {
                TeamAction::Create { .. } => "team-create",
                TeamAction::Remove => "team-remove",
                TeamAction::Update { .. } => "team-update",
            },
            ScoreboardPacket::SetScore { .. } => "score-set",
            ScoreboardPacket::ResetScore { .. } => "score-reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_match_wire_values() {
        assert_eq!(ObjectiveAction::Remove.mode(), 1);
        assert_eq!(
            TeamAction::Update { text: WireText::empty() }.mode(),
            2
        );
        assert_eq!(NumberFormat::Fixed("{}".into()).tag(), 2);
    }

    #[test]
    fn test_display_slot_from_wire_value() {
        assert_eq!(DisplaySlot::try_from(1), Ok(DisplaySlot::Sidebar));
        assert!(DisplaySlot::try_from(19).is_err());
    }

    #[test]
    fn test_kind_labels() {
        let packet = ScoreboardPacket::ResetScore {
            entry: "§0§r".into(),
            objective: "sb-000000".into(),
        };
        assert_eq!(packet.kind(), "score-reset");
    }
}
