//! Protocol version numbers, encoding eras, and per-version packet ids.
//!
//! # Why eras? (for newcomers)
//!
//! The game client has changed the byte layout of its scoreboard packets
//! several times.  Instead of negotiating features, the engine looks at the
//! integer protocol version reported for a viewer and picks one of three
//! encodings by plain threshold comparison:
//!
//! ```text
//!   47 ─────────── 393 ─────────────────── 765 ──────────►
//!   │   Legacy      │        Mid             │   Modern
//!   │ legacy text   │ JSON text strings      │ NBT components
//!   │ 32-char title │ VarInt render type     │ number formats
//! ```
//!
//! Packet ids move around far more often than the layouts, so they are kept
//! in a separate descending table keyed by the first version that used them.

use serde::{Deserialize, Serialize};

/// A client protocol version number (e.g. `47` for 1.8, `765` for 1.20.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(pub i32);

impl ProtocolVersion {
    pub const MINECRAFT_1_8: ProtocolVersion = ProtocolVersion(47);
    pub const MINECRAFT_1_9: ProtocolVersion = ProtocolVersion(107);
    pub const MINECRAFT_1_12: ProtocolVersion = ProtocolVersion(335);
    pub const MINECRAFT_1_12_1: ProtocolVersion = ProtocolVersion(338);
    pub const MINECRAFT_1_13: ProtocolVersion = ProtocolVersion(393);
    pub const MINECRAFT_1_14: ProtocolVersion = ProtocolVersion(477);
    pub const MINECRAFT_1_15: ProtocolVersion = ProtocolVersion(573);
    pub const MINECRAFT_1_16: ProtocolVersion = ProtocolVersion(735);
    pub const MINECRAFT_1_17: ProtocolVersion = ProtocolVersion(755);
    pub const MINECRAFT_1_19: ProtocolVersion = ProtocolVersion(759);
    pub const MINECRAFT_1_19_1: ProtocolVersion = ProtocolVersion(760);
    pub const MINECRAFT_1_19_3: ProtocolVersion = ProtocolVersion(761);
    pub const MINECRAFT_1_19_4: ProtocolVersion = ProtocolVersion(762);
    pub const MINECRAFT_1_20_2: ProtocolVersion = ProtocolVersion(764);
    pub const MINECRAFT_1_20_3: ProtocolVersion = ProtocolVersion(765);
    pub const MINECRAFT_1_20_5: ProtocolVersion = ProtocolVersion(766);

    /// Oldest version the codec can encode for.
    pub const OLDEST_SUPPORTED: ProtocolVersion = Self::MINECRAFT_1_8;

    /// Returns the encoding era for this version.
    pub fn era(self) -> Era {
        if self >= Self::MINECRAFT_1_20_3 {
            Era::Modern
        } else if self >= Self::MINECRAFT_1_13 {
            Era::Mid
        } else {
            Era::Legacy
        }
    }

    /// Returns the packet ids used by this version, or `None` when the
    /// version predates [`ProtocolVersion::OLDEST_SUPPORTED`].
    pub fn packet_ids(self) -> Option<PacketIds> {
        PACKET_ID_TABLE
            .iter()
            .find(|(since, _)| self.0 >= *since)
            .map(|(_, ids)| *ids)
    }

    /// Legacy-era clients before 1.9 have no collision rule field in team packets.
    pub(crate) fn has_collision_rule(self) -> bool {
        self >= Self::MINECRAFT_1_9
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "protocol {}", self.0)
    }
}

/// Packet byte-layout era.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Era {
    /// Before 1.13: legacy-formatted strings, 32-character objective titles.
    Legacy,
    /// 1.13 up to 1.20.2: JSON text strings, VarInt render type.
    Mid,
    /// 1.20.3 and later: NBT text components and score number formats.
    Modern,
}

/// Clientbound packet ids for the scoreboard packets of one version range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketIds {
    pub display_objective: i32,
    pub update_objectives: i32,
    pub update_teams: i32,
    pub update_score: i32,
    /// Dedicated reset-score packet; `None` before 1.20.3, where a score is
    /// removed through the update-score packet's remove action.
    pub reset_score: Option<i32>,
}

const fn ids(display: i32, objectives: i32, teams: i32, score: i32, reset: Option<i32>) -> PacketIds {
    PacketIds {
        display_objective: display,
        update_objectives: objectives,
        update_teams: teams,
        update_score: score,
        reset_score: reset,
    }
}

/// Newest first; the first row whose lower bound is `<=` the version wins.
const PACKET_ID_TABLE: &[(i32, PacketIds)] = &[
    (766, ids(0x57, 0x5C, 0x5E, 0x5F, Some(0x44))),
    (765, ids(0x55, 0x5A, 0x5C, 0x5D, Some(0x42))),
    (764, ids(0x55, 0x5A, 0x5C, 0x5D, None)),
    (762, ids(0x51, 0x58, 0x5A, 0x5B, None)),
    (761, ids(0x4D, 0x54, 0x56, 0x57, None)),
    (760, ids(0x4F, 0x56, 0x58, 0x59, None)),
    (755, ids(0x4C, 0x53, 0x55, 0x56, None)),
    (573, ids(0x43, 0x4A, 0x4C, 0x4D, None)),
    (477, ids(0x42, 0x49, 0x4B, 0x4C, None)),
    (393, ids(0x3E, 0x45, 0x47, 0x48, None)),
    (338, ids(0x3B, 0x42, 0x44, 0x45, None)),
    (335, ids(0x3A, 0x41, 0x43, 0x44, None)),
    (107, ids(0x38, 0x3F, 0x41, 0x42, None)),
    (47, ids(0x3D, 0x3B, 0x3E, 0x3C, None)),
];
