//! # sidebar-core
//!
//! Shared library for the packet-level sidebar engine containing the
//! scoreboard protocol codec, text values, and the pure line/objective state
//! model.
//!
//! This crate has zero dependencies on async runtimes, sockets, or the host
//! game server.  Everything here is deterministic and unit-testable.
//!
//! # Architecture overview
//!
//! A "sidebar" is the scored list of text rows shown on the right-hand side of
//! a game client.  The server side of the engine never uses the host's
//! scoreboard API; it writes the raw packets itself.  This crate defines:
//!
//! - **`protocol`** – How a semantic request ("create the objective", "set the
//!   score of row 3") becomes bytes for one client.  Three protocol eras are
//!   supported, selected by the client's protocol version number.
//!
//! - **`text`** – The rich-text value handed to the engine by the text layer
//!   and the [`text::TextRenderer`] seam that reduces it to JSON or legacy
//!   strings per viewer.
//!
//! - **`domain`** – Objective identity and the [`domain::lines::LineTable`]:
//!   ordering, slot identity, the 15-line ceiling and score planning.

pub mod domain;
pub mod protocol;
pub mod text;

pub use domain::error::ValidationError;
pub use domain::lines::{LineEntry, LineId, LineTable, RefreshStep, RenderPath, SlotIndex, MAX_LINES};
pub use domain::objective::{ObjectiveName, ViewerId, MAX_OBJECTIVE_NAME_BYTES};
pub use protocol::codec::{decode_packet, encode_packet, ProtocolError};
pub use protocol::packets::ScoreboardPacket;
pub use protocol::version::{Era, ProtocolVersion};
pub use text::{DefaultTextRenderer, Text, TextRenderer, WireText};
