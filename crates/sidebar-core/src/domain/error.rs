//! Validation errors raised by the state model before any mutation happens.

use thiserror::Error;

use crate::domain::lines::LineId;

/// A request was rejected before it touched board state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifiers must not be empty.
    #[error("name must not be empty")]
    EmptyName,

    /// Identifiers are limited to 16 bytes on the wire.
    #[error("name {name:?} is {len} bytes, limit is {max}")]
    NameTooLong { name: String, len: usize, max: usize },

    /// The board already shows the maximum number of rows.
    #[error("cannot add more than {max} lines to a sidebar")]
    TooManyLines { max: usize },

    /// The line was removed or belongs to another board.
    #[error("{0} is not part of this sidebar")]
    UnknownLine(LineId),

    /// A reorder target lies outside the current line list.
    #[error("position {position} is out of range for {len} lines")]
    PositionOutOfRange { position: usize, len: usize },

    /// Static lines have fixed content and no refresh activity.
    #[error("{0} has static content")]
    StaticContent(LineId),

    /// A periodic refresh is already running for the line; cancel it first.
    #[error("update task for {0} is already running, cancel it first")]
    RefreshAlreadyActive(LineId),

    /// A period of zero would spin the scheduler.
    #[error("refresh period must be greater than zero")]
    ZeroPeriod,
}
