//! Error type for board, registry and pager operations.

use sidebar_core::{ObjectiveName, ProtocolError, ValidationError, ViewerId};
use thiserror::Error;

use crate::application::content::ContentError;
use crate::application::ports::TransportError;

/// Errors returned by board operations.
///
/// Content, protocol and transport failures carry the viewer and board they
/// happened for.  An operation that fails with one of them stops at the first
/// failing viewer; viewers already served keep what they received.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("content provider failed for viewer {viewer} on board {board}: {source}")]
    Content {
        board: ObjectiveName,
        viewer: ViewerId,
        #[source]
        source: ContentError,
    },

    #[error("encoding failed for viewer {viewer} on board {board}: {source}")]
    Protocol {
        board: ObjectiveName,
        viewer: ViewerId,
        #[source]
        source: ProtocolError,
    },

    #[error("delivery failed for viewer {viewer} on board {board}: {source}")]
    Transport {
        board: ObjectiveName,
        viewer: ViewerId,
        #[source]
        source: TransportError,
    },

    /// The viewer has no resolvable protocol version.
    #[error("viewer {0} is not connected")]
    ViewerOffline(ViewerId),

    #[error("board {0} has been destroyed")]
    Destroyed(ObjectiveName),

    #[error("a pager needs at least one board")]
    NoPages,
}

impl BoardError {
    /// Viewer the failure was attached to, if any.
    pub fn viewer(&self) -> Option<ViewerId> {
        match self {
            BoardError::Content { viewer, .. }
            | BoardError::Protocol { viewer, .. }
            | BoardError::Transport { viewer, .. }
            | BoardError::ViewerOffline(viewer) => Some(*viewer),
            _ => None,
        }
    }

    pub(crate) fn transport(board: &ObjectiveName, viewer: ViewerId, source: TransportError) -> Self {
        BoardError::Transport {
            board: board.clone(),
            viewer,
            source,
        }
    }
}
