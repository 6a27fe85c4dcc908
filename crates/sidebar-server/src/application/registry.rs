//! Registry of live boards.
//!
//! The registry owns every board as `Arc<Board>` keyed by [`BoardId`].
//! Periodic tasks do not hold the board itself; they hold a [`BoardRef`]
//! (a weak registry pointer plus the id) and look the board up on each tick.
//! Once a board is destroyed it leaves the map and its tasks wind down on
//! their next tick.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use sidebar_core::{DefaultTextRenderer, ObjectiveName, TextRenderer};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::application::board::Board;
use crate::application::error::BoardError;
use crate::application::ports::{PacketTransport, VersionResolver};
use crate::application::title::TitleSource;
use crate::application::viewers::ViewerSet;

/// Identity of a board inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardId(Uuid);

impl BoardId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSettings {
    /// Delay between frames of an animated title.
    pub title_frame_interval: Duration,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            // One game tick.
            title_frame_interval: Duration::from_millis(50),
        }
    }
}

pub(crate) struct RegistryShared {
    boards: RwLock<HashMap<BoardId, Arc<Board>>>,
    transport: Arc<dyn PacketTransport>,
    resolver: Arc<dyn VersionResolver>,
    renderer: Arc<dyn TextRenderer>,
    settings: BoardSettings,
}

/// Weak handle from a task back to its board.
#[derive(Clone)]
pub(crate) struct BoardRef {
    registry: Weak<RegistryShared>,
    id: BoardId,
}

impl BoardRef {
    /// Looks the board up; `None` once it was destroyed or the registry
    /// itself is gone.
    pub(crate) async fn resolve(&self) -> Option<Arc<Board>> {
        let registry = self.registry.upgrade()?;
        let board = registry.boards.read().await.get(&self.id).cloned();
        board
    }

    /// Drops the board from the registry map.
    pub(crate) async fn forget(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.boards.write().await.remove(&self.id);
        }
    }
}

/// Creates and tracks boards for one host.
///
/// Cloning is cheap; clones share the same boards.
#[derive(Clone)]
pub struct BoardRegistry {
    shared: Arc<RegistryShared>,
}

impl BoardRegistry {
    /// Registry with the default text renderer and settings.
    pub fn new(transport: Arc<dyn PacketTransport>, resolver: Arc<dyn VersionResolver>) -> Self {
        Self::with_options(transport, resolver, Arc::new(DefaultTextRenderer), BoardSettings::default())
    }

    pub fn with_options(
        transport: Arc<dyn PacketTransport>,
        resolver: Arc<dyn VersionResolver>,
        renderer: Arc<dyn TextRenderer>,
        settings: BoardSettings,
    ) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                boards: RwLock::new(HashMap::new()),
                transport,
                resolver,
                renderer,
                settings,
            }),
        }
    }

    pub fn settings(&self) -> BoardSettings {
        self.shared.settings
    }

    /// Creates a board with a generated objective name.
    pub async fn create_board(&self, title: impl Into<TitleSource>) -> Result<Arc<Board>, BoardError> {
        self.create_board_named(ObjectiveName::generate(), title).await
    }

    /// Creates a board with a caller-chosen objective name.
    pub async fn create_board_named(
        &self,
        objective: ObjectiveName,
        title: impl Into<TitleSource>,
    ) -> Result<Arc<Board>, BoardError> {
        let id = BoardId::new_random();
        let viewers = ViewerSet::new(
            objective.clone(),
            Arc::clone(&self.shared.transport),
            Arc::clone(&self.shared.resolver),
        );
        let handle = BoardRef {
            registry: Arc::downgrade(&self.shared),
            id,
        };
        let board = Arc::new(Board::new(
            id,
            objective,
            viewers,
            Arc::clone(&self.shared.renderer),
            self.shared.settings,
            handle,
        ));
        self.shared.boards.write().await.insert(id, Arc::clone(&board));
        board.set_title(title).await?;
        info!(board = %board.objective(), %id, "board created");
        Ok(board)
    }

    pub async fn get(&self, id: BoardId) -> Option<Arc<Board>> {
        self.shared.boards.read().await.get(&id).cloned()
    }

    /// Destroys a board.  Returns `false` if no such board is registered.
    pub async fn remove(&self, id: BoardId) -> bool {
        let board = self.shared.boards.write().await.remove(&id);
        match board {
            Some(board) => {
                board.destroy().await;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.shared.boards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shared.boards.read().await.is_empty()
    }

    pub async fn board_ids(&self) -> Vec<BoardId> {
        self.shared.boards.read().await.keys().copied().collect()
    }

    /// Destroys every board.
    pub async fn shutdown(&self) {
        let boards: Vec<_> = self.shared.boards.write().await.drain().map(|(_, b)| b).collect();
        for board in boards {
            board.destroy().await;
        }
    }
}
