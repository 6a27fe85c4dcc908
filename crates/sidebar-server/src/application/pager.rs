//! Rotating several boards through the same viewers.
//!
//! A pager shows exactly one of its boards (the current *page*) to each of its
//! viewers.  Switching pages takes the viewers off the current board and adds
//! them to the next one, wrapping around after the last page.

use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;

use sidebar_core::{LineId, Text, ViewerId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::board::Board;
use crate::application::error::BoardError;
use crate::application::tasks::{spawn_periodic, TaskHandle};

struct PagerState {
    boards: Vec<Arc<Board>>,
    current: usize,
    viewers: BTreeSet<ViewerId>,
    switch_task: Option<TaskHandle>,
}

impl PagerState {
    fn current_board(&self) -> Result<&Arc<Board>, BoardError> {
        self.boards.get(self.current).ok_or(BoardError::NoPages)
    }
}

/// A cyclic set of pages shown to a shared viewer set.
#[derive(Clone)]
pub struct SidebarPager {
    state: Arc<Mutex<PagerState>>,
}

impl SidebarPager {
    /// Creates a pager over `boards`, optionally switching pages every
    /// `switch_interval` (requires a Tokio runtime).
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NoPages`] when `boards` is empty.
    pub fn new(boards: Vec<Arc<Board>>, switch_interval: Option<Duration>) -> Result<Self, BoardError> {
        if boards.is_empty() {
            return Err(BoardError::NoPages);
        }
        let state = Arc::new_cyclic(|weak| {
            Mutex::new(PagerState {
                boards,
                current: 0,
                viewers: BTreeSet::new(),
                switch_task: switch_interval.map(|period| Self::spawn_switcher(weak.clone(), period)),
            })
        });
        Ok(Self { state })
    }

    /// Number of the page currently shown, starting at 1.
    pub async fn current_page(&self) -> usize {
        self.state.lock().await.current + 1
    }

    pub async fn page_count(&self) -> usize {
        self.state.lock().await.boards.len()
    }

    pub async fn pages(&self) -> Vec<Arc<Board>> {
        self.state.lock().await.boards.clone()
    }

    pub async fn viewers(&self) -> Vec<ViewerId> {
        self.state.lock().await.viewers.iter().copied().collect()
    }

    /// Shows the current page to a viewer.
    pub async fn show(&self, viewer: ViewerId) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;
        let board = Arc::clone(state.current_board()?);
        if !state.viewers.insert(viewer) {
            return Ok(());
        }
        if let Err(e) = board.add_viewer(viewer).await {
            state.viewers.remove(&viewer);
            return Err(e);
        }
        Ok(())
    }

    /// Takes the pager off a viewer's screen.
    pub async fn hide(&self, viewer: ViewerId) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;
        if !state.viewers.remove(&viewer) {
            return Ok(());
        }
        let board = Arc::clone(state.current_board()?);
        board.remove_viewer(viewer).await?;
        Ok(())
    }

    /// Moves every viewer to the next page.
    ///
    /// Viewers that went offline are dropped from the pager.  Other failures
    /// do not stop the switch; the first one is returned afterwards.
    pub async fn switch_page(&self) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;
        let from = Arc::clone(state.current_board()?);
        if state.boards.len() == 1 {
            return Ok(());
        }
        state.current = (state.current + 1) % state.boards.len();
        let to = Arc::clone(state.current_board()?);

        let mut first_error = None;
        let viewers: Vec<_> = state.viewers.iter().copied().collect();
        for viewer in viewers {
            if let Err(e) = from.remove_viewer(viewer).await {
                warn!(%viewer, "leaving page failed: {e}");
                first_error.get_or_insert(e);
            }
            match to.add_viewer(viewer).await {
                Ok(_) => {}
                Err(BoardError::ViewerOffline(_)) => {
                    state.viewers.remove(&viewer);
                }
                Err(e) => {
                    warn!(%viewer, "entering page failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        debug!(page = state.current + 1, pages = state.boards.len(), "page switched");
        first_error.map_or(Ok(()), Err)
    }

    /// Appends a static line to every page, built from the page number
    /// (starting at 1) and the page count, e.g. `"Page 2/3"`.
    pub async fn add_page_line<F>(&self, mut line: F) -> Result<Vec<LineId>, BoardError>
    where
        F: FnMut(usize, usize) -> Text,
    {
        let boards = self.pages().await;
        let count = boards.len();
        let mut ids = Vec::with_capacity(count);
        for (index, board) in boards.iter().enumerate() {
            ids.push(board.add_line(line(index + 1, count)).await?);
        }
        Ok(ids)
    }

    /// Destroys every page and stops automatic switching.  The pager is
    /// empty afterwards and every operation returns [`BoardError::NoPages`].
    pub async fn destroy(&self) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.switch_task.take() {
            task.cancel();
        }
        for board in state.boards.drain(..) {
            board.destroy().await;
        }
        state.viewers.clear();
        state.current = 0;
    }

    fn spawn_switcher(state: Weak<Mutex<PagerState>>, period: Duration) -> TaskHandle {
        spawn_periodic(period, move || {
            let state = state.clone();
            async move {
                let Some(state) = state.upgrade() else {
                    return ControlFlow::Break(());
                };
                let pager = SidebarPager { state };
                match pager.switch_page().await {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(BoardError::NoPages) => ControlFlow::Break(()),
                    Err(e) => {
                        warn!("automatic page switch failed: {e}");
                        ControlFlow::Continue(())
                    }
                }
            }
        })
    }
}
