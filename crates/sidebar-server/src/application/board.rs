//! The board: one objective, up to 15 lines, and the viewers it is shown to.
//!
//! # Rendering model (for beginners)
//!
//! The client displays rows sorted by score, highest first.  A board keeps its
//! lines in an ordered list and derives scores from positions: on every full
//! refresh the top line gets `N` (the line count), the next `N - 1`, down to
//! `1` at the bottom.  Each line owns a *team* whose prefix carries the text,
//! and a fixed invisible *entry name* that the score is attached to.
//!
//! A line goes through two render paths:
//!
//! ```text
//!  create path (first render)          update path (afterwards)
//!  ─────────────────────────           ────────────────────────
//!  visible: team-create + set-score    visible: team-update + set-score
//!  hidden:  team-create (empty text)   hidden:  reset-score
//! ```
//!
//! # Locking
//!
//! All structural state (title, number format, line table, task handles) is
//! one [`BoardState`] value behind one async mutex.  The viewer set has its own
//! mutex.  Every operation that needs both takes the state lock first.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sidebar_core::protocol::packets::{DisplaySlot, ObjectiveAction, TeamAction};
use sidebar_core::{
    LineEntry, LineId, LineTable, ObjectiveName, RenderPath, ScoreboardPacket, SlotIndex, Text,
    TextRenderer, ValidationError, ViewerId, WireText,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::application::content::{
    resolve_format, AlwaysVisible, ContentError, LineContent, LineSource, LineSpec, ScoreFormat,
    ViewerContext, Visibility,
};
use crate::application::error::BoardError;
use crate::application::registry::{BoardId, BoardRef, BoardSettings};
use crate::application::tasks::{spawn_periodic, TaskHandle};
use crate::application::title::{TitleSource, TitleState};
use crate::application::viewers::ViewerSet;

/// Read-only view of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    pub id: LineId,
    pub slot: SlotIndex,
    /// Position in display order, 0 = top.
    pub position: usize,
    /// `None` until the line has been rendered once.
    pub score: Option<i32>,
    pub is_static: bool,
    pub refresh_active: bool,
}

pub(crate) struct BoardState {
    title: TitleState,
    number_format: Option<ScoreFormat>,
    lines: LineTable<LineSpec>,
    title_task: Option<TaskHandle>,
    board_refresh: Option<TaskHandle>,
}

/// A sidebar rendered per viewer.
///
/// Boards are created by [`crate::application::registry::BoardRegistry`] and
/// shared as `Arc<Board>`.
pub struct Board {
    id: BoardId,
    objective: ObjectiveName,
    state: Mutex<BoardState>,
    viewers: ViewerSet,
    renderer: Arc<dyn TextRenderer>,
    settings: BoardSettings,
    destroyed: AtomicBool,
    handle: BoardRef,
}

impl Board {
    pub(crate) fn new(
        id: BoardId,
        objective: ObjectiveName,
        viewers: ViewerSet,
        renderer: Arc<dyn TextRenderer>,
        settings: BoardSettings,
        handle: BoardRef,
    ) -> Self {
        Self {
            id,
            objective,
            state: Mutex::new(BoardState {
                title: TitleState::Fixed(Text::empty()),
                number_format: None,
                lines: LineTable::new(),
                title_task: None,
                board_refresh: None,
            }),
            viewers,
            renderer,
            settings,
            destroyed: AtomicBool::new(false),
            handle,
        }
    }

    pub fn id(&self) -> BoardId {
        self.id
    }

    pub fn objective(&self) -> &ObjectiveName {
        &self.objective
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    // ── Title and number format ───────────────────────────────────────────

    /// Replaces the title, cancelling any running title animation first.
    pub async fn set_title(&self, title: impl Into<TitleSource>) -> Result<(), BoardError> {
        let mut state = self.live_state().await?;
        if let Some(task) = state.title_task.take() {
            task.cancel();
        }
        state.title = TitleState::from_source(title.into());
        if state.title.is_animated() {
            state.title_task = Some(self.spawn_title_task());
        }
        self.broadcast_objective(&state).await
    }

    /// Advances an animated title by one frame and sends it.
    ///
    /// Returns `Ok(false)` when the title is not animated or its frames have
    /// run out.
    pub async fn tick_title(&self) -> Result<bool, BoardError> {
        let mut state = self.live_state().await?;
        if !state.title.advance() {
            return Ok(false);
        }
        self.broadcast_objective(&state).await?;
        Ok(true)
    }

    /// Sets the objective-wide number format (`None` restores plain numbers).
    pub async fn set_number_format(&self, format: Option<ScoreFormat>) -> Result<(), BoardError> {
        let mut state = self.live_state().await?;
        state.number_format = format;
        self.broadcast_objective(&state).await
    }

    // ── Adding lines ──────────────────────────────────────────────────────

    /// Appends a static line.  Nothing is sent until the next full refresh.
    pub async fn add_line(&self, text: impl Into<Text>) -> Result<LineId, BoardError> {
        self.add_line_with(LineSource::Static(text.into()), Arc::new(AlwaysVisible))
            .await
    }

    /// Appends a static line from a `§`-coded string.
    pub async fn add_text_line(&self, legacy: impl Into<String>) -> Result<LineId, BoardError> {
        self.add_line(Text::legacy(legacy)).await
    }

    pub async fn add_blank_line(&self) -> Result<LineId, BoardError> {
        self.add_line(Text::empty()).await
    }

    /// Appends a line whose text is computed per viewer.
    pub async fn add_updatable_line<F>(&self, content: F) -> Result<LineId, BoardError>
    where
        F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync + 'static,
    {
        self.add_line_with(LineSource::Dynamic(Arc::new(content)), Arc::new(AlwaysVisible))
            .await
    }

    /// Appends a dynamic line that is only shown to viewers for which
    /// `visible` returns `true`.
    pub async fn add_conditional_line<F, P>(&self, content: F, visible: P) -> Result<LineId, BoardError>
    where
        F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync + 'static,
        P: Fn(&ViewerContext) -> Result<bool, ContentError> + Send + Sync + 'static,
    {
        self.add_line_with(LineSource::Dynamic(Arc::new(content)), Arc::new(visible))
            .await
    }

    pub async fn add_line_with(
        &self,
        source: LineSource,
        visibility: Arc<dyn Visibility>,
    ) -> Result<LineId, BoardError> {
        let mut state = self.live_state().await?;
        let id = state.lines.push(LineSpec::new(source, visibility))?;
        debug!(board = %self.objective, line = %id, "line added");
        Ok(id)
    }

    // ── Structural changes ────────────────────────────────────────────────

    /// Removes a line.  A rendered line is taken off every viewer's sidebar
    /// and the remaining scores are compacted by a full refresh; a line that
    /// was never rendered is dropped silently.
    pub async fn remove_line(&self, line: LineId) -> Result<(), BoardError> {
        let mut state = self.live_state().await?;
        let entry = state.lines.remove(line)?;
        if let Some(task) = &entry.value.refresh {
            task.cancel();
        }
        if !entry.is_rendered() {
            debug!(board = %self.objective, %line, "unrendered line removed");
            return Ok(());
        }
        let removal = self.line_removal(entry.slot());
        self.viewers.broadcast(|_| Ok(removal.clone())).await?;
        self.refresh_locked(&mut state).await
    }

    /// Moves a line to `position` (0 = top) and refreshes scores.
    pub async fn shift_line(&self, line: LineId, position: usize) -> Result<(), BoardError> {
        let mut state = self.live_state().await?;
        state.lines.shift(line, position)?;
        self.refresh_locked(&mut state).await
    }

    // ── Line setters ──────────────────────────────────────────────────────

    /// Replaces the provider of a dynamic line.  Takes effect on the next
    /// render of that line.
    pub async fn set_line_content<F>(&self, line: LineId, content: F) -> Result<(), BoardError>
    where
        F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync + 'static,
    {
        let mut state = self.live_state().await?;
        let entry = Self::entry_mut(&mut state, line)?;
        if entry.value.is_static() {
            return Err(ValidationError::StaticContent(line).into());
        }
        entry.value.source = LineSource::Dynamic(Arc::new(content) as Arc<dyn LineContent>);
        Ok(())
    }

    pub async fn set_line_visibility<P>(&self, line: LineId, visible: P) -> Result<(), BoardError>
    where
        P: Fn(&ViewerContext) -> Result<bool, ContentError> + Send + Sync + 'static,
    {
        let mut state = self.live_state().await?;
        Self::entry_mut(&mut state, line)?.value.visibility = Arc::new(visible);
        Ok(())
    }

    pub async fn set_line_score_format(
        &self,
        line: LineId,
        format: Option<ScoreFormat>,
    ) -> Result<(), BoardError> {
        let mut state = self.live_state().await?;
        Self::entry_mut(&mut state, line)?.value.score_format = format;
        Ok(())
    }

    // ── Refresh ───────────────────────────────────────────────────────────

    /// Re-derives every score from line order and renders each line to every
    /// viewer.  Lines whose own periodic refresh is running are left alone.
    pub async fn update_all_lines(&self) -> Result<(), BoardError> {
        let mut state = self.live_state().await?;
        self.refresh_locked(&mut state).await
    }

    /// Re-renders one line for every viewer with its current score.
    ///
    /// A line that has not been rendered yet is left for the next full
    /// refresh.
    pub async fn update_line(&self, line: LineId) -> Result<(), BoardError> {
        let state = self.live_state().await?;
        let entry = state.lines.get(line).ok_or(ValidationError::UnknownLine(line))?;
        let Some(score) = entry.score() else {
            debug!(board = %self.objective, %line, "line not rendered yet, skipping update");
            return Ok(());
        };
        self.viewers
            .broadcast(|ctx| self.render_line(entry, RenderPath::Update, score, ctx))
            .await
    }

    /// Installs a periodic refresh for one dynamic line.
    ///
    /// While it runs, full refreshes skip the line.  A second install fails
    /// until the first is cancelled with [`Board::cancel_line_refresh`].
    pub async fn update_line_periodically(&self, line: LineId, period: Duration) -> Result<(), BoardError> {
        if period.is_zero() {
            return Err(ValidationError::ZeroPeriod.into());
        }
        let mut state = self.live_state().await?;
        let entry = Self::entry_mut(&mut state, line)?;
        if entry.value.is_static() {
            return Err(ValidationError::StaticContent(line).into());
        }
        if entry.value.refresh_active() {
            return Err(ValidationError::RefreshAlreadyActive(line).into());
        }

        let target = self.handle.clone();
        entry.value.refresh = Some(spawn_periodic(period, move || {
            let target = target.clone();
            async move {
                let Some(board) = target.resolve().await else {
                    return ControlFlow::Break(());
                };
                match board.update_line(line).await {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(BoardError::Destroyed(_))
                    | Err(BoardError::Validation(ValidationError::UnknownLine(_))) => ControlFlow::Break(()),
                    Err(e) => {
                        warn!(board = %board.objective(), %line, "line refresh failed: {e}");
                        ControlFlow::Continue(())
                    }
                }
            }
        }));
        debug!(board = %self.objective, %line, ?period, "line refresh installed");
        Ok(())
    }

    /// Stops a line's periodic refresh.  Returns `false` when none was
    /// running.
    pub async fn cancel_line_refresh(&self, line: LineId) -> Result<bool, BoardError> {
        let mut state = self.live_state().await?;
        let entry = Self::entry_mut(&mut state, line)?;
        Ok(match entry.value.refresh.take() {
            Some(task) => {
                let was_active = task.is_active();
                task.cancel();
                was_active
            }
            None => false,
        })
    }

    /// Installs a periodic full refresh of the whole board.
    ///
    /// A board runs at most one such refresh; installing again replaces the
    /// running one and its period.
    pub async fn update_lines_periodically(&self, period: Duration) -> Result<(), BoardError> {
        if period.is_zero() {
            return Err(ValidationError::ZeroPeriod.into());
        }
        let mut state = self.live_state().await?;
        if let Some(previous) = state.board_refresh.take() {
            previous.cancel();
            debug!(board = %self.objective, "board refresh replaced");
        }
        let target = self.handle.clone();
        state.board_refresh = Some(spawn_periodic(period, move || {
            let target = target.clone();
            async move {
                let Some(board) = target.resolve().await else {
                    return ControlFlow::Break(());
                };
                match board.update_all_lines().await {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(BoardError::Destroyed(_)) => ControlFlow::Break(()),
                    Err(e) => {
                        warn!(board = %board.objective(), "board refresh failed: {e}");
                        ControlFlow::Continue(())
                    }
                }
            }
        }));
        debug!(board = %self.objective, ?period, "board refresh installed");
        Ok(())
    }

    /// Stops the periodic full refresh.  Returns `false` when none was
    /// running.
    pub async fn cancel_lines_refresh(&self) -> Result<bool, BoardError> {
        let mut state = self.live_state().await?;
        Ok(match state.board_refresh.take() {
            Some(task) => {
                let was_active = task.is_active();
                task.cancel();
                was_active
            }
            None => false,
        })
    }

    /// `true` while a periodic full refresh is installed and running.
    pub async fn lines_refresh_active(&self) -> bool {
        let state = self.state.lock().await;
        state.board_refresh.as_ref().is_some_and(TaskHandle::is_active)
    }

    // ── Viewers ───────────────────────────────────────────────────────────

    /// Shows the board to a viewer.  Returns `Ok(false)` if the viewer
    /// already sees it.
    ///
    /// Lines that have never been rendered are scored first with a full
    /// refresh, so the new viewer receives every line.
    pub async fn add_viewer(&self, viewer: ViewerId) -> Result<bool, BoardError> {
        let mut state = self.live_state().await?;
        if self.viewers.contains(viewer).await {
            return Ok(false);
        }
        if state.lines.iter().any(|e| !e.is_rendered()) {
            self.refresh_locked(&mut state).await?;
        }
        let state = &*state;
        self.viewers
            .add_with(viewer, |ctx| {
                let mut packets = Vec::with_capacity(2 + state.lines.len() * 2);
                packets.push(self.objective_packet(state, ctx, true)?);
                for entry in state.lines.iter() {
                    if let Some(score) = entry.score() {
                        packets.extend(self.render_line(entry, RenderPath::Create, score, ctx)?);
                    }
                }
                packets.push(ScoreboardPacket::DisplayObjective {
                    slot: DisplaySlot::Sidebar,
                    name: self.objective.to_string(),
                });
                Ok(packets)
            })
            .await
    }

    /// Takes the board off a viewer's screen.  Returns `Ok(false)` if the
    /// viewer was not shown the board.
    pub async fn remove_viewer(&self, viewer: ViewerId) -> Result<bool, BoardError> {
        let state = self.live_state().await?;
        let teardown = self.teardown(&state);
        self.viewers.remove_with(viewer, |_| Ok(teardown)).await
    }

    /// Removes every viewer, best effort.  Returns how many were removed.
    pub async fn remove_all_viewers(&self) -> Result<usize, BoardError> {
        let state = self.live_state().await?;
        let teardown = self.teardown(&state);
        Ok(self.viewers.drain_with(|_| Ok(teardown.clone())).await)
    }

    pub async fn viewers(&self) -> Vec<ViewerId> {
        self.viewers.snapshot().await
    }

    pub async fn has_viewer(&self, viewer: ViewerId) -> bool {
        self.viewers.contains(viewer).await
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub async fn lines(&self) -> Vec<LineInfo> {
        let state = self.state.lock().await;
        state
            .lines
            .iter()
            .enumerate()
            .map(|(position, entry)| Self::info(entry, position))
            .collect()
    }

    pub async fn line(&self, line: LineId) -> Option<LineInfo> {
        let state = self.state.lock().await;
        let position = state.lines.position(line)?;
        state.lines.get(line).map(|entry| Self::info(entry, position))
    }

    pub async fn line_count(&self) -> usize {
        self.state.lock().await.lines.len()
    }

    /// The rendered line with the highest score (the top row).
    pub async fn max_line(&self) -> Option<LineInfo> {
        let state = self.state.lock().await;
        let entry = state.lines.max_line()?;
        state.lines.position(entry.id()).map(|position| Self::info(entry, position))
    }

    /// The rendered line with the lowest score (the bottom row).
    pub async fn min_line(&self) -> Option<LineInfo> {
        let state = self.state.lock().await;
        let entry = state.lines.min_line()?;
        state.lines.position(entry.id()).map(|position| Self::info(entry, position))
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Cancels every task, removes the board from every viewer, clears its
    /// lines and drops it from the registry.  Calling it again does nothing;
    /// every other operation on a destroyed board returns
    /// [`BoardError::Destroyed`].
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock().await;
        if let Some(task) = state.title_task.take() {
            task.cancel();
        }
        if let Some(task) = state.board_refresh.take() {
            task.cancel();
        }
        let teardown = self.teardown(&state);
        let evicted = self.viewers.drain_with(|_| Ok(teardown.clone())).await;
        let cleared = state.lines.clear();
        drop(state);

        self.handle.forget().await;
        info!(board = %self.objective, evicted, lines = cleared.len(), "board destroyed");
    }

    // ── Internals ─────────────────────────────────────────────────────────

    async fn live_state(&self) -> Result<MutexGuard<'_, BoardState>, BoardError> {
        let state = self.state.lock().await;
        if self.is_destroyed() {
            return Err(BoardError::Destroyed(self.objective.clone()));
        }
        Ok(state)
    }

    fn entry_mut(state: &mut BoardState, line: LineId) -> Result<&mut LineEntry<LineSpec>, BoardError> {
        state
            .lines
            .get_mut(line)
            .ok_or(BoardError::Validation(ValidationError::UnknownLine(line)))
    }

    fn info(entry: &LineEntry<LineSpec>, position: usize) -> LineInfo {
        LineInfo {
            id: entry.id(),
            slot: entry.slot(),
            position,
            score: entry.score(),
            is_static: entry.value.is_static(),
            refresh_active: entry.value.refresh_active(),
        }
    }

    fn spawn_title_task(&self) -> TaskHandle {
        let target = self.handle.clone();
        spawn_periodic(self.settings.title_frame_interval, move || {
            let target = target.clone();
            async move {
                let Some(board) = target.resolve().await else {
                    return ControlFlow::Break(());
                };
                match board.tick_title().await {
                    Ok(true) => ControlFlow::Continue(()),
                    Ok(false) | Err(BoardError::Destroyed(_)) => ControlFlow::Break(()),
                    Err(e) => {
                        warn!(board = %board.objective(), "title animation failed: {e}");
                        ControlFlow::Continue(())
                    }
                }
            }
        })
    }

    /// Full refresh with the state lock already held.
    async fn refresh_locked(&self, state: &mut BoardState) -> Result<(), BoardError> {
        let steps = state
            .lines
            .plan_full_refresh(|id| state.lines.get(id).is_some_and(|e| e.value.refresh_active()));
        for step in &steps {
            state.lines.assign_score(step.line, step.score)?;
        }

        let state = &*state;
        let mut rows = Vec::with_capacity(steps.len());
        for step in &steps {
            let entry = state
                .lines
                .get(step.line)
                .ok_or(ValidationError::UnknownLine(step.line))?;
            rows.push((entry, step.path, step.score));
        }

        self.viewers
            .broadcast(|ctx| {
                let mut packets = Vec::with_capacity(rows.len() * 2);
                for (entry, path, score) in &rows {
                    packets.extend(self.render_line(entry, *path, *score, ctx)?);
                }
                Ok(packets)
            })
            .await?;
        debug!(board = %self.objective, lines = steps.len(), "full refresh");
        Ok(())
    }

    fn render_line(
        &self,
        entry: &LineEntry<LineSpec>,
        path: RenderPath,
        score: i32,
        ctx: &ViewerContext,
    ) -> Result<Vec<ScoreboardPacket>, ContentError> {
        let visible = entry.value.visibility.is_visible(ctx)?;
        let team = self.objective.team_id(entry.slot());
        let entry_name = entry.slot().entry_name();

        let mut packets = Vec::with_capacity(2);
        match (path, visible) {
            (RenderPath::Create, true) => {
                packets.push(ScoreboardPacket::Team {
                    name: team,
                    action: TeamAction::Create {
                        text: self.wire_text(ctx, &entry.value.text(ctx)?),
                        entries: vec![entry_name],
                    },
                });
                packets.push(self.set_score(entry, score, ctx)?);
            }
            (RenderPath::Create, false) => packets.push(ScoreboardPacket::Team {
                name: team,
                action: TeamAction::Create {
                    text: WireText::empty(),
                    entries: vec![entry_name],
                },
            }),
            (RenderPath::Update, true) => {
                packets.push(ScoreboardPacket::Team {
                    name: team,
                    action: TeamAction::Update {
                        text: self.wire_text(ctx, &entry.value.text(ctx)?),
                    },
                });
                packets.push(self.set_score(entry, score, ctx)?);
            }
            (RenderPath::Update, false) => packets.push(ScoreboardPacket::ResetScore {
                entry: entry_name,
                objective: self.objective.to_string(),
            }),
        }
        Ok(packets)
    }

    fn set_score(
        &self,
        entry: &LineEntry<LineSpec>,
        score: i32,
        ctx: &ViewerContext,
    ) -> Result<ScoreboardPacket, ContentError> {
        Ok(ScoreboardPacket::SetScore {
            entry: entry.slot().entry_name(),
            objective: self.objective.to_string(),
            value: score,
            number_format: resolve_format(entry.value.score_format.as_ref(), ctx, &*self.renderer)?,
        })
    }

    fn objective_packet(
        &self,
        state: &BoardState,
        ctx: &ViewerContext,
        create: bool,
    ) -> Result<ScoreboardPacket, ContentError> {
        let title = self.wire_text(ctx, &state.title.resolve(ctx)?);
        let number_format = resolve_format(state.number_format.as_ref(), ctx, &*self.renderer)?;
        let action = if create {
            ObjectiveAction::Create { title, number_format }
        } else {
            ObjectiveAction::Update { title, number_format }
        };
        Ok(ScoreboardPacket::Objective {
            name: self.objective.to_string(),
            action,
        })
    }

    async fn broadcast_objective(&self, state: &BoardState) -> Result<(), BoardError> {
        self.viewers
            .broadcast(|ctx| Ok(vec![self.objective_packet(state, ctx, false)?]))
            .await
    }

    fn line_removal(&self, slot: SlotIndex) -> Vec<ScoreboardPacket> {
        vec![
            ScoreboardPacket::ResetScore {
                entry: slot.entry_name(),
                objective: self.objective.to_string(),
            },
            ScoreboardPacket::Team {
                name: self.objective.team_id(slot),
                action: TeamAction::Remove,
            },
        ]
    }

    /// Packets that take the whole board off a client.
    fn teardown(&self, state: &BoardState) -> Vec<ScoreboardPacket> {
        let mut packets: Vec<_> = state
            .lines
            .iter()
            .filter(|e| e.is_rendered())
            .flat_map(|e| self.line_removal(e.slot()))
            .collect();
        packets.push(ScoreboardPacket::Objective {
            name: self.objective.to_string(),
            action: ObjectiveAction::Remove,
        });
        packets
    }

    fn wire_text(&self, ctx: &ViewerContext, text: &Text) -> WireText {
        self.renderer.render(ctx.viewer, text)
    }
}
