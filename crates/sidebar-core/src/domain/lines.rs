//! The ordered line table of one board.
//!
//! # Order, slot and score (for beginners)
//!
//! Each row has three different "positions", and keeping them apart is what
//! makes the engine cheap on the wire:
//!
//! - **Order** is the row's index in the table.  It is what the user sees and
//!   what [`LineTable::shift`] changes.
//! - **Slot** ([`SlotIndex`]) is fixed when the row is added.  The team id and
//!   the synthetic score entry are derived from it, so reordering never
//!   recreates a team on the client.
//! - **Score** is what the client sorts by (highest on top).  A full refresh
//!   reassigns it top to bottom as `N, N-1, ..., 1`.  A row starts with no
//!   score at all ("unassigned") until it is first rendered.
//!
//! ```text
//!   order  slot  score
//!     0     0      3      Kills: 5
//!     1     2      2      Deaths: 1     <- shifted up from order 2
//!     2     1      1      Wins: 2
//! ```

use std::fmt;

use crate::domain::error::ValidationError;

/// Most rows a sidebar can display.
pub const MAX_LINES: usize = 15;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Board-unique, never reused handle for a line.
///
/// Slots are recycled after a removal; ids are not, so a stale handle to a
/// removed line is always detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(u64);

impl LineId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line #{}", self.0)
    }
}

/// Slot of a live line, `0..15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(slot: u8) -> Option<Self> {
        (usize::from(slot) < MAX_LINES).then_some(Self(slot))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The synthetic score entry for this slot: a colour code followed by a
    /// reset, which the client renders as nothing.
    pub fn entry_name(self) -> String {
        format!("§{:x}§r", self.0)
    }

    /// Inverse of [`SlotIndex::entry_name`].
    pub fn from_entry_name(entry: &str) -> Option<Self> {
        let mut chars = entry.chars();
        let (Some('§'), Some(digit), Some('§'), Some('r'), None) = (
            chars.next(),
            chars.next(),
            chars.next(),
            chars.next(),
            chars.next(),
        ) else {
            return None;
        };
        let slot = digit.to_digit(16)?;
        Self::new(slot as u8)
    }
}

// ── Entries ───────────────────────────────────────────────────────────────────

/// One row plus the engine-owned bookkeeping around it.
#[derive(Debug, Clone)]
pub struct LineEntry<T> {
    id: LineId,
    slot: SlotIndex,
    score: Option<i32>,
    pub value: T,
}

impl<T> LineEntry<T> {
    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    /// `None` until the first full refresh renders the line.
    pub fn score(&self) -> Option<i32> {
        self.score
    }

    pub fn is_rendered(&self) -> bool {
        self.score.is_some()
    }
}

/// Which packets a refresh emits for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// First render: create the team (and score when visible).
    Create,
    /// Already on the client: update the team and set or reset the score.
    Update,
}

/// One line's part of a full refresh, in top-to-bottom order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStep {
    pub line: LineId,
    pub path: RenderPath,
    pub score: i32,
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Ordered rows of one board.
#[derive(Debug, Clone)]
pub struct LineTable<T> {
    entries: Vec<LineEntry<T>>,
    next_id: u64,
}

impl<T> Default for LineTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LineTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends a line in the lowest free slot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooManyLines`] when the table already holds
    /// [`MAX_LINES`] lines; the table is unchanged.
    pub fn push(&mut self, value: T) -> Result<LineId, ValidationError> {
        if self.entries.len() >= MAX_LINES {
            return Err(ValidationError::TooManyLines { max: MAX_LINES });
        }
        let slot = (0..MAX_LINES as u8)
            .filter_map(SlotIndex::new)
            .find(|slot| self.entries.iter().all(|e| e.slot != *slot))
            .ok_or(ValidationError::TooManyLines { max: MAX_LINES })?;

        let id = LineId(self.next_id);
        self.next_id += 1;
        self.entries.push(LineEntry {
            id,
            slot,
            score: None,
            value,
        });
        Ok(id)
    }

    /// Removes a line and returns it with its last score.
    pub fn remove(&mut self, id: LineId) -> Result<LineEntry<T>, ValidationError> {
        let index = self.index_of(id)?;
        Ok(self.entries.remove(index))
    }

    /// Moves a line to `position` in display order.
    pub fn shift(&mut self, id: LineId, position: usize) -> Result<(), ValidationError> {
        let index = self.index_of(id)?;
        if position >= self.entries.len() {
            return Err(ValidationError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        let entry = self.entries.remove(index);
        self.entries.insert(position, entry);
        Ok(())
    }

    pub fn get(&self, id: LineId) -> Option<&LineEntry<T>> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: LineId) -> Option<&mut LineEntry<T>> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn contains(&self, id: LineId) -> bool {
        self.get(id).is_some()
    }

    /// Position of the line in display order.
    pub fn position(&self, id: LineId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineEntry<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every line; ids keep counting so old handles stay invalid.
    pub fn clear(&mut self) -> Vec<LineEntry<T>> {
        self.entries.drain(..).collect()
    }

    /// Plans a full refresh without changing anything.
    ///
    /// The score counter starts at the line count and decreases for every
    /// line that is rendered in this pass.  Already-rendered lines for which
    /// `in_flight` returns `true` keep their score and are left out.
    pub fn plan_full_refresh(&self, in_flight: impl Fn(LineId) -> bool) -> Vec<RefreshStep> {
        let mut counter = self.entries.len() as i32;
        let mut steps = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let path = match entry.score {
                None => RenderPath::Create,
                Some(_) if in_flight(entry.id) => continue,
                Some(_) => RenderPath::Update,
            };
            steps.push(RefreshStep {
                line: entry.id,
                path,
                score: counter,
            });
            counter -= 1;
        }
        steps
    }

    pub fn assign_score(&mut self, id: LineId, score: i32) -> Result<(), ValidationError> {
        let entry = self.get_mut(id).ok_or(ValidationError::UnknownLine(id))?;
        entry.score = Some(score);
        Ok(())
    }

    /// The rendered line with the highest score (the top row).
    pub fn max_line(&self) -> Option<&LineEntry<T>> {
        self.entries
            .iter()
            .filter(|e| e.score.is_some())
            .max_by_key(|e| e.score)
    }

    /// The rendered line with the lowest score (the bottom row).
    pub fn min_line(&self) -> Option<&LineEntry<T>> {
        self.entries
            .iter()
            .filter(|e| e.score.is_some())
            .min_by_key(|e| e.score)
    }

    fn index_of(&self, id: LineId) -> Result<usize, ValidationError> {
        self.position(id).ok_or(ValidationError::UnknownLine(id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(n: usize) -> (LineTable<String>, Vec<LineId>) {
        let mut table = LineTable::new();
        let ids = (0..n)
            .map(|i| table.push(format!("line {i}")).unwrap())
            .collect();
        (table, ids)
    }

    fn apply(table: &mut LineTable<String>, steps: &[RefreshStep]) {
        for step in steps {
            table.assign_score(step.line, step.score).unwrap();
        }
    }

    fn scores(table: &LineTable<String>) -> Vec<Option<i32>> {
        table.iter().map(|e| e.score()).collect()
    }

    #[test]
    fn test_push_assigns_sequential_slots() {
        let (table, _) = table_with(3);
        let slots: Vec<u8> = table.iter().map(|e| e.slot().get()).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn test_sixteenth_line_is_rejected_without_mutation() {
        // Arrange
        let (mut table, _) = table_with(MAX_LINES);

        // Act
        let result = table.push("one too many".to_string());

        // Assert
        assert_eq!(result, Err(ValidationError::TooManyLines { max: 15 }));
        assert_eq!(table.len(), MAX_LINES);
    }

    #[test]
    fn test_removed_slot_is_reused_but_id_is_not() {
        let (mut table, ids) = table_with(3);
        table.remove(ids[1]).unwrap();

        let new_id = table.push("new".to_string()).unwrap();

        assert_eq!(table.get(new_id).unwrap().slot().get(), 1);
        assert_ne!(new_id, ids[1]);
        assert!(!table.contains(ids[1]));
    }

    #[test]
    fn test_remove_unknown_line_fails() {
        let (mut table, ids) = table_with(1);
        table.remove(ids[0]).unwrap();
        assert_eq!(
            table.remove(ids[0]).map(|e| e.id()),
            Err(ValidationError::UnknownLine(ids[0]))
        );
    }

    #[test]
    fn test_first_refresh_creates_with_descending_scores() {
        let (mut table, ids) = table_with(3);

        let steps = table.plan_full_refresh(|_| false);

        assert_eq!(
            steps,
            vec![
                RefreshStep { line: ids[0], path: RenderPath::Create, score: 3 },
                RefreshStep { line: ids[1], path: RenderPath::Create, score: 2 },
                RefreshStep { line: ids[2], path: RenderPath::Create, score: 1 },
            ]
        );
        apply(&mut table, &steps);
        assert_eq!(scores(&table), vec![Some(3), Some(2), Some(1)]);
    }

    #[test]
    fn test_second_refresh_only_updates() {
        let (mut table, _) = table_with(4);
        let first = table.plan_full_refresh(|_| false);
        apply(&mut table, &first);

        let second = table.plan_full_refresh(|_| false);

        assert!(second.iter().all(|s| s.path == RenderPath::Update));
        let values: Vec<i32> = second.iter().map(|s| s.score).collect();
        assert_eq!(values, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_in_flight_lines_keep_their_score() {
        let (mut table, ids) = table_with(3);
        let first = table.plan_full_refresh(|_| false);
        apply(&mut table, &first);

        let steps = table.plan_full_refresh(|id| id == ids[0]);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], RefreshStep { line: ids[1], path: RenderPath::Update, score: 3 });
        assert_eq!(steps[1], RefreshStep { line: ids[2], path: RenderPath::Update, score: 2 });
    }

    #[test]
    fn test_in_flight_unrendered_line_is_still_created() {
        let (table, ids) = table_with(1);
        let steps = table.plan_full_refresh(|_| true);
        assert_eq!(steps, vec![RefreshStep { line: ids[0], path: RenderPath::Create, score: 1 }]);
    }

    #[test]
    fn test_scores_compact_after_removal() {
        let (mut table, ids) = table_with(3);
        let first = table.plan_full_refresh(|_| false);
        apply(&mut table, &first);

        table.remove(ids[0]).unwrap();
        let steps = table.plan_full_refresh(|_| false);
        apply(&mut table, &steps);

        assert_eq!(scores(&table), vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_shift_moves_line_and_keeps_slot() {
        let (mut table, ids) = table_with(3);

        table.shift(ids[2], 0).unwrap();

        let order: Vec<LineId> = table.iter().map(|e| e.id()).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[1]]);
        assert_eq!(table.get(ids[2]).unwrap().slot().get(), 2);
    }

    #[test]
    fn test_shift_out_of_range_fails() {
        let (mut table, ids) = table_with(2);
        assert_eq!(
            table.shift(ids[0], 2),
            Err(ValidationError::PositionOutOfRange { position: 2, len: 2 })
        );
    }

    #[test]
    fn test_max_and_min_ignore_unrendered_lines() {
        let (mut table, ids) = table_with(2);
        assert!(table.max_line().is_none());

        let steps = table.plan_full_refresh(|_| false);
        apply(&mut table, &steps);
        let late = table.push("late".to_string()).unwrap();

        assert_eq!(table.max_line().unwrap().id(), ids[0]);
        assert_eq!(table.min_line().unwrap().id(), ids[1]);
        assert!(!table.get(late).unwrap().is_rendered());
    }

    #[test]
    fn test_entry_name_round_trip() {
        for slot in 0..MAX_LINES as u8 {
            let slot = SlotIndex::new(slot).unwrap();
            assert_eq!(SlotIndex::from_entry_name(&slot.entry_name()), Some(slot));
        }
        assert_eq!(SlotIndex::new(14).unwrap().entry_name(), "§e§r");
        assert!(SlotIndex::new(15).is_none());
        assert!(SlotIndex::from_entry_name("§f§r").is_none());
        assert!(SlotIndex::from_entry_name("x").is_none());
    }

    #[test]
    fn test_clear_keeps_ids_increasing() {
        let (mut table, ids) = table_with(2);
        let removed = table.clear();
        assert_eq!(removed.len(), 2);
        let next = table.push("again".to_string()).unwrap();
        assert!(next > ids[1]);
    }
}
