//! Selection and navigation state machine
//!
//! The selection is either empty or points at one media item. It is not
//! required to be inside the current window: an item selected earlier stays
//! selected across a re-center that moved away from it, so its tags can still
//! be edited.
//!
//! Stepping is purely local here. When a step runs off the edge of a
//! tag-filter window the caller gets [`Step::Blocked`] and decides whether to
//! re-center and retry (see [`crate::gallery::Gallery::next`]).

use super::search::SearchMode;
use super::window::{Edge, WindowManager};
use crate::api::{MediaId, MediaItem};
use log::debug;

/// Direction of the most recent next/prev move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// The window edge a move in this direction runs into
    #[must_use]
    pub const fn edge(self) -> Edge {
        match self {
            Self::Forward => Edge::End,
            Self::Backward => Edge::Start,
        }
    }
}

/// How a fresh window affected the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// The selected item is still in the window
    Kept(MediaId),
    /// The selection moved to another item
    Moved(MediaId),
    /// The window is empty; nothing is selected
    Cleared,
}

impl SelectionChange {
    /// The id selected afterwards, if any
    #[must_use]
    pub const fn id(&self) -> Option<MediaId> {
        match self {
            Self::Kept(id) | Self::Moved(id) => Some(*id),
            Self::Cleared => None,
        }
    }
}

/// Result of a single local step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The selection moved to this item
    Moved(MediaItem),
    /// The move would leave the window at this edge
    Blocked(Edge),
    /// The window is empty
    Empty,
}

/// Current selection and the direction of the last move
#[derive(Debug, Clone, Default)]
pub struct Selection {
    current: Option<MediaItem>,
    last_direction: Option<Direction>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current(&self) -> Option<&MediaItem> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn current_id(&self) -> Option<MediaId> {
        self.current.as_ref().map(|item| item.id)
    }

    #[must_use]
    pub const fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    /// Direction used to pick a replacement after deleting the current item
    #[must_use]
    pub fn advance_direction(&self) -> Direction {
        self.last_direction.unwrap_or_default()
    }

    #[must_use]
    pub fn is_selected(&self, id: MediaId) -> bool {
        self.current_id() == Some(id)
    }

    /// Selects `item` directly, e.g. from a click
    pub fn select(&mut self, item: MediaItem) {
        self.current = Some(item);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Reconciles the selection against a freshly searched window
    ///
    /// The selection survives if its id is in the window (picking up any
    /// updated fields); otherwise the most relevant item is selected.
    pub fn reconcile(&mut self, window: &WindowManager) -> SelectionChange {
        if let Some(id) = self.current_id()
            && let Some(item) = window.get(id)
        {
            self.current = Some(item.clone());
            return SelectionChange::Kept(id);
        }

        match window.items().first() {
            Some(first) => {
                debug!("Selection moved to {}", first.id);
                self.current = Some(first.clone());
                SelectionChange::Moved(first.id)
            }
            None => {
                debug!("Selection cleared by empty window");
                self.current = None;
                SelectionChange::Cleared
            }
        }
    }

    /// Refreshes the selected item's fields after a re-center
    ///
    /// Unlike [`Selection::reconcile`] this never moves the selection.
    pub fn refresh(&mut self, window: &WindowManager) {
        if let Some(id) = self.current_id()
            && let Some(item) = window.get(id)
        {
            self.current = Some(item.clone());
        }
    }

    /// Moves one step in rendered order
    ///
    /// A selection outside the window steps to the first item (forward) or
    /// the last item (backward). The direction is recorded even when the
    /// step is blocked.
    pub fn step(&mut self, window: &WindowManager, direction: Direction) -> Step {
        self.last_direction = Some(direction);
        let rendered = window.rendered();
        if rendered.is_empty() {
            return Step::Empty;
        }

        let target = match self.current_id().and_then(|id| window.position(id)) {
            None => match direction {
                Direction::Forward => Some(0),
                Direction::Backward => Some(rendered.len() - 1),
            },
            Some(index) => match direction {
                Direction::Forward => index.checked_add(1).filter(|i| *i < rendered.len()),
                Direction::Backward => index.checked_sub(1),
            },
        };

        match target.and_then(|index| rendered.get(index)) {
            Some(item) => {
                self.current = Some(item.clone());
                Step::Moved(item.clone())
            }
            None => Step::Blocked(direction.edge()),
        }
    }

    /// Whether a blocked step in `mode` may be retried after a re-center
    #[must_use]
    pub fn can_recenter(mode: SearchMode) -> bool {
        mode == SearchMode::TagFilter
    }

    /// Picks the replacement after the selected item left the window
    ///
    /// `removed_index` is the rendered index the item occupied. The item now
    /// in `direction` is preferred, then the one in the opposite direction.
    pub fn replace_removed(
        &mut self,
        window: &WindowManager,
        removed_index: usize,
        direction: Direction,
    ) -> Option<MediaId> {
        let rendered = window.rendered();
        let after = rendered.get(removed_index);
        let before = removed_index.checked_sub(1).and_then(|i| rendered.get(i));
        let replacement = match direction {
            Direction::Forward => after.or(before),
            Direction::Backward => before.or(after),
        };
        self.current = replacement.cloned();
        self.current_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::window::DEFAULT_REFETCH_DEBOUNCE;

    fn window_of(mode: SearchMode, items: Vec<MediaItem>) -> WindowManager {
        let mut window = WindowManager::new(10, 50, DEFAULT_REFETCH_DEBOUNCE);
        let ticket = window.begin_fetch(None);
        window.apply(ticket, mode, None, items);
        window
    }

    fn timeline(ids: &[MediaId]) -> WindowManager {
        let items = ids
            .iter()
            .map(|&id| MediaItem::new(id, format!("{id}.jpg"), id as f64 * 10.0))
            .collect();
        window_of(SearchMode::TagFilter, items)
    }

    #[test]
    fn test_empty_window_clears() {
        let mut selection = Selection::new();
        selection.select(MediaItem::new(1, "a", 1.0));
        let change = selection.reconcile(&window_of(SearchMode::TagFilter, Vec::new()));
        assert_eq!(change, SelectionChange::Cleared);
        assert!(selection.current().is_none());
    }

    #[test]
    fn test_present_selection_kept() {
        let mut selection = Selection::new();
        selection.select(MediaItem::new(2, "b", 20.0));
        let change = selection.reconcile(&timeline(&[1, 2, 3]));
        assert_eq!(change, SelectionChange::Kept(2));
    }

    #[test]
    fn test_kept_selection_picks_up_new_fields() {
        let mut selection = Selection::new();
        selection.select(MediaItem::new(2, "b", 0.0).with_score(0.1));
        let window = window_of(
            SearchMode::Prompt,
            vec![
                MediaItem::new(1, "a", 0.0).with_score(0.9),
                MediaItem::new(2, "b", 0.0).with_score(0.7),
            ],
        );
        assert_eq!(selection.reconcile(&window), SelectionChange::Kept(2));
        assert_eq!(selection.current().and_then(|i| i.score), Some(0.7));
    }

    #[test]
    fn test_missing_selection_moves_to_most_relevant() {
        let mut selection = Selection::new();
        selection.select(MediaItem::new(9, "z", 0.0));
        let window = window_of(
            SearchMode::Prompt,
            vec![
                MediaItem::new(1, "a", 0.0).with_score(0.2),
                MediaItem::new(2, "b", 0.0).with_score(0.9),
            ],
        );
        assert_eq!(selection.reconcile(&window), SelectionChange::Moved(2));
    }

    #[test]
    fn test_step_forward_and_back() {
        let window = timeline(&[1, 2, 3]);
        let mut selection = Selection::new();
        selection.select(MediaItem::new(2, "2.jpg", 20.0));

        assert!(matches!(selection.step(&window, Direction::Forward), Step::Moved(ref i) if i.id == 3));
        assert_eq!(selection.step(&window, Direction::Forward), Step::Blocked(Edge::End));
        assert_eq!(selection.current_id(), Some(3));
        assert!(matches!(selection.step(&window, Direction::Backward), Step::Moved(ref i) if i.id == 2));
        assert_eq!(selection.last_direction(), Some(Direction::Backward));
    }

    #[test]
    fn test_step_from_outside_window() {
        let window = timeline(&[1, 2, 3]);
        let mut selection = Selection::new();
        assert!(matches!(selection.step(&window, Direction::Forward), Step::Moved(ref i) if i.id == 1));

        selection.select(MediaItem::new(40, "x", 400.0));
        assert!(matches!(selection.step(&window, Direction::Backward), Step::Moved(ref i) if i.id == 3));
    }

    #[test]
    fn test_step_on_empty_window() {
        let mut selection = Selection::new();
        let window = timeline(&[]);
        assert_eq!(selection.step(&window, Direction::Forward), Step::Empty);
    }

    #[test]
    fn test_advance_direction_defaults_forward() {
        let mut selection = Selection::new();
        assert_eq!(selection.advance_direction(), Direction::Forward);
        selection.step(&timeline(&[1]), Direction::Backward);
        assert_eq!(selection.advance_direction(), Direction::Backward);
    }

    #[test]
    fn test_replace_removed() {
        let mut window = timeline(&[1, 2, 3]);
        window.remove(2);
        let mut selection = Selection::new();

        assert_eq!(selection.replace_removed(&window, 1, Direction::Forward), Some(3));
        assert_eq!(selection.replace_removed(&window, 1, Direction::Backward), Some(1));

        let mut window = timeline(&[1, 2]);
        window.remove(2);
        assert_eq!(selection.replace_removed(&window, 1, Direction::Forward), Some(1));

        let mut window = timeline(&[1]);
        window.remove(1);
        assert_eq!(selection.replace_removed(&window, 0, Direction::Forward), None);
        assert!(selection.current().is_none());
    }

    #[test]
    fn test_can_recenter_only_in_tag_mode() {
        assert!(Selection::can_recenter(SearchMode::TagFilter));
        assert!(!Selection::can_recenter(SearchMode::Prompt));
    }
}
