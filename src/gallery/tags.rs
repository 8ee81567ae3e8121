//! Tag index and per-panel selection state
//!
//! Tags are owned here; whether a tag is "selected" is panel state, kept
//! separately for the global filter panel (pending filter toggles) and the
//! current-item panel (tags assigned to the selected media).

use crate::api::{MediaId, Tag, TagId};
use std::collections::{BTreeMap, BTreeSet};

/// Which tag panel a selection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Tags toggled as search filters
    GlobalFilter,
    /// Tags assigned to the current media item
    CurrentItem,
}

/// A tag with its selection state in one panel, ready to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: Tag,
    pub selected: bool,
}

/// Mapping from tag id to tag, plus panel selections
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: BTreeMap<TagId, Tag>,
    filter_selection: BTreeSet<TagId>,
    item: Option<MediaId>,
    item_tags: BTreeSet<TagId>,
}

impl TagIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole tag list
    ///
    /// Selections referring to tags that no longer exist are dropped.
    pub fn replace_all(&mut self, tags: Vec<Tag>) {
        self.tags = tags.into_iter().map(|tag| (tag.id, tag)).collect();
        let tags = &self.tags;
        self.filter_selection.retain(|id| tags.contains_key(id));
        self.item_tags.retain(|id| tags.contains_key(id));
    }

    #[must_use]
    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    /// Finds a tag by name, ignoring case
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Tag> {
        let wanted = name.trim().to_lowercase();
        self.tags
            .values()
            .find(|tag| tag.name.to_lowercase() == wanted)
    }

    /// All tags ordered by name, case-insensitively (ties by id)
    #[must_use]
    pub fn sorted(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.tags.values().collect();
        tags.sort_by_cached_key(|tag| (tag.name.to_lowercase(), tag.id));
        tags
    }

    /// Sorted tags with their selection state in `panel`
    #[must_use]
    pub fn entries(&self, panel: Panel) -> Vec<TagEntry> {
        self.sorted()
            .into_iter()
            .map(|tag| TagEntry {
                tag: tag.clone(),
                selected: self.is_selected(panel, tag.id),
            })
            .collect()
    }

    #[must_use]
    pub fn is_selected(&self, panel: Panel, id: TagId) -> bool {
        match panel {
            Panel::GlobalFilter => self.filter_selection.contains(&id),
            Panel::CurrentItem => self.item_tags.contains(&id),
        }
    }

    /// Toggles a tag in the filter panel; returns the new state
    ///
    /// Unknown ids are ignored and reported as unselected.
    pub fn toggle_filter(&mut self, id: TagId) -> bool {
        if !self.tags.contains_key(&id) {
            return false;
        }
        if self.filter_selection.remove(&id) {
            false
        } else {
            self.filter_selection.insert(id);
            true
        }
    }

    /// Empties the filter panel
    pub fn clear_filter(&mut self) {
        self.filter_selection.clear();
    }

    /// The pending filter selection
    #[must_use]
    pub const fn filter_selection(&self) -> &BTreeSet<TagId> {
        &self.filter_selection
    }

    /// Records the tags assigned to `item`
    pub fn set_item_tags(&mut self, item: MediaId, tags: &[Tag]) {
        self.item = Some(item);
        self.item_tags = tags
            .iter()
            .map(|tag| tag.id)
            .filter(|id| self.tags.contains_key(id))
            .collect();
    }

    /// Forgets the current-item panel
    pub fn clear_item(&mut self) {
        self.item = None;
        self.item_tags.clear();
    }

    /// The media item the current-item panel describes
    #[must_use]
    pub const fn item(&self) -> Option<MediaId> {
        self.item
    }

    /// Tags currently assigned to the described item, sorted by name
    #[must_use]
    pub fn item_tags(&self) -> Vec<&Tag> {
        self.sorted()
            .into_iter()
            .filter(|tag| self.item_tags.contains(&tag.id))
            .collect()
    }

    /// Removes one tag and any selection of it
    pub fn remove(&mut self, id: TagId) -> Option<Tag> {
        self.filter_selection.remove(&id);
        self.item_tags.remove(&id);
        self.tags.remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
