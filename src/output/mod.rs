//! Output formatting for CLI display
//!
//! Formats windows, tags and the current item for the terminal. In quiet
//! mode only bare values are produced, one per line, for scripting.

use crate::api::{MediaId, MediaItem};
use crate::gallery::display::{format_timestamp, truncate_name};
use crate::gallery::{CurrentView, Group, TagEntry};
use chrono::Local;
use colored::Colorize;

/// Format one window entry
#[must_use]
pub fn media_line(item: &MediaItem, max_name: usize, selected: bool, quiet: bool) -> String {
    if quiet {
        return item.path.clone();
    }

    let name = truncate_name(&item.path, max_name);
    let date = format_timestamp(item.timestamp, &Local).unwrap_or_default();
    let score = item
        .score
        .map(|s| format!("  {:>5.1}%", s * 100.0))
        .unwrap_or_default();
    let line = format!("{:>6}  {name:<width$}  {date}{score}", item.id, width = max_name);

    if selected {
        format!("{} {}", "▶".green(), line.green())
    } else {
        format!("  {line}")
    }
}

/// Format a group separator
#[must_use]
pub fn group_header(group: &Group) -> String {
    format!("── {} ({}) ──", group.key, group.len).bold().to_string()
}

/// Format the rendered window with its group separators
///
/// In quiet mode separators are omitted.
#[must_use]
pub fn window_lines(
    rendered: &[MediaItem],
    groups: &[Group],
    selected: Option<MediaId>,
    max_name: usize,
    quiet: bool,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(rendered.len() + groups.len());
    for group in groups {
        if !quiet {
            lines.push(group_header(group));
        }
        let end = (group.start + group.len).min(rendered.len());
        for item in rendered.get(group.start..end).unwrap_or_default() {
            lines.push(media_line(item, max_name, selected == Some(item.id), quiet));
        }
    }
    lines
}

/// Format a tag with its selection mark
#[must_use]
pub fn tag_line(entry: &TagEntry, quiet: bool) -> String {
    if quiet {
        entry.tag.name.clone()
    } else if entry.selected {
        format!("  [{}] {} ({})", "x".green(), entry.tag.name, entry.tag.id)
    } else {
        format!("  [ ] {} ({})", entry.tag.name, entry.tag.id)
    }
}

/// Format the selected item's details
#[must_use]
pub fn current_view(view: &CurrentView) -> String {
    let tags = if view.tags.is_empty() {
        "(no tags)".dimmed().to_string()
    } else {
        view.tags
            .iter()
            .map(|tag| tag.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let size = view.payload.as_ref().map_or_else(
        || "not loaded".red().to_string(),
        |payload| format!("{} bytes", payload.len()),
    );
    format!(
        "{}\n  id:    {}\n  date:  {}\n  data:  {size}\n  tags:  {tags}",
        view.name.bold(),
        view.item.id,
        view.date.as_deref().unwrap_or("unknown"),
    )
}
