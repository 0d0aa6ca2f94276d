/// Plain-text rendering of the list and hierarchy projections.
use chrono::{DateTime, Local};
use spacelens_core::model::size::{format_count, format_size, percent_of};
use spacelens_core::{Entry, ListProjection};
use std::io::{self, Write};
use std::time::SystemTime;

/// Width of the percentage bar in the listing.
const BAR_WIDTH: usize = 20;

/// Render a modification time in local time, or a dash when unknown.
pub fn format_modified(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}

/// A proportional bar such as `██████··············`.
fn size_bar(percent: f32) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f32).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"·".repeat(BAR_WIDTH - filled));
    bar
}

/// Display name with a trailing slash for directories and a marker for
/// unreadable ones.
fn label(entry: &Entry) -> String {
    let mut label = entry.name.to_string();
    if entry.is_dir {
        label.push('/');
    }
    if entry.access_denied {
        label.push_str("  [access denied]");
    }
    label
}

/// Write the listing as a table, largest entries first.
pub fn write_table(out: &mut impl Write, list: &ListProjection) -> io::Result<()> {
    if let Some(message) = &list.error_message {
        writeln!(out, "! {message}")?;
    }
    let Some(path) = &list.current_path else {
        return writeln!(out, "Nothing to show.");
    };

    writeln!(
        out,
        "{}  {}  ({} entries)",
        path.display(),
        format_size(list.total_size),
        format_count(list.total_entries as u64)
    )?;
    if list.all_denied {
        writeln!(out, "Every entry in this folder is unreadable.")?;
    }
    writeln!(out)?;

    for entry in &list.entries {
        let percent = percent_of(entry.size, list.total_size);
        writeln!(
            out,
            "{:>10}  {:>5.1}%  {}  {:<16}  {}",
            format_size(entry.size),
            percent,
            size_bar(percent),
            format_modified(entry.modified),
            label(entry)
        )?;
    }

    let hidden = list.total_entries.saturating_sub(list.entries.len());
    if hidden > 0 {
        writeln!(out, "… {} more (use --limit to show them)", format_count(hidden as u64))?;
    }
    Ok(())
}

/// Write the hierarchy as an indented tree. Percentages are relative to the
/// parent.
pub fn write_tree(out: &mut impl Write, root: &Entry) -> io::Result<()> {
    writeln!(out, "{}  {}", format_size(root.size), root.path.display())?;
    write_children(out, root, 1)
}

fn write_children(out: &mut impl Write, parent: &Entry, level: usize) -> io::Result<()> {
    for child in &parent.children {
        writeln!(
            out,
            "{:indent$}{:>10}  {:>5.1}%  {}",
            "",
            format_size(child.size),
            percent_of(child.size, parent.size),
            label(child),
            indent = level * 2
        )?;
        write_children(out, child, level + 1)?;
    }
    Ok(())
}
