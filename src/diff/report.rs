//! Markdown rendering of a diff result.

use std::fmt::Write;

use super::{ChangeType, DiffResult};

const SECTIONS: [(ChangeType, &str); 4] = [
    (ChangeType::Breaking, "Breaking Changes"),
    (ChangeType::Removed, "Removed"),
    (ChangeType::Added, "Added"),
    (ChangeType::Modified, "Modified"),
];

/// Render `result` as Markdown, one section per change type
pub fn render_markdown(result: &DiffResult) -> String {
    let mut out = String::from("# API Changes\n\n");

    if result.is_empty() {
        out.push_str("No changes detected.\n");
        return out;
    }

    let s = &result.summary;
    let _ = writeln!(
        out,
        "**{} changes**: {} breaking, {} added, {} removed, {} modified\n",
        s.total_changes, s.breaking_changes, s.additions, s.removals, s.modifications
    );

    for (change_type, title) in SECTIONS {
        let mut changes = result.changes_of(change_type).peekable();
        if changes.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "## {}\n", title);
        for change in changes {
            let _ = writeln!(out, "- `{}`: {}", change.locator(), change.description);
        }
        out.push('\n');
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}
