//! Plain-text rendering of a [`Snapshot`] for the CLI.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use fluxa_core::{Feed, Snapshot};

/// Categories with their feeds and unread counts, one line each.
///
/// With `unread_only`, feeds without unread entries and categories left empty
/// are skipped.
pub fn render_tree(snapshot: &Snapshot, unread_only: bool) -> String {
    let mut out = String::new();
    for category in snapshot.categories() {
        let feeds: Vec<&Feed> = snapshot
            .feeds_in(category.id)
            .filter(|f| !unread_only || f.unread_count > 0)
            .collect();
        if unread_only && feeds.is_empty() {
            continue;
        }

        let _ = writeln!(
            out,
            "{} [{}] ({})",
            category.title,
            category.id,
            snapshot.category_unread(category.id)
        );
        for feed in feeds {
            let _ = writeln!(out, "  {}", feed_line(feed));
        }
    }
    out
}

fn feed_line(feed: &Feed) -> String {
    let mut line = format!("[{}] {} ({})", feed.id, display_title(feed), feed.unread_count);
    if feed.crawler {
        line.push_str(" crawler");
    }
    if feed.hide_globally {
        line.push_str(" hidden");
    }
    if feed.disabled {
        line.push_str(" disabled");
    }
    line
}

fn display_title(feed: &Feed) -> &str {
    if feed.title.trim().is_empty() {
        &feed.feed_url
    } else {
        &feed.title
    }
}

/// Human-readable age of the snapshot relative to `now`.
pub fn sync_status(snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    let Some(synced_at) = snapshot.synced_at() else {
        return "never synced".to_string();
    };
    let minutes = (now - synced_at).num_minutes();
    match minutes {
        m if m < 1 => "synced less than a minute ago".to_string(),
        1 => "synced 1 minute ago".to_string(),
        m => format!("synced {m} minutes ago"),
    }
}
