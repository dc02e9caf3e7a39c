//! Test builders: ergonomic constructors for `Feed`, `Category` and `Snapshot`.
//!
//! These builders are designed for readability in test assertions, not for
//! production use.

use fluxa_core::{Category, CategoryId, Feed, FeedId, Snapshot};

// ---------------------------------------------------------------------------
// FeedBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Feed`] fixtures.
///
/// # Example
///
/// ```rust
/// let feed = FeedBuilder::new(1, 2).title("Rust Blog").unread(3).build();
/// ```
pub struct FeedBuilder {
    feed: Feed,
}

impl FeedBuilder {
    pub fn new(id: i64, category: i64) -> Self {
        Self {
            feed: Feed {
                id: FeedId(id),
                title: format!("Feed {id}"),
                site_url: format!("https://site{id}.example"),
                feed_url: format!("https://site{id}.example/feed.xml"),
                category_id: CategoryId(category),
                crawler: false,
                hide_globally: false,
                disabled: false,
                checked_at: None,
                unread_count: 0,
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.feed.title = title.into();
        self
    }

    pub fn url(mut self, feed_url: impl Into<String>) -> Self {
        self.feed.feed_url = feed_url.into();
        self
    }

    pub fn unread(mut self, count: u32) -> Self {
        self.feed.unread_count = count;
        self
    }

    pub fn crawler(mut self) -> Self {
        self.feed.crawler = true;
        self
    }

    pub fn build(self) -> Feed {
        self.feed
    }
}

// ---------------------------------------------------------------------------
// Categories and snapshots
// ---------------------------------------------------------------------------

pub fn category(id: i64, title: &str) -> Category {
    Category {
        id: CategoryId(id),
        title: title.to_string(),
        hide_globally: false,
    }
}

/// Categories `1..=n` titled "Category N".
pub fn categories(n: i64) -> Vec<Category> {
    (1..=n).map(|id| category(id, &format!("Category {id}"))).collect()
}

/// A consistent snapshot: `feeds` feeds spread round-robin over `cats`
/// categories.
pub fn consistent_snapshot(feeds: i64, cats: i64) -> Snapshot {
    let cats = cats.max(1);
    let feeds = (1..=feeds)
        .map(|id| FeedBuilder::new(id, (id - 1) % cats + 1).build())
        .collect();
    Snapshot::new(feeds, categories(cats))
}

/// A snapshot whose only feed points at a category that is not present.
pub fn dangling_snapshot() -> Snapshot {
    Snapshot::new(vec![FeedBuilder::new(1, 99).build()], categories(1))
}
