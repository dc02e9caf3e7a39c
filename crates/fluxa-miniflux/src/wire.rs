//! Miniflux v1 JSON shapes. Only the fields fluxa reads are declared; the
//! server sends many more.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fluxa_core::{Category, CategoryId, Feed, FeedCounters, FeedId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct WireCategory {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub hide_globally: bool,
}

impl From<WireCategory> for Category {
    fn from(c: WireCategory) -> Self {
        Category {
            id: CategoryId(c.id),
            title: c.title,
            hide_globally: c.hide_globally,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCategoryRef {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFeed {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub site_url: String,
    pub feed_url: String,
    pub category: WireCategoryRef,
    #[serde(default)]
    pub crawler: bool,
    #[serde(default)]
    pub hide_globally: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
}

impl From<WireFeed> for Feed {
    fn from(f: WireFeed) -> Self {
        Feed {
            id: FeedId(f.id),
            title: f.title,
            site_url: f.site_url,
            feed_url: f.feed_url,
            category_id: CategoryId(f.category.id),
            crawler: f.crawler,
            hide_globally: f.hide_globally,
            disabled: f.disabled,
            checked_at: f.checked_at,
            unread_count: 0,
        }
    }
}

/// `GET /v1/feeds/counters`. Keys are feed ids encoded as JSON object keys.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireCounters {
    #[serde(default)]
    pub reads: HashMap<i64, u32>,
    #[serde(default)]
    pub unreads: HashMap<i64, u32>,
}

impl From<WireCounters> for FeedCounters {
    fn from(c: WireCounters) -> Self {
        FeedCounters {
            reads: c.reads.into_iter().map(|(k, v)| (FeedId(k), v)).collect(),
            unreads: c.unreads.into_iter().map(|(k, v)| (FeedId(k), v)).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedCreated {
    pub feed_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub error_message: String,
}
