//! Core types for fluxa-core.
//!
//! This module defines the entities the store holds: [`Feed`], [`Category`]
//! and their identifiers, plus the request payloads the mutation layer sends
//! to the server ([`CreateFeed`], [`FeedPatch`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server-assigned feed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(pub i64);

/// Server-assigned category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscribed feed as last reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub title: String,
    /// Home page of the site publishing the feed.
    pub site_url: String,
    /// Source URL the server crawls.
    pub feed_url: String,
    pub category_id: CategoryId,
    /// Whether the server fetches the original article content.
    pub crawler: bool,
    /// Hidden from the global unread list.
    pub hide_globally: bool,
    pub disabled: bool,
    pub checked_at: Option<DateTime<Utc>>,
    /// Filled from the counters endpoint during a resync.
    pub unread_count: u32,
}

/// A category as last reported by the server. Membership is derived from
/// [`Feed::category_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub hide_globally: bool,
}

/// Per-feed read/unread totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedCounters {
    pub unreads: HashMap<FeedId, u32>,
    pub reads: HashMap<FeedId, u32>,
}

impl FeedCounters {
    pub fn unread(&self, id: FeedId) -> u32 {
        self.unreads.get(&id).copied().unwrap_or(0)
    }
}

/// Payload for subscribing to a new feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFeed {
    pub feed_url: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub crawler: bool,
}

/// Partial update of a feed. `None` fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawler: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_globally: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl FeedPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
