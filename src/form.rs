//! Presentation-side state for the add-feed dialog.
//!
//! [`UiFlags`] and [`AddFeedForm`] belong to the UI, not the core: the gateway
//! only clears them through the completion callback it is handed, and only
//! after the server accepted the feed and the store was resynced. On failure
//! the form keeps exactly what the user typed so they can retry.

use fluxa_core::{
    CategoryId, CreateFeed, FeedId, Mutation, MutationError, MutationGateway, MutationOutcome,
    MutationPhase,
};

/// Ephemeral dialog toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiFlags {
    pub add_feed_open: bool,
    pub add_category_open: bool,
}

/// Field values of the add-feed dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddFeedForm {
    pub feed_url: String,
    pub category_id: Option<CategoryId>,
    pub crawler: bool,
    phase: MutationPhase,
}

impl AddFeedForm {
    pub fn new(feed_url: impl Into<String>, category_id: Option<CategoryId>, crawler: bool) -> Self {
        Self {
            feed_url: feed_url.into(),
            category_id,
            crawler,
            phase: MutationPhase::Idle,
        }
    }

    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Whether the submit button should show a spinner.
    pub fn is_loading(&self) -> bool {
        self.phase == MutationPhase::InFlight
    }

    /// Clear every field, as when the dialog is closed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Close the dialog without subscribing: clears the open flag and every field.
    pub fn cancel(&mut self, flags: &mut UiFlags) {
        flags.add_feed_open = false;
        self.reset();
    }

    pub fn to_mutation(&self) -> Mutation {
        Mutation::CreateFeed(CreateFeed {
            feed_url: self.feed_url.trim().to_string(),
            // An unselected category is sent as 0 and refused by validation.
            category_id: self.category_id.unwrap_or(CategoryId(0)),
            crawler: self.crawler,
        })
    }

    /// Subscribe to the feed. On success the dialog is closed and the form
    /// reset; on failure both are left as they were.
    pub async fn submit(
        &mut self,
        gateway: &MutationGateway,
        flags: &mut UiFlags,
    ) -> Result<MutationOutcome, MutationError> {
        self.phase = MutationPhase::InFlight;
        let result = gateway
            .mutate_with(self.to_mutation(), |_| flags.add_feed_open = false)
            .await;

        match result {
            Ok(outcome) => {
                self.reset();
                self.phase = MutationPhase::Succeeded;
                Ok(outcome)
            }
            Err(err) => {
                self.phase = MutationPhase::Failed;
                Err(err)
            }
        }
    }
}

/// Route the UI navigates to after subscribing.
pub fn feed_route(id: FeedId) -> String {
    format!("/feed/{id}")
}
