use std::sync::Arc;

use halalbot_core::traits::FeedbackStore;
use halalbot_core::{FeedbackAggregate, Result, TextHash, Vote};

const ANONYMOUS: &str = "anon";

/// Entry point for thumbs-up / thumbs-down submissions.
#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<dyn FeedbackStore>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    /// Vote on a passage by its raw text. The text is trimmed before hashing,
    /// matching how the orchestrator hashes gateway passages.
    pub fn submit_feedback(
        &self,
        query: &str,
        passage_text: &str,
        vote: Vote,
        user: &str,
    ) -> Result<()> {
        self.submit_feedback_for_hash(query, TextHash::of(passage_text.trim()), vote, user)
    }

    /// Vote on a passage by the `text_hash` carried in a search result.
    pub fn submit_feedback_for_hash(
        &self,
        query: &str,
        text_hash: TextHash,
        vote: Vote,
        user: &str,
    ) -> Result<()> {
        let user = if user.trim().is_empty() { ANONYMOUS } else { user };
        self.store.record_vote(text_hash, vote, query, user)
    }

    pub fn vote_summary(&self, text_hash: &TextHash) -> Option<FeedbackAggregate> {
        self.store.vote_summary(text_hash)
    }
}
