use crate::error::Result;
use crate::types::{CandidateRef, FeedbackAggregate, GatewayHit, PassageRecord, TextHash, Vote};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour search over the pre-embedded corpus.
///
/// Implementations are built once at startup and shared read-only. Scores in
/// the returned hits are higher-is-better; `resolve` returns `None` for
/// references it has no metadata for.
pub trait VectorGateway: Send + Sync {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<GatewayHit>>;
    fn resolve(&self, candidate: CandidateRef) -> Option<PassageRecord>;
}

/// Vote aggregates keyed by passage hash, plus the audit trail behind them.
///
/// `record_vote` must not lose concurrent increments on the same hash, and a
/// vote must be visible to `get_aggregate` once `record_vote` has returned.
pub trait FeedbackStore: Send + Sync {
    fn record_vote(&self, text_hash: TextHash, vote: Vote, query: &str, user: &str) -> Result<()>;

    /// Zero counts for hashes that were never voted on.
    fn get_aggregate(&self, text_hash: &TextHash) -> FeedbackAggregate {
        self.vote_summary(text_hash).unwrap_or_default()
    }

    fn vote_summary(&self, text_hash: &TextHash) -> Option<FeedbackAggregate>;
}
