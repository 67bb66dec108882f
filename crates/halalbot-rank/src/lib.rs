//! halalbot-rank
//!
//! Pure post-processing for retrieval candidates: feedback penalties, category
//! filtering and the final authority-first ordering.

pub mod filter;
pub mod ranker;
pub mod score;

pub use filter::accepts;
pub use ranker::rank;
pub use score::{adjusted_score, penalty, MAX_PENALTY, PENALTY_PER_DOWNVOTE};
