//! halalbot-feedback
//!
//! Community vote storage. [`AggregateTable`] holds the per-passage counters
//! behind a lock, [`AuditLog`] is the append-only JSONL trail of individual
//! votes, and the two [`halalbot_core::traits::FeedbackStore`]
//! implementations combine them in memory or on disk.

pub mod aggregate;
pub mod audit;
pub mod store;

pub use aggregate::AggregateTable;
pub use audit::{AuditLog, AuditTail, AuditWriter};
pub use store::{FileFeedbackStore, MemoryFeedbackStore};
