#![deny(unused_variables)]

pub mod classify;
pub mod config;
pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;

pub use classify::classify;
pub use error::{Error, Result};
pub use normalize::normalize;
pub use types::{
    AnnotatedResult, CandidateRef, Category, FeedbackAggregate, FeedbackEvent, GatewayHit,
    PassageRecord, RetrievalCandidate, SearchRequest, TextHash, Vote,
};
