pub mod feedback;
pub mod orchestrator;
pub mod query_log;

pub use feedback::FeedbackService;
pub use orchestrator::{RetrievalOrchestrator, DEFAULT_OVERFETCH_FACTOR};
pub use query_log::QueryLog;
