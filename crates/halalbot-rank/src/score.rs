use halalbot_core::FeedbackAggregate;

pub const PENALTY_PER_DOWNVOTE: f32 = 0.02;
pub const MAX_PENALTY: f32 = 0.3;

/// Score deduction for `thumbs_down` down-votes, capped at [`MAX_PENALTY`].
pub fn penalty(thumbs_down: u64) -> f32 {
    (PENALTY_PER_DOWNVOTE * thumbs_down as f32).min(MAX_PENALTY)
}

/// Feedback-adjusted score. Up-votes are tracked but do not lift the score.
pub fn adjusted_score(base_score: f32, aggregate: &FeedbackAggregate) -> f32 {
    (base_score - penalty(aggregate.thumbs_down)).max(0.0)
}
