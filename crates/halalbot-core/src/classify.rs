//! Source identifier -> [`Category`] classification.

use crate::types::Category;

/// Keyword table checked in order; the first category with a matching
/// keyword wins.
const RULES: [(Category, &[&str]); 4] = [
    (Category::Quran, &["quran", "surah"]),
    (Category::Hadith, &["hadith", "bukhari", "muslim"]),
    (Category::Fatwa, &["fatwa", "askimam"]),
    (Category::Zakat, &["zakat"]),
];

/// Classify a path-like or tag-like source identifier by case-insensitive
/// substring match. Total: anything unmatched is [`Category::Other`].
pub fn classify(source: &str) -> Category {
    let lowered = source.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
