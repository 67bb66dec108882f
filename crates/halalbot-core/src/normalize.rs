//! Presentation cleanup for retrieved passages.
//!
//! Scraped fatwa pages carry an `ANSWER:` header glued to the answer body and
//! stray `Share:` widgets. Normalization only touches that boilerplate and
//! whitespace; wording is never changed.

use std::sync::LazyLock;

use regex::Regex;

static ANSWER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(answer\s*:)(?:\s*(?-i:Share:))?[ \t]*").expect("answer marker pattern")
});
static SHARE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bShare:\s*").expect("share token pattern"));
static EXTRA_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern"));
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("space pattern"));

fn break_after_answer(text: &str) -> String {
    ANSWER_MARKER.replace_all(text, "${1}\n\n").into_owned()
}

/// Clean a raw passage for display. Idempotent.
pub fn normalize(raw: &str) -> String {
    let marked = break_after_answer(raw);
    let stripped = SHARE_TOKEN.replace_all(&marked, "").into_owned();
    // Removing a token can butt a header against its colon again.
    let text = if stripped.len() == marked.len() {
        stripped
    } else {
        break_after_answer(&stripped)
    };
    let text = EXTRA_NEWLINES.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}
