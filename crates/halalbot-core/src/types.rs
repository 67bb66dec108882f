//! Domain types shared by the ranking, feedback and retrieval crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Source classification used for authority ordering.
///
/// Variants are declared in priority order: canonical text first, then
/// narrations, scholarly opinion, zakat guidance and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Quran,
    Hadith,
    Fatwa,
    Zakat,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Quran,
        Category::Hadith,
        Category::Fatwa,
        Category::Zakat,
        Category::Other,
    ];

    /// Sort key for ranking; lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            Category::Quran => 0,
            Category::Hadith => 1,
            Category::Fatwa => 2,
            Category::Zakat => 3,
            Category::Other => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Quran => "quran",
            Category::Hadith => "hadith",
            Category::Fatwa => "fatwa",
            Category::Zakat => "zakat",
            Category::Other => "other",
        }
    }

    /// Parse a category filter token. Accepts both `hadith` and the
    /// `hadith-only` spelling used by the search form and CLI.
    pub fn parse_filter(token: &str) -> Result<Category> {
        let token = token.trim();
        let name = token.strip_suffix("-only").unwrap_or(token);
        name.parse()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown category '{s}'")))
    }
}

/// SHA-256 digest of a raw (unnormalized) passage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextHash([u8; 32]);

impl TextHash {
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::InvalidInput(format!("bad text hash '{s}': {e}")))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TextHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TextHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextHash({})", self.to_hex())
    }
}

impl Serialize for TextHash {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TextHash {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TextHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn as_str(self) -> &'static str {
        match self {
            Vote::Up => "up",
            Vote::Down => "down",
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vote {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Vote::Up),
            "down" => Ok(Vote::Down),
            other => Err(Error::InvalidInput(format!(
                "vote must be 'up' or 'down', got '{other}'"
            ))),
        }
    }
}

/// Accumulated votes for one passage hash.
///
/// Persisted with the `thumbs_up`/`thumbs_down` keys of the existing
/// adjustments file; camelCase keys are accepted on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackAggregate {
    #[serde(rename = "thumbs_up", alias = "thumbsUp", default)]
    pub thumbs_up: u64,
    #[serde(rename = "thumbs_down", alias = "thumbsDown", default)]
    pub thumbs_down: u64,
}

impl FeedbackAggregate {
    pub fn apply(&mut self, vote: Vote) {
        self.add(vote, 1);
    }

    pub fn add(&mut self, vote: Vote, count: u64) {
        match vote {
            Vote::Up => self.thumbs_up += count,
            Vote::Down => self.thumbs_down += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.thumbs_up + self.thumbs_down
    }
}

/// One line of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub text_hash: TextHash,
    pub vote: Vote,
    pub user: String,
    /// Votes this record stands for. Omitted for single votes; baseline
    /// records imported from a snapshot carry the whole count.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub count: u64,
}

/// User recorded on baseline records imported from an aggregate snapshot.
pub const BASELINE_USER: &str = "baseline";

impl FeedbackEvent {
    pub fn now(text_hash: TextHash, vote: Vote, query: &str, user: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            query: query.to_string(),
            text_hash,
            vote,
            user: user.to_string(),
            count: 1,
        }
    }

    /// A record standing for `count` votes that predate the audit log.
    pub fn baseline(text_hash: TextHash, vote: Vote, count: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            query: String::new(),
            text_hash,
            vote,
            user: BASELINE_USER.to_string(),
            count,
        }
    }
}

fn one() -> u64 {
    1
}

fn is_one(n: &u64) -> bool {
    *n == 1
}

/// Accepts RFC 3339 timestamps as well as the zone-less ISO-8601 form of
/// older log lines, which are taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Opaque index handed back by the vector-search gateway.
///
/// Negative values are the gateway's "no match" padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRef(pub i64);

impl CandidateRef {
    pub const NO_MATCH: CandidateRef = CandidateRef(-1);

    pub fn is_no_match(self) -> bool {
        self.0 < 0
    }

    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

/// A `(score, candidate)` pair as returned by the gateway. `score` is
/// higher-is-better once it leaves the gateway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatewayHit {
    pub score: f32,
    pub candidate: CandidateRef,
}

/// Metadata record a candidate reference resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default = "PassageRecord::unknown_source")]
    pub source: String,
}

impl PassageRecord {
    pub fn unknown_source() -> String {
        "unknown.txt".to_string()
    }
}

/// A passage surfaced for one query, before filtering and ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    pub raw_text: String,
    pub source_id: String,
    pub base_score: f32,
}

/// A candidate after classification, normalization and feedback adjustment.
///
/// `adjusted_score` never exceeds `base_score` and is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedResult {
    pub text: String,
    pub source: String,
    pub category: Category,
    pub base_score: f32,
    pub adjusted_score: f32,
    pub text_hash: TextHash,
}

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub min_score: f32,
    pub category: Option<Category>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), top_k: 5, min_score: 0.5, category: None }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// Reject out-of-contract parameters before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.top_k < 1 {
            return Err(Error::InvalidInput("top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(Error::InvalidInput(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        Ok(())
    }
}
