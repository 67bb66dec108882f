use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use halalbot_core::traits::{FeedbackStore, VectorGateway};
use halalbot_core::{CandidateRef, Category, Error, GatewayHit, PassageRecord, SearchRequest, Vote};
use halalbot_feedback::MemoryFeedbackStore;
use halalbot_retrieval::{FeedbackService, RetrievalOrchestrator};

/// Gateway double that replays a fixed hit list and counts calls.
struct ScriptedGateway {
    records: Vec<PassageRecord>,
    hits: Vec<GatewayHit>,
    calls: AtomicUsize,
    last_k: AtomicUsize,
}

impl ScriptedGateway {
    fn new(passages: &[(&str, &str, f32)]) -> Self {
        let records = passages
            .iter()
            .map(|(text, source, _)| PassageRecord {
                text: text.to_string(),
                source: source.to_string(),
            })
            .collect();
        let hits = passages
            .iter()
            .enumerate()
            .map(|(i, (_, _, score))| GatewayHit {
                score: *score,
                candidate: CandidateRef(i as i64),
            })
            .collect();
        Self { records, hits, calls: AtomicUsize::new(0), last_k: AtomicUsize::new(0) }
    }

    fn with_extra_hits(mut self, extra: &[GatewayHit]) -> Self {
        self.hits.extend_from_slice(extra);
        self
    }
}

impl VectorGateway for ScriptedGateway {
    fn search(&self, _query: &str, k: usize) -> anyhow::Result<Vec<GatewayHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_k.store(k, Ordering::SeqCst);
        Ok(self.hits.iter().take(k).copied().collect())
    }

    fn resolve(&self, candidate: CandidateRef) -> Option<PassageRecord> {
        candidate.index().and_then(|i| self.records.get(i)).cloned()
    }
}

struct BrokenGateway;

impl VectorGateway for BrokenGateway {
    fn search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<GatewayHit>> {
        anyhow::bail!("index file halalbot_faiss.index is unavailable")
    }

    fn resolve(&self, _candidate: CandidateRef) -> Option<PassageRecord> {
        None
    }
}

fn setup(
    gateway: ScriptedGateway,
) -> (Arc<ScriptedGateway>, Arc<MemoryFeedbackStore>, RetrievalOrchestrator) {
    let gateway = Arc::new(gateway);
    let store = Arc::new(MemoryFeedbackStore::new());
    let orchestrator = RetrievalOrchestrator::new(gateway.clone(), store.clone());
    (gateway, store, orchestrator)
}

fn categories(results: &[halalbot_core::AnnotatedResult]) -> Vec<Category> {
    results.iter().map(|r| r.category).collect()
}

#[test]
fn category_priority_beats_similarity() {
    let (_, _, orch) = setup(ScriptedGateway::new(&[
        ("Fatwa text", "askimam/1", 0.9),
        ("In the name of Allah", "quran/surah_1.txt", 0.8),
        ("Actions are by intentions", "hadith/bukhari_1", 0.6),
    ]));
    let results = orch.search(&SearchRequest::new("intentions").top_k(5).min_score(0.5)).unwrap();
    assert_eq!(categories(&results), [Category::Quran, Category::Hadith, Category::Fatwa]);
    assert_eq!(results[0].base_score, 0.8);
    assert_eq!(results[2].base_score, 0.9);
}

#[test]
fn gateway_is_asked_for_five_times_top_k() {
    let (gateway, _, orch) = setup(ScriptedGateway::new(&[("a", "other", 0.9)]));
    orch.search(&SearchRequest::new("q").top_k(3)).unwrap();
    assert_eq!(gateway.last_k.load(Ordering::SeqCst), 15);

    let orch = RetrievalOrchestrator::new(gateway.clone(), Arc::new(MemoryFeedbackStore::new()))
        .with_overfetch_factor(2);
    orch.search(&SearchRequest::new("q").top_k(3)).unwrap();
    assert_eq!(gateway.last_k.load(Ordering::SeqCst), 6);
}

#[test]
fn no_match_and_unknown_candidates_are_skipped() {
    let gw = ScriptedGateway::new(&[("kept", "zakat/a", 0.7)]).with_extra_hits(&[
        GatewayHit { score: 0.99, candidate: CandidateRef::NO_MATCH },
        GatewayHit { score: 0.95, candidate: CandidateRef(42) },
    ]);
    let (_, _, orch) = setup(gw);
    let results = orch.search(&SearchRequest::new("q").top_k(5)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "kept");
}

#[test]
fn downvotes_lower_the_adjusted_score() {
    let passage = "Whoever pays zakat on their wealth has fulfilled the obligation.";
    let (_, store, orch) = setup(ScriptedGateway::new(&[(passage, "zakat/guide.txt", 0.7)]));
    let feedback = FeedbackService::new(store.clone());
    for i in 0..5 {
        let user = format!("user{i}@example.com");
        feedback.submit_feedback("zakat", passage, Vote::Down, &user).unwrap();
    }
    let results = orch.search(&SearchRequest::new("zakat")).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].base_score, 0.7);
    let adjusted = results[0].adjusted_score;
    assert!((adjusted - 0.6).abs() < 1e-6, "adjusted={adjusted}");
}

#[test]
fn relevance_floor_uses_base_score() {
    let (_, _, orch) = setup(ScriptedGateway::new(&[
        ("verse", "quran/surah_3", 0.4),
        ("opinion", "fatwa/12", 0.55),
    ]));
    let results = orch.search(&SearchRequest::new("q").min_score(0.5)).unwrap();
    assert_eq!(categories(&results), [Category::Fatwa]);
}

#[test]
fn category_filter_restricts_results() {
    let (_, _, orch) = setup(ScriptedGateway::new(&[
        ("verse", "quran/surah_3", 0.9),
        ("narration one", "hadith/muslim_1", 0.8),
        ("narration two", "hadith/muslim_2", 0.85),
    ]));
    let results = orch
        .search(&SearchRequest::new("q").category(Some(Category::Hadith)))
        .unwrap();
    let texts: Vec<_> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["narration two", "narration one"]);
}

#[test]
fn invalid_requests_fail_before_the_gateway_is_called() {
    let (gateway, _, orch) = setup(ScriptedGateway::new(&[("a", "b", 0.9)]));
    let invalid = [
        SearchRequest::new("q").top_k(0),
        SearchRequest::new("q").min_score(-0.1),
        SearchRequest::new("q").min_score(1.01),
    ];
    for request in invalid {
        assert!(matches!(orch.search(&request), Err(Error::InvalidInput(_))));
    }
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn gateway_errors_propagate_unchanged() {
    let orch =
        RetrievalOrchestrator::new(Arc::new(BrokenGateway), Arc::new(MemoryFeedbackStore::new()));
    let err = orch.search(&SearchRequest::new("q")).unwrap_err();
    assert!(matches!(err, Error::Gateway(_)));
    assert_eq!(err.to_string(), "index file halalbot_faiss.index is unavailable");
}

#[test]
fn searching_records_no_feedback() {
    let (_, store, orch) = setup(ScriptedGateway::new(&[("a", "quran", 0.9)]));
    for _ in 0..3 {
        orch.search(&SearchRequest::new("q")).unwrap();
    }
    assert!(store.events().is_empty());
}

#[test]
fn results_are_normalized_but_voted_on_by_raw_hash() {
    let raw = "  Is music allowed? ANSWER: Share: Scholars differ on this.   ";
    let (_, store, orch) = setup(ScriptedGateway::new(&[(raw, "askimam/music", 0.8)]));
    let first = orch.search(&SearchRequest::new("music")).unwrap().remove(0);
    assert_eq!(first.text, "Is music allowed? ANSWER:\n\nScholars differ on this.");

    let feedback = FeedbackService::new(store.clone());
    feedback.submit_feedback_for_hash("music", first.text_hash, Vote::Down, "").unwrap();
    assert_eq!(store.get_aggregate(&first.text_hash).thumbs_down, 1);
    assert_eq!(store.events()[0].user, "anon");

    // Submitting the untrimmed raw passage lands on the same hash.
    feedback.submit_feedback("music", raw, Vote::Down, "a@example.com").unwrap();
    let second = orch.search(&SearchRequest::new("music")).unwrap().remove(0);
    assert!((second.adjusted_score - 0.76).abs() < 1e-6);
}

#[test]
fn results_are_truncated_to_top_k() {
    let passages: Vec<(String, f32)> =
        (0..20).map(|i| (format!("p{i}"), 0.9 - i as f32 * 0.01)).collect();
    let borrowed: Vec<(&str, &str, f32)> =
        passages.iter().map(|(t, x)| (t.as_str(), "hadith", *x)).collect();
    let (_, _, orch) = setup(ScriptedGateway::new(&borrowed));
    let results = orch.search(&SearchRequest::new("q").top_k(4)).unwrap();
    let texts: Vec<_> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["p0", "p1", "p2", "p3"]);
}

#[tokio::test]
async fn offloaded_search_matches_inline_search() {
    let (_, _, orch) = setup(ScriptedGateway::new(&[
        ("Fatwa text", "askimam/1", 0.9),
        ("In the name of Allah", "quran/surah_1.txt", 0.8),
    ]));
    let orch = Arc::new(orch);
    let request = SearchRequest::new("q").top_k(2);
    let inline = orch.search(&request).unwrap();
    let offloaded = Arc::clone(&orch).search_offloaded(request).await.unwrap();
    assert_eq!(inline, offloaded);

    let invalid = SearchRequest::new("q").top_k(0);
    let err = Arc::clone(&orch).search_offloaded(invalid).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
