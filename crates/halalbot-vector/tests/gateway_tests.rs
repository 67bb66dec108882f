use halalbot_core::config::ScoreConvention;
use halalbot_core::traits::VectorGateway;
use halalbot_core::PassageRecord;
use halalbot_vector::{FlatGateway, HashEmbedder, MetadataStore};

fn corpus() -> MetadataStore {
    let rec = |text: &str, source: &str| PassageRecord {
        text: text.to_string(),
        source: source.to_string(),
    };
    MetadataStore::from_records(vec![
        rec("Establish prayer and give zakat", "quran/surah_2.txt"),
        rec("Zakat is due on gold once it reaches the nisab", "zakat/gold.txt"),
        rec("The Prophet prayed two rakat before fajr", "hadith/bukhari.txt"),
    ])
}

fn gateway(metric: ScoreConvention) -> FlatGateway {
    FlatGateway::from_metadata(corpus(), Box::new(HashEmbedder::new(256)), metric).expect("gateway")
}

#[test]
fn exact_passage_is_the_top_hit_with_similarity_one() {
    let gw = gateway(ScoreConvention::Similarity);
    let hits = gw.search("Zakat is due on gold once it reaches the nisab", 2).unwrap();
    assert_eq!(hits.len(), 2);
    let top = gw.resolve(hits[0].candidate).unwrap();
    assert_eq!(top.source, "zakat/gold.txt");
    assert!((hits[0].score - 1.0).abs() < 1e-4, "score={}", hits[0].score);
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn both_conventions_agree_after_conversion() {
    let sim = gateway(ScoreConvention::Similarity).search("gold zakat nisab", 3).unwrap();
    let l2 = gateway(ScoreConvention::SquaredL2).search("gold zakat nisab", 3).unwrap();
    for (a, b) in sim.iter().zip(&l2) {
        assert_eq!(a.candidate, b.candidate);
        assert!((a.score.max(0.0) - b.score).abs() < 1e-4, "{} vs {}", a.score, b.score);
    }
}

#[test]
fn overfetch_beyond_corpus_ends_with_no_match() {
    let gw = gateway(ScoreConvention::Similarity);
    let hits = gw.search("prayer", 5).unwrap();
    assert_eq!(hits.len(), 4);
    assert!(hits[..3].iter().all(|h| !h.candidate.is_no_match()));
    assert!(hits[3].candidate.is_no_match());
    assert!(gw.resolve(hits[3].candidate).is_none());

    assert_eq!(gw.search("prayer", usize::MAX).unwrap().len(), 4);
}
