use anyhow::{ensure, Result};
use halalbot_core::config::ScoreConvention;
use halalbot_core::traits::Embedder;
use halalbot_core::CandidateRef;

/// Exact nearest-neighbour scan over unit vectors.
///
/// Raw scores follow the index's [`ScoreConvention`]: inner product for
/// `Similarity`, squared Euclidean distance for `SquaredL2`. When `k`
/// exceeds the corpus a single [`CandidateRef::NO_MATCH`] entry closes the
/// list.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    metric: ScoreConvention,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn build(
        texts: &[String],
        embedder: &dyn Embedder,
        metric: ScoreConvention,
    ) -> Result<Self> {
        let vectors = embedder.embed_batch(texts)?;
        ensure!(
            vectors.len() == texts.len(),
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        );
        Self::from_vectors(embedder.dim(), metric, vectors)
    }

    pub fn from_vectors(
        dim: usize,
        metric: ScoreConvention,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        for (i, v) in vectors.iter().enumerate() {
            ensure!(v.len() == dim, "vector {} has dimension {}, expected {}", i, v.len(), dim);
        }
        Ok(Self { dim, metric, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> ScoreConvention {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Best `k` entries for `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, CandidateRef)>> {
        ensure!(
            query.len() == self.dim,
            "query has dimension {}, expected {}",
            query.len(),
            self.dim
        );
        let mut scored: Vec<(f32, CandidateRef)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (self.raw_score(query, v), CandidateRef(i as i64)))
            .collect();
        match self.metric {
            ScoreConvention::Similarity => scored.sort_by(|a, b| b.0.total_cmp(&a.0)),
            ScoreConvention::SquaredL2 => scored.sort_by(|a, b| a.0.total_cmp(&b.0)),
        }
        if k <= scored.len() {
            scored.truncate(k);
            return Ok(scored);
        }
        let pad = match self.metric {
            ScoreConvention::Similarity => f32::MIN,
            ScoreConvention::SquaredL2 => f32::MAX,
        };
        scored.push((pad, CandidateRef::NO_MATCH));
        Ok(scored)
    }

    fn raw_score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            ScoreConvention::Similarity => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            ScoreConvention::SquaredL2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: &[f32]) -> Vec<f32> {
        let n = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / n).collect()
    }

    #[test]
    fn similarity_orders_best_first_and_pads() {
        let vectors = vec![unit(&[1.0, 0.0]), unit(&[1.0, 1.0])];
        let idx = FlatIndex::from_vectors(2, ScoreConvention::Similarity, vectors).unwrap();
        let hits = idx.search(&unit(&[0.0, 1.0]), 3).unwrap();
        assert_eq!(hits[0].1, CandidateRef(1));
        assert_eq!(hits[1].1, CandidateRef(0));
        assert!(hits[2].1.is_no_match());
    }

    #[test]
    fn l2_orders_nearest_first() {
        let vectors = vec![unit(&[1.0, 0.0]), unit(&[0.0, 1.0])];
        let idx = FlatIndex::from_vectors(2, ScoreConvention::SquaredL2, vectors).unwrap();
        let hits = idx.search(&unit(&[0.1, 1.0]), 2).unwrap();
        assert_eq!(hits[0].1, CandidateRef(1));
        assert!(hits[0].0 < hits[1].0);
    }

    #[test]
    fn oversized_k_is_bounded_by_the_corpus() {
        let idx = FlatIndex::from_vectors(2, ScoreConvention::SquaredL2, vec![unit(&[1.0, 0.0])])
            .unwrap();
        let hits = idx.search(&unit(&[1.0, 0.0]), usize::MAX).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].1, CandidateRef(0));
        assert!(hits[1].1.is_no_match());
        assert!(idx.search(&unit(&[1.0, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let short = vec![vec![1.0, 0.0]];
        assert!(FlatIndex::from_vectors(3, ScoreConvention::Similarity, short.clone()).is_err());
        let idx = FlatIndex::from_vectors(2, ScoreConvention::Similarity, short).unwrap();
        assert!(idx.search(&[1.0], 1).is_err());
    }
}
