use anyhow::{ensure, Result};
use halalbot_core::config::ScoreConvention;
use halalbot_core::traits::{Embedder, VectorGateway};
use halalbot_core::{CandidateRef, GatewayHit, PassageRecord};
use tracing::{debug, info};

use crate::flat::FlatIndex;
use crate::metadata::MetadataStore;

/// Map a raw index score onto the higher-is-better similarity scale the
/// ranking pipeline compares against `min_score`.
///
/// For unit vectors `|a - b|^2 = 2 - 2 cos(a, b)`, so squared L2 distances
/// convert exactly to cosine similarity.
pub fn to_similarity(raw: f32, convention: ScoreConvention) -> f32 {
    match convention {
        ScoreConvention::Similarity => raw,
        ScoreConvention::SquaredL2 => (1.0 - raw / 2.0).clamp(0.0, 1.0),
    }
}

/// Embedder + flat index + metadata behind the [`VectorGateway`] seam.
pub struct FlatGateway {
    index: FlatIndex,
    metadata: MetadataStore,
    embedder: Box<dyn Embedder>,
}

impl FlatGateway {
    pub fn new(
        index: FlatIndex,
        metadata: MetadataStore,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self> {
        ensure!(
            index.dim() == embedder.dim(),
            "index dimension {} does not match embedder dimension {}",
            index.dim(),
            embedder.dim()
        );
        ensure!(
            index.len() == metadata.len(),
            "index holds {} vectors but metadata has {} records",
            index.len(),
            metadata.len()
        );
        Ok(Self { index, metadata, embedder })
    }

    /// Embed every metadata passage and build the index in one go.
    pub fn from_metadata(
        metadata: MetadataStore,
        embedder: Box<dyn Embedder>,
        metric: ScoreConvention,
    ) -> Result<Self> {
        let texts: Vec<String> = metadata.records().iter().map(|r| r.text.clone()).collect();
        let index = FlatIndex::build(&texts, embedder.as_ref(), metric)?;
        info!(passages = index.len(), dim = index.dim(), ?metric, "flat index built");
        Self::new(index, metadata, embedder)
    }
}

impl VectorGateway for FlatGateway {
    fn search(&self, query: &str, k: usize) -> Result<Vec<GatewayHit>> {
        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;
        let hits: Vec<GatewayHit> = self
            .index
            .search(&query_vec, k)?
            .into_iter()
            .map(|(raw, candidate)| GatewayHit {
                score: if candidate.is_no_match() {
                    0.0
                } else {
                    to_similarity(raw, self.index.metric())
                },
                candidate,
            })
            .collect();
        debug!(k, returned = hits.len(), "gateway search");
        Ok(hits)
    }

    fn resolve(&self, candidate: CandidateRef) -> Option<PassageRecord> {
        self.metadata.get(candidate).cloned()
    }
}
