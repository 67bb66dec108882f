use std::sync::Arc;

use halalbot_core::traits::{FeedbackStore, VectorGateway};
use halalbot_core::{
    classify, normalize, AnnotatedResult, Error, GatewayHit, Result, SearchRequest, TextHash,
};
use halalbot_rank::{adjusted_score, rank};
use tracing::{debug, warn};

/// Candidates requested from the gateway per requested result.
pub const DEFAULT_OVERFETCH_FACTOR: usize = 5;

/// Gateway search followed by annotation, feedback adjustment and ranking.
///
/// Searching never writes anything; votes only enter through
/// [`crate::FeedbackService`].
pub struct RetrievalOrchestrator {
    gateway: Arc<dyn VectorGateway>,
    store: Arc<dyn FeedbackStore>,
    overfetch_factor: usize,
}

impl RetrievalOrchestrator {
    pub fn new(gateway: Arc<dyn VectorGateway>, store: Arc<dyn FeedbackStore>) -> Self {
        Self { gateway, store, overfetch_factor: DEFAULT_OVERFETCH_FACTOR }
    }

    pub fn with_overfetch_factor(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor.max(1);
        self
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<AnnotatedResult>> {
        request.validate()?;
        let hits = self
            .gateway
            .search(&request.query, self.fetch_size(request))
            .map_err(Error::Gateway)?;
        Ok(self.rank_hits(request, hits))
    }

    /// Same as [`Self::search`], with the blocking gateway call moved onto
    /// tokio's blocking pool. Ranking still runs on the calling task.
    pub async fn search_offloaded(
        self: Arc<Self>,
        request: SearchRequest,
    ) -> Result<Vec<AnnotatedResult>> {
        request.validate()?;
        let gateway = Arc::clone(&self.gateway);
        let query = request.query.clone();
        let k = self.fetch_size(&request);
        let hits = tokio::task::spawn_blocking(move || gateway.search(&query, k))
            .await
            .map_err(|e| Error::Gateway(anyhow::Error::new(e)))?
            .map_err(Error::Gateway)?;
        Ok(self.rank_hits(&request, hits))
    }

    fn fetch_size(&self, request: &SearchRequest) -> usize {
        request.top_k.saturating_mul(self.overfetch_factor)
    }

    fn rank_hits(&self, request: &SearchRequest, hits: Vec<GatewayHit>) -> Vec<AnnotatedResult> {
        let annotated = self.annotate(hits);
        rank(annotated, request.min_score, request.top_k, request.category)
    }

    fn annotate(&self, hits: Vec<GatewayHit>) -> Vec<AnnotatedResult> {
        let mut out = Vec::with_capacity(hits.len());
        let mut skipped = 0usize;
        for hit in hits {
            if hit.candidate.is_no_match() {
                skipped += 1;
                continue;
            }
            let Some(record) = self.gateway.resolve(hit.candidate) else {
                warn!(candidate = hit.candidate.0, "no metadata for gateway candidate, skipping");
                skipped += 1;
                continue;
            };
            let raw = record.text.trim();
            let text_hash = TextHash::of(raw);
            let votes = self.store.get_aggregate(&text_hash);
            out.push(AnnotatedResult {
                text: normalize(raw),
                category: classify(&record.source),
                source: record.source,
                base_score: hit.score,
                adjusted_score: adjusted_score(hit.score, &votes),
                text_hash,
            });
        }
        debug!(annotated = out.len(), skipped, "annotated gateway hits");
        out
    }
}
