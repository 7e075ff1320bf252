//! Corroboration fan-out
//!
//! Builds one composite corroboration score from:
//! - nearest-neighbour similarity against the reference index (top 3)
//! - the primary structured fact-check source
//! - the two secondary fact-check site scrapers
//!
//! All four lookups run concurrently, each under one call timeout (the
//! vector lookup's embed and search share a single deadline). A failing
//! lookup contributes nothing; the fan-out itself never fails.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use credence_core::{
    round2, ArticleContent, CorroborationReport, FactCheckClaim, FactCheckHit, SignalKind,
    VectorMatch, DEFAULT_TIMEOUT_SECS, VECTOR_TOP_K,
};

use crate::{
    with_timeout, ClaimSearch, Embedder, SignalError, SignalProvider, SiteSearch, VectorIndex,
};

/// Boost per primary-source match
pub const PRIMARY_BOOST: f64 = 0.15;

/// Boost per secondary-source match
pub const SECONDARY_BOOST: f64 = 0.10;

/// `vector + 0.15 * primary + 0.10 * secondary`, rounded to 2 decimals. Uncapped.
pub fn composite_score(vector_score: f64, primary_matches: usize, secondary_matches: usize) -> f64 {
    round2(
        vector_score
            + PRIMARY_BOOST * primary_matches as f64
            + SECONDARY_BOOST * secondary_matches as f64,
    )
}

/// Mean match score, 0 when there are no matches
pub fn mean_match_score(matches: &[VectorMatch]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }
    matches.iter().map(|m| m.score).sum::<f64>() / matches.len() as f64
}

/// Corroboration signal provider
pub struct CorroborationFanOut {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    primary: Option<Arc<dyn ClaimSearch>>,
    secondary: Vec<Arc<dyn SiteSearch>>,
    call_timeout: Duration,
    top_k: usize,
}

impl CorroborationFanOut {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            primary: None,
            secondary: Vec::new(),
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            top_k: VECTOR_TOP_K,
        }
    }

    /// Enable the primary structured source
    pub fn with_primary(mut self, source: Arc<dyn ClaimSearch>) -> Self {
        self.primary = Some(source);
        self
    }

    pub fn with_secondary(mut self, source: Arc<dyn SiteSearch>) -> Self {
        self.secondary.push(source);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn vector_matches(&self, text: &str) -> Vec<VectorMatch> {
        let lookup = async {
            let vector = self.embedder.embed(text).await?;
            self.index.search(&vector, self.top_k).await
        };

        match with_timeout(self.call_timeout, lookup).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Vector corroboration unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn primary_claims(&self, query: &str) -> Vec<FactCheckClaim> {
        let Some(source) = &self.primary else {
            return Vec::new();
        };

        match with_timeout(self.call_timeout, source.search_fact_checks(query)).await {
            Ok(claims) => claims,
            Err(SignalError::Disabled(what)) => {
                debug!("Primary fact-check source disabled: {}", what);
                Vec::new()
            }
            Err(e) => {
                warn!("Primary fact-check source {} failed: {}", source.name(), e);
                Vec::new()
            }
        }
    }

    async fn secondary_hits(&self, source: &Arc<dyn SiteSearch>, query: &str) -> Vec<FactCheckHit> {
        match with_timeout(self.call_timeout, source.scrape_fact_check_site(query)).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Fact-check site {} failed: {}", source.name(), e);
                Vec::new()
            }
        }
    }

    /// Run the full fan-out for an article
    pub async fn corroborate(&self, article: &ArticleContent) -> CorroborationReport {
        let query = article.claim_query();

        let secondary = join_all(
            self.secondary
                .iter()
                .map(|source| self.secondary_hits(source, &query)),
        );

        let (vector_matches, primary_claims, secondary_hits) = tokio::join!(
            self.vector_matches(&article.text),
            self.primary_claims(&query),
            secondary,
        );

        let secondary_hits: Vec<FactCheckHit> = secondary_hits.into_iter().flatten().collect();
        let vector_score = mean_match_score(&vector_matches);
        let score = composite_score(vector_score, primary_claims.len(), secondary_hits.len());

        info!(
            "Corroboration {:.2}: {} vector matches, {} primary claims, {} secondary hits",
            score,
            vector_matches.len(),
            primary_claims.len(),
            secondary_hits.len()
        );

        CorroborationReport {
            score,
            vector_score,
            vector_matches,
            primary_claims,
            secondary_hits,
        }
    }
}

#[async_trait]
impl SignalProvider for CorroborationFanOut {
    type Output = CorroborationReport;

    fn kind(&self) -> SignalKind {
        SignalKind::Corroboration
    }

    async fn evaluate(&self, article: &ArticleContent) -> Result<CorroborationReport, SignalError> {
        Ok(self.corroborate(article).await)
    }
}
