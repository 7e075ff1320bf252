//! Freshness/authority heuristic provider

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use credence_core::{ArticleContent, CraapScores, SignalKind};

use crate::{SignalError, SignalProvider};

/// Scores CRAAP factors from article metadata. Never suspends.
#[derive(Debug, Clone, Default)]
pub struct CraapEvaluator {
    /// Fixed reference time; `Utc::now()` when unset
    fixed_now: Option<DateTime<Utc>>,
}

impl CraapEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate currency against a fixed clock
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            fixed_now: Some(now),
        }
    }
}

#[async_trait]
impl SignalProvider for CraapEvaluator {
    type Output = CraapScores;

    fn kind(&self) -> SignalKind {
        SignalKind::Craap
    }

    async fn evaluate(&self, article: &ArticleContent) -> Result<CraapScores, SignalError> {
        let now = self.fixed_now.unwrap_or_else(Utc::now);
        let scores = CraapScores::evaluate(&article.metadata, now);
        debug!(
            "CRAAP for {}: currency={:.2} authority={:.2}",
            article.metadata.source_domain, scores.currency, scores.authority
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use credence_core::ArticleMetadata;

    #[tokio::test]
    async fn test_evaluates_gov_source() {
        let now = Utc::now();
        let metadata =
            ArticleMetadata::new("data.census.gov").with_publication_date(now - Duration::days(365));
        let article = ArticleContent::from_text("Population grew.", metadata);

        let scores = CraapEvaluator::at(now).evaluate(&article).await.unwrap();
        assert_eq!(scores.currency, 0.0);
        assert_eq!(scores.authority, 0.8);
    }

    #[tokio::test]
    async fn test_missing_date_is_current() {
        let article = ArticleContent::from_text("Text.", ArticleMetadata::new("blog.example.com"));
        let scores = CraapEvaluator::new().evaluate(&article).await.unwrap();
        assert_eq!(scores.currency, 1.0);
        assert_eq!(scores.authority, 0.6);
    }
}
