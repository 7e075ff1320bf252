//! Assessment pipeline
//!
//! extract -> orchestrate -> resolve defaults -> aggregate -> persist.
//! Only extraction failure and a persistence failure that survives one
//! retry reach the caller.

use futures::stream::{self, StreamExt};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use credence_core::{
    ArticleContent, AssessmentResult, CredibilityRecord, ResolvedSignals, ScoreScale,
};
use credence_net::ExtractionError;
use credence_signals::ArticleExtractor;

use crate::optimizer::SharedWeights;
use crate::orchestrator::Orchestrator;
use crate::store::{SharedStore, StoreError};

/// Additional append attempts after the first failure
const PERSIST_RETRIES: usize = 1;

/// Errors surfaced to the caller of an assessment
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Could not persist assessment: {0}")]
    Persistence(#[from] StoreError),
}

impl AssessmentError {
    pub fn kind(&self) -> &'static str {
        match self {
            AssessmentError::Extraction(_) => "extraction_error",
            AssessmentError::Persistence(_) => "persistence_error",
        }
    }
}

/// Serialises as `{"error": kind, "message": text}`
impl Serialize for AssessmentError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AssessmentError", 2)?;
        state.serialize_field("error", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// One entry of a batch run
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub url: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Assessed(Box<AssessmentResult>),
    Failed(AssessmentError),
}

/// Runs complete assessments against shared weights and history
#[derive(Clone)]
pub struct Assessor {
    extractor: Arc<dyn ArticleExtractor>,
    orchestrator: Orchestrator,
    weights: SharedWeights,
    store: SharedStore,
    scale: ScoreScale,
}

impl Assessor {
    pub fn new(
        extractor: Arc<dyn ArticleExtractor>,
        orchestrator: Orchestrator,
        weights: SharedWeights,
        store: SharedStore,
    ) -> Self {
        Self {
            extractor,
            orchestrator,
            weights,
            store,
            scale: ScoreScale::default(),
        }
    }

    pub fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    /// Fetch and assess a URL
    pub async fn assess_url(&self, url: &str) -> Result<AssessmentResult, AssessmentError> {
        let assessment_id = Uuid::new_v4();
        let span = tracing::info_span!("assessment", id = %assessment_id, url = %url);

        async {
            let article = self.extractor.extract(url).await.map_err(|e| {
                error!("Extraction failed: {}", e);
                e
            })?;
            self.run(assessment_id, article).await
        }
        .instrument(span)
        .await
    }

    /// Assess already extracted content
    pub async fn assess_article(
        &self,
        article: ArticleContent,
    ) -> Result<AssessmentResult, AssessmentError> {
        let assessment_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "assessment",
            id = %assessment_id,
            source = %article.metadata.source_domain
        );
        self.run(assessment_id, article).instrument(span).await
    }

    async fn run(
        &self,
        assessment_id: Uuid,
        article: ArticleContent,
    ) -> Result<AssessmentResult, AssessmentError> {
        let article = Arc::new(article);
        let bundle = self.orchestrator.orchestrate(article.clone()).await;
        let signals = ResolvedSignals::resolve(bundle);
        if !signals.degraded.is_empty() {
            debug!("Degraded signals: {:?}", signals.degraded);
        }

        let weights = self.weights.snapshot();
        let result = AssessmentResult::build(
            article.url.clone(),
            &article.metadata.source_domain,
            signals,
            *weights,
            self.scale,
        )
        .with_id(assessment_id);

        self.persist(CredibilityRecord::from_result(&result)).await?;

        info!(
            "Assessed {}: {:.2} ({})",
            result.source_domain, result.final_score, result.label
        );
        Ok(result)
    }

    async fn persist(&self, record: CredibilityRecord) -> Result<(), StoreError> {
        let record = Arc::new(record);
        let mut attempt = 0;

        loop {
            let store = self.store.clone();
            let row = record.clone();
            let outcome = match tokio::task::spawn_blocking(move || store.append(&row)).await {
                Ok(outcome) => outcome,
                Err(e) => Err(StoreError::Task(e.to_string())),
            };

            match outcome {
                Ok(()) => return Ok(()),
                Err(e) if attempt < PERSIST_RETRIES => {
                    attempt += 1;
                    warn!("History append failed ({}), retrying", e);
                }
                Err(e) => {
                    error!("History append failed after retry: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Assess many URLs with at most `concurrency` in flight. Results come
    /// back in completion order.
    pub async fn assess_batch(&self, urls: Vec<String>, concurrency: usize) -> Vec<BatchItem> {
        info!("Assessing {} URLs, {} at a time", urls.len(), concurrency.max(1));

        stream::iter(urls)
            .map(|url| async move {
                let outcome = match self.assess_url(&url).await {
                    Ok(result) => BatchOutcome::Assessed(Box::new(result)),
                    Err(e) => BatchOutcome::Failed(e),
                };
                BatchItem { url, outcome }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ActiveWeights;
    use crate::orchestrator::{CorroborationSignal, SentimentSignal};
    use crate::store::{HistoryStore, MemoryStore, SqliteStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use credence_core::{
        ArticleMetadata, CorroborationReport, CredibilityLabel, SentimentReport, SignalKind,
        WeightSet,
    };
    use credence_signals::{CraapEvaluator, LedgerProvider, SignalError, SignalProvider};
    use parking_lot::Mutex;

    struct StaticExtractor;

    #[async_trait]
    impl ArticleExtractor for StaticExtractor {
        async fn extract(&self, url: &str) -> Result<ArticleContent, ExtractionError> {
            if url.contains("missing") {
                return Err(ExtractionError::EmptyContent(url.to_string()));
            }
            Ok(ArticleContent::new(
                Some(url.to_string()),
                Some("Title".to_string()),
                "Body text of the article.".to_string(),
                ArticleMetadata::new("news.example.com").with_publication_date(Utc::now()),
            ))
        }
    }

    struct Corroborated(f64);

    #[async_trait]
    impl SignalProvider for Corroborated {
        type Output = CorroborationReport;

        fn kind(&self) -> SignalKind {
            SignalKind::Corroboration
        }

        async fn evaluate(&self, _: &ArticleContent) -> Result<CorroborationReport, SignalError> {
            Ok(CorroborationReport {
                score: self.0,
                ..Default::default()
            })
        }
    }

    struct BrokenSentiment;

    #[async_trait]
    impl SignalProvider for BrokenSentiment {
        type Output = SentimentReport;

        fn kind(&self) -> SignalKind {
            SignalKind::Sentiment
        }

        async fn evaluate(&self, _: &ArticleContent) -> Result<SentimentReport, SignalError> {
            Err(SignalError::Classification("offline".to_string()))
        }
    }

    /// Fails the first `failures` appends, then delegates
    struct FlakyStore {
        inner: MemoryStore,
        failures: Mutex<usize>,
    }

    impl HistoryStore for FlakyStore {
        fn append(&self, record: &CredibilityRecord) -> Result<(), StoreError> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(StoreError::Task("disk full".to_string()));
            }
            self.inner.append(record)
        }

        fn read_all(&self) -> Result<Vec<CredibilityRecord>, StoreError> {
            self.inner.read_all()
        }

        fn count(&self) -> Result<usize, StoreError> {
            self.inner.count()
        }
    }

    fn assessor(store: SharedStore, corroboration: CorroborationSignal, sentiment: SentimentSignal) -> Assessor {
        let orchestrator = Orchestrator::new(
            Arc::new(CraapEvaluator::new()),
            corroboration,
            sentiment,
            Arc::new(LedgerProvider::disabled()),
        );
        Assessor::new(
            Arc::new(StaticExtractor),
            orchestrator,
            Arc::new(ActiveWeights::default()),
            store,
        )
    }

    fn flaky(failures: usize) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures: Mutex::new(failures),
        })
    }

    #[tokio::test]
    async fn test_end_to_end_assessment_is_persisted() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory().unwrap());
        let assessor = assessor(
            store.clone(),
            Arc::new(Corroborated(0.5)),
            Arc::new(BrokenSentiment),
        );

        let result = assessor.assess_url("https://news.example.com/story").await.unwrap();

        // Fresh .com article: CRAAP mean 0.82, rag 0.5
        assert_eq!(result.final_score, 0.72);
        assert_eq!(result.label, CredibilityLabel::Unreliable);
        assert_eq!(result.signals.sentiment, SentimentReport::neutral());
        assert_eq!(result.signals.ledger_verified, None);

        let history = store.read_all().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], CredibilityRecord::from_result(&result));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        let assessor = assessor(store.clone(), Arc::new(Corroborated(0.5)), Arc::new(BrokenSentiment));

        let err = assessor.assess_url("https://missing.example.com").await.unwrap_err();
        assert!(matches!(err, AssessmentError::Extraction(_)));
        assert_eq!(store.count().unwrap(), 0);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "extraction_error");
        assert!(json["message"].as_str().unwrap().contains("missing.example.com"));
    }

    #[tokio::test]
    async fn test_persistence_retried_once() {
        let store = flaky(1);
        let assessor = assessor(store.clone(), Arc::new(Corroborated(0.2)), Arc::new(BrokenSentiment));

        assert!(assessor.assess_url("https://a.example.com").await.is_ok());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces() {
        let store = flaky(2);
        let assessor = assessor(store.clone(), Arc::new(Corroborated(0.2)), Arc::new(BrokenSentiment));

        let err = assessor.assess_url("https://a.example.com").await.unwrap_err();
        assert!(matches!(err, AssessmentError::Persistence(_)));
        assert_eq!(serde_json::to_value(&err).unwrap()["error"], "persistence_error");
    }

    #[tokio::test]
    async fn test_published_weights_apply_to_next_assessment() {
        let store = Arc::new(MemoryStore::new());
        let assessor = assessor(store, Arc::new(Corroborated(0.0)), Arc::new(BrokenSentiment));
        let article = || {
            ArticleContent::from_text("Some text.", ArticleMetadata::new("example.com"))
        };

        let before = assessor.assess_article(article()).await.unwrap();
        assessor.weights.publish(WeightSet::new(0.0, 0.0, 1.0).unwrap());
        let after = assessor.assess_article(article()).await.unwrap();

        assert!(before.final_score > 0.0);
        assert_eq!(after.final_score, 0.0);
        assert_eq!(after.weights.rag_weight(), 1.0);
    }

    #[tokio::test]
    async fn test_batch_reports_each_url() {
        let store = Arc::new(MemoryStore::new());
        let assessor = assessor(store.clone(), Arc::new(Corroborated(0.3)), Arc::new(BrokenSentiment));
        let urls = vec![
            "https://one.example.com".to_string(),
            "https://missing.example.com".to_string(),
            "https://two.example.com".to_string(),
        ];

        let items = assessor.assess_batch(urls, 2).await;
        assert_eq!(items.len(), 3);
        let failed = items
            .iter()
            .filter(|i| matches!(i.outcome, BatchOutcome::Failed(_)))
            .count();
        assert_eq!(failed, 1);
        assert_eq!(store.count().unwrap(), 2);
    }
}
