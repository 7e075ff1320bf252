//! Provider and collaborator interfaces

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use credence_core::{ArticleContent, FactCheckClaim, FactCheckHit, SignalKind, VectorMatch};
use credence_net::{
    ExtractionError, FactCheckApiClient, HttpExtractor, LedgerClient, NetError, SiteScraper,
};

/// Errors from signal computation
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0} is disabled")]
    Disabled(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

impl From<NetError> for SignalError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::Disabled(what) => SignalError::Disabled(what),
            other => SignalError::Network(other.to_string()),
        }
    }
}

/// Run `call` under `limit`; elapsing becomes [`SignalError::Timeout`]
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, SignalError>
where
    F: Future<Output = Result<T, SignalError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SignalError::Timeout(limit.as_secs())),
    }
}

/// A credibility signal computed from one article
#[async_trait]
pub trait SignalProvider: Send + Sync {
    type Output: Send + 'static;

    /// Which signal this provider produces
    fn kind(&self) -> SignalKind;

    async fn evaluate(&self, article: &ArticleContent) -> Result<Self::Output, SignalError>;
}

/// Upstream article extraction
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ArticleContent, ExtractionError>;
}

/// Text embedding encoder
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SignalError>;
}

/// Nearest-neighbour search over reference claim vectors
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top `top_k` matches with similarity-derived scores in [0,1]
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, SignalError>;

    async fn upsert(&self, id: &str, vector: Vec<f32>, text: &str) -> Result<(), SignalError>;
}

/// Primary structured fact-check source
#[async_trait]
pub trait ClaimSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search_fact_checks(&self, query: &str) -> Result<Vec<FactCheckClaim>, SignalError>;
}

/// Secondary unstructured fact-check source
#[async_trait]
pub trait SiteSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn scrape_fact_check_site(&self, query: &str) -> Result<Vec<FactCheckHit>, SignalError>;
}

/// Sentiment label from a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentLabel {
    pub label: String,
    pub score: f64,
}

/// Polarity in [-1,1] and subjectivity in [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Subjectivity {
    pub polarity: f64,
    pub subjectivity: f64,
}

/// Sentiment classifier, fed at most 512 characters
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, SignalError>;
}

/// Polarity/subjectivity analysis
#[async_trait]
pub trait SubjectivityAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Subjectivity, SignalError>;
}

/// Advisory ledger lookup
#[async_trait]
pub trait LedgerVerifier: Send + Sync {
    async fn verify_on_ledger(&self, url: &str) -> Result<bool, SignalError>;
}

#[async_trait]
impl ArticleExtractor for HttpExtractor {
    async fn extract(&self, url: &str) -> Result<ArticleContent, ExtractionError> {
        HttpExtractor::extract(self, url).await
    }
}

#[async_trait]
impl ClaimSearch for FactCheckApiClient {
    fn name(&self) -> &str {
        "google_factcheck"
    }

    async fn search_fact_checks(&self, query: &str) -> Result<Vec<FactCheckClaim>, SignalError> {
        Ok(FactCheckApiClient::search_fact_checks(self, query).await?)
    }
}

#[async_trait]
impl SiteSearch for SiteScraper {
    fn name(&self) -> &str {
        self.site().name
    }

    async fn scrape_fact_check_site(&self, query: &str) -> Result<Vec<FactCheckHit>, SignalError> {
        Ok(self.scrape(query).await?)
    }
}

#[async_trait]
impl LedgerVerifier for LedgerClient {
    async fn verify_on_ledger(&self, url: &str) -> Result<bool, SignalError> {
        Ok(LedgerClient::verify_on_ledger(self, url).await?)
    }
}
