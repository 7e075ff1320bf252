//! Service wiring
//!
//! Builds every collaborator once from [`Settings`] and hands explicit
//! handles to the pipeline and optimizer.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use credence_core::{secondary_sites, WeightSet};
use credence_net::{FactCheckApiClient, HttpConfig, HttpExtractor, LedgerClient, SiteScraper};
use credence_signals::{
    load_reference_claims, CorroborationFanOut, CraapEvaluator, Embedder, HashingEmbedder,
    IndexBackend, IndexKind, LedgerProvider, LedgerVerifier, LexiconAnalyzer, ModelBackend,
    ModelBackendConfig, QdrantConfig, SentimentEvaluator,
};

use crate::config::{non_empty, Settings};
use crate::optimizer::{load_weights, ActiveWeights, SharedWeights, WeightOptimizer};
use crate::orchestrator::Orchestrator;
use crate::pipeline::Assessor;
use crate::store::{SharedStore, SqliteStore};

/// Extra time a sub-task gets beyond its own call timeouts
const SUBTASK_GRACE_SECS: u64 = 2;

/// What is active in this process
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub index: IndexKind,
    pub embedder: String,
    pub seeded_claims: usize,
    pub primary_factcheck: bool,
    pub secondary_sites: Vec<String>,
    pub sentiment_classifier: bool,
    pub ledger: bool,
    pub weights: WeightSet,
}

/// Fully wired runtime
pub struct Services {
    pub assessor: Assessor,
    pub optimizer: Arc<WeightOptimizer>,
    pub weights: SharedWeights,
    pub store: SharedStore,
    pub status: ServiceStatus,
}

impl Services {
    pub async fn build(settings: &Settings) -> anyhow::Result<Self> {
        let http = HttpConfig::default().with_timeout(settings.request_timeout_secs);
        let call_timeout = http.timeout();

        let model = match non_empty(&settings.openai_api_key) {
            Some(key) => {
                let mut config = ModelBackendConfig::openai(key);
                config.embedding_model = settings.embedding_model.clone();
                config.sentiment_model = settings.sentiment_model.clone();
                if let Some(base_url) = non_empty(&settings.openai_base_url) {
                    config = config.with_base_url(base_url);
                }
                Some(Arc::new(ModelBackend::new(config)?))
            }
            None => None,
        };

        let embedder: Arc<dyn Embedder> = match &model {
            Some(model) => model.clone(),
            None => Arc::new(HashingEmbedder::default()),
        };

        let qdrant = non_empty(&settings.qdrant_url).map(|url| QdrantConfig {
            url: url.to_string(),
            api_key: non_empty(&settings.qdrant_api_key).map(str::to_string),
            collection: settings.qdrant_collection.clone(),
        });
        let index = Arc::new(IndexBackend::select(qdrant.as_ref(), &http).await);

        let seeded_claims = match &settings.reference_claims_path {
            Some(path) => match load_reference_claims(path) {
                Ok(claims) => index.seed(&embedder, &claims).await,
                Err(e) => {
                    warn!("Reference claims not loaded: {}", e);
                    0
                }
            },
            None => 0,
        };

        let mut corroboration = CorroborationFanOut::new(embedder.clone(), index.clone())
            .with_timeout(call_timeout);
        let primary_factcheck = match non_empty(&settings.factcheck_api_key) {
            Some(key) => {
                corroboration =
                    corroboration.with_primary(Arc::new(FactCheckApiClient::new(&http, key)?));
                true
            }
            None => {
                info!("No fact-check API key, primary source disabled");
                false
            }
        };
        let mut site_names = Vec::new();
        for site in secondary_sites() {
            corroboration = corroboration.with_secondary(Arc::new(SiteScraper::new(&http, site)?));
            site_names.push(site.name.to_string());
        }

        let mut sentiment =
            SentimentEvaluator::new(Arc::new(LexiconAnalyzer::new())).with_timeout(call_timeout);
        if let Some(model) = &model {
            sentiment = sentiment.with_classifier(model.clone());
        }

        let verifier: Option<Arc<dyn LedgerVerifier>> = match non_empty(&settings.ledger_url) {
            Some(url) => Some(Arc::new(LedgerClient::new(&http, url)?)),
            None => None,
        };
        let ledger_enabled = verifier.is_some();
        let ledger = LedgerProvider::new(verifier).with_timeout(call_timeout);

        let orchestrator = Orchestrator::new(
            Arc::new(CraapEvaluator::new()),
            Arc::new(corroboration),
            Arc::new(sentiment),
            Arc::new(ledger),
        )
        .with_timeout(call_timeout + Duration::from_secs(SUBTASK_GRACE_SECS));

        let store: SharedStore = Arc::new(SqliteStore::open(&settings.db_path)?);
        let weights: SharedWeights = Arc::new(ActiveWeights::new(load_weights(&settings.weights_path)));
        let optimizer = Arc::new(WeightOptimizer::new(store.clone()).with_forest(settings.forest));

        let assessor = Assessor::new(
            Arc::new(HttpExtractor::new(&http)?),
            orchestrator,
            weights.clone(),
            store.clone(),
        )
        .with_scale(settings.score_scale);

        let status = ServiceStatus {
            index: index.kind(),
            embedder: embedder.name().to_string(),
            seeded_claims,
            primary_factcheck,
            secondary_sites: site_names,
            sentiment_classifier: model.is_some(),
            ledger: ledger_enabled,
            weights: *weights.snapshot(),
        };
        info!(
            "Services ready: index={:?} embedder={} primary_factcheck={} ledger={}",
            status.index, status.embedder, status.primary_factcheck, status.ledger
        );

        Ok(Self {
            assessor,
            optimizer,
            weights,
            store,
            status,
        })
    }
}
