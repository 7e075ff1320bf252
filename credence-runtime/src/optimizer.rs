//! Weight Optimizer
//!
//! Re-estimates the aggregation weights from the full history:
//! - fewer than 10 records: the default `{0.4, 0.3, 0.3}`
//! - otherwise: fit a random forest predicting final_score from
//!   (CRAAP mean, sift, rag) and normalise its feature importances
//!
//! The active weight set lives behind [`ActiveWeights`]; readers take an
//! `Arc` snapshot and the optimizer swaps in a fully built replacement.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use credence_core::{Feature, WeightSet, MIN_TRAINING_RECORDS};

use crate::forest::{ForestConfig, RandomForest};
use crate::store::{SharedStore, StoreError};

/// Shared handle to the active weight set
#[derive(Debug, Default)]
pub struct ActiveWeights {
    current: RwLock<Arc<WeightSet>>,
}

pub type SharedWeights = Arc<ActiveWeights>;

impl ActiveWeights {
    pub fn new(weights: WeightSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(weights)),
        }
    }

    /// The currently active set
    pub fn snapshot(&self) -> Arc<WeightSet> {
        self.current.read().clone()
    }

    /// Replace the active set for subsequent assessments
    pub fn publish(&self, weights: WeightSet) {
        *self.current.write() = Arc::new(weights);
    }
}

/// How a retrain produced its weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainSource {
    /// Not enough history; defaults returned
    InsufficientHistory,
    Fitted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrainReport {
    pub weights: WeightSet,
    pub records: usize,
    pub source: RetrainSource,
    /// Forest importances per feature; empty when nothing was fitted
    pub importances: HashMap<Feature, f64>,
}

/// Batch retraining over the history store
pub struct WeightOptimizer {
    store: SharedStore,
    forest: ForestConfig,
}

impl WeightOptimizer {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            forest: ForestConfig::default(),
        }
    }

    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Read all history and compute a new weight set
    pub fn retrain(&self) -> Result<RetrainReport, StoreError> {
        let records = self.store.read_all()?;

        if records.len() < MIN_TRAINING_RECORDS {
            debug!(
                "Only {} records (need {}), keeping default weights",
                records.len(),
                MIN_TRAINING_RECORDS
            );
            return Ok(RetrainReport {
                weights: WeightSet::default(),
                records: records.len(),
                source: RetrainSource::InsufficientHistory,
                importances: HashMap::new(),
            });
        }

        let x: Vec<[f64; 3]> = records.iter().map(|r| r.features()).collect();
        let y: Vec<f64> = records.iter().map(|r| r.final_score).collect();

        let importances: HashMap<Feature, f64> = RandomForest::fit(&x, &y, &self.forest)
            .map(|model| {
                let fitted = model.feature_importances();
                Feature::ALL
                    .into_iter()
                    .map(|f| (f, fitted[f.index()]))
                    .collect()
            })
            .unwrap_or_default();

        let weights = match WeightSet::from_importances(&importances) {
            Ok(weights) => weights,
            Err(e) => {
                warn!("Importances did not form a valid weight set ({}), using defaults", e);
                WeightSet::default()
            }
        };

        info!(
            "Retrained on {} records: craap={:.3} sift={:.3} rag={:.3}",
            records.len(),
            weights.craap_weight(),
            weights.sift_weight(),
            weights.rag_weight()
        );

        Ok(RetrainReport {
            weights,
            records: records.len(),
            source: RetrainSource::Fitted,
            importances,
        })
    }

    /// Retrain and atomically publish the result
    pub fn retrain_into(&self, active: &ActiveWeights) -> Result<RetrainReport, StoreError> {
        let report = self.retrain()?;
        active.publish(report.weights);
        Ok(report)
    }
}

/// Retrain off the async runtime; the fit is CPU-bound and the store blocks
pub async fn retrain_blocking(
    optimizer: Arc<WeightOptimizer>,
    active: SharedWeights,
) -> Result<RetrainReport, StoreError> {
    tokio::task::spawn_blocking(move || optimizer.retrain_into(&active))
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

/// Retrain every `period` until the handle is aborted. Failures are logged.
pub fn spawn_periodic_retrain(
    optimizer: Arc<WeightOptimizer>,
    active: SharedWeights,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match retrain_blocking(optimizer.clone(), active.clone()).await {
                Ok(report) => debug!("Periodic retrain: {:?} over {} records", report.source, report.records),
                Err(e) => error!("Periodic retrain failed: {}", e),
            }
        }
    })
}

/// Load a saved weight set; missing or invalid files yield the defaults
pub fn load_weights<P: AsRef<Path>>(path: P) -> WeightSet {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No saved weights at {} ({}), using defaults", path.display(), e);
            return WeightSet::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(weights) => weights,
        Err(e) => {
            warn!("Ignoring invalid weights file {}: {}", path.display(), e);
            WeightSet::default()
        }
    }
}

pub fn save_weights<P: AsRef<Path>>(path: P, weights: &WeightSet) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(weights)?;
    std::fs::write(path.as_ref(), json)?;
    debug!("Saved weights to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{HistoryStore, MemoryStore};
    use chrono::Utc;
    use credence_core::CredibilityRecord;

    fn record(craap: f64, rag: f64, final_score: f64) -> CredibilityRecord {
        CredibilityRecord {
            source: "example.com".to_string(),
            date: Utc::now(),
            final_score,
            currency: craap,
            relevance: craap,
            authority: craap,
            accuracy: craap,
            purpose: craap,
            sift_score: craap,
            rag_score: rag,
            sentiment_polarity: 0.0,
            subjectivity: 0.0,
        }
    }

    fn store_with(records: Vec<CredibilityRecord>) -> SharedStore {
        let store = MemoryStore::new();
        for r in &records {
            store.append(r).unwrap();
        }
        Arc::new(store)
    }

    fn quick_forest() -> ForestConfig {
        ForestConfig {
            trees: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_insufficient_history_returns_defaults() {
        let store = store_with((0..9).map(|i| record(0.5, i as f64 / 10.0, 0.3)).collect());
        let report = WeightOptimizer::new(store).retrain().unwrap();

        assert_eq!(report.source, RetrainSource::InsufficientHistory);
        assert_eq!(report.weights, WeightSet::new(0.4, 0.3, 0.3).unwrap());
    }

    #[test]
    fn test_constant_targets_give_equal_weights() {
        let store = store_with((0..12).map(|i| record(i as f64 / 12.0, 0.5, 0.6)).collect());
        let report = WeightOptimizer::new(store)
            .with_forest(quick_forest())
            .retrain()
            .unwrap();

        assert_eq!(report.source, RetrainSource::Fitted);
        assert!(report.importances.values().all(|v| *v == 0.0));
        assert!((report.weights.craap_weight() - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.weights.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fitted_weights_are_valid() {
        let records: Vec<_> = (0..30)
            .map(|i| {
                let rag = (i % 6) as f64 / 5.0;
                let craap = 0.7 + (i % 3) as f64 / 10.0;
                record(craap, rag, 0.4 * craap + 0.3 * craap + 0.3 * rag)
            })
            .collect();
        let report = WeightOptimizer::new(store_with(records))
            .with_forest(quick_forest())
            .retrain()
            .unwrap();

        let w = report.weights;
        assert!((w.sum() - 1.0).abs() < 1e-6);
        assert!(w.craap_weight() >= 0.0 && w.sift_weight() >= 0.0 && w.rag_weight() >= 0.0);
        // sift duplicates the CRAAP mean and never wins a split
        assert_eq!(report.importances[&Feature::SiftScore], 0.0);
        assert_eq!(w.sift_weight(), 0.0);
        assert!(w.craap_weight() > 0.0 && w.rag_weight() > 0.0);
    }

    #[test]
    fn test_unused_features_get_no_weight() {
        let records: Vec<_> = (0..40)
            .map(|i| {
                let rag = (i % 8) as f64 / 7.0;
                record(0.7, rag, rag)
            })
            .collect();
        let report = WeightOptimizer::new(store_with(records))
            .with_forest(quick_forest())
            .retrain()
            .unwrap();

        let w = report.weights;
        assert!((w.rag_weight() - 1.0).abs() < 1e-9);
        assert!(w.craap_weight().abs() < 1e-9);
        assert!(w.sift_weight().abs() < 1e-9);
    }

    #[test]
    fn test_retrain_publishes() {
        let store = store_with((0..12).map(|i| record(0.5, 0.5, i as f64 / 12.0)).collect());
        let active = ActiveWeights::default();
        let before = active.snapshot();

        WeightOptimizer::new(store)
            .with_forest(quick_forest())
            .retrain_into(&active)
            .unwrap();

        // Old snapshots stay intact after a publish
        assert_eq!(*before, WeightSet::default());
        assert!((active.snapshot().sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weights_file_round_trip_and_fallback() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("credence-weights-{}.json", uuid::Uuid::new_v4()));
        assert_eq!(load_weights(&path), WeightSet::default());

        let weights = WeightSet::new(0.5, 0.25, 0.25).unwrap();
        save_weights(&path, &weights).unwrap();
        assert_eq!(load_weights(&path), weights);

        std::fs::write(&path, r#"{"craap_weight": 0.9, "sift_weight": 0.9, "rag_weight": 0.9}"#)
            .unwrap();
        assert_eq!(load_weights(&path), WeightSet::default());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_periodic_retrain_publishes() {
        let store = store_with((0..12).map(|_| record(0.5, 0.5, 0.6)).collect());
        let optimizer = Arc::new(WeightOptimizer::new(store).with_forest(quick_forest()));
        let active: SharedWeights = Arc::new(ActiveWeights::default());

        let handle = spawn_periodic_retrain(optimizer, active.clone(), Duration::from_millis(20));
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if *active.snapshot() != WeightSet::default() {
                break;
            }
        }
        handle.abort();

        assert!((active.snapshot().craap_weight() - 1.0 / 3.0).abs() < 1e-9);
    }
}
