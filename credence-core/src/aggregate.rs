//! Weighted aggregation of signal outputs into a final score and label
//!
//! Everything here is pure: the same bundle and weights always yield the
//! same result. Failed or timed-out signals are replaced by their neutral
//! defaults before combination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    label_for, round2, CorroborationReport, CraapScores, CredibilityLabel, ScoreScale,
    SentimentReport, SignalBundle, SignalKind, SignalScore, WeightSet,
};

/// SIFT proxy: currently the CRAAP mean
pub fn sift_score(craap: &CraapScores) -> f64 {
    craap.mean()
}

/// `craap_w * mean(craap) + sift_w * sift + rag_w * rag`, rounded to 2 decimals
pub fn aggregate(craap: &CraapScores, sift: f64, rag: f64, weights: &WeightSet) -> f64 {
    round2(
        weights.craap_weight() * craap.mean()
            + weights.sift_weight() * sift
            + weights.rag_weight() * rag,
    )
}

/// Signal values after neutral defaults were applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSignals {
    pub craap: CraapScores,
    pub sift_score: f64,
    pub corroboration: CorroborationReport,
    pub sentiment: SentimentReport,
    pub ledger_verified: Option<bool>,
    /// Signals that fell back to defaults
    pub degraded: Vec<SignalKind>,
}

impl ResolvedSignals {
    pub fn resolve(bundle: SignalBundle) -> Self {
        let degraded = bundle.degraded();
        let craap = bundle.craap.or_default_with(CraapScores::baseline);
        let corroboration = bundle
            .corroboration
            .or_default_with(CorroborationReport::neutral);
        let sentiment = bundle.sentiment.or_default_with(SentimentReport::neutral);
        let ledger_verified = bundle.ledger.value().copied();

        Self {
            sift_score: sift_score(&craap),
            craap,
            corroboration,
            sentiment,
            ledger_verified,
            degraded,
        }
    }

    pub fn rag_score(&self) -> f64 {
        self.corroboration.score
    }

    pub fn breakdown(&self) -> Vec<SignalScore> {
        vec![
            self.craap.to_signal(),
            SignalScore::new("sift", self.sift_score),
            self.corroboration.to_signal(),
            self.sentiment.to_signal(),
        ]
    }
}

/// Outcome of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub assessment_id: Uuid,
    pub assessed_at: DateTime<Utc>,
    pub url: Option<String>,
    pub source_domain: String,
    pub final_score: f64,
    pub label: CredibilityLabel,
    /// Weights used for this assessment
    pub weights: WeightSet,
    pub signals: ResolvedSignals,
    /// Per-signal breakdown for transparency
    pub breakdown: Vec<SignalScore>,
}

impl AssessmentResult {
    /// Combine resolved signals with the active weights
    pub fn build(
        url: Option<String>,
        source_domain: &str,
        signals: ResolvedSignals,
        weights: WeightSet,
        scale: ScoreScale,
    ) -> Self {
        let final_score = aggregate(&signals.craap, signals.sift_score, signals.rag_score(), &weights);
        let label = label_for(final_score, scale);

        Self {
            assessment_id: Uuid::new_v4(),
            assessed_at: Utc::now(),
            url,
            source_domain: source_domain.to_string(),
            final_score,
            label,
            weights,
            breakdown: signals.breakdown(),
            signals,
        }
    }

    /// Reuse an id allocated before the assessment started
    pub fn with_id(mut self, assessment_id: Uuid) -> Self {
        self.assessment_id = assessment_id;
        self
    }
}
