//! Historical assessment records used as regression training data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AssessmentResult, Feature};

/// One persisted assessment. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityRecord {
    pub source: String,
    pub date: DateTime<Utc>,
    pub final_score: f64,
    pub currency: f64,
    pub relevance: f64,
    pub authority: f64,
    pub accuracy: f64,
    pub purpose: f64,
    pub sift_score: f64,
    pub rag_score: f64,
    pub sentiment_polarity: f64,
    pub subjectivity: f64,
}

impl CredibilityRecord {
    pub fn from_result(result: &AssessmentResult) -> Self {
        let signals = &result.signals;
        Self {
            source: result.source_domain.clone(),
            date: result.assessed_at,
            final_score: result.final_score,
            currency: signals.craap.currency,
            relevance: signals.craap.relevance,
            authority: signals.craap.authority,
            accuracy: signals.craap.accuracy,
            purpose: signals.craap.purpose,
            sift_score: signals.sift_score,
            rag_score: signals.rag_score(),
            sentiment_polarity: signals.sentiment.polarity,
            subjectivity: signals.sentiment.subjectivity,
        }
    }

    pub fn craap_mean(&self) -> f64 {
        (self.currency + self.relevance + self.authority + self.accuracy + self.purpose) / 5.0
    }

    /// Regression features, indexed by [`Feature::index`]
    pub fn features(&self) -> [f64; 3] {
        let mut row = [0.0; 3];
        row[Feature::CraapMean.index()] = self.craap_mean();
        row[Feature::SiftScore.index()] = self.sift_score;
        row[Feature::RagScore.index()] = self.rag_score;
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CorroborationReport, CraapScores, ResolvedSignals, ScoreScale, SentimentReport,
        WeightSet,
    };

    #[test]
    fn test_from_result_copies_columns() {
        let signals = ResolvedSignals {
            craap: CraapScores::new(1.0, 0.9, 0.6, 0.85, 0.75),
            sift_score: 0.82,
            corroboration: CorroborationReport {
                score: 0.5,
                ..Default::default()
            },
            sentiment: SentimentReport {
                label: Some("NEGATIVE".to_string()),
                label_score: Some(0.9),
                polarity: -0.25,
                subjectivity: 0.6,
            },
            ledger_verified: Some(true),
            degraded: vec![],
        };
        let result = AssessmentResult::build(
            Some("https://example.com/a".to_string()),
            "example.com",
            signals,
            WeightSet::default(),
            ScoreScale::Raw,
        );

        let record = CredibilityRecord::from_result(&result);
        assert_eq!(record.source, "example.com");
        assert_eq!(record.final_score, 0.72);
        assert_eq!(record.rag_score, 0.5);
        assert_eq!(record.sentiment_polarity, -0.25);
        assert_eq!(record.subjectivity, 0.6);

        let features = record.features();
        assert!((features[0] - 0.82).abs() < 1e-9);
        assert_eq!(features[2], 0.5);
    }
}
