//! Aggregation weight sets

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Tolerance on the weight-sum invariant
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Errors constructing a weight set
#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("Weight {name} is negative: {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("Weight {name} is not finite")]
    NonFinite { name: &'static str },

    #[error("Weights sum to {0}, expected 1.0")]
    BadSum(f64),

    #[error("Cannot normalize weights with zero total")]
    ZeroTotal,
}

/// The three features the aggregator combines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Mean of the five CRAAP sub-scores
    CraapMean,
    SiftScore,
    RagScore,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::CraapMean, Feature::SiftScore, Feature::RagScore];

    pub fn index(&self) -> usize {
        match self {
            Feature::CraapMean => 0,
            Feature::SiftScore => 1,
            Feature::RagScore => 2,
        }
    }
}

/// Non-negative combination weights summing to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct WeightSet {
    craap_weight: f64,
    sift_weight: f64,
    rag_weight: f64,
}

impl WeightSet {
    /// Validate and build a weight set
    pub fn new(craap_weight: f64, sift_weight: f64, rag_weight: f64) -> Result<Self, WeightError> {
        for (name, value) in [
            ("craap_weight", craap_weight),
            ("sift_weight", sift_weight),
            ("rag_weight", rag_weight),
        ] {
            if !value.is_finite() {
                return Err(WeightError::NonFinite { name });
            }
            if value < 0.0 {
                return Err(WeightError::Negative { name, value });
            }
        }

        let sum = craap_weight + sift_weight + rag_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::BadSum(sum));
        }

        Ok(Self {
            craap_weight,
            sift_weight,
            rag_weight,
        })
    }

    /// Scale arbitrary non-negative values so they sum to 1.0
    pub fn normalized(craap: f64, sift: f64, rag: f64) -> Result<Self, WeightError> {
        let total = craap + sift + rag;
        if !total.is_finite() {
            return Err(WeightError::NonFinite { name: "total" });
        }
        if total <= 0.0 {
            return Err(WeightError::ZeroTotal);
        }
        let craap = craap / total;
        let sift = sift / total;
        // Assign the remainder so the sum is exact up to rounding of one term
        let rag = (1.0 - craap - sift).max(0.0);
        Self::new(craap, sift, rag)
    }

    /// Build from model importances. A feature missing from the map
    /// counts with importance 1.0 so it is never silently dropped; a
    /// reported 0.0 stays 0.0. All-zero importances give equal weights.
    pub fn from_importances(importances: &HashMap<Feature, f64>) -> Result<Self, WeightError> {
        let get = |feature: Feature| importances.get(&feature).copied().unwrap_or(1.0);
        let (craap, sift, rag) = (
            get(Feature::CraapMean),
            get(Feature::SiftScore),
            get(Feature::RagScore),
        );
        if craap == 0.0 && sift == 0.0 && rag == 0.0 {
            return Self::normalized(1.0, 1.0, 1.0);
        }
        Self::normalized(craap, sift, rag)
    }

    pub fn craap_weight(&self) -> f64 {
        self.craap_weight
    }

    pub fn sift_weight(&self) -> f64 {
        self.sift_weight
    }

    pub fn rag_weight(&self) -> f64 {
        self.rag_weight
    }

    pub fn sum(&self) -> f64 {
        self.craap_weight + self.sift_weight + self.rag_weight
    }
}

impl Default for WeightSet {
    /// `{0.4, 0.3, 0.3}`
    fn default() -> Self {
        Self {
            craap_weight: 0.4,
            sift_weight: 0.3,
            rag_weight: 0.3,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawWeights {
    craap_weight: f64,
    sift_weight: f64,
    rag_weight: f64,
}

impl TryFrom<RawWeights> for WeightSet {
    type Error = WeightError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        WeightSet::new(raw.craap_weight, raw.sift_weight, raw.rag_weight)
    }
}

impl From<WeightSet> for RawWeights {
    fn from(weights: WeightSet) -> Self {
        RawWeights {
            craap_weight: weights.craap_weight,
            sift_weight: weights.sift_weight,
            rag_weight: weights.rag_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = WeightSet::default();
        assert_eq!(weights.craap_weight(), 0.4);
        assert_eq!(weights.sift_weight(), 0.3);
        assert_eq!(weights.rag_weight(), 0.3);
        assert!((weights.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            WeightSet::new(0.5, 0.5, 0.5),
            Err(WeightError::BadSum(_))
        ));
        assert!(matches!(
            WeightSet::new(1.2, -0.2, 0.0),
            Err(WeightError::Negative { name: "sift_weight", .. })
        ));
        assert!(matches!(
            WeightSet::new(f64::NAN, 0.5, 0.5),
            Err(WeightError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_normalized_sums_to_one() {
        for (a, b, c) in [(1.0, 2.0, 3.0), (0.1, 0.0, 0.0), (7.3, 0.0001, 19.0), (1e-9, 1e-9, 1e-9)] {
            let weights = WeightSet::normalized(a, b, c).unwrap();
            assert!((weights.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
            assert!(weights.rag_weight() >= 0.0);
        }
        assert_eq!(WeightSet::normalized(0.0, 0.0, 0.0), Err(WeightError::ZeroTotal));
    }

    #[test]
    fn test_missing_importance_defaults_to_one() {
        let mut importances = HashMap::new();
        importances.insert(Feature::CraapMean, 0.6);
        importances.insert(Feature::SiftScore, 0.4);

        let weights = WeightSet::from_importances(&importances).unwrap();
        assert!((weights.craap_weight() - 0.3).abs() < 1e-9);
        assert!((weights.sift_weight() - 0.2).abs() < 1e-9);
        assert!((weights.rag_weight() - 0.5).abs() < 1e-9);

        let equal = WeightSet::from_importances(&HashMap::new()).unwrap();
        assert!((equal.craap_weight() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_importance_keeps_zero_weight() {
        let importances = HashMap::from([
            (Feature::CraapMean, 0.0),
            (Feature::SiftScore, 0.0),
            (Feature::RagScore, 1.0),
        ]);
        let weights = WeightSet::from_importances(&importances).unwrap();
        assert_eq!(weights.craap_weight(), 0.0);
        assert_eq!(weights.sift_weight(), 0.0);
        assert!((weights.rag_weight() - 1.0).abs() < 1e-9);

        let all_zero = HashMap::from(Feature::ALL.map(|f| (f, 0.0)));
        let equal = WeightSet::from_importances(&all_zero).unwrap();
        assert!((equal.sift_weight() - 1.0 / 3.0).abs() < 1e-9);
        assert!((equal.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: WeightSet =
            serde_json::from_str(r#"{"craap_weight":0.5,"sift_weight":0.25,"rag_weight":0.25}"#)
                .unwrap();
        assert_eq!(ok.craap_weight(), 0.5);

        let bad = serde_json::from_str::<WeightSet>(
            r#"{"craap_weight":0.9,"sift_weight":0.9,"rag_weight":0.9}"#,
        );
        assert!(bad.is_err());
    }
}
