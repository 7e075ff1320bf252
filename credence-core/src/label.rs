//! Reliability labels over final scores

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete reliability categories, ordered least to most reliable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CredibilityLabel {
    #[serde(rename = "Disinformation")]
    Disinformation,
    #[serde(rename = "Misinformation")]
    Misinformation,
    #[serde(rename = "Unreliable")]
    Unreliable,
    #[serde(rename = "Questionable")]
    Questionable,
    #[serde(rename = "Somewhat Reliable")]
    SomewhatReliable,
    #[serde(rename = "Reliable")]
    Reliable,
    #[serde(rename = "Highly Reliable")]
    HighlyReliable,
}

/// Lower bounds of each bin, highest first
const BINS: &[(f64, CredibilityLabel)] = &[
    (90.0, CredibilityLabel::HighlyReliable),
    (80.0, CredibilityLabel::Reliable),
    (60.0, CredibilityLabel::SomewhatReliable),
    (30.0, CredibilityLabel::Questionable),
    (0.0, CredibilityLabel::Unreliable),
    (-50.0, CredibilityLabel::Misinformation),
];

impl CredibilityLabel {
    /// Map a value on the [-100,100] bin scale. Total: anything below
    /// every bin (including NaN) is Disinformation.
    pub fn from_bin_value(value: f64) -> Self {
        BINS.iter()
            .find(|(lower, _)| value >= *lower)
            .map(|(_, label)| *label)
            .unwrap_or(CredibilityLabel::Disinformation)
    }

    /// 0 (Disinformation) through 6 (Highly Reliable)
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredibilityLabel::HighlyReliable => "Highly Reliable",
            CredibilityLabel::Reliable => "Reliable",
            CredibilityLabel::SomewhatReliable => "Somewhat Reliable",
            CredibilityLabel::Questionable => "Questionable",
            CredibilityLabel::Unreliable => "Unreliable",
            CredibilityLabel::Misinformation => "Misinformation",
            CredibilityLabel::Disinformation => "Disinformation",
        }
    }
}

impl fmt::Display for CredibilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a final score is placed on the label bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Bins apply to the final score as-is
    #[default]
    Raw,
    /// Bins apply to the final score times 100
    Percent,
}

impl ScoreScale {
    pub fn to_bin_value(&self, final_score: f64) -> f64 {
        match self {
            ScoreScale::Raw => final_score,
            ScoreScale::Percent => final_score * 100.0,
        }
    }
}

impl FromStr for ScoreScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(ScoreScale::Raw),
            "percent" => Ok(ScoreScale::Percent),
            other => Err(format!("unknown score scale: {}", other)),
        }
    }
}

/// Label a final score on the given scale
pub fn label_for(final_score: f64, scale: ScoreScale) -> CredibilityLabel {
    CredibilityLabel::from_bin_value(scale.to_bin_value(final_score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_edges() {
        use CredibilityLabel::*;
        let cases = [
            (100.0, HighlyReliable),
            (90.0, HighlyReliable),
            (89.99, Reliable),
            (80.0, Reliable),
            (60.0, SomewhatReliable),
            (30.0, Questionable),
            (29.9, Unreliable),
            (0.0, Unreliable),
            (-0.01, Misinformation),
            (-50.0, Misinformation),
            (-50.01, Disinformation),
            (f64::NEG_INFINITY, Disinformation),
            (f64::NAN, Disinformation),
        ];
        for (value, expected) in cases {
            assert_eq!(CredibilityLabel::from_bin_value(value), expected, "value {}", value);
        }
    }

    #[test]
    fn test_monotonic() {
        let mut previous = CredibilityLabel::from_bin_value(-200.0);
        let mut value = -200.0;
        while value <= 200.0 {
            let label = CredibilityLabel::from_bin_value(value);
            assert!(label.rank() >= previous.rank());
            previous = label;
            value += 0.25;
        }
    }

    #[test]
    fn test_scales() {
        assert_eq!(label_for(0.72, ScoreScale::Raw), CredibilityLabel::Unreliable);
        assert_eq!(label_for(0.72, ScoreScale::Percent), CredibilityLabel::SomewhatReliable);
        assert_eq!("Percent".parse::<ScoreScale>(), Ok(ScoreScale::Percent));
        assert!("logit".parse::<ScoreScale>().is_err());
    }

    #[test]
    fn test_label_serializes_display_name() {
        let json = serde_json::to_string(&CredibilityLabel::SomewhatReliable).unwrap();
        assert_eq!(json, "\"Somewhat Reliable\"");
        assert_eq!(CredibilityLabel::HighlyReliable.rank(), 6);
    }
}
