//! Sentiment/bias provider
//!
//! Combines a sentiment classifier (label + confidence) with a local
//! lexicon analyzer for polarity and subjectivity. Either half may fail;
//! the provider then reports neutral values for that half.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

use credence_core::{ArticleContent, SentimentReport, SignalKind, DEFAULT_TIMEOUT_SECS};

use crate::embedder::tokenize;
use crate::openai::CLASSIFIER_MAX_CHARS;
use crate::{
    with_timeout, SentimentClassifier, SignalError, SignalProvider, Subjectivity,
    SubjectivityAnalyzer,
};

/// Word -> (polarity, subjectivity)
static LEXICON: LazyLock<HashMap<&'static str, (f64, f64)>> = LazyLock::new(|| {
    [
        ("good", (0.7, 0.6)),
        ("great", (0.8, 0.75)),
        ("excellent", (1.0, 1.0)),
        ("best", (1.0, 0.3)),
        ("positive", (0.23, 0.54)),
        ("success", (0.3, 0.4)),
        ("successful", (0.75, 0.95)),
        ("benefit", (0.3, 0.3)),
        ("improve", (0.3, 0.4)),
        ("safe", (0.5, 0.5)),
        ("happy", (0.8, 1.0)),
        ("love", (0.5, 0.6)),
        ("wonderful", (1.0, 1.0)),
        ("amazing", (0.6, 0.9)),
        ("reliable", (0.4, 0.5)),
        ("accurate", (0.4, 0.55)),
        ("true", (0.35, 0.65)),
        ("bad", (-0.7, 0.67)),
        ("terrible", (-1.0, 1.0)),
        ("awful", (-1.0, 1.0)),
        ("worst", (-1.0, 1.0)),
        ("horrible", (-1.0, 1.0)),
        ("negative", (-0.3, 0.4)),
        ("fail", (-0.5, 0.3)),
        ("failure", (-0.32, 0.3)),
        ("dangerous", (-0.6, 0.9)),
        ("corrupt", (-0.5, 0.5)),
        ("outrageous", (-0.8, 0.9)),
        ("shocking", (-1.0, 1.0)),
        ("scandal", (-0.5, 0.7)),
        ("hate", (-0.8, 0.9)),
        ("evil", (-1.0, 1.0)),
        ("fake", (-0.5, 1.0)),
        ("false", (-0.4, 0.6)),
        ("lie", (-0.5, 0.7)),
        ("lies", (-0.5, 0.7)),
        ("crisis", (-0.4, 0.5)),
        ("disaster", (-0.7, 0.8)),
        ("unbelievable", (-0.5, 0.9)),
        ("incredible", (0.9, 0.9)),
        ("stupid", (-0.8, 1.0)),
        ("ridiculous", (-0.33, 1.0)),
        ("absolutely", (0.2, 0.9)),
        ("obviously", (0.0, 0.5)),
        ("clearly", (0.1, 0.38)),
        ("believe", (0.0, 0.5)),
        ("feel", (0.0, 0.5)),
        ("opinion", (0.0, 0.6)),
    ]
    .into_iter()
    .collect()
});

const NEGATIONS: &[&str] = &["not", "no", "never", "n't", "isn't", "wasn't", "don't", "doesn't", "didn't", "cannot"];

/// Negation scales the next sentiment word's polarity by this factor
const NEGATION_FACTOR: f64 = -0.5;

/// Tokens a negation reaches forward
const NEGATION_WINDOW: usize = 3;

/// Lexicon-averaging polarity/subjectivity analyzer
#[derive(Debug, Clone, Default)]
pub struct LexiconAnalyzer;

impl LexiconAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, text: &str) -> Subjectivity {
        let tokens = tokenize(text);
        let mut polarity_sum = 0.0;
        let mut subjectivity_sum = 0.0;
        let mut matched = 0usize;
        let mut negation_left = 0usize;

        for token in &tokens {
            if NEGATIONS.contains(&token.as_str()) {
                negation_left = NEGATION_WINDOW;
                continue;
            }

            if let Some((polarity, subjectivity)) = LEXICON.get(token.as_str()) {
                let polarity = if negation_left > 0 {
                    negation_left = 0;
                    polarity * NEGATION_FACTOR
                } else {
                    *polarity
                };
                polarity_sum += polarity;
                subjectivity_sum += subjectivity;
                matched += 1;
            } else {
                negation_left = negation_left.saturating_sub(1);
            }
        }

        if matched == 0 {
            return Subjectivity::default();
        }

        Subjectivity {
            polarity: (polarity_sum / matched as f64).clamp(-1.0, 1.0),
            subjectivity: (subjectivity_sum / matched as f64).clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl SubjectivityAnalyzer for LexiconAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Subjectivity, SignalError> {
        Ok(self.score(text))
    }
}

/// Sentiment signal provider
pub struct SentimentEvaluator {
    classifier: Option<Arc<dyn SentimentClassifier>>,
    analyzer: Arc<dyn SubjectivityAnalyzer>,
    call_timeout: Duration,
}

impl SentimentEvaluator {
    pub fn new(analyzer: Arc<dyn SubjectivityAnalyzer>) -> Self {
        Self {
            classifier: None,
            analyzer,
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SentimentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

#[async_trait]
impl SignalProvider for SentimentEvaluator {
    type Output = SentimentReport;

    fn kind(&self) -> SignalKind {
        SignalKind::Sentiment
    }

    async fn evaluate(&self, article: &ArticleContent) -> Result<SentimentReport, SignalError> {
        let classify = async {
            match &self.classifier {
                Some(classifier) => {
                    with_timeout(
                        self.call_timeout,
                        classifier.classify(article.prefix(CLASSIFIER_MAX_CHARS)),
                    )
                    .await
                }
                None => Err(SignalError::Disabled("sentiment classifier".to_string())),
            }
        };
        let analyze = with_timeout(self.call_timeout, self.analyzer.analyze(&article.text));

        let (label, subjectivity) = tokio::join!(classify, analyze);

        let label = match label {
            Ok(label) => Some(label),
            Err(SignalError::Disabled(_)) => None,
            Err(e) => {
                warn!("Sentiment classification unavailable: {}", e);
                None
            }
        };
        let subjectivity = subjectivity.unwrap_or_else(|e| {
            warn!("Subjectivity analysis unavailable: {}", e);
            Subjectivity::default()
        });

        debug!(
            "Sentiment: label={:?} polarity={:.2} subjectivity={:.2}",
            label.as_ref().map(|l| &l.label),
            subjectivity.polarity,
            subjectivity.subjectivity
        );

        Ok(SentimentReport {
            label_score: label.as_ref().map(|l| l.score),
            label: label.map(|l| l.label),
            polarity: subjectivity.polarity,
            subjectivity: subjectivity.subjectivity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SentimentLabel;
    use credence_core::ArticleMetadata;

    struct FixedClassifier;

    #[async_trait]
    impl SentimentClassifier for FixedClassifier {
        async fn classify(&self, text: &str) -> Result<SentimentLabel, SignalError> {
            assert!(text.chars().count() <= CLASSIFIER_MAX_CHARS);
            Ok(SentimentLabel {
                label: "NEGATIVE".to_string(),
                score: 0.88,
            })
        }
    }

    struct BrokenAnalyzer;

    #[async_trait]
    impl SubjectivityAnalyzer for BrokenAnalyzer {
        async fn analyze(&self, _text: &str) -> Result<Subjectivity, SignalError> {
            Err(SignalError::Provider("no corpus".to_string()))
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl SentimentClassifier for BrokenClassifier {
        async fn classify(&self, _text: &str) -> Result<SentimentLabel, SignalError> {
            Err(SignalError::Classification("rate limited".to_string()))
        }
    }

    #[test]
    fn test_lexicon_polarity() {
        let analyzer = LexiconAnalyzer::new();
        let positive = analyzer.score("An excellent and successful program.");
        assert!(positive.polarity > 0.5);
        assert!(positive.subjectivity > 0.5);

        let negative = analyzer.score("A terrible, shocking disaster.");
        assert!(negative.polarity < -0.5);
    }

    #[test]
    fn test_lexicon_negation() {
        let analyzer = LexiconAnalyzer::new();
        let negated = analyzer.score("This is not good");
        assert!((negated.polarity - (-0.35)).abs() < 1e-9);
    }

    #[test]
    fn test_lexicon_neutral_text() {
        let score = LexiconAnalyzer::new().score("The meeting is on Tuesday at noon.");
        assert_eq!(score, Subjectivity::default());
    }

    #[tokio::test]
    async fn test_evaluator_combines_halves() {
        let evaluator = SentimentEvaluator::new(Arc::new(LexiconAnalyzer::new()))
            .with_classifier(Arc::new(FixedClassifier));
        let long_text = format!("{} terrible outcome", "filler ".repeat(200));
        let article = ArticleContent::from_text(&long_text, ArticleMetadata::new("x.com"));

        let report = evaluator.evaluate(&article).await.unwrap();
        assert_eq!(report.label.as_deref(), Some("NEGATIVE"));
        assert_eq!(report.label_score, Some(0.88));
        assert_eq!(report.polarity, -1.0);
    }

    #[tokio::test]
    async fn test_failures_default_to_neutral() {
        let evaluator = SentimentEvaluator::new(Arc::new(BrokenAnalyzer))
            .with_classifier(Arc::new(BrokenClassifier));
        let article = ArticleContent::from_text("Terrible news.", ArticleMetadata::new("x.com"));

        let report = evaluator.evaluate(&article).await.unwrap();
        assert_eq!(report, SentimentReport::neutral());
    }
}
