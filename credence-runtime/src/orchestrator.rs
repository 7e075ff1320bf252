//! Concurrent Orchestrator
//!
//! Runs every signal provider for one article on its own task, each under
//! a timeout, and joins them all before anything is aggregated. A provider
//! that errors, panics or times out is recorded against its own signal
//! only; the others still complete.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use credence_core::{
    ArticleContent, CorroborationReport, CraapScores, SentimentReport, SignalBundle, SignalKind,
    SignalOutcome, DEFAULT_TIMEOUT_SECS,
};
use credence_signals::{SignalError, SignalProvider};

pub type CraapSignal = Arc<dyn SignalProvider<Output = CraapScores>>;
pub type CorroborationSignal = Arc<dyn SignalProvider<Output = CorroborationReport>>;
pub type SentimentSignal = Arc<dyn SignalProvider<Output = SentimentReport>>;
pub type LedgerSignal = Arc<dyn SignalProvider<Output = bool>>;

/// One finished sub-task
enum Finished {
    Craap(SignalOutcome<CraapScores>),
    Corroboration(SignalOutcome<CorroborationReport>),
    Sentiment(SignalOutcome<SentimentReport>),
    Ledger(SignalOutcome<bool>),
}

/// Evaluate one provider under `limit`
async fn run_provider<T: Send + 'static>(
    provider: Arc<dyn SignalProvider<Output = T>>,
    article: Arc<ArticleContent>,
    limit: Duration,
) -> SignalOutcome<T> {
    let kind = provider.kind();
    match tokio::time::timeout(limit, provider.evaluate(&article)).await {
        Ok(Ok(value)) => {
            debug!("Signal {} completed", kind.as_str());
            SignalOutcome::completed(value)
        }
        Ok(Err(SignalError::Disabled(what))) => {
            debug!("Signal {} skipped: {} is disabled", kind.as_str(), what);
            SignalOutcome::failed(format!("{} is disabled", what))
        }
        Ok(Err(e)) => {
            warn!("Signal {} failed: {}", kind.as_str(), e);
            SignalOutcome::failed(e.to_string())
        }
        Err(_) => {
            warn!("Signal {} timed out after {:?}", kind.as_str(), limit);
            SignalOutcome::TimedOut {
                after_secs: limit.as_secs(),
            }
        }
    }
}

/// Fans one article out to all signal providers
#[derive(Clone)]
pub struct Orchestrator {
    craap: CraapSignal,
    corroboration: CorroborationSignal,
    sentiment: SentimentSignal,
    ledger: LedgerSignal,
    task_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        craap: CraapSignal,
        corroboration: CorroborationSignal,
        sentiment: SentimentSignal,
        ledger: LedgerSignal,
    ) -> Self {
        Self {
            craap,
            corroboration,
            sentiment,
            ledger,
            task_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Per sub-task limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Run all providers concurrently and wait for every one to finish
    /// or time out
    pub async fn orchestrate(&self, article: Arc<ArticleContent>) -> SignalBundle {
        let limit = self.task_timeout;
        let mut tasks = JoinSet::new();

        let provider = self.craap.clone();
        let input = article.clone();
        tasks.spawn(async move { Finished::Craap(run_provider(provider, input, limit).await) });

        let provider = self.corroboration.clone();
        let input = article.clone();
        tasks.spawn(async move {
            Finished::Corroboration(run_provider(provider, input, limit).await)
        });

        let provider = self.sentiment.clone();
        let input = article.clone();
        tasks.spawn(async move { Finished::Sentiment(run_provider(provider, input, limit).await) });

        let provider = self.ledger.clone();
        let input = article;
        tasks.spawn(async move { Finished::Ledger(run_provider(provider, input, limit).await) });

        // Slots not filled by a finished task stay failed
        let lost = |kind: SignalKind| format!("{} task aborted", kind.as_str());
        let mut bundle = SignalBundle {
            craap: SignalOutcome::failed(lost(SignalKind::Craap)),
            corroboration: SignalOutcome::failed(lost(SignalKind::Corroboration)),
            sentiment: SignalOutcome::failed(lost(SignalKind::Sentiment)),
            ledger: SignalOutcome::failed(lost(SignalKind::Ledger)),
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Finished::Craap(outcome)) => bundle.craap = outcome,
                Ok(Finished::Corroboration(outcome)) => bundle.corroboration = outcome,
                Ok(Finished::Sentiment(outcome)) => bundle.sentiment = outcome,
                Ok(Finished::Ledger(outcome)) => bundle.ledger = outcome,
                Err(e) => error!("Signal task aborted: {}", e),
            }
        }

        bundle
    }
}
