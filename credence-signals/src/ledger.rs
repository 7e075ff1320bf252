//! Ledger attestation provider

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use credence_core::{ArticleContent, SignalKind, DEFAULT_TIMEOUT_SECS};

use crate::{with_timeout, LedgerVerifier, SignalError, SignalProvider};

/// Advisory ledger signal. Never feeds the score.
pub struct LedgerProvider {
    verifier: Option<Arc<dyn LedgerVerifier>>,
    call_timeout: Duration,
}

impl LedgerProvider {
    pub fn new(verifier: Option<Arc<dyn LedgerVerifier>>) -> Self {
        Self {
            verifier,
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

#[async_trait]
impl SignalProvider for LedgerProvider {
    type Output = bool;

    fn kind(&self) -> SignalKind {
        SignalKind::Ledger
    }

    async fn evaluate(&self, article: &ArticleContent) -> Result<bool, SignalError> {
        let Some(verifier) = &self.verifier else {
            return Err(SignalError::Disabled("ledger verification".to_string()));
        };
        let Some(url) = article.url.as_deref() else {
            return Err(SignalError::Disabled("ledger verification for raw text".to_string()));
        };

        let verified = with_timeout(self.call_timeout, verifier.verify_on_ledger(url)).await?;
        debug!("Ledger attestation for {}: {}", url, verified);
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credence_core::ArticleMetadata;

    struct Attested;

    #[async_trait]
    impl LedgerVerifier for Attested {
        async fn verify_on_ledger(&self, url: &str) -> Result<bool, SignalError> {
            Ok(url.contains("attested"))
        }
    }

    fn article(url: Option<&str>) -> ArticleContent {
        ArticleContent::new(
            url.map(str::to_string),
            None,
            "Body".to_string(),
            ArticleMetadata::new("example.com"),
        )
    }

    #[tokio::test]
    async fn test_verified_url() {
        let provider = LedgerProvider::new(Some(Arc::new(Attested)));
        assert!(provider
            .evaluate(&article(Some("https://example.com/attested")))
            .await
            .unwrap());
        assert!(!provider
            .evaluate(&article(Some("https://example.com/other")))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_disabled_without_verifier_or_url() {
        let disabled = LedgerProvider::disabled();
        assert!(matches!(
            disabled.evaluate(&article(Some("https://example.com"))).await,
            Err(SignalError::Disabled(_))
        ));

        let provider = LedgerProvider::new(Some(Arc::new(Attested)));
        assert!(matches!(
            provider.evaluate(&article(None)).await,
            Err(SignalError::Disabled(_))
        ));
    }
}
