//! Advisory ledger attestation lookup
//!
//! Content URLs are attested on a ledger by their SHA-256 digest. The
//! registry gateway answers whether a digest has an attestation. The
//! answer is attached to assessments and never affects the score.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{create_client, HttpConfig, NetError};

/// Client for the attestation registry gateway
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    endpoint: String,
}

impl LedgerClient {
    pub fn new(config: &HttpConfig, endpoint: &str) -> Result<Self, NetError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(NetError::InvalidUrl(endpoint.to_string()));
        }
        Ok(Self {
            client: create_client(config)?,
            endpoint: endpoint.to_string(),
        })
    }

    /// Whether `url` carries a ledger attestation
    pub async fn verify_on_ledger(&self, url: &str) -> Result<bool, NetError> {
        let digest = url_digest(url);
        let request_url = format!("{}/attestations/{}", self.endpoint, digest);

        let response = self.client.get(&request_url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No attestation for {}", digest);
            return Ok(false);
        }
        let response = crate::client::ensure_success(response, "ledger")?;

        let body: AttestationResponse = response.json().await.map_err(|e| NetError::Parse {
            service: "ledger".to_string(),
            reason: e.to_string(),
        })?;
        Ok(body.verified)
    }
}

/// Hex SHA-256 of a trimmed URL
pub fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct AttestationResponse {
    #[serde(default)]
    verified: bool,
}
