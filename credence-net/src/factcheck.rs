//! Fact-check source clients
//!
//! - Primary: Google Fact Check Tools `claims:search` (structured JSON)
//! - Secondary: search-page scrapers for the sites in the registry

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

use credence_core::{FactCheckClaim, FactCheckHit, FactCheckSite, SECONDARY_TOP_N};

use crate::client::ensure_success;
use crate::{create_client, HttpConfig, NetError};

/// Default Fact Check Tools endpoint
pub const FACTCHECK_API_URL: &str = "https://factchecktools.googleapis.com/v1alpha1/claims:search";

/// Claims requested per query from the primary source
const PRIMARY_PAGE_SIZE: usize = 10;

/// Client for the primary structured fact-check API
#[derive(Debug, Clone)]
pub struct FactCheckApiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl FactCheckApiClient {
    pub fn new(config: &HttpConfig, api_key: &str) -> Result<Self, NetError> {
        if api_key.trim().is_empty() {
            return Err(NetError::Disabled("fact-check API key".to_string()));
        }
        Ok(Self {
            client: create_client(config)?,
            api_key: api_key.trim().to_string(),
            endpoint: FACTCHECK_API_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Search published fact-checks matching `query`
    pub async fn search_fact_checks(&self, query: &str) -> Result<Vec<FactCheckClaim>, NetError> {
        let url = format!(
            "{}?query={}&pageSize={}&key={}",
            self.endpoint,
            urlencoding::encode(query),
            PRIMARY_PAGE_SIZE,
            urlencoding::encode(&self.api_key)
        );

        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response, "fact-check API")?;

        let body: ClaimSearchResponse = response.json().await.map_err(|e| NetError::Parse {
            service: "fact-check API".to_string(),
            reason: e.to_string(),
        })?;

        let claims = body.into_claims();
        debug!("Fact-check API returned {} claims", claims.len());
        Ok(claims)
    }
}

/// Scraper for one secondary fact-check site
#[derive(Debug, Clone)]
pub struct SiteScraper {
    client: Client,
    site: &'static FactCheckSite,
}

impl SiteScraper {
    pub fn new(config: &HttpConfig, site: &'static FactCheckSite) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(config)?,
            site,
        })
    }

    pub fn site(&self) -> &'static FactCheckSite {
        self.site
    }

    /// Top search hits for `query` on this site
    pub async fn scrape(&self, query: &str) -> Result<Vec<FactCheckHit>, NetError> {
        let url = self.site.build_url(query);
        debug!("Searching {} with query: {}", self.site.name, query);

        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response, self.site.name)?;
        let html = response.text().await?;

        let hits = parse_site_results(&html, self.site);
        debug!("{} returned {} hits", self.site.name, hits.len());
        Ok(hits)
    }
}

/// Pull the first distinct result links out of a search page
pub fn parse_site_results(html: &str, site: &FactCheckSite) -> Vec<FactCheckHit> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(site.result_selector) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) if !h.trim().is_empty() && !h.starts_with('#') => h.trim(),
            _ => continue,
        };

        let title = element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        // Skip icon-only and very short anchors
        if title.len() < 3 {
            continue;
        }

        let url = site.absolute_url(href);
        if !seen.insert(url.trim_end_matches('/').to_lowercase()) {
            continue;
        }

        hits.push(FactCheckHit {
            title,
            url,
            site: site.name.to_string(),
        });

        if hits.len() == SECONDARY_TOP_N {
            break;
        }
    }

    hits
}

#[derive(Debug, Deserialize)]
struct ClaimSearchResponse {
    #[serde(default)]
    claims: Vec<ApiClaim>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiClaim {
    #[serde(default)]
    text: String,
    #[serde(default)]
    claim_review: Vec<ApiClaimReview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiClaimReview {
    #[serde(default)]
    textual_rating: Option<String>,
}

impl ClaimSearchResponse {
    fn into_claims(self) -> Vec<FactCheckClaim> {
        self.claims
            .into_iter()
            .map(|claim| FactCheckClaim {
                rating: claim
                    .claim_review
                    .into_iter()
                    .find_map(|review| review.textual_rating)
                    .unwrap_or_else(|| "Unrated".to_string()),
                claim_text: claim.text,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credence_core::{POLITIFACT, SNOPES};

    #[test]
    fn test_parse_claim_response() {
        let json = r#"{
            "claims": [
                {"text": "The moon is made of cheese", "claimReview": [{"textualRating": "False"}]},
                {"text": "Water is wet", "claimReview": []}
            ],
            "nextPageToken": "abc"
        }"#;
        let body: ClaimSearchResponse = serde_json::from_str(json).unwrap();
        let claims = body.into_claims();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].rating, "False");
        assert_eq!(claims[1].rating, "Unrated");
    }

    #[test]
    fn test_parse_empty_claim_response() {
        let body: ClaimSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.into_claims().is_empty());
    }

    #[test]
    fn test_parse_site_results_top_three() {
        let html = r##"
            <html><body>
                <div class="c-textgroup__title"><a href="/factchecks/2024/a/">Claim A is false</a></div>
                <div class="c-textgroup__title"><a href="/factchecks/2024/a/">Claim A is false</a></div>
                <div class="c-textgroup__title"><a href="/factchecks/2024/b/">Claim B is half true</a></div>
                <div class="c-textgroup__title"><a href="#">Anchor</a></div>
                <div class="c-textgroup__title"><a href="/factchecks/2024/c/">Claim C is true</a></div>
                <div class="c-textgroup__title"><a href="/factchecks/2024/d/">Claim D is mostly false</a></div>
            </body></html>
        "##;

        let hits = parse_site_results(html, &POLITIFACT);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url, "https://www.politifact.com/factchecks/2024/a/");
        assert_eq!(hits[1].title, "Claim B is half true");
        assert!(hits.iter().all(|h| h.site == "PolitiFact"));
    }

    #[test]
    fn test_parse_site_results_none() {
        let hits = parse_site_results("<html><body><p>No results</p></body></html>", &SNOPES);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_api_client_requires_key() {
        let err = FactCheckApiClient::new(&HttpConfig::default(), "  ").unwrap_err();
        assert!(matches!(err, NetError::Disabled(_)));
    }
}
