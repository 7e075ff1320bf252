//! Article extraction from a URL
//!
//! Fetches a page and recovers body text, title, publication date and
//! author. Any failure here is fatal to the assessment that asked for it.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use credence_core::{normalize_domain, ArticleContent, ArticleMetadata};

use crate::{create_client, HttpConfig, NetError};

/// Maximum characters of body text kept per article
const MAX_CONTENT_LENGTH: usize = 20_000;

/// Meta tags consulted for the publication date, in priority order
const DATE_SELECTORS: &[&str] = &[
    r#"meta[property="article:published_time"]"#,
    r#"meta[itemprop="datePublished"]"#,
    r#"meta[name="pubdate"]"#,
    r#"meta[name="date"]"#,
    r#"meta[name="dc.date"]"#,
];

/// Errors that abort an assessment before any signal runs
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No article text found at {0}")]
    EmptyContent(String),
}

/// Fetches and parses articles over HTTP
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: Client,
}

impl HttpExtractor {
    pub fn new(config: &HttpConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    /// Fetch `url` and extract its article
    pub async fn extract(&self, url: &str) -> Result<ArticleContent, ExtractionError> {
        let parsed = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(format!("{}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ExtractionError::InvalidUrl(format!("{}: missing host", url)))?
            .to_string();

        debug!("Extracting: {}", url);

        let fetch_error = |reason: String| ExtractionError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            warn!("Extraction of {} returned status: {}", url, response.status());
            return Err(fetch_error(format!("status {}", response.status())));
        }

        let html = response.text().await.map_err(|e| fetch_error(e.to_string()))?;
        let article = parse_article(&html, url, &host);

        if article.text.is_empty() {
            return Err(ExtractionError::EmptyContent(url.to_string()));
        }

        debug!("Extracted {} chars from {}", article.text.len(), url);
        Ok(article)
    }
}

/// Build article content from a fetched HTML document
pub fn parse_article(html: &str, url: &str, host: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title");
    let mut text = body_text(&document);
    if let Some((idx, _)) = text.char_indices().nth(MAX_CONTENT_LENGTH) {
        text.truncate(idx);
    }

    let mut metadata = ArticleMetadata::new(&normalize_domain(host));
    if let Some(date) = publication_date(&document) {
        metadata = metadata.with_publication_date(date);
    }
    if let Some(author) = meta_content(&document, r#"meta[name="author"]"#) {
        metadata = metadata.with_author(&author);
    }

    ArticleContent::new(Some(url.to_string()), title, text, metadata)
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

fn publication_date(document: &Html) -> Option<DateTime<Utc>> {
    let from_meta = DATE_SELECTORS
        .iter()
        .filter_map(|css| meta_content(document, css))
        .find_map(|raw| parse_date(&raw));

    from_meta.or_else(|| {
        let selector = Selector::parse("time[datetime]").ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("datetime"))
            .find_map(parse_date)
    })
}

/// Parse RFC 3339, RFC 2822 or a bare `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Body text with script/style/noscript subtrees skipped
fn body_text(document: &Html) -> String {
    use scraper::node::Node;

    let body = match Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
    {
        Some(body) => body,
        None => return String::new(),
    };

    let mut text_parts = Vec::new();
    for node_ref in body.descendants() {
        if let Node::Text(text_node) = node_ref.value() {
            let in_excluded = node_ref.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
                    .unwrap_or(false)
            });

            if !in_excluded {
                let trimmed = text_node.trim();
                if !trimmed.is_empty() {
                    text_parts.push(trimmed);
                }
            }
        }
    }

    normalize_whitespace(&text_parts.join(" "))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const PAGE: &str = r#"
        <html>
        <head>
            <title>Budget Report</title>
            <meta property="article:published_time" content="2024-03-05T12:00:00Z">
            <meta name="author" content="Jane Roe">
        </head>
        <body>
            <script>var tracking = 1;</script>
            <h1>Budget passes</h1>
            <p>The   council approved   the plan.</p>
            <style>.x { color: red; }</style>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_article() {
        let article = parse_article(PAGE, "https://www.example.gov/news/1", "www.example.gov");

        assert_eq!(article.title.as_deref(), Some("Budget Report"));
        assert_eq!(article.text, "Budget passes The council approved the plan.");
        assert_eq!(article.metadata.source_domain, "example.gov");
        assert_eq!(article.metadata.author.as_deref(), Some("Jane Roe"));

        let date = article.metadata.publication_date.unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 5));
    }

    #[test]
    fn test_missing_metadata() {
        let article = parse_article("<html><body><p>hi</p></body></html>", "https://x.com", "x.com");
        assert!(article.metadata.publication_date.is_none());
        assert!(article.metadata.author.is_none());
        assert!(article.title.is_none());
    }

    #[test]
    fn test_time_element_fallback() {
        let html = r#"<html><body><time datetime="2023-11-02">Nov 2</time><p>x</p></body></html>"#;
        let article = parse_article(html, "https://x.com", "x.com");
        assert_eq!(article.metadata.publication_date.unwrap().month(), 11);
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-01-02T03:04:05+02:00").is_some());
        assert!(parse_date("Tue, 1 Jul 2003 10:52:37 +0200").is_some());
        assert!(parse_date("2024-01-02").is_some());
        assert!(parse_date("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let extractor = HttpExtractor::new(&HttpConfig::default()).unwrap();
        let err = extractor.extract("not a url").await.unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidUrl(_)));
    }
}
