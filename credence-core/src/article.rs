//! Extracted article content handed to every signal provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata recovered alongside the article body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    /// Host the article was served from, without a leading `www.`
    pub source_domain: String,
    /// Publication timestamp, if the page declared one
    pub publication_date: Option<DateTime<Utc>>,
    /// Author byline, if present
    pub author: Option<String>,
}

impl ArticleMetadata {
    pub fn new(source_domain: &str) -> Self {
        Self {
            source_domain: normalize_domain(source_domain),
            publication_date: None,
            author: None,
        }
    }

    pub fn with_publication_date(mut self, date: DateTime<Utc>) -> Self {
        self.publication_date = Some(date);
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }
}

/// Article text plus metadata. Owned by exactly one assessment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    /// Source URL, when the article was fetched rather than supplied directly
    pub url: Option<String>,
    /// Page title, if any
    pub title: Option<String>,
    /// Plain body text
    pub text: String,
    pub metadata: ArticleMetadata,
}

impl ArticleContent {
    pub fn new(url: Option<String>, title: Option<String>, text: String, metadata: ArticleMetadata) -> Self {
        Self {
            url,
            title,
            text,
            metadata,
        }
    }

    /// Build content from raw text without a fetch step
    pub fn from_text(text: &str, metadata: ArticleMetadata) -> Self {
        Self::new(None, None, text.to_string(), metadata)
    }

    /// First `max_chars` characters of the body (char-boundary safe)
    pub fn prefix(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }

    /// Query used against fact-check sources: the first sentence,
    /// cut to at most 100 characters on a word boundary
    pub fn claim_query(&self) -> String {
        const MAX_QUERY_CHARS: usize = 100;

        let trimmed = self.text.trim();
        let sentence = trimmed
            .find(['.', '!', '?'])
            .map(|end| &trimmed[..end])
            .unwrap_or(trimmed);

        if sentence.chars().count() <= MAX_QUERY_CHARS {
            return sentence.trim().to_string();
        }

        let mut query = String::new();
        for word in sentence.split_whitespace() {
            let extra = if query.is_empty() { 0 } else { 1 };
            if query.chars().count() + extra + word.chars().count() > MAX_QUERY_CHARS {
                break;
            }
            if !query.is_empty() {
                query.push(' ');
            }
            query.push_str(word);
        }

        if query.is_empty() {
            sentence.chars().take(MAX_QUERY_CHARS).collect()
        } else {
            query
        }
    }
}

/// Lowercase a host and strip a leading `www.`
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().trim_end_matches('.').to_lowercase();
    lowered
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("WWW.NASA.gov"), "nasa.gov");
        assert_eq!(normalize_domain("example.com."), "example.com");
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        let article = ArticleContent::from_text("héllo wörld", ArticleMetadata::new("x.org"));
        assert_eq!(article.prefix(4), "héll");
        assert_eq!(article.prefix(100), "héllo wörld");
    }

    #[test]
    fn test_claim_query_first_sentence() {
        let article = ArticleContent::from_text(
            "Vaccines cause no increase in autism rates. Further study continues.",
            ArticleMetadata::new("cdc.gov"),
        );
        assert_eq!(article.claim_query(), "Vaccines cause no increase in autism rates");
    }

    #[test]
    fn test_claim_query_truncates_on_word_boundary() {
        let long = "word ".repeat(40);
        let article = ArticleContent::from_text(&long, ArticleMetadata::new("x.com"));
        let query = article.claim_query();
        assert!(query.chars().count() <= 100);
        assert!(query.ends_with("word"));
    }
}
