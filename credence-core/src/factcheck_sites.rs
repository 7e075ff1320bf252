//! Secondary fact-check site registry
//!
//! Describes the unstructured fact-check sites that are scraped for
//! corroborating articles, with their search URL templates and the CSS
//! selector that picks result links out of the search page.

use serde::{Deserialize, Serialize};

/// Maximum hits kept per secondary site
pub const SECONDARY_TOP_N: usize = 3;

/// A scrapeable fact-check site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckSite {
    /// Human-readable name
    pub name: &'static str,
    /// Origin used to resolve relative result links
    pub base_url: &'static str,
    /// Search URL template with {query} placeholder
    pub url_template: &'static str,
    /// CSS selector matching result anchors
    pub result_selector: &'static str,
}

impl FactCheckSite {
    /// Build search URL for a query
    pub fn build_url(&self, query: &str) -> String {
        self.url_template.replace("{query}", &urlencoding::encode(query))
    }

    /// Resolve a possibly relative result link against the site origin
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{}", rest)
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                href.trim_start_matches('/')
            )
        }
    }
}

pub static SNOPES: FactCheckSite = FactCheckSite {
    name: "Snopes",
    base_url: "https://www.snopes.com",
    url_template: "https://www.snopes.com/search/?q={query}",
    result_selector: "a.outer_article_link_wrapper, .article_wrapper a",
};

pub static POLITIFACT: FactCheckSite = FactCheckSite {
    name: "PolitiFact",
    base_url: "https://www.politifact.com",
    url_template: "https://www.politifact.com/search/?q={query}",
    result_selector: ".c-textgroup__title a, .o-listease__item a",
};

/// The two secondary sources, in query order
pub fn secondary_sites() -> [&'static FactCheckSite; 2] {
    [&SNOPES, &POLITIFACT]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let url = SNOPES.build_url("moon landing faked");
        assert_eq!(url, "https://www.snopes.com/search/?q=moon%20landing%20faked");
    }

    #[test]
    fn test_build_url_encodes_utf8() {
        let url = POLITIFACT.build_url("café & co");
        assert!(url.ends_with("caf%C3%A9%20%26%20co"));
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            POLITIFACT.absolute_url("/factchecks/2024/x/"),
            "https://www.politifact.com/factchecks/2024/x/"
        );
        assert_eq!(
            SNOPES.absolute_url("https://www.snopes.com/fact-check/y/"),
            "https://www.snopes.com/fact-check/y/"
        );
        assert_eq!(SNOPES.absolute_url("//cdn.snopes.com/z"), "https://cdn.snopes.com/z");
    }
}
