//! Page metadata scraping
//!
//! Pulls title, description, keywords, Open Graph image and favicon out of
//! raw HTML with regular expressions. Relative image and icon links are
//! resolved against the page URL.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const NO_TITLE: &str = "No title found";
pub const NO_DESCRIPTION: &str = "No description found";
pub const LOAD_ERROR_TITLE: &str = "Error loading website";

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("metadata pattern compiles")
}

static TITLE: Lazy<Regex> = Lazy::new(|| pattern(r#"(?i)<title[^>]*>([^<]+)</title>"#));
static DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']+)["']"#)
});
static KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"(?i)<meta[^>]*name=["']keywords["'][^>]*content=["']([^"']+)["']"#)
});
static OG_IMAGE: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"(?i)<meta[^>]*property=["']og:image["'][^>]*content=["']([^"']+)["']"#)
});
static FAVICON: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"(?i)<link[^>]*rel=["'](?:icon|shortcut icon)["'][^>]*href=["']([^"']+)["']"#)
});

/// What the page itself says about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub og_image: String,
    pub favicon: String,
}

/// Page metadata plus facts about the HTTP response that carried it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteMetadata {
    #[serde(flatten)]
    pub page: PageMetadata,
    /// HTTP status; 0 when nothing was received
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub last_modified: Option<String>,
    pub server: Option<String>,
    /// Milliseconds from request start to body received
    pub load_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebsiteMetadata {
    /// Placeholder returned when the page could not be fetched
    pub fn failed(error: String) -> Self {
        Self {
            page: PageMetadata {
                title: LOAD_ERROR_TITLE.to_string(),
                description: error.clone(),
                keywords: String::new(),
                og_image: String::new(),
                favicon: String::new(),
            },
            status: 0,
            content_type: None,
            content_length: None,
            last_modified: None,
            server: None,
            load_time: 0,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn first_capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve `href` against `base`; unresolvable links are returned as given
fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

pub fn extract_metadata(html: &str, base: &Url) -> PageMetadata {
    PageMetadata {
        title: first_capture(&TITLE, html).unwrap_or_else(|| NO_TITLE.to_string()),
        description: first_capture(&DESCRIPTION, html).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        keywords: first_capture(&KEYWORDS, html).unwrap_or_default(),
        og_image: first_capture(&OG_IMAGE, html)
            .map(|href| resolve(base, &href))
            .unwrap_or_default(),
        favicon: first_capture(&FAVICON, html)
            .map(|href| resolve(base, &href))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_extracts_all_fields() {
        let html = r#"
            <html><head>
              <TITLE> Example Domain </TITLE>
              <meta name="description" content="An example page">
              <meta name='keywords' content='a, b'>
              <meta property="og:image" content="/img/cover.png">
              <link rel="shortcut icon" href="favicon.ico">
            </head></html>
        "#;
        let meta = extract_metadata(html, &base());
        assert_eq!(meta.title, "Example Domain");
        assert_eq!(meta.description, "An example page");
        assert_eq!(meta.keywords, "a, b");
        assert_eq!(meta.og_image, "https://example.com/img/cover.png");
        assert_eq!(meta.favicon, "https://example.com/blog/favicon.ico");
    }

    #[test]
    fn test_defaults_when_missing() {
        let meta = extract_metadata("<html><body>hi</body></html>", &base());
        assert_eq!(meta.title, NO_TITLE);
        assert_eq!(meta.description, NO_DESCRIPTION);
        assert!(meta.keywords.is_empty());
        assert!(meta.og_image.is_empty());
        assert!(meta.favicon.is_empty());
    }

    #[test]
    fn test_absolute_links_kept() {
        let html = r#"<meta property="og:image" content="https://cdn.example.org/a.jpg">"#;
        assert_eq!(extract_metadata(html, &base()).og_image, "https://cdn.example.org/a.jpg");
    }

    #[test]
    fn test_failed_metadata_shape() {
        let failed = WebsiteMetadata::failed("HTTP 500".into());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["title"], LOAD_ERROR_TITLE);
        assert_eq!(json["description"], "HTTP 500");
        assert_eq!(json["status"], 0);
        assert_eq!(json["error"], "HTTP 500");
    }

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(html in ".{0,400}") {
            let meta = extract_metadata(&html, &base());
            prop_assert!(!meta.title.is_empty());
            prop_assert!(!meta.description.is_empty());
        }

        #[test]
        fn title_round_trips(title in "[A-Za-z0-9][A-Za-z0-9 ]{0,40}[A-Za-z0-9]") {
            let html = format!("<head><title>{}</title></head>", title);
            prop_assert_eq!(extract_metadata(&html, &base()).title, title);
        }
    }
}
