//! Website preview service
//!
//! Fetches a page the way a chosen browser would, scrapes its metadata and
//! pairs it with a device viewport from the catalog. Successful fetches are
//! cached per browser and URL.

pub mod catalog;
pub mod metadata;
pub mod screenshot;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::cache::{CacheLayer, MemoryCache};
use crate::config::PreviewConfig;

pub use catalog::{Browser, Device, DeviceCategory};
pub use metadata::{PageMetadata, WebsiteMetadata};
pub use screenshot::{ImageFormat, Screenshot, ScreenshotRequest};

/// Bodies beyond this are cut off before scraping
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
const POPULAR_BROWSERS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PreviewServiceError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewData {
    pub url: String,
    pub device: &'static Device,
    pub browser: &'static Browser,
    pub metadata: WebsiteMetadata,
    pub preview_url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    pub all: &'static [Device],
    pub by_category: BTreeMap<&'static str, Vec<&'static Device>>,
    pub categories: Vec<DeviceCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserListing {
    pub all: &'static [Browser],
    pub popular: Vec<&'static Browser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_devices: usize,
    pub total_browsers: usize,
    pub categories: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevicesOverview {
    pub devices: DeviceListing,
    pub browsers: BrowserListing,
    pub stats: CatalogStats,
}

/// Parse and accept only absolute http(s) URLs with a host
pub fn validate_url(raw: &str) -> Result<Url, PreviewServiceError> {
    let url = Url::parse(raw.trim()).map_err(|_| PreviewServiceError::InvalidUrl)?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        _ => Err(PreviewServiceError::InvalidUrl),
    }
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub struct PreviewService {
    client: Client,
    cache: Option<MemoryCache>,
}

impl PreviewService {
    pub fn new(config: &PreviewConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let cache = (config.cache_ttl_seconds > 0)
            .then(|| MemoryCache::with_ttl(Duration::from_secs(config.cache_ttl_seconds)));

        tracing::debug!(
            timeout_secs = config.timeout_secs,
            cache_ttl_seconds = config.cache_ttl_seconds,
            "Website preview service ready"
        );

        Ok(Self { client, cache })
    }

    /// Build a full preview for `raw_url`
    ///
    /// Unknown device and browser ids fall back to the defaults. A page that
    /// cannot be fetched still yields a preview with error metadata.
    pub async fn preview(
        &self,
        raw_url: &str,
        device: Option<&str>,
        browser: Option<&str>,
    ) -> Result<PreviewData, PreviewServiceError> {
        let url = validate_url(raw_url)?;
        let device = catalog::device_or_default(device);
        let browser = catalog::browser_or_default(browser);

        let metadata = self.fetch_metadata(&url, browser).await;

        Ok(PreviewData {
            url: raw_url.trim().to_string(),
            device,
            browser,
            metadata,
            preview_url: raw_url.trim().to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Metadata for `url` as seen by `browser`, from cache when fresh
    pub async fn fetch_metadata(&self, url: &Url, browser: &Browser) -> WebsiteMetadata {
        let key = format!("{}|{}", browser.id, url);

        if let Some(cache) = &self.cache {
            match cache.get::<WebsiteMetadata>(&key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(url = %url, browser = browser.id, "Preview cache hit");
                    return hit;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Discarding unreadable preview cache entry"),
            }
        }

        match self.fetch(url, browser).await {
            Ok(metadata) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.set(&key, &metadata).await {
                        tracing::warn!(error = %e, "Failed to cache preview metadata");
                    }
                }
                metadata
            }
            Err(e) => {
                tracing::info!(url = %url, error = %e, "Website fetch failed");
                WebsiteMetadata::failed(e.to_string())
            }
        }
    }

    async fn fetch(&self, url: &Url, browser: &Browser) -> anyhow::Result<WebsiteMetadata> {
        let started = Instant::now();
        let mut response = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, browser.user_agent)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::UPGRADE_INSECURE_REQUESTS, "1")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
        }

        let headers = response.headers().clone();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let load_time = started.elapsed().as_millis() as u64;

        let html = String::from_utf8_lossy(&body);
        let page = metadata::extract_metadata(&html, response.url());

        Ok(WebsiteMetadata {
            page,
            status: status.as_u16(),
            content_type: header_text(&headers, header::CONTENT_TYPE),
            content_length: header_text(&headers, header::CONTENT_LENGTH),
            last_modified: header_text(&headers, header::LAST_MODIFIED),
            server: header_text(&headers, header::SERVER),
            load_time,
            error: None,
        })
    }

    pub fn devices_overview(&self) -> DevicesOverview {
        let by_category = catalog::category_ids()
            .map(|id| (id, catalog::devices_in(id)))
            .collect();
        let categories = catalog::categories();
        let stats = CatalogStats {
            total_devices: catalog::DEVICES.len(),
            total_browsers: catalog::BROWSERS.len(),
            categories: categories.len(),
        };

        DevicesOverview {
            devices: DeviceListing {
                all: &catalog::DEVICES,
                by_category,
                categories,
            },
            browsers: BrowserListing {
                all: &catalog::BROWSERS,
                popular: catalog::popular_browsers(POPULAR_BROWSERS),
            },
            stats,
        }
    }

    /// Simulated screenshot of a validated URL
    pub fn screenshot(&self, request: &ScreenshotRequest) -> Result<Screenshot, PreviewServiceError> {
        validate_url(&request.url)?;
        Ok(screenshot::capture(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, response::Html, routing::get, Router};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PAGE: &str = r#"<html><head><title>Local Page</title>
        <meta name="description" content="Served by the test">
        <link rel="icon" href="/favicon.png"></head></html>"#;

    async fn spawn_site() -> (SocketAddr, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Html(PAGE)
                }),
            )
            .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, hits)
    }

    fn service(cache_ttl_seconds: u64) -> PreviewService {
        PreviewService::new(&PreviewConfig {
            timeout_secs: 5,
            cache_ttl_seconds,
        })
        .unwrap()
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/a?b=c").is_ok());
        assert!(validate_url(" http://localhost:3000 ").is_ok());
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(PreviewServiceError::InvalidUrl)
        ));
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("mailto:someone@example.com").is_err());
    }

    #[tokio::test]
    async fn test_preview_scrapes_local_page() {
        let (addr, _) = spawn_site().await;
        let url = format!("http://{}/", addr);

        let data = service(0).preview(&url, Some("pixel-7"), Some("firefox")).await.unwrap();
        assert_eq!(data.device.id, "pixel-7");
        assert_eq!(data.browser.id, "firefox");
        assert_eq!(data.preview_url, url);
        assert_eq!(data.metadata.status, 200);
        assert_eq!(data.metadata.page.title, "Local Page");
        assert_eq!(data.metadata.page.description, "Served by the test");
        assert_eq!(data.metadata.page.favicon, format!("http://{}/favicon.png", addr));
        assert!(data
            .metadata
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("text/html")));
        assert!(!data.metadata.is_error());
    }

    #[tokio::test]
    async fn test_unknown_ids_fall_back() {
        let (addr, _) = spawn_site().await;
        let data = service(0)
            .preview(&format!("http://{}/", addr), Some("toaster"), Some("lynx"))
            .await
            .unwrap();
        assert_eq!(data.device.id, catalog::DEFAULT_DEVICE);
        assert_eq!(data.browser.id, catalog::DEFAULT_BROWSER);
    }

    #[tokio::test]
    async fn test_http_error_degrades() {
        let (addr, _) = spawn_site().await;
        let data = service(0)
            .preview(&format!("http://{}/gone", addr), None, None)
            .await
            .unwrap();
        assert_eq!(data.metadata.page.title, metadata::LOAD_ERROR_TITLE);
        assert_eq!(data.metadata.page.description, "HTTP 404: Not Found");
        assert_eq!(data.metadata.status, 0);
    }

    #[tokio::test]
    async fn test_unreachable_host_degrades() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let data = service(0)
            .preview(&format!("http://{}/", addr), None, None)
            .await
            .unwrap();
        assert!(data.metadata.is_error());
        assert_eq!(data.metadata.page.title, metadata::LOAD_ERROR_TITLE);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let err = service(0).preview("javascript:alert(1)", None, None).await.unwrap_err();
        assert!(matches!(err, PreviewServiceError::InvalidUrl));
    }

    #[tokio::test]
    async fn test_cache_per_browser() {
        let (addr, hits) = spawn_site().await;
        let svc = service(60);
        let url = format!("http://{}/", addr);

        svc.preview(&url, None, Some("chrome")).await.unwrap();
        let cached = svc.preview(&url, None, Some("chrome")).await.unwrap();
        assert_eq!(cached.metadata.page.title, "Local Page");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        svc.preview(&url, None, Some("safari")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_devices_overview_shape() {
        let overview = service(0).devices_overview();
        assert_eq!(overview.stats.total_devices, 12);
        assert_eq!(overview.stats.total_browsers, 4);
        assert_eq!(overview.stats.categories, 4);
        assert_eq!(overview.devices.by_category["laptop"].len(), 3);
        assert_eq!(overview.browsers.popular.len(), 3);

        let json = serde_json::to_value(&overview).unwrap();
        assert!(json["devices"]["byCategory"]["mobile"].is_array());
        assert_eq!(json["stats"]["totalDevices"], 12);
    }

    #[test]
    fn test_screenshot_validates_url() {
        let svc = service(0);
        let mut request: ScreenshotRequest =
            serde_json::from_value(serde_json::json!({"url": "https://example.com", "device": "ipad-air"}))
                .unwrap();
        let shot = svc.screenshot(&request).unwrap();
        assert!(shot.screenshot_url.contains("/820x1180/"));

        request.url = "nope".into();
        assert!(matches!(svc.screenshot(&request), Err(PreviewServiceError::InvalidUrl)));
    }
}
