//! Simulated screenshots
//!
//! No page is rendered. A screenshot request resolves the viewport size and
//! returns a placeholder image URL of that size together with estimated
//! file facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::catalog::find_device;

const DEFAULT_WIDTH: u32 = 1920;
const DEFAULT_HEIGHT: u32 = 1080;
const PLACEHOLDER_HOST: &str = "https://via.placeholder.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl ImageFormat {
    /// Rough encoded bytes per pixel at quality 100
    fn bytes_per_pixel(&self) -> f64 {
        match self {
            ImageFormat::Png => 0.6,
            ImageFormat::Jpg => 0.15,
            ImageFormat::Webp => 0.1,
        }
    }
}

fn default_quality() -> u32 {
    80
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScreenshotRequest {
    pub url: String,
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub browser: Option<String>,
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default = "default_quality")]
    #[validate(range(min = 1, max = 100, message = "Quality must be between 1 and 100"))]
    pub quality: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotMetadata {
    pub original_url: String,
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub browser: String,
    pub format: ImageFormat,
    pub quality: u32,
    pub generated_at: DateTime<Utc>,
    /// Estimated size of the encoded image in bytes
    pub file_size: u64,
    /// Estimated render time in milliseconds
    pub load_time: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub screenshot_url: String,
    pub metadata: ScreenshotMetadata,
}

/// Viewport for a request: explicit sizes win, then the named device, then
/// the desktop default
pub fn viewport(request: &ScreenshotRequest) -> (u32, u32) {
    let device = request.device.as_deref().and_then(find_device);
    let width = request
        .width
        .filter(|w| *w > 0)
        .or(device.map(|d| d.width))
        .unwrap_or(DEFAULT_WIDTH);
    let height = request
        .height
        .filter(|h| *h > 0)
        .or(device.map(|d| d.height))
        .unwrap_or(DEFAULT_HEIGHT);
    (width, height)
}

pub fn placeholder_url(width: u32, height: u32, device: Option<&str>) -> String {
    format!(
        "{}/{}x{}/4F46E5/FFFFFF?text=Website+Preview+({})",
        PLACEHOLDER_HOST,
        width,
        height,
        urlencoding::encode(device.unwrap_or("Desktop"))
    )
}

fn estimate_file_size(width: u32, height: u32, format: ImageFormat, quality: u32) -> u64 {
    let pixels = f64::from(width) * f64::from(height);
    let scale = f64::from(quality.clamp(1, 100)) / 100.0;
    (pixels * format.bytes_per_pixel() * scale).round() as u64
}

fn estimate_load_time(width: u32, height: u32) -> u64 {
    500 + (u64::from(width) * u64::from(height)) / 1_000
}

/// Build the simulated screenshot; `request.url` must already be validated
pub fn capture(request: &ScreenshotRequest) -> Screenshot {
    let (width, height) = viewport(request);
    let device = request.device.as_deref().filter(|d| !d.is_empty());

    Screenshot {
        screenshot_url: placeholder_url(width, height, device),
        metadata: ScreenshotMetadata {
            original_url: request.url.clone(),
            device: device.unwrap_or("Desktop").to_string(),
            width,
            height,
            browser: request
                .browser
                .clone()
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| "Chrome".to_string()),
            format: request.format,
            quality: request.quality,
            generated_at: Utc::now(),
            file_size: estimate_file_size(width, height, request.format, request.quality),
            load_time: estimate_load_time(width, height),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(device: Option<&str>, width: Option<u32>, height: Option<u32>) -> ScreenshotRequest {
        ScreenshotRequest {
            url: "https://example.com".into(),
            device: device.map(String::from),
            width,
            height,
            browser: None,
            format: ImageFormat::Png,
            quality: 80,
        }
    }

    #[test]
    fn test_viewport_precedence() {
        assert_eq!(viewport(&request(None, None, None)), (1920, 1080));
        assert_eq!(viewport(&request(Some("iphone-14"), None, None)), (390, 844));
        assert_eq!(viewport(&request(Some("iPhone 14"), Some(400), None)), (400, 844));
        assert_eq!(viewport(&request(Some("unknown"), None, Some(500))), (1920, 500));
    }

    #[test]
    fn test_placeholder_url() {
        assert_eq!(
            placeholder_url(1920, 1080, None),
            "https://via.placeholder.com/1920x1080/4F46E5/FFFFFF?text=Website+Preview+(Desktop)"
        );
        assert!(placeholder_url(390, 844, Some("iphone-14")).ends_with("(iphone-14)"));
    }

    #[test]
    fn test_capture_defaults() {
        let shot = capture(&request(None, None, None));
        assert_eq!(shot.metadata.device, "Desktop");
        assert_eq!(shot.metadata.browser, "Chrome");
        assert_eq!(shot.metadata.width, 1920);
        assert!(shot.metadata.file_size > 0);
        assert!(shot.metadata.load_time >= 500);
    }

    #[test]
    fn test_request_defaults_and_quality_range() {
        let req: ScreenshotRequest =
            serde_json::from_value(serde_json::json!({"url": "https://example.com"})).unwrap();
        assert_eq!(req.format, ImageFormat::Png);
        assert_eq!(req.quality, 80);
        assert!(req.validate().is_ok());

        let req: ScreenshotRequest = serde_json::from_value(
            serde_json::json!({"url": "https://example.com", "quality": 0, "format": "webp"}),
        )
        .unwrap();
        assert_eq!(req.format, ImageFormat::Webp);
        assert!(req.validate().is_err());

        assert!(serde_json::from_value::<ScreenshotRequest>(
            serde_json::json!({"url": "https://example.com", "format": "bmp"})
        )
        .is_err());
    }

    #[test]
    fn test_smaller_formats_estimate_smaller() {
        let png = estimate_file_size(1000, 1000, ImageFormat::Png, 80);
        let jpg = estimate_file_size(1000, 1000, ImageFormat::Jpg, 80);
        assert!(jpg < png);
    }
}
