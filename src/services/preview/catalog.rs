//! Device and browser catalog for website previews

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: &'static str,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub os: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub category: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Browser {
    pub id: &'static str,
    pub name: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub user_agent: &'static str,
    pub market_share: f64,
}

/// Device category with the number of catalog devices in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub count: usize,
}

pub const DEFAULT_DEVICE: &str = "desktop-4k";
pub const DEFAULT_BROWSER: &str = "chrome";

#[allow(clippy::too_many_arguments)]
const fn device(
    id: &'static str,
    name: &'static str,
    width: u32,
    height: u32,
    os: &'static str,
    kind: &'static str,
    category: &'static str,
    icon: &'static str,
) -> Device {
    Device {
        id,
        name,
        width,
        height,
        os,
        kind,
        category,
        icon,
    }
}

pub static DEVICES: [Device; 12] = [
    device("iphone-14", "iPhone 14", 390, 844, "iOS 16", "Mobile", "mobile", "📱"),
    device("iphone-se", "iPhone SE", 375, 667, "iOS 16", "Mobile", "mobile", "📱"),
    device("samsung-s23", "Samsung Galaxy S23", 360, 780, "Android 13", "Mobile", "mobile", "📱"),
    device("pixel-7", "Google Pixel 7", 412, 915, "Android 13", "Mobile", "mobile", "📱"),
    device("ipad-air", "iPad Air", 820, 1180, "iPadOS 16", "Tablet", "tablet", "📱"),
    device("ipad-mini", "iPad Mini", 744, 1133, "iPadOS 16", "Tablet", "tablet", "📱"),
    device("samsung-tab", "Samsung Galaxy Tab", 800, 1280, "Android 13", "Tablet", "tablet", "📱"),
    device("surface-pro", "Surface Pro", 912, 1368, "Windows 11", "Tablet", "tablet", "💻"),
    device("macbook-air", "MacBook Air", 1440, 900, "macOS Ventura", "Laptop", "laptop", "💻"),
    device("macbook-pro", "MacBook Pro", 1512, 982, "macOS Ventura", "Laptop", "laptop", "💻"),
    device("windows-laptop", "Windows Laptop", 1366, 768, "Windows 11", "Laptop", "laptop", "💻"),
    device("desktop-4k", "Desktop 4K", 1920, 1080, "Windows 11", "Desktop", "desktop", "🖥️"),
];

pub static BROWSERS: [Browser; 4] = [
    Browser {
        id: "chrome",
        name: "Google Chrome",
        color: "#4285f4",
        icon: "🌐",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        market_share: 65.8,
    },
    Browser {
        id: "firefox",
        name: "Mozilla Firefox",
        color: "#ff7139",
        icon: "🦊",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        market_share: 3.2,
    },
    Browser {
        id: "safari",
        name: "Safari",
        color: "#006cff",
        icon: "🌐",
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
        market_share: 18.8,
    },
    Browser {
        id: "edge",
        name: "Microsoft Edge",
        color: "#0078d4",
        icon: "🌐",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
        market_share: 4.8,
    },
];

/// (id, display name, icon) in display order
const CATEGORIES: [(&str, &str, &str); 4] = [
    ("mobile", "Mobile", "📱"),
    ("tablet", "Tablet", "📱"),
    ("laptop", "Laptop", "💻"),
    ("desktop", "Desktop", "🖥️"),
];

/// Look a device up by id or display name
pub fn find_device(key: &str) -> Option<&'static Device> {
    DEVICES
        .iter()
        .find(|d| d.id == key || d.name.eq_ignore_ascii_case(key))
}

/// Device by id, falling back to the default desktop
pub fn device_or_default(id: Option<&str>) -> &'static Device {
    id.and_then(|id| DEVICES.iter().find(|d| d.id == id))
        .unwrap_or(&DEVICES[DEVICES.len() - 1])
}

/// Browser by id, falling back to Chrome
pub fn browser_or_default(id: Option<&str>) -> &'static Browser {
    id.and_then(|id| BROWSERS.iter().find(|b| b.id == id))
        .unwrap_or(&BROWSERS[0])
}

pub fn devices_in(category: &str) -> Vec<&'static Device> {
    DEVICES.iter().filter(|d| d.category == category).collect()
}

pub fn categories() -> Vec<DeviceCategory> {
    CATEGORIES
        .iter()
        .map(|&(id, name, icon)| DeviceCategory {
            id,
            name,
            icon,
            count: devices_in(id).len(),
        })
        .collect()
}

pub fn category_ids() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|&(id, _, _)| id)
}

/// The `n` browsers with the largest market share
pub fn popular_browsers(n: usize) -> Vec<&'static Browser> {
    let mut browsers: Vec<&'static Browser> = BROWSERS.iter().collect();
    browsers.sort_by(|a, b| b.market_share.total_cmp(&a.market_share));
    browsers.truncate(n);
    browsers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(device_or_default(None).id, DEFAULT_DEVICE);
        assert_eq!(device_or_default(Some("toaster")).id, DEFAULT_DEVICE);
        assert_eq!(device_or_default(Some("pixel-7")).width, 412);
        assert_eq!(browser_or_default(None).id, DEFAULT_BROWSER);
        assert_eq!(browser_or_default(Some("opera")).id, DEFAULT_BROWSER);
        assert_eq!(browser_or_default(Some("safari")).name, "Safari");
    }

    #[test]
    fn test_find_device_by_id_or_name() {
        assert_eq!(find_device("ipad-mini").map(|d| d.height), Some(1133));
        assert_eq!(find_device("iPhone 14").map(|d| d.id), Some("iphone-14"));
        assert!(find_device("nokia").is_none());
    }

    #[test]
    fn test_categories_cover_catalog() {
        let cats = categories();
        assert_eq!(cats.iter().map(|c| c.count).sum::<usize>(), DEVICES.len());
        assert_eq!(cats[0].count, 4);
        assert_eq!(cats[3].count, 1);
    }

    #[test]
    fn test_popular_browsers() {
        let ids: Vec<_> = popular_browsers(3).iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["chrome", "safari", "edge"]);
    }

    #[test]
    fn test_device_serializes_type_key() {
        let json = serde_json::to_value(DEVICES[0]).unwrap();
        assert_eq!(json["type"], "Mobile");
        let json = serde_json::to_value(BROWSERS[0]).unwrap();
        assert!(json["userAgent"].as_str().unwrap().contains("Chrome"));
        assert_eq!(json["marketShare"], 65.8);
    }
}
