//! Login rate limiting
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per email address: 5 per 15 minutes
//! - requests per client IP: 10 per minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

const EMAIL_MAX_FAILURES: usize = 5;
const EMAIL_WINDOW_MINUTES: i64 = 15;
const IP_MAX_REQUESTS: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

/// Timestamps of recent events per key, trimmed to a window
struct AttemptLog<K> {
    window: Duration,
    max: usize,
    entries: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> AttemptLog<K> {
    fn new(window: Duration, max: usize) -> Self {
        Self {
            window,
            max,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn is_limited(&self, key: &K, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.window;
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(times) => {
                times.retain(|t| *t > cutoff);
                times.len() >= self.max
            }
            None => false,
        }
    }

    async fn record(&self, key: K, now: DateTime<Utc>) {
        self.entries.write().await.entry(key).or_default().push(now);
    }

    async fn clear(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    async fn prune(&self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.entries.write().await.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Login rate limiter shared by all requests
pub struct LoginRateLimiter {
    failures_by_email: AttemptLog<String>,
    requests_by_ip: AttemptLog<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            failures_by_email: AttemptLog::new(
                Duration::minutes(EMAIL_WINDOW_MINUTES),
                EMAIL_MAX_FAILURES,
            ),
            requests_by_ip: AttemptLog::new(Duration::minutes(IP_WINDOW_MINUTES), IP_MAX_REQUESTS),
        }
    }

    /// Whether the email has used up its failed attempts
    pub async fn is_email_limited(&self, email: &str) -> bool {
        self.failures_by_email
            .is_limited(&email.to_lowercase(), Utc::now())
            .await
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        self.failures_by_email
            .record(email.to_lowercase(), Utc::now())
            .await;
    }

    /// Forget failures after a successful login
    pub async fn clear_email(&self, email: &str) {
        self.failures_by_email.clear(&email.to_lowercase()).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.requests_by_ip.is_limited(&ip, Utc::now()).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.requests_by_ip.record(ip, Utc::now()).await;
    }

    /// Drop expired entries; run periodically from a background task
    pub async fn cleanup(&self) {
        let now = Utc::now();
        self.failures_by_email.prune(now).await;
        self.requests_by_ip.prune(now).await;
        let emails = self.failures_by_email.len().await;
        let ips = self.requests_by_ip.len().await;
        tracing::debug!(emails, ips, "Rate limiter cleanup finished");
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
