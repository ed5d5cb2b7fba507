//! Analytics event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::UserSummary;

/// One tracked page interaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: i64,
    pub user_id: Option<i64>,
    pub page: String,
    pub action: String,
    /// JSON text as submitted by the client
    pub metadata: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsWithUser {
    #[serde(flatten)]
    pub event: AnalyticsEvent,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrackEventInput {
    #[validate(length(min = 1, max = 500, message = "Page must be between 1 and 500 characters"))]
    pub page: String,
    #[validate(length(min = 1, max = 100, message = "Action must be between 1 and 100 characters"))]
    pub action: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Request facts recorded next to an event
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsFilter {
    /// Restrict to one user's events
    pub user_id: Option<i64>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: Option<String>,
    pub action: Option<String>,
}

/// Event count for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCount {
    pub page: String,
    pub count: i64,
}

/// Event count for one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_events: i64,
    pub unique_pages: i64,
    pub unique_actions: i64,
    pub top_pages: Vec<PageCount>,
    pub top_actions: Vec<ActionCount>,
}
