//! Analytics API endpoints
//!
//! - POST /api/analytics - Record an event for the caller
//! - GET /api/analytics - Latest events and a summary; admins see everyone's
//!   events, other users only their own

use axum::{extract::State, http::HeaderMap, routing::get, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::api::common::{client_ip, non_empty, user_agent, ApiQuery, ApiResponse, ValidatedJson};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{AnalyticsEvent, AnalyticsFilter, ClientInfo, TrackEventInput};
use crate::services::analytics::DEFAULT_EVENT_LIMIT;
use crate::services::AnalyticsReport;

const MAX_EVENT_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Page path filter, not pagination
    pub page: Option<String>,
    pub action: Option<String>,
    pub limit: Option<i64>,
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/analytics", get(report).post(track))
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
///
/// A plain date used as an upper bound covers the whole day.
pub fn parse_date_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time).and_utc())
}

impl AnalyticsQuery {
    fn filter(&self) -> Result<AnalyticsFilter, ApiError> {
        let bound = |value: &Option<String>, end: bool, name: &str| {
            non_empty(value.clone())
                .map(|raw| {
                    parse_date_bound(&raw, end)
                        .ok_or_else(|| ApiError::bad_request(format!("Invalid {}", name)))
                })
                .transpose()
        };

        Ok(AnalyticsFilter {
            user_id: None,
            start: bound(&self.start_date, false, "startDate")?,
            end: bound(&self.end_date, true, "endDate")?,
            page: non_empty(self.page.clone()),
            action: non_empty(self.action.clone()),
        })
    }
}

/// POST /api/analytics
async fn track(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<TrackEventInput>,
) -> Result<ApiResponse<AnalyticsEvent>, ApiError> {
    let client = ClientInfo {
        ip_address: client_ip(&headers),
        user_agent: user_agent(&headers),
    };
    let event = state.analytics_service.track(input, &user, client).await?;
    Ok(ApiResponse::data(event).with_message("Event tracked successfully"))
}

/// GET /api/analytics
async fn report(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> Result<ApiResponse<AnalyticsReport>, ApiError> {
    let filter = query.filter()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);

    Ok(ApiResponse::data(
        state.analytics_service.report(&user, filter, limit).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_plain_dates() {
        let start = parse_date_bound("2024-03-01", false).unwrap();
        assert_eq!((start.day(), start.hour(), start.minute()), (1, 0, 0));

        let end = parse_date_bound("2024-03-01", true).unwrap();
        assert_eq!((end.day(), end.hour(), end.minute(), end.second()), (1, 23, 59, 59));
    }

    #[test]
    fn test_rfc3339_kept_exact() {
        let ts = parse_date_bound("2024-03-01T10:30:00+02:00", true).unwrap();
        assert_eq!(ts.hour(), 8);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn test_invalid_date() {
        assert!(parse_date_bound("yesterday", false).is_none());
        assert!(parse_date_bound("2024-13-01", true).is_none());

        let query = AnalyticsQuery {
            start_date: Some("nope".into()),
            end_date: None,
            page: None,
            action: None,
            limit: None,
        };
        assert_eq!(query.filter().unwrap_err().message, "Invalid startDate");
    }
}
