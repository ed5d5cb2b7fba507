//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// A message addressed to one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: i64, title: String, message: String, notification_type: NotificationType) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            title,
            message,
            notification_type,
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "INFO",
            NotificationType::Success => "SUCCESS",
            NotificationType::Warning => "WARNING",
            NotificationType::Error => "ERROR",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" => Ok(NotificationType::Info),
            "SUCCESS" => Ok(NotificationType::Success),
            "WARNING" => Ok(NotificationType::Warning),
            "ERROR" => Ok(NotificationType::Error),
            _ => Err(anyhow::anyhow!("Invalid notification type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationInput {
    pub user_id: i64,
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Message must be between 1 and 1000 characters"))]
    pub message: String,
    #[serde(default, rename = "type")]
    pub notification_type: NotificationType,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub notification_type: Option<NotificationType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_serializes_as_type_key() {
        let n = Notification::new(1, "Hi".into(), "There".into(), NotificationType::Warning);
        let json = serde_json::to_value(n).unwrap();
        assert_eq!(json["type"], "WARNING");
        assert_eq!(json["isRead"], false);
    }

    #[test]
    fn test_input_type_defaults_to_info() {
        let input: CreateNotificationInput = serde_json::from_value(serde_json::json!({
            "userId": 2,
            "title": "Welcome",
            "message": "Hello"
        }))
        .unwrap();
        assert_eq!(input.notification_type, NotificationType::Info);
        assert!(input.validate().is_ok());
    }
}
