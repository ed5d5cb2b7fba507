//! Site setting model
//!
//! Settings are stored as text alongside a declared value type; the value is
//! checked against that type on every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: SettingType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    pub fn new(key: String, value: String, value_type: SettingType) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            key,
            value,
            value_type,
            created_at: now,
            updated_at: now,
        }
    }

    /// The value decoded according to its declared type
    pub fn typed_value(&self) -> serde_json::Value {
        self.value_type.decode(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
}

/// Why a value does not fit its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SettingValueError {
    #[error("Invalid JSON value")]
    InvalidJson,
    #[error("Invalid boolean value")]
    InvalidBoolean,
    #[error("Invalid number value")]
    InvalidNumber,
}

impl SettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Number => "number",
            SettingType::Boolean => "boolean",
            SettingType::Json => "json",
        }
    }

    /// Check that `value` is a valid text encoding of this type
    pub fn validate(&self, value: &str) -> Result<(), SettingValueError> {
        match self {
            SettingType::String => Ok(()),
            SettingType::Json => serde_json::from_str::<serde_json::Value>(value)
                .map(|_| ())
                .map_err(|_| SettingValueError::InvalidJson),
            SettingType::Boolean => match value.to_lowercase().as_str() {
                "true" | "false" => Ok(()),
                _ => Err(SettingValueError::InvalidBoolean),
            },
            SettingType::Number => match value.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err(SettingValueError::InvalidNumber),
            },
        }
    }

    /// Decode a stored value; anything that fails to decode is returned as
    /// a plain string
    pub fn decode(&self, value: &str) -> serde_json::Value {
        let fallback = || serde_json::Value::String(value.to_string());
        match self {
            SettingType::String => fallback(),
            SettingType::Boolean => match value.to_lowercase().as_str() {
                "true" => serde_json::Value::Bool(true),
                "false" => serde_json::Value::Bool(false),
                _ => fallback(),
            },
            SettingType::Number => {
                let trimmed = value.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    return serde_json::Value::from(n);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(fallback)
            }
            SettingType::Json => serde_json::from_str(value).unwrap_or_else(|_| fallback()),
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(SettingType::String),
            "number" => Ok(SettingType::Number),
            "boolean" => Ok(SettingType::Boolean),
            "json" => Ok(SettingType::Json),
            _ => Err(anyhow::anyhow!("Invalid setting type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertSettingInput {
    #[validate(length(min = 1, max = 100, message = "Key must be between 1 and 100 characters"))]
    pub key: String,
    pub value: String,
    #[serde(default, rename = "type")]
    pub value_type: SettingType,
}
