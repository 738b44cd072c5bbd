//! Domain types shared by the delivery and replay paths
//!
//! An [`Event`] is what callers record. A [`RequestRecord`] is the API call
//! that delivers it, and is also the unit stored on disk: one compact JSON
//! object per line in the queue file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Wire and on-disk format for `occurred_at`
pub const OCCURRED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// API path (below `/api/v1`) that accepts events
pub const EVENTS_PATH: &str = "/events.json";

/// Free-form event properties, insertion order preserved
pub type Properties = Map<String, Value>;

/// A single user action submitted for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Caller-side identity of the user (sent as `uid`)
    pub identity: String,
    /// Action name (sent as `action_name`)
    pub action: String,
    /// Free-form properties
    pub properties: Properties,
    /// When the action happened
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    /// Create an event, defaulting `occurred_at` to now
    pub fn new(
        identity: impl Into<String>,
        action: impl Into<String>,
        properties: Properties,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            identity: identity.into(),
            action: action.into(),
            properties,
            occurred_at: occurred_at.unwrap_or_else(Utc::now),
        }
    }

    /// `occurred_at` rendered as `YYYY-MM-DD HH:MM:SS UTC`
    pub fn formatted_occurred_at(&self) -> String {
        self.occurred_at.format(OCCURRED_AT_FORMAT).to_string()
    }

    /// Field map sent to the API: `uid`, `action_name`, `properties`, `occurred_at`
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("uid".to_string(), Value::String(self.identity.clone()));
        params.insert("action_name".to_string(), Value::String(self.action.clone()));
        params.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        params.insert(
            "occurred_at".to_string(),
            Value::String(self.formatted_occurred_at()),
        );
        params
    }
}

/// HTTP verbs the API understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued API call: `{"method":..,"url":..,"data":{..}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub method: HttpMethod,
    /// Path below the API root, e.g. `/events.json`
    pub url: String,
    pub data: Map<String, Value>,
}

impl RequestRecord {
    /// The `POST /events.json` call that delivers `event`
    pub fn for_event(event: &Event) -> Self {
        Self {
            method: HttpMethod::Post,
            url: EVENTS_PATH.to_string(),
            data: event.to_params(),
        }
    }

    /// Encode as a single queue line (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one queue line
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn signup_event() -> Event {
        let mut properties = Properties::new();
        properties.insert("plan".to_string(), json!("pro"));
        Event::new(
            "u1",
            "signup",
            properties,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        )
    }

    #[test]
    fn test_occurred_at_format() {
        assert_eq!(
            signup_event().formatted_occurred_at(),
            "2024-01-02 03:04:05 UTC"
        );
    }

    #[test]
    fn test_occurred_at_defaults_to_now() {
        let before = Utc::now();
        let event = Event::new("u1", "login", Properties::new(), None);
        assert!(event.occurred_at >= before);
        assert!(event.occurred_at <= Utc::now());
    }

    #[test]
    fn test_queue_line_layout() {
        let line = RequestRecord::for_event(&signup_event()).to_line().unwrap();
        assert_eq!(
            line,
            r#"{"method":"POST","url":"/events.json","data":{"uid":"u1","action_name":"signup","properties":{"plan":"pro"},"occurred_at":"2024-01-02 03:04:05 UTC"}}"#
        );
    }

    #[test]
    fn test_queue_line_decodes_to_same_request() {
        let record = RequestRecord::for_event(&signup_event());
        let decoded = RequestRecord::from_line(&format!("{}\n", record.to_line().unwrap())).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let line = r#"{"method":"PATCH","url":"/events.json","data":{}}"#;
        assert!(RequestRecord::from_line(line).is_err());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(
            serde_json::to_string(&HttpMethod::Delete).unwrap(),
            r#""DELETE""#
        );
    }
}
