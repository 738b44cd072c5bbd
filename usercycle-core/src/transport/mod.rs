//! Transport to the Usercycle HTTP API
//!
//! A [`Transport`] performs exactly one HTTP request and reports what
//! happened. It does not decide what a failure means; [`classify`] turns the
//! raw outcome into the success/failure view the client works with.
//!
//! ## Success
//!
//! Only statuses in `200..300` count as delivered. Anything else, including
//! a connection that never produced a response, is a failure. Failures carry
//! a readable message taken from the API's documented status table, or the
//! transport error text when the status is not documented.

mod form;
mod http;
pub mod status;

pub use form::encode as encode_form;
pub use http::HttpTransport;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::HttpMethod;

/// One HTTP request to the API
pub trait Transport {
    /// Send `data` to `path` (relative to `/api/v1`)
    ///
    /// Returns `Err` only when no HTTP response was obtained.
    fn send(&self, method: HttpMethod, path: &str, data: &Map<String, Value>)
        -> Result<RawResponse>;
}

/// Status and body exactly as the server sent them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as JSON; `None` when empty or not JSON
    pub fn json(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }
}

/// A delivered request
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

/// Map a transport outcome to delivered / failed
pub fn classify(outcome: Result<RawResponse>) -> Result<Response> {
    let raw = outcome?;
    if raw.is_success() {
        return Ok(Response {
            status: raw.status,
            body: raw.json(),
        });
    }

    let message = status::describe(raw.status)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", raw.status));
    Err(Error::Status {
        status: raw.status,
        message,
    })
}
