//! # usercycle-core
//!
//! Client library for the Usercycle analytics events API.
//!
//! Events are sent to the API as they are recorded. When the API cannot be
//! reached (or the client is configured to queue only), they are appended to
//! a local queue file instead, and a later drain replays them.
//!
//! ## Files
//!
//! All state lives in one log directory:
//! - `usercycle_event.log`: queued requests, one JSON object per line
//! - `{epochSeconds}.usercycle_send.log`: a queue snapshot being drained
//! - `usercycle_error.log`: timestamped delivery and filesystem errors
//!
//! ## Example
//!
//! ```rust,no_run
//! use usercycle_core::{Client, ClientOptions, Properties};
//!
//! let client = Client::new("uc_live_xxxx", ClientOptions::default().with_log_dir("/var/spool/usercycle"))
//!     .expect("log directory must be writable");
//!
//! let mut properties = Properties::new();
//! properties.insert("plan".into(), "pro".into());
//! client.record("user-42", "signed_up", properties, None);
//!
//! // Later, e.g. from cron:
//! client.drain_queued_events();
//! ```

// Re-export commonly used items at the crate root
pub use client::{Client, DrainStats};
pub use config::{ClientConfig, ClientOptions, Config};
pub use error::{Error, Result};
pub use store::{EventLogStore, LogKind};
pub use transport::{HttpTransport, RawResponse, Response, Transport};
pub use types::*;

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod reporter;
pub mod store;
pub mod transport;
pub mod types;
