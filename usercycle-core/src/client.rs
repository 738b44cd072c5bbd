//! Usercycle client: record events, replay the queue
//!
//! ## Recording
//!
//! [`Client::record`] tries to deliver the event right away. If that fails,
//! or if the client runs in queue-only mode, the event is appended to
//! `usercycle_event.log` instead. Recording never returns an error: anything
//! that goes wrong ends up in `usercycle_error.log`.
//!
//! ## Draining
//!
//! [`Client::drain_queued_events`] renames the queue to a
//! `{epoch}.usercycle_send.log` snapshot, sends every line in order and
//! deletes the snapshot once the whole file has been read. Events recorded
//! while a drain runs go to a new queue file. A failed send is logged and the
//! drain moves on; a failure to read or delete the snapshot stops the drain
//! and leaves the snapshot on disk for [`Client::drain_stranded_snapshots`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::{ClientConfig, ClientOptions};
use crate::error::Result;
use crate::reporter::ErrorReporter;
use crate::store::{EventLogStore, LogKind};
use crate::transport::{classify, HttpTransport, Response, Transport};
use crate::types::{Event, HttpMethod, Properties, RequestRecord};

/// Outcome of draining one snapshot
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainStats {
    /// Snapshot that was drained, if there was anything to drain
    pub snapshot: Option<PathBuf>,
    /// Requests sent to the API
    pub attempted: usize,
    /// Requests the API accepted
    pub delivered: usize,
    /// Requests that failed (already in the error log)
    pub failed: usize,
    /// Lines that were not valid queued requests
    pub malformed: usize,
    /// Whole snapshot read and deleted
    pub completed: bool,
}

/// Client for the Usercycle events API
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
    store: EventLogStore,
    reporter: ErrorReporter,
}

impl Client<HttpTransport> {
    /// Create a client talking to the real API
    ///
    /// Fails if the log directory is not writable.
    pub fn new(api_key: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let config = ClientConfig::resolve(api_key, options)?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Client<T> {
    /// Create a client with a custom transport
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let store = EventLogStore::new(config.log_dir());
        let reporter = ErrorReporter::new(store.path(LogKind::Error), config.mirror_to_stderr());
        Self {
            config,
            transport,
            store,
            reporter,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &EventLogStore {
        &self.store
    }

    /// Record a user action
    ///
    /// `occurred_at` defaults to now.
    pub fn record(
        &self,
        identity: &str,
        action: &str,
        properties: Properties,
        occurred_at: Option<DateTime<Utc>>,
    ) {
        let event = Event::new(identity, action, properties, occurred_at);
        self.record_event(&event);
    }

    /// Record a prebuilt event
    pub fn record_event(&self, event: &Event) {
        let request = RequestRecord::for_event(event);
        if let Err(e) = self.process_request(&request) {
            self.reporter.report(&e.to_string());
        }
    }

    fn process_request(&self, request: &RequestRecord) -> Result<()> {
        if self.config.queue_only() {
            return self.enqueue(request);
        }

        match self.send_event(request.method, &request.url, &request.data) {
            Ok(_) => Ok(()),
            // Already in the error log; keep the event for the next drain
            Err(_) => self.enqueue(request),
        }
    }

    fn enqueue(&self, request: &RequestRecord) -> Result<()> {
        let line = request.to_line()?;
        self.store.append(LogKind::Event, &line)?;
        tracing::debug!(url = %request.url, "Queued request for later delivery");
        Ok(())
    }

    /// Send one request now
    ///
    /// Failures are written to the error log before being returned.
    pub fn send_event(
        &self,
        method: HttpMethod,
        path: &str,
        data: &Map<String, Value>,
    ) -> Result<Response> {
        let outcome = classify(self.transport.send(method, path, data));
        if let Err(e) = &outcome {
            self.reporter.report(&e.to_string());
        }
        outcome
    }

    /// Replay the queued events
    ///
    /// Does nothing when there is no queue file.
    pub fn drain_queued_events(&self) -> DrainStats {
        let mut stats = DrainStats::default();
        if !self.store.exists(LogKind::Event) {
            return stats;
        }

        match self.store.rotate() {
            Ok(Some(snapshot)) => self.drain_snapshot(&snapshot, &mut stats),
            Ok(None) => {}
            Err(e) => self.reporter.report(&e.to_string()),
        }
        stats
    }

    /// Replay snapshots left behind by drains that stopped early, oldest first
    pub fn drain_stranded_snapshots(&self) -> Vec<DrainStats> {
        let snapshots = match self.store.snapshots() {
            Ok(snapshots) => snapshots,
            Err(e) => {
                self.reporter.report(&e.to_string());
                return Vec::new();
            }
        };

        snapshots
            .iter()
            .map(|snapshot| {
                tracing::info!(snapshot = %snapshot.display(), "Replaying stranded snapshot");
                let mut stats = DrainStats::default();
                self.drain_snapshot(snapshot, &mut stats);
                stats
            })
            .collect()
    }

    fn drain_snapshot(&self, snapshot: &Path, stats: &mut DrainStats) {
        stats.snapshot = Some(snapshot.to_path_buf());
        if let Err(e) = self.replay(snapshot, stats) {
            self.reporter.report(&e.to_string());
        }
        tracing::info!(
            snapshot = %snapshot.display(),
            attempted = stats.attempted,
            delivered = stats.delivered,
            failed = stats.failed,
            malformed = stats.malformed,
            completed = stats.completed,
            "Drained queue snapshot"
        );
    }

    fn replay(&self, snapshot: &Path, stats: &mut DrainStats) -> Result<()> {
        for line in self.store.lines(snapshot)? {
            // Only I/O errors end the drain; a bad line is skipped
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let decoded = std::str::from_utf8(&line)
                .map_err(|e| e.to_string())
                .and_then(|text| RequestRecord::from_line(text).map_err(|e| e.to_string()));
            let request = match decoded {
                Ok(request) => request,
                Err(reason) => {
                    stats.malformed += 1;
                    self.reporter
                        .report(&format!("skipping malformed queued request: {}", reason));
                    continue;
                }
            };

            stats.attempted += 1;
            match self.send_event(request.method, &request.url, &request.data) {
                Ok(_) => stats.delivered += 1,
                Err(_) => stats.failed += 1,
            }
        }

        self.store.remove(snapshot)?;
        stats.completed = true;
        Ok(())
    }
}
