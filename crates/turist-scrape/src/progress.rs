// Copyright 2026 turist-scrape contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for scrape telemetry.
//!
//! The worker pool emits `ProgressEvent`s as units start and finish. They
//! flow through a `tokio::sync::broadcast` channel to any subscriber (the
//! run log, tests). When no subscriber exists, events are silently dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted during a scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// The run has loaded its targets and is about to start.
    RunStarted { total: usize, mode: String },
    /// A worker picked up a target.
    UnitStarted { index: usize, url: String },
    /// A target produced a record.
    UnitCompleted {
        index: usize,
        url: String,
        property_found: bool,
        fields_found: usize,
        images: usize,
        elapsed_ms: u64,
    },
    /// A worker died mid-unit; its record is absent from the output.
    UnitLost { index: usize, reason: String },
    /// Every worker has finished.
    RunCompleted { records: usize, elapsed_ms: u64 },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// A run emits two events per URL plus two, so 256 slots cover a typical
/// listing page without the run log lagging.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emits events for one run, numbering them as it goes.
///
/// Shared between workers, so the sequence counter is atomic.
pub struct ProgressEmitter {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: std::sync::atomic::AtomicU64,
}

impl ProgressEmitter {
    /// New emitter with a fresh v4 run id.
    pub fn new(tx: Option<ProgressSender>) -> Self {
        Self {
            tx,
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit `event`, ignoring send errors (no receivers listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            let _ = sender.send(ProgressEvent {
                run_id: self.run_id.clone(),
                seq,
                event,
            });
        }
    }
}
