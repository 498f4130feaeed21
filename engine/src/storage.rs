//! Snapshot storage interface: the engine itself is synchronous and
//! does no I/O; persistence is an external collaborator plugged in through
//! this trait. Two implementations are bundled for tests and the CLI.

use std::collections::HashMap;

use crate::snapshot::{InboundSnapshot, OutboundResult};

pub trait SnapshotStore: Send + Sync {
    fn load(&self, id: &str) -> Option<InboundSnapshot>;
    fn save(&self, id: &str, result: &OutboundResult);
}

/// Discards every write and answers every read with `None`; used when the
/// caller supplies the snapshot directly and never asks the store to persist.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl SnapshotStore for NullStore {
    fn load(&self, _id: &str) -> Option<InboundSnapshot> {
        None
    }

    fn save(&self, _id: &str, _result: &OutboundResult) {}
}

/// Process-lifetime store backed by a `Mutex<HashMap>`, used by integration
/// tests and the CLI's `repair` subcommand to round-trip a prior `solve`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    snapshots: std::sync::Mutex<HashMap<String, InboundSnapshot>>,
    results: std::sync::Mutex<HashMap<String, OutboundResult>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, id: impl Into<String>, snapshot: InboundSnapshot) {
        self.snapshots.lock().unwrap().insert(id.into(), snapshot);
    }
}

impl SnapshotStore for InMemoryStore {
    fn load(&self, id: &str) -> Option<InboundSnapshot> {
        self.snapshots.lock().unwrap().get(id).cloned()
    }

    fn save(&self, id: &str, result: &OutboundResult) {
        self.results.lock().unwrap().insert(id.to_string(), result.clone());
    }
}
