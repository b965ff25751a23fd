//! Registry of processed documents and the active corpus
//!
//! Each document name maps to the fingerprint of its last processed version
//! and the corpus built from it. Whether an upload needs processing is decided
//! purely by comparing fingerprints:
//!
//! ```text
//! Unseen --build--> Current --same fingerprint--> Current (corpus reused)
//!                   Current --new fingerprint---> Stale --build--> Current
//! ```

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::retrieval::Corpus;
use crate::types::{ContentHash, Document};

/// Processing state of a document name relative to an incoming fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Name never processed
    Unseen,
    /// Stored fingerprint matches
    Current,
    /// Stored fingerprint differs
    Stale,
}

/// A processed document and its corpus
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub document: Document,
    pub corpus: Arc<Corpus>,
}

/// The corpus questions are answered against
#[derive(Debug, Clone)]
pub struct ActiveCorpus {
    /// Document the corpus belongs to
    pub filename: String,
    pub corpus: Arc<Corpus>,
}

/// In-memory document registry, shared across requests
#[derive(Default)]
pub struct DocumentRegistry {
    entries: DashMap<String, RegistryEntry>,
    active: RwLock<Option<ActiveCorpus>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an incoming version of `name`
    pub fn state_of(&self, name: &str, fingerprint: &ContentHash) -> DocumentState {
        match self.entries.get(name) {
            None => DocumentState::Unseen,
            Some(entry) if entry.document.fingerprint == *fingerprint => DocumentState::Current,
            Some(_) => DocumentState::Stale,
        }
    }

    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.get(name).map(|e| e.clone())
    }

    /// Record a freshly built version and make it active; returns the entry
    /// it replaced
    pub fn commit(&self, document: Document, corpus: Arc<Corpus>) -> Option<RegistryEntry> {
        let name = document.filename.clone();
        let previous = self.entries.insert(
            name.clone(),
            RegistryEntry {
                document,
                corpus: Arc::clone(&corpus),
            },
        );
        self.set_active(name, corpus);
        previous
    }

    /// Make an already processed document active again
    pub fn activate(&self, name: &str) -> Option<Arc<Corpus>> {
        let corpus = self.entries.get(name).map(|e| Arc::clone(&e.corpus))?;
        self.set_active(name.to_string(), Arc::clone(&corpus));
        Some(corpus)
    }

    fn set_active(&self, filename: String, corpus: Arc<Corpus>) {
        *self.active.write() = Some(ActiveCorpus { filename, corpus });
    }

    /// Snapshot of the active corpus
    pub fn active(&self) -> Option<ActiveCorpus> {
        self.active.read().clone()
    }

    /// Wait for exclusive access to a document name
    ///
    /// Held across hashing and building so one name is never built twice at
    /// once; different names lock independently.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(self.locks.entry(name.to_string()).or_default().value());
        mutex.lock_owned().await
    }

    /// Drop the lock of a name that was never registered, once nobody
    /// holds or awaits it
    pub fn release_lock(&self, name: &str) {
        if self.entries.contains_key(name) {
            return;
        }
        self.locks.remove_if(name, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of names with a live lock
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
