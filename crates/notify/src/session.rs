//! Last-primary-session tracking.
//!
//! Sub-agent events carry no deliverable target of their own; the router
//! falls back to the most recently seen primary session. That value is
//! advisory, last-write-wins, and persisted as a single small record so it
//! survives process restarts.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use tracing::warn;

use tollgate_core::EventContext;

/// Durable storage for one small string record. Absence is non-fatal.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, value: &str);
}

/// Stores the record in a single file, creating parent directories on
/// write. Read and write failures degrade to "no record" with a warning.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let trimmed = content.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read session record");
                None
            }
        }
    }

    fn save(&self, value: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "failed to create session record directory");
                return;
            }
        }
        if let Err(e) = fs::write(&self.path, value) {
            warn!(path = %self.path.display(), error = %e, "failed to write session record");
        }
    }
}

/// In-memory store for hosts that do not want persistence, and for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    value: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Option<String> {
        self.value.lock().expect("state store lock poisoned").clone()
    }

    fn save(&self, value: &str) {
        *self.value.lock().expect("state store lock poisoned") = Some(value.to_string());
    }
}

/// Tracks the most recent primary (non-sub-agent) session identifier.
///
/// Constructor-injected wherever it is needed; never a global. Concurrent
/// writers race benignly: the value is advisory routing information.
pub struct SessionTracker {
    last_primary: RwLock<Option<String>>,
    store: Box<dyn StateStore>,
}

impl SessionTracker {
    pub fn new(store: impl StateStore + 'static) -> Self {
        Self {
            last_primary: RwLock::new(None),
            store: Box::new(store),
        }
    }

    /// Record the session of a primary event. Sub-agent events are ignored.
    pub fn record(&self, ctx: &EventContext) {
        if ctx.is_subagent() {
            return;
        }
        let mut guard = self
            .last_primary
            .write()
            .expect("session tracker lock poisoned");
        if guard.as_deref() != Some(ctx.session_id.as_str()) {
            *guard = Some(ctx.session_id.clone());
            self.store.save(&ctx.session_id);
        }
    }

    /// Most recent primary session id, falling back to the durable record
    /// when the in-memory value is unset (fresh process).
    pub fn last_primary(&self) -> Option<String> {
        if let Some(id) = self
            .last_primary
            .read()
            .expect("session tracker lock poisoned")
            .clone()
        {
            return Some(id);
        }
        self.store.load()
    }
}
