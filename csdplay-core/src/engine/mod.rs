//! Engine abstraction: the external Csound runtime driven by the controller.
//!
//! `CsoundEngine` captures what the controller needs from a runtime (options,
//! an event emitter, a writable filesystem, compile and transport calls)
//! independently of how it runs. `ProcessEngine` drives the `csound`
//! command-line binary; `testing` holds recording doubles.

pub mod process;
pub mod testing;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use csdplay_types::{EngineEvent, EngineEventKind};

pub use process::{ProcessEngine, ProcessEngineFactory};

/// Result type for engine operations.
pub type EngineResult<T = ()> = Result<T, EngineError>;

/// Error from an engine operation, passed through untranslated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError(e.to_string())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError(s.to_string())
    }
}

pub type Listener = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Event emitter shared between an engine and its background tasks.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Mutex<Vec<(EngineEventKind, Listener)>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EngineEventKind, listener: Listener) {
        self.lock().push((kind, listener));
    }

    pub fn remove_all(&self) {
        self.lock().clear();
    }

    pub fn count(&self, kind: EngineEventKind) -> usize {
        self.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn total(&self) -> usize {
        self.lock().len()
    }

    /// Call every listener registered for the event's kind.
    pub fn emit(&self, event: &EngineEvent) {
        let kind = event.kind();
        // Clone out so a listener may register or remove without deadlocking.
        let matching: Vec<Listener> = self
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in matching {
            listener(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(EngineEventKind, Listener)>> {
        // Poisoned only if a listener panicked; the list is still valid.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One running Csound instance.
#[async_trait]
pub trait CsoundEngine: Send {
    /// Pass a command-line style option (e.g. `-odac`).
    async fn set_option(&mut self, option: &str) -> EngineResult;

    fn on(&mut self, kind: EngineEventKind, listener: Listener);

    async fn remove_all_listeners(&mut self) -> EngineResult;

    /// Write a file into the engine's private filesystem.
    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult;

    /// Compile a full `<CsoundSynthesizer>` document.
    async fn compile_document_text(&mut self, text: &str) -> EngineResult;

    async fn start(&mut self) -> EngineResult;

    async fn stop(&mut self) -> EngineResult;

    async fn pause(&mut self) -> EngineResult;

    async fn resume(&mut self) -> EngineResult;
}

/// Creates engine instances on the first play of a session.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn instantiate(&self) -> EngineResult<Box<dyn CsoundEngine>>;
}
