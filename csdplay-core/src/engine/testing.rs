//! Recording engine doubles for unit and integration tests.
//!
//! `TestEngine` records every call and emits the events a real engine would
//! (play on start, pause on pause, stop on stop) synchronously to whatever
//! listeners are registered at that moment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use csdplay_types::{EngineEvent, EngineEventKind};

use super::{CsoundEngine, EngineError, EngineFactory, EngineResult, Listener, Listeners};

/// Recorded engine operations, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOp {
    SetOption(String),
    RemoveAllListeners,
    WriteFile { name: String, len: usize },
    Compile(String),
    Start,
    Stop,
    Pause,
    Resume,
}

#[derive(Default)]
struct Inner {
    ops: Mutex<Vec<TestOp>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    listeners: Listeners,
    compile_error: Mutex<Option<String>>,
    silent: AtomicBool,
}

/// Cloneable handle: the controller owns one clone, the test keeps another.
#[derive(Clone, Default)]
pub struct TestEngine {
    inner: Arc<Inner>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<TestOp> {
        self.inner.ops.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.inner.ops.lock().unwrap().clear();
    }

    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.inner.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.files.lock().unwrap().get(name).cloned()
    }

    pub fn listener_count(&self, kind: EngineEventKind) -> usize {
        self.inner.listeners.count(kind)
    }

    /// Make the next compile calls fail with `message`.
    pub fn fail_compile(&self, message: impl Into<String>) {
        *self.inner.compile_error.lock().unwrap() = Some(message.into());
    }

    /// Stop emitting lifecycle events from transport calls; tests then
    /// drive events by hand through [`TestEngine::emit`].
    pub fn set_silent(&self, silent: bool) {
        self.inner.silent.store(silent, Ordering::SeqCst);
    }

    pub fn emit(&self, event: EngineEvent) {
        self.inner.listeners.emit(&event);
    }

    fn record(&self, op: TestOp) {
        self.inner.ops.lock().unwrap().push(op);
    }

    fn lifecycle(&self, events: &[EngineEvent]) {
        if self.inner.silent.load(Ordering::SeqCst) {
            return;
        }
        for event in events {
            self.inner.listeners.emit(event);
        }
    }
}

#[async_trait]
impl CsoundEngine for TestEngine {
    async fn set_option(&mut self, option: &str) -> EngineResult {
        self.record(TestOp::SetOption(option.to_string()));
        Ok(())
    }

    fn on(&mut self, kind: EngineEventKind, listener: Listener) {
        self.inner.listeners.on(kind, listener);
    }

    async fn remove_all_listeners(&mut self) -> EngineResult {
        self.record(TestOp::RemoveAllListeners);
        self.inner.listeners.remove_all();
        Ok(())
    }

    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult {
        self.record(TestOp::WriteFile {
            name: name.to_string(),
            len: bytes.len(),
        });
        self.inner
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn compile_document_text(&mut self, text: &str) -> EngineResult {
        self.record(TestOp::Compile(text.to_string()));
        match self.inner.compile_error.lock().unwrap().clone() {
            Some(message) => Err(EngineError(message)),
            None => Ok(()),
        }
    }

    async fn start(&mut self) -> EngineResult {
        self.record(TestOp::Start);
        self.lifecycle(&[EngineEvent::RenderStarted, EngineEvent::Play]);
        Ok(())
    }

    async fn stop(&mut self) -> EngineResult {
        self.record(TestOp::Stop);
        self.lifecycle(&[EngineEvent::RenderEnded, EngineEvent::Stop]);
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult {
        self.record(TestOp::Pause);
        self.lifecycle(&[EngineEvent::Pause]);
        Ok(())
    }

    async fn resume(&mut self) -> EngineResult {
        self.record(TestOp::Resume);
        self.lifecycle(&[EngineEvent::Play]);
        Ok(())
    }
}

/// Hands out clones of one `TestEngine` and counts instantiations.
#[derive(Clone, Default)]
pub struct TestEngineFactory {
    engine: TestEngine,
    instantiations: Arc<AtomicUsize>,
}

impl TestEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self) -> TestEngine {
        self.engine.clone()
    }

    pub fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineFactory for TestEngineFactory {
    async fn instantiate(&self) -> EngineResult<Box<dyn CsoundEngine>> {
        self.instantiations.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.engine.clone()))
    }
}
