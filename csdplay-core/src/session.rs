//! Per-document playback session: the engine instance and the resources
//! installed into it.

use std::collections::HashSet;

use crate::engine::CsoundEngine;

/// Created empty; the engine is installed on the first play and reused
/// until [`PlaybackSession::teardown`]. The loaded set only grows while the
/// engine lives, since it mirrors the engine's filesystem.
#[derive(Default)]
pub struct PlaybackSession {
    engine: Option<Box<dyn CsoundEngine>>,
    loaded: HashSet<String>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine_mut(&mut self) -> Option<&mut (dyn CsoundEngine + 'static)> {
        self.engine.as_deref_mut()
    }

    pub fn install(&mut self, engine: Box<dyn CsoundEngine>) {
        self.engine = Some(engine);
    }

    pub fn loaded(&self) -> &HashSet<String> {
        &self.loaded
    }

    pub fn merge_loaded<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.loaded.extend(names);
    }

    /// Drop the engine and forget what it had loaded.
    pub fn teardown(&mut self) -> Option<Box<dyn CsoundEngine>> {
        self.loaded.clear();
        self.engine.take()
    }
}
