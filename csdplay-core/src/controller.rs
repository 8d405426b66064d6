//! PlaybackController: lifecycle state machine for one editor document.
//!
//! User actions (`play`, `toggle_pause`, `stop`) call into the engine;
//! the engine answers with events that land on a channel. `drain_events`
//! applies them through the reducers in `csdplay_types::reduce` and fans
//! the resulting notifications out to subscribers. Engine transport calls
//! never flip state directly: playing, paused and idle are only entered
//! when the engine says so.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use csdplay_types::reduce;
use csdplay_types::{
    ControlAction, ControlGates, ControllerState, EngineEvent, EngineEventKind, Notification,
    PlaybackChange, PlaybackState,
};

use crate::document;
use crate::engine::{CsoundEngine, EngineError, EngineFactory};
use crate::event_log::{LogEntry, LogReader, LogWriter};
use crate::provision::ResourceProvisioner;
use crate::session::PlaybackSession;

pub type PlaybackResult<T = ()> = Result<T, PlaybackError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The engine rejected a call (instantiate, compile, start, ...).
    Engine(EngineError),
    /// The action is not available in the current state.
    InvalidTransition {
        action: ControlAction,
        state: PlaybackState,
    },
}

impl From<EngineError> for PlaybackError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine error: {}", e),
            Self::InvalidTransition { action, state } => {
                write!(f, "cannot {} while {}", action.as_str(), state)
            }
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Suspend the current task; used to space out polling of engine events.
pub async fn delay(duration: Duration) {
    tokio::time::sleep(duration).await;
}

pub struct PlaybackController {
    factory: Box<dyn EngineFactory>,
    provisioner: ResourceProvisioner,
    session: PlaybackSession,
    state: ControllerState,
    output_option: String,
    log: LogWriter,
    log_reader: Option<LogReader>,
    event_tx: Sender<EngineEvent>,
    event_rx: Receiver<EngineEvent>,
    subscribers: Vec<Sender<Notification>>,
}

impl PlaybackController {
    pub fn new(factory: impl EngineFactory + 'static, provisioner: ResourceProvisioner) -> Self {
        let (log, log_reader) = LogWriter::new();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        Self {
            factory: Box::new(factory),
            provisioner,
            session: PlaybackSession::new(),
            state: ControllerState::default(),
            output_option: "-odac".to_string(),
            log,
            log_reader: Some(log_reader),
            event_tx,
            event_rx,
            subscribers: Vec::new(),
        }
    }

    /// Option applied to each new engine before anything else.
    pub fn with_output_option(mut self, option: impl Into<String>) -> Self {
        self.output_option = option.into();
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn playback(&self) -> PlaybackState {
        self.state.playback
    }

    pub fn controls(&self) -> ControlGates {
        self.state.controls()
    }

    pub fn has_engine(&self) -> bool {
        self.session.has_engine()
    }

    pub fn loaded_resources(&self) -> &HashSet<String> {
        self.session.loaded()
    }

    pub fn log_history(&self) -> &[Arc<LogEntry>] {
        self.log.history()
    }

    /// The log display's end of the message log. Available once.
    pub fn take_log_reader(&mut self) -> Option<LogReader> {
        self.log_reader.take()
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Start playback of `document`, or resume when paused.
    ///
    /// The first call creates the engine; later calls reuse it after
    /// clearing its listeners and stopping it. Resources are installed,
    /// then the document is compiled, then the engine is started, each
    /// step finishing before the next. On failure the error is logged,
    /// the state falls back to idle and the error is returned.
    pub async fn play(&mut self, document: &str) -> PlaybackResult {
        self.drain_events();

        // Play doubles as resume while paused.
        if self.state.playback == PlaybackState::Paused {
            return self.toggle_pause().await;
        }
        if self.state.playback != PlaybackState::Idle {
            return Err(self.rejected(ControlAction::Play));
        }

        if reduce::begin_loading(&mut self.state) {
            self.notify(Notification::StateChanged(self.state.playback));
        }

        match self.load_and_start(document).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!(target: "playback", "play failed: {}", e);
                let mut out = Vec::new();
                self.record_log(format!("error: {}", e), &mut out);
                self.transition(&mut out, reduce::abort_loading);
                self.publish(&out);
                Err(e)
            }
        }
    }

    async fn load_and_start(&mut self, document: &str) -> PlaybackResult {
        match self.session.engine_mut() {
            Some(engine) => {
                log::debug!(target: "playback", "replaying on existing engine");
                engine.remove_all_listeners().await?;
                engine.stop().await?;
                register_listeners(engine, &self.event_tx);
            }
            None => {
                let mut engine = self.factory.instantiate().await?;
                engine.set_option(&self.output_option).await?;
                if let Some(code) = document::web_elements(document) {
                    reduce::reduce_gui_code(&mut self.state, code.clone());
                    self.notify(Notification::StoreGuiCode(code));
                    self.notify(Notification::OpenGuiDialog);
                }
                register_listeners(engine.as_mut(), &self.event_tx);
                self.session.install(engine);
            }
        }

        let fetched = self
            .provisioner
            .diff_and_fetch(document, self.session.loaded())
            .await;

        let engine = self
            .session
            .engine_mut()
            .ok_or_else(|| EngineError::from("engine missing after install"))?;
        for (name, bytes) in fetched.iter() {
            engine.write_file(name, bytes).await?;
        }
        let installed: Vec<String> = fetched.names().map(str::to_string).collect();
        if !installed.is_empty() {
            log::info!(target: "playback", "installed resources: {}", installed.join(", "));
            self.session.merge_loaded(installed.iter().cloned());
            self.notify(Notification::ResourcesLoaded(installed));
        }

        let engine = self
            .session
            .engine_mut()
            .ok_or_else(|| EngineError::from("engine missing after install"))?;
        engine.compile_document_text(document).await?;
        engine.start().await?;
        Ok(())
    }

    /// Pause while playing, resume while paused.
    pub async fn toggle_pause(&mut self) -> PlaybackResult {
        self.drain_events();
        let state = self.state.playback;
        if !state.is_active() || !self.session.has_engine() {
            return Err(self.rejected(ControlAction::TogglePause));
        }
        let Some(engine) = self.session.engine_mut() else {
            return Ok(());
        };
        if state == PlaybackState::Playing {
            engine.pause().await?;
        } else {
            engine.resume().await?;
        }
        Ok(())
    }

    /// Ask the engine to stop. State returns to idle when the engine
    /// confirms with its stop event.
    pub async fn stop(&mut self) -> PlaybackResult {
        self.drain_events();
        if !self.state.playback.is_active() || !self.session.has_engine() {
            return Err(self.rejected(ControlAction::Stop));
        }
        if let Some(engine) = self.session.engine_mut() {
            engine.stop().await?;
        }
        Ok(())
    }

    /// Tear the session down: stop and drop the engine and forget loaded
    /// resources. The next play starts a fresh engine.
    pub async fn reset(&mut self) -> PlaybackResult {
        self.drain_events();
        if self.state.playback == PlaybackState::Loading {
            return Err(self.rejected(ControlAction::Stop));
        }
        if let Some(mut engine) = self.session.teardown() {
            engine.remove_all_listeners().await?;
            engine.stop().await?;
        }
        let mut out = Vec::new();
        self.transition(&mut out, |state| {
            reduce::reduce_playback_change(state, PlaybackChange::Stop)
        });
        self.publish(&out);
        Ok(())
    }

    /// Reopen the log dialog. Returns false when the gate is shut.
    pub fn request_open_log(&mut self) -> bool {
        if reduce::reduce_open_log(&mut self.state) {
            self.notify(Notification::OpenLogDialog);
            true
        } else {
            false
        }
    }

    pub fn close_log(&mut self) {
        reduce::reduce_close_log(&mut self.state);
    }

    /// Apply every pending engine event and publish the resulting
    /// notifications. Returns them as well for callers that poll.
    pub fn drain_events(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply_event(event, &mut out);
        }
        self.publish(&out);
        out
    }

    fn apply_event(&mut self, event: EngineEvent, out: &mut Vec<Notification>) {
        if let EngineEvent::Message(message) = event {
            self.record_log(message, out);
            return;
        }
        let Some(change) = event.playback_change() else {
            return;
        };
        if self.transition(out, |state| reduce::reduce_playback_change(state, change)) {
            log::debug!(target: "playback", "{:?} -> {}", event, self.state.playback);
        }
    }

    /// Apply a playback reducer and queue what it changed: the new state,
    /// and `CloseGuiDialog` when the reducer shut the auxiliary dialog.
    fn transition(
        &mut self,
        out: &mut Vec<Notification>,
        reducer: impl FnOnce(&mut ControllerState) -> bool,
    ) -> bool {
        let gui_was_open = self.state.gui_dialog_open;
        let changed = reducer(&mut self.state);
        if changed {
            out.push(Notification::StateChanged(self.state.playback));
        }
        if gui_was_open && !self.state.gui_dialog_open {
            out.push(Notification::CloseGuiDialog);
        }
        changed
    }

    fn record_log(&mut self, message: String, out: &mut Vec<Notification>) {
        self.log.append(message.clone());
        out.push(Notification::Log(message));
        if reduce::reduce_log_message(&mut self.state) {
            out.push(Notification::OpenLogDialog);
        }
    }

    fn rejected(&self, action: ControlAction) -> PlaybackError {
        let state = self.state.playback;
        log::warn!(target: "playback", "rejected {} while {}", action.as_str(), state);
        PlaybackError::InvalidTransition { action, state }
    }

    fn notify(&mut self, notification: Notification) {
        self.subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    fn publish(&mut self, notifications: &[Notification]) {
        for n in notifications {
            self.notify(n.clone());
        }
    }
}

/// One listener per event kind, each forwarding into the controller's
/// event channel.
fn register_listeners(engine: &mut dyn CsoundEngine, tx: &Sender<EngineEvent>) {
    for kind in EngineEventKind::ALL {
        let tx = tx.clone();
        engine.on(
            kind,
            Arc::new(move |event: &EngineEvent| {
                let _ = tx.send(event.clone());
            }),
        );
    }
}
