//! Engine events, user control actions and controller notifications.

use crate::PlaybackState;

/// Event names the engine emits; listeners are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEventKind {
    Message,
    RenderStarted,
    Play,
    RenderEnded,
    Stop,
    Pause,
}

impl EngineEventKind {
    pub const ALL: [EngineEventKind; 6] = [
        EngineEventKind::Message,
        EngineEventKind::RenderStarted,
        EngineEventKind::Play,
        EngineEventKind::RenderEnded,
        EngineEventKind::Stop,
        EngineEventKind::Pause,
    ];

    /// Wire name used by the engine's event emitter.
    pub fn as_str(self) -> &'static str {
        match self {
            EngineEventKind::Message => "message",
            EngineEventKind::RenderStarted => "renderStarted",
            EngineEventKind::Play => "play",
            EngineEventKind::RenderEnded => "renderEnded",
            EngineEventKind::Stop => "stop",
            EngineEventKind::Pause => "pause",
        }
    }
}

/// An event raised by the engine, delivered to registered listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Message(String),
    RenderStarted,
    Play,
    RenderEnded,
    Stop,
    Pause,
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::Message(_) => EngineEventKind::Message,
            EngineEvent::RenderStarted => EngineEventKind::RenderStarted,
            EngineEvent::Play => EngineEventKind::Play,
            EngineEvent::RenderEnded => EngineEventKind::RenderEnded,
            EngineEvent::Stop => EngineEventKind::Stop,
            EngineEvent::Pause => EngineEventKind::Pause,
        }
    }

    /// The playback transition this event drives, if any.
    pub fn playback_change(&self) -> Option<PlaybackChange> {
        match self {
            EngineEvent::Message(_) => None,
            EngineEvent::RenderStarted | EngineEvent::Play => Some(PlaybackChange::Play),
            EngineEvent::RenderEnded | EngineEvent::Stop => Some(PlaybackChange::Stop),
            EngineEvent::Pause => Some(PlaybackChange::Pause),
        }
    }
}

/// Coarse transition reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackChange {
    Play,
    Pause,
    Stop,
}

/// User-facing transport actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Play,
    TogglePause,
    Stop,
}

impl ControlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Play => "play",
            ControlAction::TogglePause => "pause",
            ControlAction::Stop => "stop",
        }
    }
}

/// Published by the controller to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StateChanged(PlaybackState),
    /// One engine message, already appended to the log.
    Log(String),
    /// Embedded UI-description payload for the auxiliary dialog.
    StoreGuiCode(String),
    OpenGuiDialog,
    CloseGuiDialog,
    OpenLogDialog,
    /// Resolved names newly installed into the engine filesystem.
    ResourcesLoaded(Vec<String>),
}
