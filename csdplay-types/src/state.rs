use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the single engine instance behind a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }

    /// Playing or paused: the engine holds a running performance.
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-valued gate for the log dialog.
///
/// `Unopened` is the state before any log output has been shown. Open
/// requests are honoured only from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogDialogState {
    #[default]
    Unopened,
    Open,
    Closed,
}

/// Controller-owned read state. UI layers read this for display; engine
/// events and user actions update it through [`crate::reduce`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub playback: PlaybackState,
    pub log_dialog: LogDialogState,
    pub gui_dialog_open: bool,
    /// Content of the document's embedded UI-description block, if any.
    pub gui_code: Option<String>,
}

impl ControllerState {
    pub fn controls(&self) -> ControlGates {
        ControlGates::from_state(self)
    }
}

/// Which transport buttons are enabled for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlGates {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
    pub open_log: bool,
}

impl ControlGates {
    pub fn from_state(state: &ControllerState) -> Self {
        let playback = state.playback;
        Self {
            // Enabled while paused: play doubles as resume.
            play: !matches!(playback, PlaybackState::Playing | PlaybackState::Loading),
            pause: playback == PlaybackState::Playing,
            stop: playback.is_active(),
            open_log: state.log_dialog == LogDialogState::Closed,
        }
    }
}
