//! Pure state reducers for [`ControllerState`].
//!
//! The controller calls these for every engine event and user action.
//! Reducers mutate state only; they never build notifications or touch the
//! engine. Each returns `true` when the state actually changed.

use crate::{ControllerState, LogDialogState, PlaybackChange, PlaybackState};

/// A play request was accepted: enter `Loading`.
pub fn begin_loading(state: &mut ControllerState) -> bool {
    set_playback(state, PlaybackState::Loading)
}

/// Apply an engine-reported transition.
///
/// `Play` is honoured from loading and paused; a stale play event after the
/// engine stopped is ignored. `Pause` only applies while playing, so loading
/// never jumps straight to paused. `Stop` always returns to idle and closes
/// the auxiliary dialog.
pub fn reduce_playback_change(state: &mut ControllerState, change: PlaybackChange) -> bool {
    match change {
        PlaybackChange::Play => match state.playback {
            PlaybackState::Loading | PlaybackState::Paused => {
                set_playback(state, PlaybackState::Playing)
            }
            PlaybackState::Playing | PlaybackState::Idle => false,
        },
        PlaybackChange::Pause => match state.playback {
            PlaybackState::Playing => set_playback(state, PlaybackState::Paused),
            _ => false,
        },
        PlaybackChange::Stop => {
            state.gui_dialog_open = false;
            set_playback(state, PlaybackState::Idle)
        }
    }
}

/// Play failed before the engine reported anything: fall back to idle and
/// shut the auxiliary dialog this play may have opened.
pub fn abort_loading(state: &mut ControllerState) -> bool {
    if state.playback == PlaybackState::Loading {
        state.gui_dialog_open = false;
        set_playback(state, PlaybackState::Idle)
    } else {
        false
    }
}

/// First log output opens the log dialog; later output leaves it alone.
pub fn reduce_log_message(state: &mut ControllerState) -> bool {
    if state.log_dialog == LogDialogState::Unopened {
        state.log_dialog = LogDialogState::Open;
        true
    } else {
        false
    }
}

/// User asked to reopen the log. Only a previously closed dialog reopens.
pub fn reduce_open_log(state: &mut ControllerState) -> bool {
    if state.log_dialog == LogDialogState::Closed {
        state.log_dialog = LogDialogState::Open;
        true
    } else {
        false
    }
}

pub fn reduce_close_log(state: &mut ControllerState) -> bool {
    if state.log_dialog == LogDialogState::Open {
        state.log_dialog = LogDialogState::Closed;
        true
    } else {
        false
    }
}

/// Store the embedded UI-description block and open its dialog.
pub fn reduce_gui_code(state: &mut ControllerState, code: String) {
    state.gui_code = Some(code);
    state.gui_dialog_open = true;
}

fn set_playback(state: &mut ControllerState, next: PlaybackState) -> bool {
    if state.playback == next {
        return false;
    }
    state.playback = next;
    true
}
