//! # csdplay-types
//!
//! Shared type definitions for csdplay: playback state, engine events,
//! controller notifications and the pure reducers that move state between them.
//! Nothing here performs I/O; csdplay-core owns the engine and the network.

pub mod action;
pub mod reduce;
mod state;

pub use action::{ControlAction, EngineEvent, EngineEventKind, Notification, PlaybackChange};
pub use state::{ControlGates, ControllerState, LogDialogState, PlaybackState};
