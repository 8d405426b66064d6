//! # csdplay-core
//!
//! Playback for Csound documents shown in an editor: fetch the samples a
//! document references, hand everything to a Csound engine and track the
//! engine's lifecycle for the transport controls.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use csdplay_core::catalog::ResourceCatalog;
//! use csdplay_core::config::Config;
//! use csdplay_core::controller::PlaybackController;
//! use csdplay_core::engine::ProcessEngineFactory;
//! use csdplay_core::provision::{HttpResourceSource, ResourceProvisioner};
//!
//! let config = Config::load();
//! let catalog = Arc::new(ResourceCatalog::load(config.catalog_path()));
//! let source = HttpResourceSource::from_config(&config)?;
//! let mut controller = PlaybackController::new(
//!     ProcessEngineFactory::from_config(&config),
//!     ResourceProvisioner::new(catalog, source),
//! )
//! .with_output_option(config.output_option());
//!
//! let updates = controller.subscribe();
//! controller.play(&document).await?;
//! // Poll engine events (each UI frame, or on a timer):
//! controller.drain_events();
//! ```
//!
//! ## Module Overview
//!
//! - [`controller`]: `PlaybackController`, the idle/loading/playing/paused machine
//! - [`provision`]: `ResourceProvisioner` and the `ResourceSource` trait (HTTP, in-memory)
//! - [`catalog`]: the ordered list of fetchable resource names
//! - [`engine`]: `CsoundEngine`/`EngineFactory` traits, the `csound` process engine, test doubles
//! - [`session`]: engine instance plus loaded-resource set for one document
//! - [`document`]: entity decoding, editor modes, embedded UI-description blocks
//! - [`event_log`]: append-only engine message log
//! - [`config`]: TOML configuration (embedded defaults + user override)

pub mod catalog;
pub mod config;
pub mod controller;
pub mod document;
pub mod engine;
pub mod event_log;
pub mod provision;
pub mod session;

pub use controller::{PlaybackController, PlaybackError, PlaybackResult};
pub use csdplay_types as types;
