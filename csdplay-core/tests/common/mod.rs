#![allow(dead_code)]

use std::sync::Arc;

use crossbeam_channel::Receiver;
use csdplay_core::catalog::ResourceCatalog;
use csdplay_core::engine::testing::{TestEngine, TestEngineFactory};
use csdplay_core::provision::{ResourceProvisioner, StaticSource};
use csdplay_core::PlaybackController;
use csdplay_types::Notification;

pub const CATALOG: &[&str] = &["BratscheMono.wav", "circularstring", "fox.wav", "piano.wav"];

pub struct Rig {
    pub controller: PlaybackController,
    pub factory: TestEngineFactory,
    pub source: Arc<StaticSource>,
    pub updates: Receiver<Notification>,
}

impl Rig {
    pub fn engine(&self) -> TestEngine {
        self.factory.engine()
    }

    /// Everything published since the last call.
    pub fn notifications(&self) -> Vec<Notification> {
        self.updates.try_iter().collect()
    }
}

pub fn source() -> StaticSource {
    StaticSource::new()
        .with_file("BratscheMono.wav", vec![1u8; 32])
        .with_file("circularstring-128", vec![2u8; 128])
        .with_file("fox.wav", vec![3u8; 64])
}

pub fn rig() -> Rig {
    rig_with_source(Arc::new(source()))
}

pub fn rig_with_source(source: Arc<StaticSource>) -> Rig {
    let factory = TestEngineFactory::new();
    let catalog = Arc::new(ResourceCatalog::new(CATALOG.iter().copied()));
    let provisioner = ResourceProvisioner::new(catalog, Arc::clone(&source));
    let mut controller = PlaybackController::new(factory.clone(), provisioner);
    let updates = controller.subscribe();
    Rig {
        controller,
        factory,
        source,
        updates,
    }
}

pub fn csd(orchestra: &str) -> String {
    format!(
        "<CsoundSynthesizer>\n<CsOptions>\n</CsOptions>\n\
         <CsInstruments>\n{}\n</CsInstruments>\n\
         <CsScore>\ni 1 0 1\n</CsScore>\n</CsoundSynthesizer>",
        orchestra
    )
}
