use std::fs::File;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use csdplay_core::catalog::ResourceCatalog;
use csdplay_core::config::Config;
use csdplay_core::controller::delay;
use csdplay_core::document::{EditorBuffer, EditorMode};
use csdplay_core::engine::ProcessEngineFactory;
use csdplay_core::event_log::LogReader;
use csdplay_core::provision::{HttpResourceSource, ResourceProvisioner};
use csdplay_core::PlaybackController;
use csdplay_types::{Notification, PlaybackState};

const USAGE: &str = "usage: csdplay <file.csd> [--verbose] [--base-url URL]";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("csdplay")
        .join("csdplay.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(file) => file,
        Err(_) => match File::create(std::env::temp_dir().join("csdplay.log")) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("csdplay: cannot create log file: {}", e);
                return;
            }
        },
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("csdplay: logger already initialized");
        return;
    }

    log::info!("csdplay starting (log level: {:?})", log_level);
}

/// What the player has seen of the performance so far.
#[derive(Debug, Default)]
struct Progress {
    started: bool,
    finished: bool,
}

impl Progress {
    fn apply(&mut self, updates: impl IntoIterator<Item = Notification>) {
        for update in updates {
            match update {
                Notification::StateChanged(PlaybackState::Playing) => self.started = true,
                Notification::StateChanged(PlaybackState::Idle) if self.started => {
                    self.finished = true
                }
                Notification::StoreGuiCode(code) => {
                    log::info!("document carries a web UI block ({} bytes), not shown", code.len());
                }
                _ => {}
            }
        }
    }
}

fn print_log(reader: Option<&LogReader>) {
    for entry in reader.map(LogReader::drain).unwrap_or_default() {
        println!("{}", entry.message);
    }
}

/// First argument that is neither a flag nor a flag's value.
fn document_path(args: &[String]) -> Option<&str> {
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--base-url" => {
                rest.next();
            }
            a if a.starts_with('-') => {}
            a => return Some(a),
        }
    }
    None
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let base_url = args
        .iter()
        .position(|a| a == "--base-url")
        .and_then(|i| args.get(i + 1).cloned());

    let Some(path) = document_path(&args) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let raw = std::fs::read_to_string(path)?;
    if EditorMode::classify(&raw, None) != EditorMode::CsoundDocument {
        log::warn!("{} has no <CsoundSynthesizer> section", path);
    }
    let buffer = EditorBuffer::new(raw);

    let mut config = Config::load();
    if let Some(url) = base_url {
        config.set_base_url(url);
    }

    let catalog = Arc::new(ResourceCatalog::load(config.catalog_path()));
    let source = HttpResourceSource::from_config(&config).map_err(io::Error::other)?;
    let provisioner = ResourceProvisioner::new(catalog, source);
    let factory = ProcessEngineFactory::from_config(&config);

    let mut controller =
        PlaybackController::new(factory, provisioner).with_output_option(config.output_option());
    let updates = controller.subscribe();
    let log_reader = controller.take_log_reader();

    let mut progress = Progress::default();
    let played = controller.play(buffer.text()).await;
    controller.drain_events();
    progress.apply(updates.try_iter());
    print_log(log_reader.as_ref());
    if let Err(e) = played {
        eprintln!("csdplay: {}", e);
        std::process::exit(1);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    while !progress.finished {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                log::info!("interrupted, stopping");
                if controller.stop().await.is_err() {
                    progress.finished = true;
                }
            }
            _ = delay(POLL_INTERVAL) => {}
        }

        controller.drain_events();
        progress.apply(updates.try_iter());
        print_log(log_reader.as_ref());
    }

    if let Err(e) = controller.reset().await {
        log::warn!("reset failed: {}", e);
    }
    log::info!("csdplay exiting");
    Ok(())
}
