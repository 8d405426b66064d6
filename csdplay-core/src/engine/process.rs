//! `ProcessEngine`: drives the `csound` command-line binary.
//!
//! Each instance owns a private temporary directory that stands in for the
//! engine filesystem: resources and the compiled document are written there
//! and csound runs with it as its working directory. Output lines become
//! message events; process start and exit become the lifecycle events.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use csdplay_types::{EngineEvent, EngineEventKind};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{CsoundEngine, EngineError, EngineFactory, EngineResult, Listener, Listeners};
use crate::config::Config;

const DOCUMENT_FILE: &str = "document.csd";

pub struct ProcessEngineFactory {
    binary: String,
}

impl ProcessEngineFactory {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.engine_binary())
    }
}

#[async_trait]
impl EngineFactory for ProcessEngineFactory {
    async fn instantiate(&self) -> EngineResult<Box<dyn CsoundEngine>> {
        let engine = ProcessEngine::new(self.binary.clone())?;
        log::info!(target: "engine", "csound workdir {}", engine.workdir().display());
        Ok(Box::new(engine))
    }
}

/// A running (or runnable) csound child process.
struct Performance {
    pid: Option<u32>,
    kill_tx: oneshot::Sender<()>,
    monitor: JoinHandle<()>,
}

pub struct ProcessEngine {
    binary: String,
    workdir: TempDir,
    options: Vec<String>,
    document: Option<PathBuf>,
    listeners: Listeners,
    performance: Option<Performance>,
}

impl ProcessEngine {
    pub fn new(binary: impl Into<String>) -> EngineResult<Self> {
        let workdir = tempfile::Builder::new().prefix("csdplay-").tempdir()?;
        Ok(Self {
            binary: binary.into(),
            workdir,
            options: Vec::new(),
            document: None,
            listeners: Listeners::new(),
            performance: None,
        })
    }

    pub fn workdir(&self) -> &std::path::Path {
        self.workdir.path()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    fn is_running(&self) -> bool {
        self.performance
            .as_ref()
            .is_some_and(|p| !p.monitor.is_finished())
    }

    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> EngineResult {
        let pid = match self.performance.as_ref().and_then(|p| p.pid) {
            Some(pid) if self.is_running() => pid,
            _ => return Err(EngineError::from("csound is not running")),
        };
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn signal(&self, _signal: i32) -> EngineResult {
        Err(EngineError::from("pause/resume needs a unix host"))
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, listeners: Listeners) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        listeners.emit(&EngineEvent::Message(line));
    }
}

#[cfg(unix)]
fn wake(pid: u32) {
    // SAFETY: kill(2) has no memory-safety preconditions.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGCONT);
    }
}

#[cfg(not(unix))]
fn wake(_pid: u32) {}

#[cfg(unix)]
const SIGSTOP: libc::c_int = libc::SIGSTOP;
#[cfg(unix)]
const SIGCONT: libc::c_int = libc::SIGCONT;
#[cfg(not(unix))]
const SIGSTOP: i32 = 0;
#[cfg(not(unix))]
const SIGCONT: i32 = 0;

#[async_trait]
impl CsoundEngine for ProcessEngine {
    async fn set_option(&mut self, option: &str) -> EngineResult {
        self.options.push(option.to_string());
        Ok(())
    }

    fn on(&mut self, kind: EngineEventKind, listener: Listener) {
        self.listeners.on(kind, listener);
    }

    async fn remove_all_listeners(&mut self) -> EngineResult {
        self.listeners.remove_all();
        Ok(())
    }

    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult {
        if name.is_empty() || name.contains(&['/', '\\'][..]) || name == ".." {
            return Err(EngineError(format!("invalid file name {:?}", name)));
        }
        tokio::fs::write(self.workdir.path().join(name), bytes).await?;
        Ok(())
    }

    async fn compile_document_text(&mut self, text: &str) -> EngineResult {
        if !text.contains("<CsoundSynthesizer>") {
            return Err(EngineError::from("not a <CsoundSynthesizer> document"));
        }
        let path = self.workdir.path().join(DOCUMENT_FILE);
        tokio::fs::write(&path, text).await?;
        self.document = Some(path);
        Ok(())
    }

    async fn start(&mut self) -> EngineResult {
        if self.is_running() {
            return Err(EngineError::from("csound is already running"));
        }
        let document = self
            .document
            .clone()
            .ok_or_else(|| EngineError::from("no document compiled"))?;

        let mut child = Command::new(&self.binary)
            .args(&self.options)
            .arg(&document)
            .current_dir(self.workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError(format!("could not run {}: {}", self.binary, e)))?;
        let pid = child.id();
        log::info!(target: "engine", "csound started (pid {:?})", pid);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let listeners = self.listeners.clone();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        listeners.emit(&EngineEvent::RenderStarted);
        listeners.emit(&EngineEvent::Play);

        let monitor = tokio::spawn(async move {
            let out_task = stdout.map(|s| tokio::spawn(forward_lines(s, listeners.clone())));
            let err_task = stderr.map(|s| tokio::spawn(forward_lines(s, listeners.clone())));

            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    let _ = child.start_kill();
                    child.wait().await
                }
            };
            // Flush remaining output before announcing the end.
            if let Some(task) = out_task {
                let _ = task.await;
            }
            if let Some(task) = err_task {
                let _ = task.await;
            }
            match status {
                Ok(status) => log::info!(target: "engine", "csound exited: {}", status),
                Err(e) => log::warn!(target: "engine", "csound wait failed: {}", e),
            }
            listeners.emit(&EngineEvent::RenderEnded);
            listeners.emit(&EngineEvent::Stop);
        });

        self.performance = Some(Performance {
            pid,
            kill_tx,
            monitor,
        });
        Ok(())
    }

    async fn stop(&mut self) -> EngineResult {
        let Some(performance) = self.performance.take() else {
            return Ok(());
        };
        let _ = performance.kill_tx.send(());
        // A SIGSTOPped child cannot exit until continued.
        if let Some(pid) = performance.pid {
            if !performance.monitor.is_finished() {
                wake(pid);
            }
        }
        performance
            .monitor
            .await
            .map_err(|e| EngineError(format!("csound monitor failed: {}", e)))?;
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult {
        self.signal(SIGSTOP)?;
        self.listeners.emit(&EngineEvent::Pause);
        Ok(())
    }

    async fn resume(&mut self) -> EngineResult {
        self.signal(SIGCONT)?;
        self.listeners.emit(&EngineEvent::Play);
        Ok(())
    }
}
