//! Bounded pool of external status queries, one child process per repository.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use futures::future::select_all;
use tokio::process::{Child, ChildStdout};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CommandTemplate;
use crate::status::{LOADING, SPAWN_ERROR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Started, nothing read yet
    Spawned,
    /// At least one chunk of output received
    Streaming,
    /// Output closed normally
    Completed,
    /// Output could not be read
    Failed,
    /// Torn down by the pool
    Reaped,
}

/// One in-flight status query. Owns the child process and its stdout.
#[derive(Debug)]
pub struct FetchWorker {
    pub repo: usize,
    pub(crate) child: Child,
    pub(crate) stdout: Option<ChildStdout>,
    pub(crate) buffer: Vec<u8>,
    pub(crate) line_done: bool,
    pub(crate) state: WorkerState,
    exited: bool,
    started: Instant,
}

impl FetchWorker {
    fn spawn(repo: usize, name: &str, command: &CommandTemplate) -> io::Result<Self> {
        let mut cmd = command.command("repo", name);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdout not captured"))?;

        Ok(Self {
            repo,
            child,
            stdout: Some(stdout),
            buffer: Vec::new(),
            line_done: false,
            state: WorkerState::Spawned,
            exited: false,
            started: Instant::now(),
        })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// The output stream is still open.
    pub fn is_reading(&self) -> bool {
        self.stdout.is_some()
    }

    /// The process has not been reaped yet.
    pub fn is_running(&self) -> bool {
        !self.exited
    }

    fn is_finished(&self) -> bool {
        self.exited && self.stdout.is_none()
    }

    /// Reap the process if it has already exited. Never blocks.
    pub fn try_reap(&mut self) -> bool {
        if self.exited {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("fetch {} exited with {}", self.repo, status);
                self.exited = true;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("fetch {}: wait failed: {}", self.repo, e);
                self.exited = true;
            }
        }
        self.exited
    }

    /// Wait for the process to exit. Cancel safe.
    async fn wait_exit(&mut self) {
        match self.child.wait().await {
            Ok(status) => tracing::debug!("fetch {} exited with {}", self.repo, status),
            Err(e) => tracing::warn!("fetch {}: wait failed: {}", self.repo, e),
        }
        self.exited = true;
    }

    /// Kill the process if it is still running and reap it.
    async fn kill(&mut self) {
        if self.try_reap() {
            return;
        }
        tracing::debug!("killing fetch {}", self.repo);
        if let Err(e) = self.child.kill().await {
            tracing::warn!("fetch {}: kill failed: {}", self.repo, e);
        }
        self.exited = true;
    }

    /// Close the output stream, then kill and reap the process.
    async fn shutdown(&mut self) {
        self.stdout = None;
        self.kill().await;
        self.state = WorkerState::Reaped;
    }
}

pub struct FetchPool {
    command: CommandTemplate,
    max_concurrent: usize,
    fetch_timeout: Duration,
    workers: Vec<FetchWorker>,
    peak_running: usize,
    cancel: CancellationToken,
}

impl FetchPool {
    pub fn new(command: CommandTemplate, max_concurrent: usize, fetch_timeout: Duration) -> Self {
        Self {
            command,
            max_concurrent: max_concurrent.max(1),
            fetch_timeout,
            workers: Vec::new(),
            peak_running: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop admitting new workers once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> &[FetchWorker] {
        &self.workers
    }

    pub fn workers_mut(&mut self) -> &mut [FetchWorker] {
        &mut self.workers
    }

    /// Number of workers whose process has not exited.
    pub fn running(&self) -> usize {
        self.workers.iter().filter(|w| w.is_running()).count()
    }

    /// Highest number of simultaneously running workers seen so far.
    pub fn peak_running(&self) -> usize {
        self.peak_running
    }

    /// Start a fetch round: tear down the previous round, then spawn one
    /// query per repository in order, never exceeding the concurrency cap.
    ///
    /// Each spawned repository is reset to `loading`; a repository whose query
    /// cannot be started gets `spawn_error` and the round carries on. A
    /// cancelled pool stops spawning and leaves the rest untouched.
    pub async fn spawn_all(&mut self, repos: &[String], statuses: &mut [String]) {
        self.teardown().await;
        tracing::info!(
            "fetch round: {} repositories, {} at a time",
            repos.len(),
            self.max_concurrent
        );

        for (id, name) in repos.iter().enumerate() {
            if !self.admit().await {
                tracing::info!("fetch round cancelled after {} of {}", id, repos.len());
                return;
            }
            match FetchWorker::spawn(id, name, &self.command) {
                Ok(worker) => {
                    tracing::debug!("spawned fetch {} for {}", id, name);
                    statuses[id] = LOADING.to_string();
                    self.workers.push(worker);
                    self.peak_running = self.peak_running.max(self.running());
                }
                Err(e) => {
                    tracing::warn!("failed to start status query for {}: {}", name, e);
                    statuses[id] = SPAWN_ERROR.to_string();
                }
            }
        }
    }

    /// Block until a slot is free. When nothing exits within the fetch
    /// timeout the oldest running worker is killed. Returns false as soon as
    /// the pool is cancelled.
    async fn admit(&mut self) -> bool {
        while self.running() >= self.max_concurrent {
            let waits = self
                .workers
                .iter_mut()
                .filter(|w| w.is_running())
                .map(|w| Box::pin(w.wait_exit()));

            let exited = tokio::select! {
                _ = self.cancel.cancelled() => return false,
                waited = tokio::time::timeout(self.fetch_timeout, select_all(waits)) => waited.is_ok(),
            };

            if !exited {
                if let Some(oldest) = self
                    .workers
                    .iter_mut()
                    .filter(|w| w.is_running())
                    .min_by_key(|w| w.started)
                {
                    tracing::warn!("fetch {} timed out", oldest.repo);
                    oldest.kill().await;
                }
            }
        }
        !self.cancel.is_cancelled()
    }

    /// Reap exited processes and drop workers that are fully done.
    pub fn reap_finished(&mut self) {
        for worker in &mut self.workers {
            worker.try_reap();
        }
        self.workers.retain(|w| {
            if w.is_finished() {
                tracing::debug!("fetch {} done: {:?}", w.repo, w.state());
            }
            !w.is_finished()
        });
    }

    /// Close every stream and reap every process of the current round,
    /// killing those still running. Returns the number of workers torn down.
    pub async fn teardown(&mut self) -> usize {
        let count = self.workers.len();
        for worker in &mut self.workers {
            worker.shutdown().await;
        }
        self.workers.clear();
        count
    }
}
