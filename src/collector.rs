//! Non-blocking reader over the output of every live fetch worker.

use std::io;
use std::time::Duration;

use futures::future::select_all;
use futures::FutureExt;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;

use crate::status::NO_RUNS;
use crate::worker::{FetchPool, FetchWorker, WorkerState};

const READ_CHUNK: usize = 512;

#[derive(Debug)]
pub enum ReadOutcome {
    Data(Vec<u8>),
    Eof,
    Failed(io::Error),
}

impl FetchWorker {
    /// Read whatever is available on the output stream. Cancel safe: dropping
    /// the future before it resolves loses no data.
    pub async fn read_chunk(&mut self) -> ReadOutcome {
        let Some(stdout) = self.stdout.as_mut() else {
            return ReadOutcome::Eof;
        };
        let mut buf = [0u8; READ_CHUNK];
        match stdout.read(&mut buf).await {
            Ok(0) => ReadOutcome::Eof,
            Ok(n) => ReadOutcome::Data(buf[..n].to_vec()),
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    /// Fold one read into the worker and its repository's raw status.
    ///
    /// The first complete line is the status; anything after it is ignored.
    /// A stream that closes without a single byte means the repository has
    /// no runs.
    pub fn absorb(&mut self, outcome: ReadOutcome, status: &mut String) {
        match outcome {
            ReadOutcome::Data(bytes) => {
                self.state = WorkerState::Streaming;
                if self.line_done {
                    return;
                }
                self.buffer.extend_from_slice(&bytes);
                if let Some(line) = first_line(&self.buffer) {
                    *status = line;
                    self.line_done = true;
                }
            }
            ReadOutcome::Eof => {
                self.finish_stream(status);
                self.state = WorkerState::Completed;
            }
            ReadOutcome::Failed(e) => {
                tracing::warn!("fetch {}: read failed: {}", self.repo, e);
                self.finish_stream(status);
                self.state = WorkerState::Failed;
            }
        }
    }

    fn finish_stream(&mut self, status: &mut String) {
        self.stdout = None;
        if self.state == WorkerState::Spawned {
            *status = NO_RUNS.to_string();
        } else if !self.line_done {
            // unterminated last line
            *status = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
            self.line_done = true;
        }
        self.try_reap();
    }
}

fn first_line(buffer: &[u8]) -> Option<String> {
    let end = buffer.iter().position(|&b| b == b'\n')?;
    let line = String::from_utf8_lossy(&buffer[..end]);
    Some(line.strip_suffix('\r').unwrap_or(&*line).to_string())
}

/// Wait up to `wait` for any worker's output to become readable, then take
/// everything that is ready. Returns the number of reads handled.
///
/// With nothing to read the full wait elapses, which paces the event loop.
pub async fn collect(pool: &mut FetchPool, statuses: &mut [String], wait: Duration) -> usize {
    let deadline = Instant::now() + wait;
    let reading: Vec<usize> = pool
        .workers()
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_reading())
        .map(|(i, _)| i)
        .collect();

    if reading.is_empty() {
        tokio::time::sleep_until(deadline).await;
        pool.reap_finished();
        return 0;
    }

    let first = {
        let reads = pool
            .workers_mut()
            .iter_mut()
            .filter(|w| w.is_reading())
            .map(|w| Box::pin(w.read_chunk()));
        match tokio::time::timeout_at(deadline, select_all(reads)).await {
            Ok((outcome, index, _)) => Some((reading[index], outcome)),
            Err(_) => None,
        }
    };

    let mut handled = 0;
    if let Some((index, outcome)) = first {
        let worker = &mut pool.workers_mut()[index];
        let repo = worker.repo;
        worker.absorb(outcome, &mut statuses[repo]);
        handled += 1;

        for worker in pool.workers_mut().iter_mut().filter(|w| w.is_reading()) {
            let ready = worker.read_chunk().now_or_never();
            if let Some(outcome) = ready {
                let repo = worker.repo;
                worker.absorb(outcome, &mut statuses[repo]);
                handled += 1;
            }
        }
    }

    pool.reap_finished();
    handled
}
