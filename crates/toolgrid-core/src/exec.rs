//! Execution bridge: runs one item as a child process and streams its output.
//!
//! The producer task owns the child. Every stdout line is forwarded on a
//! bounded channel as soon as it is read; after the process exits the
//! producer appends stderr / exit-status lines and then exactly one
//! [`StreamEvent::Finished`] sentinel. Nothing is sent after the sentinel.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::RunnerConfig;
use crate::items::Item;

/// How a line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Child stdout, shown as-is (its own colour codes included).
    Output,
    /// Informational message (benign stderr, cancellation).
    Info,
    /// Failure message (stderr, nonzero exit, spawn error).
    Error,
}

/// One line headed for the output region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub kind: LineKind,
    pub text: String,
}

impl OutputLine {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Output,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Error,
            text: text.into(),
        }
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    /// Exit status; `None` when the process never started or died by signal.
    pub exit_code: Option<i32>,
    pub saw_stderr: bool,
    pub cancelled: bool,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        !self.cancelled && self.exit_code == Some(0)
    }
}

/// Message on the producer -> renderer channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Line(OutputLine),
    /// Sentinel: the last event of an execution.
    Finished(ExecutionResult),
}

/// Spawns items as child processes according to the runner config.
#[derive(Debug, Clone)]
pub struct ExecutionBridge {
    interpreter: String,
    env: BTreeMap<String, String>,
    benign_stderr: Vec<String>,
    capacity: usize,
}

impl ExecutionBridge {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            interpreter: config.interpreter.trim().to_string(),
            env: config.env.clone(),
            benign_stderr: config
                .benign_stderr
                .iter()
                .map(|s| s.trim().to_string())
                .collect(),
            capacity: config.channel_capacity.max(1),
        }
    }

    /// Starts `item` on a background task and returns the receiving end of
    /// its output channel.
    ///
    /// Must be called from within a tokio runtime. Firing `cancel` kills the
    /// child; the stream still ends with a sentinel (`cancelled = true`).
    pub fn start(&self, item: &Item, cancel: CancellationToken) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let bridge = self.clone();
        let item = item.clone();
        tokio::spawn(async move {
            bridge.produce(&item, &tx, &cancel).await;
        });
        rx
    }

    fn command_for(&self, item: &Item) -> Command {
        let mut command = if self.interpreter.is_empty() {
            Command::new(&item.path)
        } else {
            let mut command = Command::new(&self.interpreter);
            command.arg(&item.path);
            command
        };
        if let Some(dir) = item.path.parent() {
            command.current_dir(dir);
        }
        command
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn produce(
        &self,
        item: &Item,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) {
        let started = Instant::now();
        tracing::info!(item = %item.name, path = %item.path.display(), "execution started");

        let result = match self.run_child(item, tx, cancel).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(item = %item.name, "execution failed: {e:#}");
                let _ = tx
                    .send(StreamEvent::Line(OutputLine::error(format!(
                        "Execution failed: {e:#}"
                    ))))
                    .await;
                ExecutionResult::default()
            }
        };

        tracing::info!(
            item = %item.name,
            exit_code = ?result.exit_code,
            cancelled = result.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "execution finished"
        );
        let _ = tx.send(StreamEvent::Finished(result)).await;
    }

    async fn run_child(
        &self,
        item: &Item,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let mut child = self
            .command_for(item)
            .spawn()
            .with_context(|| format!("Failed to start '{}'", item.path.display()))?;

        let stdout = child.stdout.take().context("child stdout not captured")?;
        let mut stderr = child.stderr.take().context("child stderr not captured")?;

        // Drained concurrently so a chatty stderr cannot fill its pipe and
        // stall the child while stdout is still being read.
        let mut stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut cancelled = false;
        loop {
            buf.clear();
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => {
                    if read.context("read child stdout")? == 0 {
                        break;
                    }
                    let line = OutputLine::output(decode_line(&buf));
                    if tx.send(StreamEvent::Line(line)).await.is_err() {
                        // Receiver gone: nobody is watching, stop the child.
                        cancelled = true;
                        break;
                    }
                }
            }
        }

        // Stdout may close long before the child exits, and a grandchild can
        // keep stderr open after it does; cancellation stays live for both.
        let finished = if cancelled {
            None
        } else {
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                done = async { (child.wait().await, (&mut stderr_task).await) } => Some(done),
            }
        };

        let Some((status, stderr)) = finished else {
            tracing::info!(item = %item.name, "cancelling execution");
            let _ = child.start_kill();
            let status = child.wait().await.context("wait for cancelled child")?;
            // Grandchildren may still hold the pipe open.
            stderr_task.abort();
            let _ = tx
                .send(StreamEvent::Line(OutputLine::info("Cancelled.")))
                .await;
            return Ok(ExecutionResult {
                exit_code: status.code(),
                saw_stderr: false,
                cancelled: true,
            });
        };

        let status = status.context("wait for child")?;
        let stderr = match stderr {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::warn!("reading child stderr failed: {e}");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("stderr reader task failed: {e}");
                Vec::new()
            }
        };

        let stderr = String::from_utf8_lossy(&stderr);
        let stderr = stderr.trim();
        let saw_stderr = !stderr.is_empty();
        if saw_stderr {
            let line = if self.benign_stderr.iter().any(|b| b == stderr) {
                OutputLine::info(stderr)
            } else {
                OutputLine::error(single_line(stderr))
            };
            let _ = tx.send(StreamEvent::Line(line)).await;
        }

        match status.code() {
            Some(0) => {}
            Some(code) => {
                let _ = tx
                    .send(StreamEvent::Line(OutputLine::error(format!(
                        "Exited with status {code}"
                    ))))
                    .await;
            }
            None => {
                let _ = tx
                    .send(StreamEvent::Line(OutputLine::error("Terminated by signal")))
                    .await;
            }
        }

        Ok(ExecutionResult {
            exit_code: status.code(),
            saw_stderr,
            cancelled: false,
        })
    }
}

/// Decodes one raw line, replacing invalid UTF-8 and dropping the terminator.
fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches(['\n', '\r']).to_string()
}

/// Folds multi-line stderr into one row of the output region.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
