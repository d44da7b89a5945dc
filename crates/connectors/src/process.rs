// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform subprocess wrappers around a source or destination connector
//! process. Each wrapper owns its child process exclusively; only the loop
//! that drives it reads or writes to it (§5 "Shared-resource policy").

use async_trait::async_trait;
use parking_lot::Mutex;
use rw_core::{DestinationLaunchConfig, Message, SourceLaunchConfig};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("failed to spawn connector process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("io error communicating with connector: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message line from connector: {0}")]
    Parse(#[from] rw_protocol::ProtocolError),
    #[error("failed to write connector input files: {0}")]
    InputFiles(#[source] std::io::Error),
}

/// The uniform contract for a source connector subprocess.
#[async_trait]
pub trait SourceConnector: Send {
    async fn start(&mut self, config: SourceLaunchConfig, job_root: &Path) -> Result<(), ConnectorError>;
    /// Returns the next parsed message, or `None` iff the subprocess has
    /// closed its output. Never blocks indefinitely past one read call.
    async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError>;
    fn is_finished(&self) -> bool;
    /// Only meaningful once `is_finished()` is true.
    fn exit_value(&self) -> Option<i32>;
    async fn cancel(&mut self);
    /// Instant of the last message read, for the heartbeat chaperone.
    fn last_message_at(&self) -> Instant;
}

/// The uniform contract for a destination connector subprocess.
#[async_trait]
pub trait DestinationConnector: Send {
    async fn start(&mut self, config: DestinationLaunchConfig, job_root: &Path) -> Result<(), ConnectorError>;
    async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError>;
    async fn accept(&mut self, message: &Message) -> Result<(), ConnectorError>;
    async fn notify_end_of_input(&mut self) -> Result<(), ConnectorError>;
    fn is_finished(&self) -> bool;
    fn exit_value(&self) -> Option<i32>;
    async fn cancel(&mut self);
}

/// Writes the connector's config/catalog/state operator inputs as JSON files
/// under `job_root` and returns their paths, for a `read`/`write` invocation
/// that takes `--config`/`--catalog`/`--state` file arguments (the standard
/// Airbyte connector CLI contract).
fn write_input_files(
    job_root: &Path,
    prefix: &str,
    config: &serde_json::Value,
    catalog: &rw_core::ConfiguredCatalog,
    state: &Option<serde_json::Value>,
) -> Result<(std::path::PathBuf, std::path::PathBuf, Option<std::path::PathBuf>), std::io::Error> {
    let config_path = job_root.join(format!("{prefix}_config.json"));
    let catalog_path = job_root.join(format!("{prefix}_catalog.json"));
    std::fs::write(&config_path, serde_json::to_vec(config)?)?;
    std::fs::write(&catalog_path, serde_json::to_vec(catalog)?)?;
    let state_path = match state {
        Some(state) => {
            let path = job_root.join(format!("{prefix}_state.json"));
            std::fs::write(&path, serde_json::to_vec(state)?)?;
            Some(path)
        }
        None => None,
    };
    Ok((config_path, catalog_path, state_path))
}

/// A subprocess-backed source connector. `image` is passed straight to
/// `docker run`; pulling/building the image is an external collaborator's
/// job, this wrapper only execs the already-resolved command.
#[derive(Default)]
pub struct SubprocessSource {
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    finished: bool,
    exit_value: Option<i32>,
    last_message_at: Arc<Mutex<Instant>>,
}

impl SubprocessSource {
    pub fn new() -> Self {
        Self {
            child: None,
            stdout: None,
            finished: false,
            exit_value: None,
            last_message_at: Arc::new(Mutex::new(Instant::now())),
        }
    }
}

#[async_trait]
impl SourceConnector for SubprocessSource {
    async fn start(&mut self, config: SourceLaunchConfig, job_root: &Path) -> Result<(), ConnectorError> {
        let (config_path, catalog_path, state_path) =
            write_input_files(job_root, "source", &config.config, &config.catalog, &config.state)
                .map_err(ConnectorError::InputFiles)?;

        let mut cmd = Command::new("docker");
        cmd.args(["run", "--rm", "-i"]);
        cmd.arg("-v").arg(format!("{}:{}", job_root.display(), job_root.display()));
        for (key, value) in &config.env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd.arg(&config.image).arg("read");
        cmd.arg("--config").arg(&config_path);
        cmd.arg("--catalog").arg(&catalog_path);
        if let Some(state_path) = &state_path {
            cmd.arg("--state").arg(state_path);
        }
        cmd.current_dir(job_root);
        cmd.stdout(Stdio::piped()).stdin(Stdio::null()).stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ConnectorError::Spawn)?;
        let stdout = child.stdout.take().expect("piped stdout");
        self.stdout = Some(BufReader::new(stdout));
        self.child = Some(child);
        *self.last_message_at.lock() = Instant::now();
        Ok(())
    }

    async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError> {
        loop {
            let reader = match self.stdout.as_mut() {
                Some(r) => r,
                None => return Ok(None),
            };
            match rw_protocol::read_message(reader).await {
                Ok(Some(message)) => {
                    *self.last_message_at.lock() = Instant::now();
                    return Ok(Some(message));
                }
                Ok(None) => {
                    self.reap().await;
                    return Ok(None);
                }
                Err(rw_protocol::ProtocolError::Parse(err)) => {
                    tracing::warn!(error = %err, "skipping unparseable source line");
                    continue;
                }
                Err(rw_protocol::ProtocolError::Io(err)) => return Err(err.into()),
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn exit_value(&self) -> Option<i32> {
        self.exit_value
    }

    async fn cancel(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
        self.reap().await;
    }

    fn last_message_at(&self) -> Instant {
        *self.last_message_at.lock()
    }
}

impl SubprocessSource {
    async fn reap(&mut self) {
        if self.finished {
            return;
        }
        if let Some(mut child) = self.child.take() {
            self.exit_value = child.wait().await.ok().and_then(|s| s.code());
        }
        self.finished = true;
    }
}

/// A subprocess-backed destination connector.
#[derive(Default)]
pub struct SubprocessDestination {
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    finished: bool,
    exit_value: Option<i32>,
}

impl SubprocessDestination {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DestinationConnector for SubprocessDestination {
    async fn start(&mut self, config: DestinationLaunchConfig, job_root: &Path) -> Result<(), ConnectorError> {
        let (config_path, catalog_path, _state_path) =
            write_input_files(job_root, "destination", &config.config, &config.catalog, &config.state)
                .map_err(ConnectorError::InputFiles)?;

        let mut cmd = Command::new("docker");
        cmd.args(["run", "--rm", "-i"]);
        cmd.arg("-v").arg(format!("{}:{}", job_root.display(), job_root.display()));
        for (key, value) in &config.env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd.arg(&config.image).arg("write");
        cmd.arg("--config").arg(&config_path);
        cmd.arg("--catalog").arg(&catalog_path);
        cmd.current_dir(job_root);
        cmd.stdout(Stdio::piped()).stdin(Stdio::piped()).stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ConnectorError::Spawn)?;
        let stdout = child.stdout.take().expect("piped stdout");
        let stdin = child.stdin.take().expect("piped stdin");
        self.stdout = Some(BufReader::new(stdout));
        self.stdin = Some(stdin);
        self.child = Some(child);
        Ok(())
    }

    async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError> {
        loop {
            let reader = match self.stdout.as_mut() {
                Some(r) => r,
                None => return Ok(None),
            };
            match rw_protocol::read_message(reader).await {
                Ok(Some(message)) => return Ok(Some(message)),
                Ok(None) => {
                    self.reap().await;
                    return Ok(None);
                }
                Err(rw_protocol::ProtocolError::Parse(err)) => {
                    tracing::warn!(error = %err, "skipping unparseable destination line");
                    continue;
                }
                Err(rw_protocol::ProtocolError::Io(err)) => return Err(err.into()),
            }
        }
    }

    async fn accept(&mut self, message: &Message) -> Result<(), ConnectorError> {
        let stdin = match self.stdin.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        rw_protocol::write_message(stdin, message).await?;
        Ok(())
    }

    async fn notify_end_of_input(&mut self) -> Result<(), ConnectorError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.shutdown().await.ok();
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn exit_value(&self) -> Option<i32> {
        self.exit_value
    }

    async fn cancel(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
        self.reap().await;
    }
}

impl SubprocessDestination {
    async fn reap(&mut self) {
        if self.finished {
            return;
        }
        if let Some(mut child) = self.child.take() {
            self.exit_value = child.wait().await.ok().and_then(|s| s.code());
        }
        self.finished = true;
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fakes::{FakeDestination, FakeSource};

#[cfg(any(test, feature = "test-support"))]
mod fakes {
    use super::*;
    use std::collections::VecDeque;

    /// A scripted source that replays a fixed message sequence without
    /// spawning a process — used by engine tests to drive every §8 scenario
    /// deterministically.
    pub struct FakeSource {
        queue: VecDeque<Message>,
        exit_code: i32,
        finished: bool,
        last_message_at: Arc<Mutex<Instant>>,
        /// Optional per-read delay, used to simulate heartbeat timeouts.
        pub stall_after: Option<(usize, std::time::Duration)>,
        reads: usize,
    }

    impl FakeSource {
        pub fn new(messages: Vec<Message>, exit_code: i32) -> Self {
            Self {
                queue: messages.into(),
                exit_code,
                finished: false,
                last_message_at: Arc::new(Mutex::new(Instant::now())),
                stall_after: None,
                reads: 0,
            }
        }
    }

    #[async_trait]
    impl SourceConnector for FakeSource {
        async fn start(&mut self, _config: SourceLaunchConfig, _job_root: &Path) -> Result<(), ConnectorError> {
            *self.last_message_at.lock() = Instant::now();
            Ok(())
        }

        async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError> {
            if let Some((after, delay)) = self.stall_after {
                if self.reads == after {
                    tokio::time::sleep(delay).await;
                }
            }
            self.reads += 1;
            match self.queue.pop_front() {
                Some(message) => {
                    *self.last_message_at.lock() = Instant::now();
                    Ok(Some(message))
                }
                None => {
                    self.finished = true;
                    Ok(None)
                }
            }
        }

        fn is_finished(&self) -> bool {
            self.finished
        }

        fn exit_value(&self) -> Option<i32> {
            self.finished.then_some(self.exit_code)
        }

        async fn cancel(&mut self) {
            self.finished = true;
        }

        fn last_message_at(&self) -> Instant {
            *self.last_message_at.lock()
        }
    }

    /// A scripted destination that replays a fixed message sequence and
    /// records everything accepted from Loop A.
    pub struct FakeDestination {
        queue: VecDeque<Message>,
        exit_code: i32,
        finished: bool,
        pub accepted: Vec<Message>,
        pub end_of_input_notified: bool,
    }

    impl FakeDestination {
        pub fn new(messages: Vec<Message>, exit_code: i32) -> Self {
            Self { queue: messages.into(), exit_code, finished: false, accepted: Vec::new(), end_of_input_notified: false }
        }
    }

    #[async_trait]
    impl DestinationConnector for FakeDestination {
        async fn start(&mut self, _config: DestinationLaunchConfig, _job_root: &Path) -> Result<(), ConnectorError> {
            Ok(())
        }

        async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError> {
            match self.queue.pop_front() {
                Some(message) => Ok(Some(message)),
                None => {
                    self.finished = true;
                    Ok(None)
                }
            }
        }

        async fn accept(&mut self, message: &Message) -> Result<(), ConnectorError> {
            self.accepted.push(message.clone());
            Ok(())
        }

        async fn notify_end_of_input(&mut self) -> Result<(), ConnectorError> {
            self.end_of_input_notified = true;
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.finished
        }

        fn exit_value(&self) -> Option<i32> {
            self.finished.then_some(self.exit_code)
        }

        async fn cancel(&mut self) {
            self.finished = true;
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
