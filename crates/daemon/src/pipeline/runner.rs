//! Supervises one external process per requested pipeline stage.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::events::{EventChannel, StageStatus};
use crate::pipeline::{check_preconditions, PipelineStage};
use crate::store::ProjectStore;

enum Outcome {
    Exited(std::process::ExitStatus),
    WaitFailed(std::io::Error),
    Cancelled,
    TimedOut,
}

/// Per-stage process supervision. Holds one exclusive token per stage:
/// overlapping requests for the same stage fail fast with `StageBusy`
/// instead of racing. Requests return immediately; the process runs
/// out of band and its exit is observed asynchronously, so the control
/// thread never blocks on a stage.
pub struct StageRunner {
    store: Arc<ProjectStore>,
    events: EventChannel,
    running: Mutex<HashMap<PipelineStage, CancellationToken>>,
}

impl StageRunner {
    pub fn new(store: Arc<ProjectStore>, events: EventChannel) -> Arc<Self> {
        Arc::new(StageRunner {
            store,
            events,
            running: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_running(&self, stage: PipelineStage) -> bool {
        self.running.lock().unwrap().contains_key(&stage)
    }

    /// Launch a stage. Fails without spawning anything when required
    /// upstream state is missing or the stage is already running.
    pub fn request(self: &Arc<Self>, stage: PipelineStage) -> Result<(), PipelineError> {
        check_preconditions(&self.store, stage)?;
        let token = self.try_acquire(stage)?;

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let (program, args) = stage.command();
            let mut cmd = Command::new(program);
            cmd.args(args).env("PROJECT_DIR", runner.store.root());
            runner.drive(stage, cmd, token).await;
            runner.release(stage);
        });
        Ok(())
    }

    /// Signal a running stage to stop. Returns false when the stage is
    /// not currently running.
    pub fn cancel(&self, stage: PipelineStage) -> bool {
        match self.running.lock().unwrap().get(&stage) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn try_acquire(&self, stage: PipelineStage) -> Result<CancellationToken, PipelineError> {
        let mut running = self.running.lock().unwrap();
        if running.contains_key(&stage) {
            return Err(PipelineError::StageBusy(stage.as_str()));
        }
        let token = CancellationToken::new();
        running.insert(stage, token.clone());
        Ok(token)
    }

    fn release(&self, stage: PipelineStage) {
        self.running.lock().unwrap().remove(&stage);
    }

    /// Run one supervised process to completion: stream its output as
    /// log events, enforce the stage timeout, honor cancellation, and
    /// commit the stage result on a clean exit. Any failure leaves the
    /// stage marker untouched and the stage re-runnable.
    async fn drive(&self, stage: PipelineStage, mut cmd: Command, token: CancellationToken) {
        let name = stage.as_str();
        self.events
            .status(name, StageStatus::Running, format!("{} started", name));
        info!("stage {} starting", name);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("stage {} failed to spawn: {}", name, e);
                self.events.status(
                    name,
                    StageStatus::Error,
                    format!("failed to spawn process: {}", e),
                );
                return;
            }
        };

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(self.events.clone(), stage, stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(self.events.clone(), stage, stderr));
        }

        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Outcome::Exited(status),
                Err(e) => Outcome::WaitFailed(e),
            },
            _ = token.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(stage.timeout()) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Exited(status) if status.success() => {
                match self
                    .store
                    .commit_stage_result(stage.target(), stage.produced())
                {
                    Ok(project) => {
                        info!("stage {} done; project at {}", name, project.stage.as_str());
                        self.events.status(
                            name,
                            StageStatus::Done,
                            format!("{} complete", name),
                        );
                    }
                    Err(e) => {
                        error!("stage {} finished but commit failed: {}", name, e);
                        self.events.status(
                            name,
                            StageStatus::Error,
                            format!("{} finished but persisting state failed: {}", name, e),
                        );
                    }
                }
            }
            Outcome::Exited(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "killed by signal".to_string());
                warn!("stage {} failed, exit code {}", name, code);
                self.events.status(
                    name,
                    StageStatus::Error,
                    format!("{} exited with code {}", name, code),
                );
            }
            Outcome::WaitFailed(e) => {
                error!("stage {} wait failed: {}", name, e);
                self.events.status(
                    name,
                    StageStatus::Error,
                    format!("lost track of {} process: {}", name, e),
                );
            }
            Outcome::Cancelled => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                info!("stage {} cancelled", name);
                self.events.status(
                    name,
                    StageStatus::Cancelled,
                    format!("{} cancelled by request", name),
                );
            }
            Outcome::TimedOut => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                let secs = stage.timeout().as_secs();
                warn!("stage {} timed out after {}s", name, secs);
                self.events.status(
                    name,
                    StageStatus::Error,
                    format!("{} timed out after {}s", name, secs),
                );
            }
        }
    }
}

/// Republish one output stream line-by-line as pipeline-log events.
async fn forward_lines(events: EventChannel, stage: PipelineStage, reader: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        events.log(stage.as_str(), line);
    }
}
