//! Command worker: runs one action's shell command on every trigger.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::blocks::{BlockId, Change};
use crate::error::CommandError;
use crate::worker::Trigger;

/// Why a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Received [`Trigger::Stop`].
    Disabled,
    /// Every trigger sender was dropped; nothing can re-run the command.
    TriggersClosed,
    /// The change receiver is gone.
    AggregatorGone,
}

/// Runs a single configured command and reports each result as a [`Change`].
#[derive(Debug)]
pub struct CommandWorker {
    index: usize,
    block_id: BlockId,
    command: String,
    changes: mpsc::Sender<Change>,
    triggers: mpsc::Receiver<Trigger>,
}

impl CommandWorker {
    pub fn new(
        index: usize,
        block_id: BlockId,
        command: impl Into<String>,
        changes: mpsc::Sender<Change>,
        triggers: mpsc::Receiver<Trigger>,
    ) -> Self {
        Self {
            index,
            block_id,
            command: command.into(),
            changes,
            triggers,
        }
    }

    /// Spawn the worker loop on the runtime.
    pub fn spawn(self) -> JoinHandle<WorkerExit> {
        tokio::spawn(self.run())
    }

    /// Run once, then once more per [`Trigger::Run`] until stopped.
    pub async fn run(mut self) -> WorkerExit {
        let exit = loop {
            let change = match run_command(&self.command).await {
                Ok(output) => Change::success(self.block_id, output),
                Err(e) => Change::failure(self.block_id, e.to_string()),
            };

            if self.changes.send(change).await.is_err() {
                break WorkerExit::AggregatorGone;
            }

            match self.triggers.recv().await {
                Some(Trigger::Run) => {
                    debug!(worker = self.index, command = %self.command, "Re-running command");
                }
                Some(Trigger::Stop) => break WorkerExit::Disabled,
                None => break WorkerExit::TriggersClosed,
            }
        };

        match exit {
            WorkerExit::Disabled => {
                debug!(worker = self.index, command = %self.command, "Worker disabled, block will no longer update");
            }
            WorkerExit::TriggersClosed => {
                info!(worker = self.index, command = %self.command, "No triggers left for worker, keeping last output");
            }
            WorkerExit::AggregatorGone => {
                debug!(worker = self.index, "Change channel closed, worker exiting");
            }
        }
        exit
    }
}

/// Run `command` through `sh -c` and return its stdout.
///
/// A single trailing newline is stripped. Non-zero exit status and non UTF-8
/// output are errors.
pub async fn run_command(command: &str) -> Result<String, CommandError> {
    let output = Command::new("sh")
        .args(["-c", command])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            command: command.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let mut stdout = String::from_utf8(output.stdout).map_err(|_| CommandError::InvalidOutput {
        command: command.to_string(),
    })?;
    if stdout.ends_with('\n') {
        stdout.pop();
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::worker::trigger_channel;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    async fn next_change(rx: &mut mpsc::Receiver<Change>) -> Change {
        timeout(TEST_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for change")
            .expect("change channel closed")
    }

    #[tokio::test]
    async fn trims_single_trailing_newline() {
        assert_eq!(run_command("echo hello").await.unwrap(), "hello");
        assert_eq!(run_command("printf 'a\\n\\n'").await.unwrap(), "a\n");
        assert_eq!(run_command("printf 'no newline'").await.unwrap(), "no newline");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = run_command("echo oops >&2; exit 3").await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
        let text = err.to_string();
        assert!(text.contains("oops"), "{text}");
        assert!(text.contains('3'), "{text}");
    }

    #[tokio::test]
    async fn non_utf8_output_is_an_error() {
        let err = run_command("printf '\\377\\376'").await.unwrap_err();
        assert!(matches!(err, CommandError::InvalidOutput { .. }));
    }

    #[tokio::test]
    async fn first_run_is_unconditional() {
        let (change_tx, mut change_rx) = mpsc::channel(1);
        let (_trigger_tx, trigger_rx) = trigger_channel();
        CommandWorker::new(0, 7, "echo first", change_tx, trigger_rx).spawn();

        assert_eq!(next_change(&mut change_rx).await, Change::success(7, "first"));
    }

    #[tokio::test]
    async fn run_trigger_reruns_command() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("count");
        let command = format!("echo x >> {0}; wc -l < {0} | tr -d ' '", counter.display());

        let (change_tx, mut change_rx) = mpsc::channel(1);
        let (trigger_tx, trigger_rx) = trigger_channel();
        CommandWorker::new(0, 0, command, change_tx, trigger_rx).spawn();

        assert_eq!(next_change(&mut change_rx).await.text, "1");
        trigger_tx.send(Trigger::Run).await.unwrap();
        assert_eq!(next_change(&mut change_rx).await.text, "2");
        trigger_tx.send(Trigger::Run).await.unwrap();
        assert_eq!(next_change(&mut change_rx).await.text, "3");
    }

    #[tokio::test]
    async fn keeps_retrying_after_repeated_failures() {
        let (change_tx, mut change_rx) = mpsc::channel(1);
        let (trigger_tx, trigger_rx) = trigger_channel();
        let handle = CommandWorker::new(0, 1, "exit 1", change_tx, trigger_rx).spawn();

        for _ in 0..5 {
            let change = next_change(&mut change_rx).await;
            assert!(!change.ok);
            trigger_tx.send(Trigger::Run).await.unwrap();
        }
        let sixth = next_change(&mut change_rx).await;
        assert!(!sixth.ok);
        assert_eq!(sixth.block_id, 1);
        assert!(!handle.is_finished());
    }

    #[tokio::test]
    async fn stop_disables_worker_permanently() {
        let (change_tx, mut change_rx) = mpsc::channel(1);
        let (trigger_tx, trigger_rx) = trigger_channel();
        let handle = CommandWorker::new(0, 0, "echo once", change_tx, trigger_rx).spawn();

        next_change(&mut change_rx).await;
        trigger_tx.send(Trigger::Stop).await.unwrap();

        let exit = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert_eq!(exit, WorkerExit::Disabled);

        // The receiver is gone: later sends fail instead of blocking.
        assert!(trigger_tx.send(Trigger::Run).await.is_err());
        assert!(change_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn exits_when_triggers_are_dropped() {
        let (change_tx, mut change_rx) = mpsc::channel(1);
        let (trigger_tx, trigger_rx) = trigger_channel();
        let handle = CommandWorker::new(0, 0, "echo once", change_tx, trigger_rx).spawn();

        next_change(&mut change_rx).await;
        drop(trigger_tx);

        let exit = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert_eq!(exit, WorkerExit::TriggersClosed);
    }

    #[tokio::test]
    async fn exits_when_aggregator_is_gone() {
        let (change_tx, change_rx) = mpsc::channel(1);
        let (_trigger_tx, trigger_rx) = trigger_channel();
        drop(change_rx);

        let exit = CommandWorker::new(0, 0, "true", change_tx, trigger_rx).run().await;
        assert_eq!(exit, WorkerExit::AggregatorGone);
    }
}
