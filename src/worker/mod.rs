//! Worker system: block producers and the triggers that re-run them.
//!
//! Core components:
//! - `command`: CommandWorker (runs one action, reports Changes)
//! - `interval`: IntervalTrigger (periodic `Run` pings)
//! - `signals`: SignalRouter (real-time signal → worker pings)

pub mod command;
pub mod interval;
pub mod signals;

use tokio::sync::mpsc;

pub use command::{CommandWorker, WorkerExit, run_command};
pub use interval::{IntervalTrigger, parse_duration};
pub use signals::{Route, SignalMap, SignalRouter};

/// Message on a worker's trigger channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run the command again.
    Run,
    /// Stop permanently. The worker never runs again.
    Stop,
}

/// Trigger channel for one worker.
///
/// Capacity 1: at most one re-run is ever pending, further pings while the
/// command runs either wait (timers) or fold into it (signals).
pub fn trigger_channel() -> (mpsc::Sender<Trigger>, mpsc::Receiver<Trigger>) {
    mpsc::channel(1)
}
