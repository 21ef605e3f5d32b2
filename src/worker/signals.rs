//! Real-time signal routing.
//!
//! The whole `SIGRTMIN..=SIGRTMAX` band is subscribed as one multiplexed
//! stream. Each incoming signal is looked up in a [`SignalMap`] and, if some
//! worker claimed it through `updateSignal`, that worker is pinged.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use futures::{Stream, StreamExt};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::SignalStream;
use tracing::{debug, info};

use crate::config::Action;
use crate::error::SignalError;
use crate::worker::Trigger;

/// The user-definable real-time signal numbers.
#[cfg(target_os = "linux")]
pub fn rt_signal_range() -> RangeInclusive<i32> {
    libc::SIGRTMIN()..=libc::SIGRTMAX()
}

/// The user-definable real-time signal numbers.
///
/// Only Linux exposes them through libc; elsewhere use the glibc band.
#[cfg(not(target_os = "linux"))]
pub fn rt_signal_range() -> RangeInclusive<i32> {
    34..=64
}

/// Signal number to worker index, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct SignalMap {
    workers: HashMap<i32, usize>,
}

impl SignalMap {
    pub fn from_actions(actions: &[Action]) -> Self {
        let workers = actions
            .iter()
            .enumerate()
            .filter_map(|(index, action)| action.update_signal.map(|signo| (signo, index)))
            .collect();
        Self { workers }
    }

    pub fn worker_for(&self, signo: i32) -> Option<usize> {
        self.workers.get(&signo).copied()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Outcome of routing one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `Run` was queued for the worker.
    Forwarded(usize),
    /// The worker already had a trigger pending; this signal folds into it.
    Coalesced(usize),
    /// The worker has exited.
    WorkerGone(usize),
    /// No worker claimed this signal.
    Unmapped,
}

/// Forwards real-time signals to the workers that claimed them.
#[derive(Debug)]
pub struct SignalRouter {
    map: SignalMap,
    triggers: HashMap<usize, mpsc::Sender<Trigger>>,
}

impl SignalRouter {
    pub fn new(map: SignalMap) -> Self {
        Self {
            map,
            triggers: HashMap::new(),
        }
    }

    /// Attach the trigger input of the worker at `worker`.
    pub fn register(&mut self, worker: usize, triggers: mpsc::Sender<Trigger>) {
        self.triggers.insert(worker, triggers);
    }

    /// Ping the worker mapped to `signo`, if any. Never waits.
    pub fn route(&self, signo: i32) -> Route {
        let Some(worker) = self.map.worker_for(signo) else {
            return Route::Unmapped;
        };
        let Some(tx) = self.triggers.get(&worker) else {
            return Route::WorkerGone(worker);
        };
        match tx.try_send(Trigger::Run) {
            Ok(()) => Route::Forwarded(worker),
            Err(TrySendError::Full(_)) => Route::Coalesced(worker),
            Err(TrySendError::Closed(_)) => Route::WorkerGone(worker),
        }
    }

    /// Subscribe to every real-time signal and route them forever.
    ///
    /// Handlers are installed before this returns, so a failure to install
    /// one is reported to the caller.
    pub fn spawn(self) -> Result<JoinHandle<()>, SignalError> {
        let signals = listen(rt_signal_range())?;
        info!(
            mapped = self.map.len(),
            "Listening for real-time signals"
        );
        Ok(tokio::spawn(self.run(signals)))
    }

    /// Route every signal number yielded by `signals`. Returns when the
    /// stream ends.
    pub async fn run<S>(self, mut signals: S)
    where
        S: Stream<Item = i32> + Unpin,
    {
        while let Some(signo) = signals.next().await {
            let route = self.route(signo);
            debug!(signo, ?route, "Routed signal");
        }
    }
}

/// Install handlers for `range` and merge them into one stream of signal
/// numbers.
pub fn listen(range: RangeInclusive<i32>) -> Result<impl Stream<Item = i32> + Unpin, SignalError> {
    let mut streams = StreamMap::new();
    for signo in range {
        let stream = signal(SignalKind::from_raw(signo))
            .map_err(|source| SignalError::Install { signo, source })?;
        streams.insert(signo, SignalStream::new(stream));
    }
    Ok(streams.map(|(signo, ())| signo))
}
