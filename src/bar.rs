//! Startup wiring: turns a [`BarConfig`] into running tasks.

use tokio::sync::mpsc;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::blocks::BlockLine;
use crate::config::BarConfig;
use crate::error::Result;
use crate::sinks::Sink;
use crate::worker::{CommandWorker, IntervalTrigger, SignalMap, SignalRouter, trigger_channel};

/// A configured status bar, ready to run.
#[derive(Debug, Clone)]
pub struct StatusBar {
    config: BarConfig,
}

impl StatusBar {
    pub fn new(config: BarConfig) -> Self {
        Self { config }
    }

    /// Spawn one worker per action plus its triggers, then aggregate their
    /// changes into `sink`.
    ///
    /// Returns once every worker has stopped. Fails only if the signal
    /// handlers cannot be installed.
    pub async fn run(self, sink: Box<dyn Sink>) -> Result<()> {
        let blocks = BlockLine::from_config(&self.config);
        let mut router = SignalRouter::new(SignalMap::from_actions(&self.config.actions));
        let (change_tx, change_rx) = mpsc::channel(1);

        let mut workers = Vec::with_capacity(self.config.actions.len());
        let mut timers = Vec::new();

        for (index, (action, &block_id)) in self
            .config
            .actions
            .iter()
            .zip(blocks.dynamic_blocks())
            .enumerate()
        {
            let (trigger_tx, trigger_rx) = trigger_channel();

            if let Some(timer) = &action.timer {
                timers.push(IntervalTrigger::new(index, timer.clone(), trigger_tx.clone()));
            }
            if action.update_signal.is_some() {
                router.register(index, trigger_tx);
            }

            debug!(
                worker = index,
                block = block_id,
                command = %action.command,
                timer = ?action.timer,
                signal = ?action.update_signal,
                "Configured block worker"
            );
            workers.push(CommandWorker::new(
                index,
                block_id,
                action.command.clone(),
                change_tx.clone(),
                trigger_rx,
            ));
        }
        drop(change_tx);

        // Install signal handlers before anything runs so a failure is
        // reported up front.
        router.spawn()?;
        for worker in workers {
            worker.spawn();
        }
        for timer in timers {
            timer.spawn();
        }

        Aggregator::new(blocks, sink).run(change_rx).await;
        Ok(())
    }
}
