//! The aggregator: sole owner of the block line.
//!
//! Every worker sends its [`Change`]s into one channel and this task applies
//! them one at a time, so the blocks need no locking. After each change the
//! whole line is re-rendered and handed to the sink, unless it is identical
//! to the previous line.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::blocks::{BlockLine, Change, ERROR_MARKER};
use crate::sinks::Sink;

pub struct Aggregator {
    blocks: BlockLine,
    last_line: String,
    sink: Box<dyn Sink>,
}

impl Aggregator {
    pub fn new(blocks: BlockLine, sink: Box<dyn Sink>) -> Self {
        Self {
            blocks,
            last_line: String::new(),
            sink,
        }
    }

    /// Consume changes until every worker has gone away.
    pub async fn run(mut self, mut changes: mpsc::Receiver<Change>) {
        info!(sink = self.sink.name(), blocks = self.blocks.len(), "Status bar running");
        while let Some(change) = changes.recv().await {
            self.handle(change).await;
        }
        info!("All block workers have stopped");
    }

    /// Apply one change and publish the resulting line.
    ///
    /// Returns `true` if the line differed from the previous one and a write
    /// was attempted.
    pub async fn handle(&mut self, change: Change) -> bool {
        self.apply(change);
        self.publish().await
    }

    /// Update the block named by `change`.
    pub fn apply(&mut self, change: Change) {
        let Change { block_id, text, ok } = change;
        let text = if ok {
            text
        } else {
            warn!(block = block_id, error = %text, "Block update failed");
            ERROR_MARKER.to_string()
        };
        if !self.blocks.set(block_id, text) {
            warn!(block = block_id, "Change for a block that is not dynamic, ignoring");
        }
    }

    /// The full line: sink token, every block in order, newline.
    pub fn render(&self) -> String {
        let mut line = String::from(self.sink.leading_token());
        self.blocks.render_into(&mut line);
        line.push('\n');
        line
    }

    /// Write the current line if it changed. The line is remembered even
    /// when the write fails.
    async fn publish(&mut self) -> bool {
        let line = self.render();
        if line == self.last_line {
            debug!("Status line unchanged, skipping write");
            return false;
        }

        match self.sink.write(line.as_bytes()).await {
            Ok(bytes) => debug!(sink = self.sink.name(), bytes, "Wrote status line"),
            Err(e) => error!(sink = self.sink.name(), error = %e, "Failed to write status line"),
        }
        self.last_line = line;
        true
    }

    pub fn last_line(&self) -> &str {
        &self.last_line
    }
}
