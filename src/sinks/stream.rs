//! Text stream sink (stdout / stderr).

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::SinkError;
use crate::sinks::Sink;

/// Writes each line to an async byte stream and flushes it.
pub struct StreamSink {
    name: String,
    out: Box<dyn AsyncWrite + Send + Unpin>,
}

impl StreamSink {
    pub fn new(name: impl Into<String>, out: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self {
            name: name.into(),
            out,
        }
    }

    pub fn stdout() -> Self {
        Self::new("stdout", Box::new(tokio::io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new("stderr", Box::new(tokio::io::stderr()))
    }
}

impl std::fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSink").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Sink for StreamSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, line: &[u8]) -> Result<usize, SinkError> {
        self.out.write_all(line).await?;
        self.out.flush().await?;
        Ok(line.len())
    }
}
