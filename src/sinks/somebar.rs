//! somebar sink.
//!
//! somebar reads commands from a pipe at `$XDG_RUNTIME_DIR/somebar-0`; a
//! line starting with `status` sets the status text.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::SinkError;
use crate::sinks::Sink;

const PIPE_NAME: &str = "somebar-0";

/// somebar may still be starting; poll for its pipe this many times.
const CONNECT_ATTEMPTS: u32 = 100;
const RETRY_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct SomebarSink {
    path: PathBuf,
    pipe: File,
}

impl SomebarSink {
    /// Open the pipe under `$XDG_RUNTIME_DIR`.
    pub async fn connect() -> Result<Self, SinkError> {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SinkError::Unavailable {
                name: "somebar".to_string(),
                reason: "XDG_RUNTIME_DIR not defined. dbus running?".to_string(),
            })?;
        Self::open(
            &Path::new(&runtime_dir).join(PIPE_NAME),
            CONNECT_ATTEMPTS,
            RETRY_DELAY,
        )
        .await
    }

    /// Open `path` for appending, retrying while it does not exist yet.
    pub async fn open(path: &Path, attempts: u32, delay: Duration) -> Result<Self, SinkError> {
        let mut last_error = None;
        for attempt in 1..=attempts {
            match OpenOptions::new().append(true).open(path).await {
                Ok(pipe) => {
                    debug!(path = %path.display(), attempt, "Connected to somebar");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        pipe,
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(SinkError::Unavailable {
            name: "somebar".to_string(),
            reason: format!(
                "unable to open {} after {attempts} attempts: {}",
                path.display(),
                last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string())
            ),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for SomebarSink {
    fn name(&self) -> &str {
        "somebar"
    }

    fn leading_token(&self) -> &str {
        "status"
    }

    async fn write(&mut self, line: &[u8]) -> Result<usize, SinkError> {
        self.pipe.write_all(line).await?;
        self.pipe.flush().await?;
        Ok(line.len())
    }
}
