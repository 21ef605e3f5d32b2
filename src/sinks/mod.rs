//! Display sinks for the rendered status line.

pub mod somebar;
pub mod stream;
pub mod xprop;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SinkError;

pub use somebar::SomebarSink;
pub use stream::StreamSink;
pub use xprop::XpropSink;

/// Destination for the rendered status line.
///
/// The aggregator is the only caller and writes at most once per distinct
/// line, so implementations need no internal synchronization.
#[async_trait]
pub trait Sink: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Protocol keyword placed before the blocks of every line.
    fn leading_token(&self) -> &str {
        ""
    }

    /// Write one complete line, returning the number of bytes accepted.
    async fn write(&mut self, line: &[u8]) -> Result<usize, SinkError>;
}

/// Which sink to write to, as named by `barType` or `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Stdout,
    Stderr,
    /// Root window `WM_NAME`, as read by dwm and similar window managers.
    #[serde(alias = "xroot", alias = "xsetroot")]
    #[value(aliases = ["xroot", "xsetroot"])]
    Xprop,
    /// The somebar control pipe.
    Somebar,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Xprop => "xprop",
            Self::Somebar => "somebar",
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set up the selected sink. Any failure here is fatal for the bar.
pub async fn open_sink(kind: SinkKind) -> Result<Box<dyn Sink>, SinkError> {
    let sink: Box<dyn Sink> = match kind {
        SinkKind::Stdout => Box::new(StreamSink::stdout()),
        SinkKind::Stderr => Box::new(StreamSink::stderr()),
        SinkKind::Xprop => Box::new(XpropSink::connect()?),
        SinkKind::Somebar => Box::new(SomebarSink::connect().await?),
    };
    tracing::debug!(sink = %kind, "Opened sink");
    Ok(sink)
}
