//! X root window sink: sets `WM_NAME` on the default screen's root window.

use async_trait::async_trait;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, PropMode, Window};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::error::SinkError;
use crate::sinks::Sink;

pub struct XpropSink {
    conn: RustConnection,
    root: Window,
}

impl XpropSink {
    /// Connect to the display named by `$DISPLAY`.
    pub fn connect() -> Result<Self, SinkError> {
        let (conn, screen) = RustConnection::connect(None).map_err(|e| SinkError::Unavailable {
            name: "xprop".to_string(),
            reason: e.to_string(),
        })?;
        let root = conn
            .setup()
            .roots
            .get(screen)
            .map(|s| s.root)
            .ok_or_else(|| SinkError::Unavailable {
                name: "xprop".to_string(),
                reason: format!("screen {screen} does not exist"),
            })?;
        Ok(Self { conn, root })
    }
}

impl std::fmt::Debug for XpropSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XpropSink").field("root", &self.root).finish()
    }
}

/// Window managers show `WM_NAME` verbatim, so drop the line terminator.
fn wm_name(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

#[async_trait]
impl Sink for XpropSink {
    fn name(&self) -> &str {
        "xprop"
    }

    async fn write(&mut self, line: &[u8]) -> Result<usize, SinkError> {
        let write_error = |reason: String| SinkError::Write {
            name: "xprop".to_string(),
            reason,
        };
        self.conn
            .change_property8(
                PropMode::REPLACE,
                self.root,
                AtomEnum::WM_NAME,
                AtomEnum::STRING,
                wm_name(line),
            )
            .map_err(|e| write_error(e.to_string()))?
            .ignore_error();
        self.conn.flush().map_err(|e| write_error(e.to_string()))?;
        Ok(line.len())
    }
}
