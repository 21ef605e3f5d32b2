//! Configuration loading.
//!
//! The document is read once at startup and turned into typed [`Action`]s.
//! Everything that can be checked up front is checked here so that a bad
//! config fails fast instead of surfacing later in a worker.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::sinks::SinkKind;
use crate::worker::signals;

/// Name of the directory and file looked up under the config dir.
const APP_DIR: &str = "tikiblocks";
const CONFIG_FILE: &str = "tikiblocks.json";

/// Timer value that disables periodic triggering.
pub const NO_TIMER: &str = "0";

/// Raw document as it appears on disk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BarDocument {
    #[serde(default, alias = "Separator")]
    separator: String,
    #[serde(default, alias = "BarType")]
    bar_type: Option<SinkKind>,
    #[serde(default, alias = "Actions")]
    actions: Vec<ActionDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionDocument {
    #[serde(default)]
    command: String,
    #[serde(default)]
    timer: Option<String>,
    #[serde(default)]
    update_signal: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
}

/// One configured block producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Shell command, run through `sh -c`.
    pub command: String,
    /// Raw duration string; `None` when no timer is configured.
    ///
    /// Kept unparsed: a malformed value disables the worker at runtime
    /// rather than failing the whole bar.
    pub timer: Option<String>,
    /// Absolute real-time signal number that re-triggers this action.
    pub update_signal: Option<i32>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl Action {
    /// Action with only a command, no timer and no signal.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timer: None,
            update_signal: None,
            prefix: None,
            suffix: None,
        }
    }

    pub fn with_timer(mut self, timer: impl Into<String>) -> Self {
        self.timer = normalize_timer(Some(timer.into()));
        self
    }

    pub fn with_signal(mut self, signo: i32) -> Self {
        self.update_signal = Some(signo);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Validated bar configuration.
#[derive(Debug, Clone)]
pub struct BarConfig {
    /// Static text inserted before every action's block group.
    pub separator: String,
    /// Sink selected by the document, if any. The CLI may override it.
    pub bar_type: Option<SinkKind>,
    pub actions: Vec<Action>,
}

impl BarConfig {
    /// Build a config directly from actions.
    pub fn new(separator: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            separator: separator.into(),
            bar_type: None,
            actions,
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let doc: BarDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Read and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            actions = config.actions.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn from_document(doc: BarDocument) -> Result<Self, ConfigError> {
        if doc.actions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "actions".to_string(),
                message: "at least one action is required".to_string(),
            });
        }

        let mut actions = Vec::with_capacity(doc.actions.len());
        let mut seen_signals: HashMap<i32, usize> = HashMap::new();

        for (index, raw) in doc.actions.into_iter().enumerate() {
            if raw.command.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: format!("actions[{index}].command"),
                    message: "command must not be empty".to_string(),
                });
            }

            let update_signal = match raw.update_signal.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(value) => Some(parse_signal(value).map_err(|message| {
                    ConfigError::InvalidValue {
                        key: format!("actions[{index}].updateSignal"),
                        message,
                    }
                })?),
            };

            if let Some(signo) = update_signal {
                if let Some(previous) = seen_signals.insert(signo, index) {
                    return Err(ConfigError::InvalidValue {
                        key: format!("actions[{index}].updateSignal"),
                        message: format!("signal {signo} is already used by actions[{previous}]"),
                    });
                }
            }

            actions.push(Action {
                command: raw.command,
                timer: normalize_timer(raw.timer),
                update_signal,
                prefix: raw.prefix,
                suffix: raw.suffix,
            });
        }

        Ok(Self {
            separator: doc.separator,
            bar_type: doc.bar_type,
            actions,
        })
    }
}

/// Map the "no timer" sentinel (and blank values) to `None`.
fn normalize_timer(timer: Option<String>) -> Option<String> {
    timer.filter(|t| {
        let t = t.trim();
        !t.is_empty() && t != NO_TIMER
    })
}

/// Parse an `updateSignal` value into an absolute signal number.
///
/// Accepts a plain number (`"35"`) or an offset from the start of the
/// real-time range (`"RTMIN+1"`, `"SIGRTMIN+1"`).
fn parse_signal(value: &str) -> Result<i32, String> {
    let range = signals::rt_signal_range();

    let upper = value.to_ascii_uppercase();
    let relative = upper
        .strip_prefix("SIG")
        .unwrap_or(&upper)
        .strip_prefix("RTMIN");

    let signo = match relative {
        Some("") => *range.start(),
        Some(offset) => {
            let offset: i32 = offset
                .strip_prefix('+')
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| format!("{value:?} is not of the form RTMIN+N"))?;
            range
                .start()
                .checked_add(offset)
                .ok_or_else(|| format!("{value:?} is out of range"))?
        }
        None => value
            .parse()
            .map_err(|_| format!("{value:?} is not a signal number"))?,
    };

    if range.contains(&signo) {
        Ok(signo)
    } else {
        Err(format!(
            "signal {signo} is outside the real-time range {}..={}",
            range.start(),
            range.end()
        ))
    }
}

/// Default config location: `$XDG_CONFIG_HOME/tikiblocks/tikiblocks.json`,
/// falling back to `~/.config`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn rtmin() -> i32 {
        *signals::rt_signal_range().start()
    }

    #[test]
    fn parses_full_document() {
        let json = format!(
            r#"{{
                "separator": " | ",
                "barType": "somebar",
                "actions": [
                    {{"command": "date +%H:%M", "timer": "30s", "updateSignal": "{}", "prefix": "[", "suffix": "]"}},
                    {{"command": "echo hi", "timer": "0"}}
                ]
            }}"#,
            rtmin() + 1
        );
        let config = BarConfig::from_json(&json).unwrap();

        assert_eq!(config.separator, " | ");
        assert_eq!(config.bar_type, Some(SinkKind::Somebar));
        assert_eq!(config.actions.len(), 2);

        let first = &config.actions[0];
        assert_eq!(first.command, "date +%H:%M");
        assert_eq!(first.timer.as_deref(), Some("30s"));
        assert_eq!(first.update_signal, Some(rtmin() + 1));
        assert_eq!(first.prefix.as_deref(), Some("["));
        assert_eq!(first.suffix.as_deref(), Some("]"));

        let second = &config.actions[1];
        assert_eq!(second.timer, None);
        assert_eq!(second.update_signal, None);
    }

    #[test]
    fn accepts_capitalized_document_keys() {
        let config =
            BarConfig::from_json(r#"{"Separator": "|", "BarType": "stderr", "Actions": [{"command": "true"}]}"#)
                .unwrap();
        assert_eq!(config.separator, "|");
        assert_eq!(config.bar_type, Some(SinkKind::Stderr));
    }

    #[test]
    fn timer_sentinel_and_blank_mean_no_timer() {
        assert_eq!(normalize_timer(Some("0".to_string())), None);
        assert_eq!(normalize_timer(Some("  ".to_string())), None);
        assert_eq!(normalize_timer(None), None);
        assert_eq!(normalize_timer(Some("bad".to_string())).as_deref(), Some("bad"));
    }

    #[test]
    fn malformed_timer_is_not_a_load_error() {
        let config =
            BarConfig::from_json(r#"{"actions": [{"command": "true", "timer": "bad"}]}"#).unwrap();
        assert_eq!(config.actions[0].timer.as_deref(), Some("bad"));
    }

    #[test]
    fn rejects_empty_command() {
        let err = BarConfig::from_json(r#"{"actions": [{"command": "  "}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "actions[0].command"));
    }

    #[test]
    fn rejects_empty_action_list() {
        let err = BarConfig::from_json(r#"{"separator": "|"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "actions"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = BarConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_bar_type() {
        let err =
            BarConfig::from_json(r#"{"barType": "lemonbar", "actions": [{"command": "true"}]}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn signal_forms() {
        let start = rtmin();
        assert_eq!(parse_signal(&start.to_string()), Ok(start));
        assert_eq!(parse_signal("RTMIN"), Ok(start));
        assert_eq!(parse_signal("RTMIN+3"), Ok(start + 3));
        assert_eq!(parse_signal("sigrtmin+2"), Ok(start + 2));
        assert!(parse_signal("1").is_err());
        assert!(parse_signal("RTMIN-1").is_err());
        assert!(parse_signal("RTMIN+999").is_err());
        assert!(parse_signal("RTMIN+2147483647").is_err());
        assert!(parse_signal("usr1").is_err());
    }

    #[test]
    fn huge_signal_offset_is_a_config_error() {
        let err = BarConfig::from_json(
            r#"{"actions": [{"command": "true", "updateSignal": "RTMIN+2147483647"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "actions[0].updateSignal"));
    }

    #[test]
    fn empty_signal_means_none() {
        let config =
            BarConfig::from_json(r#"{"actions": [{"command": "true", "updateSignal": ""}]}"#)
                .unwrap();
        assert_eq!(config.actions[0].update_signal, None);
    }

    #[test]
    fn rejects_shared_signal() {
        let json = r#"{"actions": [
            {"command": "echo a", "updateSignal": "RTMIN+1"},
            {"command": "echo b", "updateSignal": "RTMIN+1"}
        ]}"#;
        let err = BarConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("already used by actions[0]"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BarConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"separator": "|", "actions": [{{"command": "echo A"}}]}}"#).unwrap();
        let config = BarConfig::load(file.path()).unwrap();
        assert_eq!(config.actions, vec![Action::new("echo A")]);
    }
}
