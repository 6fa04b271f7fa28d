//! Logging setup and named logger handles.
//!
//! [`init_logging`] installs the process-wide `tracing` subscriber once at
//! startup. Components never look loggers up globally: each one receives a
//! [`Logger`] at construction, carrying its dotted name and its own level
//! threshold. Every event records the logger name as a structured field.
//!
//! # Configuration
//!
//! ```json
//! {
//!   "level": "info",
//!   "format": "compact",
//!   "ansi": false,
//!   "loggers": [["wok.platform.cluster", "debug"]]
//! }
//! ```
//!
//! `loggers` may also be an object mapping names to levels, and a level may
//! be given as `{"level": "debug"}`. A logger level applies to the named
//! logger and every logger below it (`wok.platform` covers
//! `wok.platform.cluster`). Per-logger `handlers` are rejected by
//! [`check_logging_config`]; `datefmt` is not read.

use std::fmt::Display;
use std::sync::Arc;

use serde_json::Value;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigElement;
use crate::error::ConfigError;

const DEFAULT_LEVEL: &str = "info";

/// Map a level name to a tracing filter.
///
/// Accepts `debug`, `info`, `warn`, `error`, `critical` and `notset`
/// (case-insensitive). `critical` maps to `error` and `notset` to `trace`.
/// Unknown names yield `None`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_lowercase().as_str() {
        "trace" | "notset" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "critical" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Per-logger level thresholds read from the logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevels {
    default: LevelFilter,
    loggers: Vec<(String, LevelFilter)>,
}

impl Default for LogLevels {
    fn default() -> Self {
        Self {
            default: LevelFilter::INFO,
            loggers: Vec::new(),
        }
    }
}

impl LogLevels {
    /// Read `level` and `loggers` from a logging element.
    ///
    /// Entries with unknown level names are ignored.
    pub fn from_config(conf: &ConfigElement) -> Self {
        let default = parse_level(&conf.get_or("level", DEFAULT_LEVEL)).unwrap_or(LevelFilter::INFO);
        let loggers = logger_entries(conf)
            .into_iter()
            .filter_map(|(name, entry)| entry_level(entry).and_then(parse_level).map(|l| (name, l)))
            .collect();

        Self { default, loggers }
    }

    /// Threshold for a logger: the most specific configured ancestor wins
    pub fn level_for(&self, name: &str) -> LevelFilter {
        self.loggers
            .iter()
            .filter(|(prefix, _)| {
                prefix.is_empty()
                    || name == prefix
                    || (name.starts_with(prefix.as_str())
                        && name[prefix.len()..].starts_with('.'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
            .unwrap_or(self.default)
    }

    /// Most verbose level any logger may emit at
    pub fn max_level(&self) -> LevelFilter {
        self.loggers
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, std::cmp::max)
    }

    /// Create a logger with the configured threshold for `name`.
    ///
    /// Its children resolve their own thresholds against these levels.
    pub fn logger(&self, name: &str) -> Logger {
        Logger {
            name: Arc::from(name),
            level: self.level_for(name),
            levels: Some(Arc::new(self.clone())),
        }
    }
}

/// `(name, entry)` pairs from `loggers`, in either the list-of-pairs or the
/// object form. List items that are not two-element pairs are skipped.
fn logger_entries(conf: &ConfigElement) -> Vec<(String, &Value)> {
    match conf.get_value("loggers") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| match entry.as_array().map(Vec::as_slice) {
                Some([name, level]) => name.as_str().map(|n| (n.to_string(), level)),
                _ => None,
            })
            .collect(),
        Some(Value::Object(map)) => map.iter().map(|(n, v)| (n.clone(), v)).collect(),
        _ => Vec::new(),
    }
}

/// Level name of a logger entry: either the name itself or `{"level": name}`
fn entry_level(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(level) => Some(level.as_str()),
        Value::Object(map) => map.get("level").and_then(Value::as_str),
        _ => None,
    }
}

/// Reject logging configuration this crate cannot honour.
///
/// Unknown level names and per-logger `handlers` are errors. Events only go
/// to stderr; a configuration expecting mail delivery must not start
/// silently without it.
pub fn check_logging_config(conf: &ConfigElement) -> Result<(), ConfigError> {
    if let Some(level) = conf.get_str("level")
        && parse_level(level).is_none()
    {
        return Err(ConfigError::invalid("level", format!("unknown level '{}'", level)));
    }

    for (name, entry) in logger_entries(conf) {
        let key = format!("loggers.{}", name);
        if entry.get("handlers").is_some() {
            return Err(ConfigError::invalid(
                format!("{}.handlers", key),
                "log handlers are not supported, events are written to stderr",
            ));
        }
        match entry_level(entry) {
            Some(level) if parse_level(level).is_some() => {}
            Some(level) => {
                return Err(ConfigError::invalid(key, format!("unknown level '{}'", level)));
            }
            None => return Err(ConfigError::invalid(key, "expected a level name")),
        }
    }
    Ok(())
}

/// Install the global `tracing` subscriber from a logging element.
///
/// `RUST_LOG` overrides the configured levels. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(conf: &ConfigElement) -> bool {
    let levels = LogLevels::from_config(conf);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(levels.max_level().to_string()));
    let ansi = conf.get_bool_or("ansi", false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_writer(std::io::stderr);

    let result = if conf.get_or("format", "full") == "compact" {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}

/// A named logging handle passed explicitly into components.
///
/// Cloning is cheap. Events below the handle's threshold are dropped before
/// they reach the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: Arc<str>,
    level: LevelFilter,
    levels: Option<Arc<LogLevels>>,
}

impl Logger {
    /// Create a logger that defers filtering to the subscriber
    pub fn new(name: impl AsRef<str>) -> Self {
        Self::with_level(name, LevelFilter::TRACE)
    }

    /// Create a logger with an explicit threshold
    pub fn with_level(name: impl AsRef<str>, level: LevelFilter) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            level,
            levels: None,
        }
    }

    /// Logger for a sub-component: `wok.platform` + `sync` = `wok.platform.sync`.
    ///
    /// A logger handed out by [`LogLevels::logger`] looks the child's name up
    /// in the same levels; any other logger passes its own threshold down.
    pub fn child(&self, suffix: &str) -> Self {
        let name = if self.name.is_empty() {
            suffix.to_string()
        } else {
            format!("{}.{}", self.name, suffix)
        };
        let level = match &self.levels {
            Some(levels) => levels.level_for(&name),
            None => self.level,
        };
        Self {
            name: Arc::from(name),
            level,
            levels: self.levels.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn debug(&self, msg: impl Display) {
        if self.enabled(Level::DEBUG) {
            tracing::debug!(logger = %self.name, "{}", msg);
        }
    }

    pub fn info(&self, msg: impl Display) {
        if self.enabled(Level::INFO) {
            tracing::info!(logger = %self.name, "{}", msg);
        }
    }

    pub fn warn(&self, msg: impl Display) {
        if self.enabled(Level::WARN) {
            tracing::warn!(logger = %self.name, "{}", msg);
        }
    }

    pub fn error(&self, msg: impl Display) {
        if self.enabled(Level::ERROR) {
            tracing::error!(logger = %self.name, "{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("critical"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("notset"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_levels_from_pair_list() {
        let conf = ConfigElement::from_value(json!({
            "level": "warn",
            "loggers": [["wok.platform", "debug"], ["wok.platform.cluster", "error"], ["bad"]]
        }))
        .unwrap();
        let levels = LogLevels::from_config(&conf);

        assert_eq!(levels.level_for("wok.engine"), LevelFilter::WARN);
        assert_eq!(levels.level_for("wok.platform"), LevelFilter::DEBUG);
        assert_eq!(levels.level_for("wok.platform.local"), LevelFilter::DEBUG);
        assert_eq!(levels.level_for("wok.platform.cluster.sync"), LevelFilter::ERROR);
        // Prefix match must stop at a dot boundary
        assert_eq!(levels.level_for("wok.platformer"), LevelFilter::WARN);
        assert_eq!(levels.max_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_levels_from_object() {
        let conf = ConfigElement::from_value(json!({
            "loggers": { "wok": "error" }
        }))
        .unwrap();
        let levels = LogLevels::from_config(&conf);
        assert_eq!(levels.level_for("wok.platform"), LevelFilter::ERROR);
        assert_eq!(levels.level_for("other"), LevelFilter::INFO);
    }

    #[test]
    fn test_logger_entry_objects() {
        let conf = ConfigElement::from_value(json!({
            "loggers": [["wok.platform", { "level": "debug" }]]
        }))
        .unwrap();
        assert!(check_logging_config(&conf).is_ok());
        let levels = LogLevels::from_config(&conf);
        assert_eq!(levels.level_for("wok.platform.cluster"), LevelFilter::DEBUG);
    }

    #[test]
    fn test_handlers_rejected() {
        let conf = ConfigElement::from_value(json!({
            "loggers": {
                "wok": { "level": "error", "handlers": { "type": "smtp", "host": "mail" } }
            }
        }))
        .unwrap();
        let err = check_logging_config(&conf).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "loggers.wok.handlers"));
    }

    #[test]
    fn test_unknown_levels_rejected() {
        let bad_default = ConfigElement::from_value(json!({ "level": "verbose" })).unwrap();
        assert!(check_logging_config(&bad_default).is_err());

        let bad_logger = ConfigElement::from_value(json!({ "loggers": [["wok", "loud"]] })).unwrap();
        let err = check_logging_config(&bad_logger).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "loggers.wok"));

        assert!(check_logging_config(&ConfigElement::empty()).is_ok());
    }

    #[test]
    fn test_child_logger_inherits_level() {
        let parent = Logger::with_level("wok.platform", LevelFilter::WARN);
        let child = parent.child("cluster");
        assert_eq!(child.name(), "wok.platform.cluster");
        assert_eq!(child.level(), LevelFilter::WARN);
        assert!(child.enabled(Level::ERROR));
        assert!(!child.enabled(Level::INFO));
    }

    #[test]
    fn test_child_logger_uses_its_own_configured_level() {
        let conf = ConfigElement::from_value(json!({
            "loggers": [["wok.platform.hpc", "error"], ["wok.platform.hpc.sync", "debug"]]
        }))
        .unwrap();
        let levels = LogLevels::from_config(&conf);

        let platform = levels.logger("wok.platform.hpc");
        assert_eq!(platform.level(), LevelFilter::ERROR);
        let sync = platform.child("sync");
        assert_eq!(sync.level(), levels.level_for("wok.platform.hpc.sync"));
        assert!(sync.enabled(Level::DEBUG));
        // Unconfigured descendants fall back to the nearest ancestor
        assert_eq!(sync.child("ssh").level(), LevelFilter::DEBUG);
        assert_eq!(platform.child("other").level(), LevelFilter::ERROR);
    }

    #[test]
    fn test_root_logger_child() {
        let root = Logger::new("");
        assert_eq!(root.child("wok").name(), "wok");
    }
}
