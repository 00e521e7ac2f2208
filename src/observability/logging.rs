//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Filter used when nothing else is configured.
    pub const DEFAULT_FILTER: &'static str = "warn";

    /// Filter used with `--verbose`.
    pub const VERBOSE_FILTER: &'static str = "debug";

    /// Resolves logging from config settings, `CONDUIT_LOG`,
    /// `CONDUIT_LOG_FORMAT` and the verbose flag.
    ///
    /// The filter comes from `CONDUIT_LOG`, then `--verbose`, then the config
    /// file, then [`DEFAULT_FILTER`](Self::DEFAULT_FILTER).
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        Self::resolve(settings, verbose, |name| std::env::var(name).ok())
    }

    fn resolve(
        settings: &LoggingSettings,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let directive = lookup("CONDUIT_LOG")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| verbose.then(|| Self::VERBOSE_FILTER.to_string()))
            .or_else(|| settings.filter.clone())
            .unwrap_or_else(|| Self::DEFAULT_FILTER.to_string());

        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("Ignoring invalid log filter '{directive}': {err}");
            EnvFilter::new(Self::DEFAULT_FILTER)
        });

        let format = lookup("CONDUIT_LOG_FORMAT")
            .or_else(|| settings.format.clone())
            .map_or(LogFormat::Pretty, |f| LogFormat::parse(&f));

        Self {
            filter,
            format,
            file: settings.file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", LogFormat::Json ; "json")]
    #[test_case(" JSON ", LogFormat::Json ; "case and whitespace")]
    #[test_case("pretty", LogFormat::Pretty ; "pretty")]
    #[test_case("yaml", LogFormat::Pretty ; "unknown")]
    fn test_log_format_parse(input: &str, expected: LogFormat) {
        assert_eq!(LogFormat::parse(input), expected);
    }

    #[test]
    fn test_default_filter() {
        let config = LoggingConfig::resolve(&LoggingSettings::default(), false, |_| None);
        assert_eq!(config.filter.to_string(), "warn");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_verbose_overrides_file_filter() {
        let settings = LoggingSettings {
            filter: Some("conduit=info".to_string()),
            ..LoggingSettings::default()
        };
        let config = LoggingConfig::resolve(&settings, true, |_| None);
        assert_eq!(config.filter.to_string(), "debug");
    }

    #[test]
    fn test_env_wins() {
        let settings = LoggingSettings {
            filter: Some("conduit=info".to_string()),
            format: Some("pretty".to_string()),
            file: None,
        };
        let config = LoggingConfig::resolve(&settings, true, |name| match name {
            "CONDUIT_LOG" => Some("conduit=trace".to_string()),
            "CONDUIT_LOG_FORMAT" => Some("json".to_string()),
            _ => None,
        });
        assert_eq!(config.filter.to_string(), "conduit=trace");
        assert_eq!(config.format, LogFormat::Json);
    }
}
