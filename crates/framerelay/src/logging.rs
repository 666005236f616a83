use std::str::FromStr;

use tracing::level_filters::LevelFilter;

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "FRAMERELAY_LOG";
/// Environment variable holding the log format.
pub const LOG_FORMAT_ENV: &str = "FRAMERELAY_LOG_FORMAT";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} {value:?}")]
pub struct ParseLogOptionError {
    what: &'static str,
    value: String,
}

impl FromStr for LogFormat {
    type Err = ParseLogOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ParseLogOptionError {
                what: "log format",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogOptionError;

    /// Accepts whatever [`LevelFilter`] parses, plus `warning`, except `off`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ParseLogOptionError {
            what: "log level",
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let filter = if trimmed.eq_ignore_ascii_case("warning") {
            LevelFilter::WARN
        } else {
            trimmed.parse::<LevelFilter>().map_err(|_| unknown())?
        };
        Self::ALL
            .into_iter()
            .find(|level| level.as_filter() == filter)
            .ok_or_else(unknown)
    }
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

/// Initialize logging from [`LOG_FORMAT_ENV`] and [`LOG_LEVEL_ENV`].
///
/// Unset variables fall back to text at info; unparseable ones are errors.
pub fn init_logging_from_env() -> Result<(), ParseLogOptionError> {
    let format = match std::env::var(LOG_FORMAT_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::default(),
    };
    let level = match std::env::var(LOG_LEVEL_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LogLevel::default(),
    };
    init_logging(format, level);
    Ok(())
}
