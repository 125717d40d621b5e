//! Structured logging, layered on the `log` facade and `env_logger`
//! backend rather than adopting the source's `zap` — this codebase's
//! own logging crate choice is kept and given the source's format/level
//! selection on top (grounded in `pkg/logging/{format,level,logger}.go`).

use std::io::Write;

use clap::ValueEnum;
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Simple,
    Structured,
    Json,
    Developer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    /// Logged at `Error`; reserved for call sites that also terminate
    /// the process, since `log` has no separate fatal level.
    Fatal,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error | LogLevel::Fatal => LevelFilter::Error,
        }
    }
}

/// Installs the global logger. Safe to call once; a second call is a
/// programmer error in the same way double-installing any global
/// logger is, and `env_logger` surfaces that as an `Err` we ignore.
pub fn init_logger(format: LogFormat, level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.into());

    match format {
        LogFormat::Simple => {
            builder.format(|buf, record| writeln!(buf, "{}", record.args()));
        }
        LogFormat::Structured => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "level={} target={} msg=\"{}\"",
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"level\":\"{}\",\"target\":\"{}\",\"message\":{}}}",
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".to_string())
                )
            });
        }
        LogFormat::Developer => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {} {}:{}] {}",
                    record.level(),
                    record.target(),
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            });
        }
    }

    let _ = builder.try_init();
}
