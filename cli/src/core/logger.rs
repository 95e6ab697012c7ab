use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn from_flags(info: bool, debug: bool) -> Self {
        if debug {
            LogLevel::Debug
        } else if info {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

pub struct Logger;

impl Logger {
    /// Installs the stderr subscriber. `RUST_LOG` overrides the flag derived level.
    pub fn init(level: LogLevel) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.directive()));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Warn);
        assert_eq!(LogLevel::from_flags(true, false), LogLevel::Info);
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Debug);
    }

    #[test]
    fn test_logger_init_twice() {
        Logger::init(LogLevel::Debug);
        Logger::init(LogLevel::Warn);
        tracing::debug!("logger initialized");
    }
}
