//! Tracing subscriber setup for the CLI.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::config::LoggingSection;

const LOG_FILE_PREFIX: &str = "sprintboard.log";

/// Normalize a configured level; unknown values fall back to `warn`.
pub fn fallback_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "warn",
    }
}

fn make_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_level(level)))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean. The returned guard flushes the file writer on drop
/// and must be held for the life of the process.
pub fn init(settings: &LoggingSection, level: &str) -> Option<WorkerGuard> {
    let (file_writer, guard) = match &settings.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(make_filter(level))
        .with_target(true);

    let installed = match (settings.json, file_writer) {
        (true, Some(file)) => builder
            .json()
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (true, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (false, Some(file)) => builder
            .with_ansi(false)
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (false, None) => builder.with_writer(std::io::stderr).try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(
            level = fallback_level(level),
            json = settings.json,
            directory = settings
                .directory
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(stderr)".to_string()),
            "tracing initialized"
        );
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_level() {
        assert_eq!(fallback_level("DEBUG"), "debug");
        assert_eq!(fallback_level(" info "), "info");
        assert_eq!(fallback_level("loud"), "warn");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let settings = LoggingSection::default();
        let _ = init(&settings, "warn");
        let _ = init(&settings, "debug");
    }

    #[test]
    fn test_init_with_directory_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSection {
            directory: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let guard = init(&settings, "info");
        assert!(guard.is_some());
    }
}
