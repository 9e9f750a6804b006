//! Logging bootstrap.
//!
//! # Responsibility
//! - Install a `log` backend that writes to the browser console (stderr on native).
//! - Keep diagnostic events metadata-only: no note bodies, prompts, or credentials.
//!
//! # Invariants
//! - Initialization is idempotent for the same level.
//! - Re-initialization with a different level is rejected.
//! - Initialization never panics.

use log::{info, Level, LevelFilter, Log, Metadata, Record};
use std::sync::OnceLock;

static LOGGER: ConsoleLogger = ConsoleLogger;
static ACTIVE_LEVEL: OnceLock<LevelFilter> = OnceLock::new();

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
        write_line(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn write_line(level: Level, line: &str) {
    let value = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::Error => web_sys::console::error_1(&value),
        Level::Warn => web_sys::console::warn_1(&value),
        Level::Info => web_sys::console::info_1(&value),
        Level::Debug | Level::Trace => web_sys::console::debug_1(&value),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write_line(_level: Level, line: &str) {
    eprintln!("{line}");
}

fn normalize_level(level: &str) -> Result<LevelFilter, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        other => Err(format!("unsupported log level `{other}`")),
    }
}

/// Installs the console logger at `level`.
///
/// # Errors
/// - Returns an error when `level` is unsupported.
/// - Returns an error when logging is already active at a different level.
pub fn init_logging(level: &str) -> Result<(), String> {
    let requested = normalize_level(level)?;

    let active = *ACTIVE_LEVEL.get_or_init(|| {
        // Another logger may already be installed (e.g. by a host test harness);
        // in that case we only adjust the max level.
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(requested);
        info!(
            "event=app_start module=logging status=ok level={} version={}",
            requested,
            env!("CARGO_PKG_VERSION")
        );
        requested
    });

    if active != requested {
        return Err(format!(
            "logging already initialized with level `{active}`; refusing to switch to `{requested}`"
        ));
    }
    Ok(())
}

/// Active level, or `None` before [`init_logging`] succeeded.
pub fn logging_level() -> Option<LevelFilter> {
    ACTIVE_LEVEL.get().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level_accepts_known_levels() {
        assert_eq!(normalize_level("INFO"), Ok(LevelFilter::Info));
        assert_eq!(normalize_level(" warning "), Ok(LevelFilter::Warn));
        assert_eq!(normalize_level("trace"), Ok(LevelFilter::Trace));
    }

    #[test]
    fn test_normalize_level_rejects_unknown() {
        let err = normalize_level("verbose").unwrap_err();
        assert!(err.contains("verbose"));
    }

    #[test]
    fn test_init_logging_is_idempotent_and_rejects_switch() {
        init_logging("debug").expect("first init should succeed");
        init_logging("debug").expect("same level should be idempotent");
        assert_eq!(logging_level(), Some(LevelFilter::Debug));

        let err = init_logging("error").unwrap_err();
        assert!(err.contains("refusing to switch"));
    }

    #[test]
    fn test_init_logging_rejects_bad_level_without_side_effects() {
        assert!(init_logging("loud").is_err());
    }
}
