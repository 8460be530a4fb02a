use std::path::PathBuf;

use backtrace::Backtrace;
use log::{Level, LevelFilter};

use crate::config::LogConfig;

/// The log file: the configured one, else `~/.cmdtree.log`.
pub fn log_file_path(config: &LogConfig) -> PathBuf {
    config
        .file
        .clone()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cmdtree.log")))
        .unwrap_or_else(|| PathBuf::from("cmdtree.log"))
}

fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    }
}

/// Escape sequences for the location and the message of a record.
fn level_colors(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Error => ("\x1b[1;31m", "\x1b[1;31m"),
        Level::Warn => ("\x1b[1;33m", "\x1b[1;33m"),
        Level::Info => ("\x1b[32m", "\x1b[0m"),
        Level::Debug | Level::Trace => ("\x1b[34m", "\x1b[0m"),
    }
}

/// `[module file:line] message`, colored by level.
fn format_record(record: &log::Record<'_>, message: &std::fmt::Arguments<'_>) -> String {
    let (location, body) = level_colors(record.level());
    format!(
        "{}[{} {}:{}] {}{}\x1b[0m",
        location,
        record.module_path().unwrap_or_else(|| record.target()),
        record.file().unwrap_or("?"),
        record.line().unwrap_or(0),
        body,
        message
    )
}

/// Sends log records to the log file and logs panics with their backtrace.
pub fn install_logger(config: &LogConfig) -> Result<(), fern::InitError> {
    let level = config.level_filter().ok().flatten().unwrap_or_else(default_level);
    let path = log_file_path(config);

    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("{}", format_record(record, message))))
        .level(level)
        .chain(fern::log_file(&path)?)
        .apply()?;
    debug!("logger: writing {} records to {}", level, path.display());

    std::panic::set_hook(Box::new(|info| {
        error!("{}", info);
        for line in backtrace_lines(&Backtrace::new()) {
            error!("{}", line);
        }
    }));

    Ok(())
}

/// Frames compiled from the toolchain or from registry crates.
fn is_foreign_frame(filename: &str) -> bool {
    filename.contains("/.rustup/") || filename.contains("/.cargo/") || filename.starts_with("/rustc/")
}

/// One line per frame that belongs to this crate or its host, with the
/// function name when it is known.
pub fn backtrace_lines(backtrace: &Backtrace) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, frame) in backtrace.frames().iter().enumerate() {
        for symbol in frame.symbols() {
            let filename = match symbol.filename() {
                Some(path) => path.to_string_lossy(),
                None => continue,
            };
            if is_foreign_frame(&filename) {
                continue;
            }

            let function = symbol.name().map_or_else(|| "?".to_owned(), |n| n.to_string());
            lines.push(format!(
                "    #{} {} at {}:{}",
                i,
                function,
                filename,
                symbol.lineno().unwrap_or(0)
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn configured_file_wins() {
        let config = LogConfig {
            file: Some(PathBuf::from("/var/log/console.log")),
            level: None,
        };
        assert_eq!(log_file_path(&config), PathBuf::from("/var/log/console.log"));

        let default = log_file_path(&LogConfig::default());
        let name = default.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name.ends_with("cmdtree.log"));
    }

    #[test]
    fn records_carry_their_location() {
        let line = format_record(
            &log::Record::builder()
                .level(Level::Warn)
                .module_path(Some("cmdtree::queue"))
                .file(Some("src/queue.rs"))
                .line(Some(42))
                .build(),
            &format_args!("deferring {}", "set"),
        );
        assert_eq!(line, "\x1b[1;33m[cmdtree::queue src/queue.rs:42] \x1b[1;33mdeferring set\x1b[0m");
    }

    #[test]
    fn backtraces_skip_foreign_frames() {
        assert!(is_foreign_frame("/rustc/abc/library/std/src/panicking.rs"));
        assert!(is_foreign_frame("/home/me/.cargo/registry/src/fern-0.6/src/lib.rs"));
        assert!(!is_foreign_frame("/home/me/cmdtree/src/logger.rs"));

        let lines = backtrace_lines(&Backtrace::new());
        assert!(lines.iter().all(|l| !l.contains("/.cargo/")));
    }
}
