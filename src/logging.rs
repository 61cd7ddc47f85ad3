pub use log::LevelFilter::*;

/// Console colour for a log level, mirroring the severity palette of the in-game console.
pub fn severity_color(level: log::Level) -> Option<&'static str> {
    match level {
        log::Level::Error => Some("#FF0000"),
        log::Level::Warn => Some("#FF00FF"),
        log::Level::Info => Some("#FFFF00"),
        log::Level::Debug => Some("#00FFFF"),
        log::Level::Trace => None,
    }
}

pub fn format_line(level: log::Level, target: &str, message: &std::fmt::Arguments) -> String {
    match severity_color(level) {
        Some(color) => format!("<font color=\"{}\">({}) {}: {}</font>", color, level, target, message),
        None => format!("({}) {}: {}", level, target, message),
    }
}

/// Install the global logger. Only the first call takes effect; later calls are ignored so that
/// tests and environment resets can call this freely.
pub fn setup_logging(verbosity: log::LevelFilter) {
    let result = fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| out.finish(format_args!("{}", format_line(record.level(), record.target(), message))))
        .chain(std::io::stdout())
        .apply();

    if result.is_err() {
        log::trace!("Logging already initialized");
    }
}
