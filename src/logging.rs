use log::{Level, LevelFilter, Log};

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        // ANSI color and a three-letter tag per level.
        let (color, tag) = match record.level() {
            Level::Error => (31, "ERR"),
            Level::Warn => (93, "WRN"),
            Level::Info => (34, "INF"),
            Level::Debug => (32, "DBG"),
            Level::Trace => (90, "TRC"),
        };
        println!("\u{1B}[{}m[{}] {}\u{1B}[0m", color, tag, record.args());
    }

    fn flush(&self) {}
}

/// Install the console logger. The max level comes from the `LOG`
/// environment variable at build time, defaulting to `Info`.
pub fn init() {
    static LOGGER: ConsoleLogger = ConsoleLogger;
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(match option_env!("LOG") {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    });
}
