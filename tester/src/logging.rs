use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

// Diagnostics go to stderr so they never mix with the report on stdout
struct Logger;

static LOGGER: Logger = Logger;

static COLORED: AtomicBool = AtomicBool::new(true);

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        eprintln!("{} {}", tag(record.level(), COLORED.load(SeqCst)), record.args());
    }

    fn flush(&self) {}
}

fn tag(level: Level, colored: bool) -> String {
    let tag = match level {
        Level::Error => " ERR ",
        Level::Warn => " WRN ",
        Level::Info => " INF ",
        Level::Debug => " DBG ",
        Level::Trace => " TRC ",
    };
    if !colored {
        return tag.trim().to_string();
    }
    match level {
        Level::Error => tag.black().on_red().to_string(),
        Level::Warn => tag.black().on_yellow().to_string(),
        Level::Info => tag.black().on_blue().to_string(),
        Level::Debug => tag.black().on_purple().to_string(),
        Level::Trace => tag.black().on_white().to_string(),
    }
}

pub(crate) fn level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub(crate) fn init(level: LevelFilter, colored: bool) {
    COLORED.store(colored, SeqCst);
    // only fails if a logger is already installed, in which case keep that one
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
