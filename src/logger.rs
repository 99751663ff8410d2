//! Logging to stderr plus the two files exposed by the status server.
//!
//! Records are filtered and echoed by `env_logger` (`RUST_LOG`, default
//! `info`). Everything that passes the filter is also appended to
//! `info.log` (info and below) or `error.log` (warn and error). Both files
//! are truncated when the process starts.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{Level, Log, Metadata, Record};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::utils::{ensure_dir, open_truncated};

pub const INFO_LOG: &str = "info.log";
pub const ERROR_LOG: &str = "error.log";

/// Locations of the log files
#[derive(Debug, Clone)]
pub struct LogFiles {
    pub info: PathBuf,
    pub error: PathBuf,
}

impl LogFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            info: dir.join(INFO_LOG),
            error: dir.join(ERROR_LOG),
        }
    }
}

pub struct SplitLogger {
    console: env_logger::Logger,
    info: Mutex<File>,
    error: Mutex<File>,
    write_failed: AtomicBool,
}

impl SplitLogger {
    fn new(console: env_logger::Logger, files: &LogFiles) -> Result<Self> {
        let info = open_truncated(&files.info)
            .with_context(|| format!("opening {}", files.info.display()))?;
        let error = open_truncated(&files.error)
            .with_context(|| format!("opening {}", files.error.display()))?;
        Ok(Self {
            console,
            info: Mutex::new(info),
            error: Mutex::new(error),
            write_failed: AtomicBool::new(false),
        })
    }

    /// Logging from here would recurse, so only the first failure goes to stderr
    fn report_write_failure(&self, err: std::io::Error) {
        if !self.write_failed.swap(true, Ordering::Relaxed) {
            eprintln!("page_watch: cannot write log file: {}", err);
        }
    }

    fn sink(&self, level: Level) -> &Mutex<File> {
        if level <= Level::Warn {
            &self.error
        } else {
            &self.info
        }
    }
}

/// `INFO\t2024/03/09 07:05:01 message`, error lines also carry `file:line`
fn format_line(record: &Record, now: &DateTime<Local>) -> String {
    let stamp = now.format("%Y/%m/%d %H:%M:%S");
    match (record.level() <= Level::Warn, record.file(), record.line()) {
        (true, Some(file), Some(line)) => format!(
            "{}\t{} {}:{}: {}\n",
            record.level(),
            stamp,
            file,
            line,
            record.args()
        ),
        _ => format!("{}\t{} {}\n", record.level(), stamp, record.args()),
    }
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.matches(record) {
            return;
        }
        self.console.log(record);

        let line = format_line(record, &Local::now());
        if let Ok(mut file) = self.sink(record.level()).lock() {
            if let Err(e) = file.write_all(line.as_bytes()) {
                self.report_write_failure(e);
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        for sink in [&self.info, &self.error] {
            if let Ok(mut file) = sink.lock() {
                if let Err(e) = file.flush() {
                    self.report_write_failure(e);
                }
            }
        }
    }
}

/// Install the global logger, writing files under `dir`
pub fn init(dir: &Path) -> Result<LogFiles> {
    ensure_dir(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
    let files = LogFiles::in_dir(dir);

    let console =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Stderr)
            .build();
    let max_level = console.filter();

    let logger = SplitLogger::new(console, &files)?;
    log::set_boxed_logger(Box::new(logger)).context("installing logger")?;
    log::set_max_level(max_level);

    Ok(files)
}
