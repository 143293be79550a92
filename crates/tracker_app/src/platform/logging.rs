//! Logger setup for tracker_app.
//!
//! Logs go to `./tracker.log` by default so they do not interleave with the
//! interactive output. HTTP client internals are filtered out unless
//! `verbose` is set.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILENAME: &str = "./tracker.log";

/// Crates whose own logging only matters when chasing a backend problem.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDestination {
    /// Write to ./tracker.log in current directory.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

impl LogDestination {
    fn uses_file(self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }

    fn uses_terminal(self) -> bool {
        matches!(self, LogDestination::Terminal | LogDestination::Both)
    }
}

/// Install the global logger. Failing to open the log file only drops
/// that destination.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let loggers = build_loggers(destination, verbose, Path::new(LOG_FILENAME));
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn build_loggers(
    destination: LogDestination,
    verbose: bool,
    log_path: &Path,
) -> Vec<Box<dyn SharedLogger>> {
    let level = level_for(verbose);
    let config = build_config(verbose);

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if destination.uses_terminal() {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if destination.uses_file() {
        if let Some(file_logger) = create_file_logger(level, config, log_path) {
            loggers.push(file_logger);
        }
    }
    loggers
}

fn build_config(verbose: bool) -> Config {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error);
    if !verbose {
        for target in QUIET_TARGETS {
            builder.add_filter_ignore_str(target);
        }
    }
    builder.build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_path: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
