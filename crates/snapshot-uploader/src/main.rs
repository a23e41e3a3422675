//! # snapshot-uploader
//! Run a single incremental or snapshot upload pass.
//!

use std::{fs, path::PathBuf, process::ExitCode};

use mimalloc::MiMalloc;
use shared::{Failure, LogConfig, init_logger};
use snapshot_uploader::{
    backup::{incremental_backup, snapshot_backup},
    config::Config,
};
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "Usage: snapshot-uploader <init|incremental|snapshot <tag>>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Initialize config if args include 'init'.
    if args.first().is_some_and(|arg| arg == "init") {
        let config = Config::default();
        let contents =
            toml::to_string_pretty(&config).or_log_and_panic("Could not serialize config file");
        fs::write("config.toml", contents).or_log_and_panic("Could not create config file");
        return ExitCode::SUCCESS;
    }

    // Load config, logging to the default location if it can't be read.
    let config = match Config::load_toml(PathBuf::from("./config.toml")) {
        Ok(config) => config,
        Err(error) => {
            let _logger = init_logger(&LogConfig::default())
                .or_log_and_panic("Could not initialize logger");
            error!("Could not load config: {error}");
            return ExitCode::FAILURE;
        }
    };

    let _logger = init_logger(&config.logging).or_log_and_panic("Could not initialize logger");

    let uploader = config.uploader();

    let summary = match args.first().map(String::as_str) {
        Some("incremental") => incremental_backup(&uploader, &config.data_directory),
        Some("snapshot") => {
            let Some(tag) = args.get(1) else {
                error!("{USAGE}");
                return ExitCode::FAILURE;
            };
            snapshot_backup(&uploader, &config.data_directory, tag)
        }
        _ => {
            error!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let summary = match summary {
        Ok(summary) => summary,
        Err(error) => {
            error!("Could not read data directory: {error}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Uploaded {} files, {} keyspaces failed",
        summary.uploaded.len(),
        summary.failed_directories
    );

    ExitCode::SUCCESS
}
