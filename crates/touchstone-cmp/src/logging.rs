// SPDX-License-Identifier: MIT OR Apache-2.0
//! Logger initialization for the service binary.

use std::fs::{File, OpenOptions, create_dir_all};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Name of the log file created under the configured log directory.
const LOG_FILE_NAME: &str = "touchstone_cmp.log";

/// Install the global subscriber: a console layer at `level`, plus a plain
/// append-mode file layer under `log_dir` when one is configured.
///
/// The file layer shares the console filter; loggers must stay safe for
/// concurrent append, which the tracing writer guarantees.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::new(level);
    let console = fmt::layer().with_target(false);

    match log_dir {
        Some(dir) => {
            let file = Arc::new(open_log_file(dir)?);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_target(false).with_writer(file))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
        }
    }
    Ok(())
}

fn open_log_file(dir: &Path) -> io::Result<File> {
    create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_created_under_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");
        open_log_file(&nested).unwrap();
        assert!(nested.join(LOG_FILE_NAME).is_file());
    }
}
