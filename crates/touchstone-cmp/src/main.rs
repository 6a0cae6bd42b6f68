// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comparator service binary.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use touchstone_cmp::{Service, init_logging};
use touchstone_config::ServiceOptions;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let options = ServiceOptions::parse();
    match try_main(options).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main(options: ServiceOptions) -> anyhow::Result<ExitCode> {
    options
        .validate()
        .context("invalid service configuration")?;
    init_logging(&options.log_level, options.log_dir.as_deref())
        .context("failed to initialize logging")?;

    let mut service = Service::new(options).context("failed to construct service")?;
    if let Err(err) = service.init().await {
        error!("{err}");
        return Ok(ExitCode::FAILURE);
    }
    if let Err(err) = service.run().await {
        error!("{err}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
