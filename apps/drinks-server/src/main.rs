// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use drinks_server::{config::AppConfig, init_tracing, run};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // Tracing is not up yet; report configuration problems on stderr.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Drinks server failed");
            ExitCode::FAILURE
        }
    }
}
