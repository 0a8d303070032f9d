// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! phpunit-teamcity: decode PHPUnit TeamCity output from the command line
//!
//! Reads captured or piped `--teamcity` output and writes structured records to stdout.
//! Exits non-zero when a test failed or never finished.

use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use phpunit_teamcity_cli::config::Config;
use phpunit_teamcity_cli::run::{RunOptions, run};

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();

    // Logs go to stderr so stdout carries only records
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .with_writer(io::stderr)
        .init();

    config.validate().context("Invalid configuration")?;

    let options = RunOptions::from(&config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match &config.input {
        Some(path) => {
            debug!(path = %path.display(), "Reading input file");
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            run(BufReader::new(file), &mut out, options)
        }
        None => {
            debug!("Reading stdin");
            run(io::stdin().lock(), &mut out, options)
        }
    }
    .context("Failed to decode PHPUnit output")?;

    Ok(if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
