// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for the phpunit-teamcity command
//!
//! This module provides the command-line options: where output is read from, how decoded
//! records are rendered, and logging options.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Decode PHPUnit `--teamcity` output into structured test records
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "phpunit-teamcity")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Subcommand to run (defaults to decode)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// File containing captured PHPUnit output
    ///
    /// Reads from stdin when not given.
    #[arg(short, long, env = "PHPUNIT_TEAMCITY_INPUT")]
    pub input: Option<PathBuf>,

    /// How records are written to stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level)
    ///
    /// Logs every dropped line and correlation step. Logs are written to stderr so
    /// they never mix with decoded records.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Stop at the first malformed line instead of skipping it
    #[arg(long, default_value = "false")]
    pub strict: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Command {
    /// Stream records as each line is decoded
    ///
    /// Example:
    ///   vendor/bin/phpunit --teamcity | phpunit-teamcity decode
    #[default]
    Decode,

    /// Print the aggregated run summary once the output ends
    ///
    /// Example:
    ///   phpunit-teamcity --input phpunit.log --format pretty summary
    Summary,
}

/// Output rendering
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document per line
    #[default]
    Json,
    /// Human-readable text
    Pretty,
    /// Only a short text summary at the end of the run
    Summary,
}

impl Config {
    /// Get the subcommand, defaulting to decode
    #[must_use]
    pub fn command_or_default(&self) -> Command {
        self.command.unwrap_or_default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the input path is specified but doesn't exist or is not a file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(ConfigError::InputNotFound(input.clone()));
            }
            if !input.is_file() {
                return Err(ConfigError::InputNotFile(input.clone()));
            }
        }
        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Input path not found
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// Input path is not a regular file
    #[error("Input path is not a file: {0}")]
    InputNotFile(PathBuf),
}
