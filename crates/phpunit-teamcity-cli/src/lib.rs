// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! phpunit-teamcity-cli library
//!
//! This module exports the command-line configuration and run driver for use in
//! integration tests.

pub mod config;
pub mod run;
