// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the streaming output parser
//!
//! This fuzzes `OutputParser`, which decodes and correlates PHPUnit output
//! line-by-line.

#![no_main]

use libfuzzer_sys::fuzz_target;

use phpunit_teamcity::OutputParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut parser = OutputParser::new();

        // Process each line - parser should never panic
        for line in input.lines() {
            let _ = parser.process_line(line);
        }

        // Finalize should never panic
        let _ = parser.finish();
    }
});
