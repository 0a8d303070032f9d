// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for single-line decoding
//!
//! This fuzzes `decode_line` with and without the `##teamcity[` marker so both the
//! service message tokenizer and the informational recognizers see arbitrary input.

#![no_main]

use libfuzzer_sys::fuzz_target;

use phpunit_teamcity::decode_line;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        for line in input.lines() {
            // decode_line should never panic on any input
            let _ = decode_line(line);
            let _ = decode_line(&format!("##teamcity[{line}]"));
        }
    }
});
