//! Fuzz target for `/proc/[pid]/stat` parsing.
//!
//! The parser should never panic, only return `None` for malformed input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use cl_core::collect::parse_proc_stat;

fuzz_target!(|data: &str| {
    let _ = parse_proc_stat(data, 1);
});
