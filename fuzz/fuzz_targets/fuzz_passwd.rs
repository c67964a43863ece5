//! Fuzz target for `/etc/passwd` parsing.
//!
//! Malformed lines must be skipped, never panic the parser.

#![no_main]

use libfuzzer_sys::fuzz_target;
use cl_core::collect::UserTable;

fuzz_target!(|data: &str| {
    let _ = UserTable::parse(data);
});
