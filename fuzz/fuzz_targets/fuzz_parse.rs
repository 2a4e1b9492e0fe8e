//! Fuzz target: raw parser input
//!
//! Feeds arbitrary bytes to request, response and autodetect parsers.
//! The goal is to ensure the parser never panics on arbitrary input.

#![no_main]

use h1session::{Mode, Parser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for mode in [Mode::Request, Mode::Response, Mode::Autodetect] {
        let mut parser = Parser::new();
        parser.set_mode(mode);
        let mut offset = 0;
        loop {
            let n = parser.parse(&data[offset..]);
            offset += n;
            if n == 0 {
                break;
            }
        }
        parser.finish();

        // A prefix must also never panic.
        if data.len() > 10 {
            let mut parser = Parser::new();
            parser.set_mode(mode);
            let _ = parser.parse(&data[..data.len() / 2]);
            parser.finish();
        }
    }
});
