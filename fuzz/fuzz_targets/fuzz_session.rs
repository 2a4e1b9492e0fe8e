//! Fuzz target: session layer
//!
//! Drives the carry buffer, header caps and message assembly with
//! arbitrary chunked feeds. The goal is to ensure the session layer
//! never panics regardless of input or split pattern.

#![no_main]

use h1session::Mode;
use http_conntrack::{Session, TimestampNs};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for mode in [Mode::Request, Mode::Response] {
        let mut session = Session::new(mode);
        let mut now = 1u64;
        for chunk in data.chunks(7) {
            now += 1;
            if session.feed_at(chunk, TimestampNs(now)).is_err() {
                break;
            }
        }
        let _ = session.finish();
        while session.try_pop().is_some() {}
    }
});
