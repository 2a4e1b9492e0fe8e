//! Fuzz target: split-invariance
//!
//! Generates a request from structured parts plus arbitrary split points,
//! then checks that feeding the bytes in pieces (carrying the unconsumed
//! tail forward) consumes exactly as much as feeding them at once. This
//! exercises every resumption point of the state machine.

#![no_main]

use arbitrary::Arbitrary;
use h1session::{Mode, Parser};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzMessage {
    target: Vec<u8>,
    header_value: Vec<u8>,
    body: Vec<u8>,
    chunked: bool,
    splits: Vec<u8>,
}

impl FuzzMessage {
    fn to_bytes(&self) -> Vec<u8> {
        let target: Vec<u8> = self
            .target
            .iter()
            .copied()
            .filter(|&b| b > 0x20 && b != 0x7F)
            .take(64)
            .collect();
        let value: Vec<u8> = self
            .header_value
            .iter()
            .copied()
            .filter(|&b| b >= 0x20 && b != 0x7F)
            .take(64)
            .collect();
        let body = &self.body[..self.body.len().min(256)];

        let mut out = Vec::new();
        out.extend_from_slice(b"POST /");
        out.extend_from_slice(&target);
        out.extend_from_slice(b" HTTP/1.1\r\nX-Fuzz: ");
        out.extend_from_slice(&value);
        out.extend_from_slice(b"\r\n");
        if self.chunked {
            out.extend_from_slice(b"Transfer-Encoding: chunked\r\n\r\n");
            if !body.is_empty() {
                out.extend_from_slice(format!("{:x}\r\n", body.len()).as_bytes());
                out.extend_from_slice(body);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
        } else {
            out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
            out.extend_from_slice(body);
        }
        out
    }
}

fn consume_whole(input: &[u8]) -> usize {
    let mut parser = Parser::new();
    parser.set_mode(Mode::Request);
    let mut offset = 0;
    loop {
        let n = parser.parse(&input[offset..]);
        offset += n;
        if n == 0 {
            return offset;
        }
    }
}

fuzz_target!(|message: FuzzMessage| {
    let input = message.to_bytes();
    let whole = consume_whole(&input);

    // Re-feed through arbitrary split points, carrying the tail.
    let mut parser = Parser::new();
    parser.set_mode(Mode::Request);
    let mut pending: Vec<u8> = Vec::new();
    let mut total = 0;
    let mut offset = 0;
    for &split in &message.splits {
        let take = (split as usize).min(input.len() - offset);
        pending.extend_from_slice(&input[offset..offset + take]);
        offset += take;
        loop {
            let n = parser.parse(&pending);
            pending.drain(..n);
            total += n;
            if n == 0 {
                break;
            }
        }
    }
    pending.extend_from_slice(&input[offset..]);
    loop {
        let n = parser.parse(&pending);
        pending.drain(..n);
        total += n;
        if n == 0 {
            break;
        }
    }

    assert_eq!(total, whole, "consumption must not depend on input splits");
});
