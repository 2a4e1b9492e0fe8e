#![allow(dead_code)]
//! Event recording harness for integration tests.
//!
//! `recording_parser` wires every event callback to push into the owner
//! slot, and `feed_chunked` drives a parser the way a connection layer
//! would: chunks arrive, the unconsumed tail is carried forward and
//! re-presented together with the next chunk.

use h1session::{Mode, Parser};

/// One recorded parser event. Span-carrying events keep a copy of the
/// span (the original borrows from the input buffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MessageStart,
    Request,
    Response,
    Method(String),
    Url(String),
    Protocol(String),
    Version(String),
    Status(String),
    Reason(String),
    HeaderName(String),
    HeaderValue(String),
    Headers,
    Connect,
    Upgrade,
    ChunkLength(String),
    ChunkExtensionName(String),
    ChunkExtensionValue(String),
    Body,
    Data(Vec<u8>),
    TrailerName(String),
    TrailerValue(String),
    Trailers,
    MessageComplete,
    Error(String),
    Finish,
    Reset,
}

pub type RecordingParser = Parser<Vec<Event>>;

macro_rules! record_marker {
    ($name:ident, $variant:ident) => {
        fn $name(parser: &mut RecordingParser, _data: &[u8]) -> isize {
            parser.owner.push(Event::$variant);
            0
        }
    };
}

macro_rules! record_text {
    ($name:ident, $variant:ident) => {
        fn $name(parser: &mut RecordingParser, data: &[u8]) -> isize {
            parser
                .owner
                .push(Event::$variant(String::from_utf8_lossy(data).into_owned()));
            0
        }
    };
}

record_marker!(on_message_start, MessageStart);
record_marker!(on_request, Request);
record_marker!(on_response, Response);
record_marker!(on_headers, Headers);
record_marker!(on_connect, Connect);
record_marker!(on_upgrade, Upgrade);
record_marker!(on_body, Body);
record_marker!(on_trailers, Trailers);
record_marker!(on_message_complete, MessageComplete);
record_marker!(on_finish, Finish);
record_marker!(on_reset, Reset);

record_text!(on_method, Method);
record_text!(on_url, Url);
record_text!(on_protocol, Protocol);
record_text!(on_version, Version);
record_text!(on_status, Status);
record_text!(on_reason, Reason);
record_text!(on_header_name, HeaderName);
record_text!(on_header_value, HeaderValue);
record_text!(on_chunk_length, ChunkLength);
record_text!(on_chunk_extension_name, ChunkExtensionName);
record_text!(on_chunk_extension_value, ChunkExtensionValue);
record_text!(on_trailer_name, TrailerName);
record_text!(on_trailer_value, TrailerValue);
record_text!(on_error, Error);

fn on_data(parser: &mut RecordingParser, data: &[u8]) -> isize {
    parser.owner.push(Event::Data(data.to_vec()));
    0
}

/// A parser whose events land in `parser.owner`.
pub fn recording_parser(mode: Mode) -> RecordingParser {
    let mut parser = Parser::with_owner(Vec::new());
    parser.set_mode(mode);
    parser.callbacks.on_message_start = on_message_start;
    parser.callbacks.on_request = on_request;
    parser.callbacks.on_response = on_response;
    parser.callbacks.on_method = on_method;
    parser.callbacks.on_url = on_url;
    parser.callbacks.on_protocol = on_protocol;
    parser.callbacks.on_version = on_version;
    parser.callbacks.on_status = on_status;
    parser.callbacks.on_reason = on_reason;
    parser.callbacks.on_header_name = on_header_name;
    parser.callbacks.on_header_value = on_header_value;
    parser.callbacks.on_headers = on_headers;
    parser.callbacks.on_connect = on_connect;
    parser.callbacks.on_upgrade = on_upgrade;
    parser.callbacks.on_chunk_length = on_chunk_length;
    parser.callbacks.on_chunk_extension_name = on_chunk_extension_name;
    parser.callbacks.on_chunk_extension_value = on_chunk_extension_value;
    parser.callbacks.on_body = on_body;
    parser.callbacks.on_data = on_data;
    parser.callbacks.on_trailer_name = on_trailer_name;
    parser.callbacks.on_trailer_value = on_trailer_value;
    parser.callbacks.on_trailers = on_trailers;
    parser.callbacks.on_message_complete = on_message_complete;
    parser.callbacks.on_error = on_error;
    parser.callbacks.on_finish = on_finish;
    parser.callbacks.on_reset = on_reset;
    parser
}

/// Feed `input` whole, re-presenting the unconsumed tail until the parser
/// stops making progress.
pub fn feed_all(parser: &mut RecordingParser, input: &[u8]) -> usize {
    let mut offset = 0;
    loop {
        let n = parser.parse(&input[offset..]);
        offset += n;
        if n == 0 {
            return offset;
        }
    }
}

/// Feed `input` in chunks of `chunk_size`, carrying the unconsumed tail
/// forward the way a connection layer would.
pub fn feed_chunked(parser: &mut RecordingParser, input: &[u8], chunk_size: usize) -> usize {
    let mut pending: Vec<u8> = Vec::new();
    let mut total = 0;
    for chunk in input.chunks(chunk_size) {
        pending.extend_from_slice(chunk);
        loop {
            let n = parser.parse(&pending);
            pending.drain(..n);
            total += n;
            if n == 0 {
                break;
            }
        }
    }
    total
}

/// Coalesce adjacent `Data` events so event streams can be compared
/// across different input splits.
pub fn normalize(events: &[Event]) -> Vec<Event> {
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        match (out.last_mut(), event) {
            (Some(Event::Data(acc)), Event::Data(more)) => acc.extend_from_slice(more),
            _ => out.push(event.clone()),
        }
    }
    out
}
