//! One tracked connection: a parser plus the plumbing the parser itself
//! refuses to own.
//!
//! The session keeps the carry buffer that makes the parser's
//! whole-token consumption contract invisible to hosts, enforces the
//! header/trailer size cap through the callback control protocol,
//! surfaces namespaced diagnostic codes, and assembles the zero-copy
//! events into owned [`Message`] values drained via
//! [`try_pop`](Session::try_pop).

use std::collections::VecDeque;

use bytes::BytesMut;
use h1session::{ConnectionKind, ErrorCode, Mode, Parser, State};
use http::StatusCode;

use crate::clock::{monotonic_now_ns, TimestampNs};
use crate::message::{header_map_from_pairs, http_version, HttpRequest, HttpResponse, Message};

/// Limits and behavior knobs for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cumulative cap on bytes delivered through header events (target,
    /// reason, names, values) per message. Trailers are tracked
    /// separately against the same cap. Default: 16 KiB.
    pub max_header_size: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_header_size: 16 * 1024,
        }
    }
}

/// A diagnostic surfaced to the host.
///
/// `code` carries the `H1_` namespace, except for the two compat
/// mappings: framing conflicts surface as `HPE_UNEXPECTED_CONTENT_LENGTH`
/// and header-cap violations as `HPE_HEADER_OVERFLOW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub code: String,
    pub reason: String,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

impl std::error::Error for SessionError {}

/// Parser owner slot: everything the event callbacks write into.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    now: TimestampNs,
    last_message_start: TimestampNs,
    headers_completed: bool,
    trailers_completed: bool,

    headers_nread: u64,
    trailers_nread: u64,
    max_header_size: u64,
    override_code: Option<&'static str>,
    override_reason: Option<&'static str>,
    skip_next_body: bool,

    target: Vec<u8>,
    reason: Vec<u8>,
    current_name: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
    trailers: Vec<(Vec<u8>, Vec<u8>)>,
    body: Vec<u8>,

    completed: VecDeque<Message>,
}

type P = Parser<Collected>;

fn track_header(parser: &mut P, len: usize) -> isize {
    let o = &mut parser.owner;
    o.headers_nread += len as u64;
    if o.headers_nread >= o.max_header_size {
        o.override_code = Some("HPE_HEADER_OVERFLOW");
        o.override_reason = Some("Header overflow");
        return 1;
    }
    0
}

fn track_trailer(parser: &mut P, len: usize) -> isize {
    let o = &mut parser.owner;
    o.trailers_nread += len as u64;
    if o.trailers_nread >= o.max_header_size {
        o.override_code = Some("HPE_HEADER_OVERFLOW");
        o.override_reason = Some("Header overflow");
        return 1;
    }
    0
}

fn on_message_start(parser: &mut P, _data: &[u8]) -> isize {
    let o = &mut parser.owner;
    o.headers_completed = false;
    o.trailers_completed = false;
    o.headers_nread = 0;
    o.trailers_nread = 0;
    o.target.clear();
    o.reason.clear();
    o.current_name.clear();
    o.headers.clear();
    o.trailers.clear();
    o.body.clear();
    o.last_message_start = o.now;
    0
}

fn on_url(parser: &mut P, data: &[u8]) -> isize {
    if track_header(parser, data.len()) != 0 {
        return 1;
    }
    parser.owner.target.extend_from_slice(data);
    0
}

fn on_reason(parser: &mut P, data: &[u8]) -> isize {
    if track_header(parser, data.len()) != 0 {
        return 1;
    }
    parser.owner.reason.extend_from_slice(data);
    0
}

fn on_header_name(parser: &mut P, data: &[u8]) -> isize {
    if track_header(parser, data.len()) != 0 {
        return 1;
    }
    let o = &mut parser.owner;
    o.current_name.clear();
    o.current_name.extend_from_slice(data);
    0
}

fn on_header_value(parser: &mut P, data: &[u8]) -> isize {
    if track_header(parser, data.len()) != 0 {
        return 1;
    }
    let o = &mut parser.owner;
    let name = std::mem::take(&mut o.current_name);
    o.headers.push((name, data.to_vec()));
    0
}

fn on_headers(parser: &mut P, _data: &[u8]) -> isize {
    let status = parser.status();
    let is_response = parser.message_type() == Mode::Response;
    let o = &mut parser.owner;
    o.headers_completed = true;
    o.headers_nread = 0;

    // Suppress body delivery where the wire carries none: responses that
    // forbid a body, and HEAD exchanges announced via expect_no_body.
    // The hint is armed for one message only.
    let skip_hint = o.skip_next_body;
    o.skip_next_body = false;
    let no_body_status = (100..=199).contains(&status) || status == 204 || status == 304;
    if (is_response && no_body_status) || skip_hint {
        return 1;
    }
    0
}

fn on_data(parser: &mut P, data: &[u8]) -> isize {
    parser.owner.body.extend_from_slice(data);
    0
}

fn on_trailer_name(parser: &mut P, data: &[u8]) -> isize {
    if track_trailer(parser, data.len()) != 0 {
        return 1;
    }
    let o = &mut parser.owner;
    o.current_name.clear();
    o.current_name.extend_from_slice(data);
    0
}

fn on_trailer_value(parser: &mut P, data: &[u8]) -> isize {
    if track_trailer(parser, data.len()) != 0 {
        return 1;
    }
    let o = &mut parser.owner;
    let name = std::mem::take(&mut o.current_name);
    o.trailers.push((name, data.to_vec()));
    0
}

fn on_trailers(parser: &mut P, _data: &[u8]) -> isize {
    let o = &mut parser.owner;
    o.trailers_completed = true;
    o.trailers_nread = 0;
    0
}

fn on_message_complete(parser: &mut P, _data: &[u8]) -> isize {
    let kind = parser.message_type();
    let method = parser.method();
    let status = parser.status();
    let version = http_version(parser.version_major(), parser.version_minor());

    let o = &mut parser.owner;
    let timestamp_ns = o.last_message_start;
    let headers = header_map_from_pairs(&o.headers);
    let trailers = header_map_from_pairs(&o.trailers);
    let body = std::mem::take(&mut o.body);

    let message = match kind {
        Mode::Response => {
            let Ok(status) = StatusCode::from_u16(status) else {
                return 0;
            };
            let reason = if o.reason.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&o.reason).into_owned())
            };
            Message::Response(HttpResponse {
                status,
                reason,
                version,
                headers,
                trailers,
                body,
                timestamp_ns,
            })
        }
        _ => {
            let Some(method) = method else {
                return 0;
            };
            let Ok(method) = http::Method::from_bytes(method.as_str().as_bytes()) else {
                return 0;
            };
            Message::Request(HttpRequest {
                method,
                target: String::from_utf8_lossy(&o.target).into_owned(),
                version,
                headers,
                trailers,
                body,
                timestamp_ns,
            })
        }
    };
    o.completed.push_back(message);
    o.last_message_start = TimestampNs::IDLE;
    0
}

/// Parsing state of one connection: parser, carry buffer, limits, and
/// the queue of completed messages.
pub struct Session {
    parser: P,
    pending: BytesMut,
    reported_error: ErrorCode,
}

impl Session {
    /// Create a session with default limits.
    pub fn new(mode: Mode) -> Self {
        Self::with_config(mode, SessionConfig::default())
    }

    /// Create a session with explicit limits.
    pub fn with_config(mode: Mode, config: SessionConfig) -> Self {
        let mut parser = Parser::with_owner(Collected {
            max_header_size: config.max_header_size,
            ..Collected::default()
        });
        parser.set_mode(mode);
        parser.callbacks.on_message_start = on_message_start;
        parser.callbacks.on_url = on_url;
        parser.callbacks.on_reason = on_reason;
        parser.callbacks.on_header_name = on_header_name;
        parser.callbacks.on_header_value = on_header_value;
        parser.callbacks.on_headers = on_headers;
        parser.callbacks.on_data = on_data;
        parser.callbacks.on_trailer_name = on_trailer_name;
        parser.callbacks.on_trailer_value = on_trailer_value;
        parser.callbacks.on_trailers = on_trailers;
        parser.callbacks.on_message_complete = on_message_complete;
        Session {
            parser,
            pending: BytesMut::new(),
            reported_error: ErrorCode::None,
        }
    }

    /// Feed a chunk of the connection's byte stream.
    ///
    /// Appends to the carry buffer, drives the parser, and drops the
    /// consumed prefix. Returns the number of buffered bytes consumed.
    /// Only an error *newly* raised by this call is reported; an already
    /// errored session keeps returning `Ok(0)`.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, SessionError> {
        self.feed_at(data, monotonic_now_ns())
    }

    /// Deterministic variant of [`feed`](Session::feed) for hosts that
    /// own the clock.
    pub fn feed_at(&mut self, data: &[u8], now: TimestampNs) -> Result<usize, SessionError> {
        self.parser.owner.now = now;
        self.pending.extend_from_slice(data);
        let consumed = self.parser.parse(&self.pending);
        let _ = self.pending.split_to(consumed);
        self.check_error(consumed)
    }

    /// Signal EOF. Completes a close-delimited response body; errors on
    /// a message interrupted mid-flight.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        self.parser.finish();
        self.check_error(0).map(|_| ())
    }

    fn check_error(&mut self, consumed: usize) -> Result<usize, SessionError> {
        let code = self.parser.error_code();
        if code == ErrorCode::None || code == self.reported_error {
            return Ok(consumed);
        }
        self.reported_error = code;
        Err(self.surface(code))
    }

    fn surface(&self, code: ErrorCode) -> SessionError {
        let o = &self.parser.owner;
        if let (Some(code), Some(reason)) = (o.override_code, o.override_reason) {
            return SessionError {
                code: code.to_string(),
                reason: reason.to_string(),
            };
        }
        let code = match code {
            // Compat: existing clients expect both framing-conflict
            // shapes under one code.
            ErrorCode::UnexpectedTransferEncoding | ErrorCode::InvalidContentLength => {
                "HPE_UNEXPECTED_CONTENT_LENGTH".to_string()
            }
            other => format!("H1_{}", other.as_str()),
        };
        SessionError {
            code,
            reason: self.parser.error_description().to_string(),
        }
    }

    /// Pop a completed message, oldest first.
    pub fn try_pop(&mut self) -> Option<Message> {
        self.parser.owner.completed.pop_front()
    }

    /// Whether completed messages are waiting to be popped.
    pub fn has_completed(&self) -> bool {
        !self.parser.owner.completed.is_empty()
    }

    /// Suppress body delivery for the next message (a response to HEAD
    /// carries framing headers but no body bytes).
    pub fn expect_no_body(&mut self) {
        self.parser.owner.skip_next_body = true;
    }

    /// Pre-parse hint that the next message belongs to a CONNECT
    /// exchange. Rejected once parsing has begun.
    pub fn mark_connect(&mut self) -> bool {
        self.parser.mark_connect()
    }

    /// When the in-flight message started, or the idle sentinel.
    pub fn last_message_start(&self) -> TimestampNs {
        self.parser.owner.last_message_start
    }

    /// Nanoseconds the current message has been in flight; 0 when idle.
    pub fn duration_ns(&self, now: TimestampNs) -> u64 {
        let started = self.parser.owner.last_message_start;
        if started.is_idle() {
            0
        } else {
            now.saturating_sub(started)
        }
    }

    /// Whether no message is currently in flight.
    pub fn is_idle(&self) -> bool {
        self.parser.owner.last_message_start.is_idle()
    }

    /// Whether the in-flight message finished its header section.
    pub fn headers_completed(&self) -> bool {
        self.parser.owner.headers_completed
    }

    /// Whether the in-flight chunked message finished its trailers.
    pub fn trailers_completed(&self) -> bool {
        self.parser.owner.trailers_completed
    }

    /// Current parser state.
    pub fn state(&self) -> State {
        self.parser.state()
    }

    /// Sticky parser error code.
    pub fn error_code(&self) -> ErrorCode {
        self.parser.error_code()
    }

    /// Connection semantics of the most recent message.
    pub fn connection(&self) -> ConnectionKind {
        self.parser.connection()
    }

    /// Bytes waiting in the carry buffer for the next feed.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Return the session to a pristine parse state. The carry buffer
    /// and any unreported error are dropped; completed messages survive.
    pub fn reset(&mut self, keep_position: bool) {
        self.parser.reset(keep_position);
        self.pending.clear();
        self.reported_error = ErrorCode::None;
        let o = &mut self.parser.owner;
        o.override_code = None;
        o.override_reason = None;
        o.last_message_start = TimestampNs::IDLE;
    }

    /// Arm the activity timestamp without a message in flight. Used when
    /// registering with a tracker so a connection that never sends a
    /// byte still hits the headers deadline.
    pub(crate) fn arm_activity(&mut self, now: TimestampNs) {
        self.parser.owner.last_message_start = now;
    }
}
