//! The byte-driven state machine behind [`Parser::parse`].
//!
//! Each state has one handler. A handler inspects the unconsumed input,
//! either recognizes a complete unit (token, line, or body slice) and
//! returns how many bytes it took, or reports that it needs more input,
//! leaving the partial unit for the host to re-present. Synthetic states
//! (REQUEST, RESPONSE, HEADERS, BODY, MESSAGE, END) consume nothing and
//! chain through `continue_without_data`.

use crate::state::{Callback, ConnectionKind, ErrorCode, Mode, Parser, State};
use crate::token::{
    eq_ignore_case, for_each_list_token, hex_value, is_digit, is_hex_digit, is_ows, is_target_char,
    is_token_char, is_value_char, Method, CR, DQUOTE, EQUALS, LF, METHOD_MAX_LEN, SEMICOLON, SP,
};
use crate::trace_warn;

const PROTOCOL_PREFIX: &[u8] = b"HTTP/";

/// Outcome of scanning a header or trailer value.
enum ValueScan<'a> {
    Complete { value: &'a [u8], consumed: usize },
    NeedMore,
    Invalid,
}

/// Skip leading OWS, then take bytes up to CRLF. The returned span keeps
/// trailing OWS (stripping is the consumer's job). A bare LF or any
/// control byte is invalid.
fn scan_value(avail: &[u8]) -> ValueScan<'_> {
    let mut i = 0;
    while i < avail.len() && is_ows(avail[i]) {
        i += 1;
    }
    let start = i;
    loop {
        if i >= avail.len() {
            return ValueScan::NeedMore;
        }
        let b = avail[i];
        if b == CR {
            if i + 1 >= avail.len() {
                return ValueScan::NeedMore;
            }
            if avail[i + 1] != LF {
                return ValueScan::Invalid;
            }
            return ValueScan::Complete {
                value: &avail[start..i],
                consumed: i + 2,
            };
        }
        if !is_value_char(b) {
            return ValueScan::Invalid;
        }
        i += 1;
    }
}

fn trim_trailing_ows(value: &[u8]) -> &[u8] {
    let end = value.iter().rposition(|&b| !is_ows(b)).map_or(0, |e| e + 1);
    &value[..end]
}

impl<H> Parser<H> {
    /// Drive the state machine over `data`.
    ///
    /// Returns the number of bytes consumed. Consumed can be less than
    /// `data.len()` when the parser pauses, errors, enters TUNNEL,
    /// completes a close-delimited message, or when the input ends in the
    /// middle of a token — in that last case the host must present the
    /// unconsumed tail again, prepended to the next chunk. Pipelined
    /// keep-alive messages in one buffer parse through in a single call.
    pub fn parse(&mut self, data: &[u8]) -> usize {
        if self.paused {
            return 0;
        }
        match self.state {
            State::Error | State::Tunnel => return 0,
            State::Finish => {
                if !data.is_empty() {
                    self.fail(ErrorCode::UnexpectedData, "data received after finish");
                }
                return 0;
            }
            _ => {}
        }

        self.message_boundary_halt = false;
        let mut consumed = 0usize;
        loop {
            if self.paused
                || self.message_boundary_halt
                || matches!(self.state, State::Error | State::Finish | State::Tunnel)
            {
                break;
            }
            let avail = &data[consumed..];
            if avail.is_empty() && !self.continue_without_data {
                break;
            }
            self.continue_without_data = false;

            let step = match self.state {
                State::Start => self.parse_start(avail),
                State::Request => self.enter_request(),
                State::Response => self.enter_response(),
                State::RequestMethod => self.parse_request_method(avail),
                State::RequestUrl => self.parse_request_url(avail),
                State::RequestProtocol => self.parse_request_protocol(avail),
                State::RequestVersion => self.parse_request_version(avail),
                State::ResponseVersion => self.parse_response_version(avail),
                State::ResponseStatus => self.parse_response_status(avail),
                State::ResponseReason => self.parse_response_reason(avail),
                State::HeaderName => self.parse_header_name(avail),
                State::HeaderValue => self.parse_header_value(avail),
                State::HeaderContentLength => self.parse_header_content_length(avail),
                State::HeaderTransferEncoding => self.parse_header_transfer_encoding(avail),
                State::HeaderConnection => self.parse_header_connection(avail),
                State::Headers => self.finish_headers(),
                State::Body => self.resolve_body(),
                State::BodyViaContentLength => self.parse_body_via_content_length(avail),
                State::BodyWithNoLength => self.parse_body_with_no_length(avail),
                State::ChunkLength => self.parse_chunk_length(avail),
                State::ChunkExtensionName => self.parse_chunk_extension_name(avail),
                State::ChunkExtensionValue => self.parse_chunk_extension_value(avail),
                State::ChunkExtensionQuotedValue => self.parse_chunk_extension_quoted_value(avail),
                State::ChunkData => self.parse_chunk_data(avail),
                State::ChunkEnd => self.parse_chunk_end(avail),
                State::CrlfAfterLastChunk => self.parse_crlf_after_last_chunk(avail),
                State::TrailerName => self.parse_trailer_name(avail),
                State::TrailerValue => self.parse_trailer_value(avail),
                // Boundary states never rest between loop iterations.
                State::Message | State::End | State::Error | State::Finish | State::Tunnel => break,
            };

            match step {
                Some(n) => consumed += n,
                None => break,
            }
        }

        self.position += consumed as u64;
        consumed
    }

    /// Signal EOF.
    ///
    /// In START, END or TUNNEL the parser settles into FINISH and fires
    /// `on_finish`. A close-delimited response body completes first. Any
    /// mid-message state raises `UNEXPECTED_EOF`. Idempotent, and never
    /// overrides an existing error.
    pub fn finish(&mut self) {
        match self.state {
            State::Error | State::Finish => {}
            State::Start | State::End | State::Tunnel => {
                self.set_state(State::Finish);
                if self.state == State::Finish {
                    let _ = self.invoke(self.callbacks.on_finish, &[]);
                }
            }
            State::BodyWithNoLength => {
                self.complete_message(None);
                if self.state == State::Error {
                    return;
                }
                if self.state != State::Finish {
                    self.set_state(State::Finish);
                }
                if self.state == State::Finish {
                    let _ = self.invoke(self.callbacks.on_finish, &[]);
                }
            }
            _ => self.fail(ErrorCode::UnexpectedEof, "unexpected end of input"),
        }
    }

    /// Enter the sticky error state and notify the host. The first error
    /// wins; later calls are ignored.
    pub(crate) fn fail(&mut self, code: ErrorCode, description: &'static str) {
        if self.error_code != ErrorCode::None {
            return;
        }
        trace_warn!("parse error {}: {}", code.as_str(), description);
        self.error_code = code;
        self.error_description = description;
        // Direct assignment: the transition into ERROR does not go through
        // the state-change callbacks, so a failing callback cannot recurse.
        self.state = State::Error;
        let cb = self.callbacks.on_error;
        let _ = cb(self, description.as_bytes());
    }

    fn set_state(&mut self, next: State) {
        if self.invoke_raw(self.callbacks.before_state_change, &[]) != 0 {
            self.fail(ErrorCode::CallbackError, "before_state_change callback failure");
            return;
        }
        self.state = next;
        if self.invoke_raw(self.callbacks.after_state_change, &[]) != 0 {
            self.fail(ErrorCode::CallbackError, "after_state_change callback failure");
        }
    }

    fn invoke_raw(&mut self, cb: Callback<H>, span: &[u8]) -> isize {
        cb(self, span)
    }

    /// Run a callback under the standard control protocol: any nonzero
    /// return aborts with `CALLBACK_ERROR`. Returns false once the parser
    /// has errored.
    fn invoke(&mut self, cb: Callback<H>, span: &[u8]) -> bool {
        if self.invoke_raw(cb, span) != 0 {
            self.fail(ErrorCode::CallbackError, "callback failure");
            return false;
        }
        true
    }

    /// MESSAGE → END → settled state. `next` overrides the settled state
    /// (TUNNEL); otherwise END returns to START, halting the current
    /// `parse` call when the connection is close-delimited.
    fn complete_message(&mut self, next: Option<State>) {
        self.set_state(State::Message);
        if self.state == State::Error {
            return;
        }
        if !self.invoke(self.callbacks.on_message_complete, &[]) {
            return;
        }
        self.set_state(State::End);
        if self.state == State::Error {
            return;
        }
        match next {
            Some(state) => self.set_state(state),
            None => {
                if self.connection == ConnectionKind::Close {
                    self.message_boundary_halt = true;
                }
                self.set_state(State::Start);
            }
        }
    }

    // ------------------------------------------------------------------
    // Message start
    // ------------------------------------------------------------------

    fn parse_start(&mut self, avail: &[u8]) -> Option<usize> {
        if avail.is_empty() {
            return None;
        }
        let kind = match self.mode {
            Mode::Request => Mode::Request,
            Mode::Response => Mode::Response,
            Mode::Autodetect => {
                // A response can only begin with the protocol literal; a
                // request begins with a method token. "HTTP" alone is
                // still ambiguous with nothing — wait for the fifth byte.
                let n = avail.len().min(PROTOCOL_PREFIX.len());
                if avail[..n] == PROTOCOL_PREFIX[..n] {
                    if n < PROTOCOL_PREFIX.len() {
                        return None;
                    }
                    Mode::Response
                } else {
                    Mode::Request
                }
            }
        };

        // The CONNECT hint is armed while sitting in START; survive the
        // per-message wipe.
        let connect_hint = self.is_connect;
        self.clear_message_state();
        self.is_connect = connect_hint;
        self.message_type = kind;

        if !self.invoke(self.callbacks.on_message_start, &[]) {
            return Some(0);
        }
        self.set_state(if kind == Mode::Request {
            State::Request
        } else {
            State::Response
        });
        self.continue_without_data = true;
        Some(0)
    }

    fn enter_request(&mut self) -> Option<usize> {
        if !self.invoke(self.callbacks.on_request, &[]) {
            return Some(0);
        }
        self.set_state(State::RequestMethod);
        self.continue_without_data = true;
        Some(0)
    }

    fn enter_response(&mut self) -> Option<usize> {
        if !self.invoke(self.callbacks.on_response, &[]) {
            return Some(0);
        }
        self.set_state(State::ResponseVersion);
        self.continue_without_data = true;
        Some(0)
    }

    // ------------------------------------------------------------------
    // Request line
    // ------------------------------------------------------------------

    fn parse_request_method(&mut self, avail: &[u8]) -> Option<usize> {
        let mut sp = None;
        for (i, &b) in avail.iter().enumerate() {
            if b == SP {
                sp = Some(i);
                break;
            }
            if !is_token_char(b) || i >= METHOD_MAX_LEN {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid method token");
                return Some(0);
            }
        }
        let sp = sp?;
        let token = &avail[..sp];
        let method = match Method::from_token(token) {
            Some(m) => m,
            None => {
                self.fail(ErrorCode::UnexpectedCharacter, "unrecognized method");
                return Some(0);
            }
        };
        self.method = Some(method);
        if method == Method::Connect {
            self.is_connect = true;
        }
        if !self.invoke(self.callbacks.on_method, token) {
            return Some(0);
        }
        self.set_state(State::RequestUrl);
        Some(sp + 1)
    }

    fn parse_request_url(&mut self, avail: &[u8]) -> Option<usize> {
        let mut sp = None;
        for (i, &b) in avail.iter().enumerate() {
            if b == SP {
                sp = Some(i);
                break;
            }
            if !is_target_char(b) {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid request target character");
                return Some(0);
            }
        }
        let sp = sp?;
        if sp == 0 {
            self.fail(ErrorCode::UnexpectedCharacter, "empty request target");
            return Some(0);
        }
        if !self.invoke(self.callbacks.on_url, &avail[..sp]) {
            return Some(0);
        }
        self.set_state(State::RequestProtocol);
        Some(sp + 1)
    }

    fn parse_request_protocol(&mut self, avail: &[u8]) -> Option<usize> {
        let n = avail.len().min(PROTOCOL_PREFIX.len());
        if avail[..n] != PROTOCOL_PREFIX[..n] {
            self.fail(ErrorCode::UnexpectedCharacter, "expected HTTP/ after request target");
            return Some(0);
        }
        if n < PROTOCOL_PREFIX.len() {
            return None;
        }
        if !self.invoke(self.callbacks.on_protocol, &avail[..4]) {
            return Some(0);
        }
        self.set_state(State::RequestVersion);
        Some(PROTOCOL_PREFIX.len())
    }

    fn parse_request_version(&mut self, avail: &[u8]) -> Option<usize> {
        // DIGIT "." DIGIT CRLF
        if avail.len() < 5 {
            return None;
        }
        if !is_digit(avail[0]) || avail[1] != b'.' || !is_digit(avail[2]) {
            self.fail(ErrorCode::InvalidVersion, "malformed HTTP version");
            return Some(0);
        }
        if avail[3] != CR || avail[4] != LF {
            self.fail(ErrorCode::InvalidVersion, "malformed HTTP version");
            return Some(0);
        }
        if !self.accept_version(avail[0] - b'0', avail[2] - b'0') {
            return Some(0);
        }
        if !self.invoke(self.callbacks.on_version, &avail[..3]) {
            return Some(0);
        }
        self.set_state(State::HeaderName);
        Some(5)
    }

    fn accept_version(&mut self, major: u8, minor: u8) -> bool {
        if !(major == 1 && (minor == 0 || minor == 1)) {
            self.fail(ErrorCode::UnsupportedHttpVersion, "unsupported HTTP version");
            return false;
        }
        self.version_major = major;
        self.version_minor = minor;
        true
    }

    // ------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------

    fn parse_response_version(&mut self, avail: &[u8]) -> Option<usize> {
        // "HTTP/" DIGIT "." DIGIT SP
        let n = avail.len().min(PROTOCOL_PREFIX.len());
        if avail[..n] != PROTOCOL_PREFIX[..n] {
            self.fail(ErrorCode::UnexpectedCharacter, "response must begin with HTTP/");
            return Some(0);
        }
        if avail.len() < 9 {
            return None;
        }
        if !is_digit(avail[5]) || avail[6] != b'.' || !is_digit(avail[7]) {
            self.fail(ErrorCode::InvalidVersion, "malformed HTTP version");
            return Some(0);
        }
        if avail[8] != SP {
            self.fail(ErrorCode::UnexpectedCharacter, "expected space after HTTP version");
            return Some(0);
        }
        if !self.accept_version(avail[5] - b'0', avail[7] - b'0') {
            return Some(0);
        }
        if !self.invoke(self.callbacks.on_protocol, &avail[..4]) {
            return Some(0);
        }
        if !self.invoke(self.callbacks.on_version, &avail[5..8]) {
            return Some(0);
        }
        self.set_state(State::ResponseStatus);
        Some(9)
    }

    fn parse_response_status(&mut self, avail: &[u8]) -> Option<usize> {
        if avail.len() < 4 {
            return None;
        }
        if !avail[..3].iter().all(|&b| is_digit(b)) {
            self.fail(ErrorCode::InvalidStatus, "status code is not three digits");
            return Some(0);
        }
        let status = (avail[0] - b'0') as u16 * 100
            + (avail[1] - b'0') as u16 * 10
            + (avail[2] - b'0') as u16;
        if !(100..=599).contains(&status) {
            self.fail(ErrorCode::InvalidStatus, "status code out of range");
            return Some(0);
        }
        // Terminated by SP + reason, or directly by CRLF (empty reason).
        match avail[3] {
            SP => {
                self.status = status;
                if !self.invoke(self.callbacks.on_status, &avail[..3]) {
                    return Some(0);
                }
                self.set_state(State::ResponseReason);
                Some(4)
            }
            CR => {
                if avail.len() < 5 {
                    return None;
                }
                if avail[4] != LF {
                    self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                    return Some(0);
                }
                self.status = status;
                if !self.invoke(self.callbacks.on_status, &avail[..3]) {
                    return Some(0);
                }
                self.set_state(State::HeaderName);
                Some(5)
            }
            _ => {
                self.fail(ErrorCode::UnexpectedCharacter, "expected space or CRLF after status code");
                Some(0)
            }
        }
    }

    fn parse_response_reason(&mut self, avail: &[u8]) -> Option<usize> {
        let mut cr = None;
        for (i, &b) in avail.iter().enumerate() {
            if b == CR {
                cr = Some(i);
                break;
            }
            if !is_value_char(b) {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid reason phrase character");
                return Some(0);
            }
        }
        let cr = cr?;
        if cr + 1 >= avail.len() {
            return None;
        }
        if avail[cr + 1] != LF {
            self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
            return Some(0);
        }
        if cr > 0 && !self.invoke(self.callbacks.on_reason, &avail[..cr]) {
            return Some(0);
        }
        self.set_state(State::HeaderName);
        Some(cr + 2)
    }

    // ------------------------------------------------------------------
    // Header fields
    // ------------------------------------------------------------------

    fn parse_header_name(&mut self, avail: &[u8]) -> Option<usize> {
        if avail[0] == CR {
            if avail.len() < 2 {
                return None;
            }
            if avail[1] != LF {
                self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                return Some(0);
            }
            self.set_state(State::Headers);
            self.continue_without_data = true;
            return Some(2);
        }

        let mut colon = None;
        for (i, &b) in avail.iter().enumerate() {
            if b == b':' {
                colon = Some(i);
                break;
            }
            if !is_token_char(b) {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid header field name character");
                return Some(0);
            }
        }
        let colon = colon?;
        if colon == 0 {
            self.fail(ErrorCode::UnexpectedCharacter, "empty header field name");
            return Some(0);
        }

        let name = &avail[..colon];
        if !self.invoke(self.callbacks.on_header_name, name) {
            return Some(0);
        }

        let next = if eq_ignore_case(name, b"content-length") {
            State::HeaderContentLength
        } else if eq_ignore_case(name, b"transfer-encoding") {
            State::HeaderTransferEncoding
        } else if eq_ignore_case(name, b"connection") {
            State::HeaderConnection
        } else {
            if eq_ignore_case(name, b"upgrade") {
                self.has_upgrade = true;
            } else if eq_ignore_case(name, b"trailer") {
                self.has_trailers = true;
            }
            State::HeaderValue
        };
        self.set_state(next);
        Some(colon + 1)
    }

    fn parse_header_value(&mut self, avail: &[u8]) -> Option<usize> {
        let (value, consumed) = match scan_value(avail) {
            ValueScan::Complete { value, consumed } => (value, consumed),
            ValueScan::NeedMore => return None,
            ValueScan::Invalid => {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid header field value");
                return Some(0);
            }
        };
        if !self.invoke(self.callbacks.on_header_value, value) {
            return Some(0);
        }
        self.set_state(State::HeaderName);
        Some(consumed)
    }

    fn parse_header_content_length(&mut self, avail: &[u8]) -> Option<usize> {
        let (value, consumed) = match scan_value(avail) {
            ValueScan::Complete { value, consumed } => (value, consumed),
            ValueScan::NeedMore => return None,
            ValueScan::Invalid => {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid header field value");
                return Some(0);
            }
        };
        if self.has_chunked_transfer_encoding {
            self.fail(
                ErrorCode::UnexpectedContentLength,
                "content-length with chunked transfer-encoding",
            );
            return Some(0);
        }
        let digits = trim_trailing_ows(value);
        if digits.is_empty() || !digits.iter().all(|&b| is_digit(b)) {
            self.fail(ErrorCode::InvalidContentLength, "content-length is not a number");
            return Some(0);
        }
        let mut length: u64 = 0;
        for &b in digits {
            length = match length
                .checked_mul(10)
                .and_then(|l| l.checked_add((b - b'0') as u64))
            {
                Some(l) => l,
                None => {
                    self.fail(ErrorCode::InvalidContentLength, "content-length overflows");
                    return Some(0);
                }
            };
        }
        if self.has_content_length && length != self.content_length {
            self.fail(
                ErrorCode::UnexpectedContentLength,
                "duplicate content-length with mismatched value",
            );
            return Some(0);
        }
        self.has_content_length = true;
        self.content_length = length;
        self.remaining_content_length = length;
        if !self.invoke(self.callbacks.on_header_value, value) {
            return Some(0);
        }
        self.set_state(State::HeaderName);
        Some(consumed)
    }

    fn parse_header_transfer_encoding(&mut self, avail: &[u8]) -> Option<usize> {
        let (value, consumed) = match scan_value(avail) {
            ValueScan::Complete { value, consumed } => (value, consumed),
            ValueScan::NeedMore => return None,
            ValueScan::Invalid => {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid header field value");
                return Some(0);
            }
        };
        // "chunked" counts only as a whole list token, and must be the
        // final coding; a value like "chunkedchunked" is an ordinary
        // header and the message simply has no chunked framing.
        let mut chunked = false;
        let mut misplaced = false;
        for_each_list_token(value, |token| {
            if eq_ignore_case(token, b"chunked") {
                if chunked {
                    misplaced = true;
                }
                chunked = true;
            } else if chunked {
                misplaced = true;
            }
        });
        if misplaced {
            self.fail(
                ErrorCode::InvalidTransferEncoding,
                "chunked must be the final transfer coding",
            );
            return Some(0);
        }
        if chunked {
            if self.has_content_length {
                self.fail(
                    ErrorCode::UnexpectedTransferEncoding,
                    "chunked transfer-encoding with content-length",
                );
                return Some(0);
            }
            self.has_chunked_transfer_encoding = true;
        }
        if !self.invoke(self.callbacks.on_header_value, value) {
            return Some(0);
        }
        self.set_state(State::HeaderName);
        Some(consumed)
    }

    fn parse_header_connection(&mut self, avail: &[u8]) -> Option<usize> {
        let (value, consumed) = match scan_value(avail) {
            ValueScan::Complete { value, consumed } => (value, consumed),
            ValueScan::NeedMore => return None,
            ValueScan::Invalid => {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid header field value");
                return Some(0);
            }
        };
        let (mut close, mut keep_alive, mut upgrade) = (false, false, false);
        for_each_list_token(value, |token| {
            if eq_ignore_case(token, b"close") {
                close = true;
            } else if eq_ignore_case(token, b"keep-alive") {
                keep_alive = true;
            } else if eq_ignore_case(token, b"upgrade") {
                upgrade = true;
            }
        });
        self.saw_close |= close;
        self.saw_keep_alive |= keep_alive;
        self.saw_upgrade |= upgrade;
        if !self.invoke(self.callbacks.on_header_value, value) {
            return Some(0);
        }
        self.set_state(State::HeaderName);
        Some(consumed)
    }

    // ------------------------------------------------------------------
    // End of headers: validation, connection semantics, framing
    // ------------------------------------------------------------------

    fn finish_headers(&mut self) -> Option<usize> {
        if self.has_trailers && !self.has_chunked_transfer_encoding {
            self.fail(ErrorCode::Untrailers, "trailers require chunked transfer-encoding");
            return Some(0);
        }
        if self.has_upgrade && !self.saw_upgrade {
            self.fail(
                ErrorCode::MissingConnectionUpgrade,
                "upgrade header without connection: upgrade",
            );
            return Some(0);
        }

        self.connection = if self.saw_upgrade && self.has_upgrade {
            ConnectionKind::Upgrade
        } else if self.saw_close {
            ConnectionKind::Close
        } else if self.version_minor == 0 && !self.saw_keep_alive {
            ConnectionKind::Close
        } else {
            ConnectionKind::KeepAlive
        };

        // A positive return from on_headers suppresses body delivery
        // (HEAD exchanges, 1xx/204/304 responses).
        let rv = self.invoke_raw(self.callbacks.on_headers, &[]);
        if rv < 0 {
            self.fail(ErrorCode::CallbackError, "on_headers callback failure");
            return Some(0);
        }
        if rv > 0 {
            self.skip_body = true;
        }

        self.set_state(State::Body);
        self.continue_without_data = true;
        Some(0)
    }

    fn resolve_body(&mut self) -> Option<usize> {
        let is_request = self.message_type == Mode::Request;
        let connect_tunnel = self.is_connect && (is_request || (200..300).contains(&self.status));

        if connect_tunnel {
            if !self.invoke(self.callbacks.on_connect, &[]) {
                return Some(0);
            }
            self.complete_message(Some(State::Tunnel));
            return Some(0);
        }
        if self.connection == ConnectionKind::Upgrade {
            if !self.invoke(self.callbacks.on_upgrade, &[]) {
                return Some(0);
            }
            self.complete_message(Some(State::Tunnel));
            return Some(0);
        }
        if self.skip_body {
            self.complete_message(None);
            return Some(0);
        }
        if self.has_chunked_transfer_encoding {
            if !self.invoke(self.callbacks.on_body, &[]) {
                return Some(0);
            }
            self.set_state(State::ChunkLength);
            return Some(0);
        }
        if self.has_content_length {
            if self.content_length == 0 {
                self.complete_message(None);
                return Some(0);
            }
            if !self.invoke(self.callbacks.on_body, &[]) {
                return Some(0);
            }
            self.set_state(State::BodyViaContentLength);
            return Some(0);
        }
        if !is_request {
            // Close-delimited response body; finish() completes it.
            if !self.invoke(self.callbacks.on_body, &[]) {
                return Some(0);
            }
            self.set_state(State::BodyWithNoLength);
            return Some(0);
        }
        // Requests without framing have no body.
        self.complete_message(None);
        Some(0)
    }

    // ------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------

    fn parse_body_via_content_length(&mut self, avail: &[u8]) -> Option<usize> {
        let n = avail
            .len()
            .min(self.remaining_content_length.min(usize::MAX as u64) as usize);
        if !self.invoke(self.callbacks.on_data, &avail[..n]) {
            return Some(0);
        }
        self.remaining_content_length -= n as u64;
        if self.remaining_content_length == 0 {
            self.complete_message(None);
        }
        Some(n)
    }

    fn parse_body_with_no_length(&mut self, avail: &[u8]) -> Option<usize> {
        if !self.invoke(self.callbacks.on_data, avail) {
            return Some(0);
        }
        Some(avail.len())
    }

    // ------------------------------------------------------------------
    // Chunked transfer encoding
    // ------------------------------------------------------------------

    fn end_chunk_header(&mut self) {
        if self.remaining_chunk_size == 0 {
            self.set_state(State::CrlfAfterLastChunk);
        } else {
            self.set_state(State::ChunkData);
        }
    }

    fn parse_chunk_length(&mut self, avail: &[u8]) -> Option<usize> {
        let mut size: u64 = 0;
        let mut digits = 0usize;
        for (i, &b) in avail.iter().enumerate() {
            if is_hex_digit(b) {
                size = match size.checked_mul(16).and_then(|s| s.checked_add(hex_value(b))) {
                    Some(s) => s,
                    None => {
                        self.fail(ErrorCode::InvalidChunkSize, "chunk size overflows");
                        return Some(0);
                    }
                };
                digits += 1;
                continue;
            }
            if digits == 0 {
                self.fail(ErrorCode::InvalidChunkSize, "chunk size missing");
                return Some(0);
            }
            return match b {
                SEMICOLON => {
                    self.chunk_size = size;
                    self.remaining_chunk_size = size;
                    if !self.invoke(self.callbacks.on_chunk_length, &avail[..i]) {
                        return Some(0);
                    }
                    self.set_state(State::ChunkExtensionName);
                    Some(i + 1)
                }
                CR => {
                    if i + 1 >= avail.len() {
                        return None;
                    }
                    if avail[i + 1] != LF {
                        self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                        return Some(0);
                    }
                    self.chunk_size = size;
                    self.remaining_chunk_size = size;
                    if !self.invoke(self.callbacks.on_chunk_length, &avail[..i]) {
                        return Some(0);
                    }
                    self.end_chunk_header();
                    Some(i + 2)
                }
                _ => {
                    self.fail(ErrorCode::UnexpectedCharacter, "invalid chunk size character");
                    Some(0)
                }
            };
        }
        None
    }

    fn parse_chunk_extension_name(&mut self, avail: &[u8]) -> Option<usize> {
        for (i, &b) in avail.iter().enumerate() {
            if is_token_char(b) {
                continue;
            }
            if i == 0 {
                self.fail(ErrorCode::UnexpectedCharacter, "empty chunk extension name");
                return Some(0);
            }
            return match b {
                EQUALS => {
                    if !self.invoke(self.callbacks.on_chunk_extension_name, &avail[..i]) {
                        return Some(0);
                    }
                    self.set_state(State::ChunkExtensionValue);
                    Some(i + 1)
                }
                SEMICOLON => {
                    if !self.invoke(self.callbacks.on_chunk_extension_name, &avail[..i]) {
                        return Some(0);
                    }
                    self.set_state(State::ChunkExtensionName);
                    Some(i + 1)
                }
                CR => {
                    if i + 1 >= avail.len() {
                        return None;
                    }
                    if avail[i + 1] != LF {
                        self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                        return Some(0);
                    }
                    if !self.invoke(self.callbacks.on_chunk_extension_name, &avail[..i]) {
                        return Some(0);
                    }
                    self.end_chunk_header();
                    Some(i + 2)
                }
                _ => {
                    self.fail(ErrorCode::UnexpectedCharacter, "invalid chunk extension character");
                    Some(0)
                }
            };
        }
        None
    }

    fn parse_chunk_extension_value(&mut self, avail: &[u8]) -> Option<usize> {
        if avail[0] == DQUOTE {
            self.set_state(State::ChunkExtensionQuotedValue);
            return Some(1);
        }
        for (i, &b) in avail.iter().enumerate() {
            if is_token_char(b) {
                continue;
            }
            if i == 0 {
                self.fail(ErrorCode::UnexpectedCharacter, "empty chunk extension value");
                return Some(0);
            }
            return match b {
                SEMICOLON => {
                    if !self.invoke(self.callbacks.on_chunk_extension_value, &avail[..i]) {
                        return Some(0);
                    }
                    self.set_state(State::ChunkExtensionName);
                    Some(i + 1)
                }
                CR => {
                    if i + 1 >= avail.len() {
                        return None;
                    }
                    if avail[i + 1] != LF {
                        self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                        return Some(0);
                    }
                    if !self.invoke(self.callbacks.on_chunk_extension_value, &avail[..i]) {
                        return Some(0);
                    }
                    self.end_chunk_header();
                    Some(i + 2)
                }
                _ => {
                    self.fail(ErrorCode::UnexpectedCharacter, "invalid chunk extension character");
                    Some(0)
                }
            };
        }
        None
    }

    fn parse_chunk_extension_quoted_value(&mut self, avail: &[u8]) -> Option<usize> {
        // Find the closing quote first (honoring backslash escapes), and
        // make sure the terminator after it is available, so the value
        // event fires exactly once.
        let mut close = None;
        let mut escaped = false;
        for (i, &b) in avail.iter().enumerate() {
            if escaped {
                if !is_value_char(b) {
                    self.fail(ErrorCode::UnexpectedCharacter, "invalid quoted extension character");
                    return Some(0);
                }
                escaped = false;
                continue;
            }
            match b {
                b'\\' => escaped = true,
                DQUOTE => {
                    close = Some(i);
                    break;
                }
                _ if is_value_char(b) => {}
                _ => {
                    self.fail(ErrorCode::UnexpectedCharacter, "invalid quoted extension character");
                    return Some(0);
                }
            }
        }
        let close = close?;
        if close + 1 >= avail.len() {
            return None;
        }
        match avail[close + 1] {
            SEMICOLON => {
                if !self.invoke(self.callbacks.on_chunk_extension_value, &avail[..close]) {
                    return Some(0);
                }
                self.set_state(State::ChunkExtensionName);
                Some(close + 2)
            }
            CR => {
                if close + 2 >= avail.len() {
                    return None;
                }
                if avail[close + 2] != LF {
                    self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                    return Some(0);
                }
                if !self.invoke(self.callbacks.on_chunk_extension_value, &avail[..close]) {
                    return Some(0);
                }
                self.end_chunk_header();
                Some(close + 3)
            }
            _ => {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid character after quoted value");
                Some(0)
            }
        }
    }

    fn parse_chunk_data(&mut self, avail: &[u8]) -> Option<usize> {
        let n = avail
            .len()
            .min(self.remaining_chunk_size.min(usize::MAX as u64) as usize);
        if !self.invoke(self.callbacks.on_data, &avail[..n]) {
            return Some(0);
        }
        self.remaining_chunk_size -= n as u64;
        if self.remaining_chunk_size == 0 {
            self.set_state(State::ChunkEnd);
        }
        Some(n)
    }

    fn parse_chunk_end(&mut self, avail: &[u8]) -> Option<usize> {
        if avail.len() < 2 {
            if avail[0] != CR {
                self.fail(ErrorCode::UnexpectedCharacter, "expected CRLF after chunk data");
                return Some(0);
            }
            return None;
        }
        if avail[0] != CR || avail[1] != LF {
            self.fail(ErrorCode::UnexpectedCharacter, "expected CRLF after chunk data");
            return Some(0);
        }
        self.set_state(State::ChunkLength);
        Some(2)
    }

    // ------------------------------------------------------------------
    // Trailers
    // ------------------------------------------------------------------

    fn parse_crlf_after_last_chunk(&mut self, avail: &[u8]) -> Option<usize> {
        if avail[0] == CR {
            if avail.len() < 2 {
                return None;
            }
            if avail[1] != LF {
                self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                return Some(0);
            }
            if !self.invoke(self.callbacks.on_trailers, &[]) {
                return Some(0);
            }
            self.complete_message(None);
            return Some(2);
        }
        if !is_token_char(avail[0]) {
            self.fail(ErrorCode::UnexpectedCharacter, "invalid trailer field name character");
            return Some(0);
        }
        self.set_state(State::TrailerName);
        self.continue_without_data = true;
        Some(0)
    }

    fn parse_trailer_name(&mut self, avail: &[u8]) -> Option<usize> {
        if avail[0] == CR {
            if avail.len() < 2 {
                return None;
            }
            if avail[1] != LF {
                self.fail(ErrorCode::UnexpectedCharacter, "expected LF after CR");
                return Some(0);
            }
            if !self.invoke(self.callbacks.on_trailers, &[]) {
                return Some(0);
            }
            self.complete_message(None);
            return Some(2);
        }
        let mut colon = None;
        for (i, &b) in avail.iter().enumerate() {
            if b == b':' {
                colon = Some(i);
                break;
            }
            if !is_token_char(b) {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid trailer field name character");
                return Some(0);
            }
        }
        let colon = colon?;
        if colon == 0 {
            self.fail(ErrorCode::UnexpectedCharacter, "empty trailer field name");
            return Some(0);
        }
        if !self.invoke(self.callbacks.on_trailer_name, &avail[..colon]) {
            return Some(0);
        }
        self.set_state(State::TrailerValue);
        Some(colon + 1)
    }

    fn parse_trailer_value(&mut self, avail: &[u8]) -> Option<usize> {
        let (value, consumed) = match scan_value(avail) {
            ValueScan::Complete { value, consumed } => (value, consumed),
            ValueScan::NeedMore => return None,
            ValueScan::Invalid => {
                self.fail(ErrorCode::UnexpectedCharacter, "invalid trailer field value");
                return Some(0);
            }
        };
        if !self.invoke(self.callbacks.on_trailer_value, value) {
            return Some(0);
        }
        self.set_state(State::TrailerName);
        Some(consumed)
    }
}
