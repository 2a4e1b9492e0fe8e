use crate::token::Method;

/// Parser states.
///
/// The discriminants are a host-facing contract (diagnostic tooling indexes
/// state tables by these values), so the assignments are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// Waiting for the first byte of a message.
    Start = 0,
    /// EOF acknowledged; no further input is accepted.
    Finish = 1,
    /// Sticky error state.
    Error = 2,
    /// Message boundary: a complete message has been recognized.
    Message = 3,
    /// Message boundary settled; the next state is START, FINISH or TUNNEL.
    End = 4,
    /// A request message is starting.
    Request = 5,
    /// Request line method token.
    RequestMethod = 6,
    /// Request line target.
    RequestUrl = 7,
    /// Request line protocol literal.
    RequestProtocol = 8,
    /// Request line version.
    RequestVersion = 9,
    /// A response message is starting.
    Response = 10,
    /// Status line protocol and version.
    ResponseVersion = 11,
    /// Status line code.
    ResponseStatus = 12,
    /// Status line reason phrase.
    ResponseReason = 13,
    /// Header field name.
    HeaderName = 14,
    /// Value of a `Transfer-Encoding` header.
    HeaderTransferEncoding = 15,
    /// Value of a `Content-Length` header.
    HeaderContentLength = 16,
    /// Value of a `Connection` header.
    HeaderConnection = 17,
    /// Header field value.
    HeaderValue = 18,
    /// All headers received; framing is being resolved.
    Headers = 19,
    /// Body framing dispatch.
    Body = 20,
    /// The parser no longer interprets bytes (after CONNECT or upgrade).
    Tunnel = 21,
    /// Body delimited by Content-Length.
    BodyViaContentLength = 22,
    /// Close-delimited response body.
    BodyWithNoLength = 23,
    /// Hex chunk size.
    ChunkLength = 24,
    /// Chunk extension name.
    ChunkExtensionName = 25,
    /// Chunk extension value.
    ChunkExtensionValue = 26,
    /// Quoted chunk extension value.
    ChunkExtensionQuotedValue = 27,
    /// Chunk payload.
    ChunkData = 28,
    /// CRLF terminating a chunk payload.
    ChunkEnd = 29,
    /// After the zero-length chunk: end of message or start of trailers.
    CrlfAfterLastChunk = 30,
    /// Trailer field name.
    TrailerName = 31,
    /// Trailer field value.
    TrailerValue = 32,
}

impl State {
    /// Stable uppercase name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Start => "START",
            State::Finish => "FINISH",
            State::Error => "ERROR",
            State::Message => "MESSAGE",
            State::End => "END",
            State::Request => "REQUEST",
            State::RequestMethod => "REQUEST_METHOD",
            State::RequestUrl => "REQUEST_URL",
            State::RequestProtocol => "REQUEST_PROTOCOL",
            State::RequestVersion => "REQUEST_VERSION",
            State::Response => "RESPONSE",
            State::ResponseVersion => "RESPONSE_VERSION",
            State::ResponseStatus => "RESPONSE_STATUS",
            State::ResponseReason => "RESPONSE_REASON",
            State::HeaderName => "HEADER_NAME",
            State::HeaderTransferEncoding => "HEADER_TRANSFER_ENCODING",
            State::HeaderContentLength => "HEADER_CONTENT_LENGTH",
            State::HeaderConnection => "HEADER_CONNECTION",
            State::HeaderValue => "HEADER_VALUE",
            State::Headers => "HEADERS",
            State::Body => "BODY",
            State::Tunnel => "TUNNEL",
            State::BodyViaContentLength => "BODY_VIA_CONTENT_LENGTH",
            State::BodyWithNoLength => "BODY_WITH_NO_LENGTH",
            State::ChunkLength => "CHUNK_LENGTH",
            State::ChunkExtensionName => "CHUNK_EXTENSION_NAME",
            State::ChunkExtensionValue => "CHUNK_EXTENSION_VALUE",
            State::ChunkExtensionQuotedValue => "CHUNK_EXTENSION_QUOTED_VALUE",
            State::ChunkData => "CHUNK_DATA",
            State::ChunkEnd => "CHUNK_END",
            State::CrlfAfterLastChunk => "CRLF_AFTER_LAST_CHUNK",
            State::TrailerName => "TRAILER_NAME",
            State::TrailerValue => "TRAILER_VALUE",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the protocol a parser handles.
///
/// `Autodetect` resolves to `Request` or `Response` from the first bytes of
/// the first message; the resolved kind is reported per message through
/// [`Parser::message_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Infer the side from the first bytes of the first message.
    Autodetect = 0,
    /// Parse requests (server side).
    Request = 1,
    /// Parse responses (client side).
    Response = 2,
}

/// Connection semantics derived from the `Connection` header and the
/// negotiated HTTP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionKind {
    /// The connection stays open for further messages.
    KeepAlive = 0,
    /// The connection closes after this message.
    Close = 1,
    /// The connection switches protocols after this message.
    Upgrade = 2,
}

/// Parser error codes. Sticky: once set, the parser rejects all input
/// until [`Parser::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// No error.
    None = 0,
    /// Input arrived after finish, or on an already-errored parser.
    UnexpectedData = 1,
    /// EOF signaled in the middle of a message.
    UnexpectedEof = 2,
    /// A callback returned a nonzero control code.
    CallbackError = 3,
    /// A byte that no production allows at this point.
    UnexpectedCharacter = 4,
    /// Content-Length conflicting with chunked framing or an earlier value.
    UnexpectedContentLength = 5,
    /// Chunked Transfer-Encoding conflicting with Content-Length.
    UnexpectedTransferEncoding = 6,
    /// Payload where none is allowed.
    UnexpectedContent = 7,
    /// Trailers announced on a non-chunked message.
    Untrailers = 8,
    /// Structurally malformed HTTP version.
    InvalidVersion = 9,
    /// Malformed or out-of-range status code.
    InvalidStatus = 10,
    /// Malformed or overflowing Content-Length value.
    InvalidContentLength = 11,
    /// Malformed transfer coding list.
    InvalidTransferEncoding = 12,
    /// Missing or overflowing chunk size.
    InvalidChunkSize = 13,
    /// Upgrade header without `Connection: upgrade`.
    MissingConnectionUpgrade = 14,
    /// A version other than 1.0 or 1.1.
    UnsupportedHttpVersion = 15,
}

impl ErrorCode {
    /// Stable uppercase name of this code, without any namespace prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::None => "NONE",
            ErrorCode::UnexpectedData => "UNEXPECTED_DATA",
            ErrorCode::UnexpectedEof => "UNEXPECTED_EOF",
            ErrorCode::CallbackError => "CALLBACK_ERROR",
            ErrorCode::UnexpectedCharacter => "UNEXPECTED_CHARACTER",
            ErrorCode::UnexpectedContentLength => "UNEXPECTED_CONTENT_LENGTH",
            ErrorCode::UnexpectedTransferEncoding => "UNEXPECTED_TRANSFER_ENCODING",
            ErrorCode::UnexpectedContent => "UNEXPECTED_CONTENT",
            ErrorCode::Untrailers => "UNTRAILERS",
            ErrorCode::InvalidVersion => "INVALID_VERSION",
            ErrorCode::InvalidStatus => "INVALID_STATUS",
            ErrorCode::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            ErrorCode::InvalidTransferEncoding => "INVALID_TRANSFER_ENCODING",
            ErrorCode::InvalidChunkSize => "INVALID_CHUNK_SIZE",
            ErrorCode::MissingConnectionUpgrade => "MISSING_CONNECTION_UPGRADE",
            ErrorCode::UnsupportedHttpVersion => "UNSUPPORTED_HTTP_VERSION",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event callback.
///
/// `data` borrows from the buffer passed to [`Parser::parse`] and is only
/// valid for the duration of the call; copy it out if it must outlive the
/// callback. The return value is a control code: `0` continues parsing,
/// any other value aborts with `CALLBACK_ERROR` — except for `on_headers`,
/// where a positive return sets `skip_body` (used by hosts for HEAD
/// exchanges and 1xx/204/304 responses).
pub type Callback<H> = fn(&mut Parser<H>, &[u8]) -> isize;

/// A callback that does nothing and continues parsing. The default for
/// every [`Callbacks`] slot.
pub fn noop<H>(_parser: &mut Parser<H>, _data: &[u8]) -> isize {
    0
}

/// The event callback record.
///
/// `on_body` fires exactly once when the body phase begins; `on_data`
/// streams the payload bytes (repeatedly, for chunked bodies or split
/// input). `on_trailers` is the final event of a chunked message before
/// `on_message_complete`.
#[allow(missing_docs)]
pub struct Callbacks<H> {
    pub before_state_change: Callback<H>,
    pub after_state_change: Callback<H>,
    pub on_error: Callback<H>,
    pub on_finish: Callback<H>,
    pub on_message_start: Callback<H>,
    pub on_message_complete: Callback<H>,
    pub on_request: Callback<H>,
    pub on_response: Callback<H>,
    pub on_reset: Callback<H>,
    pub on_method: Callback<H>,
    pub on_url: Callback<H>,
    pub on_protocol: Callback<H>,
    pub on_version: Callback<H>,
    pub on_status: Callback<H>,
    pub on_reason: Callback<H>,
    pub on_header_name: Callback<H>,
    pub on_header_value: Callback<H>,
    pub on_headers: Callback<H>,
    pub on_connect: Callback<H>,
    pub on_upgrade: Callback<H>,
    pub on_chunk_length: Callback<H>,
    pub on_chunk_extension_name: Callback<H>,
    pub on_chunk_extension_value: Callback<H>,
    pub on_body: Callback<H>,
    pub on_data: Callback<H>,
    pub on_trailer_name: Callback<H>,
    pub on_trailer_value: Callback<H>,
    pub on_trailers: Callback<H>,
}

impl<H> Default for Callbacks<H> {
    fn default() -> Self {
        Self {
            before_state_change: noop,
            after_state_change: noop,
            on_error: noop,
            on_finish: noop,
            on_message_start: noop,
            on_message_complete: noop,
            on_request: noop,
            on_response: noop,
            on_reset: noop,
            on_method: noop,
            on_url: noop,
            on_protocol: noop,
            on_version: noop,
            on_status: noop,
            on_reason: noop,
            on_header_name: noop,
            on_header_value: noop,
            on_headers: noop,
            on_connect: noop,
            on_upgrade: noop,
            on_chunk_length: noop,
            on_chunk_extension_name: noop,
            on_chunk_extension_value: noop,
            on_body: noop,
            on_data: noop,
            on_trailer_name: noop,
            on_trailer_value: noop,
            on_trailers: noop,
        }
    }
}

impl<H> Clone for Callbacks<H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for Callbacks<H> {}

/// Incremental HTTP/1.x message parser.
///
/// A parser ingests byte slices through [`parse`](Parser::parse) and
/// surfaces structure through the [`Callbacks`] record. It owns no
/// buffers: every span handed to a callback borrows from the caller's
/// input. `parse` consumes whole tokens only — a partial trailing token
/// is left unconsumed and must be re-presented (prepended to the next
/// chunk) by the host. Body payload bytes are the exception and stream
/// incrementally.
///
/// `H` is the host's state, reachable from callbacks via `parser.owner`.
pub struct Parser<H = ()> {
    /// Host state slot. Never interpreted by the parser.
    pub owner: H,
    /// Event callbacks; every slot defaults to [`noop`].
    pub callbacks: Callbacks<H>,

    pub(crate) state: State,
    pub(crate) position: u64,
    pub(crate) paused: bool,
    pub(crate) mode: Mode,
    pub(crate) message_type: Mode,
    pub(crate) error_code: ErrorCode,
    pub(crate) error_description: &'static str,

    pub(crate) method: Option<Method>,
    pub(crate) status: u16,
    pub(crate) version_major: u8,
    pub(crate) version_minor: u8,
    pub(crate) connection: ConnectionKind,

    pub(crate) has_content_length: bool,
    pub(crate) has_chunked_transfer_encoding: bool,
    pub(crate) has_upgrade: bool,
    pub(crate) has_trailers: bool,

    pub(crate) content_length: u64,
    pub(crate) chunk_size: u64,
    pub(crate) remaining_content_length: u64,
    pub(crate) remaining_chunk_size: u64,

    pub(crate) is_connect: bool,
    pub(crate) skip_body: bool,
    pub(crate) continue_without_data: bool,
    // Stops the current parse call after a close-delimited message.
    pub(crate) message_boundary_halt: bool,

    // Connection header directives, resolved at end of headers.
    pub(crate) saw_close: bool,
    pub(crate) saw_keep_alive: bool,
    pub(crate) saw_upgrade: bool,
}

impl Parser<()> {
    /// Create a parser in AUTODETECT mode with no host state.
    pub fn new() -> Self {
        Self::with_owner(())
    }
}

impl Default for Parser<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Parser<H> {
    /// Create a parser in AUTODETECT mode carrying host state.
    pub fn with_owner(owner: H) -> Self {
        Self {
            owner,
            callbacks: Callbacks::default(),
            state: State::Start,
            position: 0,
            paused: false,
            mode: Mode::Autodetect,
            message_type: Mode::Autodetect,
            error_code: ErrorCode::None,
            error_description: "",
            method: None,
            status: 0,
            version_major: 0,
            version_minor: 0,
            connection: ConnectionKind::KeepAlive,
            has_content_length: false,
            has_chunked_transfer_encoding: false,
            has_upgrade: false,
            has_trailers: false,
            content_length: 0,
            chunk_size: 0,
            remaining_content_length: 0,
            remaining_chunk_size: 0,
            is_connect: false,
            skip_body: false,
            continue_without_data: false,
            message_boundary_halt: false,
            saw_close: false,
            saw_keep_alive: false,
            saw_upgrade: false,
        }
    }

    /// Pin the parser to one side of the protocol. Only meaningful before
    /// the first byte of the first message.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Pre-parse hint that the next message relates to a CONNECT exchange
    /// (request side: the request is a CONNECT; response side: the
    /// response answers one, so a 2xx yields to a tunnel).
    ///
    /// Only accepted while the parser sits in START; returns `false` and
    /// changes nothing once parsing has begun.
    pub fn mark_connect(&mut self) -> bool {
        if self.state != State::Start {
            return false;
        }
        self.is_connect = true;
        true
    }

    /// Return the parser to START.
    ///
    /// Clears the error, framing flags and counters, and fires `on_reset`.
    /// `position` survives when `keep_position` is set. Mode, owner and
    /// callbacks are untouched.
    pub fn reset(&mut self, keep_position: bool) {
        self.state = State::Start;
        self.paused = false;
        self.error_code = ErrorCode::None;
        self.error_description = "";
        self.continue_without_data = false;
        self.message_boundary_halt = false;
        if !keep_position {
            self.position = 0;
        }
        self.clear_message_state();
        let cb = self.callbacks.on_reset;
        let _ = cb(self, &[]);
    }

    /// Clear per-message fields. Runs at message start and on reset.
    pub(crate) fn clear_message_state(&mut self) {
        self.message_type = self.mode;
        self.method = None;
        self.status = 0;
        self.version_major = 0;
        self.version_minor = 0;
        self.connection = ConnectionKind::KeepAlive;
        self.has_content_length = false;
        self.has_chunked_transfer_encoding = false;
        self.has_upgrade = false;
        self.has_trailers = false;
        self.content_length = 0;
        self.chunk_size = 0;
        self.remaining_content_length = 0;
        self.remaining_chunk_size = 0;
        self.is_connect = false;
        self.skip_body = false;
        self.saw_close = false;
        self.saw_keep_alive = false;
        self.saw_upgrade = false;
    }

    /// Suspend the parser. While paused, [`parse`](Parser::parse) returns
    /// 0 without consuming. May be called from within a callback; parsing
    /// then halts at the current offset.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Clear a pause; the next [`parse`](Parser::parse) proceeds.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Current FSM state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Current FSM state as its stable uppercase name.
    pub fn state_str(&self) -> &'static str {
        self.state.as_str()
    }

    /// Total bytes consumed since creation or the last positional reset.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the parser is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The configured protocol side.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The resolved side of the protocol for the current message.
    pub fn message_type(&self) -> Mode {
        self.message_type
    }

    /// Sticky error code; `ErrorCode::None` while healthy.
    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    /// Sticky error code as its stable uppercase name.
    pub fn error_code_str(&self) -> &'static str {
        self.error_code.as_str()
    }

    /// Human-readable reason for the current error, or `""`.
    pub fn error_description(&self) -> &'static str {
        self.error_description
    }

    /// Valid after the `on_method` event of the current message.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// Valid after the `on_status` event; always within 100–599.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Major HTTP version; valid after the `on_version` event.
    pub fn version_major(&self) -> u8 {
        self.version_major
    }

    /// Minor HTTP version; valid after the `on_version` event.
    pub fn version_minor(&self) -> u8 {
        self.version_minor
    }

    /// Valid after the `on_headers` event.
    pub fn connection(&self) -> ConnectionKind {
        self.connection
    }

    /// Whether a Content-Length header framed this message.
    pub fn has_content_length(&self) -> bool {
        self.has_content_length
    }

    /// Whether chunked Transfer-Encoding framed this message.
    pub fn has_chunked_transfer_encoding(&self) -> bool {
        self.has_chunked_transfer_encoding
    }

    /// Whether an Upgrade header was present.
    pub fn has_upgrade(&self) -> bool {
        self.has_upgrade
    }

    /// Whether a Trailer header announced trailers.
    pub fn has_trailers(&self) -> bool {
        self.has_trailers
    }

    /// Declared Content-Length of the current message.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Size of the chunk currently being read.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Body bytes still expected under Content-Length framing.
    pub fn remaining_content_length(&self) -> u64 {
        self.remaining_content_length
    }

    /// Payload bytes still expected in the current chunk.
    pub fn remaining_chunk_size(&self) -> u64 {
        self.remaining_chunk_size
    }

    /// Whether this message belongs to a CONNECT exchange.
    pub fn is_connect(&self) -> bool {
        self.is_connect
    }

    /// Whether body delivery is suppressed for this message.
    pub fn skip_body(&self) -> bool {
        self.skip_body
    }
}
