#![warn(missing_docs)]
//! Incremental HTTP/1.x message parser with zero-copy event callbacks.
//!
//! The parser consumes a byte stream in arbitrary chunks, recognizes
//! requests and responses, and surfaces structure (method, target,
//! headers, body data, chunk boundaries, trailers, message boundaries)
//! through a record of callbacks. It enforces RFC 7230 framing: exactly
//! one of Content-Length / chunked Transfer-Encoding, conflict rejection,
//! CONNECT and upgrade tunneling, trailers only with chunked encoding.
//!
//! The parser owns no buffers: every span handed to a callback borrows
//! from the caller's input and is valid only for that callback. `parse`
//! consumes whole tokens — when input ends mid-token the unconsumed tail
//! is reported back and must be re-presented with the next chunk (a
//! connection layer typically keeps a small carry buffer; see the
//! `http-conntrack` crate).
//!
//! # Example
//!
//! ```
//! use h1session::{Mode, Parser};
//!
//! fn on_url(parser: &mut Parser<Vec<u8>>, data: &[u8]) -> isize {
//!     parser.owner.extend_from_slice(data);
//!     0
//! }
//!
//! let mut parser = Parser::with_owner(Vec::new());
//! parser.set_mode(Mode::Request);
//! parser.callbacks.on_url = on_url;
//!
//! let input = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let consumed = parser.parse(input);
//! assert_eq!(consumed, input.len());
//! assert_eq!(parser.owner, b"/index.html");
//! ```
//!
//! # Feature flags
//!
//! - **`tracing`** — emit `tracing::warn!` events when the parser enters
//!   the error state.

mod parse;
mod state;
mod token;

#[cfg(test)]
mod tests;

#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) }
}
#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {{}};
}
pub(crate) use trace_warn;

pub use state::{noop, Callback, Callbacks, ConnectionKind, ErrorCode, Mode, Parser, State};
pub use token::Method;
