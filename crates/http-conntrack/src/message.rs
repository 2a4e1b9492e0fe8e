//! Assembled HTTP messages.
//!
//! The parser's zero-copy events are collected by the session layer into
//! these owned, `http`-typed values. Header names or values the `http`
//! crate rejects are skipped rather than failing the message.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};

use crate::clock::TimestampNs;

/// An assembled HTTP/1.x request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Raw request target, exactly as it appeared on the wire.
    pub target: String,
    pub version: Version,
    pub headers: HeaderMap,
    /// Trailer fields of a chunked message; empty otherwise.
    pub trailers: HeaderMap,
    pub body: Vec<u8>,
    /// When the message started arriving.
    pub timestamp_ns: TimestampNs,
}

/// An assembled HTTP/1.x response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Reason phrase, when one was present on the status line.
    pub reason: Option<String>,
    pub version: Version,
    pub headers: HeaderMap,
    /// Trailer fields of a chunked message; empty otherwise.
    pub trailers: HeaderMap,
    pub body: Vec<u8>,
    /// When the message started arriving.
    pub timestamp_ns: TimestampNs,
}

/// A completed message from either side of the protocol.
#[derive(Debug, Clone)]
pub enum Message {
    Request(HttpRequest),
    Response(HttpResponse),
}

impl Message {
    /// Returns true if this is a request.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns true if this is a response.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Get the request if this is a request, None otherwise.
    pub fn as_request(&self) -> Option<&HttpRequest> {
        match self {
            Self::Request(req) => Some(req),
            Self::Response(_) => None,
        }
    }

    /// Get the response if this is a response, None otherwise.
    pub fn as_response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Request(_) => None,
            Self::Response(resp) => Some(resp),
        }
    }
}

fn trim_trailing_ows(value: &[u8]) -> &[u8] {
    let end = value
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(0, |e| e + 1);
    &value[..end]
}

/// Build a `HeaderMap` from collected name/value pairs, trimming trailing
/// OWS from values and skipping pairs the `http` crate rejects.
pub(crate) fn header_map_from_pairs(pairs: &[(Vec<u8>, Vec<u8>)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let parsed = (
            HeaderName::from_bytes(name),
            HeaderValue::from_bytes(trim_trailing_ows(value)),
        );
        if let (Ok(name), Ok(value)) = parsed {
            map.append(name, value);
        }
    }
    map
}

pub(crate) fn http_version(major: u8, minor: u8) -> Version {
    if major == 1 && minor == 0 {
        Version::HTTP_10
    } else {
        Version::HTTP_11
    }
}
