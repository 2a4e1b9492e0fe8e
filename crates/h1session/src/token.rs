/// Wire constants (RFC 7230: CRLF line endings, SP/HTAB whitespace)
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const SP: u8 = b' ';
pub(crate) const HTAB: u8 = b'\t';
pub(crate) const SEMICOLON: u8 = b';';
pub(crate) const EQUALS: u8 = b'=';
pub(crate) const DQUOTE: u8 = b'"';

/// Longest recognized method token (`UPDATEREDIRECTREF`).
pub(crate) const METHOD_MAX_LEN: usize = 17;

/// RFC 7230 `tchar`: allowed in header field names, method tokens and
/// chunk extension names.
pub(crate) fn is_token_char(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// Request targets: any visible byte. SP terminates the token, CR/LF and
/// other controls are rejected.
pub(crate) fn is_target_char(b: u8) -> bool {
    b > 0x20 && b != 0x7F
}

/// Header field values: visible bytes, SP/HTAB, and obs-text (>= 0x80).
pub(crate) fn is_value_char(b: u8) -> bool {
    b == HTAB || (b >= SP && b != 0x7F)
}

pub(crate) fn is_ows(b: u8) -> bool {
    b == SP || b == HTAB
}

pub(crate) fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

pub(crate) fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

/// Value of a hex digit that already passed [`is_hex_digit`].
pub(crate) fn hex_value(b: u8) -> u64 {
    match b {
        b'0'..=b'9' => (b - b'0') as u64,
        b'a'..=b'f' => (b - b'a' + 10) as u64,
        _ => (b - b'A' + 10) as u64,
    }
}

/// Recognized request methods.
///
/// The discriminants are a wire-compatibility contract: hosts index into
/// method tables by these values, so the assignments are fixed.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Acl = 0,
    BaselineControl = 1,
    Bind = 2,
    Checkin = 3,
    Checkout = 4,
    Connect = 5,
    Copy = 6,
    Delete = 7,
    Get = 8,
    Head = 9,
    Label = 10,
    Link = 11,
    Lock = 12,
    Merge = 13,
    Mkactivity = 14,
    Mkcalendar = 15,
    Mkcol = 16,
    Mkredirectref = 17,
    Mkworkspace = 18,
    Move = 19,
    Options = 20,
    Orderpatch = 21,
    Patch = 22,
    Post = 23,
    Pri = 24,
    Propfind = 25,
    Proppatch = 26,
    Put = 27,
    Rebind = 28,
    Report = 29,
    Search = 30,
    Trace = 31,
    Unbind = 32,
    Uncheckout = 33,
    Unlink = 34,
    Unlock = 35,
    Update = 36,
    Updateredirectref = 37,
    VersionControl = 38,
    Describe = 39,
    GetParameter = 40,
    Pause = 41,
    Play = 42,
    PlayNotify = 43,
    Redirect = 44,
    Setup = 45,
    SetParameter = 46,
    Teardown = 47,
    Purge = 48,
}

impl Method {
    /// Match a method token byte-for-byte (uppercase ASCII, case-sensitive).
    pub fn from_token(token: &[u8]) -> Option<Method> {
        let m = match token {
            b"ACL" => Method::Acl,
            b"BASELINE_CONTROL" => Method::BaselineControl,
            b"BIND" => Method::Bind,
            b"CHECKIN" => Method::Checkin,
            b"CHECKOUT" => Method::Checkout,
            b"CONNECT" => Method::Connect,
            b"COPY" => Method::Copy,
            b"DELETE" => Method::Delete,
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            b"LABEL" => Method::Label,
            b"LINK" => Method::Link,
            b"LOCK" => Method::Lock,
            b"MERGE" => Method::Merge,
            b"MKACTIVITY" => Method::Mkactivity,
            b"MKCALENDAR" => Method::Mkcalendar,
            b"MKCOL" => Method::Mkcol,
            b"MKREDIRECTREF" => Method::Mkredirectref,
            b"MKWORKSPACE" => Method::Mkworkspace,
            b"MOVE" => Method::Move,
            b"OPTIONS" => Method::Options,
            b"ORDERPATCH" => Method::Orderpatch,
            b"PATCH" => Method::Patch,
            b"POST" => Method::Post,
            b"PRI" => Method::Pri,
            b"PROPFIND" => Method::Propfind,
            b"PROPPATCH" => Method::Proppatch,
            b"PUT" => Method::Put,
            b"REBIND" => Method::Rebind,
            b"REPORT" => Method::Report,
            b"SEARCH" => Method::Search,
            b"TRACE" => Method::Trace,
            b"UNBIND" => Method::Unbind,
            b"UNCHECKOUT" => Method::Uncheckout,
            b"UNLINK" => Method::Unlink,
            b"UNLOCK" => Method::Unlock,
            b"UPDATE" => Method::Update,
            b"UPDATEREDIRECTREF" => Method::Updateredirectref,
            b"VERSION_CONTROL" => Method::VersionControl,
            b"DESCRIBE" => Method::Describe,
            b"GET_PARAMETER" => Method::GetParameter,
            b"PAUSE" => Method::Pause,
            b"PLAY" => Method::Play,
            b"PLAY_NOTIFY" => Method::PlayNotify,
            b"REDIRECT" => Method::Redirect,
            b"SETUP" => Method::Setup,
            b"SET_PARAMETER" => Method::SetParameter,
            b"TEARDOWN" => Method::Teardown,
            b"PURGE" => Method::Purge,
            _ => return None,
        };
        Some(m)
    }

    /// The wire token for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Acl => "ACL",
            Method::BaselineControl => "BASELINE_CONTROL",
            Method::Bind => "BIND",
            Method::Checkin => "CHECKIN",
            Method::Checkout => "CHECKOUT",
            Method::Connect => "CONNECT",
            Method::Copy => "COPY",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Label => "LABEL",
            Method::Link => "LINK",
            Method::Lock => "LOCK",
            Method::Merge => "MERGE",
            Method::Mkactivity => "MKACTIVITY",
            Method::Mkcalendar => "MKCALENDAR",
            Method::Mkcol => "MKCOL",
            Method::Mkredirectref => "MKREDIRECTREF",
            Method::Mkworkspace => "MKWORKSPACE",
            Method::Move => "MOVE",
            Method::Options => "OPTIONS",
            Method::Orderpatch => "ORDERPATCH",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Pri => "PRI",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Put => "PUT",
            Method::Rebind => "REBIND",
            Method::Report => "REPORT",
            Method::Search => "SEARCH",
            Method::Trace => "TRACE",
            Method::Unbind => "UNBIND",
            Method::Uncheckout => "UNCHECKOUT",
            Method::Unlink => "UNLINK",
            Method::Unlock => "UNLOCK",
            Method::Update => "UPDATE",
            Method::Updateredirectref => "UPDATEREDIRECTREF",
            Method::VersionControl => "VERSION_CONTROL",
            Method::Describe => "DESCRIBE",
            Method::GetParameter => "GET_PARAMETER",
            Method::Pause => "PAUSE",
            Method::Play => "PLAY",
            Method::PlayNotify => "PLAY_NOTIFY",
            Method::Redirect => "REDIRECT",
            Method::Setup => "SETUP",
            Method::SetParameter => "SET_PARAMETER",
            Method::Teardown => "TEARDOWN",
            Method::Purge => "PURGE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive equality against a lowercase ASCII reference.
pub(crate) fn eq_ignore_case(bytes: &[u8], lower: &[u8]) -> bool {
    bytes.len() == lower.len()
        && bytes
            .iter()
            .zip(lower)
            .all(|(b, l)| b.to_ascii_lowercase() == *l)
}

/// Split a comma-separated header value into trimmed tokens and fold them
/// through `f`. Used for `Transfer-Encoding` and `Connection`.
pub(crate) fn for_each_list_token(value: &[u8], mut f: impl FnMut(&[u8])) {
    for part in value.split(|&b| b == b',') {
        let start = part.iter().position(|&b| !is_ows(b)).unwrap_or(part.len());
        let end = part.iter().rposition(|&b| !is_ows(b)).map_or(start, |e| e + 1);
        if end > start {
            f(&part[start..end]);
        }
    }
}
