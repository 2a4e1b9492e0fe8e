use crate::token::{eq_ignore_case, for_each_list_token, is_token_char};
use crate::{ConnectionKind, ErrorCode, Method, Mode, Parser, State};
use rstest::rstest;

fn request_parser() -> Parser {
    let mut parser = Parser::new();
    parser.set_mode(Mode::Request);
    parser
}

fn response_parser() -> Parser {
    let mut parser = Parser::new();
    parser.set_mode(Mode::Response);
    parser
}

/// Feed the whole input, re-presenting the unconsumed tail until the
/// parser stops making progress.
fn drive<H>(parser: &mut Parser<H>, input: &[u8]) -> usize {
    let mut offset = 0;
    loop {
        let n = parser.parse(&input[offset..]);
        offset += n;
        if n == 0 {
            return offset;
        }
    }
}

// =============================================================================
// Tokens and methods
// =============================================================================

#[test]
fn test_token_chars() {
    assert!(is_token_char(b'a'));
    assert!(is_token_char(b'Z'));
    assert!(is_token_char(b'0'));
    assert!(is_token_char(b'-'));
    assert!(is_token_char(b'_'));
    assert!(!is_token_char(b' '));
    assert!(!is_token_char(b':'));
    assert!(!is_token_char(b'\r'));
    assert!(!is_token_char(0x7F));
}

#[rstest]
#[case(b"GET", Method::Get, 8)]
#[case(b"CONNECT", Method::Connect, 5)]
#[case(b"ACL", Method::Acl, 0)]
#[case(b"PURGE", Method::Purge, 48)]
#[case(b"VERSION_CONTROL", Method::VersionControl, 38)]
#[case(b"UPDATEREDIRECTREF", Method::Updateredirectref, 37)]
#[case(b"SET_PARAMETER", Method::SetParameter, 46)]
fn test_method_table(#[case] token: &[u8], #[case] expected: Method, #[case] index: u8) {
    let method = Method::from_token(token).expect("token should be recognized");
    assert_eq!(method, expected);
    assert_eq!(method as u8, index, "method index is a contract");
    assert_eq!(method.as_str().as_bytes(), token);
}

#[rstest]
#[case(b"get")]
#[case(b"GETX")]
#[case(b"")]
#[case(b"G ET")]
fn test_method_table_rejects(#[case] token: &[u8]) {
    assert!(Method::from_token(token).is_none());
}

#[test]
fn test_list_token_splitting() {
    let mut tokens: Vec<Vec<u8>> = Vec::new();
    for_each_list_token(b" gzip , chunked ,, x ", |t| tokens.push(t.to_vec()));
    assert_eq!(tokens, vec![b"gzip".to_vec(), b"chunked".to_vec(), b"x".to_vec()]);
}

#[test]
fn test_eq_ignore_case() {
    assert!(eq_ignore_case(b"Content-Length", b"content-length"));
    assert!(eq_ignore_case(b"UPGRADE", b"upgrade"));
    assert!(!eq_ignore_case(b"content-length2", b"content-length"));
}

// =============================================================================
// Request and status lines
// =============================================================================

#[test]
fn test_simple_get() {
    let mut parser = request_parser();
    let input = b"GET /index HTTP/1.1\r\nHost: example.com\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert_eq!(parser.method(), Some(Method::Get));
    assert_eq!(parser.version_major(), 1);
    assert_eq!(parser.version_minor(), 1);
    assert_eq!(parser.connection(), ConnectionKind::KeepAlive);
    // Back in START, ready for the next pipelined message.
    assert_eq!(parser.state(), State::Start);
}

#[rstest]
#[case(&b"GET / HTTP/2.0\r\n\r\n"[..])]
#[case(&b"GET / HTTP/0.9\r\n\r\n"[..])]
#[case(&b"GET / HTTP/1.2\r\n\r\n"[..])]
fn test_unsupported_versions(#[case] input: &[u8]) {
    let mut parser = request_parser();
    drive(&mut parser, input);
    assert_eq!(parser.error_code(), ErrorCode::UnsupportedHttpVersion);
    assert_eq!(parser.state(), State::Error);
}

#[test]
fn test_malformed_version() {
    let mut parser = request_parser();
    drive(&mut parser, b"GET / HTTP/x.1\r\n\r\n");
    assert_eq!(parser.error_code(), ErrorCode::InvalidVersion);
}

#[test]
fn test_unknown_method() {
    let mut parser = request_parser();
    drive(&mut parser, b"FETCH / HTTP/1.1\r\n\r\n");
    assert_eq!(parser.error_code(), ErrorCode::UnexpectedCharacter);
}

#[test]
fn test_status_line_with_and_without_reason() {
    let mut parser = response_parser();
    let input = b"HTTP/1.1 204 No Content\r\n\r\n";
    drive(&mut parser, input);
    assert_eq!(parser.status(), 204);
    assert_eq!(parser.error_code(), ErrorCode::None);

    let mut parser = response_parser();
    drive(&mut parser, b"HTTP/1.1 204\r\n\r\n");
    assert_eq!(parser.status(), 204, "empty reason phrase is accepted");
    assert_eq!(parser.error_code(), ErrorCode::None);
}

#[rstest]
#[case(&b"HTTP/1.1 099 Low\r\n\r\n"[..])]
#[case(&b"HTTP/1.1 600 High\r\n\r\n"[..])]
#[case(&b"HTTP/1.1 2x4 Bad\r\n\r\n"[..])]
fn test_invalid_status(#[case] input: &[u8]) {
    let mut parser = response_parser();
    drive(&mut parser, input);
    assert_eq!(parser.error_code(), ErrorCode::InvalidStatus);
}

// =============================================================================
// Autodetect
// =============================================================================

#[test]
fn test_autodetect_response() {
    let mut parser = Parser::new();
    drive(&mut parser, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    assert_eq!(parser.message_type(), Mode::Response);
    assert_eq!(parser.status(), 200);
}

#[test]
fn test_autodetect_request_starting_with_h() {
    // "HEAD" shares a prefix with "HTTP/"; detection must wait it out.
    let mut parser = Parser::new();
    assert_eq!(parser.parse(b"H"), 0, "single H is ambiguous");
    assert_eq!(parser.parse(b"HEA"), 0, "request side resolved, method still incomplete");
    let input = b"HEAD / HTTP/1.1\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.message_type(), Mode::Request);
    assert_eq!(parser.method(), Some(Method::Head));
}

// =============================================================================
// Framing conflicts and duplicates
// =============================================================================

#[test]
fn test_transfer_encoding_after_content_length() {
    let mut parser = request_parser();
    drive(
        &mut parser,
        b"POST /u HTTP/1.1\r\nContent-Length: 3\r\nTransfer-Encoding: chunked\r\n\r\n",
    );
    assert_eq!(parser.error_code(), ErrorCode::UnexpectedTransferEncoding);
}

#[test]
fn test_content_length_after_chunked() {
    let mut parser = request_parser();
    drive(
        &mut parser,
        b"POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n",
    );
    assert_eq!(parser.error_code(), ErrorCode::UnexpectedContentLength);
}

#[test]
fn test_duplicate_content_length_same_value() {
    let mut parser = request_parser();
    let input = b"POST /u HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nhello";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
}

#[test]
fn test_duplicate_content_length_mismatch() {
    let mut parser = request_parser();
    drive(
        &mut parser,
        b"POST /u HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 6\r\n\r\n",
    );
    assert_eq!(parser.error_code(), ErrorCode::UnexpectedContentLength);
}

#[rstest]
#[case(&b"POST /u HTTP/1.1\r\nContent-Length: 5x\r\n\r\n"[..])]
#[case(&b"POST /u HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n"[..])]
fn test_invalid_content_length(#[case] input: &[u8]) {
    let mut parser = request_parser();
    drive(&mut parser, input);
    assert_eq!(parser.error_code(), ErrorCode::InvalidContentLength);
}

#[test]
fn test_transfer_encoding_not_actually_chunked() {
    // "chunkedchunked" is not the token "chunked": the header is ordinary
    // and the request simply has no body.
    let mut parser = request_parser();
    let input = b"POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunkedchunked\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert!(!parser.has_chunked_transfer_encoding());
    assert_eq!(parser.state(), State::Start, "message completed without a body");
}

#[rstest]
#[case(&b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked, chunked\r\n\r\n"[..])]
#[case(&b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked, gzip\r\n\r\n"[..])]
fn test_transfer_encoding_chunked_must_be_final(#[case] input: &[u8]) {
    let mut parser = request_parser();
    drive(&mut parser, input);
    assert_eq!(parser.error_code(), ErrorCode::InvalidTransferEncoding);
}

#[test]
fn test_transfer_encoding_chunked_final_after_other_codings() {
    let mut parser = request_parser();
    let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n0\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert!(parser.has_chunked_transfer_encoding());
}

// =============================================================================
// Trailer gating and upgrades
// =============================================================================

#[test]
fn test_trailer_without_chunked_rejected() {
    let mut parser = request_parser();
    drive(
        &mut parser,
        b"POST / HTTP/1.1\r\nTrailer: X-End\r\nContent-Length: 2\r\n\r\nok",
    );
    assert_eq!(parser.error_code(), ErrorCode::Untrailers);
}

#[test]
fn test_upgrade_without_connection_upgrade() {
    let mut parser = request_parser();
    drive(&mut parser, b"GET / HTTP/1.1\r\nUpgrade: h2c\r\n\r\n");
    assert_eq!(parser.error_code(), ErrorCode::MissingConnectionUpgrade);
}

#[test]
fn test_connection_upgrade_without_upgrade_header_is_regular() {
    let mut parser = request_parser();
    let input = b"GET / HTTP/1.1\r\nConnection: upgrade\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert_eq!(parser.connection(), ConnectionKind::KeepAlive);
    assert_eq!(parser.state(), State::Start);
}

#[test]
fn test_full_upgrade_tunnels() {
    let mut parser = request_parser();
    let head = b"GET / HTTP/1.1\r\nConnection: upgrade\r\nUpgrade: h2c\r\n\r\n";
    let mut input = head.to_vec();
    input.extend_from_slice(b"NEWPROTO");
    let consumed = drive(&mut parser, &input);
    assert_eq!(consumed, head.len(), "bytes after the upgrade belong to the host");
    assert_eq!(parser.connection(), ConnectionKind::Upgrade);
    assert_eq!(parser.state(), State::Tunnel);
}

// =============================================================================
// Keep-alive inference
// =============================================================================

#[rstest]
#[case(&b"GET / HTTP/1.1\r\n\r\n"[..], ConnectionKind::KeepAlive)]
#[case(&b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n"[..], ConnectionKind::Close)]
#[case(&b"GET / HTTP/1.0\r\n\r\n"[..], ConnectionKind::Close)]
#[case(&b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n"[..], ConnectionKind::KeepAlive)]
fn test_keep_alive_inference(#[case] input: &[u8], #[case] expected: ConnectionKind) {
    let mut parser = request_parser();
    drive(&mut parser, input);
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert_eq!(parser.connection(), expected);
}

// =============================================================================
// Chunk sizes and extensions
// =============================================================================

#[test]
fn test_chunk_size_overflow() {
    let mut parser = request_parser();
    drive(
        &mut parser,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nFFFFFFFFFFFFFFFFF\r\n",
    );
    assert_eq!(parser.error_code(), ErrorCode::InvalidChunkSize);
}

#[test]
fn test_chunk_size_leading_zeros() {
    let mut parser = request_parser();
    let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0005\r\nhello\r\n0\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
}

#[test]
fn test_chunk_extensions() {
    let mut parser = request_parser();
    let input =
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5;ext=val;flag\r\nhello\r\n0\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert_eq!(parser.chunk_size(), 0, "last seen chunk is the terminal one");
}

#[test]
fn test_chunk_extension_quoted_value() {
    let mut parser = request_parser();
    let input =
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5;a=\"x;y \\\" z\"\r\nhello\r\n0\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
}

// =============================================================================
// Lifecycle: pause, resume, reset, finish
// =============================================================================

#[test]
fn test_pause_from_callback_and_resume() {
    fn pause_on_url(parser: &mut Parser<()>, _data: &[u8]) -> isize {
        parser.pause();
        0
    }
    let mut parser = request_parser();
    parser.callbacks.on_url = pause_on_url;

    let input = b"GET /p HTTP/1.1\r\n\r\n";
    let consumed = parser.parse(input);
    assert_eq!(consumed, 7, "halts right after the target token");
    assert!(parser.is_paused());
    assert_eq!(parser.parse(&input[consumed..]), 0, "paused parser consumes nothing");

    parser.resume();
    assert_eq!(parser.parse(&input[consumed..]), input.len() - consumed);
    assert_eq!(parser.error_code(), ErrorCode::None);
}

#[test]
fn test_reset_positions() {
    let mut parser = request_parser();
    let input = b"GET / HTTP/1.1\r\n\r\n";
    drive(&mut parser, input);
    assert_eq!(parser.position(), input.len() as u64);

    parser.reset(true);
    assert_eq!(parser.position(), input.len() as u64);
    assert_eq!(parser.state(), State::Start);

    parser.reset(false);
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_reset_clears_error() {
    let mut parser = request_parser();
    drive(&mut parser, b"GET / HTTP/9.9\r\n\r\n");
    assert_eq!(parser.error_code(), ErrorCode::UnsupportedHttpVersion);

    parser.reset(false);
    assert_eq!(parser.error_code(), ErrorCode::None);
    let input = b"GET / HTTP/1.1\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
}

#[test]
fn test_finish_at_rest() {
    let mut parser = request_parser();
    parser.finish();
    assert_eq!(parser.state(), State::Finish);

    // Idempotent.
    parser.finish();
    assert_eq!(parser.state(), State::Finish);

    // New data after finish is rejected.
    parser.parse(b"GET / HTTP/1.1\r\n\r\n");
    assert_eq!(parser.error_code(), ErrorCode::UnexpectedData);
}

#[test]
fn test_finish_mid_message() {
    let mut parser = request_parser();
    parser.parse(b"GET / HTTP/1.1\r\nHost:");
    parser.finish();
    assert_eq!(parser.error_code(), ErrorCode::UnexpectedEof);
}

#[test]
fn test_finish_does_not_override_error() {
    let mut parser = request_parser();
    drive(&mut parser, b"GET / HTTP/9.9\r\n\r\n");
    parser.finish();
    assert_eq!(parser.error_code(), ErrorCode::UnsupportedHttpVersion);
}

#[test]
fn test_error_stickiness() {
    let mut parser = request_parser();
    drive(&mut parser, b"FETCH / HTTP/1.1\r\n\r\n");
    let code = parser.error_code();
    assert_ne!(code, ErrorCode::None);

    assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n\r\n"), 0);
    assert_eq!(parser.error_code(), code, "first error is preserved");
}

// =============================================================================
// CONNECT hint
// =============================================================================

#[test]
fn test_mark_connect_only_before_parsing() {
    let mut parser = response_parser();
    assert!(parser.mark_connect());

    let head = b"HTTP/1.1 200 Connection Established\r\n\r\n";
    let mut input = head.to_vec();
    input.extend_from_slice(b"TUNNELBYTES");
    let consumed = drive(&mut parser, &input);
    assert_eq!(consumed, head.len());
    assert_eq!(parser.state(), State::Tunnel);
}

#[test]
fn test_mark_connect_rejected_mid_message() {
    let mut parser = request_parser();
    parser.parse(b"GET ");
    assert!(!parser.mark_connect(), "hint must be set before parsing begins");
    assert!(!parser.is_connect());
}

#[test]
fn test_connect_response_non_2xx_has_body() {
    // A failed CONNECT (e.g. 407) is an ordinary response.
    let mut parser = response_parser();
    assert!(parser.mark_connect());
    let input = b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 2\r\n\r\nno";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_ne!(parser.state(), State::Tunnel);
    assert_eq!(parser.error_code(), ErrorCode::None);
}

// =============================================================================
// Callback control codes
// =============================================================================

#[test]
fn test_callback_negative_return_errors() {
    fn reject(_parser: &mut Parser<()>, _data: &[u8]) -> isize {
        -1
    }
    let mut parser = request_parser();
    parser.callbacks.on_header_name = reject;
    drive(&mut parser, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(parser.error_code(), ErrorCode::CallbackError);
}

#[test]
fn test_on_headers_positive_skips_body() {
    fn skip(_parser: &mut Parser<()>, _data: &[u8]) -> isize {
        1
    }
    let mut parser = response_parser();
    parser.callbacks.on_headers = skip;
    // HEAD-style response: Content-Length present, no body on the wire.
    let input = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n";
    assert_eq!(drive(&mut parser, input), input.len());
    assert_eq!(parser.error_code(), ErrorCode::None);
    assert!(parser.skip_body());
    assert_eq!(parser.state(), State::Start, "message completed without body bytes");
}
