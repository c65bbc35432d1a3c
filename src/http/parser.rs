#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("request does not start with `GET `")]
    InvalidMethod,
    #[error("request target is missing")]
    MissingTarget,
    #[error("request target is not valid UTF-8")]
    InvalidTarget,
    #[error("request line does not end with ` HTTP/1.1`")]
    InvalidVersion,
}

const METHOD: &[u8] = b"GET ";
const VERSION: &[u8] = b" HTTP/1.1";

/// Extracts the target from a `GET <target> HTTP/1.1` request line.
///
/// Matching is case-sensitive. Anything after the line terminator (headers,
/// body) is ignored.
pub fn parse_request_line(buf: &[u8]) -> Result<&str, ParseError> {
    let rest = buf.strip_prefix(METHOD).ok_or(ParseError::InvalidMethod)?;

    let target_len = rest
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    if target_len == 0 {
        return Err(ParseError::MissingTarget);
    }
    let (target, tail) = rest.split_at(target_len);

    let after_version = tail.strip_prefix(VERSION).ok_or(ParseError::InvalidVersion)?;
    match after_version.first() {
        None | Some(b'\r') | Some(b'\n') => {}
        Some(_) => return Err(ParseError::InvalidVersion),
    }

    std::str::from_utf8(target).map_err(|_| ParseError::InvalidTarget)
}
