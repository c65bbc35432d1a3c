use bytes::Bytes;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Status codes the server can emit.
///
/// Only success is ever sent; every failure is signalled by closing the
/// connection without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use chunkserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
        }
    }
}

/// Serializes the status line and the empty header block that precede the
/// file bytes. No headers are emitted.
pub fn response_head(status: StatusCode) -> Bytes {
    let head = format!(
        "{} {} {}\r\n\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    Bytes::from(head)
}
