//! Synthetic replies and origin response inspection.
//!
//! The proxy only ever emits status-only responses of its own; everything
//! else it sends is origin bytes relayed verbatim.

/// A status-only reply generated by the proxy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReply {
    /// Command acknowledged.
    Ok,
    BadRequest,
    /// Destination matched the blocklist.
    Forbidden,
    NotImplemented,
}

impl StatusReply {
    pub fn code(self) -> u16 {
        match self {
            StatusReply::Ok => 200,
            StatusReply::BadRequest => 400,
            StatusReply::Forbidden => 403,
            StatusReply::NotImplemented => 501,
        }
    }

    /// Wire form: `HTTP/1.0 <code> <reason>\r\n\r\n`.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            StatusReply::Ok => b"HTTP/1.0 200 OK\r\n\r\n",
            StatusReply::BadRequest => b"HTTP/1.0 400 Bad Request\r\n\r\n",
            StatusReply::Forbidden => b"HTTP/1.0 403 Forbidden\r\n\r\n",
            StatusReply::NotImplemented => b"HTTP/1.0 501 Not Implemented\r\n\r\n",
        }
    }
}

/// How an origin answered, judged from its status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginStatus {
    Ok,
    NotModified,
    Other,
}

impl OriginStatus {
    /// Classify a raw origin response by the reason phrase on its first line.
    pub fn of(response: &[u8]) -> Self {
        let status_line = status_line(response);
        if contains(status_line, b"304 Not Modified") {
            OriginStatus::NotModified
        } else if contains(status_line, b"200 OK") {
            OriginStatus::Ok
        } else {
            OriginStatus::Other
        }
    }
}

/// First line of a response, without its line terminator.
pub fn status_line(response: &[u8]) -> &[u8] {
    let end = response
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(response.len());
    &response[..end]
}

/// Value of the first `Last-Modified` header in a stored response, up to
/// the end of its line.
pub fn last_modified(response: &[u8]) -> Option<String> {
    const NAME: &[u8] = b"Last-Modified:";

    let start = find(response, NAME)? + NAME.len();
    let rest = &response[start..];
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    let value = String::from_utf8_lossy(&rest[..end]).trim().to_string();

    (!value.is_empty()).then_some(value)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}
