//! Outbound requests to origin servers.
//!
//! # Responsibilities
//! - Serialize the request sent upstream for a parsed client request
//! - Open a short-lived connection per fetch and read until the origin closes
//!
//! # Design Decisions
//! - Always `Connection: close`; the response is framed by the origin closing
//! - The proxy writes its own `Host` and `Connection`; client copies of
//!   those are dropped
//! - `Origin` is a trait so the cache flow can be exercised without sockets

use std::future::Future;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::http::request::RegularRequest;
use crate::net::framing;
use crate::resilience::with_timeout;

/// Header carrying the cached copy's `Last-Modified` on revalidation.
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";

/// Client headers the proxy always writes itself.
const PROXY_OWNED_HEADERS: [&str; 2] = ["Host", "Connection"];

/// Build the request sent to the origin, encoded back to the client's
/// bytes. With `if_modified_since` set the request becomes a conditional GET.
pub fn build_request(request: &RegularRequest, if_modified_since: Option<&str>) -> Vec<u8> {
    let mut message = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n",
        request.target(),
        request.host
    );

    for (name, value) in request.headers.iter() {
        let proxy_owned = PROXY_OWNED_HEADERS
            .iter()
            .any(|owned| name.eq_ignore_ascii_case(owned));
        let replaced = if_modified_since.is_some() && name.eq_ignore_ascii_case(IF_MODIFIED_SINCE);
        if proxy_owned || replaced {
            continue;
        }
        message.push_str(name);
        message.push_str(": ");
        message.push_str(value);
        message.push_str("\r\n");
    }

    if let Some(date) = if_modified_since {
        message.push_str(IF_MODIFIED_SINCE);
        message.push_str(": ");
        message.push_str(date);
        message.push_str("\r\n");
    }

    message.push_str("\r\n");
    framing::encode_latin1(&message)
}

/// Something that can answer a raw request for `host:port`.
pub trait Origin: Send + Sync {
    /// Send `request` to `host:port` and return the full raw response.
    fn fetch(
        &self,
        host: &str,
        port: u16,
        request: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, ProxyError>> + Send;
}

/// Origin reached over a fresh TCP connection per fetch.
#[derive(Debug, Clone, Default)]
pub struct TcpOrigin {
    connect_secs: Option<u64>,
    read_secs: Option<u64>,
}

impl TcpOrigin {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            connect_secs: timeouts.origin_connect_secs,
            read_secs: timeouts.origin_read_secs,
        }
    }
}

impl Origin for TcpOrigin {
    async fn fetch(&self, host: &str, port: u16, request: &[u8]) -> Result<Vec<u8>, ProxyError> {
        let mut stream = with_timeout("origin connect", self.connect_secs, async {
            TcpStream::connect((host, port))
                .await
                .map_err(|source| ProxyError::OriginConnect {
                    addr: format!("{}:{}", host, port),
                    source,
                })
        })
        .await?;

        tracing::debug!(host = %host, port, bytes = request.len(), "Sending request to origin");

        stream.write_all(request).await?;
        let response = with_timeout("origin read", self.read_secs, framing::read_response(&mut stream)).await?;

        tracing::debug!(host = %host, port, bytes = response.len(), "Origin response complete");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{parse, ParsedRequest};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn regular(raw: &str) -> RegularRequest {
        match parse(raw, "localhost") {
            ParsedRequest::Regular(req) => req,
            other => panic!("expected regular request, got {:?}", other),
        }
    }

    #[test]
    fn plain_get_replaces_host_and_connection() {
        let req = regular("GET http://example.com/ HTTP/1.0\r\nHost: example.com\r\n\r\n");
        assert_eq!(
            build_request(&req, None),
            b"GET / HTTP/1.0\r\nHost: example.com\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn client_headers_follow_in_order() {
        let req = regular(
            "GET http://example.com:8080/a?b=c HTTP/1.0\r\nConnection: keep-alive\r\nAccept: */*\r\nUser-Agent: test agent\r\n\r\n",
        );
        assert_eq!(
            build_request(&req, None),
            b"GET /a?b=c HTTP/1.0\r\nHost: example.com\r\nConnection: close\r\nAccept: */*\r\nUser-Agent: test agent\r\n\r\n"
        );
    }

    #[test]
    fn conditional_get_replaces_client_date() {
        let req = regular(
            "GET http://example.com/index.html HTTP/1.0\r\nIf-Modified-Since: stale\r\nAccept: */*\r\n\r\n",
        );
        assert_eq!(
            build_request(&req, Some("Tue, 01 Jan 2025 00:00:00 GMT")),
            b"GET /index.html HTTP/1.0\r\nHost: example.com\r\nConnection: close\r\nAccept: */*\r\nIf-Modified-Since: Tue, 01 Jan 2025 00:00:00 GMT\r\n\r\n"
        );
        // Without revalidation the client's own header passes through.
        let plain = build_request(&req, None);
        assert!(plain.ends_with(b"Accept: */*\r\nIf-Modified-Since: stale\r\n\r\n"));
    }

    #[test]
    fn latin1_header_values_keep_their_bytes() {
        let raw = framing::decode_latin1(b"GET http://example.com/ HTTP/1.0\r\nX-Name: caf\xe9\r\n\r\n");
        let req = regular(&raw);
        assert_eq!(
            build_request(&req, None),
            b"GET / HTTP/1.0\r\nHost: example.com\r\nConnection: close\r\nX-Name: caf\xe9\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn tcp_origin_reads_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"HTTP/1.0 200 OK\r\n\r\nhello").await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let origin = TcpOrigin::default();
        let response = origin
            .fetch("127.0.0.1", port, b"GET / HTTP/1.0\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(response, b"HTTP/1.0 200 OK\r\n\r\nhello".to_vec());
        assert_eq!(server.await.unwrap(), "GET / HTTP/1.0\r\n\r\n");
    }

    #[tokio::test]
    async fn refused_connection_is_origin_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpOrigin::default()
            .fetch("127.0.0.1", port, b"GET / HTTP/1.0\r\n\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::OriginConnect { .. }));
    }
}
