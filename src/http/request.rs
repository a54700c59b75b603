//! Client request parsing and classification.
//!
//! # Responsibilities
//! - Classify every raw request as regular, command, not implemented or bad
//! - Split the absolute-form request target into host, port, path and query
//! - Validate header lines, failing the whole request on the first bad one
//!
//! # Design Decisions
//! - Classification is total: `parse` never errors, malformed input is
//!   simply `ParsedRequest::BadRequest`
//! - Validation order is fixed (method, version, target, headers) so the
//!   same input always yields the same rejection
//! - Headers keep first-seen order; a repeated name overwrites in place

use std::fmt;

/// Path prefix that routes a request to the command processor.
pub const COMMAND_PREFIX: &str = "/proxy/";

/// Port used when the request target does not name one.
pub const DEFAULT_PORT: u16 = 80;

/// Methods recognised as HTTP but not supported by the proxy.
const UNSUPPORTED_METHODS: [&str; 8] = [
    "HEAD", "OPTIONS", "TRACE", "PUT", "DELETE", "POST", "PATCH", "CONNECT",
];

const HTTP_VERSION: &str = "HTTP/1.0";

/// Result of parsing one client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRequest {
    /// A well-formed GET to be forwarded.
    Regular(RegularRequest),
    /// A known method other than GET.
    NotImplemented,
    /// Anything malformed.
    BadRequest,
    /// A GET addressed to the proxy itself under [`COMMAND_PREFIX`].
    Command {
        /// Everything after the prefix, e.g. `blocklist/add/example`.
        command_path: String,
    },
}

/// A validated GET request bound for an origin server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularRequest {
    /// Lowercased host name from the request target.
    pub host: String,
    pub port: u16,
    /// Non-empty path component, without query or fragment.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    pub headers: Headers,
}

impl RegularRequest {
    /// Origin-form target sent upstream: the path plus any query.
    pub fn target(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// `host:port`, the string the blocklist is matched against.
    pub fn destination(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Key under which the response is cached: `host:port/path`.
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.destination(), self.target())
    }
}

/// Header fields in first-seen order. Setting an existing name replaces
/// its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a header. Names are compared exactly, as received.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Headers {
    /// Serialize as `Name: Value\r\n` lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.0 {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

/// Parse a raw request. `proxy_host` is the proxy's configured listen
/// address; a `/proxy/` path only becomes a command when the target host
/// equals it (the port is not compared).
pub fn parse(raw: &str, proxy_host: &str) -> ParsedRequest {
    let tokens: Vec<&str> = raw.split(' ').collect();
    let method = tokens[0];

    if UNSUPPORTED_METHODS.iter().any(|m| method.starts_with(m)) {
        return ParsedRequest::NotImplemented;
    }
    if method != "GET" || tokens.len() < 3 || !tokens[2].starts_with(HTTP_VERSION) {
        return ParsedRequest::BadRequest;
    }

    let Some(target) = RequestTarget::split(tokens[1]) else {
        return ParsedRequest::BadRequest;
    };
    if target.scheme.is_empty() || target.netloc.is_empty() || target.path.is_empty() {
        return ParsedRequest::BadRequest;
    }
    let Some((host, port)) = target.host_and_port() else {
        return ParsedRequest::BadRequest;
    };

    if let Some(command_path) = target.path.strip_prefix(COMMAND_PREFIX) {
        let proxy_host = proxy_host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(proxy_host);
        if host.eq_ignore_ascii_case(proxy_host) {
            return ParsedRequest::Command {
                command_path: command_path.to_string(),
            };
        }
    }

    // Everything from the version token on: the version line, then headers.
    let remainder = tokens[2..].join(" ");
    let Some(headers) = parse_headers(&remainder) else {
        return ParsedRequest::BadRequest;
    };

    ParsedRequest::Regular(RegularRequest {
        host,
        port,
        path: target.path.to_string(),
        query: target.query.map(str::to_string),
        headers,
    })
}

/// Validate every header line. `None` as soon as one line is malformed.
fn parse_headers(remainder: &str) -> Option<Headers> {
    let mut headers = Headers::new();

    for line in remainder.split(['\r', '\n']) {
        if line.is_empty() || line == " " || line == HTTP_VERSION {
            continue;
        }

        let colon = line.find(':')?;
        let name = &line[..colon];
        if !is_header_name(name) {
            return None;
        }
        let value = line[colon + 1..].strip_prefix(' ')?;
        if value.is_empty() {
            return None;
        }
        headers.insert(name, value);
    }

    Some(headers)
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// The pieces of an absolute-form request target.
#[derive(Debug, PartialEq, Eq)]
struct RequestTarget<'a> {
    scheme: &'a str,
    netloc: &'a str,
    path: &'a str,
    query: Option<&'a str>,
}

impl<'a> RequestTarget<'a> {
    /// Split a URL into scheme, network location, path and query. Missing
    /// pieces come back empty rather than failing; the caller decides.
    fn split(url: &'a str) -> Option<Self> {
        let (scheme, rest) = match url.find(':') {
            Some(i) if is_scheme(&url[..i]) => (&url[..i], &url[i + 1..]),
            _ => ("", url),
        };

        let (netloc, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '?', '#']).unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
            None => ("", rest),
        };

        let rest = rest.split('#').next().unwrap_or_default();
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        // `;params` on the last segment are not part of the path.
        let last_segment = path.rfind('/').unwrap_or(0);
        let path = match path[last_segment..].find(';') {
            Some(i) => &path[..last_segment + i],
            None => path,
        };

        Some(Self {
            scheme,
            netloc,
            path,
            query,
        })
    }

    /// Lowercased host and numeric port. `None` if the host is empty or
    /// the port is not a number in range.
    fn host_and_port(&self) -> Option<(String, u16)> {
        let hostinfo = match self.netloc.rsplit_once('@') {
            Some((_, hostinfo)) => hostinfo,
            None => self.netloc,
        };

        let (host, port) = match hostinfo.split_once('[') {
            Some((_, bracketed)) => {
                let (host, after) = bracketed.split_once(']').unwrap_or((bracketed, ""));
                let port = after.split_once(':').map(|(_, p)| p).unwrap_or("");
                (host, port)
            }
            None => hostinfo.split_once(':').unwrap_or((hostinfo, "")),
        };

        if host.is_empty() {
            return None;
        }
        let port = if port.is_empty() {
            DEFAULT_PORT
        } else if port.bytes().all(|b| b.is_ascii_digit()) {
            port.parse().ok()?
        } else {
            return None;
        };

        Some((host.to_ascii_lowercase(), port))
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY: &str = "localhost";

    fn regular(raw: &str) -> RegularRequest {
        match parse(raw, PROXY) {
            ParsedRequest::Regular(req) => req,
            other => panic!("expected regular request, got {:?}", other),
        }
    }

    #[test]
    fn parses_simple_get() {
        let req = regular("GET http://example.com/ HTTP/1.0\r\nHost: example.com\r\n\r\n");
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 80);
        assert_eq!(req.path, "/");
        assert_eq!(req.query, None);
        assert_eq!(req.headers.get("Host"), Some("example.com"));
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.cache_key(), "example.com:80/");
    }

    #[test]
    fn explicit_port_and_query() {
        let req = regular("GET http://Example.COM:8080/a/b.html?x=1#frag HTTP/1.0\r\n\r\n");
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 8080);
        assert_eq!(req.path, "/a/b.html");
        assert_eq!(req.query.as_deref(), Some("x=1"));
        assert_eq!(req.target(), "/a/b.html?x=1");
        assert_eq!(req.destination(), "example.com:8080");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn unsupported_methods_are_not_implemented() {
        for method in UNSUPPORTED_METHODS {
            let raw = format!("{} http://example.com/ HTTP/1.0\r\n\r\n", method);
            assert_eq!(parse(&raw, PROXY), ParsedRequest::NotImplemented, "{}", method);
        }
        // Anchored at the start only, and regardless of the rest.
        assert_eq!(parse("POSTAL garbage", PROXY), ParsedRequest::NotImplemented);
        assert_eq!(parse("DELETE", PROXY), ParsedRequest::NotImplemented);
    }

    #[test]
    fn bad_method_or_version() {
        for raw in [
            "get http://example.com/ HTTP/1.0\r\n\r\n",
            "FETCH http://example.com/ HTTP/1.0\r\n\r\n",
            "GET http://example.com/\r\n\r\n",
            "GET http://example.com/ HTTP/1.1\r\n\r\n",
            "GET  http://example.com/ HTTP/1.0\r\n\r\n",
            "",
        ] {
            assert_eq!(parse(raw, PROXY), ParsedRequest::BadRequest, "{:?}", raw);
        }
    }

    #[test]
    fn bad_targets() {
        for target in [
            "/relative/path",
            "example.com/",
            "http://example.com",
            "http:///path",
            "http://:8080/",
            "http://example.com:http/",
            "http://example.com:99999/",
            "http://example.com:+80/",
        ] {
            let raw = format!("GET {} HTTP/1.0\r\n\r\n", target);
            assert_eq!(parse(&raw, PROXY), ParsedRequest::BadRequest, "{}", target);
        }
    }

    #[test]
    fn strips_userinfo_and_brackets() {
        let req = regular("GET http://user:pw@[::1]:8000/x HTTP/1.0\r\n\r\n");
        assert_eq!(req.host, "::1");
        assert_eq!(req.port, 8000);
        assert_eq!(req.path, "/x");
    }

    #[test]
    fn drops_params_from_last_segment() {
        let req = regular("GET http://example.com/a;keep/b;drop HTTP/1.0\r\n\r\n");
        assert_eq!(req.path, "/a;keep/b");
    }

    #[test]
    fn command_requires_proxy_host() {
        assert_eq!(
            parse("GET http://localhost/proxy/cache/enable HTTP/1.0\r\n\r\n", PROXY),
            ParsedRequest::Command {
                command_path: "cache/enable".into()
            }
        );
        // Port is not compared.
        assert_eq!(
            parse("GET http://LOCALHOST:9999/proxy/blocklist/add/foo HTTP/1.0\r\n\r\n", PROXY),
            ParsedRequest::Command {
                command_path: "blocklist/add/foo".into()
            }
        );
        let req = regular("GET http://example.com/proxy/cache/enable HTTP/1.0\r\n\r\n");
        assert_eq!(req.path, "/proxy/cache/enable");
    }

    #[test]
    fn command_routes_to_ipv6_listen_address() {
        for proxy_host in ["[::1]", "::1"] {
            assert_eq!(
                parse("GET http://[::1]:2100/proxy/cache/enable HTTP/1.0\r\n\r\n", proxy_host),
                ParsedRequest::Command {
                    command_path: "cache/enable".into()
                },
                "{}",
                proxy_host
            );
        }
    }

    #[test]
    fn command_skips_header_validation() {
        assert!(matches!(
            parse("GET http://localhost/proxy/cache/flush HTTP/1.0\r\nbad header\r\n\r\n", PROXY),
            ParsedRequest::Command { .. }
        ));
    }

    #[test]
    fn header_values_keep_spaces_and_duplicates_overwrite() {
        let req = regular(
            "GET http://example.com/ HTTP/1.0\r\nUser-Agent: Mozilla/5.0 (X11; Linux)\r\nAccept: a\r\nX-Dup: 1\r\nAccept: b\r\n\r\n",
        );
        assert_eq!(req.headers.get("User-Agent"), Some("Mozilla/5.0 (X11; Linux)"));
        assert_eq!(req.headers.get("Accept"), Some("b"));
        let names: Vec<_> = req.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["User-Agent", "Accept", "X-Dup"]);
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let req = regular("GET http://example.com/ HTTP/1.0\r\naccept: x\r\nAccept: y\r\n\r\n");
        assert_eq!(req.headers.get("accept"), Some("x"));
        assert_eq!(req.headers.get("Accept"), Some("y"));
    }

    #[test]
    fn any_bad_header_fails_the_request() {
        for header in [
            "NoColon",
            "Bad Name: x",
            "Bad_Name: x",
            ": empty-name",
            "Tight:value",
            "Empty: ",
            "Empty:",
        ] {
            let raw = format!(
                "GET http://example.com/ HTTP/1.0\r\nHost: example.com\r\n{}\r\nAccept: */*\r\n\r\n",
                header
            );
            assert_eq!(parse(&raw, PROXY), ParsedRequest::BadRequest, "{:?}", header);
        }
    }

    #[test]
    fn extra_request_line_tokens_are_rejected() {
        assert_eq!(
            parse("GET http://example.com/ HTTP/1.0 extra\r\n\r\n", PROXY),
            ParsedRequest::BadRequest
        );
        assert_eq!(
            parse("GET http://example.com/ HTTP/1.0x\r\n\r\n", PROXY),
            ParsedRequest::BadRequest
        );
    }

    #[test]
    fn headers_display_as_wire_lines() {
        let mut headers = Headers::new();
        headers.insert("Accept", "*/*");
        headers.insert("X-Test", "1");
        assert_eq!(headers.to_string(), "Accept: */*\r\nX-Test: 1\r\n");
    }
}
