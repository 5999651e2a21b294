//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser HTTP/1.x mínimo escrito a mano.
//!
//! ## Formato
//!
//! ```text
//! POST /operations/virtualServer.provision?eta=2030-01-01T00:00:00Z HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 2\r\n
//! \r\n
//! {}
//! ```
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.x`
//! 2. **Headers**: pares `Name: Value`; los nombres no distinguen mayúsculas
//! 3. **Línea vacía**: `\r\n`
//! 4. **Body**: bytes restantes, acotados por `Content-Length` si viene

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path sin query string (ej: "/jobs/3f2c...")
    path: String,

    query_params: HashMap<String, String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    version: String,

    body: Vec<u8>,
}

/// Errores de parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("incomplete HTTP request")]
    IncompleteRequest,

    #[error("invalid request line format")]
    InvalidRequestLine,

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("empty request")]
    EmptyRequest,
}

impl Request {
    /// Parsea un request completo desde bytes
    ///
    /// ```
    /// use job_server::http::Request;
    ///
    /// let raw = b"GET /jobs?status=PENDING HTTP/1.1\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/jobs");
    /// assert_eq!(request.query_param("status"), Some("PENDING"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::EmptyRequest);
        }

        let (head, rest) = match find_head_end(buffer) {
            Some(end) => (&buffer[..end], &buffer[end + HEAD_TERMINATOR.len()..]),
            None => (buffer, &[][..]),
        };

        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidRequestLine)?;
        let mut lines = head.split("\r\n");

        let request_line = lines.next().ok_or(ParseError::IncompleteRequest)?;
        let (method, path, query_params, version) = parse_request_line(request_line)?;
        let headers = parse_headers(lines)?;

        let body = match headers.get("content-length") {
            Some(value) => {
                let len: usize = value
                    .parse()
                    .map_err(|_| ParseError::InvalidContentLength(value.clone()))?;
                if rest.len() < len {
                    return Err(ParseError::IncompleteRequest);
                }
                rest[..len].to_vec()
            }
            None => rest.to_vec(),
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Busca un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body como texto, si es UTF-8 válido
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Bytes totales que ocupa el request cuyo inicio está en `buffer`
///
/// `None` mientras los headers no estén completos. El servidor lo usa para
/// saber cuándo dejar de leer del socket. Un `Content-Length` que desborda
/// satura en `usize::MAX`.
pub fn expected_len(buffer: &[u8]) -> Option<usize> {
    let end = find_head_end(buffer)?;
    let head = String::from_utf8_lossy(&buffer[..end]);

    let content_length = head
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    Some(
        (end + HEAD_TERMINATOR.len())
            .checked_add(content_length)
            .unwrap_or(usize::MAX),
    )
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

/// `METHOD /path?query HTTP/1.x`
fn parse_request_line(
    line: &str,
) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let &[method, target, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine);
    };

    let method: Method = method.parse()?;

    if version != "HTTP/1.0" && version != "HTTP/1.1" {
        return Err(ParseError::InvalidHttpVersion(version.to_string()));
    }

    let (path, query_params) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query_string(query)),
        None => (target, HashMap::new()),
    };

    if !path.starts_with('/') {
        return Err(ParseError::InvalidRequestLine);
    }

    Ok((method, path.to_string(), query_params, version.to_string()))
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once('=') {
            Some((key, value)) => (url_decode(key), url_decode(value)),
            // Parámetro sin valor (ej: "?verbose")
            None => (url_decode(param), String::new()),
        })
        .collect()
}

fn parse_headers<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();

    for line in lines {
        if line.trim().is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(headers)
}

/// Decodifica `%XX` y `+` (application/x-www-form-urlencoded)
///
/// Secuencias `%` inválidas se copian tal cual.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), "HTTP/1.0");
        assert!(request.query_params().is_empty());
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_with_query_params() {
        let raw = b"GET /jobs?status=PENDING&verbose HTTP/1.1\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/jobs");
        assert_eq!(request.query_param("status"), Some("PENDING"));
        assert_eq!(request.query_param("verbose"), Some(""));
    }

    #[test]
    fn test_parse_methods() {
        for (raw, method) in [
            (&b"POST /operations/a.b HTTP/1.1\r\n\r\n"[..], Method::POST),
            (&b"PUT /operations/a.b HTTP/1.1\r\n\r\n"[..], Method::PUT),
            (&b"DELETE /jobs/x HTTP/1.1\r\n\r\n"[..], Method::DELETE),
        ] {
            assert_eq!(Request::parse(raw).unwrap().method(), method);
        }
    }

    #[test]
    fn test_headers_case_insensitive() {
        let raw =
            b"GET / HTTP/1.0\r\nHost: localhost:8080\r\ncontent-TYPE: application/json\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_body_with_content_length() {
        let raw = b"POST /operations/a.b HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}trailing";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.body(), b"{}");
        assert_eq!(request.body_str(), Some("{}"));
    }

    #[test]
    fn test_body_shorter_than_content_length() {
        let raw = b"POST /operations/a.b HTTP/1.1\r\nContent-Length: 10\r\n\r\n{}";
        assert_eq!(Request::parse(raw).unwrap_err(), ParseError::IncompleteRequest);
    }

    #[test]
    fn test_invalid_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(ParseError::InvalidContentLength(_))
        ));
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("a+b"), "a b");
        assert_eq!(url_decode("2030-01-01T00%3A00%3A00%2B00%3A00"), "2030-01-01T00:00:00+00:00");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz"), "%zz");
    }

    #[test]
    fn test_unsupported_method() {
        let raw = b"PATCH / HTTP/1.0\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(ParseError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_invalid_version() {
        let raw = b"GET / HTTP/2.0\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(ParseError::InvalidHttpVersion(_))
        ));
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(Request::parse(b"").unwrap_err(), ParseError::EmptyRequest);
        assert_eq!(Request::parse(b"\r\n").unwrap_err(), ParseError::EmptyRequest);
    }

    #[test]
    fn test_invalid_request_line() {
        let raw = b"GET\r\n\r\n"; // Falta path y version
        assert_eq!(Request::parse(raw).unwrap_err(), ParseError::InvalidRequestLine);
    }

    #[test]
    fn test_invalid_header() {
        let raw = b"GET / HTTP/1.0\r\nno-colon-here\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(ParseError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_expected_len() {
        assert_eq!(expected_len(b"GET / HTTP/1.1\r\nHost: x"), None);

        let head = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(expected_len(head), Some(head.len() + 5));
        assert_eq!(expected_len(b"GET / HTTP/1.1\r\n\r\n"), Some(18));
    }

    #[test]
    fn test_expected_len_huge_content_length() {
        let head = b"POST / HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n";
        assert_eq!(expected_len(head), Some(usize::MAX));

        let head = b"POST / HTTP/1.1\r\nContent-Length: 2000000\r\n\r\n";
        assert_eq!(expected_len(head), Some(head.len() + 2_000_000));
    }
}
