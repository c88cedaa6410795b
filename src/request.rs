//! Incoming HTTP request type.
//!
//! A [`Request`] only comes out of [`Request::parse`] (or the byte-slice
//! `TryFrom`), so holding one means the request line was well formed.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::method::Method;

/// An incoming HTTP request, parsed from an already-assembled text buffer.
///
/// Only the request line is interpreted. Header fields and the body are left
/// to richer transports, so [`headers`](Self::headers) and
/// [`body`](Self::body) are always empty here.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    resource: String,
    version: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Request {
    /// Parses the request line at the top of `raw`.
    ///
    /// The line must be exactly `METHOD RESOURCE VERSION`, whitespace
    /// separated. Resource and version are taken verbatim; the resolver checks
    /// the resource later.
    ///
    /// ```rust
    /// use turbine::{Method, ParseError, Request};
    ///
    /// let req = Request::parse("GET /foo HTTP/1.1\r\n\r\n").unwrap();
    /// assert_eq!(req.method(), Method::Get);
    /// assert_eq!(req.resource(), "/foo");
    /// assert_eq!(req.version(), "HTTP/1.1");
    ///
    /// assert_eq!(
    ///     Request::parse("PUT /x HTTP/1.1\r\n\r\n").unwrap_err(),
    ///     ParseError::InvalidMethod("PUT".into()),
    /// );
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let line = match raw.split("\r\n").next() {
            Some(line) if !line.is_empty() => line,
            _ => return Err(ParseError::EmptyRequest),
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [method, resource, version] = tokens.as_slice() else {
            return Err(ParseError::InvalidHeaders);
        };

        let method = method
            .parse::<Method>()
            .map_err(|()| ParseError::InvalidMethod((*method).to_owned()))?;

        Ok(Self {
            method,
            resource: (*resource).to_owned(),
            version: (*version).to_owned(),
            headers: HashMap::new(),
            body: Vec::new(),
        })
    }

    pub fn method(&self) -> Method { self.method }
    pub fn resource(&self) -> &str { &self.resource }
    pub fn version(&self) -> &str { &self.version }
    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
}

/// Parses a raw byte buffer, as read off a connection.
impl TryFrom<&[u8]> for Request {
    type Error = ParseError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let text = std::str::from_utf8(data).map_err(|_| ParseError::InvalidUtf8)?;
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get() {
        let req = Request::parse("GET /foo HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.resource(), "/foo");
        assert_eq!(req.version(), "HTTP/1.1");
        assert!(req.headers().is_empty());
        assert!(req.body().is_empty());
    }

    #[test]
    fn parses_post_and_ignores_header_lines() {
        let req = Request::parse("POST /form HTTP/1.0\r\nHost: example\r\n\r\nname=x").unwrap();
        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.resource(), "/form");
        assert_eq!(req.version(), "HTTP/1.0");
        assert!(req.headers().is_empty());
        assert!(req.body().is_empty());
    }

    #[test]
    fn resource_and_version_are_verbatim() {
        let req = Request::parse("GET relative/../x HTTP/9").unwrap();
        assert_eq!(req.resource(), "relative/../x");
        assert_eq!(req.version(), "HTTP/9");
    }

    #[test]
    fn empty_input() {
        assert_eq!(Request::parse("").unwrap_err(), ParseError::EmptyRequest);
        assert_eq!(Request::parse("\r\n\r\n").unwrap_err(), ParseError::EmptyRequest);
    }

    #[test]
    fn wrong_token_count() {
        for raw in [
            "GET\r\n\r\n",
            "GET /\r\n\r\n",
            "GET / HTTP/1.1 extra\r\n\r\n",
            "   \r\n",
        ] {
            assert_eq!(Request::parse(raw).unwrap_err(), ParseError::InvalidHeaders, "{raw:?}");
        }
    }

    #[test]
    fn unknown_method_keeps_token() {
        assert_eq!(
            Request::parse("PUT /x HTTP/1.1\r\n\r\n").unwrap_err(),
            ParseError::InvalidMethod("PUT".to_owned()),
        );
    }

    #[test]
    fn bytes_must_be_utf8() {
        let raw: &[u8] = b"GET /\xff HTTP/1.1\r\n\r\n";
        assert_eq!(Request::try_from(raw).unwrap_err(), ParseError::InvalidUtf8);

        let raw: &[u8] = b"GET /ok HTTP/1.1\r\n\r\n";
        assert_eq!(Request::try_from(raw).unwrap().resource(), "/ok");
    }
}
