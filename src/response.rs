//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! The error types convert straight into responses, which is where the
//! failure-to-status mapping lives:
//!
//! | Failure | Status |
//! |---|---|
//! | malformed request line, missing leading `/` | 400 |
//! | unknown method | 405 |
//! | path outside the document root | 403 |
//! | file not found | 404 |
//! | any other filesystem error | 500 |

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ParseError, ResolveError};
use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types the file server knows how to label.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Gif,          // image/gif
    Html,         // text/html; charset=utf-8
    Icon,         // image/x-icon
    Jpeg,         // image/jpeg
    JavaScript,   // text/javascript
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Wasm,         // application/wasm
    Xml,          // application/xml
}

impl ContentType {
    /// Picks a content type from the file extension, case-insensitively.
    /// Unknown or missing extensions are served as `application/octet-stream`.
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::OctetStream;
        };
        match ext.to_ascii_lowercase().as_str() {
            "css"          => Self::Css,
            "gif"          => Self::Gif,
            "htm" | "html" => Self::Html,
            "ico"          => Self::Icon,
            "jpeg" | "jpg" => Self::Jpeg,
            "js" | "mjs"   => Self::JavaScript,
            "json"         => Self::Json,
            "pdf"          => Self::Pdf,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            "wasm"         => Self::Wasm,
            "xml"          => Self::Xml,
            _              => Self::OctetStream,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Gif         => "image/gif",
            Self::Html        => "text/html; charset=utf-8",
            Self::Icon        => "image/x-icon",
            Self::Jpeg        => "image/jpeg",
            Self::JavaScript  => "text/javascript",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Wasm        => "application/wasm",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Body ─────────────────────────────────────────────────────────────────────

/// A response body: bytes in memory, or an open file streamed on write.
#[derive(Debug)]
pub enum Body {
    Bytes(Vec<u8>),
    /// `len` is taken from the file's metadata when it is opened and is what
    /// goes out as `content-length`.
    File { file: File, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Self::Bytes(b)         => b.len() as u64,
            Self::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The in-memory bytes, or `None` for a file body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b)    => Some(b),
            Self::File { .. } => None,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use turbine::{ContentType, Response, Status};
///
/// Response::text("hello");
/// Response::status(Status::NotFound);
///
/// let res = Response::builder()
///     .status(Status::MethodNotAllowed)
///     .header("allow", "GET")
///     .text("use GET");
/// assert_eq!(res.header("allow"), Some("GET"));
/// ```
#[derive(Debug)]
pub struct Response {
    body: Body,
    headers: Vec<(String, String)>,
    status: Status,
}

impl Response {
    /// `200 OK` with the given content type.
    pub fn bytes(content_type: ContentType, body: Vec<u8>) -> Self {
        Self::builder().bytes(content_type, body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK` streaming `len` bytes of `file`.
    pub fn file(content_type: ContentType, file: File, len: u64) -> Self {
        Self::builder().file(content_type, file, len)
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { body: Body::Bytes(Vec::new()), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok }
    }

    pub fn code(&self) -> u16 { self.status.into() }
    pub fn status_kind(&self) -> Status { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Body { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Writes the response as HTTP/1.1 and flushes. The connection is not
    /// kept alive, so `connection: close` is always sent.
    ///
    /// A file body is copied straight from disk. If it turns out shorter than
    /// the announced length, the write fails with `UnexpectedEof`.
    pub(crate) async fn write_to<W: AsyncWrite + Unpin>(
        self,
        writer: &mut W,
    ) -> io::Result<()> {
        writer.write_all(
            format!("HTTP/1.1 {} {}\r\n", self.code(), self.status.reason()).as_bytes(),
        ).await?;
        writer.write_all(
            format!("content-length: {}\r\nconnection: close\r\n", self.body.len()).as_bytes(),
        ).await?;
        for (name, value) in &self.headers {
            writer.write_all(format!("{name}: {value}\r\n").as_bytes()).await?;
        }
        writer.write_all(b"\r\n").await?;
        match self.body {
            Body::Bytes(bytes) => writer.write_all(&bytes).await?,
            Body::File { file, len } => {
                let copied = tokio::io::copy(&mut file.take(len), writer).await?;
                if copied < len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file ended after {copied} of {len} bytes"),
                    ));
                }
            }
        }
        writer.flush().await
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Defaults to `Status::Ok`.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: Status,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a plain-text body.
    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body: Body::Bytes(body), headers, status: self.status }
    }

    /// Terminate with a file body of `len` bytes.
    pub fn file(self, content_type: ContentType, file: File, len: u64) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body: Body::File { file, len }, headers, status: self.status }
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { body: Body::Bytes(Vec::new()), headers: self.headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for ParseError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidMethod(_) => Status::MethodNotAllowed,
            Self::EmptyRequest | Self::InvalidHeaders | Self::InvalidUtf8 => Status::BadRequest,
        };
        let res = Response::builder().status(status);
        let res = if status == Status::MethodNotAllowed { res.header("allow", "GET") } else { res };
        res.text(self.to_string())
    }
}

/// Not-found and forbidden answers carry no detail, so a client probing the
/// root learns nothing about the filesystem. `InvalidInput` from the
/// filesystem means the resource itself was unusable (an interior NUL byte,
/// for one), which is the client's fault.
impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        match self {
            Self::Parse(e)                    => e.into_response(),
            Self::PathShouldStartWithSlash(_) => Response::builder().status(Status::BadRequest).text(self.to_string()),
            Self::PathOutsideDocumentRoot(_)  => Response::status(Status::Forbidden),
            Self::Io(ref e) if e.kind() == io::ErrorKind::NotFound => Response::status(Status::NotFound),
            Self::Io(ref e) if e.kind() == io::ErrorKind::InvalidInput => Response::status(Status::BadRequest),
            Self::Io(_)                       => Response::status(Status::InternalServerError),
        }
    }
}
