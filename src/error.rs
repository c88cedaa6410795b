//! Error types.
//!
//! Everything in here is per-request except [`Error`], which covers the
//! server's own infrastructure (binding and accepting). A failed parse or a
//! rejected path never touches the shared [`Resolver`](crate::Resolver) and
//! never stops the server.

use std::fmt;
use std::io;
use std::net::AddrParseError;
use std::path::PathBuf;

// ── ParseError ────────────────────────────────────────────────────────────────

/// Why a raw request could not become a [`Request`](crate::Request).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The buffer held no request line at all.
    EmptyRequest,
    /// The request line did not split into exactly method, resource, version.
    InvalidHeaders,
    /// The method token is not one Turbine knows. Carries the token.
    InvalidMethod(String),
    /// The byte buffer was not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest      => f.write_str("empty request"),
            Self::InvalidHeaders    => f.write_str("request line must be `METHOD RESOURCE VERSION`"),
            Self::InvalidMethod(m)  => write!(f, "unknown method `{m}`"),
            Self::InvalidUtf8       => f.write_str("request is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}

// ── ResolveError ──────────────────────────────────────────────────────────────

/// Why a resource could not be mapped to a file inside the document root.
///
/// [`PathOutsideDocumentRoot`](Self::PathOutsideDocumentRoot) is kept apart
/// from ordinary misses so callers can log it as an attack rather than a 404.
#[derive(Debug)]
pub enum ResolveError {
    /// The resource did not begin with `/`.
    PathShouldStartWithSlash(String),
    /// The resource points outside the document root.
    PathOutsideDocumentRoot(PathBuf),
    /// The raw request could not be parsed in the first place.
    Parse(ParseError),
    /// Canonicalization failed; `NotFound` is the common case.
    Io(io::Error),
}

impl ResolveError {
    /// `true` when the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }

    /// `true` when the request tried to escape the document root.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::PathOutsideDocumentRoot(_))
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathShouldStartWithSlash(r) => write!(f, "resource `{r}` must start with `/`"),
            Self::PathOutsideDocumentRoot(p)  => write!(f, "`{}` is outside the document root", p.display()),
            Self::Parse(e)                    => write!(f, "parse: {e}"),
            Self::Io(e)                       => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Io(e)    => Some(e),
            _              => None,
        }
    }
}

impl From<ParseError> for ResolveError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<io::Error> for ResolveError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// The error type returned by the server's own fallible operations.
///
/// Request-level failures are answered with an HTTP status, not surfaced
/// here. This type covers binding, accepting, and a bad listen address.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Addr(AddrParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)   => write!(f, "io: {e}"),
            Self::Addr(e) => write!(f, "invalid listen address: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)   => Some(e),
            Self::Addr(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}
