//! # turbine
//!
//! A small static file server whose document root cannot be escaped.
//!
//! ## The contract
//!
//! Two pieces carry the weight:
//!
//! - [`Request::parse`] accepts a request line of exactly
//!   `METHOD RESOURCE VERSION`, with the method limited to `GET` or `POST`.
//! - [`Resolver::resolve`] maps the resource onto a file inside a canonical
//!   [`DocumentRoot`]. Traversal segments, rooted remainders and symlinks
//!   that lead outside the root are rejected as
//!   [`ResolveError::PathOutsideDocumentRoot`], separately from ordinary
//!   not-found misses.
//!
//! [`Server`] wires them to a tokio listener: one request per connection,
//! one file per response, graceful shutdown on SIGTERM / Ctrl-C.
//!
//! What turbine does not do: TLS, header or body parsing, keep-alive,
//! chunked transfer. Put a proxy in front for those.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use turbine::{DocumentRoot, Resolver, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = DocumentRoot::new("./public")?;
//!     Server::bind("0.0.0.0:8080")?
//!         .serve(Resolver::new(root))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! The core can be used without the server:
//!
//! ```rust,no_run
//! use turbine::{DocumentRoot, Request, Resolver};
//!
//! let resolver = Resolver::new(DocumentRoot::new("./public")?);
//! let request = Request::parse("GET /index.html HTTP/1.1\r\n\r\n")?;
//! let file = resolver.resolve(request.resource())?;
//! println!("{}", file.as_path().display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod method;
mod request;
mod resolver;
mod response;
mod server;
mod status;

pub use error::{Error, ParseError, ResolveError};
pub use method::Method;
pub use request::Request;
pub use resolver::{DocumentRoot, INDEX_FILE, ResolvedPath, Resolver};
pub use response::{Body, ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::{DRAIN_TIMEOUT, HEAD_TIMEOUT, MAX_HEAD_SIZE, Server};
pub use status::Status;
