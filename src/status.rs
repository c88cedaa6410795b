//! HTTP status codes the file server emits.
//!
//! ```rust
//! use turbine::{Response, Status};
//!
//! let forbidden = Response::status(Status::Forbidden);
//! assert_eq!(forbidden.code(), 403);
//! ```

/// The status codes Turbine can answer with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                          // 200
    BadRequest,                  // 400
    Forbidden,                   // 403
    NotFound,                    // 404
    MethodNotAllowed,            // 405
    RequestTimeout,              // 408
    RequestHeaderFieldsTooLarge, // 431
    InternalServerError,         // 500
}

impl Status {
    /// The reason phrase written on the status line.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Ok                          => "OK",
            Self::BadRequest                  => "Bad Request",
            Self::Forbidden                   => "Forbidden",
            Self::NotFound                    => "Not Found",
            Self::MethodNotAllowed            => "Method Not Allowed",
            Self::RequestTimeout              => "Request Timeout",
            Self::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            Self::InternalServerError         => "Internal Server Error",
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                          => 200,
            Status::BadRequest                  => 400,
            Status::Forbidden                   => 403,
            Status::NotFound                    => 404,
            Status::MethodNotAllowed            => 405,
            Status::RequestTimeout              => 408,
            Status::RequestHeaderFieldsTooLarge => 431,
            Status::InternalServerError         => 500,
        }
    }
}
