//! HTTP method as a typed enum.
//!
//! Turbine recognises exactly two methods. Anything else on the request line
//! is a parse error ([`ParseError::InvalidMethod`](crate::ParseError)), never
//! a third variant, so adding a method later shows up in every exhaustive
//! `match` at compile time.

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get  => "GET",
            Self::Post => "POST",
        }
    }
}

/// Parses an uppercase method token. Case-sensitive per RFC 9110 §9.1, so
/// `"get"` is rejected.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"  => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _      => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
