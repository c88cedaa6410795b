//! Document-root path resolution.
//!
//! # Containment
//!
//! A client-supplied resource reaches the filesystem in three steps:
//!
//! ```text
//! "/docs/../img/a.png"                        ← Request::resource()
//!        ↓ strip one "/", join component by component
//! <root>/docs/../img/a.png                    ← candidate, never rooted
//!        ↓ fs::canonicalize (symlinks, "." and "..")
//! <root>/img/a.png                            ← canonical
//!        ↓ starts_with(<root>) on path components
//! ResolvedPath                                ← only constructor
//! ```
//!
//! The join refuses a remainder that is itself rooted (`//etc/passwd`). A
//! `..` that would climb past the root is checked against the canonical form
//! of the prefix built so far: `deep/../..` stays inside when `deep` is a
//! symlink further into the root, while `/../secret` is rejected as
//! [`ResolveError::PathOutsideDocumentRoot`] whether or not the target
//! exists. The component-prefix check after canonicalization catches what is
//! left: symlinks that point out of the root.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::request::Request;

/// File served when a resource names a directory.
pub const INDEX_FILE: &str = "index.html";

// ── DocumentRoot ──────────────────────────────────────────────────────────────

/// The directory every served file must live under.
///
/// Canonicalized once on construction and immutable afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DocumentRoot(PathBuf);

impl DocumentRoot {
    /// Canonicalizes `path` and checks that it is a directory.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let canonical = fs::canonicalize(path)?;
        if !canonical.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("document root `{}` is not a directory", canonical.display()),
            ));
        }
        Ok(Self(canonical))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

// ── ResolvedPath ──────────────────────────────────────────────────────────────

/// A canonical path that was inside the document root when it was resolved.
///
/// There is no public constructor; [`Resolver::resolve`] is the only way to
/// get one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Maps request resources to files inside one [`DocumentRoot`].
///
/// Holds no mutable state, so one instance can be shared across every
/// connection behind an `Arc`.
///
/// ```rust,no_run
/// use turbine::{DocumentRoot, Resolver};
///
/// let resolver = Resolver::new(DocumentRoot::new("./public")?);
/// let index = resolver.resolve("/")?;
/// assert!(index.as_path().ends_with("index.html"));
///
/// assert!(resolver.resolve("/../etc/passwd").unwrap_err().is_security_violation());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Resolver {
    root: DocumentRoot,
}

impl Resolver {
    pub fn new(root: DocumentRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &DocumentRoot {
        &self.root
    }

    /// Resolves `resource` to a canonical file path inside the root.
    ///
    /// Directories resolve to their [`INDEX_FILE`]. Blocks on the filesystem.
    pub fn resolve(&self, resource: &str) -> Result<ResolvedPath, ResolveError> {
        let Some(relative) = resource.strip_prefix('/') else {
            return Err(ResolveError::PathShouldStartWithSlash(resource.to_owned()));
        };

        let candidate = self.join(relative).inspect_err(|_| {
            warn!(resource, "rejected resource escaping the document root");
        })?;

        let mut canonical = fs::canonicalize(&candidate)?;
        if canonical.is_dir() {
            canonical = fs::canonicalize(canonical.join(INDEX_FILE))?;
        }

        if !canonical.starts_with(self.root.as_path()) {
            warn!(resource, path = %canonical.display(), "resolved path escapes the document root");
            return Err(ResolveError::PathOutsideDocumentRoot(canonical));
        }

        // An `index.html` that is itself a directory has nothing to serve.
        if canonical.is_dir() {
            return Err(ResolveError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("`{}` is a directory", canonical.display()),
            )));
        }

        debug!(resource, path = %canonical.display(), "resolved");
        Ok(ResolvedPath(canonical))
    }

    /// Parses a raw request and resolves its resource in one step.
    pub fn resolve_request(&self, raw: &str) -> Result<ResolvedPath, ResolveError> {
        let request = Request::parse(raw)?;
        self.resolve(request.resource())
    }

    /// Joins `relative` onto the root one component at a time, so nothing in
    /// it can replace the root.
    ///
    /// `depth` counts the components below the root. A `..` at depth zero
    /// re-anchors on the canonical prefix first, so symlinks pointing deeper
    /// into the root are followed before deciding whether it escapes.
    fn join(&self, relative: &str) -> Result<PathBuf, ResolveError> {
        let root = self.root.as_path();
        let escape = || ResolveError::PathOutsideDocumentRoot(root.join(relative));

        let mut path = root.to_path_buf();
        let mut depth = 0usize;

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir if depth > 0 => {
                    path.push(component);
                    depth -= 1;
                }
                Component::ParentDir => {
                    // A prefix that cannot be canonicalized is judged lexically.
                    let canonical = fs::canonicalize(&path).map_err(|_| escape())?;
                    let parent = canonical
                        .parent()
                        .and_then(|p| p.strip_prefix(root).ok())
                        .filter(|_| canonical.starts_with(root) && canonical != root)
                        .ok_or_else(escape)?;
                    depth = parent.components().count();
                    path = root.components().chain(parent.components()).collect();
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ResolveError::PathOutsideDocumentRoot(PathBuf::from(relative)));
                }
            }
        }

        Ok(path)
    }
}
