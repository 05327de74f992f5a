use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::error::ServeError;

/// An absolute filesystem path proven to live under the served root.
///
/// Only [`resolve`] can construct one, so holding a `ResolvedPath` is proof
/// that the containment check passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl Deref for ResolvedPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Map a request URL path onto the filesystem under `root`.
///
/// The URL path is percent-decoded and then normalized lexically: `.`
/// segments are dropped and `..` pops the previous segment. The containment
/// check runs on the normalized result, so `..` sequences that stay inside
/// the root are allowed while anything escaping it fails with `Forbidden`.
/// Pure path arithmetic, no filesystem access.
pub fn resolve(root: &Path, url_path: &str) -> Result<ResolvedPath, ServeError> {
    let decoded = percent_decode_str(url_path).decode_utf8_lossy();
    // Strip exactly one leading separator. A path that is still absolute
    // after that (an encoded `%2F` at the front) keeps its root component
    // and is rejected below.
    let relative = decoded.strip_prefix('/').unwrap_or(&decoded);

    let mut result = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => result.push(name),
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            // A decoded segment can still smuggle in an absolute component.
            Component::RootDir | Component::Prefix(_) => return Err(ServeError::Forbidden),
        }
    }

    // Popping above the root leaves a path that is no longer prefixed by it.
    if result.starts_with(root) {
        Ok(ResolvedPath(result))
    } else {
        Err(ServeError::Forbidden)
    }
}
