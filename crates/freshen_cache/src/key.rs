//! Cache key normalization.

use std::path::Path;

/// Turns an absolute path into a cache key by stripping `root` from its
/// front.
///
/// The prefix must match exactly (`/app` does not match `/APP/a.js`). On
/// Windows only the drive letter is compared without case (`C:\app` vs
/// `c:\app`). A path outside `root`, or any path when `root` is empty, is
/// used verbatim.
pub fn normalize_key(root: &str, path: &Path) -> String {
    let path = path.to_string_lossy();
    if root.is_empty() {
        return path.into_owned();
    }
    match path.get(..root.len()) {
        Some(prefix) if root_matches(prefix, root) => path[root.len()..].to_string(),
        _ => path.into_owned(),
    }
}

#[cfg(not(windows))]
fn root_matches(prefix: &str, root: &str) -> bool {
    prefix == root
}

#[cfg(windows)]
fn root_matches(prefix: &str, root: &str) -> bool {
    let (p, r) = (prefix.as_bytes(), root.as_bytes());
    let has_drive = |b: &[u8]| b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':';
    if has_drive(p) && has_drive(r) {
        p[0].eq_ignore_ascii_case(&r[0]) && p[1..] == r[1..]
    } else {
        p == r
    }
}
