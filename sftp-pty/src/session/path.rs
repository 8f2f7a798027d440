//! POSIX path handling for the remote side.
//!
//! Remote paths are always `/`-separated regardless of the local platform,
//! so `std::path` is not used here.

/// Whether a remote path is absolute.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Lexically normalise an absolute path: collapse repeated separators,
/// drop `.` segments and resolve `..` against the preceding segment.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Join a relative path onto an absolute base and normalise the result.
pub fn join(base: &str, relative: &str) -> String {
    if is_absolute(relative) {
        return normalize(relative);
    }
    normalize(&format!("{}/{}", base, relative))
}

/// Split a normalised absolute path into parent directory and base name.
///
/// Returns `None` for the root directory.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let path = normalize(path);
    let (parent, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    let parent = if parent.is_empty() { "/" } else { parent };
    Some((parent.to_string(), name.to_string()))
}

/// Quote a path for the sftp command line.
pub fn quote(path: &str) -> String {
    format!("\"{}\"", path.replace('\\', "\\\\").replace('"', "\\\""))
}
