//! Remote-path string helpers.
//!
//! Remote paths are POSIX-style, rooted at "/". Normalization trims
//! duplicate and trailing slashes but never resolves `.`/`..`; the server
//! has no notion of those.

use std::path::PathBuf;

/// Normalize a remote path: ensure a leading slash, strip a trailing one.
/// `""`, `"/"` and `"///"` all normalize to `"/"`.
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        let parts: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();
        format!("/{}", parts.join("/"))
    }
}

/// Split a remote path into its components. The root has none.
pub fn components(path: &str) -> Vec<String> {
    path.trim_matches('/')
        .split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a normalized path into (parent path, final component).
/// Returns `("/", None)` for the root itself.
pub fn parent_and_name(path: &str) -> (String, Option<String>) {
    let mut comps = components(path);
    match comps.pop() {
        None => ("/".to_string(), None),
        Some(name) => {
            let parent = if comps.is_empty() {
                "/".to_string()
            } else {
                format!("/{}", comps.join("/"))
            };
            (parent, Some(name))
        }
    }
}

/// Join a child name onto a normalized base path.
pub fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// The user's home directory (`HOME`, falling back to `USERPROFILE` on
/// Windows).
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// The CLI's data directory: `~/.filen-cli`.
pub fn data_dir() -> PathBuf {
    home_dir().join(".filen-cli")
}
