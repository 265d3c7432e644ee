//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Whether `url_str` parses as an absolute `http`/`https` URL.
///
/// Uses the `url` crate, so ports, auth info and query strings are accepted:
///
/// ```ignore
/// is_http_url("https://overpass-api.de/api/interpreter") -> true
/// is_http_url("http://localhost:8080/search?x=1")        -> true
/// is_http_url("ftp://example.com")                       -> false
/// is_http_url("overpass-api.de")                         -> false
/// ```
pub fn is_http_url(url_str: &str) -> bool {
    url::Url::parse(url_str)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/decks/strasbourg/  ← cwd
/// /home/user/decks/osmfc.toml   ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Same as [`find_config_file`], starting from `start`.
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    // Walk up from start looking for config file
    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        // Move to parent directory
        match current.parent() {
            Some(parent) => current = parent,
            None => return None, // Reached filesystem root
        }
    }
}

// ============================================================================
// tests
// ============================================================================
