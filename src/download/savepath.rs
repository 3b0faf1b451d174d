//! Save-path derivation: resource URL to a path under the destination root.
//!
//! The original directory structure of the scraped site is preserved: the
//! URL's path component (minus its single leading slash, percent-decoded)
//! becomes the relative save path. Empty paths get a synthesized
//! `resource_<millis>_<random>` name so every resource lands somewhere.
//!
//! Decoded paths are sandbox-joined: parent-directory and absolute
//! components are dropped, so a crafted URL cannot write outside the
//! destination root.

use std::path::{Component, Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;
use url::Url;

use super::error::DownloadError;

/// Derives the save path for `url` under `destination_root`.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] when the URL does not parse.
pub fn resolve_save_path(url: &str, destination_root: &Path) -> Result<PathBuf, DownloadError> {
    let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

    let path = parsed.path();
    let relative = path.strip_prefix('/').unwrap_or(path);
    // Lossy on invalid UTF-8: bad escapes become replacement characters
    // rather than failing the whole path.
    let decoded =
        String::from_utf8_lossy(&urlencoding::decode_binary(relative.as_bytes())).into_owned();

    let sandboxed = sandboxed_relative(&decoded);
    if sandboxed.as_os_str().is_empty() {
        return Ok(destination_root.join(synthesized_name()));
    }
    Ok(destination_root.join(sandboxed))
}

/// Keeps only normal components of a decoded relative path, discarding
/// `..`, `.`, and any root/prefix the decode may have produced.
fn sandboxed_relative(decoded: &str) -> PathBuf {
    Path::new(decoded)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            Component::CurDir
            | Component::ParentDir
            | Component::RootDir
            | Component::Prefix(_) => None,
        })
        .collect()
}

/// Non-empty fallback name for URLs whose path is empty.
fn synthesized_name() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("resource_{millis}_{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_preserves_directory_structure() {
        let path = resolve_save_path("https://x.test/a/b.png", Path::new("/out")).unwrap();
        assert_eq!(path, PathBuf::from("/out/a/b.png"));
    }

    #[test]
    fn test_resolve_strips_query_and_fragment() {
        // Url::path() excludes the query, matching the original behavior.
        let path = resolve_save_path("https://x.test/tex/a.png?v=3#frag", Path::new("/out")).unwrap();
        assert_eq!(path, PathBuf::from("/out/tex/a.png"));
    }

    #[test]
    fn test_resolve_percent_decodes() {
        let path = resolve_save_path("https://x.test/res/%E8%8B%B1%E9%9B%84.png", Path::new("/out"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/out/res/英雄.png"));
    }

    #[test]
    fn test_resolve_empty_path_synthesizes_name() {
        let path = resolve_save_path("https://x.test/", Path::new("/out")).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("resource_"), "got {name}");
        assert!(path.starts_with("/out"));
    }

    #[test]
    fn test_resolve_decodes_invalid_utf8_lossily() {
        // %FF is not valid UTF-8; it decodes to the replacement character
        // instead of failing or keeping the raw escape.
        let path = resolve_save_path("https://x.test/res/a%FFb.png", Path::new("/out")).unwrap();
        assert_eq!(path, PathBuf::from("/out/res/a\u{FFFD}b.png"));
    }

    #[test]
    fn test_resolve_neutralizes_parent_escapes() {
        let path =
            resolve_save_path("https://x.test/a/%2e%2e/%2e%2e/etc/passwd", Path::new("/out"))
                .unwrap();
        assert!(path.starts_with("/out"), "got {}", path.display());
        assert_eq!(path, PathBuf::from("/out/a/etc/passwd"));
    }

    #[test]
    fn test_resolve_all_parent_components_falls_back_to_synthesized() {
        let path = resolve_save_path("https://x.test/%2e%2e/%2e%2e", Path::new("/out")).unwrap();
        assert!(path.starts_with("/out"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("resource_"), "got {name}");
    }

    #[test]
    fn test_resolve_rejects_unparsable_url() {
        let result = resolve_save_path("not a url", Path::new("/out"));
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[test]
    fn test_synthesized_names_are_distinct() {
        assert_ne!(synthesized_name(), synthesized_name());
    }
}
