//! Helpers for slash-delimited project paths.

/// Split a path on `/`, dropping empty segments.
///
/// Handles leading slashes and accidental double slashes alike.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Render segments as an absolute-style path (`/a/b`).
pub fn join_absolute(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

/// Normalize a path to `/a/b` form. Returns `None` when no segment remains.
pub fn normalize(path: &str) -> Option<String> {
    let parts = segments(path);
    if parts.is_empty() {
        return None;
    }
    Some(join_absolute(&parts))
}

/// Display title for a file path: its last raw segment, or `"File"`.
pub fn file_title(path: &str) -> String {
    match path.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => "File".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_drop_empty_parts() {
        assert_eq!(
            segments("/src//components/Foo.tsx"),
            vec!["src", "components", "Foo.tsx"]
        );
        assert!(segments("/").is_empty());
    }

    #[test]
    fn normalize_adds_leading_slash() {
        assert_eq!(normalize("index.js"), Some("/index.js".to_string()));
        assert_eq!(normalize("//a//b/"), Some("/a/b".to_string()));
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn file_title_falls_back_for_trailing_slash() {
        assert_eq!(file_title("/src/App.tsx"), "App.tsx");
        assert_eq!(file_title("src/"), "File");
    }
}
