//! Vault path normalization shared by every gate.

/// Normalize a vault-relative path: forward slashes, no leading or trailing
/// separator, no empty or `.` segments, `..` resolved where possible.
///
/// A `..` that would climb above the vault root is kept, so the result can
/// never be mistaken for a path inside the vault.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Whether `path` equals `prefix` or lies beneath it. Both must be normalized;
/// an empty prefix is the vault root and contains everything.
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::{is_within, normalize_path};
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_separators_and_dots() {
        assert_eq!(normalize_path("Notes\\daily\\x.md"), "Notes/daily/x.md");
        assert_eq!(normalize_path("/Projects//plan.md/"), "Projects/plan.md");
        assert_eq!(normalize_path("./a/./b"), "a/b");
        assert_eq!(normalize_path("Projects/../_private/key.md"), "_private/key.md");
        assert_eq!(normalize_path("../outside.md"), "../outside.md");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn within_requires_segment_boundary() {
        assert!(is_within("Projects", "Projects"));
        assert!(is_within("Projects/plan.md", "Projects"));
        assert!(!is_within("ProjectsArchive/plan.md", "Projects"));
        assert!(!is_within("Proj", "Projects"));
        assert!(is_within("anything", ""));
    }
}
