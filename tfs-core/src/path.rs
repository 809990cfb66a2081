//! Relative paths inside a tier namespace

use std::fmt;
use std::path::{Path, PathBuf};

/// Normalised path relative to the root of one tier's namespace.
///
/// Client supplied paths are joined segment by segment: `.` is dropped and
/// `..` pops the previous segment, so a `TierPath` never escapes its root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TierPath {
    pub segments: Vec<String>,
}

impl TierPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::root().join(path)
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        for part in name.as_ref().split('/').filter(|s| !s.is_empty()) {
            if part == ".." {
                segments.pop();
            } else if part != "." {
                segments.push(part.to_string());
            }
        }
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.name().and_then(|n| n.rsplit_once('.')).map(|(_, ext)| ext)
    }

    pub fn to_path_string(&self) -> String {
        self.segments.join("/")
    }

    /// Real location of this path under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut real = root.to_path_buf();
        for seg in &self.segments {
            real.push(seg);
        }
        real
    }

    /// Inverse of [`TierPath::resolve`].
    pub fn from_real(root: &Path, real: &Path) -> Option<Self> {
        let relative = real.strip_prefix(root).ok()?;
        Some(Self::new(relative.to_string_lossy()))
    }
}

impl fmt::Display for TierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

/// Final component of a slash separated path, or the whole input when it has
/// no separator.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let path = TierPath::new("notes/2024/report.pdf");
        assert_eq!(path.segments, vec!["notes", "2024", "report.pdf"]);
    }

    #[test]
    fn test_new_handles_empty_segments() {
        let path = TierPath::new("//notes//drafts//");
        assert_eq!(path.segments, vec!["notes", "drafts"]);
    }

    #[test]
    fn test_dotdot_never_escapes_root() {
        let path = TierPath::new("../../etc/passwd");
        assert_eq!(path.segments, vec!["etc", "passwd"]);

        let path = TierPath::new("notes/../../a.c");
        assert_eq!(path.segments, vec!["a.c"]);
    }

    #[test]
    fn test_join_with_dot() {
        let path = TierPath::new("notes").join("./drafts/a.txt");
        assert_eq!(path.segments, vec!["notes", "drafts", "a.txt"]);
    }

    #[test]
    fn test_parent_and_name() {
        let path = TierPath::new("notes/a.c");
        assert_eq!(path.name(), Some("a.c"));
        assert_eq!(path.parent().unwrap().segments, vec!["notes"]);
        assert!(TierPath::root().parent().is_none());
        assert!(TierPath::root().name().is_none());
    }

    #[test]
    fn test_extension() {
        assert_eq!(TierPath::new("notes/a.txt").extension(), Some("txt"));
        assert_eq!(TierPath::new("archive.tar.gz").extension(), Some("gz"));
        assert!(TierPath::new("Makefile").extension().is_none());
    }

    #[test]
    fn test_resolve_round_trip() {
        let root = Path::new("/srv/spdf");
        let path = TierPath::new("notes/b.pdf");
        let real = path.resolve(root);
        assert_eq!(real, PathBuf::from("/srv/spdf/notes/b.pdf"));
        assert_eq!(TierPath::from_real(root, &real), Some(path));
        assert!(TierPath::from_real(root, Path::new("/tmp/x")).is_none());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/home/u/spdf/notes/b.pdf"), "b.pdf");
        assert_eq!(base_name("c.txt"), "c.txt");
        assert_eq!(base_name("notes/"), "notes");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TierPath::new("/a/b.c")), "a/b.c");
        assert_eq!(format!("{}", TierPath::root()), "");
    }
}
