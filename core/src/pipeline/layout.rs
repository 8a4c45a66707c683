use std::io;
use std::path::{Path, PathBuf};

use glob::MatchOptions;

/// On-disk layout of one account's run:
/// `<root>/downloads/<account>/<envelope>/<file>` and
/// `<root>/output/<account>/<envelope>/<file>.json`.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
    account_id: String,
}

/// Escapes an opaque id into one path segment. The mapping is injective:
/// `%` and the separator characters are percent-encoded, dot-only names get
/// their dots encoded, and the empty id becomes a lone `%`.
fn path_segment(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let dots_only = raw.chars().all(|c| c == '.');
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' | '/' | '\\' | ':' | '\0' => out.push_str(&format!("%{:02X}", c as u32)),
            '.' if dots_only => out.push_str("%2E"),
            _ => out.push(c),
        }
    }
    out
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, account_id: &str) -> Self {
        Self {
            root: root.into(),
            account_id: path_segment(account_id),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn download_dir(&self, envelope_id: &str) -> PathBuf {
        self.root
            .join("downloads")
            .join(&self.account_id)
            .join(path_segment(envelope_id))
    }

    pub fn output_dir(&self, envelope_id: &str) -> PathBuf {
        self.root
            .join("output")
            .join(&self.account_id)
            .join(path_segment(envelope_id))
    }
}

/// Files in `dir` whose name matches `pattern` (case-insensitive), sorted.
/// A missing directory yields an empty list.
pub fn files_matching(dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let paths = glob::glob_with(&full, options)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| e.into_error())?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_escaped() {
        let layout = DataLayout::new("/data", "acct/1");
        assert_eq!(
            layout.download_dir("env-1"),
            PathBuf::from("/data/downloads/acct%2F1/env-1")
        );
        assert_eq!(
            layout.output_dir(".."),
            PathBuf::from("/data/output/acct%2F1/%2E%2E")
        );
        assert_eq!(path_segment("c:\\x"), "c%3A%5Cx");
        assert_eq!(path_segment(""), "%");
        assert_eq!(path_segment("v1.2"), "v1.2");
    }

    #[test]
    fn distinct_ids_get_distinct_dirs() {
        let layout = DataLayout::new("/data", "acct");
        let ids = ["a/b", "a_b", "a%2Fb", "a%b", "a:b", ".", "%2E", "", "%", " a", "a"];
        let dirs: std::collections::HashSet<PathBuf> =
            ids.iter().map(|id| layout.download_dir(id)).collect();
        assert_eq!(dirs.len(), ids.len());
    }

    #[test]
    fn files_matching_is_sorted_and_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let found: Vec<String> = files_matching(dir.path(), "*.pdf")
            .unwrap()
            .iter()
            .map(|p| file_label(p))
            .collect();
        assert_eq!(found, vec!["A.PDF", "b.pdf"]);

        let missing = dir.path().join("nope");
        assert!(files_matching(&missing, "*.json").unwrap().is_empty());
    }
}
