//! Source file discovery for batch compilation.

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the front end accepts.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["ets", "ts"];

pub fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(".d.ts") || name.ends_with(".d.ets") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// All source files under `dir`, sorted so batch output is deterministic.
pub fn find_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Deepest directory containing every path in `paths`. Empty when they share
/// no leading component.
pub fn common_root(paths: &[PathBuf]) -> PathBuf {
    let mut iter = paths.iter();
    let mut common: Vec<Component> = match iter.next() {
        Some(first) => first.components().collect(),
        None => return PathBuf::new(),
    };
    for path in iter {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    common.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_nested_sources_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("Index.ets"), "").unwrap();
        fs::write(dir.path().join("util.ts"), "").unwrap();
        fs::write(dir.path().join("types.d.ts"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let found = find_source_files(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["pages/Index.ets", "util.ts"]);
    }

    #[test]
    fn declaration_files_are_not_sources() {
        assert!(is_source_file(Path::new("a/App.ets")));
        assert!(!is_source_file(Path::new("a/index.d.ts")));
        assert!(!is_source_file(Path::new("a/app.js")));
    }

    #[test]
    fn common_root_is_the_shared_directory() {
        let paths = |list: &[&str]| list.iter().map(PathBuf::from).collect::<Vec<_>>();
        assert_eq!(common_root(&paths(&["src/a", "src/b/c"])), PathBuf::from("src"));
        assert_eq!(common_root(&paths(&["a", "b"])), PathBuf::new());
        assert_eq!(common_root(&paths(&["src/pages"])), PathBuf::from("src/pages"));
        assert_eq!(common_root(&[]), PathBuf::new());
    }
}
