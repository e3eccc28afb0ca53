//! Utility functions

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Returns a list of absolute paths to all the solidity files under the root.
///
/// NOTE: this does not resolve imports from other locations
pub fn source_files(root: impl AsRef<Path>) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "sol").unwrap_or_default())
        .map(|e| e.path().into())
        .collect()
}

/// Lexically normalizes a path, resolving `.` and `..` components without
/// touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            c => normalized.push(c),
        }
    }
    normalized
}

/// Returns the logical source name of `path`: its path relative to `root`
/// with `/` separators, or the full path if it is not below `root`.
pub fn source_name(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves a relative import specifier against the directory of the
/// importing file's source name, `("contracts/A.sol", "../lib/B.sol")`
/// -> `"lib/B.sol"`.
pub fn join_source_names(importing: &str, specifier: &str) -> String {
    let mut parts: Vec<&str> = importing.split('/').collect();
    parts.pop();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().map_or(true, |p| *p == "..") {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};

    #[test]
    fn can_find_solidity_sources() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file_a = tmp_dir.path().join("a.sol");
        let nested = tmp_dir.path().join("nested");
        let file_b = nested.join("b.sol");
        File::create(&file_a).unwrap();
        create_dir_all(&nested).unwrap();
        File::create(&file_b).unwrap();
        File::create(nested.join("ignored.txt")).unwrap();

        assert_eq!(source_files(tmp_dir.path()), vec![file_a, file_b]);
    }

    #[test]
    fn can_normalize_paths() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d.sol")), PathBuf::from("/a/c/d.sol"));
        assert_eq!(normalize_path(Path::new("a/./b.sol")), PathBuf::from("a/b.sol"));
    }

    #[test]
    fn can_join_source_names() {
        assert_eq!(join_source_names("contracts/A.sol", "./B.sol"), "contracts/B.sol");
        assert_eq!(join_source_names("contracts/sub/A.sol", "../B.sol"), "contracts/B.sol");
        assert_eq!(join_source_names("A.sol", "./B.sol"), "B.sol");
        assert_eq!(join_source_names("lib/pkg/src/A.sol", "./util/B.sol"), "lib/pkg/src/util/B.sol");
    }
}
