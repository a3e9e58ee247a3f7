//! Path helpers shared by all backends.
//!
//! Node paths are plain `/`-separated strings relative to a backend's base. They are kept as
//! strings (not `PathBuf`) because they never touch the host separator rules; only
//! [`to_host`] turns them into host paths.

use std::path::{Path, PathBuf};

use crate::core::{Error, Result};

/// Normalizes a `/`-separated path: resolves `.` and `..`, collapses repeated separators and
/// removes the trailing slash. A leading `/` is preserved; `..` never climbs above the start.
///
/// Normalizing an already normalized path returns the identical string.
pub fn normalize(path: &str) -> String {
    let is_absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if is_absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Resolves `relative` against the absolute node path `base`.
pub fn join(base: &str, relative: &str) -> String {
    normalize(&format!("/{}/{}", base, relative))
}

/// Returns `true` for the root path of a backend.
pub fn is_root(path: &str) -> bool {
    path == "/"
}

/// Final segment of a normalized path. Empty for the root.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Parent path of a normalized absolute path.
/// Fails with `InvalidPath` at the root.
pub fn parent(path: &str) -> Result<String> {
    if is_root(path) || path.is_empty() {
        return Err(Error::InvalidPath(format!("{} has no parent", path)));
    }
    match path.rfind('/') {
        Some(0) => Ok("/".to_string()),
        Some(idx) => Ok(path[..idx].to_string()),
        None => Ok("/".to_string()),
    }
}

/// Extension of a file name: the segment after the last `.`.
/// Names without a dot, or with only a leading dot (`.profile`), have no extension.
pub fn extension(name: &str) -> Option<&str> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Name without its extension.
pub fn stem(name: &str) -> &str {
    match extension(name) {
        Some(ext) => &name[..name.len() - ext.len() - 1],
        None => name,
    }
}

/// Rejects names that cannot denote a single directory entry.
pub fn assert_valid_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidPath("invalid name: empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidPath(format!("invalid name: {}", name)));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidPath(format!(
            "invalid name: {} contains a path separator",
            name
        )));
    }
    Ok(())
}

/// Maps a normalized node path onto the host, below `base`.
pub fn to_host(base: &Path, path: &str) -> PathBuf {
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod normalize {
        use super::*;

        #[test]
        fn test_normalize_path() {
            assert_eq!(normalize("/a/b/c/"), "/a/b/c");
            assert_eq!(normalize("/a/b/./c"), "/a/b/c");
            assert_eq!(normalize("/a/b/../c"), "/a/c");
            assert_eq!(normalize("/"), "/");
            assert_eq!(normalize("/.."), "/");
            assert_eq!(normalize(".."), "");
            assert_eq!(normalize(""), "");
            assert_eq!(normalize("../a"), "a");
            assert_eq!(normalize("./a"), "a");
            assert_eq!(normalize("a/./b/../c"), "a/c");
            assert_eq!(normalize("//a///b//"), "/a/b");
        }

        #[test]
        fn test_normalize_is_idempotent() {
            for path in ["/", "/a", "/a/b/c", "a/c", "", "/проект/документ.txt"] {
                assert_eq!(normalize(path), path);
                assert_eq!(normalize(&normalize(path)), normalize(path));
            }
        }

        #[test]
        fn test_join() {
            assert_eq!(join("/", "docs"), "/docs");
            assert_eq!(join("/docs", "img/logo.png"), "/docs/img/logo.png");
            assert_eq!(join("/docs", "../notes.txt"), "/notes.txt");
            assert_eq!(join("/docs", "../../.."), "/");
            assert_eq!(join("/docs", ""), "/docs");
            assert_eq!(join("/docs", "/abs"), "/docs/abs");
        }
    }

    mod names {
        use super::*;

        #[test]
        fn test_file_name_and_parent() {
            assert_eq!(file_name("/docs/readme.md"), "readme.md");
            assert_eq!(file_name("/docs"), "docs");
            assert_eq!(file_name("/"), "");

            assert_eq!(parent("/docs/readme.md").unwrap(), "/docs");
            assert_eq!(parent("/docs").unwrap(), "/");
            assert!(matches!(parent("/"), Err(Error::InvalidPath(_))));
        }

        #[test]
        fn test_extension_and_stem() {
            assert_eq!(extension("readme.md"), Some("md"));
            assert_eq!(extension("archive.tar.gz"), Some("gz"));
            assert_eq!(extension("Makefile"), None);
            assert_eq!(extension(".profile"), None);
            assert_eq!(stem("archive.tar.gz"), "archive.tar");
            assert_eq!(stem("Makefile"), "Makefile");
        }

        #[test]
        fn test_assert_valid_file_name() {
            assert!(assert_valid_file_name("notes.txt").is_ok());
            assert!(assert_valid_file_name("...").is_ok());
            for bad in ["", ".", "..", "a/b", "a\\b"] {
                assert!(
                    matches!(assert_valid_file_name(bad), Err(Error::InvalidPath(_))),
                    "{:?} must be rejected",
                    bad
                );
            }
        }
    }

    #[test]
    fn test_to_host() {
        let base = Path::new("/srv/data");
        assert_eq!(to_host(base, "/"), PathBuf::from("/srv/data"));
        assert_eq!(to_host(base, "/docs/a.md"), PathBuf::from("/srv/data/docs/a.md"));
    }
}
