//! Local → remote path mapping.
//!
//! Remote paths are always POSIX: forward slashes only, no `.` segments, no
//! doubled separators, no trailing separator. Local paths may come from any
//! OS, so backslashes are treated as separators too.

use std::path::Path;

use crate::error::PathError;

/// Lexically clean a forward-slash path.
///
/// Collapses repeated separators, drops `.` segments, resolves `..` against the
/// preceding segment, and strips any trailing separator. `..` above a rooted
/// path stays at the root; an empty result is `"."`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Convert an OS-built path string to its canonical POSIX form.
pub fn to_posix(path: &str) -> String {
    clean(&path.replace('\\', "/"))
}

/// Path of `local` relative to `watch_root`, in POSIX form.
pub fn relative_path(watch_root: &Path, local: &Path) -> Result<String, PathError> {
    let rel = local
        .strip_prefix(watch_root)
        .map_err(|_| PathError::OutsideRoot {
            path: local.to_path_buf(),
            root: watch_root.to_path_buf(),
        })?;

    let joined = rel
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| PathError::NonUtf8 {
            path: local.to_path_buf(),
        })?
        .join("/");
    let cleaned = to_posix(&joined);

    if cleaned == "." {
        return Err(PathError::EmptyRelative {
            path: local.to_path_buf(),
        });
    }
    if cleaned == ".." || cleaned.starts_with("../") {
        return Err(PathError::EscapesRoot {
            path: local.to_path_buf(),
        });
    }
    Ok(cleaned)
}

/// Append a clean relative path to the remote root.
pub fn join_remote(remote_root: &str, relative: &str) -> String {
    to_posix(&format!("{remote_root}/{relative}"))
}

/// Full remote destination for a local file.
pub fn remote_path_for(
    watch_root: &Path,
    remote_root: &str,
    local: &Path,
) -> Result<String, PathError> {
    let relative = relative_path(watch_root, local)?;
    Ok(join_remote(remote_root, &relative))
}

/// Parent directory of a clean remote path, or `None` when there is nothing
/// to create (`"."` or `"/"`).
pub fn parent_dir(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    let dir = &path[..idx];
    if dir.is_empty() {
        None
    } else {
        Some(dir)
    }
}

/// Every directory prefix of a clean path, shortest first.
///
/// `/remote/out/x` → `["/remote", "/remote/out", "/remote/out/x"]`.
pub fn dir_prefixes(dir: &str) -> Vec<String> {
    let rooted = dir.starts_with('/');
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in dir.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if rooted || !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("a/b/c.txt", "a/b/c.txt")]
    #[case("a//b///c.txt", "a/b/c.txt")]
    #[case("a/b/./c.txt", "a/b/c.txt")]
    #[case("a/b/../c.txt", "a/c.txt")]
    #[case("a/b/", "a/b")]
    #[case("/", "/")]
    #[case("/../x", "/x")]
    #[case("../x", "../x")]
    #[case("", ".")]
    #[case("./", ".")]
    fn clean_matches_lexical_rules(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean(input), expected);
    }

    #[test]
    fn os_separators_and_dot_segments_normalise_identically() {
        assert_eq!(to_posix(r"a\b\c.txt"), "a/b/c.txt");
        assert_eq!(to_posix("a/b/./c.txt"), "a/b/c.txt");
        assert_eq!(to_posix(r"a\b\c.txt\"), "a/b/c.txt");
    }

    #[test]
    fn remote_path_is_root_plus_relative() {
        let remote = remote_path_for(
            Path::new("/data/in"),
            "/remote/out",
            Path::new("/data/in/x/y.txt"),
        )
        .expect("map");
        assert_eq!(remote, "/remote/out/x/y.txt");
    }

    #[test]
    fn remote_root_with_trailing_slash_or_backslashes_is_cleaned() {
        assert_eq!(join_remote("/remote/out/", "y.txt"), "/remote/out/y.txt");
        assert_eq!(join_remote(r"\remote\out", "y.txt"), "/remote/out/y.txt");
        assert_eq!(join_remote("/", "y.txt"), "/y.txt");
        assert_eq!(join_remote("out", "x/y.txt"), "out/x/y.txt");
    }

    #[test]
    fn path_outside_watch_root_is_rejected() {
        let err = relative_path(Path::new("/data/in"), Path::new("/data/other/y.txt")).unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }), "got: {err}");
    }

    #[test]
    fn watch_root_itself_has_no_relative_path() {
        let err = relative_path(Path::new("/data/in"), Path::new("/data/in")).unwrap_err();
        assert_eq!(
            err,
            PathError::EmptyRelative {
                path: PathBuf::from("/data/in")
            }
        );
    }

    #[test]
    fn climbing_out_of_the_root_is_rejected() {
        let err =
            relative_path(Path::new("/data/in"), Path::new("/data/in/x/../../y.txt")).unwrap_err();
        assert!(matches!(err, PathError::EscapesRoot { .. }), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_rejected_not_replaced() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/data/in");
        let first = root.join(OsStr::from_bytes(b"bad\xff.txt"));
        let second = root.join(OsStr::from_bytes(b"bad\xfe.txt"));

        for local in [first, second] {
            let err = relative_path(root, &local).unwrap_err();
            assert_eq!(err, PathError::NonUtf8 { path: local });
        }
    }

    #[rstest]
    #[case("/remote/out/x/y.txt", Some("/remote/out/x"))]
    #[case("/y.txt", None)]
    #[case("y.txt", None)]
    #[case("out/y.txt", Some("out"))]
    fn parent_dir_skips_root_and_dot(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(parent_dir(path), expected);
    }

    #[test]
    fn dir_prefixes_lists_every_ancestor() {
        assert_eq!(
            dir_prefixes("/remote/out/x"),
            vec!["/remote", "/remote/out", "/remote/out/x"]
        );
        assert_eq!(dir_prefixes("out/x"), vec!["out", "out/x"]);
        assert!(dir_prefixes("/").is_empty());
    }
}
