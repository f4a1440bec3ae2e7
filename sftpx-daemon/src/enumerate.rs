//! Turn a watch event into the jobs of its session.

use std::fs;

use sftpx_core::{Job, WatchEvent};
use walkdir::WalkDir;

/// Emit one job per regular (non-directory) entry of `event`, in traversal
/// order, and return how many were emitted.
///
/// Blocking: directory events walk the whole subtree. Entries that cannot be
/// read are logged and skipped. `emit` returns `false` when the queue is gone,
/// which stops the walk.
pub fn enumerate(event: &WatchEvent, mut emit: impl FnMut(Job) -> bool) -> usize {
    match event {
        WatchEvent::File(path) => usize::from(emit(Job::new(path.clone()))),
        WatchEvent::Directory(root) => {
            let mut emitted = 0;
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!(
                            root = %root.display(),
                            path = ?err.path(),
                            error = %err,
                            "walk error, skipping entry",
                        );
                        continue;
                    }
                };
                if entry.file_type().is_dir() || links_to_directory(&entry) {
                    continue;
                }
                if !emit(Job::new(entry.into_path())) {
                    tracing::warn!(root = %root.display(), "job queue closed, stopping walk");
                    break;
                }
                emitted += 1;
            }
            emitted
        }
    }
}

/// Symlinks are not followed, so a link to a directory would otherwise be
/// uploaded as a file.
fn links_to_directory(entry: &walkdir::DirEntry) -> bool {
    entry.path_is_symlink()
        && fs::metadata(entry.path())
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn collect(event: &WatchEvent) -> Vec<Job> {
        let mut jobs = Vec::new();
        let count = enumerate(event, |job| {
            jobs.push(job);
            true
        });
        assert_eq!(count, jobs.len());
        jobs
    }

    #[test]
    fn file_event_yields_exactly_one_job() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("a.txt");
        fs::write(&path, b"a").expect("write");

        let jobs = collect(&WatchEvent::File(path.clone()));
        assert_eq!(jobs, vec![Job::new(path)]);
    }

    #[test]
    fn directory_event_yields_every_nested_file_once() {
        let dir = TempDir::new().expect("tempdir");
        let dropped = dir.path().join("drop");
        let files = [
            "a.txt",
            "b.bin",
            "sub/c.txt",
            "sub/deeper/d.txt",
            "sub/deeper/deepest/e.txt",
        ];
        for rel in files {
            let path = dropped.join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, rel.as_bytes()).expect("write");
        }
        fs::create_dir_all(dropped.join("empty")).expect("empty dir");

        let jobs = collect(&WatchEvent::Directory(dropped.clone()));
        assert_eq!(jobs.len(), files.len());
        let distinct: HashSet<_> = jobs.iter().map(|job| job.local_path.clone()).collect();
        assert_eq!(distinct.len(), files.len(), "every job is a distinct path");
        for rel in files {
            assert!(distinct.contains(&dropped.join(rel)), "missing {rel}");
        }
    }

    #[test]
    fn closed_queue_stops_the_walk() {
        let dir = TempDir::new().expect("tempdir");
        for name in ["a", "b", "c"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }

        let mut seen = 0;
        let count = enumerate(&WatchEvent::Directory(dir.path().to_path_buf()), |_| {
            seen += 1;
            false
        });
        assert_eq!(count, 0);
        assert_eq!(seen, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_not_a_job() {
        let dir = TempDir::new().expect("tempdir");
        let outside = TempDir::new().expect("outside");
        fs::write(outside.path().join("inner.txt"), b"inner").expect("write");
        let dropped = dir.path().join("drop");
        fs::create_dir(&dropped).expect("mkdir");
        fs::write(dropped.join("real.txt"), b"real").expect("write");
        std::os::unix::fs::symlink(outside.path(), dropped.join("linked")).expect("dir link");
        std::os::unix::fs::symlink(dropped.join("real.txt"), dropped.join("alias.txt"))
            .expect("file link");

        let mut paths: Vec<_> = collect(&WatchEvent::Directory(dropped.clone()))
            .into_iter()
            .map(|job| job.local_path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec![dropped.join("alias.txt"), dropped.join("real.txt")]);
    }

    #[test]
    fn vanished_directory_yields_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let jobs = collect(&WatchEvent::Directory(dir.path().join("gone")));
        assert!(jobs.is_empty());
    }
}
