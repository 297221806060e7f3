//! Lazy traversal of the local tree.
//!
//! Yields one [`TransferTask`] per regular file, depth-first with children
//! in file-name order. Ignored folders are pruned before they are read, so
//! nothing below them is ever visited.

use crate::mirror::config::{MirrorOptions, SymlinkPolicy};
use crate::mirror::error::{MirrorError, MirrorResult};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A file to upload and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub local_path: PathBuf,
    pub remote_path: String,
}

/// Walk `options.local_root`. Nothing is read until the iterator is polled.
///
/// A root that is missing, not a directory or itself ignored produces an
/// empty sequence. Read failures surface as `WalkError` items.
pub fn walk(options: &MirrorOptions) -> impl Iterator<Item = MirrorResult<TransferTask>> {
    let root = options.local_root.clone();
    let remote_root = options.remote_root.clone();
    let ignore = options.ignore.clone();
    let symlinks = options.symlinks;

    let root_ignored = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| ignore.is_ignored_name(n)))
        .unwrap_or(false);
    let enabled = root.is_dir() && !root_ignored;
    if !enabled {
        log::warn!(
            "Local root {} is not a directory or is ignored; nothing to upload",
            root.display()
        );
    }

    let entries = enabled.then(|| {
        WalkDir::new(&root)
            .follow_links(symlinks == SymlinkPolicy::Follow)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                if e.depth() > 0 && ignore.is_ignored_name(e.file_name()) {
                    log::debug!("Ignoring {}", e.path().display());
                    return false;
                }
                true
            })
    });

    entries.into_iter().flatten().filter_map(move |item| {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                log::warn!("Skipping symlink loop: {}", e);
                return None;
            }
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                return Some(Err(MirrorError::walk(path, e.to_string())));
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }
        if file_type.is_symlink() {
            log::debug!("Skipping symbolic link {}", entry.path().display());
            return None;
        }
        if !file_type.is_file() {
            log::debug!("Skipping special file {}", entry.path().display());
            return None;
        }

        let relative = match entry.path().strip_prefix(&root) {
            Ok(rel) => rel,
            Err(e) => {
                return Some(Err(MirrorError::walk(
                    entry.path().display().to_string(),
                    e.to_string(),
                )))
            }
        };
        Some(Ok(TransferTask {
            remote_path: remote_join(&remote_root, relative),
            local_path: entry.into_path(),
        }))
    })
}

/// Join a local relative path onto the remote root with `/` separators.
/// A root of `""` or `"."` keeps the result relative to the login directory.
pub fn remote_join(remote_root: &str, relative: &Path) -> String {
    let rel = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    match remote_root.trim_end_matches('/') {
        "" if remote_root.starts_with('/') => format!("/{}", rel),
        "" | "." => rel,
        base => format!("{}/{}", base, rel),
    }
}

/// Parent directory of a remote path, if it has one worth ensuring.
pub fn remote_parent(remote_path: &str) -> Option<&str> {
    let (parent, _) = remote_path.rsplit_once('/')?;
    match parent {
        "" => Some("/"),
        "." => None,
        p => Some(p),
    }
}
