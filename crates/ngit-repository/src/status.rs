//! Working-directory status: index vs. committed tree, plus the worktree
//! scan for unstaged and untracked changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice, ByteVec};
use ngit_hash::Oid;
use ngit_index::entry::EntryMode;
use ngit_index::Index;
use ngit_object::{FileMode, ObjectKind};

use crate::{RepoError, Repository};

/// Which bucket a record falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// In the index, differing from the committed tree.
    Staged,
    /// In the index, differing from the working tree.
    Modified,
    /// In the working tree only.
    Untracked,
}

/// How a staged entry differs from the committed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingStatus {
    Added,
    Modified,
    Deleted,
}

/// One status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub path: BString,
    pub oid: Oid,
    pub status: Status,
    /// Set if and only if `status` is `Staged`.
    pub staging: Option<StagingStatus>,
}

/// Flatten a tree recursively into `(path, oid, mode)` rows, joining
/// subtree names with `/`.
pub fn flatten_tree(
    repo: &Repository,
    tree_oid: &Oid,
    prefix: &BStr,
    out: &mut Vec<(BString, Oid, FileMode)>,
) -> Result<(), RepoError> {
    let tree = repo.tree(tree_oid)?;
    for entry in tree.iter() {
        let mut path = BString::from(prefix);
        if !path.is_empty() {
            path.push_byte(b'/');
        }
        path.push_str(&entry.name);

        if entry.mode.is_tree() {
            flatten_tree(repo, &entry.oid, path.as_bstr(), out)?;
        } else {
            out.push((path, entry.oid, entry.mode));
        }
    }
    Ok(())
}

/// Compare the index against a committed root tree.
///
/// Index entries missing from the tree are `staged/added`; entries whose
/// OID differs are `staged/modified`; tree rows with no index entry are
/// `staged/deleted`. Index order is authoritative for the first two.
pub fn index_vs_tree(
    repo: &Repository,
    index: &Index,
    root_tree: Option<&Oid>,
) -> Result<Vec<StatusRecord>, RepoError> {
    let mut tree_rows = Vec::new();
    if let Some(root_tree) = root_tree {
        flatten_tree(repo, root_tree, BStr::new(""), &mut tree_rows)?;
    }
    let by_path: BTreeMap<&BStr, &(BString, Oid, FileMode)> = tree_rows
        .iter()
        .map(|row| (row.0.as_bstr(), row))
        .collect();

    let mut records = Vec::new();
    for entry in index.iter() {
        match by_path.get(entry.path.as_bstr()) {
            None => records.push(StatusRecord {
                path: entry.path.clone(),
                oid: entry.oid,
                status: Status::Staged,
                staging: Some(StagingStatus::Added),
            }),
            Some((_, tree_oid, _)) if *tree_oid != entry.oid => records.push(StatusRecord {
                path: entry.path.clone(),
                oid: entry.oid,
                status: Status::Staged,
                staging: Some(StagingStatus::Modified),
            }),
            Some(_) => {}
        }
    }

    for (path, oid, _) in &tree_rows {
        if index.get(path.as_bstr()).is_none() {
            records.push(StatusRecord {
                path: path.clone(),
                oid: *oid,
                status: Status::Staged,
                staging: Some(StagingStatus::Deleted),
            });
        }
    }

    Ok(records)
}

/// Full working-directory status.
///
/// Extends [`index_vs_tree`] with a worktree scan: index entries whose
/// on-disk content re-hashes differently (or is gone) are `modified`;
/// non-ignored files outside the index are `untracked`.
pub fn working_dir_status(
    repo: &mut Repository,
    index: &Index,
    root_tree: Option<&Oid>,
) -> Result<Vec<StatusRecord>, RepoError> {
    let mut records = index_vs_tree(repo, index, root_tree)?;

    let work_tree = match repo.work_tree().map(Path::to_path_buf) {
        Some(wt) => wt,
        None => return Ok(records),
    };

    let mut worktree_files = Vec::new();
    collect_worktree_files(repo, &work_tree, &BString::from(""), &mut worktree_files)?;

    for entry in index.iter() {
        if entry.mode.is_gitlink() {
            continue;
        }
        let abs = join_worktree(&work_tree, entry.path.as_bstr());
        let content = match read_entry_content(&abs, entry.mode) {
            Some(content) => content,
            None => {
                records.push(StatusRecord {
                    path: entry.path.clone(),
                    oid: entry.oid,
                    status: Status::Modified,
                    staging: None,
                });
                continue;
            }
        };
        let filename = entry.path.to_str_lossy().into_owned();
        let oid = repo.hash_object(ObjectKind::Blob, &content, Some(&filename), true)?;
        if oid != entry.oid {
            records.push(StatusRecord {
                path: entry.path.clone(),
                oid: entry.oid,
                status: Status::Modified,
                staging: None,
            });
        }
    }

    for path in worktree_files {
        if index.get(path.as_bstr()).is_none() {
            records.push(StatusRecord {
                path,
                oid: Oid::NULL,
                status: Status::Untracked,
                staging: None,
            });
        }
    }

    Ok(records)
}

/// Recursively collect non-ignored regular files and symlinks, skipping
/// `.git` and ignored directories entirely.
fn collect_worktree_files(
    repo: &mut Repository,
    dir: &Path,
    rel: &BString,
    out: &mut Vec<BString>,
) -> Result<(), RepoError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RepoError::Io(e)),
    };

    let mut names: Vec<(BString, PathBuf, bool)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = os_bytes(&entry.file_name());
        if name.as_slice() == b".git" {
            continue;
        }
        let mut child_rel = rel.clone();
        if !child_rel.is_empty() {
            child_rel.push_byte(b'/');
        }
        child_rel.push_str(&name);
        names.push((child_rel, entry.path(), file_type.is_dir()));
    }
    names.sort_by(|a, b| a.0.cmp(&b.0));

    for (child_rel, path, is_dir) in names {
        if repo.is_ignored(child_rel.as_bstr(), is_dir)? {
            continue;
        }
        if is_dir {
            collect_worktree_files(repo, &path, &child_rel, out)?;
        } else {
            out.push(child_rel);
        }
    }
    Ok(())
}

/// Read the content that would be hashed for an index entry: file bytes
/// for regular files, the link target for symlinks.
fn read_entry_content(path: &Path, mode: EntryMode) -> Option<Vec<u8>> {
    match mode {
        EntryMode::Symlink => {
            let target = std::fs::read_link(path).ok()?;
            Some(Vec::from(os_bytes(target.as_os_str())))
        }
        _ => std::fs::read(path).ok(),
    }
}

fn join_worktree(work_tree: &Path, rel: &BStr) -> PathBuf {
    let mut path = work_tree.to_path_buf();
    for component in rel.split(|&b| b == b'/') {
        path.push(String::from_utf8_lossy(component).into_owned());
    }
    path
}

#[cfg(unix)]
fn os_bytes(name: &std::ffi::OsStr) -> BString {
    use std::os::unix::ffi::OsStrExt;
    BString::from(name.as_bytes())
}

#[cfg(not(unix))]
fn os_bytes(name: &std::ffi::OsStr) -> BString {
    BString::from(name.to_string_lossy().as_bytes())
}
