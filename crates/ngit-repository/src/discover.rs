use std::path::{Path, PathBuf};

use tracing::debug;

use crate::RepoError;

/// Walk up from `start` until a directory containing a `.git` directory
/// is found. Returns the absolute path of that `.git` directory.
///
/// Stops at the filesystem root.
pub fn find_repo(start: &Path) -> Result<PathBuf, RepoError> {
    let start = std::fs::canonicalize(start)
        .map_err(|_| RepoError::NotARepository(start.to_path_buf()))?;

    let mut current = start.clone();
    loop {
        let dot_git = current.join(".git");
        if dir_exists(&dot_git) {
            debug!(git_dir = %dot_git.display(), "repository discovered");
            return Ok(dot_git);
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return Err(RepoError::NotARepository(start)),
        }
    }
}

/// Existence probe that never raises.
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Existence-as-directory probe that never raises.
pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}
