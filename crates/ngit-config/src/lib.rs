//! Configuration for ngit.
//!
//! Two scopes are read: the user-scope file (`~/.gitconfig`, located via
//! `HOME`, or `USERPROFILE` on Windows) underlays the repository-scope
//! file (`<git-dir>/config`). Missing files read as empty. Keys flatten
//! to `"section.key"`.

mod file;
pub mod types;

pub use file::ConfigFile;
pub use types::{parse_bool, AutoCrlf};

use std::path::{Path, PathBuf};

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config syntax error at line {line}: {reason}")]
    Syntax { line: usize, reason: &'static str },

    #[error("forbidden config key: {0}")]
    ForbiddenKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Merged configuration view: user scope underlaying repo scope.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Files in precedence order, low to high.
    files: Vec<ConfigFile>,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the user-scope and repo-scope files for a repository.
    pub fn load(git_dir: &Path) -> Result<Self, ConfigError> {
        let mut files = Vec::new();
        if let Some(user_path) = user_config_path() {
            files.push(ConfigFile::load(&user_path)?);
        }
        files.push(ConfigFile::load(&git_dir.join("config"))?);
        Ok(Self { files })
    }

    /// Build from already-parsed files, lowest precedence first.
    pub fn from_files(files: Vec<ConfigFile>) -> Self {
        Self { files }
    }

    /// Highest-precedence value for a flattened key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.files.iter().rev().find_map(|f| f.get(key))
    }

    /// Boolean value for a key; `None` when unset or unparseable.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_bool)
    }

    /// `core.autocrlf`: governs line-ending normalization on hash/write.
    pub fn autocrlf(&self) -> AutoCrlf {
        match self.get("core.autocrlf") {
            Some("input") => AutoCrlf::Input,
            Some(v) if parse_bool(v) == Some(true) => AutoCrlf::True,
            _ => AutoCrlf::False,
        }
    }

    /// `core.ignorecase`: passed through to the ignore matcher.
    pub fn ignore_case(&self) -> bool {
        self.get_bool("core.ignorecase").unwrap_or(false)
    }
}

/// Locate the user-scope config file from the environment.
fn user_config_path() -> Option<PathBuf> {
    let home = if cfg!(windows) {
        std::env::var_os("USERPROFILE")
    } else {
        std::env::var_os("HOME")
    }?;
    Some(PathBuf::from(home).join(".gitconfig"))
}
