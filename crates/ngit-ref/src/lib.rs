//! Reference resolution: loose ref files and `packed-refs`.
//!
//! A loose ref file holds either a hex OID or a `ref: <target>` pointer.
//! Resolution always tries the loose file first and falls back to the
//! packed-refs file; a loose ref shadows a packed one.

mod packed;

pub use packed::{PackedRef, PackedRefs};

use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use ngit_hash::Oid;

/// Errors from reference operations.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("reference not found: {0}")]
    NotFound(String),

    #[error("malformed reference: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] ngit_hash::HashError),
}

/// A reference value read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Points directly at an object.
    Direct(Oid),
    /// Points at another ref by full name (e.g. `refs/heads/main`).
    Symbolic(String),
}

/// Read-only view over a repository's refs.
pub struct RefStore {
    git_dir: PathBuf,
}

impl RefStore {
    /// Create a store rooted at the git directory.
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of a loose ref file for a full ref name.
    pub fn loose_path(&self, name: &str) -> PathBuf {
        self.git_dir.join(name)
    }

    /// Read a single loose ref file, without packed fallback.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn read_loose(&self, name: &str) -> Result<Option<Reference>, RefError> {
        let path = self.loose_path(name);
        let contents = match std::fs::read(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RefError::Io(e)),
        };
        parse_ref_content(&contents).map(Some)
    }

    /// Resolve a full ref name (e.g. `refs/heads/main`) to an OID.
    ///
    /// Tries the loose file, then `packed-refs`. Symbolic refs are
    /// followed. Missing in both places is `RefError::NotFound`.
    pub fn resolve(&self, name: &str) -> Result<Oid, RefError> {
        self.resolve_inner(name, 0)
    }

    /// Load the packed-refs file; missing means empty.
    pub fn packed_refs(&self) -> Result<PackedRefs, RefError> {
        PackedRefs::load(&self.git_dir)
    }

    fn resolve_inner(&self, name: &str, depth: usize) -> Result<Oid, RefError> {
        // Symbolic chains terminate quickly in practice; a hard cap keeps
        // cyclic ref files from looping forever.
        if depth > 10 {
            return Err(RefError::Parse(format!("symbolic ref loop at {name}")));
        }

        match self.read_loose(name)? {
            Some(Reference::Direct(oid)) => Ok(oid),
            Some(Reference::Symbolic(target)) => self.resolve_inner(&target, depth + 1),
            None => {
                let packed = self.packed_refs()?;
                packed
                    .find(name)
                    .map(|r| r.oid)
                    .ok_or_else(|| RefError::NotFound(name.to_string()))
            }
        }
    }
}

/// Parse the content of a loose ref file.
pub fn parse_ref_content(contents: &[u8]) -> Result<Reference, RefError> {
    let trimmed = contents.trim();
    if let Some(target) = trimmed.strip_prefix(b"ref: ") {
        let target = std::str::from_utf8(target.trim())
            .map_err(|_| RefError::Parse("non-UTF-8 symbolic ref target".into()))?;
        return Ok(Reference::Symbolic(target.to_string()));
    }
    let hex = std::str::from_utf8(trimmed)
        .map_err(|_| RefError::Parse("non-UTF-8 ref content".into()))?;
    let oid = Oid::from_hex(hex).map_err(|_| RefError::Parse(format!("not an OID: {hex}")))?;
    Ok(Reference::Direct(oid))
}
