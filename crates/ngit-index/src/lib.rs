//! The staging index (`.git/index`), ignore rules, and content filters.
//!
//! The index codec reads DIRC versions 2 and 3. Entry order is the order
//! on disk; that order is authoritative for staging output.

pub mod cache_tree;
pub mod entry;
pub mod filter;
pub mod ignore;
mod read;

use std::path::Path;

use bstr::BStr;

pub use cache_tree::{CacheTree, CacheTreeNode};
pub use entry::{EntryFlags, EntryMode, IndexEntry, StatData};
pub use ignore::IgnoreMatcher;

/// Errors from index parsing.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid index header: {0}")]
    InvalidHeader(String),

    #[error("unsupported index version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid index entry at offset {offset}: {reason}")]
    InvalidEntry { offset: usize, reason: String },

    #[error("unsupported index entry '{path}': mode {mode:o}")]
    UnsupportedEntry { path: String, mode: u32 },

    #[error("invalid extension '{signature}': {reason}")]
    InvalidExtension { signature: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Merge stage of an entry (bits 12-13 of the flags word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Normal entry (stage 0).
    Normal,
    /// Common ancestor in a conflict (stage 1).
    Base,
    /// Our side of a conflict (stage 2).
    Ours,
    /// Their side of a conflict (stage 3).
    Theirs,
}

impl Stage {
    pub fn as_u8(&self) -> u8 {
        match self {
            Stage::Normal => 0,
            Stage::Base => 1,
            Stage::Ours => 2,
            Stage::Theirs => 3,
        }
    }

    pub fn from_bits(n: u8) -> Self {
        match n & 0x03 {
            0 => Stage::Normal,
            1 => Stage::Base,
            2 => Stage::Ours,
            _ => Stage::Theirs,
        }
    }
}

/// A parsed index.
pub struct Index {
    version: u32,
    entries: Vec<IndexEntry>,
    cache_tree: Option<CacheTree>,
}

impl Index {
    /// An empty index, as presented for a repository without one.
    pub fn empty() -> Self {
        Self {
            version: 2,
            entries: Vec::new(),
            cache_tree: None,
        }
    }

    /// Read and parse the index file at `path` (memory-mapped).
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let file = std::fs::File::open(path.as_ref())?;
        let data = unsafe { memmap2::Mmap::map(&file) }?;
        read::parse_index(&data)
    }

    /// Parse an index image from bytes.
    pub fn parse(data: &[u8]) -> Result<Self, IndexError> {
        read::parse_index(data)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in on-disk order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// First entry for a path, any stage.
    pub fn get(&self, path: &BStr) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.path[..] == path[..])
    }

    /// Index format version (2 or 3).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The `TREE` cache-tree extension, when present and parsed.
    pub fn cache_tree(&self) -> Option<&CacheTree> {
        self.cache_tree.as_ref()
    }

    pub(crate) fn new_parsed(
        version: u32,
        entries: Vec<IndexEntry>,
        cache_tree: Option<CacheTree>,
    ) -> Self {
        Self {
            version,
            entries,
            cache_tree,
        }
    }
}
