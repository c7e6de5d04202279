use bstr::BString;
use ngit_hash::Oid;

use crate::{IndexError, Stage};

/// Entry mode: a type nibble plus permission bits.
///
/// Only the combinations git actually writes are accepted; anything else
/// fails the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file, permissions 0644.
    Regular,
    /// Regular file, permissions 0755.
    Executable,
    /// Symbolic link (type nibble 1010).
    Symlink,
    /// Gitlink / submodule (type nibble 1110).
    Gitlink,
}

impl EntryMode {
    /// Decode the 32-bit on-disk mode field.
    pub fn from_raw(raw: u32, path: &BString) -> Result<Self, IndexError> {
        let unsupported = || IndexError::UnsupportedEntry {
            path: String::from_utf8_lossy(path).into_owned(),
            mode: raw,
        };
        match raw >> 12 {
            0b1000 => match raw & 0o777 {
                0o644 => Ok(Self::Regular),
                0o755 => Ok(Self::Executable),
                _ => Err(unsupported()),
            },
            0b1010 => Ok(Self::Symlink),
            0b1110 => Ok(Self::Gitlink),
            _ => Err(unsupported()),
        }
    }

    /// The raw on-disk mode value.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Gitlink => 0o160000,
        }
    }

    pub fn is_regular_file(&self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }

    pub fn is_gitlink(&self) -> bool {
        matches!(self, Self::Gitlink)
    }
}

/// Filesystem stat data cached per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatData {
    pub ctime_secs: u32,
    pub ctime_nsecs: u32,
    pub mtime_secs: u32,
    pub mtime_nsecs: u32,
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    /// File size truncated to 32 bits.
    pub size: u32,
}

/// Per-entry flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    /// Assume-valid bit (0x8000).
    pub assume_valid: bool,
    /// Intent-to-add (v3 extended flags).
    pub intent_to_add: bool,
    /// Skip-worktree (v3 extended flags).
    pub skip_worktree: bool,
}

/// One index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path relative to the worktree root, raw bytes.
    pub path: BString,
    pub oid: Oid,
    pub mode: EntryMode,
    pub stage: Stage,
    pub stat: StatData,
    pub flags: EntryFlags,
}
