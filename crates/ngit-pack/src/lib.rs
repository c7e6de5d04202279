//! Pack storage reading: the `.idx` fan-out index and `.pack` entries.
//!
//! Only non-delta entries are decoded. Offset-delta and ref-delta entries
//! (kind codes 6 and 7) fail cleanly, as do indices that need the 64-bit
//! offset table (packs over 2 GiB).

pub mod entry;
pub mod index;
pub mod pack;

pub use entry::{parse_entry_header, PackEntryHeader};
pub use index::{PackIndex, PackLocation};
pub use pack::{PackFile, PackedObject};

use ngit_object::ObjectKind;

/// Errors that can occur during pack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("delta entries are not supported (kind code {code}) at offset {offset}")]
    DeltaUnsupported { code: u8, offset: u64 },

    #[error("reserved pack entry kind 5 at offset {0}")]
    ReservedEntryKind(u64),

    #[error("pack offsets over 2 GiB are not supported")]
    LargePackUnsupported,

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] ngit_hash::HashError),
}

/// Map a pack entry kind code (1..4) to an object kind.
pub fn object_kind_from_code(code: u8) -> Option<ObjectKind> {
    match code {
        1 => Some(ObjectKind::Commit),
        2 => Some(ObjectKind::Tree),
        3 => Some(ObjectKind::Blob),
        4 => Some(ObjectKind::Tag),
        _ => None,
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION: u32 = 2;
