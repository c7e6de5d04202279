//! Loose object storage: read and write zlib-compressed objects.
//!
//! Each loose object lives at `objects/XX/YYYY...` where `XX` is the
//! first OID byte in hex and `YYYY...` is the rest. The file content is
//! zlib-compressed `"<kind> <len>\0<payload>"`.

mod read;
mod write;
pub mod zlib;

use std::path::{Path, PathBuf};

use ngit_hash::Oid;

/// Interface to the loose half of an object directory.
pub struct LooseStore {
    /// Path to the objects directory.
    objects_dir: PathBuf,
    /// Zlib compression level for writes.
    compression_level: flate2::Compression,
}

impl LooseStore {
    /// Open the loose store at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            compression_level: flate2::Compression::default(),
        }
    }

    /// Set the zlib compression level (0-9).
    pub fn set_compression_level(&mut self, level: u32) {
        self.compression_level = flate2::Compression::new(level);
    }

    /// File path for a given OID.
    pub fn object_path(&self, oid: &Oid) -> PathBuf {
        self.objects_dir.join(oid.loose_path())
    }

    /// Path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

/// Errors from loose object operations.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("corrupt loose object {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error("decompression error for {oid}: {source}")]
    Decompress {
        oid: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object parse error: {0}")]
    Object(#[from] ngit_object::ObjectError),

    #[error("hash error: {0}")]
    Hash(#[from] ngit_hash::HashError),
}
