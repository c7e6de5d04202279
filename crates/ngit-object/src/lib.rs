//! Object model: blob, tree, commit, and tag parsing and serialization.
//!
//! Objects travel as `"<kind> <len>\0<payload>"`; the OID is the SHA-1 of
//! that framing. Payload parsers work on raw bytes throughout: tree entry
//! names and blob contents are byte strings, not text.

mod blob;
mod commit;
pub mod header;
mod tag;
mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use tag::Tag;
pub use tree::{FileMode, Tree, TreeEntry};

use bstr::BString;
use ngit_hash::{HashError, Hasher, Oid};

/// Errors produced by object operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object kind: {0}")]
    InvalidKind(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("truncated object: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("payload length {actual} does not match header length {declared}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: usize, reason: String },

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("invalid tag: missing '{field}' header")]
    MissingTagField { field: &'static str },

    #[error("invalid file mode: {0}")]
    InvalidFileMode(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The four object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    /// Parse from the kind token in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidKind(BString::from(s))),
        }
    }

    /// The canonical byte representation.
    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// The canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// A parsed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    /// Parse from framed bytes (header + payload), verifying the declared
    /// length against the actual payload length.
    pub fn parse(data: &[u8]) -> Result<Self, ObjectError> {
        let (kind, payload_len, header_len) = header::parse_header(data)?;
        let payload = &data[header_len..];
        if payload.len() != payload_len {
            return Err(ObjectError::LengthMismatch {
                declared: payload_len,
                actual: payload.len(),
            });
        }
        Self::parse_payload(kind, payload)
    }

    /// Parse from payload bytes with a known kind (no header).
    pub fn parse_payload(kind: ObjectKind, payload: &[u8]) -> Result<Self, ObjectError> {
        match kind {
            ObjectKind::Blob => Ok(Self::Blob(Blob::parse(payload))),
            ObjectKind::Tree => Ok(Self::Tree(Tree::parse(payload)?)),
            ObjectKind::Commit => Ok(Self::Commit(Commit::parse(payload)?)),
            ObjectKind::Tag => Ok(Self::Tag(Tag::parse(payload)?)),
        }
    }

    /// Serialize to the canonical framing (header + payload).
    pub fn serialize(&self) -> Vec<u8> {
        let payload = self.serialize_payload();
        let hdr = header::write_header(self.kind(), payload.len());
        let mut out = Vec::with_capacity(hdr.len() + payload.len());
        out.extend_from_slice(&hdr);
        out.extend_from_slice(&payload);
        out
    }

    /// Serialize just the payload (no header).
    pub fn serialize_payload(&self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b.data.to_vec(),
            Self::Tree(t) => t.serialize_payload(),
            Self::Commit(c) => c.serialize_payload(),
            Self::Tag(t) => t.serialize_payload(),
        }
    }

    /// Get the object kind.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Compute the OID by hashing the canonical framing.
    pub fn compute_oid(&self) -> Result<Oid, HashError> {
        Hasher::hash_object(self.kind().as_str(), &self.serialize_payload())
    }

    /// Payload size in bytes (excluding the header).
    pub fn payload_size(&self) -> usize {
        match self {
            Self::Blob(b) => b.data.len(),
            other => other.serialize_payload().len(),
        }
    }
}
