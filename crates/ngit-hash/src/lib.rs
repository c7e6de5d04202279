//! Object identifiers and SHA-1 content addressing.
//!
//! Every object in the store is addressed by the SHA-1 of its canonical
//! framing `"<kind> <len>\0<payload>"`. This crate provides the [`Oid`]
//! type, hex encoding/decoding, and the streaming [`Hasher`].

pub mod hasher;
mod hex;
mod oid;

pub use hasher::Hasher;
pub use hex::{hex_decode, hex_encode};
pub use oid::Oid;

/// Errors produced by hashing and OID handling.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid hex character {byte:#04x} at position {position}")]
    InvalidHex { byte: u8, position: usize },

    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    #[error("SHA-1 collision attack detected")]
    Sha1Collision,
}

/// Check whether `s` is a well-formed object id: exactly 40 lowercase
/// hexadecimal characters.
pub fn is_hash(s: &str) -> bool {
    s.len() == 40
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
