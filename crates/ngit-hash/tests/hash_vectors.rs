//! Known-answer vectors for object hashing.

use ngit_hash::{Hasher, Oid};

#[test]
fn empty_input_sha1() {
    let oid = Hasher::digest(b"").unwrap();
    assert_eq!(oid.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
}

#[test]
fn blob_hello_newline() {
    let oid = Hasher::hash_object("blob", b"hello\n").unwrap();
    assert_eq!(oid.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
}

#[test]
fn empty_blob() {
    let oid = Hasher::hash_object("blob", b"").unwrap();
    assert_eq!(oid.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
}

#[test]
fn blob_containing_the_word_tree() {
    // Content that names another object kind must not confuse the framing.
    let oid = Hasher::hash_object("blob", b"tree\n").unwrap();
    assert_eq!(oid.to_hex(), "cc62cf4c21a86cfbe7f6dd7c22cf7dbc78e98c24");
}

#[test]
fn incremental_matches_oneshot() {
    let mut h = Hasher::new();
    h.update(b"blob 6\0");
    h.update(b"hel");
    h.update(b"lo\n");
    let oid = h.finalize().unwrap();
    assert_eq!(oid, Oid::from_hex("ce013625030ba8dba906f756967f9e9ca394464a").unwrap());
}

#[test]
fn write_impl_feeds_hasher() {
    use std::io::Write;
    let mut h = Hasher::new();
    h.write_all(b"blob 0\0").unwrap();
    let oid = h.finalize().unwrap();
    assert_eq!(oid.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
}
