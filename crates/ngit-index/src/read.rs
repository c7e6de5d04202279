//! Index file parsing (DIRC v2/v3).

use bstr::BString;
use ngit_hash::Oid;
use tracing::warn;

use crate::cache_tree::CacheTree;
use crate::entry::{EntryFlags, EntryMode, IndexEntry, StatData};
use crate::{Index, IndexError, Stage};

/// Magic bytes at the start of every index file.
const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";

/// Fixed bytes before the flags word: four timestamps words plus dev,
/// ino, mode, uid, gid, size (40 bytes), then the 20-byte OID.
const ENTRY_FIXED_LEN: usize = 62;

/// Name-length values at or above this mean "scan for NUL".
const NAME_LEN_MASK: usize = 0x0fff;

/// Trailing SHA-1 checksum of the index image (not verified here).
const CHECKSUM_LEN: usize = 20;

/// Parse an index image.
pub fn parse_index(data: &[u8]) -> Result<Index, IndexError> {
    if data.len() < 12 + CHECKSUM_LEN {
        return Err(IndexError::InvalidHeader("index file too short".into()));
    }

    if &data[0..4] != INDEX_SIGNATURE {
        return Err(IndexError::InvalidHeader(format!(
            "bad signature: expected DIRC, got {:?}",
            &data[0..4]
        )));
    }
    let version = read_u32(data, 4);
    if !(2..=3).contains(&version) {
        return Err(IndexError::UnsupportedVersion(version));
    }
    let entry_count = read_u32(data, 8) as usize;

    let content_end = data.len() - CHECKSUM_LEN;
    let mut cursor = 12;

    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let (entry, next) = parse_entry(data, cursor, version, content_end)?;
        entries.push(entry);
        cursor = next;
    }

    let cache_tree = parse_extensions(data, cursor, content_end)?;

    Ok(Index::new_parsed(version, entries, cache_tree))
}

/// On-disk entry size: fixed part, flags, name, then NUL padding so the
/// next entry starts at an 8-byte boundary relative to this entry.
fn ondisk_entry_size(name_len: usize, has_extended_flags: bool) -> usize {
    let flags_len = if has_extended_flags { 4 } else { 2 };
    (60 + flags_len + name_len + 8) & !7
}

fn parse_entry(
    data: &[u8],
    start: usize,
    version: u32,
    content_end: usize,
) -> Result<(IndexEntry, usize), IndexError> {
    if start + ENTRY_FIXED_LEN > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "entry extends past content".into(),
        });
    }

    let stat = StatData {
        ctime_secs: read_u32(data, start),
        ctime_nsecs: read_u32(data, start + 4),
        mtime_secs: read_u32(data, start + 8),
        mtime_nsecs: read_u32(data, start + 12),
        dev: read_u32(data, start + 16),
        ino: read_u32(data, start + 20),
        uid: read_u32(data, start + 28),
        gid: read_u32(data, start + 32),
        size: read_u32(data, start + 36),
    };
    let mode_raw = read_u32(data, start + 24);

    let oid =
        Oid::from_bytes(&data[start + 40..start + 60]).map_err(|_| IndexError::InvalidEntry {
            offset: start,
            reason: "invalid OID".into(),
        })?;

    let flags_raw = read_u16(data, start + 60);
    let assume_valid = flags_raw & 0x8000 != 0;
    let extended = flags_raw & 0x4000 != 0;
    let stage = Stage::from_bits(((flags_raw >> 12) & 0x03) as u8);
    let name_len_field = (flags_raw & 0x0fff) as usize;

    let mut cursor = start + ENTRY_FIXED_LEN;

    let mut intent_to_add = false;
    let mut skip_worktree = false;
    if extended {
        if version < 3 {
            return Err(IndexError::InvalidEntry {
                offset: start,
                reason: "extended flags in a v2 index".into(),
            });
        }
        if cursor + 2 > content_end {
            return Err(IndexError::InvalidEntry {
                offset: start,
                reason: "truncated extended flags".into(),
            });
        }
        let ext_flags = read_u16(data, cursor);
        skip_worktree = ext_flags & 0x4000 != 0;
        intent_to_add = ext_flags & 0x2000 != 0;
        cursor += 2;
    }

    // Name: either exactly `name_len_field` bytes, or NUL-terminated when
    // the length field is saturated.
    let name_len = if name_len_field < NAME_LEN_MASK {
        if cursor + name_len_field > content_end {
            return Err(IndexError::InvalidEntry {
                offset: start,
                reason: "name extends past content".into(),
            });
        }
        name_len_field
    } else {
        data[cursor..content_end]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| IndexError::InvalidEntry {
                offset: start,
                reason: "missing NUL after long name".into(),
            })?
    };
    let path = BString::from(&data[cursor..cursor + name_len]);

    let mode = EntryMode::from_raw(mode_raw, &path)?;

    let entry_size = ondisk_entry_size(name_len, extended);
    let next = start + entry_size;
    if next > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "entry padding extends past content".into(),
        });
    }

    let entry = IndexEntry {
        path,
        oid,
        mode,
        stage,
        stat,
        flags: EntryFlags {
            assume_valid,
            intent_to_add,
            skip_worktree,
        },
    };

    Ok((entry, next))
}

/// Walk extension records after the entries.
///
/// Each record is a 4-byte signature and a big-endian length. `TREE` is
/// parsed into a cache tree; anything else is skipped with a warning.
/// Parsing stops when only the trailing checksum remains.
fn parse_extensions(
    data: &[u8],
    mut cursor: usize,
    content_end: usize,
) -> Result<Option<CacheTree>, IndexError> {
    let mut cache_tree = None;

    while cursor + 8 <= content_end {
        let sig = &data[cursor..cursor + 4];
        let ext_len = read_u32(data, cursor + 4) as usize;
        cursor += 8;

        if cursor + ext_len > content_end {
            return Err(IndexError::InvalidExtension {
                signature: String::from_utf8_lossy(sig).into_owned(),
                reason: "extension data exceeds index bounds".into(),
            });
        }
        let ext_data = &data[cursor..cursor + ext_len];

        if sig == CacheTree::SIGNATURE {
            cache_tree = Some(CacheTree::parse(ext_data)?);
        } else {
            warn!(
                signature = %String::from_utf8_lossy(sig),
                len = ext_len,
                "skipping unknown index extension"
            );
        }

        cursor += ext_len;
    }

    Ok(cache_tree)
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([data[pos], data[pos + 1]])
}


#[cfg(test)]
mod tests {
    use super::test_support::build_index_bytes;
    use super::*;
    use crate::entry::EntryMode;
    use bstr::ByteSlice;

    #[test]
    fn parse_v2_entries_in_order() {
        let image = build_index_bytes(
            2,
            &[
                (b"a.txt", 0x11, 0o100644),
                (b"dir/b.txt", 0x22, 0o100755),
                (b"link", 0x33, 0o120000),
            ],
            &[],
        );
        let index = Index::parse(&image).unwrap();
        assert_eq!(index.version(), 2);
        assert_eq!(index.len(), 3);

        let entries: Vec<_> = index.iter().collect();
        assert_eq!(entries[0].path.as_bstr(), "a.txt");
        assert_eq!(entries[0].mode, EntryMode::Regular);
        assert_eq!(entries[0].oid.as_bytes(), &[0x11; 20]);
        assert_eq!(entries[1].path.as_bstr(), "dir/b.txt");
        assert_eq!(entries[1].mode, EntryMode::Executable);
        assert_eq!(entries[2].mode, EntryMode::Symlink);
    }

    #[test]
    fn entry_names_roundtrip() {
        let paths: Vec<&[u8]> = vec![b"a", b"ab", b"abc", b"abcd", b"abcde", b"abcdef/gh"];
        let entries: Vec<_> = paths.iter().map(|p| (*p, 0x01u8, 0o100644)).collect();
        let image = build_index_bytes(2, &entries, &[]);
        let index = Index::parse(&image).unwrap();
        let parsed: Vec<_> = index.iter().map(|e| e.path.clone()).collect();
        assert_eq!(parsed, paths);
    }

    #[test]
    fn gitlink_entries_are_supported() {
        let image = build_index_bytes(2, &[(b"vendor/lib", 0x44, 0o160000)], &[]);
        let index = Index::parse(&image).unwrap();
        assert!(index.iter().next().unwrap().mode.is_gitlink());
    }

    #[test]
    fn unsupported_mode_fails() {
        let image = build_index_bytes(2, &[(b"odd", 0x01, 0o100600)], &[]);
        assert!(matches!(
            Index::parse(&image),
            Err(IndexError::UnsupportedEntry { mode: 0o100600, .. })
        ));
    }

    #[test]
    fn bad_signature_fails() {
        let mut image = build_index_bytes(2, &[], &[]);
        image[0] = b'X';
        assert!(matches!(
            Index::parse(&image),
            Err(IndexError::InvalidHeader(_))
        ));
    }

    #[test]
    fn unsupported_version_fails() {
        for v in [1u32, 4] {
            let image = build_index_bytes(v, &[], &[]);
            assert!(matches!(
                Index::parse(&image),
                Err(IndexError::UnsupportedVersion(got)) if got == v
            ));
        }
    }

    #[test]
    fn unknown_extension_is_skipped() {
        let image = build_index_bytes(
            2,
            &[(b"a.txt", 0x11, 0o100644)],
            &[(b"REUC", b"opaque extension payload")],
        );
        let index = Index::parse(&image).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.cache_tree().is_none());
    }

    #[test]
    fn extension_overrunning_content_fails() {
        let mut image = build_index_bytes(2, &[], &[(b"ABCD", b"xy")]);
        // Inflate the declared extension length past the image end.
        let ext_len_pos = image.len() - 20 - 2 - 4;
        image[ext_len_pos..ext_len_pos + 4].copy_from_slice(&1000u32.to_be_bytes());
        assert!(matches!(
            Index::parse(&image),
            Err(IndexError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn truncated_image_fails() {
        assert!(Index::parse(b"DIRC").is_err());
        let image = build_index_bytes(2, &[(b"a.txt", 0x11, 0o100644)], &[]);
        assert!(Index::parse(&image[..40]).is_err());
    }

    #[test]
    fn long_name_is_nul_terminated() {
        // Names at or beyond 0xFFF saturate the length field; the parser
        // must fall back to NUL scanning.
        let long_name = vec![b'p'; 0x1000];
        let image = build_index_bytes(2, &[(long_name.as_slice(), 0x11, 0o100644)], &[]);
        let index = Index::parse(&image).unwrap();
        assert_eq!(index.iter().next().unwrap().path.as_slice(), &long_name[..]);
    }

    #[test]
    fn v3_extended_flags() {
        // Hand-assembled v3 entry with the extended bit and skip-worktree set.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DIRC");
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());

        let start = buf.len();
        for _ in 0..6 {
            buf.extend_from_slice(&0u32.to_be_bytes());
        }
        buf.extend_from_slice(&0o100644u32.to_be_bytes());
        for _ in 0..3 {
            buf.extend_from_slice(&0u32.to_be_bytes());
        }
        buf.extend_from_slice(&[0x77; 20]);
        let path = b"sparse.txt";
        let flags: u16 = 0x4000 | path.len() as u16; // extended bit
        buf.extend_from_slice(&flags.to_be_bytes());
        let ext_flags: u16 = 0x4000 | 0x2000; // skip-worktree + intent-to-add
        buf.extend_from_slice(&ext_flags.to_be_bytes());
        buf.extend_from_slice(path);
        let entry_size = (60 + 4 + path.len() + 8) & !7;
        while buf.len() - start < entry_size {
            buf.push(0);
        }

        let checksum = ngit_hash::Hasher::digest(&buf).unwrap();
        buf.extend_from_slice(checksum.as_bytes());

        let index = Index::parse(&buf).unwrap();
        let entry = index.iter().next().unwrap();
        assert_eq!(entry.path.as_bstr(), "sparse.txt");
        assert!(entry.flags.skip_worktree);
        assert!(entry.flags.intent_to_add);

        // The same entry in a v2 image must be rejected.
        let mut v2 = buf.clone();
        v2[4..8].copy_from_slice(&2u32.to_be_bytes());
        let body_len = v2.len() - 20;
        v2.truncate(body_len);
        let checksum = ngit_hash::Hasher::digest(&v2).unwrap();
        v2.extend_from_slice(checksum.as_bytes());
        assert!(matches!(
            Index::parse(&v2),
            Err(IndexError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn lookup_by_path() {
        let image = build_index_bytes(2, &[(b"src/main.rs", 0x11, 0o100644)], &[]);
        let index = Index::parse(&image).unwrap();
        assert!(index.get(bstr::BStr::new("src/main.rs")).is_some());
        assert!(index.get(bstr::BStr::new("src/other.rs")).is_none());
    }
}
