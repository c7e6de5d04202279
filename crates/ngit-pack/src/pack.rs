//! Reading `.pack` files.
//!
//! A pack holds `PACK`, a version, an object count, then entries:
//! a variable-length header followed by a zlib stream of the payload.

use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ngit_hash::Oid;
use ngit_loose::zlib;
use ngit_object::ObjectKind;

use crate::entry::parse_entry_header;
use crate::index::PackIndex;
use crate::{PackError, PACK_HEADER_SIZE, PACK_SIGNATURE, PACK_VERSION};

/// A fully decoded object read from a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedObject {
    pub kind: ObjectKind,
    /// Size declared by the entry header; always equals `data.len()`.
    pub size: usize,
    pub data: Vec<u8>,
}

/// A memory-mapped pack file with its companion index.
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
}

impl PackFile {
    /// Open a pack file and its `.idx` companion.
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::InvalidHeader("file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let index = PackIndex::open(&idx_path)?;
        if index.num_objects() != num_objects {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
        })
    }

    /// Read an object by OID.
    ///
    /// Returns `Ok(None)` when the OID is not in this pack.
    pub fn read(&self, oid: &Oid) -> Result<Option<PackedObject>, PackError> {
        match self.index.lookup(oid)? {
            Some(loc) => self.read_at_offset(loc.offset).map(Some),
            None => Ok(None),
        }
    }

    /// Decode the entry at a known pack offset.
    ///
    /// The zlib stream is handed the rest of the mapped pack; inflate
    /// consumes exactly the compressed span it needs. The declared size
    /// is verified against the inflated length.
    pub fn read_at_offset(&self, offset: u64) -> Result<PackedObject, PackError> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "offset beyond pack".into(),
            });
        }

        let header = parse_entry_header(&self.data[start..], offset)?;
        let compressed = &self.data[start + header.header_len..];
        let data = zlib::inflate(compressed).map_err(|_| PackError::CorruptEntry {
            offset,
            reason: "zlib stream failed".into(),
        })?;

        if data.len() != header.size {
            return Err(PackError::CorruptEntry {
                offset,
                reason: format!(
                    "inflated {} bytes but header declared {}",
                    data.len(),
                    header.size
                ),
            });
        }

        Ok(PackedObject {
            kind: header.kind,
            size: header.size,
            data,
        })
    }

    /// Does this pack contain the OID?
    pub fn contains(&self, oid: &Oid) -> bool {
        matches!(self.index.lookup(oid), Ok(Some(_)))
    }

    /// Number of objects in this pack.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// The companion index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Path to the `.pack` file.
    pub fn path(&self) -> &Path {
        &self.pack_path
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::build_test_pack;
    use super::*;
    use crate::entry::encode_entry_header;
    use crate::index::test_support::build_index_bytes;
    use ngit_hash::Hasher;
    use std::io::Write;

    #[test]
    fn read_single_blob() {
        let dir = tempfile::tempdir().unwrap();
        let payload = b"Hello, packfile world!";
        let (pack_path, oids) = build_test_pack(dir.path(), &[(ObjectKind::Blob, payload)]);

        let pack = PackFile::open(&pack_path).unwrap();
        assert_eq!(pack.num_objects(), 1);

        let obj = pack.read(&oids[0]).unwrap().unwrap();
        assert_eq!(obj.kind, ObjectKind::Blob);
        assert_eq!(obj.size, payload.len());
        assert_eq!(obj.data, payload);
    }

    #[test]
    fn read_multiple_kinds_and_recompute_oids() {
        let dir = tempfile::tempdir().unwrap();
        let commit_payload: &[u8] = b"tree 0000000000000000000000000000000000000000\nauthor T <t@t> 0 +0000\ncommitter T <t@t> 0 +0000\n\ntest commit\n";
        let objects: Vec<(ObjectKind, &[u8])> = vec![
            (ObjectKind::Blob, b"blob content".as_slice()),
            (ObjectKind::Blob, b"another blob".as_slice()),
            (ObjectKind::Commit, commit_payload),
        ];
        let (pack_path, oids) = build_test_pack(dir.path(), &objects);

        let pack = PackFile::open(&pack_path).unwrap();
        assert_eq!(pack.num_objects(), 3);

        for (i, (kind, payload)) in objects.iter().enumerate() {
            let obj = pack.read(&oids[i]).unwrap().unwrap();
            assert_eq!(obj.kind, *kind);
            assert_eq!(obj.data, *payload);
            // The recomputed framing hash must equal the index OID.
            let recomputed = Hasher::hash_object(obj.kind.as_str(), &obj.data).unwrap();
            assert_eq!(recomputed, oids[i]);
        }
    }

    #[test]
    fn missing_oid_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let (pack_path, _) = build_test_pack(dir.path(), &[(ObjectKind::Blob, b"x")]);
        let pack = PackFile::open(&pack_path).unwrap();
        let missing = Oid::from_hex("0000000000000000000000000000000000000001").unwrap();
        assert!(!pack.contains(&missing));
        assert!(pack.read(&missing).unwrap().is_none());
    }

    #[test]
    fn size_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let pack_path = dir.path().join("pack-bad.pack");
        let idx_path = dir.path().join("pack-bad.idx");

        let payload = b"true payload";
        let mut pack_data = Vec::new();
        pack_data.extend_from_slice(PACK_SIGNATURE);
        pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&1u32.to_be_bytes());
        let offset = pack_data.len() as u32;
        // Declare a size one byte short of reality.
        pack_data.extend_from_slice(&encode_entry_header(3, payload.len() as u64 - 1));
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(payload).unwrap();
        pack_data.extend_from_slice(&encoder.finish().unwrap());
        let checksum = Hasher::digest(&pack_data).unwrap();
        pack_data.extend_from_slice(checksum.as_bytes());
        std::fs::write(&pack_path, &pack_data).unwrap();

        let oid = Hasher::hash_object("blob", payload).unwrap();
        let mut checksum_bytes = [0u8; 20];
        checksum_bytes.copy_from_slice(checksum.as_bytes());
        std::fs::write(&idx_path, build_index_bytes(&[(oid, offset, 0)], &checksum_bytes)).unwrap();

        let pack = PackFile::open(&pack_path).unwrap();
        assert!(matches!(
            pack.read(&oid),
            Err(PackError::CorruptEntry { .. })
        ));
    }

    #[test]
    fn delta_entry_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let pack_path = dir.path().join("pack-delta.pack");
        let idx_path = dir.path().join("pack-delta.idx");

        let mut pack_data = Vec::new();
        pack_data.extend_from_slice(PACK_SIGNATURE);
        pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&1u32.to_be_bytes());
        let offset = pack_data.len() as u32;
        // An OFS_DELTA entry header (kind code 6).
        pack_data.extend_from_slice(&encode_entry_header(6, 4));
        pack_data.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        let checksum = Hasher::digest(&pack_data).unwrap();
        pack_data.extend_from_slice(checksum.as_bytes());
        std::fs::write(&pack_path, &pack_data).unwrap();

        let oid = Oid::from_hex("1234567812345678123456781234567812345678").unwrap();
        let mut checksum_bytes = [0u8; 20];
        checksum_bytes.copy_from_slice(checksum.as_bytes());
        std::fs::write(&idx_path, build_index_bytes(&[(oid, offset, 0)], &checksum_bytes)).unwrap();

        let pack = PackFile::open(&pack_path).unwrap();
        assert!(matches!(
            pack.read(&oid),
            Err(PackError::DeltaUnsupported { code: 6, .. })
        ));
    }

    #[test]
    fn bad_pack_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (pack_path, _) = build_test_pack(dir.path(), &[(ObjectKind::Blob, b"x")]);
        let mut data = std::fs::read(&pack_path).unwrap();
        data[0] = b'K';
        std::fs::write(&pack_path, &data).unwrap();
        assert!(matches!(
            PackFile::open(&pack_path),
            Err(PackError::InvalidHeader(_))
        ));
    }

    #[test]
    fn object_count_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (pack_path, _) = build_test_pack(dir.path(), &[(ObjectKind::Blob, b"x")]);
        let mut data = std::fs::read(&pack_path).unwrap();
        data[8..12].copy_from_slice(&9u32.to_be_bytes());
        std::fs::write(&pack_path, &data).unwrap();
        assert!(matches!(
            PackFile::open(&pack_path),
            Err(PackError::InvalidHeader(_))
        ));
    }
}
