//! Unified object database.
//!
//! A single read interface over the two storage forms: the sharded loose
//! directory and pack files. Loose storage wins when an object exists in
//! both; the payload bytes are identical either way, by content
//! addressing. Writes always go to loose storage.

use std::path::{Path, PathBuf};

use ngit_hash::Oid;
use ngit_loose::LooseStore;
use ngit_object::{Object, ObjectKind};
use ngit_pack::PackFile;
use tracing::debug;

/// Errors from object database operations.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found: {0}")]
    NotFound(Oid),

    #[error(transparent)]
    Loose(#[from] ngit_loose::LooseError),

    #[error(transparent)]
    Pack(#[from] ngit_pack::PackError),

    #[error(transparent)]
    Object(#[from] ngit_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Kind and size of an object, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub kind: ObjectKind,
    pub size: usize,
}

/// An object's kind and payload as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub payload: Vec<u8>,
}

/// Unified object database over loose and packed storage.
pub struct ObjectDatabase {
    loose: LooseStore,
    packs: Vec<PackFile>,
    objects_dir: PathBuf,
}

impl ObjectDatabase {
    /// Open the object database at the given objects directory.
    ///
    /// All pack files under `objects/pack` are indexed up front; an
    /// unreadable pack is skipped so the loose path can still serve.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let loose = LooseStore::open(&objects_dir);
        let packs = discover_packs(&objects_dir)?;
        Ok(Self {
            loose,
            packs,
            objects_dir,
        })
    }

    /// Read an object's raw payload by OID, loose storage first.
    pub fn read_raw(&self, oid: &Oid) -> Result<RawObject, OdbError> {
        if let Some(framed) = self.loose.read_framed(oid)? {
            let (kind, payload_len, header_len) = ngit_object::header::parse_header(&framed)?;
            let payload = framed[header_len..].to_vec();
            if payload.len() != payload_len {
                return Err(ngit_object::ObjectError::LengthMismatch {
                    declared: payload_len,
                    actual: payload.len(),
                }
                .into());
            }
            return Ok(RawObject { kind, payload });
        }

        for pack in &self.packs {
            if let Some(packed) = pack.read(oid)? {
                return Ok(RawObject {
                    kind: packed.kind,
                    payload: packed.data,
                });
            }
        }

        Err(OdbError::NotFound(*oid))
    }

    /// Read and parse an object by OID.
    pub fn read(&self, oid: &Oid) -> Result<Object, OdbError> {
        let raw = self.read_raw(oid)?;
        Ok(Object::parse_payload(raw.kind, &raw.payload)?)
    }

    /// Read kind and size without materializing the payload when the
    /// object is loose.
    pub fn read_info(&self, oid: &Oid) -> Result<ObjectInfo, OdbError> {
        if let Some((kind, size)) = self.loose.read_header(oid)? {
            return Ok(ObjectInfo { kind, size });
        }
        for pack in &self.packs {
            if let Some(packed) = pack.read(oid)? {
                return Ok(ObjectInfo {
                    kind: packed.kind,
                    size: packed.size,
                });
            }
        }
        Err(OdbError::NotFound(*oid))
    }

    /// Does any storage form hold this OID?
    pub fn contains(&self, oid: &Oid) -> bool {
        self.loose.contains(oid) || self.packs.iter().any(|p| p.contains(oid))
    }

    /// Write payload bytes as a new loose object. Returns the OID.
    pub fn write_raw(&self, kind: ObjectKind, payload: &[u8]) -> Result<Oid, OdbError> {
        Ok(self.loose.write_raw(kind, payload)?)
    }

    /// The loose half of the store.
    pub fn loose(&self) -> &LooseStore {
        &self.loose
    }

    /// Indexed pack files.
    pub fn packs(&self) -> &[PackFile] {
        &self.packs
    }

    /// Path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

/// Index every `.pack` under `objects/pack`.
fn discover_packs(objects_dir: &Path) -> Result<Vec<PackFile>, OdbError> {
    let pack_dir = objects_dir.join("pack");
    if !pack_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut packs = Vec::new();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&pack_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "pack"))
        .collect();
    paths.sort();

    for path in paths {
        match PackFile::open(&path) {
            Ok(pack) => {
                debug!(path = %path.display(), objects = pack.num_objects(), "indexed pack");
                packs.push(pack);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable pack");
            }
        }
    }
    Ok(packs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngit_hash::Hasher;
    use std::io::Write;

    /// Minimal pack+idx builder for odb-level tests.
    fn write_pack(objects_dir: &Path, objects: &[(ObjectKind, &[u8])]) -> Vec<Oid> {
        let pack_dir = objects_dir.join("pack");
        std::fs::create_dir_all(&pack_dir).unwrap();

        let mut pack_data = Vec::new();
        pack_data.extend_from_slice(ngit_pack::PACK_SIGNATURE);
        pack_data.extend_from_slice(&ngit_pack::PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&(objects.len() as u32).to_be_bytes());

        let mut entries: Vec<(Oid, u32, u32)> = Vec::new();
        for (kind, payload) in objects {
            let offset = pack_data.len() as u32;
            let code = match kind {
                ObjectKind::Commit => 1,
                ObjectKind::Tree => 2,
                ObjectKind::Blob => 3,
                ObjectKind::Tag => 4,
            };
            let header = ngit_pack::entry::encode_entry_header(code, payload.len() as u64);
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(payload).unwrap();
            let compressed = encoder.finish().unwrap();

            let mut crc = crc32fast::Hasher::new();
            crc.update(&header);
            crc.update(&compressed);

            pack_data.extend_from_slice(&header);
            pack_data.extend_from_slice(&compressed);
            entries.push((
                Hasher::hash_object(kind.as_str(), payload).unwrap(),
                offset,
                crc.finalize(),
            ));
        }
        let checksum = Hasher::digest(&pack_data).unwrap();
        pack_data.extend_from_slice(checksum.as_bytes());

        let pack_name = format!("pack-{}", checksum.to_hex());
        std::fs::write(pack_dir.join(format!("{pack_name}.pack")), &pack_data).unwrap();

        // Index: fanout + sorted OIDs + CRCs + offsets + trailer.
        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut idx = Vec::new();
        idx.extend_from_slice(&ngit_pack::IDX_SIGNATURE);
        idx.extend_from_slice(&ngit_pack::IDX_VERSION.to_be_bytes());
        let mut fanout = [0u32; 256];
        for (oid, _, _) in &sorted {
            fanout[oid.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            fanout[i] += fanout[i - 1];
        }
        for count in fanout {
            idx.extend_from_slice(&count.to_be_bytes());
        }
        for (oid, _, _) in &sorted {
            idx.extend_from_slice(oid.as_bytes());
        }
        for (_, _, crc) in &sorted {
            idx.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &sorted {
            idx.extend_from_slice(&offset.to_be_bytes());
        }
        idx.extend_from_slice(checksum.as_bytes());
        let idx_checksum = Hasher::digest(&idx).unwrap();
        idx.extend_from_slice(idx_checksum.as_bytes());
        std::fs::write(pack_dir.join(format!("{pack_name}.idx")), &idx).unwrap();

        entries.iter().map(|(oid, _, _)| *oid).collect()
    }

    #[test]
    fn read_loose_object() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        let oid = odb.write_raw(ObjectKind::Blob, b"hello\n").unwrap();

        let raw = odb.read_raw(&oid).unwrap();
        assert_eq!(raw.kind, ObjectKind::Blob);
        assert_eq!(raw.payload, b"hello\n");

        let info = odb.read_info(&oid).unwrap();
        assert_eq!(info.kind, ObjectKind::Blob);
        assert_eq!(info.size, 6);
    }

    #[test]
    fn read_packed_object() {
        let dir = tempfile::tempdir().unwrap();
        let oids = write_pack(dir.path(), &[(ObjectKind::Blob, b"packed bytes")]);
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        assert!(odb.contains(&oids[0]));
        let raw = odb.read_raw(&oids[0]).unwrap();
        assert_eq!(raw.kind, ObjectKind::Blob);
        assert_eq!(raw.payload, b"packed bytes");
    }

    #[test]
    fn loose_and_packed_agree() {
        let dir = tempfile::tempdir().unwrap();
        let payload = b"object stored both ways";
        let oids = write_pack(dir.path(), &[(ObjectKind::Blob, payload)]);
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        let loose_oid = odb.write_raw(ObjectKind::Blob, payload).unwrap();
        assert_eq!(loose_oid, oids[0]);

        // Loose wins the search, and payloads are byte-identical.
        let raw = odb.read_raw(&oids[0]).unwrap();
        assert_eq!(raw.payload, payload);
    }

    #[test]
    fn missing_object_errors() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        let oid = Oid::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
        assert!(!odb.contains(&oid));
        assert!(matches!(odb.read_raw(&oid), Err(OdbError::NotFound(o)) if o == oid));
        assert!(matches!(odb.read_info(&oid), Err(OdbError::NotFound(_))));
    }

    #[test]
    fn parsed_read_of_packed_commit() {
        let dir = tempfile::tempdir().unwrap();
        let payload: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor A <a@b> 1234567890 +0000\ncommitter A <a@b> 1234567890 +0000\n\npacked commit\n";
        let oids = write_pack(dir.path(), &[(ObjectKind::Commit, payload)]);
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        match odb.read(&oids[0]).unwrap() {
            Object::Commit(commit) => {
                assert_eq!(commit.message.as_slice(), b"packed commit\n");
            }
            other => panic!("expected commit, got {:?}", other.kind()),
        }
    }
}
