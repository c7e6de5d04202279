use std::fs;
use std::path::Path;

use ngit_hash::{Hasher, Oid};
use ngit_object::{header, Object, ObjectKind};

use crate::zlib;
use crate::{LooseError, LooseStore};

impl LooseStore {
    /// Write an object to the loose store. Returns the OID.
    ///
    /// No-op when the object already exists: content addressing makes
    /// rewrites idempotent.
    pub fn write(&self, obj: &Object) -> Result<Oid, LooseError> {
        self.write_raw(obj.kind(), &obj.serialize_payload())
    }

    /// Write payload bytes with a known kind. Returns the OID.
    pub fn write_raw(&self, kind: ObjectKind, payload: &[u8]) -> Result<Oid, LooseError> {
        let hdr = header::write_header(kind, payload.len());

        let oid = {
            let mut hasher = Hasher::new();
            hasher.update(&hdr);
            hasher.update(payload);
            hasher.finalize()?
        };

        if self.contains(&oid) {
            return Ok(oid);
        }

        let final_path = self.object_path(&oid);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Compress into a temp file in the objects dir (same filesystem,
        // so the final rename cannot cross devices).
        let mut framed = hdr;
        framed.extend_from_slice(payload);
        let compressed = zlib::deflate(&framed, self.compression_level)?;
        let tmp_path = self.objects_dir().join(format!(
            "tmp_obj_{}",
            std::process::id()
                ^ std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos()
        ));
        fs::write(&tmp_path, &compressed)?;

        finalize_object(&tmp_path, &final_path)?;
        Ok(oid)
    }
}

/// Move a temp file to its final destination.
///
/// If the destination already exists (race with another writer), the temp
/// file is removed and the write counts as successful: content addressing
/// guarantees the existing file holds identical bytes.
fn finalize_object(tmp: &Path, final_path: &Path) -> Result<(), LooseError> {
    match fs::rename(tmp, final_path) {
        Ok(()) => Ok(()),
        Err(_) if final_path.exists() => {
            let _ = fs::remove_file(tmp);
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(tmp);
            Err(LooseError::Io(e))
        }
    }
}
