use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use ngit_hash::Oid;
use ngit_object::{header, Object, ObjectKind};

use crate::zlib;
use crate::{LooseError, LooseStore};

impl LooseStore {
    /// Check if a loose object exists.
    pub fn contains(&self, oid: &Oid) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read a loose object by OID.
    ///
    /// Returns `Ok(None)` if the object does not exist, `Err` if it
    /// exists but is corrupt.
    pub fn read(&self, oid: &Oid) -> Result<Option<Object>, LooseError> {
        match self.read_framed(oid)? {
            Some(framed) => Ok(Some(Object::parse(&framed)?)),
            None => Ok(None),
        }
    }

    /// Read the raw framed bytes (`"<kind> <len>\0<payload>"`) of a
    /// loose object.
    pub fn read_framed(&self, oid: &Oid) -> Result<Option<Vec<u8>>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };
        let framed = zlib::inflate(&compressed).map_err(|e| LooseError::Decompress {
            oid: oid.to_hex(),
            source: e,
        })?;
        Ok(Some(framed))
    }

    /// Read just the kind and payload size without inflating the full
    /// object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    pub fn read_header(&self, oid: &Oid) -> Result<Option<(ObjectKind, usize)>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        // Inflate only enough to see the NUL-terminated header. Headers
        // are short; 64 bytes is plenty.
        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut buf = [0u8; 64];
        let mut filled = 0;

        loop {
            if filled >= buf.len() {
                return Err(LooseError::Corrupt {
                    oid: oid.to_hex(),
                    reason: "header exceeds 64 bytes".into(),
                });
            }
            let n = decoder
                .read(&mut buf[filled..])
                .map_err(|e| LooseError::Decompress {
                    oid: oid.to_hex(),
                    source: e,
                })?;
            if n == 0 {
                return Err(LooseError::Corrupt {
                    oid: oid.to_hex(),
                    reason: "unexpected EOF before header NUL".into(),
                });
            }
            filled += n;
            if buf[..filled].contains(&0) {
                break;
            }
        }

        let (kind, payload_len, _header_len) = header::parse_header(&buf[..filled])?;
        Ok(Some((kind, payload_len)))
    }
}
