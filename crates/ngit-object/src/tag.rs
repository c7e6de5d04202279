use bstr::{BStr, BString};
use ngit_hash::Oid;
use ngit_utils::date::Signature;

use crate::{ObjectError, ObjectKind};

/// An annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// OID of the tagged object.
    pub target: Oid,
    /// Kind of the tagged object.
    pub target_kind: ObjectKind,
    /// Tag name.
    pub name: BString,
    /// Tagger identity and timestamp. Ancient tags may omit it.
    pub tagger: Option<Signature>,
    /// Tag message.
    pub message: BString,
}

impl Tag {
    /// Parse tag payload bytes (no object header).
    ///
    /// `object`, `type`, and `tag` are required; unknown headers are
    /// skipped.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut target: Option<Oid> = None;
        let mut target_kind: Option<ObjectKind> = None;
        let mut name: Option<BString> = None;
        let mut tagger: Option<Signature> = None;

        let data = payload;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }
            if data[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];

            if let Some(space_pos) = line.iter().position(|&b| b == b' ') {
                let key = &line[..space_pos];
                let value = &line[space_pos + 1..];

                match key {
                    b"object" => {
                        let hex = std::str::from_utf8(value).map_err(|_| {
                            ObjectError::InvalidHeader("non-UTF-8 target OID".into())
                        })?;
                        target = Some(Oid::from_hex(hex)?);
                    }
                    b"type" => {
                        target_kind = Some(ObjectKind::from_bytes(value)?);
                    }
                    b"tag" => {
                        name = Some(BString::from(value));
                    }
                    b"tagger" => {
                        tagger = Some(
                            Signature::parse(BStr::new(value))
                                .map_err(|e| ObjectError::InvalidSignature(e.to_string()))?,
                        );
                    }
                    _ => {}
                }
            }

            pos = line_end + 1;
        }

        let target = target.ok_or(ObjectError::MissingTagField { field: "object" })?;
        let target_kind = target_kind.ok_or(ObjectError::MissingTagField { field: "type" })?;
        let name = name.ok_or(ObjectError::MissingTagField { field: "tag" })?;

        Ok(Self {
            target,
            target_kind,
            name,
            tagger,
            message: BString::from(&data[pos.min(data.len())..]),
        })
    }

    /// Serialize tag payload bytes (no object header).
    pub fn serialize_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"object ");
        out.extend_from_slice(self.target.to_hex().as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"type ");
        out.extend_from_slice(self.target_kind.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"tag ");
        out.extend_from_slice(&self.name);
        out.push(b'\n');
        if let Some(ref tagger) = self.tagger {
            out.extend_from_slice(b"tagger ");
            out.extend_from_slice(&tagger.to_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }
}
