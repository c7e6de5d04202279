use std::path::Path;

use bstr::ByteSlice;
use ngit_hash::Oid;

use crate::RefError;

/// A single entry in the packed-refs file.
#[derive(Debug, Clone)]
pub struct PackedRef {
    pub name: String,
    pub oid: Oid,
    /// Peeled target for annotated tags (`^<oid>` lines).
    pub peeled: Option<Oid>,
}

/// Parsed packed-refs file.
///
/// Format:
/// ```text
/// # pack-refs with: peeled fully-peeled sorted
/// <hex-oid> <refname>
/// ^<hex-oid>
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackedRefs {
    refs: Vec<PackedRef>,
}

impl PackedRefs {
    /// Parse packed-refs content.
    pub fn parse(data: &[u8]) -> Result<Self, RefError> {
        let mut refs: Vec<PackedRef> = Vec::new();

        for line in data.lines() {
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }

            if let Some(peeled_hex) = line.strip_prefix(b"^") {
                let hex = std::str::from_utf8(peeled_hex.trim())
                    .map_err(|_| RefError::Parse("non-UTF-8 peeled OID".into()))?;
                let peeled = Oid::from_hex(hex)?;
                if let Some(last) = refs.last_mut() {
                    last.peeled = Some(peeled);
                }
                continue;
            }

            let space_pos = line
                .find_byte(b' ')
                .ok_or_else(|| RefError::Parse("packed-refs line without separator".into()))?;
            let hex = std::str::from_utf8(&line[..space_pos])
                .map_err(|_| RefError::Parse("non-UTF-8 packed-refs OID".into()))?;
            let oid = Oid::from_hex(hex)?;
            let name = std::str::from_utf8(&line[space_pos + 1..])
                .map_err(|_| RefError::Parse("non-UTF-8 packed-refs name".into()))?
                .trim()
                .to_string();

            refs.push(PackedRef {
                name,
                oid,
                peeled: None,
            });
        }

        Ok(Self { refs })
    }

    /// Load packed-refs from a git directory; a missing file is empty.
    pub fn load(git_dir: &Path) -> Result<Self, RefError> {
        let path = git_dir.join("packed-refs");
        let data = match std::fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(RefError::Io(e)),
        };
        Self::parse(&data)
    }

    /// Look up a ref by full name.
    pub fn find(&self, name: &str) -> Option<&PackedRef> {
        self.refs.iter().find(|r| r.name == name)
    }

    /// All packed refs in file order.
    pub fn refs(&self) -> &[PackedRef] {
        &self.refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"# pack-refs with: peeled fully-peeled sorted \n\
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa refs/heads/main\n\
bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb refs/tags/v1.0\n\
^cccccccccccccccccccccccccccccccccccccccc\n";

    #[test]
    fn parse_with_header_and_peel() {
        let packed = PackedRefs::parse(SAMPLE).unwrap();
        assert_eq!(packed.refs().len(), 2);

        let main = packed.find("refs/heads/main").unwrap();
        assert_eq!(main.oid.to_hex(), "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(main.peeled.is_none());

        let tag = packed.find("refs/tags/v1.0").unwrap();
        assert_eq!(
            tag.peeled.unwrap().to_hex(),
            "cccccccccccccccccccccccccccccccccccccccc"
        );
    }

    #[test]
    fn find_missing() {
        let packed = PackedRefs::parse(SAMPLE).unwrap();
        assert!(packed.find("refs/heads/other").is_none());
    }

    #[test]
    fn empty_and_missing_files() {
        let packed = PackedRefs::parse(b"").unwrap();
        assert!(packed.refs().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let packed = PackedRefs::load(dir.path()).unwrap();
        assert!(packed.refs().is_empty());
    }

    #[test]
    fn malformed_line_fails() {
        assert!(PackedRefs::parse(b"nospace\n").is_err());
        assert!(PackedRefs::parse(b"zzzz refs/heads/x\n").is_err());
    }
}
