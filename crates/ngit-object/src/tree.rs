use bstr::{BStr, BString};
use ngit_hash::Oid;

use crate::ObjectError;

/// File mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Submodule link (160000)
    Gitlink,
    /// Subdirectory (040000)
    Tree,
    /// Any other mode, preserved verbatim.
    Unknown(u32),
}

impl FileMode {
    /// Parse from octal ASCII bytes (e.g. `b"100644"`).
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        let raw = parse_octal(s)
            .ok_or_else(|| ObjectError::InvalidFileMode(String::from_utf8_lossy(s).into()))?;
        Ok(Self::from_raw(raw))
    }

    /// Create from the raw numeric value.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0o100644 => Self::Regular,
            0o100755 => Self::Executable,
            0o120000 => Self::Symlink,
            0o160000 => Self::Gitlink,
            0o040000 => Self::Tree,
            other => Self::Unknown(other),
        }
    }

    /// Serialize to octal ASCII, as written in tree payloads (no leading
    /// zero for subtrees).
    pub fn as_bytes(&self) -> BString {
        BString::from(format!("{:o}", self.raw()))
    }

    /// The raw numeric value.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Gitlink => 0o160000,
            Self::Tree => 0o40000,
            Self::Unknown(v) => *v,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }

    pub fn is_gitlink(&self) -> bool {
        matches!(self, Self::Gitlink)
    }
}

fn parse_octal(s: &[u8]) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut val: u32 = 0;
    for &b in s {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        val = val.checked_mul(8)?.checked_add(u32::from(b - b'0'))?;
    }
    Some(val)
}

/// A single tree entry: `<mode> <name>\0<raw-oid>` on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: BString,
    pub oid: Oid,
}

/// A tree object: a directory listing.
///
/// Entries keep the order they were stored in; this codec only reads
/// trees, so serialization reproduces that order byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Parse tree payload bytes.
    ///
    /// The walk is byte-positional: names may contain any byte but NUL,
    /// and each entry ends with a raw 20-byte OID.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < payload.len() {
            let space_pos = payload[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?
                + pos;

            let mode = FileMode::from_bytes(&payload[pos..space_pos]).map_err(|_| {
                ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "invalid mode".into(),
                }
            })?;

            let name_start = space_pos + 1;
            let null_pos = payload[name_start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: name_start,
                    reason: "missing NUL after name".into(),
                })?
                + name_start;
            let name = BString::from(&payload[name_start..null_pos]);

            let oid_start = null_pos + 1;
            let oid_end = oid_start + Oid::RAW_LEN;
            if oid_end > payload.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: oid_start,
                    reason: "truncated OID".into(),
                });
            }
            let oid = Oid::from_bytes(&payload[oid_start..oid_end])?;

            entries.push(TreeEntry { mode, name, oid });
            pos = oid_end;
        }

        Ok(Self { entries })
    }

    /// Serialize tree payload bytes, in stored entry order.
    pub fn serialize_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(&entry.mode.as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }

    /// Look up an entry by name.
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name[..] == name[..])
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::ByteSlice;

    fn sample_tree_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        // "40000 dir\0" + 20 bytes, "100644 file.txt\0" + 20 bytes
        out.extend_from_slice(b"40000 dir\0");
        out.extend_from_slice(&[0x11; 20]);
        out.extend_from_slice(b"100644 file.txt\0");
        out.extend_from_slice(&[0x22; 20]);
        out.extend_from_slice(b"100755 run.sh\0");
        out.extend_from_slice(&[0x33; 20]);
        out
    }

    #[test]
    fn parse_entries() {
        let tree = Tree::parse(&sample_tree_bytes()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.entries[0].mode, FileMode::Tree);
        assert_eq!(tree.entries[0].name.as_bstr(), "dir");
        assert_eq!(tree.entries[1].mode, FileMode::Regular);
        assert_eq!(tree.entries[2].mode, FileMode::Executable);
        assert_eq!(tree.entries[1].oid.as_bytes(), &[0x22; 20]);
    }

    #[test]
    fn serialize_is_byte_identical() {
        let bytes = sample_tree_bytes();
        let tree = Tree::parse(&bytes).unwrap();
        assert_eq!(tree.serialize_payload(), bytes);
    }

    #[test]
    fn names_may_contain_arbitrary_bytes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"100644 caf\xc3\xa9 \xff.txt\0");
        bytes.extend_from_slice(&[0x44; 20]);
        let tree = Tree::parse(&bytes).unwrap();
        assert_eq!(tree.entries[0].name.as_slice(), b"caf\xc3\xa9 \xff.txt");
        assert_eq!(tree.serialize_payload(), bytes);
    }

    #[test]
    fn find_by_name() {
        let tree = Tree::parse(&sample_tree_bytes()).unwrap();
        assert!(tree.find(BStr::new("file.txt")).is_some());
        assert!(tree.find(BStr::new("missing")).is_none());
    }

    #[test]
    fn gitlink_and_symlink_modes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"160000 submodule\0");
        bytes.extend_from_slice(&[0x55; 20]);
        bytes.extend_from_slice(b"120000 link\0");
        bytes.extend_from_slice(&[0x66; 20]);
        let tree = Tree::parse(&bytes).unwrap();
        assert!(tree.entries[0].mode.is_gitlink());
        assert!(tree.entries[1].mode.is_symlink());
    }

    #[test]
    fn truncated_payload_fails() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"100644 f\0");
        bytes.extend_from_slice(&[0x77; 10]); // half an OID
        assert!(matches!(
            Tree::parse(&bytes),
            Err(ObjectError::InvalidTreeEntry { .. })
        ));
        assert!(Tree::parse(b"100644 no-null").is_err());
        assert!(Tree::parse(b"nomode").is_err());
    }

    #[test]
    fn empty_tree() {
        let tree = Tree::parse(b"").unwrap();
        assert!(tree.is_empty());
        assert!(tree.serialize_payload().is_empty());
    }

    #[test]
    fn mode_octal_roundtrip() {
        for (raw, mode) in [
            (0o100644, FileMode::Regular),
            (0o100755, FileMode::Executable),
            (0o120000, FileMode::Symlink),
            (0o160000, FileMode::Gitlink),
            (0o040000, FileMode::Tree),
        ] {
            assert_eq!(FileMode::from_raw(raw), mode);
            assert_eq!(FileMode::from_bytes(&mode.as_bytes()).unwrap(), mode);
        }
        assert!(matches!(FileMode::from_raw(0o100600), FileMode::Unknown(_)));
        assert!(FileMode::from_bytes(b"10064x").is_err());
    }
}
