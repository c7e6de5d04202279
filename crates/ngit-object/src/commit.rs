use bstr::{BStr, BString, ByteSlice};
use ngit_hash::Oid;
use ngit_utils::date::Signature;

use crate::ObjectError;

/// A commit object.
///
/// Unknown headers (gpgsig included) are kept verbatim so a parsed commit
/// re-serializes to the exact payload it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// OID of the root tree.
    pub tree: Oid,
    /// Parent commit OIDs, empty for a root commit.
    pub parents: Vec<Oid>,
    /// Author identity and timestamp.
    pub author: Signature,
    /// Committer identity and timestamp.
    pub committer: Signature,
    /// GPG signature, multi-line continuations joined with '\n'.
    pub gpgsig: Option<BString>,
    /// Remaining headers in order of appearance.
    pub extra_headers: Vec<(BString, BString)>,
    /// Message: everything after the blank separator line.
    pub message: BString,
}

impl Commit {
    /// Parse commit payload bytes (no object header).
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut tree: Option<Oid> = None;
        let mut parents = Vec::new();
        let mut author: Option<Signature> = None;
        let mut committer: Option<Signature> = None;
        let mut gpgsig: Option<BString> = None;
        let mut extra_headers: Vec<(BString, BString)> = Vec::new();

        let data = payload;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }
            // A blank line ends the header block.
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

            let space_pos = match line.iter().position(|&b| b == b' ') {
                Some(p) => p,
                None => {
                    return Err(ObjectError::InvalidHeader(format!(
                        "commit header without value: {:?}",
                        BStr::new(line)
                    )))
                }
            };
            let key = &line[..space_pos];
            let value = &line[space_pos + 1..];

            match key {
                b"tree" => {
                    tree = Some(parse_oid_value(value, "tree")?);
                }
                b"parent" => {
                    parents.push(parse_oid_value(value, "parent")?);
                }
                b"author" => {
                    author = Some(parse_signature(value)?);
                }
                b"committer" => {
                    committer = Some(parse_signature(value)?);
                }
                b"gpgsig" => {
                    let (sig, next) = read_continued_value(data, value, line_end);
                    gpgsig = Some(sig);
                    pos = next;
                    continue;
                }
                _ => {
                    // Unknown header; may span continuation lines.
                    let (val, next) = read_continued_value(data, value, line_end);
                    extra_headers.push((BString::from(key), val));
                    pos = next;
                    continue;
                }
            }

            pos = line_end + 1;
        }

        let tree = tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        let author = author.ok_or(ObjectError::MissingCommitField { field: "author" })?;
        let committer = committer.ok_or(ObjectError::MissingCommitField { field: "committer" })?;

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            gpgsig,
            extra_headers,
            message: BString::from(&data[pos.min(data.len())..]),
        })
    }

    /// Serialize commit payload bytes (no object header).
    pub fn serialize_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');

        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_bytes());
        out.push(b'\n');

        if let Some(ref sig) = self.gpgsig {
            write_continued_header(&mut out, b"gpgsig", sig);
        }
        for (key, val) in &self.extra_headers {
            write_continued_header(&mut out, key, val);
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// First parent, if any.
    pub fn first_parent(&self) -> Option<&Oid> {
        self.parents.first()
    }

    /// More than one parent?
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// No parents?
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First line of the message.
    pub fn summary(&self) -> &BStr {
        let msg: &[u8] = self.message.as_ref();
        match msg.find_byte(b'\n') {
            Some(pos) => BStr::new(&msg[..pos]),
            None => BStr::new(msg),
        }
    }
}

/// Read a header value plus any space-prefixed continuation lines.
/// Returns the joined value and the position just past the last line.
fn read_continued_value(data: &[u8], first: &[u8], line_end: usize) -> (BString, usize) {
    let mut val = Vec::from(first);
    let mut next = line_end + 1;
    while next < data.len() && data[next] == b' ' {
        val.push(b'\n');
        let cont_end = data[next..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| p + next)
            .unwrap_or(data.len());
        val.extend_from_slice(&data[next + 1..cont_end]);
        next = cont_end + 1;
    }
    (BString::from(val), next)
}

/// Write a header whose value may contain newlines, using continuation lines.
fn write_continued_header(out: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    out.extend_from_slice(key);
    out.push(b' ');
    for (i, line) in value.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
            out.push(b' ');
        }
        out.extend_from_slice(line);
    }
    out.push(b'\n');
}

fn parse_oid_value(value: &[u8], field: &'static str) -> Result<Oid, ObjectError> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| ObjectError::InvalidHeader(format!("non-UTF-8 {field} OID")))?;
    Ok(Oid::from_hex(hex)?)
}

fn parse_signature(data: &[u8]) -> Result<Signature, ObjectError> {
    Signature::parse(BStr::new(data)).map_err(|e| ObjectError::InvalidSignature(e.to_string()))
}
