//! Content filtering between the working tree and the object store.
//!
//! The only filter in this layer is line-ending normalization, applied on
//! the hash/write path when `core.autocrlf` asks for it and the content
//! is not binary.

use bstr::ByteSlice;

/// How many leading bytes are sniffed for a NUL when classifying content.
const BINARY_CHECK_LEN: usize = 1024;

/// Extensions that are always treated as text.
const TEXT_EXTENSIONS: &[&str] = &[
    "c", "cfg", "cpp", "css", "csv", "h", "html", "ini", "js", "json", "md", "py", "rs", "sh",
    "toml", "ts", "txt", "xml", "yaml", "yml",
];

/// Extensions that are always treated as binary.
const BINARY_EXTENSIONS: &[&str] = &[
    "a", "bin", "class", "dylib", "exe", "gif", "gz", "ico", "jpeg", "jpg", "mp3", "mp4", "o",
    "pdf", "png", "so", "tar", "woff", "woff2", "zip",
];

/// Classify content as binary.
///
/// Known extensions short-circuit; otherwise a NUL byte within the first
/// kilobyte marks the content binary. The predicate is deliberately a free
/// function so callers can substitute their own heuristic.
pub fn is_binary(filename: Option<&str>, data: &[u8]) -> bool {
    if let Some(ext) = filename.and_then(extension) {
        let ext = ext.to_ascii_lowercase();
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
        if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }
    let check_len = data.len().min(BINARY_CHECK_LEN);
    data[..check_len].contains(&0)
}

fn extension(filename: &str) -> Option<&str> {
    let basename = filename.rsplit('/').next().unwrap_or(filename);
    match basename.rsplit_once('.') {
        Some(("", _)) => None, // dotfiles like ".gitignore" have no extension
        Some((_, ext)) => Some(ext),
        None => None,
    }
}

/// Normalize line endings: `\r\n` and stray `\r` both become `\n`.
///
/// Returns `None` when the content holds no carriage returns and can be
/// used as-is.
pub fn normalize_eol(data: &[u8]) -> Option<Vec<u8>> {
    if !data.contains(&b'\r') {
        return None;
    }
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\r' {
            out.push(b'\n');
            if i + 1 < data.len() && data[i + 1] == b'\n' {
                i += 1;
            }
        } else {
            out.push(data[i]);
        }
        i += 1;
    }
    Some(out)
}
