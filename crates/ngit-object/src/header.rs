use crate::{ObjectError, ObjectKind};

/// Parse an object header from framed bytes.
///
/// The header is `"<kind> <len>\0"`. Returns `(kind, payload_len,
/// header_len)` where `header_len` includes the NUL terminator.
pub fn parse_header(data: &[u8]) -> Result<(ObjectKind, usize, usize), ObjectError> {
    let null_pos = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ObjectError::InvalidHeader("missing NUL terminator".into()))?;

    let header = &data[..null_pos];
    let space_pos = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space in header".into()))?;

    let kind = ObjectKind::from_bytes(&header[..space_pos])?;

    let len_str = std::str::from_utf8(&header[space_pos + 1..])
        .map_err(|_| ObjectError::InvalidHeader("non-ASCII length".into()))?;
    let payload_len: usize = len_str
        .parse()
        .map_err(|_| ObjectError::InvalidHeader(format!("invalid length: {len_str}")))?;

    Ok((kind, payload_len, null_pos + 1))
}

/// Write an object header: `"<kind> <len>\0"`.
pub fn write_header(kind: ObjectKind, payload_len: usize) -> Vec<u8> {
    format!("{} {}\0", kind, payload_len).into_bytes()
}
