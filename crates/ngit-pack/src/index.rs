//! Pack index (v2) reading and lookup.
//!
//! Layout:
//!
//! ```text
//! Header:  \xff t O c | version (big-endian u32 = 2)
//! Fanout:  256 x 4-byte big-endian cumulative counts
//! OIDs:    N x 20-byte sorted OIDs
//! CRC32:   N x 4-byte CRC32 values
//! Offsets: N x 4-byte offsets (high bit set -> 64-bit table, rejected)
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! `N` is the last fan-out bucket. Lookup narrows to the fan-out slice
//! for the OID's first byte and binary-searches it.

use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ngit_hash::Oid;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

/// Where an object lives inside a pack, as recorded by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLocation {
    /// Byte offset of the entry in the `.pack` file.
    pub offset: u64,
    /// CRC32 of the raw entry bytes, exposed for future verification.
    pub crc32: u32,
}

/// A memory-mapped pack index.
pub struct PackIndex {
    data: Mmap,
    num_objects: u32,
    oid_offset: usize,
    crc_offset: usize,
    offset32_offset: usize,
    idx_path: PathBuf,
}

const FANOUT_OFFSET: usize = 8;
const FANOUT_SIZE: usize = 256 * 4;

impl PackIndex {
    /// Open and validate a pack index file.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref().to_path_buf();
        let file = std::fs::File::open(&idx_path)?;
        let data = unsafe { Mmap::map(&file)? };

        // Minimum: header + fanout + two trailing checksums.
        if data.len() < FANOUT_OFFSET + FANOUT_SIZE + 2 * Oid::RAW_LEN {
            return Err(PackError::InvalidIndex("file too small".into()));
        }
        if data[0..4] != IDX_SIGNATURE {
            return Err(PackError::InvalidIndex("bad signature".into()));
        }
        let version = read_u32(&data, 4);
        if version != IDX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let num_objects = read_u32(&data, FANOUT_OFFSET + 255 * 4);
        let n = num_objects as usize;

        let oid_offset = FANOUT_OFFSET + FANOUT_SIZE;
        let crc_offset = oid_offset + n * Oid::RAW_LEN;
        let offset32_offset = crc_offset + n * 4;

        let min_size = offset32_offset + n * 4 + 2 * Oid::RAW_LEN;
        if data.len() < min_size {
            return Err(PackError::InvalidIndex(format!(
                "file too small: {} < {min_size}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            num_objects,
            oid_offset,
            crc_offset,
            offset32_offset,
            idx_path,
        })
    }

    /// Look up an OID.
    ///
    /// Returns `Ok(None)` when the OID is not in this pack. Fails with
    /// [`PackError::LargePackUnsupported`] when the matched offset needs
    /// the 64-bit table.
    pub fn lookup(&self, oid: &Oid) -> Result<Option<PackLocation>, PackError> {
        let (lo, hi) = self.fanout_range(oid.first_byte());
        let target = oid.as_bytes();

        let mut low = lo;
        let mut high = hi;
        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid).cmp(target) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => {
                    let raw = read_u32(&self.data, self.offset32_offset + mid * 4);
                    if raw & 0x8000_0000 != 0 {
                        return Err(PackError::LargePackUnsupported);
                    }
                    let crc32 = read_u32(&self.data, self.crc_offset + mid * 4);
                    return Ok(Some(PackLocation {
                        offset: raw as u64,
                        crc32,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// OID at a sorted index position.
    pub fn oid_at(&self, index: u32) -> Oid {
        Oid::from_bytes(self.oid_bytes_at(index as usize)).expect("20 bytes in mapped index")
    }

    /// Total number of objects in this index.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Path to the `.idx` file.
    pub fn path(&self) -> &Path {
        &self.idx_path
    }

    /// Iterate over all OIDs in sorted order.
    pub fn iter_oids(&self) -> impl Iterator<Item = Oid> + '_ {
        (0..self.num_objects).map(|i| self.oid_at(i))
    }

    /// Fan-out slice for a first byte: `[fanout[b-1], fanout[b])`.
    fn fanout_range(&self, first_byte: u8) -> (usize, usize) {
        let end = read_u32(&self.data, FANOUT_OFFSET + first_byte as usize * 4) as usize;
        let start = if first_byte == 0 {
            0
        } else {
            read_u32(&self.data, FANOUT_OFFSET + (first_byte as usize - 1) * 4) as usize
        };
        (start, end)
    }

    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = self.oid_offset + index * Oid::RAW_LEN;
        &self.data[start..start + Oid::RAW_LEN]
    }
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}
