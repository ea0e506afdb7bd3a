//! Per-segment sidecar metadata file.
//!
//! A few bytes written once at segment flush and read once at segment open,
//! carrying the `(prefix, field)` pair so the read path can rediscover its
//! remote namespace without talking to the writer.
//!
//! ## File format
//!
//! ```text
//! [u32: magic][u16+bytes: codec name][u32: version][16 bytes: segment id]
//! [u16+bytes: prefix string][u16+bytes: field name][u32: crc32 of all prior bytes]
//! ```
//!
//! All integers little-endian. The whole file is verified on open: magic,
//! codec name, version, segment id, and checksum must all match.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{RemoraError, Result};
use crate::segment::prefix::SegmentPrefix;

pub const SIDECAR_MAGIC: u32 = 0x524D_5253; // "RMRS"
pub const CODEC_NAME: &str = "RemoraIndex";
pub const VERSION_CURRENT: u32 = 1;

/// Length of the segment identity token stored in the header.
pub const SEGMENT_ID_LEN: usize = 16;

/// The payload a sidecar file carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarMeta {
    pub prefix: SegmentPrefix,
    pub field: String,
}

/// Write a sidecar file for `(prefix, field)` of the segment identified by
/// `segment_id`.
pub fn write_sidecar<W: Write>(
    out: &mut W,
    segment_id: &[u8; SEGMENT_ID_LEN],
    meta: &SidecarMeta,
) -> Result<()> {
    let mut buf = Vec::with_capacity(64);
    buf.write_u32::<LittleEndian>(SIDECAR_MAGIC)?;
    write_string(&mut buf, CODEC_NAME)?;
    buf.write_u32::<LittleEndian>(VERSION_CURRENT)?;
    buf.write_all(segment_id)?;
    write_string(&mut buf, &meta.prefix.to_string())?;
    write_string(&mut buf, &meta.field)?;
    let checksum = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(checksum)?;
    out.write_all(&buf)?;
    Ok(())
}

/// Read and fully verify a sidecar file, checking it belongs to
/// `expected_segment_id`.
pub fn read_sidecar<R: Read>(
    input: &mut R,
    expected_segment_id: &[u8; SEGMENT_ID_LEN],
) -> Result<SidecarMeta> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    if bytes.len() < 4 {
        return Err(RemoraError::corrupted("sidecar file truncated"));
    }
    let (body, footer) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let actual = crc32fast::hash(body);
    if stored != actual {
        return Err(RemoraError::corrupted(format!(
            "sidecar checksum mismatch: stored={stored:#010x} actual={actual:#010x}"
        )));
    }

    let mut cursor = body;
    let magic = cursor.read_u32::<LittleEndian>()?;
    if magic != SIDECAR_MAGIC {
        return Err(RemoraError::corrupted(format!(
            "bad sidecar magic: {magic:#010x}"
        )));
    }
    let codec = read_string(&mut cursor)?;
    if codec != CODEC_NAME {
        return Err(RemoraError::corrupted(format!(
            "unknown sidecar codec: {codec:?}"
        )));
    }
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != VERSION_CURRENT {
        return Err(RemoraError::corrupted(format!(
            "unsupported sidecar version: {version}"
        )));
    }
    let mut segment_id = [0u8; SEGMENT_ID_LEN];
    cursor.read_exact(&mut segment_id)?;
    if &segment_id != expected_segment_id {
        return Err(RemoraError::corrupted(
            "sidecar belongs to a different segment",
        ));
    }
    let prefix: SegmentPrefix = read_string(&mut cursor)?.parse()?;
    let field = read_string(&mut cursor)?;
    Ok(SidecarMeta { prefix, field })
}

fn write_string<W: Write>(out: &mut W, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(RemoraError::corrupted(format!(
            "string too long for sidecar: {} bytes",
            bytes.len()
        )));
    }
    out.write_u16::<LittleEndian>(bytes.len() as u16)?;
    out.write_all(bytes)?;
    Ok(())
}

fn read_string(cursor: &mut &[u8]) -> Result<String> {
    let len = cursor.read_u16::<LittleEndian>()? as usize;
    if cursor.len() < len {
        return Err(RemoraError::corrupted("sidecar string truncated"));
    }
    let (bytes, rest) = cursor.split_at(len);
    let value = std::str::from_utf8(bytes)
        .map_err(|e| RemoraError::corrupted(format!("non-utf8 sidecar string: {e}")))?
        .to_string();
    *cursor = rest;
    Ok(value)
}
