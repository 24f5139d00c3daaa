//! The 80-byte fixed ZIM header and the MIME-type table that follows it.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::source::Source;
use crate::uuid::Uuid;

/// Magic number identifying a ZIM file (`'Z' 'I' 'M' 0x04` read little-endian).
pub const ZIM_MAGIC: u32 = 0x0044_4D5A;

/// Minimum supported major version. Older archives use a legacy,
/// multi-namespace directory layout this engine does not read.
pub const MIN_MAJOR_VERSION: u16 = 6;

/// Sentinel value meaning "no main/layout page".
pub const NO_PAGE: u32 = 0xFFFF_FFFF;

/// The decoded fixed-size ZIM header.
#[derive(Debug, Clone)]
pub struct Header {
    pub major_version: u16,
    pub minor_version: u16,
    pub uuid: Uuid,
    pub entry_count: u32,
    pub cluster_count: u32,
    pub path_ptr_pos: u64,
    pub title_ptr_pos: u64,
    pub cluster_ptr_pos: u64,
    pub mime_list_pos: u64,
    pub main_page: Option<u32>,
    pub layout_page: Option<u32>,
    pub checksum_pos: u64,
}

impl Header {
    /// Decodes the 80-byte header starting at offset 0.
    pub fn decode(source: &dyn Source) -> Result<Header> {
        let buf = source.read_at(0, 80)?;

        let magic = LittleEndian::read_u32(&buf[0..4]);
        if magic != ZIM_MAGIC {
            return Err(Error::BadMagic {
                expected: ZIM_MAGIC,
                found: magic,
            });
        }

        let major_version = LittleEndian::read_u16(&buf[4..6]);
        let minor_version = LittleEndian::read_u16(&buf[6..8]);
        if major_version < MIN_MAJOR_VERSION {
            return Err(Error::UnsupportedVersion {
                major: major_version,
            });
        }

        let mut uuid_bytes = [0u8; 16];
        uuid_bytes.copy_from_slice(&buf[8..24]);

        let entry_count = LittleEndian::read_u32(&buf[24..28]);
        let cluster_count = LittleEndian::read_u32(&buf[28..32]);
        let path_ptr_pos = LittleEndian::read_u64(&buf[32..40]);
        let title_ptr_pos = LittleEndian::read_u64(&buf[40..48]);
        let cluster_ptr_pos = LittleEndian::read_u64(&buf[48..56]);
        let mime_list_pos = LittleEndian::read_u64(&buf[56..64]);
        let main_page = LittleEndian::read_u32(&buf[64..68]);
        let layout_page = LittleEndian::read_u32(&buf[68..72]);
        let checksum_pos = LittleEndian::read_u64(&buf[72..80]);

        Ok(Header {
            major_version,
            minor_version,
            uuid: Uuid::new(uuid_bytes),
            entry_count,
            cluster_count,
            path_ptr_pos,
            title_ptr_pos,
            cluster_ptr_pos,
            mime_list_pos,
            main_page: none_if_sentinel(main_page),
            layout_page: none_if_sentinel(layout_page),
            checksum_pos,
        })
    }
}

fn none_if_sentinel(value: u32) -> Option<u32> {
    if value == NO_PAGE {
        None
    } else {
        Some(value)
    }
}

/// Reads the zero-terminated MIME-type list starting at `mime_list_pos`,
/// stopping at the first empty string.
pub fn read_mime_types(source: &dyn Source, mime_list_pos: u64) -> Result<Vec<String>> {
    let mut mime_types = Vec::new();
    let mut offset = mime_list_pos;

    loop {
        // MIME type strings are short in every archive observed in
        // practice; 256 bytes covers them with room to spare.
        let buf = source.read_at(offset, 256)?;
        let end = buf.iter().position(|&b| b == 0);
        let end = match end {
            Some(end) => end,
            None => return Err(Error::StringTooLong),
        };
        if end == 0 {
            break;
        }
        let s = String::from_utf8(buf[..end].to_vec())?;
        offset += (end + 1) as u64;
        mime_types.push(s);
    }

    Ok(mime_types)
}
