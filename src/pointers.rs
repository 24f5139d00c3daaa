//! The three pointer tables: path-ordered, title-ordered, and cluster offsets.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;
use crate::header::Header;
use crate::source::Source;

/// Sentinel `title_ptr_pos` meaning "archive carries no title index table".
const NO_TITLE_PTR_POS: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// The three pointer tables loaded eagerly at archive-open time.
pub struct PointerTables {
    /// Absolute file offsets of directory entries, ordered by `(namespace, path)`.
    pub path_pointers: Vec<u64>,
    /// Entry indices into `path_pointers`, ordered by title. Absent in some archives.
    pub title_pointers: Option<Vec<u32>>,
    /// Absolute file offsets of clusters.
    pub cluster_pointers: Vec<u64>,
}

impl PointerTables {
    pub fn load(source: &dyn Source, header: &Header) -> Result<PointerTables> {
        let path_pointers = read_u64_array(source, header.path_ptr_pos, header.entry_count)?;

        let title_pointers = if header.title_ptr_pos == NO_TITLE_PTR_POS {
            None
        } else {
            Some(read_u32_array(
                source,
                header.title_ptr_pos,
                header.entry_count,
            )?)
        };

        let cluster_pointers =
            read_u64_array(source, header.cluster_ptr_pos, header.cluster_count)?;

        Ok(PointerTables {
            path_pointers,
            title_pointers,
            cluster_pointers,
        })
    }
}

fn read_u64_array(source: &dyn Source, pos: u64, count: u32) -> Result<Vec<u64>> {
    let buf = source.read_at(pos, count as usize * 8)?;
    Ok((0..count as usize)
        .map(|i| LittleEndian::read_u64(&buf[i * 8..i * 8 + 8]))
        .collect())
}

fn read_u32_array(source: &dyn Source, pos: u64, count: u32) -> Result<Vec<u32>> {
    let buf = source.read_at(pos, count as usize * 4)?;
    Ok((0..count as usize)
        .map(|i| LittleEndian::read_u32(&buf[i * 4..i * 4 + 4]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MmapSource;
    use std::io::Write;

    #[test]
    fn reads_flat_pointer_arrays() {
        let mut buf = Vec::new();
        for v in [10u64, 20, 30] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        let src = MmapSource::open(tmp.path()).unwrap();
        assert_eq!(read_u64_array(&src, 0, 3).unwrap(), vec![10, 20, 30]);
    }
}
