//! Cluster framing, decompression, and blob addressing.
//!
//! A cluster is a group of blobs sharing one (possibly compressed) byte
//! region and one offset table. Whole clusters are decoded to memory; no
//! streaming random access inside a compressed cluster is attempted.

use std::io::Read;
use std::sync::{Arc, Mutex};

use bitreader::BitReader;
use byteorder::{ByteOrder, LittleEndian};
use schnellru::{ByLength, LruMap};

use crate::error::{Error, Result};
use crate::source::Source;

/// Cluster compression codec, taken from the low nibble of the framing byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzma2,
    Zstd,
}

impl Compression {
    fn from_code(code: u8) -> Result<Compression> {
        match code {
            0 | 1 => Ok(Compression::None),
            4 => Ok(Compression::Lzma2),
            5 => Ok(Compression::Zstd),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

/// Parses the 1-byte cluster framing header.
///
/// Low nibble is the compression code; bit `0x10` is the "extended"
/// (64-bit blob offsets) flag.
fn parse_framing(byte: u8) -> Result<(bool, Compression)> {
    let slice = [byte];
    let mut reader = BitReader::new(&slice);
    // Three unused high bits, then the extended flag, then the low nibble.
    reader.skip(3).map_err(|_| Error::MalformedCluster)?;
    let extended = reader.read_bool().map_err(|_| Error::MalformedCluster)?;
    let code = reader.read_u8(4).map_err(|_| Error::MalformedCluster)?;
    Ok((extended, Compression::from_code(code)?))
}

/// A fully decoded cluster: decompressed payload with the framing byte
/// prepended at index 0 so blob offsets (defined relative to "one past the
/// framing byte") can be addressed uniformly.
pub struct Cluster {
    pub compression: Compression,
    extended: bool,
    payload: Vec<u8>,
}

impl Cluster {
    /// Decodes the cluster living in `[offset, offset + size)`.
    pub fn decode(source: &dyn Source, offset: u64, size: u64) -> Result<Cluster> {
        let framing_byte = source.read_at(offset, 1)?[0];
        let (extended, compression) = parse_framing(framing_byte)?;

        let raw = source.read_at(offset + 1, (size - 1) as usize)?;
        let decompressed = match compression {
            Compression::None => raw,
            Compression::Lzma2 => decode_lzma2(&raw)?,
            Compression::Zstd => decode_zstd(&raw)?,
        };

        let mut payload = Vec::with_capacity(decompressed.len() + 1);
        payload.push(framing_byte);
        payload.extend_from_slice(&decompressed);

        Ok(Cluster {
            compression,
            extended,
            payload,
        })
    }

    fn offset_size(&self) -> usize {
        if self.extended {
            8
        } else {
            4
        }
    }

    fn read_offset(&self, pos: usize) -> Result<u64> {
        let width = self.offset_size();
        let slice = self
            .payload
            .get(pos..pos + width)
            .ok_or(Error::MalformedCluster)?;
        Ok(if self.extended {
            LittleEndian::read_u64(slice)
        } else {
            LittleEndian::read_u32(slice) as u64
        })
    }

    /// Number of blobs addressable in this cluster.
    pub fn blob_count(&self) -> Result<u64> {
        let first_offset = self.read_offset(1)?;
        let width = self.offset_size() as u64;
        if first_offset < width {
            return Err(Error::MalformedCluster);
        }
        Ok(first_offset / width - 1)
    }

    /// Returns the bytes of blob `index`.
    pub fn blob(&self, index: u32) -> Result<&[u8]> {
        let count = self.blob_count()?;
        if index as u64 >= count {
            return Err(Error::BlobOutOfRange { index, count });
        }

        let width = self.offset_size();
        let entry_pos = 1 + index as usize * width;
        let start = self.read_offset(entry_pos)? + 1;
        let end = self.read_offset(entry_pos + width)? + 1;

        if start > end || end as usize > self.payload.len() {
            return Err(Error::MalformedCluster);
        }

        Ok(&self.payload[start as usize..end as usize])
    }

    /// Approximate resident size, used for the cache's byte budget.
    pub fn memory_size(&self) -> usize {
        self.payload.len()
    }
}

/// Decoded-cluster cache bounded by both an entry count and a byte budget.
///
/// `schnellru` only limits by entry count natively (`ByLength`), so the
/// byte budget is enforced on top by evicting the least-recently-used
/// entry whenever a fresh insert would push total resident bytes over
/// `max_bytes`.
pub struct ClusterCache {
    inner: Mutex<CacheInner>,
    max_bytes: u64,
}

struct CacheInner {
    map: LruMap<u32, Arc<Cluster>, ByLength>,
    bytes_used: u64,
}

impl ClusterCache {
    pub fn new(max_entries: u32, max_bytes: u64) -> ClusterCache {
        ClusterCache {
            inner: Mutex::new(CacheInner {
                map: LruMap::new(ByLength::new(max_entries)),
                bytes_used: 0,
            }),
            max_bytes,
        }
    }

    /// Returns the cached cluster for `key`, decoding and inserting it via
    /// `load` on a miss.
    pub fn get_or_load<F>(&self, key: u32, load: F) -> Result<Arc<Cluster>>
    where
        F: FnOnce() -> Result<Cluster>,
    {
        {
            let mut guard = self.inner.lock().expect("cluster cache mutex poisoned");
            if let Some(hit) = guard.map.get(&key) {
                return Ok(Arc::clone(hit));
            }
        }

        let cluster = Arc::new(load()?);
        let size = cluster.memory_size() as u64;

        let mut guard = self.inner.lock().expect("cluster cache mutex poisoned");
        while guard.bytes_used.saturating_add(size) > self.max_bytes {
            match guard.map.pop_oldest() {
                Some((_, evicted)) => {
                    guard.bytes_used = guard.bytes_used.saturating_sub(evicted.memory_size() as u64);
                }
                None => break,
            }
        }
        guard.map.insert(key, Arc::clone(&cluster));
        guard.bytes_used = guard.bytes_used.saturating_add(size);

        Ok(cluster)
    }
}

fn decode_lzma2(raw: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = xz2::read::XzDecoder::new(raw);
    let mut out = Vec::with_capacity(raw.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Lzma2Decode(e.to_string()))?;
    Ok(out)
}

fn decode_zstd(raw: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(raw).map_err(|e| Error::ZstdDecode(e.to_string()))
}
