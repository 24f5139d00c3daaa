//! Assembles minimal, spec-correct ZIM archives in memory for integration
//! tests, so none of them depend on a real downloaded `.zim` file.

use byteorder::{ByteOrder, LittleEndian};

pub const NO_TITLE_INDEX: u64 = 0xFFFF_FFFF_FFFF_FFFF;

pub enum EntrySpec {
    Content {
        namespace: u8,
        path: &'static str,
        title: &'static str,
        mime_type: u16,
        cluster: u32,
        blob: u32,
    },
    Redirect {
        namespace: u8,
        path: &'static str,
        title: &'static str,
        redirect_index: u32,
    },
}

impl EntrySpec {
    pub fn content(namespace: u8, path: &'static str, title: &'static str, cluster: u32, blob: u32) -> Self {
        EntrySpec::Content {
            namespace,
            path,
            title,
            mime_type: 0,
            cluster,
            blob,
        }
    }

    pub fn redirect(namespace: u8, path: &'static str, title: &'static str, redirect_index: u32) -> Self {
        EntrySpec::Redirect {
            namespace,
            path,
            title,
            redirect_index,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            EntrySpec::Content {
                namespace,
                path,
                title,
                mime_type,
                cluster,
                blob,
            } => {
                let mut buf = vec![0u8; 16];
                LittleEndian::write_u16(&mut buf[0..2], *mime_type);
                buf[3] = *namespace;
                LittleEndian::write_u32(&mut buf[8..12], *cluster);
                LittleEndian::write_u32(&mut buf[12..16], *blob);
                buf.extend_from_slice(path.as_bytes());
                buf.push(0);
                buf.extend_from_slice(title.as_bytes());
                buf.push(0);
                buf
            }
            EntrySpec::Redirect {
                namespace,
                path,
                title,
                redirect_index,
            } => {
                let mut buf = vec![0u8; 12];
                LittleEndian::write_u16(&mut buf[0..2], 0xFFFF);
                buf[3] = *namespace;
                LittleEndian::write_u32(&mut buf[8..12], *redirect_index);
                buf.extend_from_slice(path.as_bytes());
                buf.push(0);
                buf.extend_from_slice(title.as_bytes());
                buf.push(0);
                buf
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzma2,
    Zstd,
}

pub struct ClusterSpec {
    pub compression: Compression,
    pub extended: bool,
    pub blobs: Vec<Vec<u8>>,
}

impl ClusterSpec {
    pub fn uncompressed(extended: bool, blobs: Vec<Vec<u8>>) -> Self {
        ClusterSpec {
            compression: Compression::None,
            extended,
            blobs,
        }
    }

    pub fn zstd(extended: bool, blobs: Vec<Vec<u8>>) -> Self {
        ClusterSpec {
            compression: Compression::Zstd,
            extended,
            blobs,
        }
    }

    pub fn lzma2(extended: bool, blobs: Vec<Vec<u8>>) -> Self {
        ClusterSpec {
            compression: Compression::Lzma2,
            extended,
            blobs,
        }
    }

    fn offset_table_body(&self) -> Vec<u8> {
        let width: u64 = if self.extended { 8 } else { 4 };
        let count = self.blobs.len() as u64;
        let table_bytes = width * (count + 1);

        let mut offsets = vec![table_bytes];
        let mut running = table_bytes;
        for b in &self.blobs {
            running += b.len() as u64;
            offsets.push(running);
        }

        let mut body = Vec::new();
        for off in &offsets {
            if self.extended {
                body.extend_from_slice(&off.to_le_bytes());
            } else {
                body.extend_from_slice(&(*off as u32).to_le_bytes());
            }
        }
        for b in &self.blobs {
            body.extend_from_slice(b);
        }
        body
    }

    /// Encodes the cluster's on-disk bytes: framing byte + (possibly
    /// compressed) offset table and blob payload.
    fn encode(&self) -> Vec<u8> {
        let raw = self.offset_table_body();

        let (code, payload) = match self.compression {
            Compression::None => (0x01u8, raw),
            Compression::Lzma2 => (0x04u8, lzma2_compress(&raw)),
            Compression::Zstd => (0x05u8, zstd::stream::encode_all(raw.as_slice(), 0).unwrap()),
        };
        let framing = if self.extended { code | 0x10 } else { code };

        let mut out = vec![framing];
        out.extend_from_slice(&payload);
        out
    }
}

fn lzma2_compress(raw: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(raw).unwrap();
    encoder.finish().unwrap()
}

/// Builds the raw bytes of a ZIM archive. Entries must already be supplied
/// in sorted `(namespace, path)` order — the builder lays them out exactly
/// as given, it does not sort them.
pub struct ZimBuilder {
    entries: Vec<EntrySpec>,
    clusters: Vec<ClusterSpec>,
    main_page: Option<u32>,
    title_index_v1: Option<Vec<u32>>,
}

impl ZimBuilder {
    pub fn new() -> Self {
        ZimBuilder {
            entries: Vec::new(),
            clusters: Vec::new(),
            main_page: None,
            title_index_v1: None,
        }
    }

    pub fn entry(mut self, entry: EntrySpec) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn cluster(mut self, cluster: ClusterSpec) -> Self {
        self.clusters.push(cluster);
        self
    }

    pub fn main_page(mut self, index: u32) -> Self {
        self.main_page = Some(index);
        self
    }

    /// Appends an `X/listing/titleOrdered/v1` entry plus its packed payload
    /// cluster, wired at the next free cluster/entry slots.
    pub fn title_index_v1(mut self, entry_indices: Vec<u32>) -> Self {
        self.title_index_v1 = Some(entry_indices);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut entries = std::mem::take(&mut self.entries);

        if let Some(indices) = self.title_index_v1.take() {
            let mut payload = Vec::with_capacity(indices.len() * 4);
            for i in &indices {
                payload.extend_from_slice(&i.to_le_bytes());
            }
            let cluster_index = self.clusters.len() as u32;
            self.clusters
                .push(ClusterSpec::uncompressed(false, vec![payload]));
            entries.push(EntrySpec::content(
                b'X',
                "listing/titleOrdered/v1",
                "listing/titleOrdered/v1",
                cluster_index,
                0,
            ));
        }

        let encoded_entries: Vec<Vec<u8>> = entries.iter().map(EntrySpec::encode).collect();
        let encoded_clusters: Vec<Vec<u8>> = self.clusters.iter().map(ClusterSpec::encode).collect();

        let header_size = 80u64;
        let mime_list_pos = header_size;
        let mime_table = b"text/html\0text/plain\0application/octet-stream\0\0";
        let path_ptr_pos = mime_list_pos + mime_table.len() as u64;
        let cluster_ptr_pos = path_ptr_pos + 8 * encoded_entries.len() as u64;
        let first_entry_pos = cluster_ptr_pos + 8 * encoded_clusters.len().max(1) as u64;

        let mut entry_positions = Vec::new();
        let mut pos = first_entry_pos;
        for e in &encoded_entries {
            entry_positions.push(pos);
            pos += e.len() as u64;
        }

        let mut cluster_positions = Vec::new();
        for c in &encoded_clusters {
            cluster_positions.push(pos);
            pos += c.len() as u64;
        }
        let checksum_pos = pos;

        let mut buf = vec![0u8; header_size as usize];
        LittleEndian::write_u32(&mut buf[0..4], zim_engine::header::ZIM_MAGIC);
        LittleEndian::write_u16(&mut buf[4..6], 6);
        LittleEndian::write_u16(&mut buf[6..8], 1);
        LittleEndian::write_u32(&mut buf[24..28], encoded_entries.len() as u32);
        LittleEndian::write_u32(&mut buf[28..32], encoded_clusters.len() as u32);
        LittleEndian::write_u64(&mut buf[32..40], path_ptr_pos);
        LittleEndian::write_u64(&mut buf[40..48], NO_TITLE_INDEX);
        LittleEndian::write_u64(&mut buf[48..56], cluster_ptr_pos);
        LittleEndian::write_u64(&mut buf[56..64], mime_list_pos);
        LittleEndian::write_u32(&mut buf[64..68], self.main_page.unwrap_or(0xFFFF_FFFF));
        LittleEndian::write_u32(&mut buf[68..72], 0xFFFF_FFFF);
        LittleEndian::write_u64(&mut buf[72..80], checksum_pos);

        buf.extend_from_slice(mime_table);
        for p in &entry_positions {
            buf.extend_from_slice(&p.to_le_bytes());
        }
        for p in &cluster_positions {
            buf.extend_from_slice(&p.to_le_bytes());
        }
        if cluster_positions.is_empty() {
            // keep the header's cluster_ptr_pos region non-empty so the
            // entry table's computed offset above stays consistent even
            // with zero clusters.
            buf.extend_from_slice(&checksum_pos.to_le_bytes());
        }
        for e in &encoded_entries {
            buf.extend_from_slice(e);
        }
        for c in &encoded_clusters {
            buf.extend_from_slice(c);
        }
        buf.extend_from_slice(&[0u8; 16]);

        buf
    }
}
