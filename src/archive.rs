//! The archive facade: opens a ZIM file and exposes entry lookup, content
//! reads, redirect resolution, and namespace listing over it.

use std::path::Path;
use std::sync::Arc;

use md5::{Digest, Md5};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::cluster::{Cluster, ClusterCache};
use crate::config::EngineConfig;
use crate::entry::{decode_directory_entry, DirectoryEntry, EntryInfo, INVALID_REDIRECT};
use crate::error::{Error, Result};
use crate::header::{read_mime_types, Header};
use crate::namespace::Namespace;
use crate::pointers::PointerTables;
use crate::source::{FileSource, MmapSource, Source};
use crate::uuid::Uuid;

/// A fully opened, immutable ZIM archive.
///
/// Safe to share across threads: the backing [`Source`] supports concurrent
/// reads, and the only mutable state is the cluster cache, which is
/// internally synchronized.
pub struct Archive {
    source: Box<dyn Source>,
    header: Header,
    mime_types: Vec<String>,
    pointers: PointerTables,
    cluster_cache: ClusterCache,
    max_redirect_hops: u8,
}

impl Archive {
    /// Opens the archive at `path` using a memory map.
    pub fn open<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Archive> {
        let source = MmapSource::open(path)?;
        Self::from_source(Box::new(source), config)
    }

    /// Opens the archive at `path` using plain positional file reads
    /// instead of a memory map.
    pub fn open_with_file_io<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Archive> {
        let source = FileSource::open(path)?;
        Self::from_source(Box::new(source), config)
    }

    /// Builds an archive directly over an already-constructed [`Source`],
    /// bypassing file opening. Useful for embedding archives in memory or
    /// for test fixtures.
    pub fn from_source(source: Box<dyn Source>, config: &EngineConfig) -> Result<Archive> {
        let header = Header::decode(source.as_ref())?;
        let mime_types = read_mime_types(source.as_ref(), header.mime_list_pos)?;
        let pointers = PointerTables::load(source.as_ref(), &header)?;

        debug!(
            entry_count = header.entry_count,
            cluster_count = header.cluster_count,
            uuid = %header.uuid,
            "opened ZIM archive"
        );

        Ok(Archive {
            source,
            header,
            mime_types,
            pointers,
            cluster_cache: ClusterCache::new(
                config.cluster_cache_entries as u32,
                config.cluster_cache_bytes,
            ),
            max_redirect_hops: config.max_redirect_hops,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    pub fn entry_count(&self) -> u32 {
        self.header.entry_count
    }

    pub fn cluster_count(&self) -> u32 {
        self.header.cluster_count
    }

    pub fn uuid(&self) -> Uuid {
        self.header.uuid
    }

    /// The header's title-ordered pointer table (entry indices sorted by
    /// title within namespace), if this archive carries one. This is the
    /// legacy per-format table; [`crate::index`] instead reads the
    /// `X/listing/titleOrdered/v0`/`v1` payloads, which modern archives
    /// populate and which cover article-only ordering that this table does
    /// not distinguish.
    pub fn title_pointers(&self) -> Option<&[u32]> {
        self.pointers.title_pointers.as_deref()
    }

    /// Looks up the directory entry at path-pointer-table position `index`.
    pub fn entry_by_index(&self, index: u32) -> Result<DirectoryEntry> {
        let offset = *self
            .pointers
            .path_pointers
            .get(index as usize)
            .ok_or(Error::OutOfRange {
                what: "entry index",
                index: index as u64,
                len: self.pointers.path_pointers.len() as u64,
            })?;
        decode_directory_entry(self.source.as_ref(), offset)
    }

    /// Binary-searches the path-ordered pointer table for the entry whose
    /// fully-qualified path (`namespace ++ path`) equals `full_path` exactly.
    pub fn entry_by_path(&self, full_path: &str) -> Result<DirectoryEntry> {
        let pointers = &self.pointers.path_pointers;
        let mut lo = 0usize;
        let mut hi = pointers.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = decode_directory_entry(self.source.as_ref(), pointers[mid])?;
            if entry.fully_qualified_path().as_str() < full_path {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        if lo >= pointers.len() {
            return Err(Error::NotFound(full_path.to_string()));
        }

        let entry = decode_directory_entry(self.source.as_ref(), pointers[lo])?;
        if entry.fully_qualified_path() != full_path {
            return Err(Error::NotFound(full_path.to_string()));
        }

        Ok(entry)
    }

    pub fn entry_by_url(&self, namespace: Namespace, path: &str) -> Result<DirectoryEntry> {
        let full_path = format!("{}{}", namespace.as_char(), path);
        self.entry_by_path(&full_path)
    }

    pub fn main_page(&self) -> Result<DirectoryEntry> {
        let index = self.header.main_page.ok_or(Error::NoMainPage)?;
        self.entry_by_index(index)
    }

    /// Follows a redirect chain to a content entry, bounded by
    /// `max_redirect_hops`.
    pub fn resolve_redirect(&self, entry: DirectoryEntry) -> Result<DirectoryEntry> {
        let mut current = entry;
        let mut depth = 0u8;

        loop {
            match current {
                DirectoryEntry::Content(_) => return Ok(current),
                DirectoryEntry::Redirect(ref r) => {
                    if depth >= self.max_redirect_hops {
                        return Err(Error::MaxRedirectsExceeded(self.max_redirect_hops));
                    }
                    if depth + 1 == self.max_redirect_hops {
                        trace!(depth, "redirect chain approaching hop limit");
                    }
                    if r.redirect_index == INVALID_REDIRECT {
                        return Err(Error::InvalidRedirectTarget);
                    }
                    current = self.entry_by_index(r.redirect_index)?;
                    depth += 1;
                }
            }
        }
    }

    /// Reads the raw bytes of `entry`'s blob, resolving redirects first.
    pub fn content(&self, entry: DirectoryEntry) -> Result<Vec<u8>> {
        let resolved = self.resolve_redirect(entry)?;
        let content = resolved.as_content().expect("resolved entry is content");
        let cluster = self.cluster(content.cluster_number)?;
        Ok(cluster.blob(content.blob_number)?.to_vec())
    }

    pub fn mime_type(&self, entry: DirectoryEntry) -> Result<String> {
        let resolved = self.resolve_redirect(entry)?;
        let content = resolved.as_content().expect("resolved entry is content");
        self.mime_types
            .get(content.mime_type as usize)
            .cloned()
            .ok_or(Error::OutOfRange {
                what: "mime type index",
                index: content.mime_type as u64,
                len: self.mime_types.len() as u64,
            })
    }

    /// Reads a metadata value from namespace `M`, e.g. `"Title"`.
    pub fn metadata(&self, key: &str) -> Result<String> {
        let entry = self.entry_by_url(Namespace::METADATA, key)?;
        let bytes = self.content(entry)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Lists every entry whose fully-qualified path starts with `namespace`.
    ///
    /// Decoding is parallelized across the pointer table with `rayon`: this
    /// is the one engine operation the spec flags as linear in `entry_count`,
    /// and every entry decode is an independent positional read.
    pub fn list_by_namespace(&self, namespace: Namespace) -> Vec<DirectoryEntry> {
        let prefix = namespace.as_char();
        self.pointers
            .path_pointers
            .par_iter()
            .filter_map(|&offset| decode_directory_entry(self.source.as_ref(), offset).ok())
            .filter(|entry| entry.namespace().as_char() == prefix)
            .collect()
    }

    fn cluster_offset_and_size(&self, index: u32) -> Result<(u64, u64)> {
        let pointers = &self.pointers.cluster_pointers;
        let offset = *pointers.get(index as usize).ok_or(Error::OutOfRange {
            what: "cluster index",
            index: index as u64,
            len: pointers.len() as u64,
        })?;
        let end = pointers
            .get(index as usize + 1)
            .copied()
            .unwrap_or(self.header.checksum_pos);
        Ok((offset, end - offset))
    }

    fn cluster(&self, index: u32) -> Result<Arc<Cluster>> {
        let (offset, size) = self.cluster_offset_and_size(index)?;
        self.cluster_cache.get_or_load(index, || {
            Cluster::decode(self.source.as_ref(), offset, size)
        })
    }

    /// Hex-encoded MD5 digest stored in the trailing 16 bytes of the file.
    pub fn checksum(&self) -> Result<String> {
        let bytes = self.source.read_at(self.header.checksum_pos, 16)?;
        Ok(hex::encode(bytes))
    }

    /// Recomputes the MD5 digest over every byte preceding `checksum_pos`
    /// and compares it against the stored checksum. `O(file size)`.
    pub fn verify_checksum(&self) -> Result<bool> {
        let stored = self.source.read_at(self.header.checksum_pos, 16)?;

        const CHUNK: usize = 1 << 20;
        let mut hasher = Md5::new();
        let mut pos = 0u64;
        while pos < self.header.checksum_pos {
            let len = CHUNK.min((self.header.checksum_pos - pos) as usize);
            let chunk = self.source.read_at(pos, len)?;
            hasher.update(&chunk);
            pos += len as u64;
        }
        let computed = hasher.finalize();

        Ok(computed.as_slice() == stored.as_slice())
    }
}
