//! URL-style path resolution over an archive, with the reference reader's
//! multi-namespace fallback cascade.

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::archive::Archive;
use crate::entry::{DirectoryEntry, EntryInfo};
use crate::error::{Error, Result};
use crate::namespace::Namespace;

/// Metadata about a resolved filesystem entry, mirroring the reference
/// reader's `FileInfo`.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// A seekable view over resolved content bytes.
pub struct FileView {
    info: FileInfo,
    cursor: Cursor<Vec<u8>>,
}

impl FileView {
    pub fn info(&self) -> &FileInfo {
        &self.info
    }
}

impl Read for FileView {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for FileView {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// Maps URL-style resource paths onto an [`Archive`].
pub struct ZimFs<'a> {
    archive: &'a Archive,
}

impl<'a> ZimFs<'a> {
    pub fn new(archive: &'a Archive) -> ZimFs<'a> {
        ZimFs { archive }
    }

    /// Looks up the raw entry for `name` without following redirects, so a
    /// caller can emit a redirect response of its own.
    pub fn get_entry(&self, name: &str) -> Result<DirectoryEntry> {
        self.search_entry_from_url(name)
    }

    /// Resolves `name` to a readable, seekable byte view. `"."` is a
    /// synthetic empty directory; `"index.html"` resolves the main page.
    pub fn open(&self, name: &str) -> Result<FileView> {
        match name {
            "." => Ok(FileView {
                info: FileInfo {
                    name: ".".to_string(),
                    is_dir: true,
                    size: 0,
                },
                cursor: Cursor::new(Vec::new()),
            }),
            "index.html" => {
                let main_page = self.archive.main_page()?;
                self.serve_entry(main_page.path())
            }
            other => self.serve_entry(other),
        }
    }

    fn serve_entry(&self, name: &str) -> Result<FileView> {
        let entry = self.search_entry_from_url(name)?;
        let content = self.archive.content(entry)?;

        let filename = name.rsplit('/').next().unwrap_or(name).to_string();
        Ok(FileView {
            info: FileInfo {
                name: filename,
                is_dir: false,
                size: content.len() as u64,
            },
            cursor: Cursor::new(content),
        })
    }

    /// Namespace-fallback cascade: binary-search `C`, then `W`/`M`/`X`,
    /// then a linear scan of `C` by raw path, then a linear scan of `W`.
    fn search_entry_from_url(&self, url: &str) -> Result<DirectoryEntry> {
        if let Ok(entry) = self.archive.entry_by_url(Namespace::CONTENT, url) {
            return Ok(entry);
        }

        for ns in [Namespace::WELL_KNOWN, Namespace::METADATA, Namespace::INDEX] {
            if let Ok(entry) = self.archive.entry_by_url(ns, url) {
                return Ok(entry);
            }
        }

        let content_entries = self.archive.list_by_namespace(Namespace::CONTENT);
        if let Some(entry) = content_entries.into_iter().find(|e| e.path() == url) {
            return Ok(entry);
        }

        let well_known_entries = self.archive.list_by_namespace(Namespace::WELL_KNOWN);
        if let Some(entry) = well_known_entries.into_iter().find(|e| e.path() == url) {
            return Ok(entry);
        }

        Err(Error::NotFound(url.to_string()))
    }
}
