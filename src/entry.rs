//! Directory entries: the per-URL metadata record pointing at either a
//! blob (content) or another entry (redirect).

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::namespace::Namespace;
use crate::source::Source;

/// MIME-type sentinel marking a redirect entry.
const MIME_REDIRECT: u16 = 0xFFFF;
/// Deprecated "linktarget" entry kind.
const MIME_LINK_TARGET: u16 = 0xFFFE;
/// Deprecated "deleted entry" kind.
const MIME_DELETED: u16 = 0xFFFD;

/// Sentinel `redirect_index` meaning "invalid target".
pub const INVALID_REDIRECT: u32 = 0xFFFF_FFFF;

/// Capability shared by both entry variants.
pub trait EntryInfo {
    fn namespace(&self) -> Namespace;
    fn path(&self) -> &str;
    fn title(&self) -> &str;
    fn is_redirect(&self) -> bool;

    /// The namespace byte followed by the path, e.g. `"CArticle/Cat"`.
    fn fully_qualified_path(&self) -> String {
        format!("{}{}", self.namespace().as_char(), self.path())
    }
}

#[derive(Debug, Clone)]
pub struct ContentEntry {
    pub namespace: Namespace,
    pub mime_type: u16,
    pub revision: u32,
    pub cluster_number: u32,
    pub blob_number: u32,
    pub path: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct RedirectEntry {
    pub namespace: Namespace,
    pub revision: u32,
    pub redirect_index: u32,
    pub path: String,
    pub title: String,
}

/// A directory entry: either content pointing at a cluster/blob, or a
/// redirect pointing at another entry index.
#[derive(Debug, Clone)]
pub enum DirectoryEntry {
    Content(ContentEntry),
    Redirect(RedirectEntry),
}

impl EntryInfo for DirectoryEntry {
    fn namespace(&self) -> Namespace {
        match self {
            DirectoryEntry::Content(c) => c.namespace,
            DirectoryEntry::Redirect(r) => r.namespace,
        }
    }

    fn path(&self) -> &str {
        match self {
            DirectoryEntry::Content(c) => &c.path,
            DirectoryEntry::Redirect(r) => &r.path,
        }
    }

    fn title(&self) -> &str {
        match self {
            DirectoryEntry::Content(c) => &c.title,
            DirectoryEntry::Redirect(r) => &r.title,
        }
    }

    fn is_redirect(&self) -> bool {
        matches!(self, DirectoryEntry::Redirect(_))
    }
}

impl DirectoryEntry {
    pub fn as_content(&self) -> Option<&ContentEntry> {
        match self {
            DirectoryEntry::Content(c) => Some(c),
            DirectoryEntry::Redirect(_) => None,
        }
    }
}

/// Decodes one directory entry at an absolute file offset.
///
/// Reads a 256-byte window up front; if either zero-terminated string
/// would run past it, a second, larger read starting right after the
/// fixed-size prefix is issued before giving up with [`Error::StringTooLong`].
pub fn decode_directory_entry(source: &dyn Source, offset: u64) -> Result<DirectoryEntry> {
    let buf = source.read_at(offset, 256)?;

    let mime_type = LittleEndian::read_u16(&buf[0..2]);
    // buf[2] is the (unused) parameter-length byte.
    let namespace = Namespace(buf[3]);

    if mime_type == MIME_LINK_TARGET || mime_type == MIME_DELETED {
        return Err(Error::DeprecatedEntry(mime_type));
    }

    if mime_type == MIME_REDIRECT {
        let revision = LittleEndian::read_u32(&buf[4..8]);
        let redirect_index = LittleEndian::read_u32(&buf[8..12]);
        let prefix_len = 12u64;
        let (path, title) = read_two_cstrings(source, offset, prefix_len, &buf[prefix_len as usize..])?;
        Ok(DirectoryEntry::Redirect(RedirectEntry {
            namespace,
            revision,
            redirect_index,
            title: normalize_title(title, &path),
            path,
        }))
    } else {
        let revision = LittleEndian::read_u32(&buf[4..8]);
        let cluster_number = LittleEndian::read_u32(&buf[8..12]);
        let blob_number = LittleEndian::read_u32(&buf[12..16]);
        let prefix_len = 16u64;
        let (path, title) = read_two_cstrings(source, offset, prefix_len, &buf[prefix_len as usize..])?;
        Ok(DirectoryEntry::Content(ContentEntry {
            namespace,
            mime_type,
            revision,
            cluster_number,
            blob_number,
            title: normalize_title(title, &path),
            path,
        }))
    }
}

/// `path`/`title` are zero-terminated and back to back. `initial` is
/// whatever of the original 256-byte read remains after the fixed prefix;
/// if it doesn't contain both terminators, a fresh 512-byte read starting
/// right after the prefix is tried before failing.
fn read_two_cstrings(
    source: &dyn Source,
    offset: u64,
    prefix_len: u64,
    initial: &[u8],
) -> Result<(String, String)> {
    if let Some((path, title)) = try_parse_two(initial) {
        return Ok((path?, title?));
    }

    let buf = source.read_at(offset + prefix_len, 512)?;
    if let Some((path, title)) = try_parse_two(&buf) {
        return Ok((path?, title?));
    }

    Err(Error::StringTooLong)
}

type CStringResult = Result<String>;

fn try_parse_two(buf: &[u8]) -> Option<(CStringResult, CStringResult)> {
    let path_end = buf.iter().position(|&b| b == 0)?;
    let title_start = path_end + 1;
    let title_end = buf[title_start..].iter().position(|&b| b == 0)? + title_start;

    let path = String::from_utf8(buf[..path_end].to_vec()).map_err(Error::from);
    let title = String::from_utf8(buf[title_start..title_end].to_vec()).map_err(Error::from);
    Some((path, title))
}

/// If `title` is empty or the literal string `"null"`, the path is used
/// instead. This works around a known bug in some ZIM producers and is
/// preserved exactly as observed, not "fixed".
fn normalize_title(title: String, path: &str) -> String {
    if title.is_empty() || title == "null" {
        path.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MmapSource;
    use std::io::Write;

    fn content_entry_bytes(mime: u16, ns: u8, cluster: u32, blob: u32, path: &str, title: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 16];
        LittleEndian::write_u16(&mut buf[0..2], mime);
        buf[2] = 0;
        buf[3] = ns;
        LittleEndian::write_u32(&mut buf[4..8], 0);
        LittleEndian::write_u32(&mut buf[8..12], cluster);
        LittleEndian::write_u32(&mut buf[12..16], blob);
        buf.extend_from_slice(path.as_bytes());
        buf.push(0);
        buf.extend_from_slice(title.as_bytes());
        buf.push(0);
        buf.resize(256.max(buf.len()), 0);
        buf
    }

    #[test]
    fn decodes_content_entry() {
        let buf = content_entry_bytes(0, b'C', 1, 2, "a", "Article A");
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        let src = MmapSource::open(tmp.path()).unwrap();
        let entry = decode_directory_entry(&src, 0).unwrap();
        match entry {
            DirectoryEntry::Content(c) => {
                assert_eq!(c.namespace, Namespace::CONTENT);
                assert_eq!(c.cluster_number, 1);
                assert_eq!(c.blob_number, 2);
                assert_eq!(c.path, "a");
                assert_eq!(c.title, "Article A");
            }
            DirectoryEntry::Redirect(_) => panic!("expected content entry"),
        }
    }

    #[test]
    fn empty_or_null_title_falls_back_to_path() {
        let buf = content_entry_bytes(0, b'C', 1, 2, "a/path", "null");
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        let src = MmapSource::open(tmp.path()).unwrap();
        let entry = decode_directory_entry(&src, 0).unwrap();
        assert_eq!(entry.title(), "a/path");
    }

    #[test]
    fn rejects_deprecated_entry_kinds() {
        let buf = content_entry_bytes(0xFFFE, b'C', 0, 0, "a", "");
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        let src = MmapSource::open(tmp.path()).unwrap();
        assert!(matches!(
            decode_directory_entry(&src, 0),
            Err(Error::DeprecatedEntry(0xFFFE))
        ));
    }

    #[test]
    fn decodes_redirect_entry() {
        let mut buf = vec![0u8; 12];
        LittleEndian::write_u16(&mut buf[0..2], MIME_REDIRECT);
        buf[3] = b'C';
        LittleEndian::write_u32(&mut buf[4..8], 0);
        LittleEndian::write_u32(&mut buf[8..12], 7);
        buf.extend_from_slice(b"b\0Title B\0");
        buf.resize(256.max(buf.len()), 0);
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        let src = MmapSource::open(tmp.path()).unwrap();
        let entry = decode_directory_entry(&src, 0).unwrap();
        assert!(entry.is_redirect());
        match entry {
            DirectoryEntry::Redirect(r) => assert_eq!(r.redirect_index, 7),
            _ => panic!("expected redirect"),
        }
    }
}
