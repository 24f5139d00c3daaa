//! A single title-ordered index (v0 or v1), wrapping a packed `u32` array
//! of entry indices.

use byteorder::{ByteOrder, LittleEndian};

use crate::archive::Archive;
use crate::entry::{DirectoryEntry, EntryInfo};
use crate::error::{Error, Result};
use crate::namespace::Namespace;

/// One scored hit from [`TitleIndex::search`] or [`TitleIndex::search_by_title`].
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Position within the index array this hit came from.
    pub index: u32,
    pub entry: DirectoryEntry,
    pub score: f64,
}

/// A title-ordered listing: a flat array of entry indices, read once from
/// namespace `X`.
pub struct TitleIndex {
    entries: Vec<u32>,
}

impl TitleIndex {
    /// Loads the packed `u32` index payload stored at `X/{path}`.
    pub fn load(archive: &Archive, path: &str) -> Result<TitleIndex> {
        let entry = archive.entry_by_url(Namespace::INDEX, path)?;
        let content = archive.content(entry)?;

        if content.len() % 4 != 0 {
            return Err(Error::InvalidIndexSize(content.len()));
        }

        let entries = (0..content.len() / 4)
            .map(|i| LittleEndian::read_u32(&content[i * 4..i * 4 + 4]))
            .collect();

        Ok(TitleIndex { entries })
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Returns the directory entry at array position `position`, not the
    /// entry at that raw index.
    pub fn get_entry(&self, archive: &Archive, position: usize) -> Result<DirectoryEntry> {
        let entry_index = *self
            .entries
            .get(position)
            .ok_or(Error::OutOfRange {
                what: "title index position",
                index: position as u64,
                len: self.entries.len() as u64,
            })?;
        archive.entry_by_index(entry_index)
    }

    /// Scored substring search over every entry in the index.
    pub fn search(&self, archive: &Archive, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let mut results = Vec::with_capacity(max_results * 2);
        let mut seen = std::collections::HashSet::new();

        for (i, &entry_index) in self.entries.iter().enumerate() {
            let entry = match archive.entry_by_index(entry_index) {
                Ok(e) => e,
                Err(_) => continue,
            };
            let resolved = match archive.resolve_redirect(entry.clone()) {
                Ok(e) => e,
                Err(_) => continue,
            };

            let title = entry.title().to_lowercase();
            let path = entry.path().to_lowercase();
            let score = calculate_score(&query, &title, &path);

            if score > 0.0 {
                let key = resolved.fully_qualified_path();
                if seen.insert(key) {
                    results.push(SearchResult {
                        index: i as u32,
                        entry: resolved,
                        score,
                    });
                }
            }
        }

        sort_by_score_desc(&mut results);
        results.truncate(max_results);
        Ok(results)
    }

    /// Prefix search via binary search on the (already title-sorted) index.
    pub fn search_by_title(
        &self,
        archive: &Archive,
        title_prefix: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let prefix = title_prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let mut results = Vec::with_capacity(max_results);
        let mut seen = std::collections::HashSet::new();
        let start = self.binary_search_title(archive, &prefix);

        let mut i = start;
        while i < self.entries.len() && results.len() < max_results {
            let entry = match archive.entry_by_index(self.entries[i]) {
                Ok(e) => e,
                Err(_) => {
                    i += 1;
                    continue;
                }
            };

            let title = entry.title().to_lowercase();
            if !title.starts_with(&prefix) {
                break;
            }

            let resolved = match archive.resolve_redirect(entry) {
                Ok(e) => e,
                Err(_) => {
                    i += 1;
                    continue;
                }
            };

            let key = resolved.fully_qualified_path();
            if seen.insert(key) {
                results.push(SearchResult {
                    index: i as u32,
                    entry: resolved,
                    score: 1.0,
                });
            }
            i += 1;
        }

        sort_by_score_desc(&mut results);
        Ok(results)
    }

    fn binary_search_title(&self, archive: &Archive, prefix: &str) -> usize {
        let mut lo = 0usize;
        let mut hi = self.entries.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let title = match archive.entry_by_index(self.entries[mid]) {
                Ok(e) => e.title().to_lowercase(),
                Err(_) => {
                    lo = mid + 1;
                    continue;
                }
            };
            if title.as_str() < prefix {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        lo
    }
}

fn calculate_score(query: &str, title: &str, path: &str) -> f64 {
    let mut score = 0.0;

    if title == query {
        score += 10.0;
    }
    if title.starts_with(query) {
        score += 5.0;
    }
    if title.contains(query) {
        score += 2.0;
    }
    if path.contains(query) {
        score += 0.5;
    }

    let query_words: Vec<&str> = query.split_whitespace().collect();
    let title_words: Vec<&str> = title.split_whitespace().collect();

    let matched = query_words
        .iter()
        .filter(|qw| title_words.iter().any(|tw| tw.contains(*qw)))
        .count();

    if !query_words.is_empty() {
        score += matched as f64 / query_words.len() as f64;
    }

    score
}

fn sort_by_score_desc(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}
