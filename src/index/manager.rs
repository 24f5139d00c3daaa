//! Selects between the v0 and v1 title indexes and serves search and
//! random-entry requests over whichever is available.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::archive::Archive;
use crate::entry::{DirectoryEntry, EntryInfo};
use crate::error::{Error, Result};
use crate::index::title_index::{SearchResult, TitleIndex};

const TITLE_V0_PATH: &str = "listing/titleOrdered/v0";
const TITLE_V1_PATH: &str = "listing/titleOrdered/v1";

const RANDOM_ARTICLE_MAX_ATTEMPTS: usize = 100;
const RANDOM_MANY_ATTEMPTS_PER_ITEM: usize = 10;

/// Owns whichever title indexes an archive carries, and serves search and
/// random-draw requests against them. v1 (articles only) is preferred over
/// v0 (all content namespaces) wherever both exist.
pub struct IndexManager {
    title_v0: Option<TitleIndex>,
    title_v1: Option<TitleIndex>,
    rng: Mutex<StdRng>,
}

impl IndexManager {
    /// Builds a manager from whichever of the two title indexes the
    /// archive has. Fails only if neither is present.
    pub fn build(archive: &Archive) -> Result<IndexManager> {
        let title_v0 = TitleIndex::load(archive, TITLE_V0_PATH).ok();
        let title_v1 = TitleIndex::load(archive, TITLE_V1_PATH).ok();

        if title_v0.is_none() && title_v1.is_none() {
            return Err(Error::IndexUnavailable);
        }

        Ok(IndexManager {
            title_v0,
            title_v1,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn has_title_v0(&self) -> bool {
        self.title_v0.is_some()
    }

    pub fn has_title_v1(&self) -> bool {
        self.title_v1.is_some()
    }

    fn preferred(&self) -> Result<&TitleIndex> {
        self.title_v1
            .as_ref()
            .or(self.title_v0.as_ref())
            .ok_or(Error::IndexUnavailable)
    }

    pub fn search(&self, archive: &Archive, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.preferred()?.search(archive, query, max_results)
    }

    pub fn search_by_title(
        &self,
        archive: &Archive,
        title_prefix: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        self.preferred()?.search_by_title(archive, title_prefix, max_results)
    }

    /// Searches the article-only (v1) index specifically.
    pub fn search_articles(&self, archive: &Archive, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.title_v1
            .as_ref()
            .ok_or(Error::IndexUnavailable)?
            .search(archive, query, max_results)
    }

    /// Draws a single random entry, retrying up to 100 times on a
    /// transient per-position failure.
    pub fn random_article(&self, archive: &Archive) -> Result<DirectoryEntry> {
        let index = self.preferred()?;
        let size = index.size();
        if size == 0 {
            return Err(Error::RandomExhausted("article"));
        }

        for _ in 0..RANDOM_ARTICLE_MAX_ATTEMPTS {
            let pos = self.rng.lock().expect("index rng mutex poisoned").gen_range(0..size);
            let entry = match index.get_entry(archive, pos) {
                Ok(e) => e,
                Err(_) => continue,
            };
            if let Ok(resolved) = archive.resolve_redirect(entry) {
                return Ok(resolved);
            }
        }

        Err(Error::RandomExhausted("article"))
    }

    /// Draws up to `count` distinct random articles from the v1 index,
    /// retrying at most `10 * count` times overall. Returns whatever was
    /// accumulated when the retry budget runs out, and fails only if
    /// nothing was found at all.
    pub fn random_many(&self, archive: &Archive, count: usize) -> Result<Vec<DirectoryEntry>> {
        let index = self.title_v1.as_ref().ok_or(Error::IndexUnavailable)?;
        let size = index.size();
        if size == 0 {
            return Err(Error::RandomExhausted("article"));
        }
        let count = count.min(size);

        let mut entries = Vec::with_capacity(count);
        let mut used = std::collections::HashSet::new();
        let mut seen_keys = std::collections::HashSet::new();
        let max_attempts = count * RANDOM_MANY_ATTEMPTS_PER_ITEM;

        let mut attempt = 0;
        while entries.len() < count && attempt < max_attempts {
            attempt += 1;

            let pos = self.rng.lock().expect("index rng mutex poisoned").gen_range(0..size);
            if !used.insert(pos) {
                continue;
            }

            let entry = match index.get_entry(archive, pos) {
                Ok(e) => e,
                Err(_) => continue,
            };
            let resolved = match archive.resolve_redirect(entry) {
                Ok(e) => e,
                Err(_) => continue,
            };

            let key = resolved.fully_qualified_path();
            if !seen_keys.insert(key) {
                continue;
            }

            entries.push(resolved);
        }

        if entries.is_empty() {
            return Err(Error::RandomExhausted("articles"));
        }

        Ok(entries)
    }
}
