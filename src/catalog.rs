//! Process-wide, concurrency-safe registry of loaded archives.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::archive::Archive;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::fs::ZimFs;
use crate::index::IndexManager;
use crate::language::language_name;
use crate::metadata::{self, Metadata};

/// One archive as registered in the catalog: the opened archive, its
/// (optional, non-fatal-if-missing) title index manager, and its metadata.
pub struct LoadedArchive {
    pub name: String,
    pub path: std::path::PathBuf,
    pub archive: Archive,
    pub index: Option<IndexManager>,
    pub metadata: Metadata,
}

impl LoadedArchive {
    /// Builds a filesystem view over this archive, on demand.
    pub fn fs(&self) -> ZimFs<'_> {
        ZimFs::new(&self.archive)
    }
}

#[derive(Debug, Clone)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
}

/// A name → archive registry. Reads proceed in parallel; `load`/`unload`
/// are mutually exclusive with each other and with reads.
pub struct Catalog {
    archives: RwLock<HashMap<String, Arc<LoadedArchive>>>,
    config: EngineConfig,
}

impl Catalog {
    pub fn new(config: EngineConfig) -> Catalog {
        Catalog {
            archives: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Opens the archive at `path`, derives its registry name from the
    /// file name (minus the `.zim` extension), and inserts it, replacing
    /// any existing entry under that name.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let archive = Archive::open(path, &self.config)?;

        let name = derive_name(path);

        let index = match IndexManager::build(&archive) {
            Ok(mgr) => Some(mgr),
            Err(e) => {
                warn!(archive = %name, error = %e, "no search index for archive");
                None
            }
        };

        let metadata = metadata::extract_metadata(&archive, &name);

        let loaded = Arc::new(LoadedArchive {
            name: name.clone(),
            path: path.to_path_buf(),
            archive,
            index,
            metadata,
        });

        self.archives
            .write()
            .expect("catalog lock poisoned")
            .insert(name.clone(), loaded);

        info!(archive = %name, "loaded ZIM archive");
        Ok(())
    }

    pub fn unload(&self, name: &str) -> Result<()> {
        let removed = self
            .archives
            .write()
            .expect("catalog lock poisoned")
            .remove(name);

        match removed {
            Some(_) => {
                info!(archive = %name, "unloaded ZIM archive");
                Ok(())
            }
            None => Err(Error::ArchiveNotFound(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedArchive>> {
        self.archives
            .read()
            .expect("catalog lock poisoned")
            .get(name)
            .cloned()
    }

    /// All loaded archives, sorted case-insensitively by `metadata.title`.
    pub fn list(&self) -> Vec<Arc<LoadedArchive>> {
        let mut archives: Vec<_> = self
            .archives
            .read()
            .expect("catalog lock poisoned")
            .values()
            .cloned()
            .collect();
        archives.sort_by_key(|a| a.metadata.title.to_lowercase());
        archives
    }

    /// One entry per distinct non-`"MUL"` language code across loaded
    /// archives, sorted by display name.
    pub fn languages(&self) -> Vec<LanguageInfo> {
        let archives = self.archives.read().expect("catalog lock poisoned");

        let mut by_code: HashMap<String, String> = HashMap::new();
        for archive in archives.values() {
            if archive.metadata.language.is_empty() {
                continue;
            }
            let code = &archive.metadata.language_code;
            if code == "MUL" {
                continue;
            }
            by_code.entry(code.clone()).or_insert_with(|| {
                language_name(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| code.clone())
            });
        }

        let mut languages: Vec<_> = by_code
            .into_iter()
            .map(|(code, name)| LanguageInfo { code, name })
            .collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name));
        languages
    }

    /// Catalog-wide union of tags, looser than the per-archive `Category`
    /// field: any non-empty, non-`_`-prefixed tag qualifies (a leading
    /// `_category:` is stripped first if present). Preserved exactly as
    /// observed, not aligned with [`crate::metadata::extract_metadata`]'s
    /// stricter per-archive rule.
    pub fn categories(&self) -> Vec<String> {
        let archives = self.archives.read().expect("catalog lock poisoned");

        let mut categories = std::collections::HashSet::new();
        for archive in archives.values() {
            if archive.metadata.tags.is_empty() {
                continue;
            }
            for tag in archive.metadata.tags.split(';') {
                let tag = tag.trim();
                if tag.is_empty() {
                    continue;
                }
                let stripped = tag.strip_prefix("_category:").unwrap_or(tag);
                if !stripped.starts_with('_') {
                    categories.insert(metadata::capitalize_first(stripped));
                }
            }
        }

        let mut categories: Vec<_> = categories.into_iter().collect();
        categories.sort();
        categories
    }
}

fn derive_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
