//! Archive metadata (namespace `M`) extraction and derived fields.

use crate::archive::Archive;

/// Metadata extracted from an archive's namespace `M` entries, plus fields
/// derived from them.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub language: String,
    pub language_code: String,
    pub creator: String,
    pub publisher: String,
    pub date: String,
    pub tags: String,
    pub category: String,
    pub entry_count: u32,
}

const METADATA_KEYS: &[&str] = &[
    "Title",
    "Description",
    "Language",
    "Creator",
    "Publisher",
    "Date",
    "Tags",
];

/// Reads the well-known `M` namespace keys from `archive` and derives
/// `LanguageCode`/`Category`. `fallback_name` becomes `Title` when the
/// archive carries none (typically the archive's file-derived name).
pub fn extract_metadata(archive: &Archive, fallback_name: &str) -> Metadata {
    let mut metadata = Metadata {
        entry_count: archive.entry_count(),
        ..Default::default()
    };

    for key in METADATA_KEYS {
        if let Ok(value) = archive.metadata(key) {
            set_field(&mut metadata, key, value);
        }
    }

    if metadata.title.is_empty() {
        metadata.title = fallback_name.to_string();
    }

    if !metadata.language.is_empty() {
        metadata.language_code = if metadata.language.contains(',') || metadata.language.contains(';') {
            "MUL".to_string()
        } else {
            language_code(&metadata.language)
        };
    }

    metadata.category = extract_main_category(&metadata.tags);

    metadata
}

fn set_field(metadata: &mut Metadata, key: &str, value: String) {
    match key {
        "Title" => metadata.title = value,
        "Description" => metadata.description = value,
        "Language" => metadata.language = value,
        "Creator" => metadata.creator = value,
        "Publisher" => metadata.publisher = value,
        "Date" => metadata.date = value,
        "Tags" => metadata.tags = value,
        _ => unreachable!("unhandled metadata key: {key}"),
    }
}

/// Upper-cased two-letter code if `code` is already that short; otherwise
/// the upper-cased first `-`/`_`-delimited segment of a BCP-47-like tag.
fn language_code(code: &str) -> String {
    if code.chars().count() == 2 {
        return code.to_uppercase();
    }
    let base = code.split(['-', '_']).next().unwrap_or(code);
    base.to_uppercase()
}

/// First tag in `tags` (`;`-separated, trimmed) prefixed with `_category:`
/// whose residue itself doesn't start with `_`; else the first tag not
/// starting with `_`; else empty. Only the first letter is capitalized.
///
/// This asymmetry (strict `_category:` rule here vs. the looser,
/// prefix-stripping rule in [`crate::catalog`]'s catalog-wide category
/// union) is preserved exactly as observed, not "cleaned up".
fn extract_main_category(tags: &str) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let tag_list: Vec<&str> = tags.split(';').collect();

    for tag in &tag_list {
        let tag = tag.trim();
        if let Some(rest) = tag.strip_prefix("_category:") {
            if !rest.starts_with('_') {
                return capitalize_first(rest);
            }
        }
    }

    for tag in &tag_list {
        let tag = tag.trim();
        if !tag.is_empty() && !tag.starts_with('_') {
            return capitalize_first(tag);
        }
    }

    String::new()
}

/// Capitalizes only the first character; the rest of the string is untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_upcases_short_codes() {
        assert_eq!(language_code("en"), "EN");
    }

    #[test]
    fn language_code_takes_first_segment_of_long_tags() {
        assert_eq!(language_code("en-GB"), "EN");
        assert_eq!(language_code("zh_Hans"), "ZH");
    }

    #[test]
    fn extract_main_category_prefers_category_tag() {
        assert_eq!(
            extract_main_category("_category:wikipedia;other"),
            "Wikipedia"
        );
    }

    #[test]
    fn extract_main_category_skips_disqualified_category_tag() {
        assert_eq!(extract_main_category("_category:_hidden;plain"), "Plain");
    }

    #[test]
    fn extract_main_category_falls_back_to_first_plain_tag() {
        assert_eq!(extract_main_category("_internal;wiki;other"), "Wiki");
    }

    #[test]
    fn extract_main_category_empty_tags_is_empty() {
        assert_eq!(extract_main_category(""), "");
    }

    #[test]
    fn capitalize_first_only_touches_first_char() {
        assert_eq!(capitalize_first("wikipedia"), "Wikipedia");
        assert_eq!(capitalize_first(""), "");
    }
}
