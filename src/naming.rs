//! The archive's file-naming convention.
//!
//! Every cross-reference in the collection (image ↔ metadata ↔ manifest ↔
//! search document) is derived from the item identifier through the helpers
//! in this module, so independently-run stages always agree on names.
//!
//! ```text
//! source:   <id>_<last>_<first>_<subject>_<type>.docx      <id>_<...>.pdf
//! output:   <output_root>/<id>/image-<id>-NN.jpg
//!           <output_root>/<id>/description-<id>.md
//!           <output_root>/<id>/metadata-<id>.json
//! manifest: <manifest_root>/scan-<id>.json
//! ```

use crate::error::ItemError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifiers longer than this are scratch copies, not archival items.
pub const MAX_ID_LEN: usize = 4;

/// Short identifier of one physical item, e.g. `"123"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Validate a raw identifier token.
    ///
    /// Rejects empty tokens, tokens starting with `~` (editor lock files and
    /// withdrawn items) and tokens longer than [`MAX_ID_LEN`].
    pub fn parse(token: &str) -> Result<Self, ItemError> {
        let malformed = |reason: &str| ItemError::MalformedIdentifier {
            name: token.to_string(),
            reason: reason.to_string(),
        };
        if token.is_empty() {
            return Err(malformed("empty identifier"));
        }
        if token.starts_with('~') {
            return Err(malformed("identifier starts with '~'"));
        }
        if token.chars().count() > MAX_ID_LEN {
            return Err(malformed("identifier longer than 4 characters"));
        }
        Ok(ItemId(token.to_string()))
    }

    /// Identifier of a source document: the first `_`-delimited token of its
    /// file name, extension removed.
    pub fn from_file_name(file_name: &str) -> Result<Self, ItemError> {
        let stem = strip_extension(file_name);
        let token = stem.split('_').next().unwrap_or_default();
        Self::parse(token).map_err(|_| ItemError::MalformedIdentifier {
            name: file_name.to_string(),
            reason: format!("'{token}' is not a usable item identifier"),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used to look the item up in the override table.
    pub fn override_key(&self) -> String {
        normalise_override_key(&self.0)
    }

    /// Globally unique record id, `scan-<id>`.
    pub fn record_id(&self) -> String {
        format!("scan-{}", self.0)
    }

    /// `<output_root>/<id>/`
    pub fn item_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.0)
    }

    /// Prefix shared by every page image of the item, `image-<id>-`.
    pub fn image_prefix(&self) -> String {
        format!("image-{}-", self.0)
    }

    /// printf-style pattern handed to the rasteriser, `image-<id>-%02d.jpg`.
    pub fn image_pattern(&self) -> String {
        format!("image-{}-%02d.jpg", self.0)
    }

    /// Name of one page image, `image-<id>-NN.jpg`.
    pub fn image_file_name(&self, page: usize) -> String {
        format!("image-{}-{:02}.jpg", self.0, page)
    }

    pub fn description_file_name(&self) -> String {
        format!("description-{}.md", self.0)
    }

    pub fn metadata_file_name(&self) -> String {
        format!("metadata-{}.json", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalise an identifier for override-table lookup.
///
/// All-digit identifiers are compared numerically (`"012"` and `"12"` are
/// the same item). Anything else is its own key, kept verbatim.
pub fn normalise_override_key(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let trimmed = raw.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        raw.to_string()
    }
}

fn strip_extension(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Fields encoded in a description document's file name:
/// `<identifier>_<lastName>_<firstName>_<subject>_<type>.docx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionName {
    pub id: ItemId,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub subject: Option<String>,
    pub kind: Option<String>,
}

impl DescriptionName {
    pub fn parse(file_name: &str) -> Result<Self, ItemError> {
        let id = ItemId::from_file_name(file_name)?;
        let stem = strip_extension(file_name);
        let mut tokens = stem.split('_').skip(1).map(|t| {
            let t = t.trim();
            (!t.is_empty()).then(|| t.to_string())
        });
        Ok(Self {
            id,
            last_name: tokens.next().flatten(),
            first_name: tokens.next().flatten(),
            subject: tokens.next().flatten(),
            kind: tokens.next().flatten(),
        })
    }

    /// `"<lastName>, <firstName>"`, joining only the parts present.
    pub fn creator(&self) -> Option<String> {
        let parts: Vec<&str> = [self.last_name.as_deref(), self.first_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

static RE_BINDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Binder(\d+)").unwrap());

/// Binder label for a source path, e.g. `.../Binder9/Scans/x.pdf` → `"Binder 9"`.
pub fn binder_label(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    RE_BINDER
        .captures(&text)
        .map(|caps| format!("Binder {}", &caps[1]))
}

static RE_PAGE_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)$").unwrap());

/// Numeric page index at the end of an image stem, `image-42-07` → `7`.
pub fn page_index(stem: &str) -> Option<u32> {
    RE_PAGE_INDEX
        .captures(stem)
        .and_then(|caps| caps[1].parse().ok())
}

/// Manifest file name for a metadata file name: `metadata-` becomes `scan-`.
pub fn manifest_file_name(metadata_file_name: &str) -> String {
    match metadata_file_name.strip_prefix("metadata-") {
        Some(rest) => format!("scan-{rest}"),
        None => metadata_file_name.to_string(),
    }
}

/// Item number used by the exporter: the second `-` token of a file name,
/// `image-812-03.jpg` → `812`, `metadata-812.json` → `812`.
pub fn export_index(file_name: &str) -> Option<u64> {
    let stem = strip_extension(file_name);
    stem.split('-').nth(1).and_then(|t| t.trim().parse().ok())
}

/// Fields encoded in a notebook transcript name: `entry<N>_book<M>-<subject>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookName {
    pub entry: u32,
    pub book: u32,
    /// Book number as written in the file name, `02` stays `02`.
    pub book_token: String,
    pub subject: Option<String>,
}

impl NotebookName {
    pub fn parse(file_name: &str) -> Result<Self, ItemError> {
        let malformed = |reason: &str| ItemError::MalformedIdentifier {
            name: file_name.to_string(),
            reason: reason.to_string(),
        };
        let stem = strip_extension(file_name);
        let (cat, subject) = match stem.split_once('-') {
            Some((cat, subject)) => (cat, Some(subject.trim()).filter(|s| !s.is_empty())),
            None => (stem, None),
        };
        let mut parts = cat.split('_');
        let entry = parts
            .next()
            .and_then(|t| t.strip_prefix("entry"))
            .and_then(|n| n.trim().parse::<u32>().ok())
            .ok_or_else(|| malformed("expected 'entry<N>' as first token"))?;
        let book_token = parts
            .next()
            .and_then(|t| t.strip_prefix("book"))
            .map(str::trim)
            .unwrap_or_default();
        let book = book_token
            .parse::<u32>()
            .map_err(|_| malformed("expected 'book<M>' as second token"))?;
        Ok(Self {
            entry,
            book,
            book_token: book_token.to_string(),
            subject: subject.map(str::to_string),
        })
    }

    /// `notebook-<MM>-<NN>`
    pub fn id(&self) -> String {
        format!("notebook-{:02}-{:02}", self.book, self.entry)
    }

    /// `Notebook <M>, Entry <N>, <subject>`, with `<M>` as written.
    pub fn label(&self) -> String {
        match self.subject {
            Some(ref subject) => format!("{}, Entry {}, {}", self.within(), self.entry, subject),
            None => format!("{}, Entry {}", self.within(), self.entry),
        }
    }

    /// `Notebook <M>`, with `<M>` as written.
    pub fn within(&self) -> String {
        format!("Notebook {}", self.book_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_first_token() {
        let id = ItemId::from_file_name("123_Doe_Jane_Botany_Letter.docx").unwrap();
        assert_eq!(id.as_str(), "123");
        assert_eq!(id.record_id(), "scan-123");
        let id = ItemId::from_file_name("0042_scan.pdf").unwrap();
        assert_eq!(id.as_str(), "0042");
    }

    #[test]
    fn long_or_tilde_identifiers_are_malformed() {
        assert!(matches!(
            ItemId::from_file_name("12345_Doe_Jane.docx"),
            Err(ItemError::MalformedIdentifier { .. })
        ));
        assert!(ItemId::from_file_name("~$12_Doe_Jane.docx").is_err());
        assert!(ItemId::from_file_name("_Doe.docx").is_err());
    }

    #[test]
    fn derived_names() {
        let id = ItemId::parse("42").unwrap();
        assert_eq!(id.image_pattern(), "image-42-%02d.jpg");
        assert_eq!(id.image_file_name(3), "image-42-03.jpg");
        assert_eq!(id.description_file_name(), "description-42.md");
        assert_eq!(id.metadata_file_name(), "metadata-42.json");
        assert_eq!(manifest_file_name(&id.metadata_file_name()), "scan-42.json");
    }

    #[test]
    fn override_keys_compare_numerically() {
        assert_eq!(normalise_override_key("012"), "12");
        assert_eq!(normalise_override_key("12"), "12");
        assert_eq!(normalise_override_key("000"), "0");
        assert_eq!(normalise_override_key("12a"), "12a");
        assert_eq!(normalise_override_key(" 7 "), "7");
    }

    #[test]
    fn description_name_tokens() {
        let name = DescriptionName::parse("123_Doe_Jane_Zoology_Letter.docx").unwrap();
        assert_eq!(name.creator().as_deref(), Some("Doe, Jane"));
        assert_eq!(name.subject.as_deref(), Some("Zoology"));
        assert_eq!(name.kind.as_deref(), Some("Letter"));

        let short = DescriptionName::parse("9_Doe.docx").unwrap();
        assert_eq!(short.creator().as_deref(), Some("Doe"));
        assert_eq!(short.subject, None);
        assert_eq!(short.kind, None);
    }

    #[test]
    fn binder_is_detected_in_path() {
        let path = Path::new("Meyers Natural History_Binders/Binder9/12_Doe_Jane.docx");
        assert_eq!(binder_label(path).as_deref(), Some("Binder 9"));
        let path = Path::new("Binder12/x.docx");
        assert_eq!(binder_label(path).as_deref(), Some("Binder 12"));
        assert_eq!(binder_label(Path::new("loose/x.docx")), None);
    }

    #[test]
    fn page_index_from_stem() {
        assert_eq!(page_index("image-42-07"), Some(7));
        assert_eq!(page_index("image-42-10"), Some(10));
        assert_eq!(page_index("cover"), None);
    }

    #[test]
    fn export_index_second_token() {
        assert_eq!(export_index("image-812-03.jpg"), Some(812));
        assert_eq!(export_index("metadata-812.json"), Some(812));
        assert_eq!(export_index("cover.jpg"), None);
    }

    #[test]
    fn notebook_name() {
        let name = NotebookName::parse("entry3_book12-Birds.md").unwrap();
        assert_eq!(name.id(), "notebook-12-03");
        assert_eq!(name.label(), "Notebook 12, Entry 3, Birds");
        assert_eq!(name.within(), "Notebook 12");

        let bare = NotebookName::parse("entry10_book2_ycba.md").unwrap();
        assert_eq!(bare.id(), "notebook-02-10");
        assert_eq!(bare.label(), "Notebook 2, Entry 10");

        assert!(NotebookName::parse("notes-Birds.md").is_err());
        assert!(NotebookName::parse("entry3_bookX-Birds.md").is_err());
        assert!(NotebookName::parse("entry3-Birds.md").is_err());
        assert!(NotebookName::parse("entryX_book2-Birds.md").is_err());
    }

    #[test]
    fn notebook_label_keeps_book_number_as_written() {
        let name = NotebookName::parse("entry03_book02-Herons.md").unwrap();
        assert_eq!(name.id(), "notebook-02-03");
        assert_eq!(name.label(), "Notebook 02, Entry 3, Herons");
        assert_eq!(name.within(), "Notebook 02");
    }
}
