//! Manually corrected metadata, loaded once per assembly run.
//!
//! The table is tab-separated with the columns
//! `binder, id, creator, subject, type, description, institution, other`.
//! Empty cells mean "no correction": the assembler falls back to the value
//! parsed from the file name or description.

use crate::error::{ArchiveError, ItemError};
use crate::naming::{normalise_override_key, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const MIN_COLUMNS: usize = 7;

/// Corrections for one item. `None` means "fall back".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub creator: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub institution: Option<String>,
}

/// Override rows keyed by normalised item identifier.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rows: HashMap<String, OverrideRecord>,
}

impl OverrideTable {
    /// Load the table from disk. A missing or unreadable table is fatal.
    ///
    /// Returns the table together with one [`ItemError::MalformedOverrideRow`]
    /// per rejected row.
    pub fn load(path: &Path) -> Result<(Self, Vec<ItemError>), ArchiveError> {
        if !path.exists() {
            return Err(ArchiveError::OverrideTableMissing {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read(path).map_err(|source| ArchiveError::OverrideTableRead {
            path: path.to_path_buf(),
            source,
        })?;
        // Spreadsheet exports are not always UTF-8.
        let text = String::from_utf8_lossy(&raw);
        let (table, rejected) = Self::parse(&text);
        info!(
            path = %path.display(),
            rows = table.len(),
            rejected = rejected.len(),
            "loaded override table"
        );
        Ok((table, rejected))
    }

    /// Parse tab-separated text. Later rows for the same id replace earlier ones.
    pub fn parse(text: &str) -> (Self, Vec<ItemError>) {
        let mut rows = HashMap::new();
        let mut rejected = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < MIN_COLUMNS {
                rejected.push(ItemError::MalformedOverrideRow {
                    line: line_no,
                    reason: format!(
                        "expected at least {MIN_COLUMNS} tab-separated columns, found {}",
                        cols.len()
                    ),
                });
                continue;
            }
            let id = cols[1].trim();
            if id.eq_ignore_ascii_case("id") {
                debug!(line = line_no, "skipping header row");
                continue;
            }
            if id.is_empty() {
                rejected.push(ItemError::MalformedOverrideRow {
                    line: line_no,
                    reason: "empty id column".into(),
                });
                continue;
            }
            rows.insert(
                normalise_override_key(id),
                OverrideRecord {
                    creator: cell(cols[2]),
                    subject: cell(cols[3]),
                    description: cell(cols[5]),
                    institution: cell(cols[6]),
                },
            );
        }

        (Self { rows }, rejected)
    }

    pub fn get(&self, id: &ItemId) -> Option<&OverrideRecord> {
        self.rows.get(&id.override_key())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell(raw: &str) -> Option<String> {
    let v = raw.trim();
    (!v.is_empty()).then(|| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "binder\tid\tcreator\tsubject\ttype\tdescription\tinstitution\tother\n\
        Binder 9\t012\tBartram, William\tBotany\tDrawing\tA fern\tNatural History Museum\t\n\
        Binder 9\t13\t\t\tDrawing\t\tLinnean Society\tnotes\r\n\
        broken row\n";

    #[test]
    fn parses_rows_and_reports_malformed() {
        let (table, rejected) = OverrideTable::parse(TABLE);
        assert_eq!(table.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0],
            ItemError::MalformedOverrideRow { line: 4, .. }
        ));
    }

    #[test]
    fn lookup_normalises_numeric_ids() {
        let (table, _) = OverrideTable::parse(TABLE);
        let row = table.get(&ItemId::parse("12").unwrap()).unwrap();
        assert_eq!(row.creator.as_deref(), Some("Bartram, William"));
        assert_eq!(row.subject.as_deref(), Some("Botany"));
        assert_eq!(row.description.as_deref(), Some("A fern"));
        assert_eq!(row.institution.as_deref(), Some("Natural History Museum"));
        assert!(table.get(&ItemId::parse("0012").unwrap()).is_some());
    }

    #[test]
    fn empty_cells_are_absent() {
        let (table, _) = OverrideTable::parse(TABLE);
        let row = table.get(&ItemId::parse("13").unwrap()).unwrap();
        assert_eq!(row.creator, None);
        assert_eq!(row.subject, None);
        assert_eq!(row.institution.as_deref(), Some("Linnean Society"));
    }

    #[test]
    fn non_numeric_ids_keep_their_own_key() {
        let (table, _) = OverrideTable::parse("b\t12a\tX\tY\tZ\tD\tI\t\n");
        assert!(table.get(&ItemId::parse("12a").unwrap()).is_some());
        assert!(table.get(&ItemId::parse("12").unwrap()).is_none());
    }

    #[test]
    fn missing_table_is_fatal() {
        let err = OverrideTable::load(Path::new("/definitely/not/here.tsv")).unwrap_err();
        assert!(matches!(err, ArchiveError::OverrideTableMissing { .. }));
    }
}
