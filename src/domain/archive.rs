//! Archived (soft-deleted) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    category::{Category, Shape, UnknownCategoryError},
    record::{Record, RecordPatch},
};

/// A soft-deleted record.
///
/// The archive exclusively owns `original_data`, the record exactly as it was
/// when deleted. The top-level display fields mirror it so that archive
/// listings and searches do not have to look inside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArchivedRecord", into = "RawArchivedRecord")]
pub struct ArchivedRecord {
    /// Identifier of the original record.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Display reference number.
    pub number: String,
    /// Display expiry date.
    pub expiry_date: Option<String>,
    /// Display notes.
    pub notes: Option<String>,
    /// Tag of the collection the record came from.
    ///
    /// Kept verbatim so that a snapshot with a tag this version does not know
    /// still loads.
    pub original_type: String,
    /// When the record was archived.
    pub deletion_date: DateTime<Utc>,
    /// The full original record.
    pub original_data: Record,
}

impl ArchivedRecord {
    /// Wraps a record removed from the given category.
    #[must_use]
    pub fn new(category: Category, record: Record, deletion_date: DateTime<Utc>) -> Self {
        let mut archived = Self {
            id: record.id(),
            name: String::new(),
            number: String::new(),
            expiry_date: None,
            notes: None,
            original_type: category.tag().to_string(),
            deletion_date,
            original_data: record,
        };
        archived.sync_display_fields();
        archived
    }

    /// The category the record came from.
    ///
    /// # Errors
    ///
    /// Returns an error if `original_type` is not a known category tag.
    pub fn category(&self) -> Result<Category, UnknownCategoryError> {
        self.original_type.parse()
    }

    /// Edits the archived record in place.
    ///
    /// The patch is merged into `original_data`, and the display fields are
    /// refreshed from it, so a later restore reflects the edit.
    pub fn apply(&mut self, patch: &RecordPatch) {
        self.original_data.apply(patch);
        self.sync_display_fields();
    }

    /// Case-insensitive search over the archived record's text.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        self.original_data.matches_query(query)
    }

    fn sync_display_fields(&mut self) {
        self.name = self.original_data.name().to_string();
        self.number = self.original_data.number().to_string();
        self.expiry_date = self.original_data.primary_expiry().map(str::to_string);
        self.notes = self.original_data.notes().map(str::to_string);
    }
}

/// The stored form of an archived record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArchivedRecord {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    original_type: String,
    #[serde(default)]
    deletion_date: DateTime<Utc>,
    original_data: serde_json::Value,
}

impl TryFrom<RawArchivedRecord> for ArchivedRecord {
    type Error = serde_json::Error;

    fn try_from(raw: RawArchivedRecord) -> Result<Self, Self::Error> {
        let shape = raw.original_type.parse::<Category>().map_or_else(
            |_| {
                tracing::debug!(
                    "archived record {} has unknown type '{}'",
                    raw.id,
                    raw.original_type
                );
                guess_shape(&raw.original_data)
            },
            Category::shape,
        );
        let original_data = Record::from_value(shape, raw.original_data)?;

        let name = if raw.name.is_empty() {
            original_data.name().to_string()
        } else {
            raw.name
        };

        Ok(Self {
            id: raw.id,
            name,
            number: raw.number,
            expiry_date: raw.expiry_date.filter(|date| !date.is_empty()),
            notes: raw.notes,
            original_type: raw.original_type,
            deletion_date: raw.deletion_date,
            original_data,
        })
    }
}

impl From<ArchivedRecord> for RawArchivedRecord {
    fn from(archived: ArchivedRecord) -> Self {
        Self {
            id: archived.id,
            name: archived.name,
            number: archived.number,
            expiry_date: archived.expiry_date,
            notes: archived.notes,
            original_type: archived.original_type,
            deletion_date: archived.deletion_date,
            original_data: serde_json::to_value(&archived.original_data)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Infers the payload shape of a record whose category tag is unknown.
fn guess_shape(value: &serde_json::Value) -> Shape {
    let has = |key: &str| value.get(key).is_some();
    if has("licenseName") {
        Shape::Procedure
    } else if has("documentedExpiryDate") || has("internalExpiryDate") {
        Shape::DualTrack
    } else {
        Shape::Simple
    }
}
