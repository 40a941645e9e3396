//! An in-memory store of records
//!
//! The [`Store`] knows nothing about files or snapshots. It holds one
//! collection per [`Category`] plus the archive, assigns identifiers, and
//! keeps every cached status in step with its dates by hydrating records on
//! each save.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use crate::domain::{
    category::{Category, Shape, UnknownCategoryError},
    record::{Hydrate, Record, RecordPatch},
    ArchivedRecord,
};

/// Errors from store mutations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The record's category tag does not name a known collection.
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),
    /// The record's shape does not fit the target collection.
    #[error("a {found:?} record cannot be stored as {category}")]
    ShapeMismatch {
        /// The target category.
        category: Category,
        /// The shape of the offending record.
        found: Shape,
    },
    /// A stored record already holds the largest possible identifier.
    #[error("no identifiers are left above {last}")]
    IdsExhausted {
        /// The largest identifier in use.
        last: u64,
    },
}

/// An in-memory representation of every record collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    /// Live records, per category. Each record's shape matches its
    /// category's shape.
    live: BTreeMap<Category, Vec<Record>>,

    /// Soft-deleted records, most recently archived first.
    archive: Vec<ArchivedRecord>,

    ids: IdAllocator,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            live: Category::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
            archive: Vec::new(),
            ids: IdAllocator::default(),
        }
    }
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The live records of a category, in insertion order.
    #[must_use]
    pub fn records(&self, category: Category) -> &[Record] {
        self.live.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Every live record, tagged with its category.
    pub fn live(&self) -> impl Iterator<Item = (Category, &Record)> {
        self.live
            .iter()
            .flat_map(|(&category, records)| records.iter().map(move |record| (category, record)))
    }

    /// The archive, most recently archived first.
    #[must_use]
    pub fn archived(&self) -> &[ArchivedRecord] {
        &self.archive
    }

    /// Finds a live record by category and identifier.
    #[must_use]
    pub fn find(&self, category: Category, id: u64) -> Option<&Record> {
        self.records(category).iter().find(|record| record.id() == id)
    }

    /// Finds an archived record by identifier.
    #[must_use]
    pub fn find_archived(&self, id: u64) -> Option<&ArchivedRecord> {
        self.archive.iter().find(|archived| archived.id == id)
    }

    /// Number of live records across all categories.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.values().map(Vec::len).sum()
    }

    /// Whether every collection, the archive included, is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count() == 0 && self.archive.is_empty()
    }

    /// Adds a new record to a category and returns its assigned identifier.
    ///
    /// Any identifier on the incoming record is replaced. The record's
    /// statuses are recomputed before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShapeMismatch`] if the record's shape does not
    /// fit the category, or [`StoreError::IdsExhausted`] if no identifier is
    /// left.
    #[instrument(level = "debug", skip(self, record))]
    pub fn create(
        &mut self,
        category: Category,
        record: impl Into<Record>,
    ) -> Result<u64, StoreError> {
        let mut record = record.into();
        check_shape(category, &record)?;

        let id = self.ids.allocate()?;
        record.set_id(id);
        record.hydrate();

        tracing::info!("Created {category} record {id}: {}", record.name());
        self.live.entry(category).or_default().push(record);
        Ok(id)
    }

    /// Replaces the record with the same identifier in a category.
    ///
    /// Returns `Ok(false)`, without changing anything, if no record matches.
    /// The record's statuses are recomputed before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShapeMismatch`] if the record's shape does not
    /// fit the category.
    #[instrument(level = "debug", skip(self, record))]
    pub fn update(
        &mut self,
        category: Category,
        record: impl Into<Record>,
    ) -> Result<bool, StoreError> {
        let mut record = record.into();
        check_shape(category, &record)?;

        let Some(slot) = self
            .live
            .get_mut(&category)
            .and_then(|records| records.iter_mut().find(|r| r.id() == record.id()))
        else {
            tracing::debug!("No {category} record with id {} to update", record.id());
            return Ok(false);
        };

        record.hydrate();
        *slot = record;
        Ok(true)
    }

    /// Applies a patch to a live record.
    ///
    /// Returns `false` if no record matches.
    pub fn patch(&mut self, category: Category, id: u64, patch: &RecordPatch) -> bool {
        let Some(record) = self
            .live
            .get_mut(&category)
            .and_then(|records| records.iter_mut().find(|r| r.id() == id))
        else {
            return false;
        };

        record.apply(patch);
        record.hydrate();
        true
    }

    /// Soft-deletes a live record, moving it to the front of the archive.
    ///
    /// Returns `false` if no record matches.
    pub fn archive(&mut self, category: Category, id: u64) -> bool {
        self.archive_at(category, id, Utc::now())
    }

    pub(crate) fn archive_at(
        &mut self,
        category: Category,
        id: u64,
        deletion_date: DateTime<Utc>,
    ) -> bool {
        let Some(records) = self.live.get_mut(&category) else {
            return false;
        };
        let Some(position) = records.iter().position(|r| r.id() == id) else {
            return false;
        };

        let record = records.remove(position);
        tracing::info!("Archived {category} record {id}: {}", record.name());
        self.archive
            .insert(0, ArchivedRecord::new(category, record, deletion_date));
        true
    }

    /// Moves an archived record back to its original collection.
    ///
    /// The record is re-inserted as archived, keeping its identifier, with
    /// its statuses recomputed. Returns `Ok(false)` if no archived record
    /// matches.
    ///
    /// # Errors
    ///
    /// If the archived record's original type is unknown, or its payload does
    /// not fit that category, an error is returned and the record stays in
    /// the archive.
    pub fn restore(&mut self, id: u64) -> Result<bool, StoreError> {
        let Some(position) = self.archive.iter().position(|a| a.id == id) else {
            return Ok(false);
        };

        let category = self.archive[position].category()?;
        check_shape(category, &self.archive[position].original_data)?;

        let archived = self.archive.remove(position);
        tracing::info!("Restored {category} record {id}: {}", archived.name);
        let mut record = archived.original_data;
        record.hydrate();
        self.live.entry(category).or_default().push(record);
        Ok(true)
    }

    /// Permanently deletes an archived record.
    ///
    /// Returns `false` if no archived record matches.
    pub fn purge(&mut self, id: u64) -> bool {
        let before = self.archive.len();
        self.archive.retain(|archived| archived.id != id);
        let removed = self.archive.len() < before;
        if removed {
            tracing::info!("Permanently deleted archived record {id}");
        }
        removed
    }

    /// Edits an archived record in place, without restoring it.
    ///
    /// Returns `false` if no archived record matches.
    pub fn edit_archived(&mut self, id: u64, patch: &RecordPatch) -> bool {
        let Some(archived) = self.archive.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        archived.apply(patch);
        true
    }

    /// Builds a store from collections read from storage.
    ///
    /// Records whose shape does not fit their collection are dropped with a
    /// warning. Statuses are not recomputed here; see [`Hydrate`].
    pub(crate) fn from_parts(
        live: impl IntoIterator<Item = (Category, Vec<Record>)>,
        archive: Vec<ArchivedRecord>,
    ) -> Self {
        let mut store = Self::default();

        for (category, records) in live {
            let records: Vec<_> = records
                .into_iter()
                .filter(|record| {
                    let fits = record.shape() == category.shape();
                    if !fits {
                        tracing::warn!(
                            "Dropping record {} stored under {category} with the wrong shape",
                            record.id()
                        );
                    }
                    fits
                })
                .collect();
            for record in &records {
                store.ids.observe(record.id());
            }
            store.live.entry(category).or_default().extend(records);
        }
        for archived in &archive {
            store.ids.observe(archived.id);
        }
        store.archive = archive;
        store
    }
}

impl Hydrate for Store {
    fn hydrate_on(&mut self, today: NaiveDate) {
        for records in self.live.values_mut() {
            records.hydrate_on(today);
        }
    }
}

fn check_shape(category: Category, record: &Record) -> Result<(), StoreError> {
    if record.shape() == category.shape() {
        Ok(())
    } else {
        Err(StoreError::ShapeMismatch {
            category,
            found: record.shape(),
        })
    }
}

/// Hands out identifiers that are unique across every category.
///
/// Identifiers are millisecond timestamps, bumped past the largest identifier
/// seen so far so that they keep increasing even when several records are
/// created within the same millisecond or the clock goes backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    fn allocate(&mut self) -> Result<u64, StoreError> {
        let following = self
            .last
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted { last: self.last })?;
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last = now.max(following);
        Ok(self.last)
    }

    fn observe(&mut self, id: u64) {
        self.last = self.last.max(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        record::{DualTrackRecord, ProcedureRecord, SimpleRecord},
        LifecycleStatus,
    };

    fn licence(name: &str, expiry: Option<&str>) -> SimpleRecord {
        SimpleRecord {
            name: name.to_string(),
            number: format!("CN-{name}"),
            expiry_date: expiry.map(str::to_string),
            ..SimpleRecord::default()
        }
    }

    #[test]
    fn create_assigns_unique_increasing_ids_across_categories() {
        let mut store = Store::new();
        let a = store
            .create(Category::CommercialLicense, licence("a", None))
            .unwrap();
        let b = store
            .create(Category::TrademarkCert, licence("b", None))
            .unwrap();
        let c = store
            .create(Category::CommercialLicense, licence("c", None))
            .unwrap();

        assert!(a < b && b < c);
        assert!(a > 0);
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let mut store = Store::new();
        let a = store
            .create(Category::OtherTopic, licence("a", None))
            .unwrap();
        assert!(store.archive(Category::OtherTopic, a));
        assert!(store.purge(a));

        let b = store
            .create(Category::OtherTopic, licence("b", None))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_continue_past_loaded_records() {
        let far_future = 9_000_000_000_000_u64;
        let existing = Record::from(SimpleRecord {
            id: far_future,
            ..SimpleRecord::default()
        });
        let mut store = Store::from_parts([(Category::SpecialAgency, vec![existing])], Vec::new());

        let id = store
            .create(Category::SpecialAgency, licence("new", None))
            .unwrap();
        assert_eq!(id, far_future + 1);
    }

    #[test]
    fn create_computes_status() {
        let mut store = Store::new();
        let id = store
            .create(
                Category::CivilDefenseCert,
                SimpleRecord {
                    status: LifecycleStatus::Active,
                    ..licence("old", Some("2001-01-01"))
                },
            )
            .unwrap();

        let record = store.find(Category::CivilDefenseCert, id).unwrap();
        assert_eq!(record.status(), Some(LifecycleStatus::Expired));
    }

    #[test]
    fn create_rejects_wrong_shape() {
        let mut store = Store::new();
        let error = store
            .create(Category::LeaseContract, ProcedureRecord::default())
            .unwrap_err();
        assert_eq!(
            error,
            StoreError::ShapeMismatch {
                category: Category::LeaseContract,
                found: Shape::Procedure,
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn update_replaces_and_rehydrates() {
        let mut store = Store::new();
        let id = store
            .create(
                Category::LeaseContract,
                DualTrackRecord {
                    name: "HQ".to_string(),
                    documented_expiry_date: Some("2999-12-31".to_string()),
                    ..DualTrackRecord::default()
                },
            )
            .unwrap();

        let updated = DualTrackRecord {
            id,
            name: "HQ".to_string(),
            documented_expiry_date: Some("2999-12-31".to_string()),
            internal_expiry_date: Some("2001-01-01".to_string()),
            ..DualTrackRecord::default()
        };
        assert_eq!(store.update(Category::LeaseContract, updated), Ok(true));

        let Some(Record::DualTrack(contract)) = store.find(Category::LeaseContract, id) else {
            panic!("contract missing");
        };
        assert_eq!(contract.documented_status, Some(LifecycleStatus::Active));
        assert_eq!(contract.internal_status, Some(LifecycleStatus::Expired));
        assert_eq!(contract.status, LifecycleStatus::Expired);
    }

    #[test]
    fn update_of_missing_record_is_a_no_op() {
        let mut store = Store::new();
        store
            .create(Category::GeneralContract, licence("a", None))
            .unwrap();
        let before = store.clone();

        let ghost = SimpleRecord {
            id: 42,
            ..licence("ghost", None)
        };
        assert_eq!(store.update(Category::GeneralContract, ghost), Ok(false));
        assert_eq!(store, before);
    }

    #[test]
    fn archive_moves_record_to_front_of_archive() {
        let mut store = Store::new();
        let first = store
            .create(Category::CommercialLicense, licence("first", None))
            .unwrap();
        let second = store
            .create(Category::OperationalLicense, licence("second", None))
            .unwrap();

        assert!(store.archive(Category::CommercialLicense, first));
        assert!(store.archive(Category::OperationalLicense, second));

        assert!(store.records(Category::CommercialLicense).is_empty());
        let order: Vec<_> = store.archived().iter().map(|a| a.id).collect();
        assert_eq!(order, vec![second, first]);
    }

    #[test]
    fn archive_of_missing_record_does_nothing() {
        let mut store = Store::new();
        assert!(!store.archive(Category::Procedure, 7));
        assert!(store.archived().is_empty());
    }

    #[test]
    fn archive_then_restore_round_trips() {
        let mut store = Store::new();
        let id = store
            .create(
                Category::TrademarkCert,
                SimpleRecord {
                    notes: Some("logo".to_string()),
                    cost: 5000.0,
                    ..licence("logo", Some("2030-01-01"))
                },
            )
            .unwrap();
        let original = store.find(Category::TrademarkCert, id).unwrap().clone();

        assert!(store.archive(Category::TrademarkCert, id));
        assert_eq!(store.restore(id), Ok(true));

        assert_eq!(store.find(Category::TrademarkCert, id), Some(&original));
        assert!(store.find_archived(id).is_none());
    }

    #[test]
    fn archived_copy_is_independent_of_live_edits() {
        let mut store = Store::new();
        let id = store
            .create(Category::OtherTopic, licence("parking", None))
            .unwrap();
        assert!(store.archive(Category::OtherTopic, id));

        // A record re-created under the same name is a different record.
        let other = store
            .create(Category::OtherTopic, licence("parking", None))
            .unwrap();
        assert!(store.patch(
            Category::OtherTopic,
            other,
            &RecordPatch {
                name: Some("renamed".to_string()),
                ..RecordPatch::default()
            }
        ));

        assert_eq!(store.find_archived(id).unwrap().original_data.name(), "parking");
    }

    #[test]
    fn edit_while_archived_is_reflected_on_restore() {
        let mut store = Store::new();
        let id = store
            .create(Category::SpecialAgency, licence("Dubai branch", None))
            .unwrap();
        assert!(store.archive(Category::SpecialAgency, id));

        assert!(store.edit_archived(
            id,
            &RecordPatch {
                notes: Some("revoked".to_string()),
                ..RecordPatch::default()
            }
        ));
        assert_eq!(store.find_archived(id).unwrap().notes.as_deref(), Some("revoked"));

        assert_eq!(store.restore(id), Ok(true));
        let restored = store.find(Category::SpecialAgency, id).unwrap();
        assert_eq!(restored.notes(), Some("revoked"));
        assert_eq!(restored.name(), "Dubai branch");
    }

    #[test]
    fn restore_recomputes_status_after_archived_expiry_edit() {
        let mut store = Store::new();
        let id = store
            .create(Category::CommercialLicense, licence("lapsed", Some("2001-01-01")))
            .unwrap();
        assert!(store.archive(Category::CommercialLicense, id));

        assert!(store.edit_archived(
            id,
            &RecordPatch {
                expiry_date: Some("2099-01-01".to_string()),
                ..RecordPatch::default()
            }
        ));
        assert_eq!(store.restore(id), Ok(true));

        let restored = store.find(Category::CommercialLicense, id).unwrap();
        assert_eq!(restored.primary_expiry(), Some("2099-01-01"));
        assert_eq!(restored.status(), Some(LifecycleStatus::Active));
    }

    #[test]
    fn largest_loaded_id_exhausts_allocation() {
        let existing = Record::from(ProcedureRecord {
            id: u64::MAX,
            ..ProcedureRecord::default()
        });
        let mut store = Store::from_parts([(Category::Procedure, vec![existing])], Vec::new());

        let error = store
            .create(Category::Procedure, ProcedureRecord::default())
            .unwrap_err();
        assert_eq!(error, StoreError::IdsExhausted { last: u64::MAX });
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn purge_is_terminal() {
        let mut store = Store::new();
        let id = store
            .create(Category::Procedure, ProcedureRecord::default())
            .unwrap();
        assert!(store.archive(Category::Procedure, id));
        assert!(store.purge(id));

        assert!(store.find(Category::Procedure, id).is_none());
        assert!(store.find_archived(id).is_none());
        assert_eq!(store.restore(id), Ok(false));
        assert!(!store.edit_archived(id, &RecordPatch::default()));
        assert!(!store.purge(id));
    }

    #[test]
    fn restore_with_unknown_type_keeps_record_archived() {
        let mut store = Store::new();
        let id = store
            .create(Category::CommercialLicense, licence("a", None))
            .unwrap();
        assert!(store.archive(Category::CommercialLicense, id));
        store.archive[0].original_type = "spaceship".to_string();

        let error = store.restore(id).unwrap_err();
        assert_eq!(
            error,
            StoreError::UnknownCategory(UnknownCategoryError("spaceship".to_string()))
        );
        assert!(store.find_archived(id).is_some());
    }

    #[test]
    fn from_parts_drops_misplaced_records() {
        let store = Store::from_parts(
            [(
                Category::LeaseContract,
                vec![
                    Record::from(SimpleRecord::default()),
                    Record::from(DualTrackRecord::default()),
                ],
            )],
            Vec::new(),
        );
        assert_eq!(store.records(Category::LeaseContract).len(), 1);
    }

    #[test]
    fn hydrate_recomputes_every_collection() {
        let stale = Record::from(SimpleRecord {
            id: 1,
            expiry_date: Some("2020-01-01".to_string()),
            status: LifecycleStatus::Active,
            ..SimpleRecord::default()
        });
        let mut store = Store::from_parts([(Category::GeneralContract, vec![stale])], Vec::new());

        store.hydrate();

        let record = store.find(Category::GeneralContract, 1).unwrap();
        assert_eq!(record.status(), Some(LifecycleStatus::Expired));
    }
}
