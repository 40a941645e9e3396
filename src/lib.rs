//! Licence, contract and procedure records with expiry monitoring.
//!
//! Records are grouped into nine categories. Every record with an expiry
//! date is classified as active, soon to expire or expired; deleted records
//! move to an archive from which they can be restored. The whole dataset is
//! persisted as a single JSON snapshot.

pub mod domain;
pub use domain::{
    ArchivedRecord, Category, Config, DualTrackRecord, Hydrate, LifecycleStatus, ProcedureRecord,
    Record, RecordPatch, SimpleRecord, UnknownCategoryError,
};

/// Persistence and the in-memory record store.
pub mod storage;
pub use storage::{ImportError, Ledger, SaveError, Store, StoreError};
