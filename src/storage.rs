pub mod gateway;
/// File-backed record ledger with auto-save.
pub mod ledger;
mod seed;
/// Snapshot schema shared by the auto-saved file and backups.
pub mod snapshot;
/// In-memory record store and archive lifecycle.
pub mod store;

pub use gateway::{
    DirectoryMedium, Gateway, ImportError, LoadError, Medium, MemoryMedium, SaveError,
};
pub use ledger::Ledger;
pub use snapshot::Snapshot;
pub use store::{Store, StoreError};
