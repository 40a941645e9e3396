//! The dataset a new data directory starts with.

use crate::storage::{snapshot::Snapshot, store::Store};

const SEED: &str = include_str!("seed.json");

/// Builds a store holding the seed dataset, with statuses computed for
/// today.
pub fn seed_store() -> Store {
    serde_json::from_str::<Snapshot>(SEED).map_or_else(
        |e| {
            tracing::error!("Seed dataset is unreadable: {e}");
            Store::default()
        },
        Store::from,
    )
}
