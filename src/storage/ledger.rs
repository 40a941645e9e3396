//! A persisted store of records
//!
//! The [`Ledger`] owns a [`Store`] and writes it back through a [`Gateway`]
//! after every successful mutation. A failed write never undoes the
//! mutation: it is logged and kept as a notice for the user instead.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use crate::{
    domain::{
        notification::{self, compose_alert_email},
        Alert, Category, Config, ExpiringItem, NotificationCenter, Record, RecordPatch,
    },
    storage::{
        gateway::{self, DirectoryMedium, Export, Gateway, ImportError, Medium, SaveError},
        seed::seed_store,
        store::{Store, StoreError},
    },
};

/// Name of the configuration file in the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// A store of records kept in sync with persistent storage.
#[derive(Debug)]
pub struct Ledger<M: Medium = DirectoryMedium> {
    config: Config,
    gateway: Gateway<M>,
    store: Store,

    /// Armed until the first successful save. While armed, an entirely empty
    /// store is not written, so that a load which produced nothing cannot
    /// overwrite a snapshot.
    initial_mount: bool,

    /// The most recent save failure, until it is taken.
    save_notice: Option<String>,

    /// Set when a snapshot exists but could not be loaded. Auto-save is
    /// suspended so the file is not overwritten; an explicit [`Self::save`]
    /// or a successful [`Self::import`] lifts it.
    unreadable_snapshot: Option<String>,

    notifications: NotificationCenter,
}

impl Ledger<DirectoryMedium> {
    /// Opens the data directory at `root`.
    ///
    /// Reads `config.toml` if present, then loads the snapshot. If there is no
    /// readable snapshot, the ledger starts from the seed dataset (or empty,
    /// if seeding is disabled).
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config = Config::load_or_default(&root.join(CONFIG_FILE));
        Self::with_medium(config, DirectoryMedium::new(root))
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.gateway.medium().dir()
    }
}

impl<M: Medium> Ledger<M> {
    /// Opens a ledger over an arbitrary medium.
    ///
    /// If a snapshot exists but cannot be loaded, the ledger starts empty,
    /// never seeds, and does not auto-save until the user saves or imports
    /// explicitly. The reason is kept as the save notice.
    pub fn with_medium(config: Config, medium: M) -> Self {
        let gateway = Gateway::new(medium, config.snapshot_file());

        let (store, unreadable_snapshot) = match gateway.load() {
            Ok(Some(store)) => (store, None),
            Ok(None) if config.seed_on_first_run => {
                tracing::info!("No saved records found, starting from the seed dataset");
                (seed_store(), None)
            }
            Ok(None) => (Store::new(), None),
            Err(e) => {
                tracing::error!("Failed to load '{}': {e}", gateway.snapshot_key());
                let reason = format!(
                    "The saved records in '{}' could not be loaded ({e}). Changes will not be \
                     saved until the file is repaired or a backup is imported.",
                    gateway.snapshot_key()
                );
                (Store::new(), Some(reason))
            }
        };
        let notifications = gateway.load_notifications();

        let mut ledger = Self {
            config,
            gateway,
            store,
            initial_mount: true,
            save_notice: unreadable_snapshot.clone(),
            unreadable_snapshot,
            notifications,
        };
        ledger.autosave();
        ledger
    }

    /// The active configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The records.
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// The most recent auto-save failure, if any.
    pub fn save_notice(&self) -> Option<&str> {
        self.save_notice.as_deref()
    }

    /// Takes the most recent auto-save failure, clearing it.
    pub const fn take_save_notice(&mut self) -> Option<String> {
        self.save_notice.take()
    }

    /// Adds a new record. See [`Store::create`].
    ///
    /// # Errors
    ///
    /// Returns an error if the record's shape does not fit the category.
    pub fn create(
        &mut self,
        category: Category,
        record: impl Into<Record>,
    ) -> Result<u64, StoreError> {
        let id = self.store.create(category, record)?;
        self.autosave();
        Ok(id)
    }

    /// Replaces a record. See [`Store::update`].
    ///
    /// # Errors
    ///
    /// Returns an error if the record's shape does not fit the category.
    pub fn update(
        &mut self,
        category: Category,
        record: impl Into<Record>,
    ) -> Result<bool, StoreError> {
        let updated = self.store.update(category, record)?;
        if updated {
            self.autosave();
        }
        Ok(updated)
    }

    /// Applies a patch to a live record. See [`Store::patch`].
    pub fn patch(&mut self, category: Category, id: u64, patch: &RecordPatch) -> bool {
        self.mutate(|store| store.patch(category, id, patch))
    }

    /// Moves a record to the archive. See [`Store::archive`].
    pub fn delete(&mut self, category: Category, id: u64) -> bool {
        self.mutate(|store| store.archive(category, id))
    }

    /// Moves an archived record back to its collection. See
    /// [`Store::restore`].
    ///
    /// # Errors
    ///
    /// Returns an error if the archived record cannot be placed back; it then
    /// stays in the archive.
    pub fn restore(&mut self, id: u64) -> Result<bool, StoreError> {
        let restored = self.store.restore(id)?;
        if restored {
            self.autosave();
        }
        Ok(restored)
    }

    /// Permanently deletes an archived record. See [`Store::purge`].
    pub fn purge(&mut self, id: u64) -> bool {
        self.mutate(|store| store.purge(id))
    }

    /// Edits an archived record. See [`Store::edit_archived`].
    pub fn edit_archived(&mut self, id: u64, patch: &RecordPatch) -> bool {
        self.mutate(|store| store.edit_archived(id, patch))
    }

    /// Saves the store now, regardless of the initial-mount latch.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn save(&mut self) -> Result<(), SaveError> {
        self.gateway.save(&self.store)?;
        self.initial_mount = false;
        self.save_notice = None;
        self.unreadable_snapshot = None;
        Ok(())
    }

    /// Renders the store as a backup stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be serialized.
    pub fn export(&self) -> Result<Export, SaveError> {
        gateway::export_snapshot(&self.store, self.config.export_prefix(), Utc::now())
    }

    /// Replaces every collection with the contents of a backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup is rejected, in which case nothing
    /// changes.
    pub fn import(&mut self, contents: &str) -> Result<(), ImportError> {
        let store = gateway::import_snapshot(contents)?;
        tracing::info!("Imported backup with {} live records", store.live_count());
        self.store = store;
        self.unreadable_snapshot = None;
        self.autosave();
        Ok(())
    }

    /// Scans for expiring records and decides whether to show the banner.
    ///
    /// The last-checked marker is persisted whenever the scan finds
    /// something. Failing to persist it is logged and otherwise ignored.
    pub fn alerts(&mut self, today: NaiveDate) -> Alert {
        let items = notification::scan(self.store.live(), today);
        let alert = self.notifications.evaluate(items, today);

        if !alert.items.is_empty() {
            if let Err(e) = self.gateway.save_notifications(&self.notifications) {
                tracing::warn!("Failed to record notification check: {e}");
            }
        }
        alert
    }

    /// Hides the expiry banner for the rest of this session.
    pub const fn dismiss_notifications(&mut self) {
        self.notifications.dismiss();
    }

    /// Composes the alert email for the configured recipient.
    ///
    /// Returns `None` if no recipient is configured.
    pub fn alert_email(&self, items: &[ExpiringItem]) -> Option<String> {
        self.config
            .alert_email
            .as_deref()
            .map(|recipient| compose_alert_email(items, recipient))
    }

    fn mutate(&mut self, f: impl FnOnce(&mut Store) -> bool) -> bool {
        let changed = f(&mut self.store);
        if changed {
            self.autosave();
        }
        changed
    }

    fn autosave(&mut self) {
        if let Some(reason) = &self.unreadable_snapshot {
            tracing::warn!("Not saving: the stored snapshot could not be loaded");
            self.save_notice = Some(reason.clone());
            return;
        }
        if self.initial_mount && self.store.is_empty() {
            tracing::debug!("Skipping save of an empty store on first load");
            return;
        }

        match self.gateway.save(&self.store) {
            Ok(()) => {
                self.initial_mount = false;
                self.save_notice = None;
            }
            Err(e) => {
                tracing::warn!("Auto-save failed: {e}");
                self.save_notice = Some(format!("Changes could not be saved: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{LifecycleStatus, SimpleRecord},
        storage::gateway::MemoryMedium,
    };

    const KEY: &str = "records.json";

    fn unseeded() -> Config {
        let mut config = Config::default();
        config.seed_on_first_run = false;
        config
    }

    fn licence(name: &str, expiry: &str) -> SimpleRecord {
        SimpleRecord {
            name: name.to_string(),
            number: format!("N-{name}"),
            expiry_date: Some(expiry.to_string()),
            ..SimpleRecord::default()
        }
    }

    fn stored(ledger: &Ledger<MemoryMedium>) -> Store {
        let json = ledger.gateway.medium().document(KEY).unwrap();
        Store::from(serde_json::from_str::<crate::storage::Snapshot>(&json).unwrap())
    }

    #[test]
    fn first_run_seeds_and_saves() {
        let ledger = Ledger::with_medium(Config::default(), MemoryMedium::new());

        assert_eq!(ledger.store().live_count(), 21);
        assert_eq!(&stored(&ledger), ledger.store());
    }

    #[test]
    fn empty_first_load_is_not_written() {
        let ledger = Ledger::with_medium(unseeded(), MemoryMedium::new());

        assert!(ledger.store().is_empty());
        assert_eq!(ledger.gateway.medium().document(KEY), None);
        assert!(ledger.initial_mount);
    }

    #[test]
    fn first_mutation_saves_and_disarms_latch() {
        let mut ledger = Ledger::with_medium(unseeded(), MemoryMedium::new());
        let id = ledger
            .create(Category::CommercialLicense, licence("a", "2030-01-01"))
            .unwrap();
        assert!(!ledger.initial_mount);

        // Emptying the store again is now persisted.
        assert!(ledger.delete(Category::CommercialLicense, id));
        assert!(ledger.purge(id));
        assert!(stored(&ledger).is_empty());
    }

    #[test]
    fn every_mutation_is_persisted() {
        let mut ledger = Ledger::with_medium(unseeded(), MemoryMedium::new());
        let id = ledger
            .create(Category::TrademarkCert, licence("logo", "2001-01-01"))
            .unwrap();
        assert_eq!(
            stored(&ledger).find(Category::TrademarkCert, id).unwrap().status(),
            Some(LifecycleStatus::Expired)
        );

        assert!(ledger.patch(
            Category::TrademarkCert,
            id,
            &RecordPatch {
                expiry_date: Some("2099-01-01".to_string()),
                ..RecordPatch::default()
            }
        ));
        assert_eq!(
            stored(&ledger).find(Category::TrademarkCert, id).unwrap().status(),
            Some(LifecycleStatus::Active)
        );

        assert!(ledger.delete(Category::TrademarkCert, id));
        assert_eq!(stored(&ledger).archived().len(), 1);

        assert_eq!(ledger.restore(id), Ok(true));
        assert!(stored(&ledger).archived().is_empty());
    }

    #[test]
    fn failed_save_keeps_changes_and_raises_notice() {
        let mut ledger = Ledger::with_medium(Config::default(), MemoryMedium::new());
        ledger.gateway.medium().fail_writes(true);

        let id = ledger
            .create(Category::OtherTopic, licence("permit", "2030-01-01"))
            .unwrap();

        assert!(ledger.store().find(Category::OtherTopic, id).is_some());
        assert!(stored(&ledger).find(Category::OtherTopic, id).is_none());
        assert!(ledger.save_notice().is_some());

        ledger.gateway.medium().fail_writes(false);
        ledger.save().unwrap();
        assert!(ledger.take_save_notice().is_none());
        assert!(stored(&ledger).find(Category::OtherTopic, id).is_some());
    }

    #[test]
    fn unreadable_snapshot_is_never_overwritten() {
        let original = r#"{"commercialLicenses": {"id": 1, "name": "Mine"}}"#;
        let mut ledger =
            Ledger::with_medium(Config::default(), MemoryMedium::with_document(KEY, original));

        assert!(ledger.store().is_empty());
        assert!(ledger.save_notice().is_some());
        assert_eq!(ledger.gateway.medium().document(KEY).as_deref(), Some(original));

        ledger
            .create(Category::OtherTopic, licence("permit", "2030-01-01"))
            .unwrap();
        assert_eq!(ledger.gateway.medium().document(KEY).as_deref(), Some(original));
        assert!(ledger.take_save_notice().is_some());

        ledger.save().unwrap();
        assert_eq!(stored(&ledger).live_count(), 1);
    }

    #[test]
    fn import_over_unreadable_snapshot_saves() {
        let mut ledger =
            Ledger::with_medium(Config::default(), MemoryMedium::with_document(KEY, "{oops"));
        ledger
            .import(r#"{"procedures": [{"id": 3, "licenseName": "Trade"}]}"#)
            .unwrap();

        assert!(ledger.save_notice().is_none());
        assert_eq!(stored(&ledger).live_count(), 1);
    }

    #[test]
    fn null_cached_status_keeps_user_records() {
        let medium = MemoryMedium::with_document(
            KEY,
            r#"{"commercialLicenses": [
                {"id": 1, "name": "Mine", "expiryDate": "2030-01-01", "status": "Active"},
                {"id": 2, "name": "Also mine", "expiryDate": "2030-01-01", "status": null}
            ]}"#,
        );
        let ledger = Ledger::with_medium(Config::default(), medium);

        assert_eq!(ledger.store().live_count(), 2);
        assert!(ledger.store().find(Category::CommercialLicense, 2).is_some());
        assert_eq!(stored(&ledger).live_count(), 2);
    }

    #[test]
    fn rejected_import_leaves_store_untouched() {
        let mut ledger = Ledger::with_medium(Config::default(), MemoryMedium::new());
        let before = ledger.store().clone();

        assert!(ledger.import(r#"{"hello": "world"}"#).is_err());
        assert_eq!(ledger.store(), &before);
    }

    #[test]
    fn import_replaces_everything() {
        let mut ledger = Ledger::with_medium(Config::default(), MemoryMedium::new());
        ledger
            .import(r#"{"procedures": [{"id": 3, "licenseName": "Trade"}]}"#)
            .unwrap();

        assert_eq!(ledger.store().live_count(), 1);
        assert_eq!(stored(&ledger).live_count(), 1);
    }

    #[test]
    fn alerts_persist_last_checked_marker() {
        let mut ledger = Ledger::with_medium(unseeded(), MemoryMedium::new());
        ledger
            .create(Category::CivilDefenseCert, licence("cert", "2001-01-01"))
            .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let alert = ledger.alerts(today);
        assert!(alert.should_show);
        assert_eq!(alert.items.len(), 1);

        ledger.dismiss_notifications();
        assert!(!ledger.alerts(today).should_show);

        // A new session on the same day shows the banner again.
        let medium = MemoryMedium::new();
        for key in [KEY, "state.json"] {
            let contents = ledger.gateway.medium().document(key).unwrap();
            medium.write(key, &contents).unwrap();
        }
        let mut next_session = Ledger::with_medium(unseeded(), medium);
        assert!(next_session.alerts(today).should_show);
    }

    #[test]
    fn alert_email_needs_a_recipient() {
        let mut ledger = Ledger::with_medium(unseeded(), MemoryMedium::new());
        ledger
            .create(Category::CivilDefenseCert, licence("cert", "2001-01-01"))
            .unwrap();
        let items = ledger.alerts(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).items;

        assert_eq!(ledger.alert_email(&items), None);

        ledger.config.alert_email = Some("ops@example.com".to_string());
        assert!(
            ledger
                .alert_email(&items)
                .unwrap()
                .starts_with("mailto:ops@example.com")
        );
    }

    #[test]
    fn reopening_a_directory_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path());
        let id = ledger
            .create(Category::GeneralContract, licence("supply", "2030-01-01"))
            .unwrap();
        assert_eq!(ledger.root(), dir.path());

        let reopened = Ledger::open(dir.path());
        assert_eq!(
            reopened.store().find(Category::GeneralContract, id).unwrap().name(),
            "supply"
        );
    }
}
