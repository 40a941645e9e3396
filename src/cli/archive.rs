use std::path::PathBuf;

use anyhow::Context;
use saher::{
    domain::{status::parse_date, ArchivedRecord},
    Ledger, RecordPatch,
};
use tracing::instrument;

use super::{
    report_save_notice,
    terminal::{is_narrow, truncate, Colorize},
};

#[derive(Debug, clap::Subcommand)]
pub enum Archive {
    /// List archived records, most recently deleted first
    List {
        /// Case-insensitive text search over names, numbers and notes
        #[arg(long, value_name = "TEXT")]
        contains: Option<String>,
    },

    /// Move an archived record back to its original category
    Restore {
        /// The archived record's identifier
        id: u64,
    },

    /// Permanently delete an archived record
    Purge {
        /// The archived record's identifier
        id: u64,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Edit an archived record before restoring it
    Edit {
        /// The archived record's identifier
        id: u64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New reference number
        #[arg(long)]
        number: Option<String>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// New expiry date (YYYY-MM-DD). For lease contracts, the documented
        /// contract's date.
        #[arg(long, value_name = "DATE")]
        expiry: Option<String>,

        /// New expiry date of a lease's internal contract (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        internal_expiry: Option<String>,

        /// New cost
        #[arg(long)]
        cost: Option<f64>,
    },
}

impl Archive {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = Ledger::open(root);

        match self {
            Self::List { contains } => list(&ledger, contains.as_deref().unwrap_or_default()),
            Self::Restore { id } => {
                let name = archived_name(&ledger, id)?;
                let restored = ledger
                    .restore(id)
                    .with_context(|| format!("Failed to restore '{name}'"))?;
                report_save_notice(&mut ledger);
                if restored {
                    println!("{}", format!("♻️  Restored '{name}' ({id})").success());
                }
            }
            Self::Purge { id, yes } => {
                let name = archived_name(&ledger, id)?;
                if !yes && !confirm_purge(&name)? {
                    println!("Cancelled");
                    std::process::exit(130);
                }
                ledger.purge(id);
                report_save_notice(&mut ledger);
                println!("{}", format!("🗑️  Permanently deleted '{name}'").success());
            }
            Self::Edit {
                id,
                name,
                number,
                notes,
                expiry,
                internal_expiry,
                cost,
            } => {
                for date in [&expiry, &internal_expiry].into_iter().flatten() {
                    if !date.trim().is_empty() && parse_date(date).is_none() {
                        tracing::warn!("'{date}' is not a YYYY-MM-DD date; it will be stored as given");
                    }
                }
                let patch = RecordPatch {
                    name,
                    number,
                    notes,
                    expiry_date: expiry,
                    internal_expiry_date: internal_expiry,
                    cost,
                };
                if patch.is_empty() {
                    anyhow::bail!("Nothing to change; pass at least one field to edit");
                }

                archived_name(&ledger, id)?;
                ledger.edit_archived(id, &patch);
                report_save_notice(&mut ledger);
                println!("{}", format!("✅ Updated archived record {id}").success());
            }
        }

        Ok(())
    }
}

fn archived_name(ledger: &Ledger, id: u64) -> anyhow::Result<String> {
    ledger
        .store()
        .find_archived(id)
        .map(|archived| archived.name.clone())
        .with_context(|| format!("No archived record with id {id}"))
}

fn list(ledger: &Ledger, query: &str) {
    let archived: Vec<&ArchivedRecord> = ledger
        .store()
        .archived()
        .iter()
        .filter(|archived| archived.matches_query(query))
        .collect();

    if archived.is_empty() {
        println!("The archive is empty.");
        return;
    }

    let narrow = is_narrow();
    if !narrow {
        println!(
            "{:<14}  {:<32}  {:<16}  {:<20}  {:<10}  {:<16}",
            "Id", "Name", "Number", "Category", "Expiry", "Deleted"
        );
        println!("{}", "-".repeat(118).dim());
    }

    for record in archived {
        let category = record
            .category()
            .map_or_else(|_| record.original_type.clone(), |c| c.label().to_string());
        let deleted = record.deletion_date.format("%Y-%m-%d %H:%M").to_string();

        if narrow {
            println!("{} {}", record.id.to_string().dim(), record.name);
            println!("    {category}, deleted {}", deleted.dim());
            continue;
        }

        println!(
            "{:<14}  {:<32}  {:<16}  {:<20}  {:<10}  {}",
            record.id,
            truncate(&record.name, 32),
            truncate(&record.number, 16),
            truncate(&category, 20),
            record.expiry_date.as_deref().unwrap_or("-"),
            deleted.dim()
        );
    }
}

fn confirm_purge(name: &str) -> anyhow::Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!(
            "Permanently delete '{name}'? This cannot be undone."
        ))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use saher::{Category, SimpleRecord};
    use tempfile::tempdir;

    use super::*;

    fn archived_licence(root: &std::path::Path) -> u64 {
        let mut ledger = Ledger::open(root);
        let id = ledger
            .create(
                Category::TrademarkCert,
                SimpleRecord {
                    name: "Logo mark".to_string(),
                    expiry_date: Some("2031-03-01".to_string()),
                    ..SimpleRecord::default()
                },
            )
            .unwrap();
        assert!(ledger.delete(Category::TrademarkCert, id));
        id
    }

    #[test]
    fn edit_changes_archived_copy() {
        let tmp = tempdir().unwrap();
        let id = archived_licence(tmp.path());

        Archive::Edit {
            id,
            name: Some("Logo mark (renewed)".to_string()),
            number: None,
            notes: None,
            expiry: None,
            internal_expiry: None,
            cost: None,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        let ledger = Ledger::open(tmp.path());
        assert_eq!(
            ledger.store().find_archived(id).unwrap().name,
            "Logo mark (renewed)"
        );
    }

    #[test]
    fn empty_edit_is_rejected() {
        let tmp = tempdir().unwrap();
        let id = archived_licence(tmp.path());

        let result = Archive::Edit {
            id,
            name: None,
            number: None,
            notes: None,
            expiry: None,
            internal_expiry: None,
            cost: None,
        }
        .run(tmp.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn edit_reaches_lease_internal_track() {
        let tmp = tempdir().unwrap();
        let mut ledger = Ledger::open(tmp.path());
        let id = ledger
            .create(
                Category::LeaseContract,
                saher::DualTrackRecord {
                    name: "Staff housing".to_string(),
                    internal_expiry_date: Some("2001-01-01".to_string()),
                    ..saher::DualTrackRecord::default()
                },
            )
            .unwrap();
        assert!(ledger.delete(Category::LeaseContract, id));

        Archive::Edit {
            id,
            name: None,
            number: None,
            notes: None,
            expiry: None,
            internal_expiry: Some("2099-01-01".to_string()),
            cost: None,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
        Archive::Restore { id }.run(tmp.path().to_path_buf()).unwrap();

        let ledger = Ledger::open(tmp.path());
        let Some(saher::Record::DualTrack(lease)) = ledger.store().find(Category::LeaseContract, id)
        else {
            panic!("lease not restored");
        };
        assert_eq!(lease.internal_expiry_date.as_deref(), Some("2099-01-01"));
        assert_eq!(lease.status, saher::LifecycleStatus::Active);
    }

    #[test]
    fn purge_removes_for_good() {
        let tmp = tempdir().unwrap();
        let id = archived_licence(tmp.path());

        Archive::Purge { id, yes: true }
            .run(tmp.path().to_path_buf())
            .unwrap();

        let ledger = Ledger::open(tmp.path());
        assert!(ledger.store().find_archived(id).is_none());
        assert!(ledger.store().find(Category::TrademarkCert, id).is_none());
    }

    #[test]
    fn restore_of_unknown_id_fails() {
        let tmp = tempdir().unwrap();
        let result = Archive::Restore { id: 42 }.run(tmp.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn listing_filters_by_text() {
        let tmp = tempdir().unwrap();
        archived_licence(tmp.path());
        Archive::List {
            contains: Some("logo".to_string()),
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
    }
}
