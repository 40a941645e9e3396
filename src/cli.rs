use std::path::{Path, PathBuf};

mod archive;
mod calendar;
mod init;
mod list;
mod notify;
mod record;
mod status;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use saher::{Category, Ledger};
use tracing::instrument;

use archive::Archive;
use calendar::Calendar;
use list::List;
use notify::Notify;
use record::{Add, Update};
use status::Status;
use terminal::Colorize;

/// Parse a category tag, accepting kebab-case and snake_case spellings.
fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|e| {
        let known: Vec<_> = Category::ALL.iter().map(|c| c.tag()).collect();
        format!("{e} (expected one of: {})", known.join(", "))
    })
}

/// Print a save failure left behind by the last mutation, if any.
fn report_save_notice(ledger: &mut Ledger) {
    if let Some(notice) = ledger.take_save_notice() {
        eprintln!("{}", format!("⚠️  {notice}").warning());
    }
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the data directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show the dashboard and expiry alerts (default)
    Status(Status),

    /// Initialize a new data directory
    Init(init::Command),

    /// List records with filters
    List(List),

    /// Add a record
    Add(Add),

    /// Update a record
    Update(Update),

    /// Move a record to the archive
    ///
    /// Archived records can be restored with 'saher archive restore'.
    Delete(Delete),

    /// Inspect and manage archived records
    #[command(subcommand)]
    Archive(Archive),

    /// List records that are expired or about to expire
    Notify(Notify),

    /// Show the records expiring in a month, day by day
    Calendar(Calendar),

    /// Write a backup of every record
    Export(Export),

    /// Replace every record with the contents of a backup
    Import(Import),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init(command) => command.run(&root)?,
            Self::List(command) => command.run(root)?,
            Self::Add(command) => command.run(root)?,
            Self::Update(command) => command.run(root)?,
            Self::Delete(command) => command.run(root)?,
            Self::Archive(command) => command.run(root)?,
            Self::Notify(command) => command.run(root)?,
            Self::Calendar(command) => command.run(root)?,
            Self::Export(command) => command.run(root)?,
            Self::Import(command) => command.run(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Delete {
    /// The category of the record
    #[clap(value_parser = parse_category)]
    category: Category,

    /// The record's identifier
    id: u64,
}

impl Delete {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = Ledger::open(root);

        let name = ledger
            .store()
            .find(self.category, self.id)
            .map(|record| record.name().to_string())
            .with_context(|| format!("No {} record with id {}", self.category, self.id))?;

        ledger.delete(self.category, self.id);
        report_save_notice(&mut ledger);

        println!("{}", format!("🗄️  Archived '{name}' ({})", self.id).success());
        println!(
            "{}",
            format!("Restore it with 'saher archive restore {}'.", self.id).dim()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Export {
    /// Directory to write the backup file to
    #[arg(long, short, default_value = ".")]
    out: PathBuf,
}

impl Export {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = Ledger::open(root);
        let export = ledger.export().context("Failed to render backup")?;

        let path = self.out.join(&export.file_name);
        std::fs::write(&path, export.contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        println!(
            "{}",
            format!(
                "✅ Backed up {} records to {}",
                ledger.store().live_count() + ledger.store().archived().len(),
                path.display()
            )
            .success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Import {
    /// The backup file to restore
    file: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl Import {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let contents = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;

        let mut ledger = Ledger::open(root);

        // Validate before asking, so a bad file is reported without a prompt.
        let incoming = saher::storage::gateway::import_snapshot(&contents)
            .with_context(|| format!("Failed to restore backup {}", self.file.display()))?;

        if !self.yes && !confirm_replace(ledger.root(), incoming.live_count())? {
            println!("Cancelled");
            std::process::exit(130);
        }

        ledger
            .import(&contents)
            .with_context(|| format!("Failed to restore backup {}", self.file.display()))?;
        report_save_notice(&mut ledger);

        println!(
            "{}",
            format!("✅ Restored {} records from backup", ledger.store().live_count()).success()
        );
        Ok(())
    }
}

fn confirm_replace(root: &Path, incoming: usize) -> anyhow::Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!(
            "Replace every record in {} with the {incoming} records in this backup?",
            root.display()
        ))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use saher::{LifecycleStatus, Record};
    use tempfile::tempdir;

    use super::*;

    fn add_licence(root: &Path, name: &str, expiry: &str) -> u64 {
        let add = Add {
            category: Category::CommercialLicense,
            fields: record::Fields {
                name: Some(name.to_string()),
                number: Some("CN-1".to_string()),
                expiry: Some(expiry.to_string()),
                ..record::Fields::default()
            },
        };
        add.run(root.to_path_buf()).unwrap();

        let ledger = Ledger::open(root);
        ledger
            .store()
            .records(Category::CommercialLicense)
            .iter()
            .find(|record| record.name() == name)
            .map(Record::id)
            .unwrap()
    }

    #[test]
    fn parse_category_lists_known_tags_on_error() {
        let error = parse_category("spaceship").unwrap_err();
        assert!(error.contains("leaseContract"));
        assert_eq!(parse_category("lease-contract"), Ok(Category::LeaseContract));
    }

    #[test]
    fn delete_then_restore_round_trips() {
        let tmp = tempdir().unwrap();
        let id = add_licence(tmp.path(), "Import licence", "2001-01-01");

        Delete {
            category: Category::CommercialLicense,
            id,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
        assert!(
            Ledger::open(tmp.path())
                .store()
                .find(Category::CommercialLicense, id)
                .is_none()
        );

        Archive::Restore { id }.run(tmp.path().to_path_buf()).unwrap();
        let ledger = Ledger::open(tmp.path());
        let record = ledger.store().find(Category::CommercialLicense, id).unwrap();
        assert_eq!(record.status(), Some(LifecycleStatus::Expired));
    }

    #[test]
    fn delete_of_missing_record_fails() {
        let tmp = tempdir().unwrap();
        let result = Delete {
            category: Category::Procedure,
            id: 999,
        }
        .run(tmp.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn export_then_import_restores_records() {
        let tmp = tempdir().unwrap();
        let backups = tempdir().unwrap();
        let id = add_licence(tmp.path(), "Keep me", "2030-01-01");

        Export {
            out: backups.path().to_path_buf(),
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
        let backup = std::fs::read_dir(backups.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("SAHER_Backup_")
        );

        Delete {
            category: Category::CommercialLicense,
            id,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        Import {
            file: backup,
            yes: true,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        let ledger = Ledger::open(tmp.path());
        assert!(ledger.store().find(Category::CommercialLicense, id).is_some());
    }

    #[test]
    fn import_rejects_unrecognised_file() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("not-a-backup.json");
        std::fs::write(&file, r#"{"hello": []}"#).unwrap();

        let result = Import { file, yes: true }.run(tmp.path().to_path_buf());
        assert!(result.is_err());
    }
}
