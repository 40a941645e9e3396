use std::{fs, path::Path};

use anyhow::Context;
use saher::{storage::ledger::CONFIG_FILE, Config, Ledger};
use tracing::instrument;

#[derive(Debug, Default, clap::Parser)]
pub struct Command {
    /// Prefix for exported backup file names
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Address that expiry alert emails are composed for
    #[arg(long, value_name = "ADDRESS")]
    alert_email: Option<String>,

    /// Start with no records instead of the sample dataset
    #[arg(long)]
    no_seed: bool,
}

impl Command {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!(
                "Data directory already initialized (found existing {CONFIG_FILE})"
            );
        }

        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create {}", root.display()))?;

        let mut config = Config::default();
        if let Some(prefix) = &self.prefix {
            config.set_export_prefix(prefix);
        }
        config.alert_email = self.alert_email;
        config.seed_on_first_run = !self.no_seed;

        config
            .save(&config_path)
            .with_context(|| format!("Failed to create {CONFIG_FILE}"))?;

        let mut ledger = Ledger::open(root);
        if ledger.store().is_empty() {
            ledger.save().context("Failed to create the records file")?;
        }

        println!("Initialized records directory in {}", root.display());
        println!("  Created: {CONFIG_FILE}");
        println!("  Created: {}", ledger.config().snapshot_file());
        if !self.no_seed {
            println!(
                "  Seeded {} sample records",
                ledger.store().live_count()
            );
        }

        println!();
        println!("Next steps:");
        println!("  saher add commercialLicense --name \"Trade licence\" --expiry 2026-12-31");
        println!("  saher status");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn init_writes_config_and_snapshot() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("records");

        Command {
            prefix: Some("ACME".to_string()),
            alert_email: Some("ops@example.com".to_string()),
            no_seed: true,
        }
        .run(&root)
        .unwrap();

        let config = Config::load(&root.join(CONFIG_FILE)).unwrap();
        assert_eq!(config.export_prefix(), "ACME");
        assert_eq!(config.alert_email.as_deref(), Some("ops@example.com"));
        assert!(!config.seed_on_first_run);
        assert!(root.join(config.snapshot_file()).exists());
        assert!(Ledger::open(&root).store().is_empty());
    }

    #[test]
    fn init_seeds_by_default() {
        let tmp = tempdir().unwrap();
        Command::default().run(tmp.path()).unwrap();
        assert!(!Ledger::open(tmp.path()).store().is_empty());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = tempdir().unwrap();
        Command::default().run(tmp.path()).unwrap();
        assert!(Command::default().run(tmp.path()).is_err());
    }
}
