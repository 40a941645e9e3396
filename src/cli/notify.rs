use std::path::PathBuf;

use saher::{
    domain::status::{describe_remaining, today},
    Ledger,
};
use tracing::instrument;

use super::{
    report_save_notice,
    terminal::{is_narrow, status_cell, truncate, Colorize},
};

#[derive(Debug, clap::Parser)]
pub struct Notify {
    /// Print a mailto link summarising the expiring records
    #[arg(long)]
    email: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl Notify {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = Ledger::open(root);
        let today = today();
        let alert = ledger.alerts(today);
        report_save_notice(&mut ledger);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&alert.items)?);
            return Ok(());
        }

        if alert.items.is_empty() {
            println!("{}", "✅ No records expire within the next 120 days.".success());
            return Ok(());
        }

        println!(
            "{}",
            format!(
                "🔔 {} records have expired or expire within 120 days",
                alert.items.len()
            )
            .warning()
        );
        println!();

        let narrow = is_narrow();
        for item in &alert.items {
            let remaining = describe_remaining(item.expiry.as_deref(), today);
            if narrow {
                println!("{} {}", status_cell(item.status, 0), item.name);
                println!("    {}", remaining.dim());
                continue;
            }
            println!(
                "{}  {:<32}  {:<16}  {:<10}  {}",
                status_cell(item.status, 14),
                truncate(&item.name, 32),
                truncate(&item.number, 16),
                item.expiry.as_deref().unwrap_or("-"),
                remaining.dim()
            );
        }

        if self.email {
            println!();
            match ledger.alert_email(&alert.items) {
                Some(link) => println!("{link}"),
                None => println!(
                    "{}",
                    "Set 'alert_email' in config.toml to compose an alert email.".dim()
                ),
            }
        }

        Ok(())
    }
}
