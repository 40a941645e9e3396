use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use saher::{
    domain::{stats::calendar_month, status::today},
    Ledger,
};
use tracing::instrument;

use super::terminal::{paint, Colorize};

#[derive(Debug, clap::Parser)]
pub struct Calendar {
    /// The month to show (YYYY-MM). Defaults to the current month.
    #[arg(long, value_name = "YYYY-MM", value_parser = parse_month)]
    month: Option<(i32, u32)>,
}

/// Parses a `YYYY-MM` month.
fn parse_month(s: &str) -> Result<(i32, u32), String> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map(|date| (date.year(), date.month()))
        .map_err(|_| format!("'{s}' is not a month in YYYY-MM form"))
}

impl Calendar {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = Ledger::open(root);
        let (year, month) = self.month.unwrap_or_else(|| {
            let today = today();
            (today.year(), today.month())
        });

        let days = calendar_month(ledger.store().live(), year, month);

        println!("{}", format!("Expiries in {year}-{month:02}").info());
        println!("{}", "──────────────────".dim());

        if days.is_empty() {
            println!("Nothing expires this month.");
            return Ok(());
        }

        for (day, entries) in &days {
            let weekday = NaiveDate::from_ymd_opt(year, month, *day)
                .map(|date| date.format("%a").to_string())
                .unwrap_or_default();
            println!("{weekday} {day:>2}");
            for entry in entries {
                println!(
                    "    {} {} {}",
                    paint("●", entry.status),
                    entry.name,
                    format!("({}, {})", entry.category.label(), entry.id).dim()
                );
            }
        }

        Ok(())
    }
}
