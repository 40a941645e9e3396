use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use regex::Regex;
use saher::{
    domain::{
        stats::{unified_rows, CategoryStats, UnifiedRow},
        status::{describe_remaining, today},
        RecordFilter,
    },
    Category, LifecycleStatus, ProcedureRecord, Record,
};
use serde::Serialize;
use tracing::instrument;

use super::{
    parse_category,
    terminal::{format_cost, is_narrow, status_cell, truncate, Colorize},
};

const NAME_WIDTH: usize = 32;

#[derive(Debug, Parser, Default)]
#[command(about = "List records with filters")]
pub struct List {
    /// Only list records of this category. Without one, every status-bearing
    /// record is listed together, most urgent first.
    #[arg(value_parser = parse_category)]
    category: Option<Category>,

    /// Only list records with this status (active, soon, expired)
    #[arg(long, value_name = "STATUS")]
    status: Option<LifecycleStatus>,

    /// Case-insensitive text search over names, numbers and notes
    #[arg(long, value_name = "TEXT", conflicts_with = "regex")]
    contains: Option<String>,

    /// Regular expression matched against record names
    #[arg(long, value_name = "PATTERN")]
    regex: Option<String>,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Print identifiers only, one per line
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug)]
struct Filters {
    filter: RecordFilter,
    regex: Option<Regex>,
}

impl Filters {
    fn new(list: &List) -> anyhow::Result<Self> {
        let regex = list
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("invalid regex: {pattern}"))
            })
            .transpose()?;

        Ok(Self {
            filter: RecordFilter {
                query: list.contains.clone().unwrap_or_default(),
                status: list.status,
                categories: list.category.into_iter().collect(),
            },
            regex,
        })
    }

    fn matches(&self, category: Category, record: &Record) -> bool {
        self.filter.matches(category, record)
            && self
                .regex
                .as_ref()
                .is_none_or(|regex| regex.is_match(record.name()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcedureRow<'a> {
    id: u64,
    license_name: &'a str,
    authority: &'a str,
    contact_numbers: &'a str,
    email: &'a str,
    website_url: &'a str,
    employee_name: Option<&'a str>,
}

impl<'a> From<&'a ProcedureRecord> for ProcedureRow<'a> {
    fn from(record: &'a ProcedureRecord) -> Self {
        Self {
            id: record.id,
            license_name: &record.license_name,
            authority: &record.authority,
            contact_numbers: &record.contact_numbers,
            email: &record.email,
            website_url: &record.website_url,
            employee_name: record.employee_name.as_deref(),
        }
    }
}

impl List {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = saher::Ledger::open(root);
        let filters = Filters::new(&self)?;

        let selected = ledger
            .store()
            .live()
            .filter(|(category, record)| filters.matches(*category, record));

        if self.category == Some(Category::Procedure) {
            let procedures: Vec<_> = selected
                .filter_map(|(_, record)| match record {
                    Record::Procedure(procedure) => Some(ProcedureRow::from(procedure)),
                    _ => None,
                })
                .collect();
            return self.render_procedures(&procedures);
        }

        let rows = unified_rows(selected);
        self.render_rows(&rows)
    }

    fn render_rows(&self, rows: &[UnifiedRow]) -> anyhow::Result<()> {
        if self.output == OutputFormat::Json {
            serde_json::to_writer_pretty(std::io::stdout(), rows)
                .context("failed to render json output")?;
            println!();
            return Ok(());
        }

        if self.quiet {
            for row in rows {
                println!("{}", row.id);
            }
            return Ok(());
        }

        if rows.is_empty() {
            println!("No matching records.");
            return Ok(());
        }

        let today = today();
        let narrow = is_narrow();
        let show_category = self.category.is_none();

        if !narrow {
            let category_header = if show_category {
                format!("{:<24}  ", "Category")
            } else {
                String::new()
            };
            println!(
                "{:<14}  {category_header}{:<NAME_WIDTH$}  {:<16}  {:<10}  {:<14}  {:<22}  {:>10}",
                "Id", "Name", "Number", "Expiry", "Status", "Remaining", "Cost"
            );
            println!(
                "{}",
                "-".repeat(110 + if show_category { 26 } else { 0 }).dim()
            );
        }

        for row in rows {
            let expiry = row.expiry.as_deref();
            let remaining = describe_remaining(expiry, today);

            if narrow {
                println!(
                    "{} {} {}",
                    row.id.to_string().dim(),
                    row.name,
                    status_cell(row.status, 0)
                );
                println!("    {}", remaining.dim());
                continue;
            }

            let category = if show_category {
                format!("{:<24}  ", truncate(row.category.label(), 24))
            } else {
                String::new()
            };
            println!(
                "{:<14}  {category}{:<NAME_WIDTH$}  {:<16}  {:<10}  {}  {:<22}  {:>10}",
                row.id,
                truncate(&row.name, NAME_WIDTH),
                truncate(&row.number, 16),
                expiry.unwrap_or("-"),
                status_cell(row.status, 14),
                remaining,
                format_cost(row.cost)
            );
        }

        println!();
        println!("{}", summary_line(rows).dim());
        Ok(())
    }

    fn render_procedures(&self, rows: &[ProcedureRow<'_>]) -> anyhow::Result<()> {
        if self.output == OutputFormat::Json {
            serde_json::to_writer_pretty(std::io::stdout(), rows)
                .context("failed to render json output")?;
            println!();
            return Ok(());
        }

        if self.quiet {
            for row in rows {
                println!("{}", row.id);
            }
            return Ok(());
        }

        if rows.is_empty() {
            println!("No matching procedures.");
            return Ok(());
        }

        println!(
            "{:<14}  {:<NAME_WIDTH$}  {:<24}  {:<16}  {:<28}  {:<20}",
            "Id", "Licence", "Authority", "Contact", "Email", "Employee"
        );
        println!("{}", "-".repeat(144).dim());
        for row in rows {
            println!(
                "{:<14}  {:<NAME_WIDTH$}  {:<24}  {:<16}  {:<28}  {:<20}",
                row.id,
                truncate(row.license_name, NAME_WIDTH),
                truncate(row.authority, 24),
                truncate(row.contact_numbers, 16),
                truncate(row.email, 28),
                row.employee_name.unwrap_or("-")
            );
            if !row.website_url.is_empty() {
                println!("{:<14}  {}", "", row.website_url.info());
            }
        }
        Ok(())
    }
}

/// The per-status counts shown under a listing, like filter tabs.
fn summary_line(rows: &[UnifiedRow]) -> String {
    let counts = CategoryStats::tally(rows.iter().map(|row| row.status));
    let tabs: Vec<_> = LifecycleStatus::ALL
        .into_iter()
        .map(|status| format!("{status}: {}", counts.count(status)))
        .collect();
    format!("All: {}  |  {}", counts.total, tabs.join("  |  "))
}

#[cfg(test)]
mod tests {
    use saher::{Ledger, SimpleRecord};
    use tempfile::tempdir;

    use super::*;

    fn row(id: u64, status: LifecycleStatus) -> UnifiedRow {
        UnifiedRow {
            category: Category::CommercialLicense,
            id,
            name: format!("licence {id}"),
            number: String::new(),
            expiry: None,
            status,
            cost: 0.0,
        }
    }

    #[test]
    fn summary_counts_each_status() {
        let rows = [
            row(1, LifecycleStatus::Expired),
            row(2, LifecycleStatus::Active),
            row(3, LifecycleStatus::Active),
        ];
        assert_eq!(
            summary_line(&rows),
            "All: 3  |  Expired: 1  |  Soon to expire: 0  |  Active: 2"
        );
    }

    #[test]
    fn invalid_regex_is_reported() {
        let list = List {
            regex: Some("[unclosed".to_string()),
            ..List::default()
        };
        let error = Filters::new(&list).unwrap_err();
        assert!(error.to_string().contains("invalid regex"));
    }

    #[test]
    fn regex_narrows_by_name() {
        let list = List {
            regex: Some("^Import".to_string()),
            ..List::default()
        };
        let filters = Filters::new(&list).unwrap();

        let matching = Record::from(SimpleRecord {
            name: "Import permit".to_string(),
            ..SimpleRecord::default()
        });
        let other = Record::from(SimpleRecord {
            name: "Export permit".to_string(),
            ..SimpleRecord::default()
        });
        assert!(filters.matches(Category::CommercialLicense, &matching));
        assert!(!filters.matches(Category::CommercialLicense, &other));
    }

    #[test]
    fn category_filter_excludes_other_categories() {
        let list = List {
            category: Some(Category::CivilDefenseCert),
            ..List::default()
        };
        let filters = Filters::new(&list).unwrap();
        let record = Record::from(SimpleRecord::default());
        assert!(filters.matches(Category::CivilDefenseCert, &record));
        assert!(!filters.matches(Category::CommercialLicense, &record));
    }

    #[test]
    fn listing_runs_over_seeded_directory() {
        let tmp = tempdir().unwrap();
        drop(Ledger::open(tmp.path()));

        List::default().run(tmp.path().to_path_buf()).unwrap();
        List {
            category: Some(Category::Procedure),
            output: OutputFormat::Json,
            ..List::default()
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
    }
}
