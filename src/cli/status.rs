use std::path::PathBuf;

use clap::Parser;
use saher::{
    domain::{stats::DashboardStats, status::today, Alert},
    Category, Ledger,
};
use tracing::instrument;

use super::{
    report_save_notice,
    terminal::{format_cost, is_narrow, Colorize},
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show record counts, compliance and expiry alerts")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = Ledger::open(root);
        report_save_notice(&mut ledger);

        let stats = DashboardStats::compute(ledger.store().live());
        let alert = ledger.alerts(today());

        if stats.total_records == 0 {
            println!("No records found yet. Add one with 'saher add'.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&stats, &alert)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&stats);
                } else {
                    Self::output_banner(&alert);
                    Self::output_table(&stats);
                }
            }
        }

        Ok(())
    }

    fn output_json(stats: &DashboardStats, alert: &Alert) -> anyhow::Result<()> {
        use serde_json::json;

        let categories: Vec<_> = stats
            .categories
            .iter()
            .map(|(category, counts)| {
                json!({
                    "category": category,
                    "total": counts.total,
                    "active": counts.active,
                    "soon": counts.soon,
                    "expired": counts.expired,
                })
            })
            .collect();

        let output = json!({
            "totalRecords": stats.total_records,
            "active": stats.overall.active,
            "soon": stats.overall.soon,
            "expired": stats.overall.expired,
            "complianceRate": stats.compliance_rate,
            "totalCost": stats.total_cost,
            "categories": categories,
            "expiring": alert.items,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(stats: &DashboardStats) {
        println!(
            "total={} active={} soon={} expired={} compliance={}",
            stats.total_records,
            stats.overall.active,
            stats.overall.soon,
            stats.overall.expired,
            stats.compliance_rate
        );
    }

    fn output_banner(alert: &Alert) {
        if !alert.should_show {
            return;
        }

        println!(
            "{}",
            format!(
                "🔔 {} records have expired or expire within 120 days.",
                alert.items.len()
            )
            .warning()
        );
        println!("{}", "Run 'saher notify' for details.".dim());
        println!();
    }

    fn output_table(stats: &DashboardStats) {
        let rate = format!("{}%", stats.compliance_rate);
        let rate = match stats.compliance_rate {
            80.. => rate.success(),
            50..80 => rate.warning(),
            _ => rate.error(),
        };

        println!("Dashboard");
        println!("{}", "─────────".dim());
        println!("Records:     {}", stats.total_records);
        println!("Compliance:  {rate}");
        println!("Total cost:  {}", format_cost(stats.total_cost));
        println!(
            "Statuses:    {} active, {} soon to expire, {} expired",
            stats.overall.active.to_string().success(),
            stats.overall.soon.to_string().warning(),
            stats.overall.expired.to_string().error()
        );
        println!();

        if is_narrow() {
            for (category, counts) in &stats.categories {
                println!(
                    "{}: {} ({} / {} / {})",
                    category.label(),
                    counts.total,
                    counts.active.to_string().success(),
                    counts.soon.to_string().warning(),
                    counts.expired.to_string().error()
                );
            }
            return;
        }

        println!(
            "{:<28} {:>6} {:>7} {:>5} {:>8}",
            "Category", "Total", "Active", "Soon", "Expired"
        );
        for (category, counts) in &stats.categories {
            println!(
                "{:<28} {:>6} {} {} {}",
                category.label(),
                counts.total,
                format!("{:>7}", counts.active).success(),
                format!("{:>5}", counts.soon).warning(),
                format!("{:>8}", counts.expired).error()
            );
        }

        let procedures = stats.total_records - stats.overall.total;
        if procedures > 0 {
            println!(
                "{}",
                format!("{:<28} {procedures:>6}", Category::Procedure.label()).dim()
            );
        }
    }
}
