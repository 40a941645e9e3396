use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::domain::{
    category::Category,
    record::Record,
    status::{parse_date, LifecycleStatus},
};

/// Status counts over a group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    /// Number of records.
    pub total: usize,
    /// Records that are active.
    pub active: usize,
    /// Records that expire within the warning window.
    pub soon: usize,
    /// Records that have expired.
    pub expired: usize,
}

impl CategoryStats {
    /// Counts a group of statuses.
    pub fn tally(statuses: impl IntoIterator<Item = LifecycleStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut stats, status| {
            stats.record(status);
            stats
        })
    }

    fn record(&mut self, status: LifecycleStatus) {
        self.total += 1;
        match status {
            LifecycleStatus::Active => self.active += 1,
            LifecycleStatus::SoonToExpire => self.soon += 1,
            LifecycleStatus::Expired => self.expired += 1,
        }
    }

    /// Number of records with the given status.
    #[must_use]
    pub const fn count(&self, status: LifecycleStatus) -> usize {
        match status {
            LifecycleStatus::Active => self.active,
            LifecycleStatus::SoonToExpire => self.soon,
            LifecycleStatus::Expired => self.expired,
        }
    }
}

/// Aggregate figures for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Every live record, procedures included.
    pub total_records: usize,
    /// Status counts over status-bearing records.
    pub overall: CategoryStats,
    /// Percentage of status-bearing records that are active, rounded to the
    /// nearest integer. Zero when there are none.
    pub compliance_rate: u32,
    /// Sum of every record's cost. Lease contracts contribute both tracks.
    pub total_cost: f64,
    /// Status counts per status-bearing category.
    pub categories: BTreeMap<Category, CategoryStats>,
}

impl DashboardStats {
    /// Aggregates a set of live records.
    pub fn compute<'a>(records: impl IntoIterator<Item = (Category, &'a Record)>) -> Self {
        let mut stats = Self {
            categories: Category::ALL
                .into_iter()
                .filter(|category| category.has_status())
                .map(|category| (category, CategoryStats::default()))
                .collect(),
            ..Self::default()
        };

        for (category, record) in records {
            stats.total_records += 1;
            stats.total_cost += record.cost();

            let Some(status) = record.status() else {
                continue;
            };
            stats.overall.record(status);
            stats.categories.entry(category).or_default().record(status);
        }

        stats.compliance_rate = percentage(stats.overall.active, stats.overall.total);
        stats
    }
}

/// `part / whole` as a percentage, rounded half up.
fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 200 + whole) / (whole * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// One row of the unified all-records view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedRow {
    /// The record's category.
    pub category: Category,
    /// The record's identifier.
    pub id: u64,
    /// The record's name.
    pub name: String,
    /// The record's reference number.
    pub number: String,
    /// The expiry shown for the record; for lease contracts the documented
    /// date, falling back to the internal one.
    pub expiry: Option<String>,
    /// The record's cached status.
    pub status: LifecycleStatus,
    /// The record's cost.
    pub cost: f64,
}

/// Flattens every status-bearing record into one view, most urgent first.
///
/// Records with equal status keep their input order.
pub fn unified_rows<'a>(
    records: impl IntoIterator<Item = (Category, &'a Record)>,
) -> Vec<UnifiedRow> {
    let mut rows: Vec<_> = records
        .into_iter()
        .filter_map(|(category, record)| {
            let status = record.status()?;
            Some(UnifiedRow {
                category,
                id: record.id(),
                name: record.name().to_string(),
                number: record.number().to_string(),
                expiry: record.primary_expiry().map(str::to_string),
                status,
                cost: record.cost(),
            })
        })
        .collect();
    rows.sort_by_key(|row| row.status.weight());
    rows
}

/// A record due on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    /// The record's category.
    pub category: Category,
    /// The record's identifier.
    pub id: u64,
    /// The record's name.
    pub name: String,
    /// The record's cached status.
    pub status: LifecycleStatus,
}

/// Groups records whose primary expiry falls in the given month by day of
/// the month.
///
/// Records without a well-formed primary expiry are left out.
pub fn calendar_month<'a>(
    records: impl IntoIterator<Item = (Category, &'a Record)>,
    year: i32,
    month: u32,
) -> BTreeMap<u32, Vec<CalendarEntry>> {
    let mut days: BTreeMap<u32, Vec<CalendarEntry>> = BTreeMap::new();

    for (category, record) in records {
        let Some(status) = record.status() else {
            continue;
        };
        let Some(date) = record.primary_expiry().and_then(parse_date) else {
            continue;
        };
        if date.year() != year || date.month() != month {
            continue;
        }
        days.entry(date.day()).or_default().push(CalendarEntry {
            category,
            id: record.id(),
            name: record.name().to_string(),
            status,
        });
    }

    days
}

/// Narrows a list of records by text, status and category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Case-insensitive substring searched in the record's text. Empty
    /// matches everything.
    pub query: String,
    /// Only keep records with this status. Records without a status never
    /// match a status filter.
    pub status: Option<LifecycleStatus>,
    /// Only keep records of these categories. Empty keeps all.
    pub categories: Vec<Category>,
}

impl RecordFilter {
    /// Whether a record passes every criterion.
    #[must_use]
    pub fn matches(&self, category: Category, record: &Record) -> bool {
        (self.categories.is_empty() || self.categories.contains(&category))
            && self.status.is_none_or(|status| record.status() == Some(status))
            && record.matches_query(&self.query)
    }
}
