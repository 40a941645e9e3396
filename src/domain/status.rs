//! Lifecycle classification of expiry dates.
//!
//! Every status-bearing record is tagged with a [`LifecycleStatus`] derived
//! from its expiry date(s). Classification works on calendar days, never on
//! instants, so two evaluations on the same day always agree regardless of
//! the time at which they run.

use std::{fmt, str::FromStr};

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Number of days ahead of today during which a record is flagged as soon to
/// expire.
///
/// The window is inclusive at both ends: a record expiring today, or exactly
/// this many days from today, is [`LifecycleStatus::SoonToExpire`].
pub const WARNING_WINDOW_DAYS: u64 = 120;

/// The lifecycle state of a record with respect to its expiry date.
///
/// Variants are declared in increasing order of severity, so the derived
/// [`Ord`] ranks `Expired > SoonToExpire > Active`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum LifecycleStatus {
    /// The record is valid beyond the warning window, or never expires.
    #[default]
    #[serde(alias = "نشط")]
    Active,
    /// The record expires within the warning window (today included).
    #[serde(alias = "قارب على الانتهاء")]
    SoonToExpire,
    /// The expiry date is in the past.
    #[serde(alias = "منتهي")]
    Expired,
}

impl LifecycleStatus {
    /// All statuses, most severe first.
    pub const ALL: [Self; 3] = [Self::Expired, Self::SoonToExpire, Self::Active];

    /// Sort weight used when ordering records by urgency.
    ///
    /// Expired records sort first. Records without a status at all use
    /// [`Self::weight_of`] and sort last.
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::Expired => 1,
            Self::SoonToExpire => 2,
            Self::Active => 3,
        }
    }

    /// Sort weight for an optional status; absent statuses weigh 4.
    #[must_use]
    pub const fn weight_of(status: Option<Self>) -> u8 {
        match status {
            Some(status) => status.weight(),
            None => 4,
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "Active",
            Self::SoonToExpire => "Soon to expire",
            Self::Expired => "Expired",
        };
        f.write_str(label)
    }
}

/// Error returned when a status name cannot be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown status '{0}' (expected one of: active, soon, expired)")]
pub struct UnknownStatusError(String);

impl FromStr for LifecycleStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "active" => Ok(Self::Active),
            "soon" | "soon-to-expire" | "soontoexpire" => Ok(Self::SoonToExpire),
            "expired" => Ok(Self::Expired),
            _ => Err(UnknownStatusError(s.to_string())),
        }
    }
}

/// Today's date on the local calendar.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The last day (inclusive) of the warning window starting at `today`.
#[must_use]
pub fn warning_horizon(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(WARNING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

/// Parses a `YYYY-MM-DD` date.
///
/// The input must consist of exactly three dash-separated integer parts that
/// name a real calendar day. Anything else yields `None`.
#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let mut parts = input.trim().split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let year = year.parse::<i32>().ok()?;
    let month = month.parse::<u32>().ok()?;
    let day = day.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Classifies an expiry date against today's local date.
///
/// See [`classify_on`].
#[must_use]
pub fn classify(expiry_date: Option<&str>) -> LifecycleStatus {
    classify_on(expiry_date, today())
}

/// Classifies an expiry date against the given calendar day.
///
/// - no date, or an empty one, is [`LifecycleStatus::Active`]
/// - a malformed date is also [`LifecycleStatus::Active`]; bad data never
///   raises an alarm nor an error
/// - a date before `today` is [`LifecycleStatus::Expired`]
/// - a date from `today` up to and including `today + 120 days` is
///   [`LifecycleStatus::SoonToExpire`]
#[must_use]
pub fn classify_on(expiry_date: Option<&str>, today: NaiveDate) -> LifecycleStatus {
    let Some(expiry) = expiry_date.and_then(parse_date) else {
        return LifecycleStatus::Active;
    };

    if expiry < today {
        LifecycleStatus::Expired
    } else if expiry <= warning_horizon(today) {
        LifecycleStatus::SoonToExpire
    } else {
        LifecycleStatus::Active
    }
}

/// Combines several sub-statuses into one overall status.
///
/// The most severe status wins. Absent statuses are ignored, and an empty
/// (or all-absent) input is [`LifecycleStatus::Active`]. The reduction is
/// order-independent.
pub fn reconcile<I, S>(statuses: I) -> LifecycleStatus
where
    I: IntoIterator<Item = S>,
    S: Into<Option<LifecycleStatus>>,
{
    statuses
        .into_iter()
        .filter_map(Into::<Option<LifecycleStatus>>::into)
        .max()
        .unwrap_or_default()
}

/// Whole days from `today` until the expiry date.
///
/// Negative when the date has passed. `None` for absent or malformed dates.
#[must_use]
pub fn remaining_days(expiry_date: Option<&str>, today: NaiveDate) -> Option<i64> {
    let expiry = expiry_date.and_then(parse_date)?;
    Some((expiry - today).num_days())
}

/// A short human-readable description of the time left before expiry.
#[must_use]
pub fn describe_remaining(expiry_date: Option<&str>, today: NaiveDate) -> String {
    match remaining_days(expiry_date, today) {
        None => "-".to_string(),
        Some(days) if days < 0 => format!("expired {} days ago", days.unsigned_abs()),
        Some(0) => "expires today".to_string(),
        Some(1) => "1 day".to_string(),
        Some(days) => format!("{days} days"),
    }
}
