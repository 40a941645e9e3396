use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    category::Category,
    record::Record,
    status::{parse_date, warning_horizon, LifecycleStatus},
};

/// A live record with at least one expiry date inside the warning window, or
/// already past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringItem {
    /// The record's category.
    pub category: Category,
    /// The record's identifier.
    pub id: u64,
    /// The record's name.
    pub name: String,
    /// The record's reference number.
    pub number: String,
    /// The first expiry date present on the record.
    pub expiry: Option<String>,
    /// The record's cached status.
    pub status: LifecycleStatus,
}

/// Finds every status-bearing record that is expired or about to expire.
///
/// A record qualifies when any of its well-formed expiry dates falls on or
/// before `today + 120 days`. Malformed dates never qualify. Procedures carry
/// no dates and are never reported.
pub fn scan<'a>(
    records: impl IntoIterator<Item = (Category, &'a Record)>,
    today: NaiveDate,
) -> Vec<ExpiringItem> {
    let horizon = warning_horizon(today);

    records
        .into_iter()
        .filter(|(category, _)| category.has_status())
        .filter(|(_, record)| {
            record
                .expiry_dates()
                .into_iter()
                .filter_map(parse_date)
                .any(|date| date <= horizon)
        })
        .map(|(category, record)| ExpiringItem {
            category,
            id: record.id(),
            name: record.name().to_string(),
            number: record.number().to_string(),
            expiry: record.primary_expiry().map(str::to_string),
            status: record.status().unwrap_or_default(),
        })
        .collect()
}

/// The outcome of one notification check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Records that are expired or about to expire.
    pub items: Vec<ExpiringItem>,
    /// Whether the alert banner should be shown.
    pub should_show: bool,
}

/// Decides when the expiry alert is shown.
///
/// The banner appears at most once per day unless the user has not
/// dismissed it during the current session. `last_checked` is persisted
/// across sessions; `dismissed` is not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCenter {
    /// The last day on which a non-empty expiring set was seen.
    #[serde(default)]
    pub last_checked: Option<NaiveDate>,

    #[serde(skip)]
    dismissed: bool,
}

impl NotificationCenter {
    /// Creates a center that last checked on the given day.
    #[must_use]
    pub const fn new(last_checked: Option<NaiveDate>) -> Self {
        Self {
            last_checked,
            dismissed: false,
        }
    }

    /// Evaluates the display policy for a freshly scanned set.
    ///
    /// The banner is shown when the set is non-empty and either the last
    /// check was not today or the alert has not been dismissed this session.
    /// A non-empty set stamps `last_checked` with `today`.
    pub fn evaluate(&mut self, items: Vec<ExpiringItem>, today: NaiveDate) -> Alert {
        if items.is_empty() {
            return Alert {
                items,
                should_show: false,
            };
        }

        let should_show = self.last_checked != Some(today) || !self.dismissed;
        self.last_checked = Some(today);
        Alert { items, should_show }
    }

    /// Hides the banner for the rest of the session.
    pub const fn dismiss(&mut self) {
        self.dismissed = true;
    }

    /// Whether the banner has been dismissed this session.
    #[must_use]
    pub const fn is_dismissed(&self) -> bool {
        self.dismissed
    }
}

/// Composes a `mailto:` link asking the recipient to start renewals for the
/// given records.
#[must_use]
pub fn compose_alert_email(items: &[ExpiringItem], recipient: &str) -> String {
    let subject = "Important: records entering the expiry warning period";

    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "- {} (number: {}) - expiry date: {}",
                item.name,
                item.number,
                item.expiry.as_deref().unwrap_or("-")
            )
        })
        .collect();

    let body = format!(
        "Hello,\n\n\
         The following records have entered the warning period (less than 4 months) or have already expired:\n\n\
         {}\n\n\
         Please take the necessary steps to start their renewal.\n\n\
         Regards,\n\
         SAHER licence and contract management",
        lines.join("\n")
    );

    format!(
        "mailto:{recipient}?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(&body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        record::{DualTrackRecord, Hydrate, ProcedureRecord, SimpleRecord},
        status::parse_date,
    };

    fn today() -> NaiveDate {
        parse_date("2025-06-01").unwrap()
    }

    fn licence(id: u64, expiry: Option<&str>) -> Record {
        let mut record = SimpleRecord {
            id,
            name: format!("licence {id}"),
            number: format!("N-{id}"),
            expiry_date: expiry.map(str::to_string),
            ..SimpleRecord::default()
        };
        record.hydrate_on(today());
        Record::from(record)
    }

    #[test]
    fn scan_reports_expired_and_soon_records() {
        let records = [
            licence(1, Some("2025-05-01")),
            licence(2, Some("2025-09-29")),
            licence(3, Some("2025-09-30")),
            licence(4, None),
            licence(5, Some("garbage")),
        ];
        let items = scan(
            records.iter().map(|r| (Category::CommercialLicense, r)),
            today(),
        );

        let ids: Vec<_> = items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(items[0].status, LifecycleStatus::Expired);
    }

    #[test]
    fn either_lease_track_triggers_an_alert() {
        let contract = Record::from(DualTrackRecord {
            id: 7,
            name: "Warehouse".to_string(),
            documented_expiry_date: Some("2030-01-01".to_string()),
            internal_expiry_date: Some("2025-07-01".to_string()),
            ..DualTrackRecord::default()
        });

        let items = scan([(Category::LeaseContract, &contract)], today());
        assert_eq!(items.len(), 1);
        // The documented date is reported even though the internal one fired.
        assert_eq!(items[0].expiry.as_deref(), Some("2030-01-01"));
    }

    #[test]
    fn procedures_are_never_reported() {
        let procedure = Record::from(ProcedureRecord::default());
        assert!(scan([(Category::Procedure, &procedure)], today()).is_empty());
    }

    #[test]
    fn banner_shows_once_per_day_after_dismissal() {
        let items = scan(
            [(Category::OtherTopic, &licence(1, Some("2025-06-10")))],
            today(),
        );
        let mut center = NotificationCenter::default();

        assert!(center.evaluate(items.clone(), today()).should_show);
        assert_eq!(center.last_checked, Some(today()));

        // Not dismissed yet, so it keeps showing.
        assert!(center.evaluate(items.clone(), today()).should_show);

        center.dismiss();
        assert!(!center.evaluate(items.clone(), today()).should_show);

        // A new day brings it back.
        let tomorrow = today().succ_opt().unwrap();
        assert!(center.evaluate(items, tomorrow).should_show);
    }

    #[test]
    fn empty_set_hides_banner_and_keeps_marker() {
        let mut center = NotificationCenter::new(Some(today()));
        let tomorrow = today().succ_opt().unwrap();

        let alert = center.evaluate(Vec::new(), tomorrow);
        assert!(!alert.should_show);
        assert_eq!(center.last_checked, Some(today()));
    }

    #[test]
    fn dismissal_is_not_persisted() {
        let mut center = NotificationCenter::new(Some(today()));
        center.dismiss();

        let json = serde_json::to_string(&center).unwrap();
        let restored: NotificationCenter = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_dismissed());
        assert_eq!(restored.last_checked, Some(today()));
    }

    #[test]
    fn email_lists_every_item() {
        let items = scan(
            [
                (Category::CommercialLicense, &licence(1, Some("2025-05-01"))),
                (Category::TrademarkCert, &licence(2, Some("2025-06-02"))),
            ],
            today(),
        );
        let link = compose_alert_email(&items, "ops@example.com");

        assert!(link.starts_with("mailto:ops@example.com?subject="));
        assert!(link.contains("licence%201%20%28number%3A%20N-1%29"));
        assert!(link.contains("2025-06-02"));
        assert!(!link.contains(' '));
    }
}
