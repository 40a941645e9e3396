//! Record shapes.
//!
//! There are three payload shapes: [`SimpleRecord`] (a single expiry date),
//! [`DualTrackRecord`] (lease contracts with documented and internal expiry
//! tracks) and [`ProcedureRecord`] (reference data, no expiry). The derived
//! status fields are caches: they are recomputed through [`Hydrate`] whenever
//! a record is loaded or saved and are never trusted from storage.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::domain::{
    category::Shape,
    status::{self, classify_on, reconcile, LifecycleStatus},
};

/// A file attached to a record.
///
/// Opaque to the core: the content is carried through storage untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Base64-encoded file content.
    pub data: String,
    /// Original file name.
    pub name: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// How a supplier contract is renewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenewalType {
    /// Renewed automatically.
    #[serde(alias = "تلقائي")]
    Automatic,
    /// Renewed by hand.
    #[serde(alias = "يدوي")]
    Manual,
}

/// Which of a lease contract's tracks are in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    /// Only the documented (notarised) contract.
    #[serde(alias = "عقد موثق")]
    Documented,
    /// Only the internal contract.
    #[serde(alias = "عقد بيني")]
    Internal,
    /// Both a documented and an internal contract.
    #[serde(alias = "عقد موثق + بيني")]
    DocumentedAndInternal,
}

/// A licence-like record with a single, optional expiry date.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRecord {
    /// Unique identifier, assigned by the store.
    #[serde(default)]
    pub id: u64,
    /// Free-text name.
    #[serde(default)]
    pub name: String,
    /// Free-text reference number.
    #[serde(default)]
    pub number: String,
    /// When the record was registered. Informational only.
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub registration_date: Option<String>,
    /// `YYYY-MM-DD` expiry date. `None` means the record never expires.
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<String>,
    /// Cached lifecycle status.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: LifecycleStatus,
    /// Renewal policy, for supplier contracts.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub renewal_type: Option<RenewalType>,
    /// Cost of the licence or contract.
    #[serde(default, deserialize_with = "cost_or_zero")]
    pub cost: f64,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Attached files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// A lease contract with two independent expiry tracks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualTrackRecord {
    /// Unique identifier, assigned by the store.
    #[serde(default)]
    pub id: u64,
    /// Free-text name.
    #[serde(default)]
    pub name: String,
    /// Free-text reference number.
    #[serde(default)]
    pub number: String,
    /// Expiry date of the documented contract.
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub documented_expiry_date: Option<String>,
    /// Expiry date of the internal contract.
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_expiry_date: Option<String>,
    /// Which tracks are in use.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub contract_type: Option<ContractType>,
    /// Cached overall status: the more severe of the two track statuses.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: LifecycleStatus,
    /// Cached status of the documented track, absent without a date.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub documented_status: Option<LifecycleStatus>,
    /// Cached status of the internal track, absent without a date.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_status: Option<LifecycleStatus>,
    /// Cost of the documented contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documented_cost: Option<f64>,
    /// Cost of the internal contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_cost: Option<f64>,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Attached files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Reference data describing how a licence is obtained or renewed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcedureRecord {
    /// Unique identifier, assigned by the store.
    pub id: u64,
    /// The licence this procedure concerns.
    pub license_name: String,
    /// Issuing authority.
    pub authority: String,
    /// Contact telephone numbers.
    pub contact_numbers: String,
    /// Contact email address.
    pub email: String,
    /// Name of the authority's online portal.
    pub website_name: String,
    /// URL of the authority's online portal.
    pub website_url: String,
    /// Portal user name.
    pub username: String,
    /// Portal password.
    pub password: String,
    /// Responsible employee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    /// Responsible employee's number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    /// Documents and conditions required by the authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Attached files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// A record of any shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// A single-expiry record.
    Simple(SimpleRecord),
    /// A lease contract.
    DualTrack(DualTrackRecord),
    /// A procedure.
    Procedure(ProcedureRecord),
}

/// Recomputation of derived status fields.
///
/// This is the single place cached statuses are written. The store calls it
/// on every save and the persistence layer on every load.
pub trait Hydrate {
    /// Recomputes derived fields as of the given calendar day.
    fn hydrate_on(&mut self, today: NaiveDate);

    /// Recomputes derived fields as of today's local date.
    fn hydrate(&mut self) {
        self.hydrate_on(status::today());
    }
}

impl Hydrate for SimpleRecord {
    fn hydrate_on(&mut self, today: NaiveDate) {
        self.status = classify_on(self.expiry_date.as_deref(), today);
    }
}

impl Hydrate for DualTrackRecord {
    fn hydrate_on(&mut self, today: NaiveDate) {
        self.documented_status = self
            .documented_expiry_date
            .as_deref()
            .map(|date| classify_on(Some(date), today));
        self.internal_status = self
            .internal_expiry_date
            .as_deref()
            .map(|date| classify_on(Some(date), today));
        self.status = reconcile([self.documented_status, self.internal_status]);
    }
}

impl Hydrate for ProcedureRecord {
    fn hydrate_on(&mut self, _today: NaiveDate) {}
}

impl Hydrate for Record {
    fn hydrate_on(&mut self, today: NaiveDate) {
        match self {
            Self::Simple(record) => record.hydrate_on(today),
            Self::DualTrack(record) => record.hydrate_on(today),
            Self::Procedure(record) => record.hydrate_on(today),
        }
    }
}

impl<T: Hydrate> Hydrate for [T] {
    fn hydrate_on(&mut self, today: NaiveDate) {
        for item in self {
            item.hydrate_on(today);
        }
    }
}

impl DualTrackRecord {
    /// The expiry date shown when a single date is needed: the documented
    /// date, falling back to the internal one.
    #[must_use]
    pub fn primary_expiry(&self) -> Option<&str> {
        self.documented_expiry_date
            .as_deref()
            .or(self.internal_expiry_date.as_deref())
    }

    /// Sum of both tracks' costs.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.documented_cost.unwrap_or_default() + self.internal_cost.unwrap_or_default()
    }
}

impl Record {
    /// Decodes a record of the given shape from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the shape.
    pub fn from_value(shape: Shape, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match shape {
            Shape::Simple => Self::Simple(serde_json::from_value(value)?),
            Shape::DualTrack => Self::DualTrack(serde_json::from_value(value)?),
            Shape::Procedure => Self::Procedure(serde_json::from_value(value)?),
        })
    }

    /// The payload shape of this record.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self {
            Self::Simple(_) => Shape::Simple,
            Self::DualTrack(_) => Shape::DualTrack,
            Self::Procedure(_) => Shape::Procedure,
        }
    }

    /// The record's identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        match self {
            Self::Simple(record) => record.id,
            Self::DualTrack(record) => record.id,
            Self::Procedure(record) => record.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: u64) {
        match self {
            Self::Simple(record) => record.id = id,
            Self::DualTrack(record) => record.id = id,
            Self::Procedure(record) => record.id = id,
        }
    }

    /// The name shown for this record. For procedures, the licence name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(record) => &record.name,
            Self::DualTrack(record) => &record.name,
            Self::Procedure(record) => &record.license_name,
        }
    }

    /// The reference number. Procedures have none.
    #[must_use]
    pub fn number(&self) -> &str {
        match self {
            Self::Simple(record) => &record.number,
            Self::DualTrack(record) => &record.number,
            Self::Procedure(_) => "",
        }
    }

    /// Free-text notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        match self {
            Self::Simple(record) => record.notes.as_deref(),
            Self::DualTrack(record) => record.notes.as_deref(),
            Self::Procedure(record) => record.notes.as_deref(),
        }
    }

    /// The single expiry date shown for this record, if any.
    #[must_use]
    pub fn primary_expiry(&self) -> Option<&str> {
        match self {
            Self::Simple(record) => record.expiry_date.as_deref(),
            Self::DualTrack(record) => record.primary_expiry(),
            Self::Procedure(_) => None,
        }
    }

    /// Every expiry date present on the record.
    #[must_use]
    pub fn expiry_dates(&self) -> Vec<&str> {
        match self {
            Self::Simple(record) => record.expiry_date.as_deref().into_iter().collect(),
            Self::DualTrack(record) => [
                record.documented_expiry_date.as_deref(),
                record.internal_expiry_date.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Self::Procedure(_) => Vec::new(),
        }
    }

    /// The record's cost. For lease contracts, the sum of both tracks.
    #[must_use]
    pub fn cost(&self) -> f64 {
        match self {
            Self::Simple(record) => record.cost,
            Self::DualTrack(record) => record.total_cost(),
            Self::Procedure(_) => 0.0,
        }
    }

    /// The cached lifecycle status. Procedures have none.
    #[must_use]
    pub const fn status(&self) -> Option<LifecycleStatus> {
        match self {
            Self::Simple(record) => Some(record.status),
            Self::DualTrack(record) => Some(record.status),
            Self::Procedure(_) => None,
        }
    }

    /// Applies a patch of display fields.
    ///
    /// `expiry_date` targets the single expiry of a [`SimpleRecord`] and the
    /// documented track of a [`DualTrackRecord`]. `internal_expiry_date` only
    /// applies to the internal track of a [`DualTrackRecord`]. Procedures
    /// have no expiry.
    pub fn apply(&mut self, patch: &RecordPatch) {
        match self {
            Self::Simple(record) => {
                patch_field(&mut record.name, patch.name.as_ref());
                patch_field(&mut record.number, patch.number.as_ref());
                patch_option(&mut record.notes, patch.notes.as_ref());
                patch_option(&mut record.expiry_date, patch.expiry_date.as_ref());
                if let Some(cost) = patch.cost {
                    record.cost = cost;
                }
            }
            Self::DualTrack(record) => {
                patch_field(&mut record.name, patch.name.as_ref());
                patch_field(&mut record.number, patch.number.as_ref());
                patch_option(&mut record.notes, patch.notes.as_ref());
                patch_option(
                    &mut record.documented_expiry_date,
                    patch.expiry_date.as_ref(),
                );
                patch_option(
                    &mut record.internal_expiry_date,
                    patch.internal_expiry_date.as_ref(),
                );
                if let Some(cost) = patch.cost {
                    record.documented_cost = Some(cost);
                }
            }
            Self::Procedure(record) => {
                patch_field(&mut record.license_name, patch.name.as_ref());
                patch_option(&mut record.notes, patch.notes.as_ref());
            }
        }
    }

    /// Case-insensitive substring match against the record's searchable text.
    ///
    /// An empty query matches everything.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        let hit = |field: &str| field.to_lowercase().contains(&query);
        let notes_hit = self.notes().is_some_and(hit);

        match self {
            Self::Simple(_) | Self::DualTrack(_) => {
                hit(self.name()) || hit(self.number()) || notes_hit
            }
            Self::Procedure(record) => {
                [
                    &record.license_name,
                    &record.authority,
                    &record.contact_numbers,
                    &record.email,
                    &record.website_name,
                    &record.website_url,
                    &record.username,
                ]
                .into_iter()
                .any(|field| hit(field.as_str()))
                    || notes_hit
            }
        }
    }
}

impl From<SimpleRecord> for Record {
    fn from(record: SimpleRecord) -> Self {
        Self::Simple(record)
    }
}

impl From<DualTrackRecord> for Record {
    fn from(record: DualTrackRecord) -> Self {
        Self::DualTrack(record)
    }
}

impl From<ProcedureRecord> for Record {
    fn from(record: ProcedureRecord) -> Self {
        Self::Procedure(record)
    }
}

/// A partial edit of a record's display fields.
///
/// Only fields that are `Some` are written. For `notes` and `expiry_date`, an
/// empty string clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// New name.
    pub name: Option<String>,
    /// New reference number.
    pub number: Option<String>,
    /// New notes.
    pub notes: Option<String>,
    /// New expiry date. For lease contracts, the documented track.
    pub expiry_date: Option<String>,
    /// New internal-track expiry date of a lease contract.
    pub internal_expiry_date: Option<String>,
    /// New cost.
    pub cost: Option<f64>,
}

impl RecordPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.number.is_none()
            && self.notes.is_none()
            && self.expiry_date.is_none()
            && self.internal_expiry_date.is_none()
            && self.cost.is_none()
    }
}

fn patch_field(field: &mut String, value: Option<&String>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

fn patch_option(field: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value {
        *field = (!value.trim().is_empty()).then(|| value.clone());
    }
}

/// Reads an optional string, treating the empty string as absent.
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Reads an optional value, treating `null` or anything unrecognised as
/// absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Reads a cached status. Hydration overwrites it, so `null` or an unknown
/// label reads as the default.
fn lenient_status<'de, D>(deserializer: D) -> Result<LifecycleStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

fn cost_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}
