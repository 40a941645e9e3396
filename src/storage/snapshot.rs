use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    domain::{
        category::Category,
        record::{DualTrackRecord, Hydrate, ProcedureRecord, Record, SimpleRecord},
        ArchivedRecord,
    },
    storage::store::Store,
};

/// The persisted form of every collection.
///
/// This is the document written to the auto-saved snapshot file and, with a
/// `backupDate` added, to exported backups. Missing or `null` collections
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Commercial licences.
    #[serde(default, deserialize_with = "nullable")]
    pub commercial_licenses: Vec<SimpleRecord>,
    /// Operational licences.
    #[serde(default, deserialize_with = "nullable")]
    pub operational_licenses: Vec<SimpleRecord>,
    /// Civil defence certificates.
    #[serde(default, deserialize_with = "nullable")]
    pub civil_defense_certs: Vec<SimpleRecord>,
    /// Special agencies.
    #[serde(default, deserialize_with = "nullable")]
    pub special_agencies: Vec<SimpleRecord>,
    /// Lease contracts.
    #[serde(default, deserialize_with = "nullable")]
    pub lease_contracts: Vec<DualTrackRecord>,
    /// Supplier contracts.
    #[serde(default, deserialize_with = "nullable")]
    pub general_contracts: Vec<SimpleRecord>,
    /// Procedures.
    #[serde(default, deserialize_with = "nullable")]
    pub procedures: Vec<ProcedureRecord>,
    /// Miscellaneous topics.
    #[serde(default, deserialize_with = "nullable", rename = "otherTopicsData")]
    pub other_topics: Vec<SimpleRecord>,
    /// Trademark certificates.
    #[serde(default, deserialize_with = "nullable")]
    pub trademark_certs: Vec<SimpleRecord>,
    /// The archive, most recently archived first.
    #[serde(default, deserialize_with = "nullable")]
    pub archived_records: Vec<ArchivedRecord>,
}

/// A snapshot stamped with the time it was exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// The exported collections.
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// When the backup was taken.
    pub backup_date: DateTime<Utc>,
}

impl From<Snapshot> for Store {
    /// Builds a store from a snapshot, recomputing every cached status.
    fn from(snapshot: Snapshot) -> Self {
        let live = [
            (Category::CommercialLicense, wrap(snapshot.commercial_licenses)),
            (Category::OperationalLicense, wrap(snapshot.operational_licenses)),
            (Category::CivilDefenseCert, wrap(snapshot.civil_defense_certs)),
            (Category::SpecialAgency, wrap(snapshot.special_agencies)),
            (Category::LeaseContract, wrap(snapshot.lease_contracts)),
            (Category::GeneralContract, wrap(snapshot.general_contracts)),
            (Category::Procedure, wrap(snapshot.procedures)),
            (Category::OtherTopic, wrap(snapshot.other_topics)),
            (Category::TrademarkCert, wrap(snapshot.trademark_certs)),
        ];

        let mut store = Self::from_parts(live, snapshot.archived_records);
        store.hydrate();
        store
    }
}

impl From<&Store> for Snapshot {
    fn from(store: &Store) -> Self {
        let simple = |category: Category| -> Vec<SimpleRecord> {
            store
                .records(category)
                .iter()
                .filter_map(|record| match record {
                    Record::Simple(record) => Some(record.clone()),
                    _ => None,
                })
                .collect()
        };

        Self {
            commercial_licenses: simple(Category::CommercialLicense),
            operational_licenses: simple(Category::OperationalLicense),
            civil_defense_certs: simple(Category::CivilDefenseCert),
            special_agencies: simple(Category::SpecialAgency),
            lease_contracts: store
                .records(Category::LeaseContract)
                .iter()
                .filter_map(|record| match record {
                    Record::DualTrack(record) => Some(record.clone()),
                    _ => None,
                })
                .collect(),
            general_contracts: simple(Category::GeneralContract),
            procedures: store
                .records(Category::Procedure)
                .iter()
                .filter_map(|record| match record {
                    Record::Procedure(record) => Some(record.clone()),
                    _ => None,
                })
                .collect(),
            other_topics: simple(Category::OtherTopic),
            trademark_certs: simple(Category::TrademarkCert),
            archived_records: store.archived().to_vec(),
        }
    }
}

fn wrap<T: Into<Record>>(records: Vec<T>) -> Vec<Record> {
    records.into_iter().map(Into::into).collect()
}

/// Reads a collection, treating `null` as empty.
fn nullable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
