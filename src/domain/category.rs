use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The category tag routing a record to its owning collection.
///
/// Each tag maps to exactly one live collection. `LeaseContract` is the only
/// category holding [`DualTrackRecord`](crate::domain::DualTrackRecord)s,
/// `Procedure` the only one without expiry semantics; every other category
/// holds [`SimpleRecord`](crate::domain::SimpleRecord)s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Commercial licences.
    CommercialLicense,
    /// Operational licences.
    OperationalLicense,
    /// Civil defence certificates.
    CivilDefenseCert,
    /// Special agencies (powers of attorney).
    SpecialAgency,
    /// Lease contracts, with documented and internal expiry tracks.
    LeaseContract,
    /// Supplier contracts.
    GeneralContract,
    /// Procedures and requirements reference data.
    Procedure,
    /// Miscellaneous topics.
    OtherTopic,
    /// Registered trademark certificates.
    TrademarkCert,
}

/// The payload shape stored by a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single expiry date.
    Simple,
    /// Two independent expiry tracks.
    DualTrack,
    /// Reference data without expiry.
    Procedure,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 9] = [
        Self::CommercialLicense,
        Self::OperationalLicense,
        Self::CivilDefenseCert,
        Self::SpecialAgency,
        Self::LeaseContract,
        Self::GeneralContract,
        Self::Procedure,
        Self::OtherTopic,
        Self::TrademarkCert,
    ];

    /// The tag as it appears in snapshots and on the command line.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::CommercialLicense => "commercialLicense",
            Self::OperationalLicense => "operationalLicense",
            Self::CivilDefenseCert => "civilDefenseCert",
            Self::SpecialAgency => "specialAgency",
            Self::LeaseContract => "leaseContract",
            Self::GeneralContract => "generalContract",
            Self::Procedure => "procedure",
            Self::OtherTopic => "otherTopic",
            Self::TrademarkCert => "trademarkCert",
        }
    }

    /// A human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CommercialLicense => "Commercial licenses",
            Self::OperationalLicense => "Operational licenses",
            Self::CivilDefenseCert => "Civil defense certificates",
            Self::SpecialAgency => "Special agencies",
            Self::LeaseContract => "Lease contracts",
            Self::GeneralContract => "Supplier contracts",
            Self::Procedure => "Procedures",
            Self::OtherTopic => "Other topics",
            Self::TrademarkCert => "Trademark certificates",
        }
    }

    /// The payload shape of records in this category.
    #[must_use]
    pub const fn shape(self) -> Shape {
        match self {
            Self::LeaseContract => Shape::DualTrack,
            Self::Procedure => Shape::Procedure,
            _ => Shape::Simple,
        }
    }

    /// Whether records in this category carry a lifecycle status.
    #[must_use]
    pub const fn has_status(self) -> bool {
        !matches!(self.shape(), Shape::Procedure)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a category tag does not name a known collection.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown category '{0}'")]
pub struct UnknownCategoryError(pub String);

impl FromStr for Category {
    type Err = UnknownCategoryError;

    /// Parses a category tag.
    ///
    /// Matching ignores ASCII case and `-`/`_` separators, so
    /// `leaseContract`, `lease-contract` and `LEASE_CONTRACT` are equivalent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Self::ALL
            .into_iter()
            .find(|category| category.tag().eq_ignore_ascii_case(&normalised))
            .ok_or_else(|| UnknownCategoryError(s.to_string()))
    }
}
