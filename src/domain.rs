//! Domain models for records management.
//!
//! This module contains the record shapes, category tags, lifecycle status
//! classification, the archive wrapper and the read-side projections
//! (notifications and dashboard statistics).

pub mod archive;
pub use archive::ArchivedRecord;

/// Category tags and payload shapes.
pub mod category;
pub use category::{Category, Shape, UnknownCategoryError};

mod config;
pub use config::{Config, ConfigError};

/// Near-expiry scanning and alert display policy.
pub mod notification;
pub use notification::{Alert, ExpiringItem, NotificationCenter};

pub mod record;
pub use record::{DualTrackRecord, Hydrate, ProcedureRecord, Record, RecordPatch, SimpleRecord};

/// Dashboard aggregation, calendar and filtering.
pub mod stats;
pub use stats::{DashboardStats, RecordFilter};

pub mod status;
pub use status::{classify, classify_on, reconcile, LifecycleStatus};
