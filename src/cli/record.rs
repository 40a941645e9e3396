use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use saher::{
    domain::record::{ContractType, RenewalType},
    Category, DualTrackRecord, Ledger, ProcedureRecord, Record, SimpleRecord,
};
use tracing::instrument;

use super::{parse_category, report_save_notice, terminal::Colorize};

/// Field values given on the command line.
///
/// Every field is optional. Fields that do not apply to the record's
/// category are rejected rather than silently dropped. For optional text
/// fields, an empty value clears the field.
#[derive(Debug, Default, Args)]
pub struct Fields {
    /// Name (for procedures, the licence name)
    #[arg(long)]
    pub(super) name: Option<String>,

    /// Reference number
    #[arg(long)]
    pub(super) number: Option<String>,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub(super) expiry: Option<String>,

    /// Registration date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub(super) registered: Option<String>,

    /// Cost
    #[arg(long)]
    pub(super) cost: Option<f64>,

    /// How a supplier contract is renewed
    #[arg(long, value_enum)]
    pub(super) renewal: Option<Renewal>,

    /// Expiry date of a lease's documented contract (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub(super) documented_expiry: Option<String>,

    /// Expiry date of a lease's internal contract (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub(super) internal_expiry: Option<String>,

    /// Cost of a lease's documented contract
    #[arg(long)]
    pub(super) documented_cost: Option<f64>,

    /// Cost of a lease's internal contract
    #[arg(long)]
    pub(super) internal_cost: Option<f64>,

    /// Which of a lease's contracts are in use
    #[arg(long, value_enum)]
    pub(super) contract_type: Option<Contract>,

    /// Issuing authority of a procedure
    #[arg(long)]
    pub(super) authority: Option<String>,

    /// Contact telephone numbers of a procedure's authority
    #[arg(long)]
    pub(super) contact: Option<String>,

    /// Contact email address of a procedure's authority
    #[arg(long)]
    pub(super) email: Option<String>,

    /// Name of the authority's online portal
    #[arg(long)]
    pub(super) website_name: Option<String>,

    /// URL of the authority's online portal
    #[arg(long)]
    pub(super) website_url: Option<String>,

    /// Portal user name
    #[arg(long)]
    pub(super) username: Option<String>,

    /// Portal password
    #[arg(long)]
    pub(super) password: Option<String>,

    /// Responsible employee
    #[arg(long)]
    pub(super) employee_name: Option<String>,

    /// Responsible employee's number
    #[arg(long)]
    pub(super) employee_number: Option<String>,

    /// Documents and conditions required by the authority
    #[arg(long)]
    pub(super) requirements: Option<String>,

    /// Free-text notes
    #[arg(long)]
    pub(super) notes: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Renewal {
    Automatic,
    Manual,
}

impl From<Renewal> for RenewalType {
    fn from(renewal: Renewal) -> Self {
        match renewal {
            Renewal::Automatic => Self::Automatic,
            Renewal::Manual => Self::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Contract {
    Documented,
    Internal,
    Both,
}

impl From<Contract> for ContractType {
    fn from(contract: Contract) -> Self {
        match contract {
            Contract::Documented => Self::Documented,
            Contract::Internal => Self::Internal,
            Contract::Both => Self::DocumentedAndInternal,
        }
    }
}

impl Fields {
    /// Writes the given fields into a record.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first field that does not apply to the
    /// record's shape.
    fn apply(&self, record: &mut Record) -> anyhow::Result<()> {
        match record {
            Record::Simple(record) => self.apply_simple(record),
            Record::DualTrack(record) => self.apply_dual_track(record),
            Record::Procedure(record) => self.apply_procedure(record),
        }
    }

    fn apply_simple(&self, record: &mut SimpleRecord) -> anyhow::Result<()> {
        Self::reject(&[
            ("--documented-expiry", self.documented_expiry.is_some()),
            ("--internal-expiry", self.internal_expiry.is_some()),
            ("--documented-cost", self.documented_cost.is_some()),
            ("--internal-cost", self.internal_cost.is_some()),
            ("--contract-type", self.contract_type.is_some()),
        ])?;
        self.reject_procedure_fields()?;

        set(&mut record.name, self.name.as_ref());
        set(&mut record.number, self.number.as_ref());
        set_date(&mut record.expiry_date, self.expiry.as_ref());
        set_date(&mut record.registration_date, self.registered.as_ref());
        if let Some(cost) = self.cost {
            record.cost = cost;
        }
        if let Some(renewal) = self.renewal {
            record.renewal_type = Some(renewal.into());
        }
        set_optional(&mut record.notes, self.notes.as_ref());
        Ok(())
    }

    fn apply_dual_track(&self, record: &mut DualTrackRecord) -> anyhow::Result<()> {
        Self::reject(&[
            ("--expiry (use --documented-expiry or --internal-expiry)", self.expiry.is_some()),
            ("--cost (use --documented-cost or --internal-cost)", self.cost.is_some()),
            ("--registered", self.registered.is_some()),
            ("--renewal", self.renewal.is_some()),
        ])?;
        self.reject_procedure_fields()?;

        set(&mut record.name, self.name.as_ref());
        set(&mut record.number, self.number.as_ref());
        set_date(&mut record.documented_expiry_date, self.documented_expiry.as_ref());
        set_date(&mut record.internal_expiry_date, self.internal_expiry.as_ref());
        if let Some(cost) = self.documented_cost {
            record.documented_cost = Some(cost);
        }
        if let Some(cost) = self.internal_cost {
            record.internal_cost = Some(cost);
        }
        if let Some(contract) = self.contract_type {
            record.contract_type = Some(contract.into());
        }
        set_optional(&mut record.notes, self.notes.as_ref());
        Ok(())
    }

    fn apply_procedure(&self, record: &mut ProcedureRecord) -> anyhow::Result<()> {
        Self::reject(&[
            ("--number", self.number.is_some()),
            ("--expiry", self.expiry.is_some()),
            ("--registered", self.registered.is_some()),
            ("--cost", self.cost.is_some()),
            ("--renewal", self.renewal.is_some()),
            ("--documented-expiry", self.documented_expiry.is_some()),
            ("--internal-expiry", self.internal_expiry.is_some()),
            ("--documented-cost", self.documented_cost.is_some()),
            ("--internal-cost", self.internal_cost.is_some()),
            ("--contract-type", self.contract_type.is_some()),
        ])?;

        set(&mut record.license_name, self.name.as_ref());
        set(&mut record.authority, self.authority.as_ref());
        set(&mut record.contact_numbers, self.contact.as_ref());
        set(&mut record.email, self.email.as_ref());
        set(&mut record.website_name, self.website_name.as_ref());
        set(&mut record.website_url, self.website_url.as_ref());
        set(&mut record.username, self.username.as_ref());
        set(&mut record.password, self.password.as_ref());
        set_optional(&mut record.employee_name, self.employee_name.as_ref());
        set_optional(&mut record.employee_number, self.employee_number.as_ref());
        set_optional(&mut record.requirements, self.requirements.as_ref());
        set_optional(&mut record.notes, self.notes.as_ref());
        Ok(())
    }

    fn reject_procedure_fields(&self) -> anyhow::Result<()> {
        Self::reject(&[
            ("--authority", self.authority.is_some()),
            ("--contact", self.contact.is_some()),
            ("--email", self.email.is_some()),
            ("--website-name", self.website_name.is_some()),
            ("--website-url", self.website_url.is_some()),
            ("--username", self.username.is_some()),
            ("--password", self.password.is_some()),
            ("--employee-name", self.employee_name.is_some()),
            ("--employee-number", self.employee_number.is_some()),
            ("--requirements", self.requirements.is_some()),
        ])
    }

    fn reject(flags: &[(&str, bool)]) -> anyhow::Result<()> {
        if let Some((flag, _)) = flags.iter().find(|(_, given)| *given) {
            anyhow::bail!("{flag} does not apply to this category");
        }
        Ok(())
    }
}

fn set(field: &mut String, value: Option<&String>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

fn set_optional(field: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value {
        *field = (!value.trim().is_empty()).then(|| value.clone());
    }
}

/// Like [`set_optional`], but warns about values that are not dates.
///
/// Malformed dates are stored as given; they classify as active.
fn set_date(field: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
    {
        if saher::domain::status::parse_date(value).is_none() {
            eprintln!(
                "{}",
                format!("⚠️  '{value}' is not a YYYY-MM-DD date; the record will show as active")
                    .warning()
            );
        }
    }
    set_optional(field, value);
}

fn empty_record(category: Category) -> Record {
    match category.shape() {
        saher::domain::Shape::Simple => SimpleRecord::default().into(),
        saher::domain::Shape::DualTrack => DualTrackRecord::default().into(),
        saher::domain::Shape::Procedure => ProcedureRecord::default().into(),
    }
}

#[derive(Debug, Parser)]
pub struct Add {
    /// The category to add the record to
    #[clap(value_parser = parse_category)]
    pub(super) category: Category,

    #[command(flatten)]
    pub(super) fields: Fields,
}

impl Add {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut record = empty_record(self.category);
        self.fields.apply(&mut record)?;
        if record.name().trim().is_empty() {
            anyhow::bail!("--name is required");
        }

        let mut ledger = Ledger::open(root);
        let id = ledger.create(self.category, record)?;
        report_save_notice(&mut ledger);

        let status = ledger
            .store()
            .find(self.category, id)
            .and_then(Record::status)
            .map(|status| format!(" ({status})"))
            .unwrap_or_default();
        println!(
            "{}",
            format!("✅ Added {} record {id}{status}", self.category).success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Update {
    /// The category of the record
    #[clap(value_parser = parse_category)]
    category: Category,

    /// The record's identifier
    id: u64,

    #[command(flatten)]
    fields: Fields,
}

impl Update {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = Ledger::open(root);

        let mut record = ledger
            .store()
            .find(self.category, self.id)
            .cloned()
            .with_context(|| format!("No {} record with id {}", self.category, self.id))?;
        self.fields.apply(&mut record)?;

        if !ledger.update(self.category, record)? {
            anyhow::bail!("No {} record with id {}", self.category, self.id);
        }
        report_save_notice(&mut ledger);

        println!(
            "{}",
            format!("✅ Updated {} record {}", self.category, self.id).success()
        );
        Ok(())
    }
}
