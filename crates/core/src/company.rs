//! Company and compliance-module models.
//!
//! A company carries one [`ComplianceModule`] per [`ModuleKind`]. The
//! persistence layer owns these rows; this workspace only reads them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days between the notification date and the end date of a module.
pub const NOTIFICATION_LEAD_DAYS: i64 = 30;

/// The three tracked compliance obligations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Certificate,
    Resolution,
    SupportingDocument,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 3] = [
        ModuleKind::Certificate,
        ModuleKind::Resolution,
        ModuleKind::SupportingDocument,
    ];

    /// Human-readable label used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            ModuleKind::Certificate => "Electronic Invoicing Certificate",
            ModuleKind::Resolution => "Invoicing Resolution",
            ModuleKind::SupportingDocument => "Supporting Document Resolution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyKind {
    NaturalPerson,
    LegalEntity,
    Consortium,
    Other,
}

/// One compliance obligation attached to a company.
///
/// `notification_date` is derived: always exactly
/// [`NOTIFICATION_LEAD_DAYS`] before `end_date` when an end date is present.
/// Use [`ComplianceModule::set_end_date`] to keep the pair consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceModule {
    pub active: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notification_date: Option<NaiveDate>,
    pub renewed: bool,
    pub invoiced: bool,
    pub comments: Option<String>,
}

impl ComplianceModule {
    /// Set (or clear) the end date, recomputing the derived notification date.
    pub fn set_end_date(&mut self, end_date: Option<NaiveDate>) {
        self.end_date = end_date;
        self.notification_date = end_date.map(|d| d - Duration::days(NOTIFICATION_LEAD_DAYS));
    }

    /// A module that has been both renewed and invoiced needs no attention.
    pub fn fully_resolved(&self) -> bool {
        self.renewed && self.invoiced
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    /// Tax identification number, unique per company.
    pub tax_id: String,
    pub name: String,
    pub kind: CompanyKind,
    pub status: CompanyStatus,
    pub certificate: ComplianceModule,
    pub resolution: ComplianceModule,
    pub supporting_document: ComplianceModule,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn module(&self, kind: ModuleKind) -> &ComplianceModule {
        match kind {
            ModuleKind::Certificate => &self.certificate,
            ModuleKind::Resolution => &self.resolution,
            ModuleKind::SupportingDocument => &self.supporting_document,
        }
    }

    pub fn has_active_module(&self) -> bool {
        ModuleKind::ALL.iter().any(|k| self.module(*k).active)
    }
}
