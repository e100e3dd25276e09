use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raised when an external string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value {value:?}, expected one of {expected}")]
pub struct UnknownVariant {
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Open,
    Pending,
    Approved,
    Denied,
    Completed,
    ProspectiveScholarship,
    RetroactiveScholarship,
}

impl ApplicationStatus {
    pub const EXPECTED: &'static str =
        "open, pending, approved, denied, completed, prospective_scholarship, retroactive_scholarship";

    pub const fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Open => "open",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Denied => "denied",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::ProspectiveScholarship => "prospective_scholarship",
            ApplicationStatus::RetroactiveScholarship => "retroactive_scholarship",
        }
    }

    /// Statuses that carry a full set of approved financial terms.
    pub const fn is_approved(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Completed)
    }

    /// Statuses a resolution decision may still be recorded against.
    pub const fn is_undecided(self) -> bool {
        matches!(self, ApplicationStatus::Open | ApplicationStatus::Pending)
    }

    /// Status moves an ordinary edit may make. Decisions only go through resolution, so an
    /// edit can shuffle between undecided statuses or close out an approved loan.
    pub fn can_edit_to(self, next: ApplicationStatus) -> bool {
        self == next
            || (self.is_undecided() && next.is_undecided())
            || (self == ApplicationStatus::Approved && next == ApplicationStatus::Completed)
    }

    /// Non-approved outcomes a staff decision may land on.
    pub const fn is_declined_outcome(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Denied
                | ApplicationStatus::ProspectiveScholarship
                | ApplicationStatus::RetroactiveScholarship
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(ApplicationStatus::Open),
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "denied" => Ok(ApplicationStatus::Denied),
            "completed" => Ok(ApplicationStatus::Completed),
            "prospective_scholarship" => Ok(ApplicationStatus::ProspectiveScholarship),
            "retroactive_scholarship" => Ok(ApplicationStatus::RetroactiveScholarship),
            _ => Err(UnknownVariant {
                value: value.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Advance,
    MembershipFee,
    ApplicationFee,
    Other,
}

impl InvoiceType {
    pub const EXPECTED: &'static str = "advance, membership_fee, application_fee, other";

    pub const fn as_str(self) -> &'static str {
        match self {
            InvoiceType::Advance => "advance",
            InvoiceType::MembershipFee => "membership_fee",
            InvoiceType::ApplicationFee => "application_fee",
            InvoiceType::Other => "other",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "advance" => Ok(InvoiceType::Advance),
            "membership_fee" => Ok(InvoiceType::MembershipFee),
            "application_fee" => Ok(InvoiceType::ApplicationFee),
            "other" => Ok(InvoiceType::Other),
            _ => Err(UnknownVariant {
                value: value.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Financial terms fixed when an application is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedTerms {
    pub university_id: i64,
    pub start_date: NaiveDate,
    pub tuition_amount: Decimal,
    pub arrears_amount: Decimal,
}

/// The four term columns as they may appear on a record or payload, each possibly unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFields {
    pub university_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub tuition_amount: Option<Decimal>,
    pub arrears_amount: Option<Decimal>,
}

impl TermFields {
    pub const NAMES: [&'static str; 4] = [
        "university_id",
        "start_date",
        "tuition_amount",
        "arrears_amount",
    ];

    fn presence(&self) -> [bool; 4] {
        [
            self.university_id.is_some(),
            self.start_date.is_some(),
            self.tuition_amount.is_some(),
            self.arrears_amount.is_some(),
        ]
    }

    pub fn first_present(&self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .zip(self.presence())
            .find(|(_, present)| *present)
            .map(|(name, _)| *name)
    }

    pub fn first_missing(&self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .zip(self.presence())
            .find(|(_, present)| !*present)
            .map(|(name, _)| *name)
    }

    /// Builds the full term set, or names the first field still unset.
    pub fn complete(&self) -> Result<ApprovedTerms, &'static str> {
        match (
            self.university_id,
            self.start_date,
            self.tuition_amount,
            self.arrears_amount,
        ) {
            (Some(university_id), Some(start_date), Some(tuition_amount), Some(arrears_amount)) => {
                Ok(ApprovedTerms {
                    university_id,
                    start_date,
                    tuition_amount,
                    arrears_amount,
                })
            }
            _ => Err(self.first_missing().unwrap_or(Self::NAMES[0])),
        }
    }

    /// Overlays every field set on `other`.
    pub fn merged_with(&self, other: &TermFields) -> TermFields {
        TermFields {
            university_id: other.university_id.or(self.university_id),
            start_date: other.start_date.or(self.start_date),
            tuition_amount: other.tuition_amount.or(self.tuition_amount),
            arrears_amount: other.arrears_amount.or(self.arrears_amount),
        }
    }
}

impl From<ApprovedTerms> for TermFields {
    fn from(terms: ApprovedTerms) -> Self {
        TermFields {
            university_id: Some(terms.university_id),
            start_date: Some(terms.start_date),
            tuition_amount: Some(terms.tuition_amount),
            arrears_amount: Some(terms.arrears_amount),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub relationship: Option<String>,
}

/// Loan preferences declared by the applicant at intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPreferences {
    pub willing_to_pay: Option<Decimal>,
    pub loan_size: Option<Decimal>,
    pub how_soon: Option<String>,
    pub first_loan: Option<String>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub reference_code: String,
    pub date_applied: Option<DateTime<Utc>>,
    pub email: Option<String>,
    pub email2: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub mat_number: String,
    pub university_string: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub graduation_date: Option<NaiveDate>,
    pub references: Vec<Reference>,
    pub loan_preferences: LoanPreferences,
    pub status: ApplicationStatus,
    pub university_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub tuition_amount: Option<Decimal>,
    pub arrears_amount: Option<Decimal>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn term_fields(&self) -> TermFields {
        TermFields {
            university_id: self.university_id,
            start_date: self.start_date,
            tuition_amount: self.tuition_amount,
            arrears_amount: self.arrears_amount,
        }
    }

    pub fn set_terms(&mut self, terms: Option<ApprovedTerms>) {
        let fields = terms.map(TermFields::from).unwrap_or_default();
        self.university_id = fields.university_id;
        self.start_date = fields.start_date;
        self.tuition_amount = fields.tuition_amount;
        self.arrears_amount = fields.arrears_amount;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    pub fn snapshot(&self) -> StudentSnapshot {
        StudentSnapshot {
            student_name: Some(self.full_name()),
            student_email: self.email.clone().or_else(|| self.email2.clone()),
            student_mat: Some(self.mat_number.clone()),
        }
    }
}

/// Validated application ready to be inserted; the store assigns id, version and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub reference_code: String,
    pub date_applied: Option<DateTime<Utc>>,
    pub email: Option<String>,
    pub email2: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub mat_number: String,
    pub university_string: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub graduation_date: Option<NaiveDate>,
    pub references: Vec<Reference>,
    pub loan_preferences: LoanPreferences,
    pub status: ApplicationStatus,
    pub terms: Option<ApprovedTerms>,
}

/// Student details copied onto ledger rows when they are linked to an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub student_mat: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: i64,
    pub student_id: Option<i64>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub memo: String,
    pub reference_id: Option<String>,
    #[serde(flatten)]
    pub student: StudentSnapshot,
    pub complete: bool,
    pub voided_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deposit {
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeposit {
    pub student_id: Option<i64>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub memo: String,
    pub reference_id: Option<String>,
    pub student: StudentSnapshot,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub student_id: i64,
    pub amount: Decimal,
    pub memo: String,
    #[serde(rename = "type")]
    pub kind: InvoiceType,
    #[serde(flatten)]
    pub student: StudentSnapshot,
    pub voided_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub student_id: i64,
    pub amount: Decimal,
    pub memo: String,
    pub kind: InvoiceType,
    pub student: StudentSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub student_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub student_id: i64,
    pub message: String,
}

/// Fee schedule of a partner university.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct University {
    pub id: i64,
    pub name: String,
    pub app_fee_flat: Option<Decimal>,
    pub app_fee_percentage: Option<Decimal>,
    pub during_studies_min_payment: Option<Decimal>,
    pub during_studies_membership_fee: Option<Decimal>,
    pub after_studies_min_payment: Option<Decimal>,
    pub after_studies_membership_fee: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUniversity {
    pub name: String,
    pub app_fee_flat: Option<Decimal>,
    pub app_fee_percentage: Option<Decimal>,
    pub during_studies_min_payment: Option<Decimal>,
    pub during_studies_membership_fee: Option<Decimal>,
    pub after_studies_min_payment: Option<Decimal>,
    pub after_studies_membership_fee: Option<Decimal>,
}

/// Non-voided ledger rows of one application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub deposits: Vec<Deposit>,
    pub invoices: Vec<Invoice>,
}
