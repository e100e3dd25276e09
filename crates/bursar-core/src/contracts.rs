//! Request payloads accepted by the service.
//!
//! Every field is optional at the serde level so that the validation step, not the
//! deserializer, decides what is missing and names it. Application fields accept the
//! storage column spelling as an alias (see [`crate::fields::ApplicationField`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePayload {
    #[serde(alias = "firstname")]
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPreferencesPayload {
    #[serde(alias = "loanSpecifics_willing_to_pay")]
    pub willing_to_pay: Option<Decimal>,
    #[serde(alias = "loanSpecifics_loanSize")]
    pub loan_size: Option<Decimal>,
    #[serde(alias = "loanSpecifics_howSoon")]
    pub how_soon: Option<String>,
    #[serde(alias = "loanSpecifics_firstLoan")]
    pub first_loan: Option<String>,
    #[serde(alias = "loanSpecifics_whatDoLoan")]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCreate {
    #[serde(alias = "jpfID")]
    pub reference_code: Option<String>,
    #[serde(alias = "startTime")]
    pub date_applied: Option<DateTime<Utc>>,
    pub email: Option<String>,
    #[serde(alias = "basicInformation_email")]
    pub email2: Option<String>,
    #[serde(alias = "basicInformation_firstname")]
    pub first_name: Option<String>,
    #[serde(alias = "basicInformation_lastname")]
    pub last_name: Option<String>,
    #[serde(alias = "basicInformation_mobile")]
    pub phone_number: Option<String>,
    #[serde(alias = "academicInformation_studentID")]
    pub mat_number: Option<String>,
    #[serde(alias = "academicInformation_school")]
    pub university_string: Option<String>,
    #[serde(alias = "basicInformation_countryofresidence")]
    pub country: Option<String>,
    #[serde(alias = "basicInformation_regionofresidence")]
    pub region: Option<String>,
    #[serde(alias = "basicInformation_address")]
    pub address: Option<String>,
    #[serde(alias = "academicInformation_graduation")]
    pub graduation_date: Option<String>,
    #[serde(default)]
    pub references: Vec<ReferencePayload>,
    pub loan_preferences: Option<LoanPreferencesPayload>,
    pub status: Option<String>,
    #[serde(alias = "university")]
    pub university_id: Option<i64>,
    pub start_date: Option<String>,
    pub tuition_amount: Option<Decimal>,
    pub arrears_amount: Option<Decimal>,
}

/// Partial update; absent or null fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(alias = "startTime")]
    pub date_applied: Option<DateTime<Utc>>,
    pub email: Option<String>,
    #[serde(alias = "basicInformation_email")]
    pub email2: Option<String>,
    #[serde(alias = "basicInformation_firstname")]
    pub first_name: Option<String>,
    #[serde(alias = "basicInformation_lastname")]
    pub last_name: Option<String>,
    #[serde(alias = "basicInformation_mobile")]
    pub phone_number: Option<String>,
    #[serde(alias = "academicInformation_studentID")]
    pub mat_number: Option<String>,
    #[serde(alias = "academicInformation_school")]
    pub university_string: Option<String>,
    #[serde(alias = "basicInformation_countryofresidence")]
    pub country: Option<String>,
    #[serde(alias = "basicInformation_regionofresidence")]
    pub region: Option<String>,
    #[serde(alias = "basicInformation_address")]
    pub address: Option<String>,
    #[serde(alias = "academicInformation_graduation")]
    pub graduation_date: Option<String>,
    pub references: Option<Vec<ReferencePayload>>,
    pub loan_preferences: Option<LoanPreferencesPayload>,
    pub status: Option<String>,
    #[serde(alias = "university")]
    pub university_id: Option<i64>,
    pub start_date: Option<String>,
    pub tuition_amount: Option<Decimal>,
    pub arrears_amount: Option<Decimal>,
    pub expected_version: Option<i64>,
}

/// Staff decision on an open or pending application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub approve: Option<bool>,
    #[serde(alias = "university")]
    pub university_id: Option<i64>,
    pub start_date: Option<String>,
    pub tuition_amount: Option<Decimal>,
    pub arrears_amount: Option<Decimal>,
    /// Non-approved outcome to record instead of `denied`.
    pub status: Option<String>,
    pub expected_version: Option<i64>,
}

/// Post-approval edit of the financial terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAmendment {
    #[serde(alias = "university")]
    pub university_id: Option<i64>,
    pub start_date: Option<String>,
    pub tuition_amount: Option<Decimal>,
    pub arrears_amount: Option<Decimal>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCreate {
    pub student_id: Option<i64>,
    pub date: Option<String>,
    pub memo: Option<String>,
    pub amount: Option<Decimal>,
    pub reference_id: Option<String>,
    pub complete: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositUpdate {
    pub date: Option<String>,
    pub memo: Option<String>,
    pub amount: Option<Decimal>,
    pub reference_id: Option<String>,
    pub complete: Option<bool>,
}

/// Links an unmatched deposit to the application holding this mat number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositResolve {
    pub student_mat: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreate {
    pub student_id: Option<i64>,
    pub memo: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub memo: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCreate {
    pub student_id: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentUpdate {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityCreate {
    pub name: Option<String>,
    pub app_fee_flat: Option<Decimal>,
    pub app_fee_percentage: Option<Decimal>,
    pub during_studies_min_payment: Option<Decimal>,
    pub during_studies_membership_fee: Option<Decimal>,
    pub after_studies_min_payment: Option<Decimal>,
    pub after_studies_membership_fee: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerListQuery {
    pub student_id: Option<i64>,
    pub include_voided: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
