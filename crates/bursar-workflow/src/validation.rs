//! Field and cross-field checks run on payloads before anything is persisted.
//!
//! Each payload is first turned into a fully built candidate record; the term
//! coupling rule then runs once over that candidate, so the outcome never depends
//! on the order fields were declared or supplied in.

use std::str::FromStr;

use bursar_core::contracts::{
    ApplicationCreate, ApplicationUpdate, CommentCreate, CommentUpdate, DepositCreate,
    DepositUpdate, InvoiceCreate, InvoiceUpdate, LoanPreferencesPayload, ReferencePayload,
    TermsAmendment, UniversityCreate,
};
use bursar_core::{
    Application, ApplicationStatus, ApprovedTerms, Deposit, DomainError, DomainResult, Invoice,
    LoanPreferences, NewApplication, NewComment, NewDeposit, NewInvoice, NewUniversity, Reference,
    StudentSnapshot, TermFields, UnknownVariant,
};
use bursar_finance::{
    AMOUNT_PRECISION, CURRENCY_SCALE, RATE_PRECISION, RATE_SCALE, numeric_limit,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const MAX_REFERENCES: usize = 3;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn require<T>(value: Option<T>, field: &'static str) -> DomainResult<T> {
    value.ok_or(DomainError::MissingField { field })
}

/// Trimmed, non-blank text. A blank string counts as missing.
pub fn require_text(value: Option<String>, field: &'static str) -> DomainResult<String> {
    optional_text(value).ok_or(DomainError::MissingField { field })
}

pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Replacement text for an update: absent keeps the old value, blank is rejected.
fn replacement_text(value: Option<String>, field: &'static str) -> DomainResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => {
            Err(DomainError::invalid_value(field, "must not be blank"))
        }
        Some(text) => Ok(Some(text.trim().to_string())),
    }
}

pub fn parse_date(raw: &str, field: &'static str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        DomainError::invalid_value(field, format!("{raw:?} is not a YYYY-MM-DD calendar date"))
    })
}

pub fn optional_date(raw: Option<String>, field: &'static str) -> DomainResult<Option<NaiveDate>> {
    raw.as_deref().map(|raw| parse_date(raw, field)).transpose()
}

/// Non-negative currency amount that fits `NUMERIC(12,2)`, normalized to two decimal places.
pub fn validate_amount(amount: Decimal, field: &'static str) -> DomainResult<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::invalid_value(field, "amount must not be negative"));
    }

    let mut normalized = amount.normalize();
    if normalized.scale() > CURRENCY_SCALE {
        return Err(DomainError::invalid_value(
            field,
            format!("amount must have at most {CURRENCY_SCALE} decimal places"),
        ));
    }
    let limit = numeric_limit(AMOUNT_PRECISION, CURRENCY_SCALE);
    if normalized >= limit {
        return Err(DomainError::invalid_value(
            field,
            format!("amount must be below {limit}"),
        ));
    }
    normalized.rescale(CURRENCY_SCALE);
    Ok(normalized)
}

pub fn optional_amount(
    amount: Option<Decimal>,
    field: &'static str,
) -> DomainResult<Option<Decimal>> {
    amount.map(|amount| validate_amount(amount, field)).transpose()
}

/// Percentage that fits `NUMERIC(7,4)`.
fn optional_rate(rate: Option<Decimal>, field: &'static str) -> DomainResult<Option<Decimal>> {
    let Some(rate) = rate else {
        return Ok(None);
    };
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(DomainError::invalid_value(field, "rate must not be negative"));
    }

    let normalized = rate.normalize();
    if normalized.scale() > RATE_SCALE {
        return Err(DomainError::invalid_value(
            field,
            format!("rate must have at most {RATE_SCALE} decimal places"),
        ));
    }
    let limit = numeric_limit(RATE_PRECISION, RATE_SCALE);
    if normalized >= limit {
        return Err(DomainError::invalid_value(
            field,
            format!("rate must be below {limit}"),
        ));
    }
    Ok(Some(normalized))
}

pub fn parse_enum<T>(raw: &str, field: &'static str) -> DomainResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    raw.trim()
        .parse()
        .map_err(|source| DomainError::InvalidEnum { field, source })
}

pub fn parse_status_filter(raw: Option<&str>) -> DomainResult<Option<ApplicationStatus>> {
    raw.map(|raw| parse_enum(raw, "status")).transpose()
}

fn positive_id(id: i64, field: &'static str) -> DomainResult<i64> {
    if id <= 0 {
        return Err(DomainError::invalid_value(field, "id must be positive"));
    }
    Ok(id)
}

/// Approved statuses require every term field; every other status forbids them.
pub fn check_term_coupling(
    status: ApplicationStatus,
    fields: &TermFields,
) -> DomainResult<Option<ApprovedTerms>> {
    if status.is_approved() {
        return fields
            .complete()
            .map(Some)
            .map_err(|field| DomainError::MissingField { field });
    }

    match fields.first_present() {
        Some(field) => Err(DomainError::invalid_state(
            field,
            "field must not be set when not approved",
        )),
        None => Ok(None),
    }
}

/// Parses whichever term fields the payload carries, without judging completeness.
pub fn parse_term_fields(
    university_id: Option<i64>,
    start_date: Option<String>,
    tuition_amount: Option<Decimal>,
    arrears_amount: Option<Decimal>,
) -> DomainResult<TermFields> {
    Ok(TermFields {
        university_id: university_id
            .map(|id| positive_id(id, "university_id"))
            .transpose()?,
        start_date: optional_date(start_date, "start_date")?,
        tuition_amount: optional_amount(tuition_amount, "tuition_amount")?,
        arrears_amount: optional_amount(arrears_amount, "arrears_amount")?,
    })
}

fn references(payloads: Vec<ReferencePayload>) -> DomainResult<Vec<Reference>> {
    if payloads.len() > MAX_REFERENCES {
        return Err(DomainError::invalid_value(
            "references",
            format!("at most {MAX_REFERENCES} references are accepted"),
        ));
    }

    Ok(payloads
        .into_iter()
        .map(|payload| Reference {
            first_name: optional_text(payload.first_name),
            surname: optional_text(payload.surname),
            title: optional_text(payload.title),
            organization: optional_text(payload.organization),
            email: optional_text(payload.email),
            mobile: optional_text(payload.mobile),
            relationship: optional_text(payload.relationship),
        })
        .filter(|reference| reference != &Reference::default())
        .collect())
}

fn loan_preferences(payload: LoanPreferencesPayload) -> DomainResult<LoanPreferences> {
    Ok(LoanPreferences {
        willing_to_pay: optional_amount(payload.willing_to_pay, "willing_to_pay")?,
        loan_size: optional_amount(payload.loan_size, "loan_size")?,
        how_soon: optional_text(payload.how_soon),
        first_loan: optional_text(payload.first_loan),
        purpose: optional_text(payload.purpose),
    })
}

pub fn validate_application_create(
    payload: ApplicationCreate,
    fallback_reference: impl FnOnce() -> String,
) -> DomainResult<NewApplication> {
    let first_name = require_text(payload.first_name, "first_name")?;
    let last_name = require_text(payload.last_name, "last_name")?;
    let mat_number = require_text(payload.mat_number, "mat_number")?;

    let graduation_date = optional_date(payload.graduation_date, "graduation_date")?;
    let references = references(payload.references)?;
    let loan_preferences = loan_preferences(payload.loan_preferences.unwrap_or_default())?;
    let status = match payload.status.as_deref() {
        Some(raw) => parse_enum(raw, "status")?,
        None => ApplicationStatus::Open,
    };
    let fields = parse_term_fields(
        payload.university_id,
        payload.start_date,
        payload.tuition_amount,
        payload.arrears_amount,
    )?;

    let terms = check_term_coupling(status, &fields)?;

    Ok(NewApplication {
        reference_code: optional_text(payload.reference_code).unwrap_or_else(fallback_reference),
        date_applied: payload.date_applied,
        email: optional_text(payload.email),
        email2: optional_text(payload.email2),
        first_name,
        last_name,
        phone_number: optional_text(payload.phone_number),
        mat_number,
        university_string: optional_text(payload.university_string),
        country: optional_text(payload.country),
        region: optional_text(payload.region),
        address: optional_text(payload.address),
        graduation_date,
        references,
        loan_preferences,
        status,
        terms,
    })
}

/// Builds the updated record; term fields only ever widen, and the status may only move the
/// way [`ApplicationStatus::can_edit_to`] allows.
pub fn apply_application_update(
    current: &Application,
    payload: ApplicationUpdate,
) -> DomainResult<Application> {
    let mut next = current.clone();

    if let Some(first_name) = replacement_text(payload.first_name, "first_name")? {
        next.first_name = first_name;
    }
    if let Some(last_name) = replacement_text(payload.last_name, "last_name")? {
        next.last_name = last_name;
    }
    if let Some(mat_number) = replacement_text(payload.mat_number, "mat_number")? {
        next.mat_number = mat_number;
    }
    if payload.date_applied.is_some() {
        next.date_applied = payload.date_applied;
    }
    if let Some(email) = optional_text(payload.email) {
        next.email = Some(email);
    }
    if let Some(email2) = optional_text(payload.email2) {
        next.email2 = Some(email2);
    }
    if let Some(phone_number) = optional_text(payload.phone_number) {
        next.phone_number = Some(phone_number);
    }
    if let Some(university_string) = optional_text(payload.university_string) {
        next.university_string = Some(university_string);
    }
    if let Some(country) = optional_text(payload.country) {
        next.country = Some(country);
    }
    if let Some(region) = optional_text(payload.region) {
        next.region = Some(region);
    }
    if let Some(address) = optional_text(payload.address) {
        next.address = Some(address);
    }
    if let Some(graduation_date) = optional_date(payload.graduation_date, "graduation_date")? {
        next.graduation_date = Some(graduation_date);
    }
    if let Some(payloads) = payload.references {
        next.references = references(payloads)?;
    }
    if let Some(preferences) = payload.loan_preferences {
        next.loan_preferences = loan_preferences(preferences)?;
    }
    if let Some(raw) = payload.status.as_deref() {
        let status = parse_enum(raw, "status")?;
        if !current.status.can_edit_to(status) {
            return Err(DomainError::invalid_state(
                "status",
                format!(
                    "an edit cannot move {} to {status}, decisions go through resolution",
                    current.status
                ),
            ));
        }
        next.status = status;
    }

    let requested = parse_term_fields(
        payload.university_id,
        payload.start_date,
        payload.tuition_amount,
        payload.arrears_amount,
    )?;
    let merged = current.term_fields().merged_with(&requested);
    let terms = check_term_coupling(next.status, &merged)?;
    next.set_terms(terms);

    Ok(next)
}

pub fn apply_terms_amendment(
    current: &Application,
    payload: TermsAmendment,
) -> DomainResult<Application> {
    if !current.status.is_approved() {
        return Err(DomainError::invalid_state(
            "status",
            format!(
                "terms can only be amended on an approved application, this one is {}",
                current.status
            ),
        ));
    }

    let requested = parse_term_fields(
        payload.university_id,
        payload.start_date,
        payload.tuition_amount,
        payload.arrears_amount,
    )?;
    let merged = current.term_fields().merged_with(&requested);
    let terms = check_term_coupling(current.status, &merged)?;

    let mut next = current.clone();
    next.set_terms(terms);
    Ok(next)
}

pub fn validate_deposit_create(payload: DepositCreate) -> DomainResult<NewDeposit> {
    let date = require(payload.date, "date")?;
    let memo = require_text(payload.memo, "memo")?;
    let amount = require(payload.amount, "amount")?;

    Ok(NewDeposit {
        student_id: payload
            .student_id
            .map(|id| positive_id(id, "student_id"))
            .transpose()?,
        amount: validate_amount(amount, "amount")?,
        date: parse_date(&date, "date")?,
        memo,
        reference_id: optional_text(payload.reference_id),
        student: StudentSnapshot::default(),
        complete: payload.complete.unwrap_or(true),
    })
}

/// Full replacement of the editable deposit fields; `complete` keeps its value when absent.
pub fn apply_deposit_update(current: &Deposit, payload: DepositUpdate) -> DomainResult<Deposit> {
    ensure_not_voided(current.voided_at.is_some())?;

    let date = require(payload.date, "date")?;
    let memo = require_text(payload.memo, "memo")?;
    let amount = require(payload.amount, "amount")?;

    let mut next = current.clone();
    next.date = parse_date(&date, "date")?;
    next.memo = memo;
    next.amount = validate_amount(amount, "amount")?;
    next.reference_id = optional_text(payload.reference_id);
    if let Some(complete) = payload.complete {
        next.complete = complete;
    }
    Ok(next)
}

pub fn validate_invoice_create(payload: InvoiceCreate) -> DomainResult<NewInvoice> {
    let student_id = require(payload.student_id, "student_id")?;
    let memo = require_text(payload.memo, "memo")?;
    let amount = require(payload.amount, "amount")?;
    let kind = require(payload.kind, "type")?;

    Ok(NewInvoice {
        student_id: positive_id(student_id, "student_id")?,
        amount: validate_amount(amount, "amount")?,
        memo,
        kind: parse_enum(&kind, "type")?,
        student: StudentSnapshot::default(),
    })
}

pub fn apply_invoice_update(current: &Invoice, payload: InvoiceUpdate) -> DomainResult<Invoice> {
    ensure_not_voided(current.voided_at.is_some())?;

    let memo = require_text(payload.memo, "memo")?;
    let amount = require(payload.amount, "amount")?;
    let kind = require(payload.kind, "type")?;

    let mut next = current.clone();
    next.memo = memo;
    next.amount = validate_amount(amount, "amount")?;
    next.kind = parse_enum(&kind, "type")?;
    Ok(next)
}

pub fn ensure_not_voided(voided: bool) -> DomainResult<()> {
    if voided {
        return Err(DomainError::invalid_state(
            "voided_at",
            "voided ledger entries cannot be changed",
        ));
    }
    Ok(())
}

pub fn validate_comment_create(payload: CommentCreate) -> DomainResult<NewComment> {
    let student_id = require(payload.student_id, "student_id")?;
    let message = require_text(payload.message, "message")?;

    Ok(NewComment {
        student_id: positive_id(student_id, "student_id")?,
        message,
    })
}

pub fn validate_comment_update(payload: CommentUpdate) -> DomainResult<String> {
    require_text(payload.message, "message")
}

pub fn validate_university_create(payload: UniversityCreate) -> DomainResult<NewUniversity> {
    Ok(NewUniversity {
        name: require_text(payload.name, "name")?,
        app_fee_flat: optional_amount(payload.app_fee_flat, "app_fee_flat")?,
        app_fee_percentage: optional_rate(payload.app_fee_percentage, "app_fee_percentage")?,
        during_studies_min_payment: optional_amount(
            payload.during_studies_min_payment,
            "during_studies_min_payment",
        )?,
        during_studies_membership_fee: optional_amount(
            payload.during_studies_membership_fee,
            "during_studies_membership_fee",
        )?,
        after_studies_min_payment: optional_amount(
            payload.after_studies_min_payment,
            "after_studies_min_payment",
        )?,
        after_studies_membership_fee: optional_amount(
            payload.after_studies_membership_fee,
            "after_studies_membership_fee",
        )?,
    })
}

pub fn require_query(q: Option<String>) -> DomainResult<String> {
    require_text(q, "q")
}
