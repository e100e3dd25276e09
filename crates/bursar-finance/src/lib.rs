use bursar_core::{
    Application, Deposit, DomainError, DomainResult, Invoice, InvoiceType, University,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currency precision used for every stored and reported amount.
pub const CURRENCY_SCALE: u32 = 2;

/// Balance summary of one application, derived from its fee schedule and ledger.
///
/// `None` means the figure cannot be computed (no university or tuition yet), which is
/// distinct from a computed zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finances {
    pub application_fee: Option<Decimal>,
    pub total_advances: Decimal,
    pub total_membership_fees: Decimal,
    pub total_other_charges: Decimal,
    pub total_invoiced: Decimal,
    pub total_deposited: Decimal,
    pub total_pending_deposits: Decimal,
    pub total_expected: Option<Decimal>,
    pub total_remaining: Option<Decimal>,
}

/// Digits of a stored amount, `NUMERIC(12,2)`.
pub const AMOUNT_PRECISION: u32 = 12;
/// Fee percentages are stored as `NUMERIC(7,4)`.
pub const RATE_PRECISION: u32 = 7;
pub const RATE_SCALE: u32 = 4;

/// Exclusive upper bound of a `NUMERIC(precision, scale)` column.
pub fn numeric_limit(precision: u32, scale: u32) -> Decimal {
    Decimal::from(10_i64.pow(precision - scale))
}

/// Rounds half away from zero and always carries exactly two decimal places.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

fn overflow(field: &'static str) -> DomainError {
    DomainError::invalid_state(field, "total exceeds the representable amount range")
}

fn checked_total(
    mut amounts: impl Iterator<Item = Decimal>,
    field: &'static str,
) -> DomainResult<Decimal> {
    amounts
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .map(round_currency)
        .ok_or_else(|| overflow(field))
}

/// Flat fee plus a percentage of tuition; the percentage is expressed in percent (2.5 = 2.5%).
pub fn application_fee(university: &University, tuition_amount: Decimal) -> DomainResult<Decimal> {
    let flat = university.app_fee_flat.unwrap_or(Decimal::ZERO);
    let percentage = university.app_fee_percentage.unwrap_or(Decimal::ZERO);
    percentage
        .checked_mul(tuition_amount)
        .and_then(|share| share.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|share| flat.checked_add(share))
        .map(round_currency)
        .ok_or_else(|| overflow("application_fee"))
}

fn sum_invoices<'a>(
    invoices: impl Iterator<Item = &'a Invoice>,
    kind: InvoiceType,
    field: &'static str,
) -> DomainResult<Decimal> {
    checked_total(
        invoices
            .filter(|invoice| invoice.kind == kind)
            .map(|invoice| invoice.amount),
        field,
    )
}

/// Computes the balance summary. Voided rows are ignored even if the caller passes them.
pub fn summarize(
    application: &Application,
    university: Option<&University>,
    deposits: &[Deposit],
    invoices: &[Invoice],
) -> DomainResult<Finances> {
    let live_invoices = || invoices.iter().filter(|invoice| !invoice.is_voided());
    let live_deposits = || deposits.iter().filter(|deposit| !deposit.is_voided());

    let application_fee = match (university, application.tuition_amount) {
        (Some(university), Some(tuition)) => Some(application_fee(university, tuition)?),
        _ => None,
    };

    let total_advances = sum_invoices(live_invoices(), InvoiceType::Advance, "total_advances")?;
    let total_membership_fees = sum_invoices(
        live_invoices(),
        InvoiceType::MembershipFee,
        "total_membership_fees",
    )?;
    let total_other_charges =
        sum_invoices(live_invoices(), InvoiceType::Other, "total_other_charges")?;
    let total_invoiced =
        checked_total(live_invoices().map(|invoice| invoice.amount), "total_invoiced")?;

    let total_deposited = checked_total(
        live_deposits()
            .filter(|deposit| deposit.complete)
            .map(|deposit| deposit.amount),
        "total_deposited",
    )?;
    let total_pending_deposits = checked_total(
        live_deposits()
            .filter(|deposit| !deposit.complete)
            .map(|deposit| deposit.amount),
        "total_pending_deposits",
    )?;

    // application_fee invoices bill the computed fee, so they are not added again here
    let total_expected = application_fee
        .map(|fee| {
            checked_total(
                [fee, total_advances, total_membership_fees, total_other_charges].into_iter(),
                "total_expected",
            )
        })
        .transpose()?;
    let total_remaining = total_expected
        .map(|expected| {
            expected
                .checked_sub(total_deposited)
                .map(round_currency)
                .ok_or_else(|| overflow("total_remaining"))
        })
        .transpose()?;

    Ok(Finances {
        application_fee,
        total_advances,
        total_membership_fees,
        total_other_charges,
        total_invoiced,
        total_deposited,
        total_pending_deposits,
        total_expected,
        total_remaining,
    })
}
