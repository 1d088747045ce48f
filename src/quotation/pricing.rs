use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::{Charge, FinancialBasis, ValidatedQuotationInput};

/// Decimal places of every monetary output.
pub const MONEY_SCALE: u32 = 2;

/// Midpoints round away from zero: `10.005` becomes `10.01`.
pub const MONEY_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Amounts shown on a quotation, each rounded to two places on its own.
///
/// Totals come from the unrounded parts, so `subTotalBeforeTax` may differ
/// from `baseValue + additionalFeeAmount` by up to `0.01`, and likewise
/// `finalAmountToClient` from `subTotalBeforeTax + taxAmount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedQuotationAmounts {
    pub base_value: Decimal,
    pub additional_fee_amount: Decimal,
    pub sub_total_before_tax: Decimal,
    pub tax_amount: Decimal,
    pub final_amount_to_client: Decimal,
    pub commission_amount: Decimal,
    pub expiry_date: NaiveDate,
}

/// Prices a validated quotation. Every step works at full precision and only
/// the returned values are rounded.
///
/// Panics if `input` breaks a guarantee `validate` is responsible for; that is
/// a bug in the caller, not bad user input.
pub fn calculate(input: &ValidatedQuotationInput) -> DerivedQuotationAmounts {
    let base_value = match input.financial_basis() {
        Some(FinancialBasis::PerMeter { price_per_meter }) => {
            let area_m2 = input.property().area_m2().unwrap_or(Decimal::ZERO);
            area_m2
                .checked_mul(price_per_meter)
                .unwrap_or_else(|| invariant_violation("per-meter base value overflowed"))
        }
        Some(FinancialBasis::FixedAmount { amount }) => amount,
        None => Decimal::ZERO,
    };

    let additional_fee_amount = match input.additional_fee() {
        None => Decimal::ZERO,
        Some(Charge::Amount(value)) => value,
        Some(Charge::Percentage(rate)) => percent_of(base_value, rate),
    };

    let sub_total_before_tax = base_value + additional_fee_amount;
    let tax_amount = percent_of(sub_total_before_tax, input.tax_percentage());
    let final_amount_to_client = sub_total_before_tax + tax_amount;

    // Commission is earned on the pre-tax subtotal, never on the client total.
    let commission_amount = match input.commission() {
        None => Decimal::ZERO,
        Some(Charge::Amount(value)) => value,
        Some(Charge::Percentage(rate)) => percent_of(sub_total_before_tax, rate),
    };

    let expiry_date = input
        .issue_date()
        .checked_add_days(Days::new(u64::from(input.validity_period_days())))
        .unwrap_or_else(|| invariant_violation("expiry date is out of the calendar range"));

    DerivedQuotationAmounts {
        base_value: money("baseValue", base_value),
        additional_fee_amount: money("additionalFeeAmount", additional_fee_amount),
        sub_total_before_tax: money("subTotalBeforeTax", sub_total_before_tax),
        tax_amount: money("taxAmount", tax_amount),
        final_amount_to_client: money("finalAmountToClient", final_amount_to_client),
        commission_amount: money("commissionAmount", commission_amount),
        expiry_date,
    }
}

/// Rounds to [`MONEY_SCALE`] places with [`MONEY_ROUNDING`], keeping trailing
/// zeros so `1500000` renders as `1500000.00`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, MONEY_ROUNDING);
    rounded.rescale(MONEY_SCALE);
    rounded
}

fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}

fn money(label: &str, value: Decimal) -> Decimal {
    if value.is_sign_negative() && !value.is_zero() {
        invariant_violation(&format!("{label} is negative ({value})"));
    }
    round_money(value)
}

#[cold]
fn invariant_violation(detail: &str) -> ! {
    panic!("quotation pricing invariant violated: {detail}")
}
