use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

fn default_description_mode() -> String {
    "none".to_string()
}
fn default_false() -> bool {
    false
}
fn default_tax_percentage() -> Decimal {
    Decimal::from(15)
}
fn default_validity_period_days() -> i64 {
    30
}
fn default_limit_100() -> i64 {
    100
}

/// Raw quotation payload as supplied by forms, importers and API callers.
///
/// Only format checks live on the derive; the conditional requirements are
/// enforced by [`crate::quotation::validate`].
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuotationInput {
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 255,
        message = "Client name must be between 2 and 255 characters"
    ))]
    pub client_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_phone"))]
    pub client_phone: String,
    #[validate(email(message = "Client email must be a valid email address"))]
    pub client_email: Option<String>,
    pub client_company: Option<String>,

    pub service_type: Option<String>,
    pub other_service_type_detail: Option<String>,

    #[serde(default = "default_description_mode")]
    pub property_description_mode: String,
    pub linked_property_id: Option<String>,
    pub property_usage: Option<String>,
    pub property_type: Option<String>,
    pub other_property_type_detail: Option<String>,
    pub property_neighborhood: Option<String>,
    pub property_area_m2: Option<Decimal>,

    pub financial_basis: Option<String>,
    pub price_per_meter: Option<Decimal>,
    pub fixed_amount_for_service: Option<Decimal>,

    #[serde(default = "default_false")]
    pub has_additional_fees: bool,
    pub additional_fee_type: Option<String>,
    pub additional_fee_value: Option<Decimal>,

    #[serde(default = "default_tax_percentage")]
    pub tax_percentage: Decimal,

    pub commission_type: Option<String>,
    pub commission_value: Option<Decimal>,

    #[validate(range(min = 0, message = "Contract duration cannot be negative"))]
    pub contract_duration_years: Option<i64>,
    #[validate(range(min = 0, message = "Grace period cannot be negative"))]
    pub grace_period_days: Option<i64>,
    #[serde(default = "default_validity_period_days")]
    #[validate(range(min = 1, message = "Validity period must be at least 1 day"))]
    pub validity_period_days: i64,
    pub issue_date: Option<String>,

    #[serde(default)]
    pub included_services: Vec<String>,
    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

impl QuotationInput {
    /// A payload with the same defaults serde applies to missing fields.
    pub fn with_defaults() -> Self {
        Self {
            property_description_mode: default_description_mode(),
            tax_percentage: default_tax_percentage(),
            validity_period_days: default_validity_period_days(),
            ..Self::default()
        }
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    let only_allowed = body
        .chars()
        .all(|ch| ch.is_ascii_digit() || ch == ' ' || ch == '-');

    if !only_allowed || !(7..=20).contains(&digits) {
        let mut error = ValidationError::new("phone");
        error.message =
            Some("Client phone must contain 7 to 20 digits, optionally starting with +".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct QuotationsQuery {
    #[serde(default = "default_limit_100")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct QuotationPath {
    pub quotation_id: String,
}

pub fn clamp_limit_in_range(limit: i64, minimum: i64, maximum: i64) -> i64 {
    limit.clamp(minimum, maximum)
}
