use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use validator::Validate;

use super::property_types::{find_property_type, is_other_property_type};
use super::{
    BasisKind, Charge, ChargeKind, ClientDetails, DescribedProperty, DescriptionMode,
    FinancialBasis, PropertyDescription, PropertyType, PropertyUsage, ServiceKind, ServiceType,
    ValidatedQuotationInput,
};
use crate::schemas::QuotationInput;

/// Key for errors that do not belong to a single field.
pub const FORM_ERRORS_KEY: &str = "_form";

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Upper bound for any single amount, area or rate. Keeps every product in
/// the pricing chain far below `Decimal::MAX`.
pub const MAX_SUPPORTED_VALUE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Field name → ordered, non-empty list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.fields.entry(field.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.add(FORM_ERRORS_KEY, message);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields (including `_form`) carrying at least one message.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn form_errors(&self) -> &[String] {
        self.get(FORM_ERRORS_KEY).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// One row of the conditional requirement table. Every row is evaluated;
/// a row reports `message` on `field` when it applies and does not hold.
struct Rule {
    field: &'static str,
    applies: fn(&QuotationInput) -> bool,
    holds: fn(&QuotationInput) -> bool,
    message: &'static str,
}

const RULES: &[Rule] = &[
    // Service
    Rule {
        field: "serviceType",
        applies: |_| true,
        holds: |i| text(&i.service_type).is_some(),
        message: "Service type is required",
    },
    Rule {
        field: "serviceType",
        applies: |i| text(&i.service_type).is_some(),
        holds: |i| service_kind(i).is_some(),
        message: "Service type must be one of rental_services, property_management, \
                  marketing_services, general_consultancy, other_services",
    },
    Rule {
        field: "otherServiceTypeDetail",
        applies: |i| service_kind(i) == Some(ServiceKind::OtherServices),
        holds: |i| text(&i.other_service_type_detail).is_some(),
        message: "Describe the service when the service type is other_services",
    },
    // Property description
    Rule {
        field: "propertyDescriptionMode",
        applies: |_| true,
        holds: |i| description_mode(i).is_some(),
        message: "Property description mode must be one of none, managed, other",
    },
    Rule {
        field: "linkedPropertyId",
        applies: |i| description_mode(i) == Some(DescriptionMode::Managed),
        holds: |i| text(&i.linked_property_id).is_some(),
        message: "Select the managed property this quotation refers to",
    },
    Rule {
        field: "propertyUsage",
        applies: |i| description_mode(i) == Some(DescriptionMode::Other),
        holds: |i| text(&i.property_usage).is_some(),
        message: "Property usage is required when describing another property",
    },
    Rule {
        field: "propertyUsage",
        applies: |i| text(&i.property_usage).is_some(),
        holds: |i| property_usage(i).is_some(),
        message: "Property usage must be Residential or Commercial",
    },
    Rule {
        field: "propertyType",
        applies: |i| description_mode(i) == Some(DescriptionMode::Other),
        holds: |i| text(&i.property_type).is_some(),
        message: "Property type is required when describing another property",
    },
    Rule {
        field: "propertyNeighborhood",
        applies: |i| description_mode(i) == Some(DescriptionMode::Other),
        holds: |i| text(&i.property_neighborhood).is_some(),
        message: "Neighborhood is required when describing another property",
    },
    Rule {
        field: "propertyAreaM2",
        applies: |i| description_mode(i) == Some(DescriptionMode::Other),
        holds: |i| i.property_area_m2.is_some(),
        message: "Property area is required when describing another property",
    },
    Rule {
        field: "propertyAreaM2",
        applies: |i| i.property_area_m2.is_some(),
        holds: |i| i.property_area_m2.is_some_and(|area| area > Decimal::ZERO),
        message: "Property area must be greater than 0",
    },
    Rule {
        field: "otherPropertyTypeDetail",
        applies: |i| {
            description_mode(i) == Some(DescriptionMode::Other) && property_type_is_other(i)
        },
        holds: |i| text(&i.other_property_type_detail).is_some(),
        message: "Describe the property type when it is Other",
    },
    Rule {
        field: "propertyType",
        applies: |i| {
            property_usage(i) == Some(PropertyUsage::Residential)
                && text(&i.property_type).is_some()
                && !property_type_is_other(i)
        },
        holds: |i| listed_property_type(i, PropertyUsage::Residential).is_some(),
        message: "Property type is not a residential property type",
    },
    Rule {
        field: "propertyType",
        applies: |i| {
            property_usage(i) == Some(PropertyUsage::Commercial)
                && text(&i.property_type).is_some()
                && !property_type_is_other(i)
        },
        holds: |i| listed_property_type(i, PropertyUsage::Commercial).is_some(),
        message: "Property type is not a commercial property type",
    },
    // Financial basis
    Rule {
        field: "financialBasis",
        applies: financial_basis_required,
        holds: |i| text(&i.financial_basis).is_some(),
        message: "Financial basis is required for this service",
    },
    Rule {
        field: "financialBasis",
        applies: |i| text(&i.financial_basis).is_some(),
        holds: |i| basis_kind(i).is_some(),
        message: "Financial basis must be per_meter or fixed_amount",
    },
    Rule {
        field: "pricePerMeter",
        applies: |i| basis_kind(i) == Some(BasisKind::PerMeter),
        holds: |i| i.price_per_meter.is_some(),
        message: "Price per meter is required for a per-meter basis",
    },
    Rule {
        field: "pricePerMeter",
        applies: |i| basis_kind(i) == Some(BasisKind::PerMeter),
        holds: |i| non_negative_or_absent(i.price_per_meter),
        message: "Price per meter cannot be negative",
    },
    Rule {
        field: "fixedAmountForService",
        applies: |i| basis_kind(i) == Some(BasisKind::FixedAmount),
        holds: |i| i.fixed_amount_for_service.is_some(),
        message: "Fixed amount is required for a fixed-amount basis",
    },
    Rule {
        field: "fixedAmountForService",
        applies: |i| basis_kind(i) == Some(BasisKind::FixedAmount),
        holds: |i| non_negative_or_absent(i.fixed_amount_for_service),
        message: "Fixed amount cannot be negative",
    },
    // Additional fees
    Rule {
        field: "additionalFeeType",
        applies: |i| i.has_additional_fees,
        holds: |i| text(&i.additional_fee_type).is_some(),
        message: "Additional fee type is required when additional fees apply",
    },
    Rule {
        field: "additionalFeeType",
        applies: |i| text(&i.additional_fee_type).is_some(),
        holds: |i| fee_kind(i).is_some(),
        message: "Additional fee type must be amount or percentage",
    },
    Rule {
        field: "additionalFeeValue",
        applies: |i| i.has_additional_fees,
        holds: |i| i.additional_fee_value.is_some(),
        message: "Additional fee value is required when additional fees apply",
    },
    Rule {
        field: "additionalFeeValue",
        applies: |i| i.has_additional_fees,
        holds: |i| non_negative_or_absent(i.additional_fee_value),
        message: "Additional fee value cannot be negative",
    },
    Rule {
        field: "additionalFeeValue",
        applies: |i| fee_kind(i) == Some(ChargeKind::Percentage),
        holds: |i| at_most_hundred_or_absent(i.additional_fee_value),
        message: "Additional fee percentage cannot exceed 100",
    },
    // Tax
    Rule {
        field: "taxPercentage",
        applies: |_| true,
        holds: |i| i.tax_percentage >= Decimal::ZERO && i.tax_percentage <= HUNDRED,
        message: "Tax percentage must be between 0 and 100",
    },
    // Commission
    Rule {
        field: "commissionType",
        applies: |i| text(&i.commission_type).is_some(),
        holds: |i| commission_kind(i).is_some(),
        message: "Commission type must be amount or percentage",
    },
    Rule {
        field: "commissionValue",
        applies: |i| text(&i.commission_type).is_some(),
        holds: |i| i.commission_value.is_some(),
        message: "Commission value is required when a commission type is set",
    },
    Rule {
        field: "commissionValue",
        applies: |i| text(&i.commission_type).is_some(),
        holds: |i| non_negative_or_absent(i.commission_value),
        message: "Commission value cannot be negative",
    },
    Rule {
        field: "commissionValue",
        applies: |i| commission_kind(i) == Some(ChargeKind::Percentage),
        holds: |i| at_most_hundred_or_absent(i.commission_value),
        message: "Commission percentage cannot exceed 100",
    },
    // Magnitude
    Rule {
        field: "propertyAreaM2",
        applies: |i| i.property_area_m2.is_some(),
        holds: |i| within_supported_range(i.property_area_m2),
        message: "Property area exceeds the maximum supported value",
    },
    Rule {
        field: "pricePerMeter",
        applies: |i| i.price_per_meter.is_some(),
        holds: |i| within_supported_range(i.price_per_meter),
        message: "Price per meter exceeds the maximum supported value",
    },
    Rule {
        field: "fixedAmountForService",
        applies: |i| i.fixed_amount_for_service.is_some(),
        holds: |i| within_supported_range(i.fixed_amount_for_service),
        message: "Fixed amount exceeds the maximum supported value",
    },
    Rule {
        field: "additionalFeeValue",
        applies: |i| i.additional_fee_value.is_some(),
        holds: |i| within_supported_range(i.additional_fee_value),
        message: "Additional fee value exceeds the maximum supported value",
    },
    Rule {
        field: "commissionValue",
        applies: |i| i.commission_value.is_some(),
        holds: |i| within_supported_range(i.commission_value),
        message: "Commission value exceeds the maximum supported value",
    },
    // Terms
    Rule {
        field: "contractDurationYears",
        applies: |i| i.contract_duration_years.is_some_and(|years| years >= 0),
        holds: |i| fits_u32(i.contract_duration_years),
        message: "Contract duration is too large",
    },
    Rule {
        field: "gracePeriodDays",
        applies: |i| i.grace_period_days.is_some_and(|days| days >= 0),
        holds: |i| fits_u32(i.grace_period_days),
        message: "Grace period is too large",
    },
    Rule {
        field: "validityPeriodDays",
        applies: |i| i.validity_period_days >= 1,
        holds: |i| fits_u32(Some(i.validity_period_days)),
        message: "Validity period is too large",
    },
    Rule {
        field: "issueDate",
        applies: |_| true,
        holds: |i| text(&i.issue_date).is_some(),
        message: "Issue date is required",
    },
    Rule {
        field: "issueDate",
        applies: |i| text(&i.issue_date).is_some(),
        holds: |i| issue_date(i).is_some(),
        message: "Issue date must be a valid date in YYYY-MM-DD format",
    },
    Rule {
        field: FORM_ERRORS_KEY,
        applies: |i| issue_date(i).is_some() && validity_days(i).is_some(),
        holds: |i| expiry_date(i).is_some(),
        message: "Issue date plus validity period falls outside the supported calendar range",
    },
];

/// Checks every requirement on `input` and returns the typed value, or all
/// violations at once.
pub fn validate(input: &QuotationInput) -> Result<ValidatedQuotationInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Err(report) = input.validate() {
        for (field, field_errors) in report.field_errors() {
            let key = camel_case(&field);
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                errors.add(key.clone(), message);
            }
        }
    }

    for rule in RULES {
        if (rule.applies)(input) && !(rule.holds)(input) {
            errors.add(rule.field, rule.message);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    assemble(input)
}

/// Builds the typed value from input that already satisfies [`RULES`].
fn assemble(input: &QuotationInput) -> Result<ValidatedQuotationInput, FieldErrors> {
    let client = ClientDetails {
        name: input.client_name.trim().to_string(),
        phone: input.client_phone.trim().to_string(),
        email: owned_text(&input.client_email),
        company: owned_text(&input.client_company),
    };

    let service_type = match service_kind(input) {
        Some(ServiceKind::RentalServices) => ServiceType::RentalServices,
        Some(ServiceKind::PropertyManagement) => ServiceType::PropertyManagement,
        Some(ServiceKind::MarketingServices) => ServiceType::MarketingServices,
        Some(ServiceKind::GeneralConsultancy) => ServiceType::GeneralConsultancy,
        Some(ServiceKind::OtherServices) => ServiceType::OtherServices {
            detail: required_text(&input.other_service_type_detail, "otherServiceTypeDetail")?,
        },
        None => return Err(unresolved("serviceType")),
    };

    let property = match description_mode(input) {
        Some(DescriptionMode::None) => PropertyDescription::None,
        Some(DescriptionMode::Managed) => PropertyDescription::Managed {
            linked_property_id: required_text(&input.linked_property_id, "linkedPropertyId")?,
            area_m2: input.property_area_m2,
        },
        Some(DescriptionMode::Other) => PropertyDescription::Other(described_property(input)?),
        None => return Err(unresolved("propertyDescriptionMode")),
    };

    let financial_basis = match basis_kind(input) {
        Some(BasisKind::PerMeter) => Some(FinancialBasis::PerMeter {
            price_per_meter: input
                .price_per_meter
                .ok_or_else(|| unresolved("pricePerMeter"))?,
        }),
        Some(BasisKind::FixedAmount) => Some(FinancialBasis::FixedAmount {
            amount: input
                .fixed_amount_for_service
                .ok_or_else(|| unresolved("fixedAmountForService"))?,
        }),
        None => None,
    };

    let additional_fee = if input.has_additional_fees {
        let value = input
            .additional_fee_value
            .ok_or_else(|| unresolved("additionalFeeValue"))?;
        Some(charge(fee_kind(input), value, "additionalFeeType")?)
    } else {
        None
    };

    let commission = match (text(&input.commission_type), input.commission_value) {
        (Some(_), Some(value)) => Some(charge(commission_kind(input), value, "commissionType")?),
        (Some(_), None) => return Err(unresolved("commissionValue")),
        (None, _) => None,
    };

    let included_services = input
        .included_services
        .iter()
        .map(|service| service.trim())
        .filter(|service| !service.is_empty())
        .map(ToOwned::to_owned)
        .collect::<BTreeSet<_>>();

    Ok(ValidatedQuotationInput {
        client,
        service_type,
        property,
        financial_basis,
        additional_fee,
        tax_percentage: input.tax_percentage,
        commission,
        contract_duration_years: optional_u32(input.contract_duration_years),
        grace_period_days: optional_u32(input.grace_period_days),
        validity_period_days: validity_days(input).ok_or_else(|| unresolved("validityPeriodDays"))?,
        issue_date: issue_date(input).ok_or_else(|| unresolved("issueDate"))?,
        included_services,
        notes: owned_text(&input.notes),
    })
}

fn described_property(input: &QuotationInput) -> Result<DescribedProperty, FieldErrors> {
    let usage = property_usage(input).ok_or_else(|| unresolved("propertyUsage"))?;
    let property_type = if property_type_is_other(input) {
        PropertyType::Other {
            detail: required_text(&input.other_property_type_detail, "otherPropertyTypeDetail")?,
        }
    } else {
        PropertyType::Listed(
            listed_property_type(input, usage).ok_or_else(|| unresolved("propertyType"))?,
        )
    };
    Ok(DescribedProperty {
        usage,
        property_type,
        neighborhood: required_text(&input.property_neighborhood, "propertyNeighborhood")?,
        area_m2: input
            .property_area_m2
            .ok_or_else(|| unresolved("propertyAreaM2"))?,
    })
}

fn charge(kind: Option<ChargeKind>, value: Decimal, field: &str) -> Result<Charge, FieldErrors> {
    match kind {
        Some(ChargeKind::Amount) => Ok(Charge::Amount(value)),
        Some(ChargeKind::Percentage) => Ok(Charge::Percentage(value)),
        None => Err(unresolved(field)),
    }
}

fn unresolved(field: &str) -> FieldErrors {
    FieldErrors::single(field, "Value could not be resolved")
}

fn required_text(value: &Option<String>, field: &str) -> Result<String, FieldErrors> {
    owned_text(value).ok_or_else(|| unresolved(field))
}

fn text(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn owned_text(value: &Option<String>) -> Option<String> {
    text(value).map(ToOwned::to_owned)
}

fn service_kind(input: &QuotationInput) -> Option<ServiceKind> {
    text(&input.service_type).and_then(ServiceKind::parse)
}

fn description_mode(input: &QuotationInput) -> Option<DescriptionMode> {
    DescriptionMode::parse(&input.property_description_mode)
}

fn property_usage(input: &QuotationInput) -> Option<PropertyUsage> {
    text(&input.property_usage).and_then(PropertyUsage::parse)
}

fn property_type_is_other(input: &QuotationInput) -> bool {
    text(&input.property_type).is_some_and(is_other_property_type)
}

fn listed_property_type(input: &QuotationInput, usage: PropertyUsage) -> Option<&'static str> {
    text(&input.property_type).and_then(|raw| find_property_type(usage, raw))
}

fn basis_kind(input: &QuotationInput) -> Option<BasisKind> {
    text(&input.financial_basis).and_then(BasisKind::parse)
}

fn fee_kind(input: &QuotationInput) -> Option<ChargeKind> {
    text(&input.additional_fee_type).and_then(ChargeKind::parse)
}

fn commission_kind(input: &QuotationInput) -> Option<ChargeKind> {
    text(&input.commission_type).and_then(ChargeKind::parse)
}

/// The basis may only be omitted for consultancy or other services quoted
/// without a property.
fn financial_basis_required(input: &QuotationInput) -> bool {
    let no_property = description_mode(input) == Some(DescriptionMode::None);
    let basis_optional_service = matches!(
        service_kind(input),
        Some(ServiceKind::GeneralConsultancy | ServiceKind::OtherServices)
    );
    !(no_property && basis_optional_service)
}

fn non_negative_or_absent(value: Option<Decimal>) -> bool {
    value.map_or(true, |amount| amount >= Decimal::ZERO)
}

fn at_most_hundred_or_absent(value: Option<Decimal>) -> bool {
    value.map_or(true, |amount| amount <= HUNDRED)
}

/// Whether `area` is a positive area no larger than [`MAX_SUPPORTED_VALUE`].
pub fn is_supported_area(area: Decimal) -> bool {
    area > Decimal::ZERO && area <= MAX_SUPPORTED_VALUE
}

fn within_supported_range(value: Option<Decimal>) -> bool {
    value.map_or(true, |amount| amount <= MAX_SUPPORTED_VALUE)
}

fn fits_u32(value: Option<i64>) -> bool {
    value.map_or(true, |number| u32::try_from(number).is_ok())
}

fn optional_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|number| u32::try_from(number).ok())
}

fn validity_days(input: &QuotationInput) -> Option<u32> {
    u32::try_from(input.validity_period_days)
        .ok()
        .filter(|days| *days >= 1)
}

fn issue_date(input: &QuotationInput) -> Option<NaiveDate> {
    text(&input.issue_date).and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

fn expiry_date(input: &QuotationInput) -> Option<NaiveDate> {
    let issued = issue_date(input)?;
    let days = validity_days(input)?;
    issued.checked_add_days(Days::new(u64::from(days)))
}

fn camel_case(snake: &str) -> String {
    let mut result = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = !result.is_empty();
            continue;
        }
        if upper_next {
            result.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
