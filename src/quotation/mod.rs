//! Quotation pricing and validation engine.
//!
//! Raw [`QuotationInput`](crate::schemas::QuotationInput) goes through
//! [`validate`] to become a [`ValidatedQuotationInput`], which is the only
//! value [`calculate`] accepts. Both steps are pure.

pub mod pricing;
pub mod property_types;
pub mod validation;

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::schemas::QuotationInput;

pub use pricing::{calculate, DerivedQuotationAmounts};
pub use validation::{is_supported_area, validate, FieldErrors, FORM_ERRORS_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    RentalServices,
    PropertyManagement,
    MarketingServices,
    GeneralConsultancy,
    OtherServices,
}

impl ServiceKind {
    pub const ALL: [Self; 5] = [
        Self::RentalServices,
        Self::PropertyManagement,
        Self::MarketingServices,
        Self::GeneralConsultancy,
        Self::OtherServices,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RentalServices => "rental_services",
            Self::PropertyManagement => "property_management",
            Self::MarketingServices => "marketing_services",
            Self::GeneralConsultancy => "general_consultancy",
            Self::OtherServices => "other_services",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionMode {
    None,
    Managed,
    Other,
}

impl DescriptionMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "managed" => Some(Self::Managed),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyUsage {
    Residential,
    Commercial,
}

impl PropertyUsage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "residential" => Some(Self::Residential),
            "commercial" => Some(Self::Commercial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisKind {
    PerMeter,
    FixedAmount,
}

impl BasisKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "per_meter" => Some(Self::PerMeter),
            "fixed_amount" => Some(Self::FixedAmount),
            _ => None,
        }
    }
}

/// Discriminant shared by additional fees and commissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeKind {
    Amount,
    Percentage,
}

impl ChargeKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "amount" => Some(Self::Amount),
            "percentage" => Some(Self::Percentage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceType {
    RentalServices,
    PropertyManagement,
    MarketingServices,
    GeneralConsultancy,
    OtherServices { detail: String },
}

impl ServiceType {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::RentalServices => ServiceKind::RentalServices,
            Self::PropertyManagement => ServiceKind::PropertyManagement,
            Self::MarketingServices => ServiceKind::MarketingServices,
            Self::GeneralConsultancy => ServiceKind::GeneralConsultancy,
            Self::OtherServices { .. } => ServiceKind::OtherServices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyType {
    /// An entry of the usage's type list.
    Listed(&'static str),
    Other { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribedProperty {
    pub usage: PropertyUsage,
    pub property_type: PropertyType,
    pub neighborhood: String,
    pub area_m2: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PropertyDescription {
    None,
    Managed {
        #[serde(rename = "linkedPropertyId")]
        linked_property_id: String,
        #[serde(rename = "areaM2")]
        area_m2: Option<Decimal>,
    },
    Other(DescribedProperty),
}

impl PropertyDescription {
    pub fn mode(&self) -> DescriptionMode {
        match self {
            Self::None => DescriptionMode::None,
            Self::Managed { .. } => DescriptionMode::Managed,
            Self::Other(_) => DescriptionMode::Other,
        }
    }

    /// Area used by a per-meter basis, when one is known.
    pub fn area_m2(&self) -> Option<Decimal> {
        match self {
            Self::None => None,
            Self::Managed { area_m2, .. } => *area_m2,
            Self::Other(property) => Some(property.area_m2),
        }
    }

    pub fn linked_property_id(&self) -> Option<&str> {
        match self {
            Self::Managed {
                linked_property_id, ..
            } => Some(linked_property_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum FinancialBasis {
    PerMeter {
        #[serde(rename = "pricePerMeter")]
        price_per_meter: Decimal,
    },
    FixedAmount {
        #[serde(rename = "fixedAmountForService")]
        amount: Decimal,
    },
}

/// An additional fee or a commission: a flat amount or a percentage in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Charge {
    Amount(Decimal),
    Percentage(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub company: Option<String>,
}

/// Quotation input whose conditional requirements all hold.
///
/// Built only by [`validate`]; the fields are private so no other code path
/// can produce one. [`ValidatedQuotationInput::with_linked_area`] is the one
/// refinement, and it re-checks the area bounds before accepting a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedQuotationInput {
    client: ClientDetails,
    service_type: ServiceType,
    property: PropertyDescription,
    financial_basis: Option<FinancialBasis>,
    additional_fee: Option<Charge>,
    tax_percentage: Decimal,
    commission: Option<Charge>,
    contract_duration_years: Option<u32>,
    grace_period_days: Option<u32>,
    validity_period_days: u32,
    issue_date: NaiveDate,
    included_services: BTreeSet<String>,
    notes: Option<String>,
}

impl ValidatedQuotationInput {
    pub fn client(&self) -> &ClientDetails {
        &self.client
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn property(&self) -> &PropertyDescription {
        &self.property
    }

    pub fn financial_basis(&self) -> Option<FinancialBasis> {
        self.financial_basis
    }

    pub fn additional_fee(&self) -> Option<Charge> {
        self.additional_fee
    }

    pub fn tax_percentage(&self) -> Decimal {
        self.tax_percentage
    }

    pub fn commission(&self) -> Option<Charge> {
        self.commission
    }

    pub fn contract_duration_years(&self) -> Option<u32> {
        self.contract_duration_years
    }

    pub fn grace_period_days(&self) -> Option<u32> {
        self.grace_period_days
    }

    pub fn validity_period_days(&self) -> u32 {
        self.validity_period_days
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn included_services(&self) -> &BTreeSet<String> {
        &self.included_services
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Fills the area of a managed property from the catalog, unless the
    /// request already carried one. The area must satisfy the same bounds
    /// `validate` puts on `propertyAreaM2`; otherwise the linked property is
    /// reported as unusable.
    pub fn with_linked_area(mut self, area_m2: Decimal) -> Result<Self, FieldErrors> {
        if !validation::is_supported_area(area_m2) {
            return Err(FieldErrors::single(
                "linkedPropertyId",
                "Linked property has an area outside the supported range",
            ));
        }
        if let PropertyDescription::Managed { area_m2: slot, .. } = &mut self.property {
            if slot.is_none() {
                *slot = Some(area_m2);
            }
        }
        Ok(self)
    }
}

/// Persisted quotation: the validated input merged with its derived amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input: ValidatedQuotationInput,
    pub amounts: DerivedQuotationAmounts,
}

impl Quotation {
    pub fn assemble(input: ValidatedQuotationInput, amounts: DerivedQuotationAmounts) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            input,
            amounts,
        }
    }
}

/// Validates `raw` and, when it passes, prices it.
pub fn prepare(
    raw: &QuotationInput,
) -> Result<(ValidatedQuotationInput, DerivedQuotationAmounts), FieldErrors> {
    let input = validate(raw)?;
    let amounts = calculate(&input);
    Ok((input, amounts))
}
