//! Quotation pricing and validation for the agency's quotation builder,
//! plus the HTTP service that exposes it.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod quotation;
pub mod repository;
pub mod routes;
pub mod schemas;
pub mod state;

pub use quotation::{
    calculate, prepare, validate, DerivedQuotationAmounts, FieldErrors, Quotation,
    ValidatedQuotationInput,
};
pub use schemas::QuotationInput;
