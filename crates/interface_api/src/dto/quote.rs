//! Quote DTOs
//!
//! Requests are checked with `validator` before they reach the domain.
//! Responses reuse the domain read views, which already serialize with
//! plain UUIDs and decimal strings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::{BrokerId, CoverId, Currency, ModifierId, ProductId, UnderwriterId};
use domain_quote::{
    NewQuote, QuoteCoverInput, QuoteFilter, QuoteModifierInput, QuoteStatus, QuoteSummary,
    QuoteUpdate,
};

use crate::error::ApiError;

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}

fn default_selected() -> bool {
    true
}

fn parse_currency(currency: Option<&str>) -> Result<Currency, ApiError> {
    currency
        .map(|code| code.parse::<Currency>().map_err(|e| ApiError::Validation(format!("currency: {}", e))))
        .transpose()
        .map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    pub product_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub underwriter_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "insured name is required"))]
    pub insured_name: String,
    #[validate(email)]
    pub insured_email: Option<String>,
    #[validate(length(max = 50))]
    pub insured_phone: Option<String>,
    /// ISO 4217 code, USD when omitted
    pub currency: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub covers: Vec<CoverSelectionRequest>,
    #[serde(default)]
    pub modifiers: Vec<ModifierApplicationRequest>,
}

impl CreateQuoteRequest {
    /// Converts into the domain request
    pub fn into_domain(self) -> Result<NewQuote, ApiError> {
        Ok(NewQuote {
            product_id: ProductId::from_uuid(self.product_id),
            broker_id: self.broker_id.map(BrokerId::from_uuid),
            underwriter_id: self.underwriter_id.map(UnderwriterId::from_uuid),
            insured_name: self.insured_name,
            insured_email: self.insured_email,
            insured_phone: self.insured_phone,
            currency: parse_currency(self.currency.as_deref())?,
            valid_until: self.valid_until,
            notes: self.notes,
            covers: self.covers.into_iter().map(CoverSelectionRequest::into_domain).collect(),
            modifiers: self
                .modifiers
                .into_iter()
                .map(|m| QuoteModifierInput {
                    modifier_id: ModifierId::from_uuid(m.modifier_id),
                    applied_value: m.applied_value,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuoteRequest {
    pub broker_id: Option<Uuid>,
    pub underwriter_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "insured name is required"))]
    pub insured_name: String,
    #[validate(email)]
    pub insured_email: Option<String>,
    #[validate(length(max = 50))]
    pub insured_phone: Option<String>,
    pub currency: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub covers: Vec<CoverSelectionRequest>,
}

impl UpdateQuoteRequest {
    /// Converts into the domain request
    pub fn into_domain(self) -> Result<QuoteUpdate, ApiError> {
        Ok(QuoteUpdate {
            broker_id: self.broker_id.map(BrokerId::from_uuid),
            underwriter_id: self.underwriter_id.map(UnderwriterId::from_uuid),
            insured_name: self.insured_name,
            insured_email: self.insured_email,
            insured_phone: self.insured_phone,
            currency: parse_currency(self.currency.as_deref())?,
            valid_until: self.valid_until,
            notes: self.notes,
            covers: self.covers.into_iter().map(CoverSelectionRequest::into_domain).collect(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CoverSelectionRequest {
    pub cover_id: Uuid,
    #[serde(default = "default_selected")]
    pub is_selected: bool,
    #[validate(custom(function = "non_negative"))]
    pub selected_limit: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub selected_deductible: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub basis_value: Option<Decimal>,
}

impl CoverSelectionRequest {
    fn into_domain(self) -> QuoteCoverInput {
        QuoteCoverInput {
            cover_id: CoverId::from_uuid(self.cover_id),
            is_selected: self.is_selected,
            selected_limit: self.selected_limit,
            selected_deductible: self.selected_deductible,
            basis_value: self.basis_value,
        }
    }
}

/// Applied value bounds are not checked; the engine trusts them.
#[derive(Debug, Deserialize)]
pub struct ModifierApplicationRequest {
    pub modifier_id: Uuid,
    pub applied_value: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuotesQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuotesQuery {
    /// Converts into a domain filter, accepting any casing of the status
    pub fn into_filter(self) -> Result<QuoteFilter, ApiError> {
        let status = self
            .status
            .map(|s| match s.to_ascii_lowercase().as_str() {
                "draft" => Ok(QuoteStatus::Draft),
                "submitted" => Ok(QuoteStatus::Submitted),
                "bound" => Ok(QuoteStatus::Bound),
                _ => Err(ApiError::BadRequest(format!("Unknown quote status: {}", s))),
            })
            .transpose()?;

        Ok(QuoteFilter {
            status,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteListResponse {
    pub quotes: Vec<QuoteSummary>,
    pub count: usize,
}

impl From<Vec<QuoteSummary>> for QuoteListResponse {
    fn from(quotes: Vec<QuoteSummary>) -> Self {
        Self {
            count: quotes.len(),
            quotes,
        }
    }
}
