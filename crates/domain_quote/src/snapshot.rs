//! Read views returned to callers

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BrokerId, CoverId, Currency, ModifierId, ProductId, QuoteCoverId, QuoteId, QuoteModifierId,
    UnderwriterId,
};

use crate::quote::{Quote, QuoteCover, QuoteModifier, QuoteStatus};

/// A cover line of a quote snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLine {
    pub id: QuoteCoverId,
    pub cover_id: CoverId,
    pub cover_name: String,
    pub is_selected: bool,
    pub selected_limit: Option<Decimal>,
    pub selected_deductible: Option<Decimal>,
    pub calculated_premium: Option<Decimal>,
    pub basis_value: Option<Decimal>,
}

/// A modifier line of a quote snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierLine {
    pub id: QuoteModifierId,
    pub modifier_id: ModifierId,
    pub modifier_name: String,
    pub applied_value: Decimal,
    pub premium_impact: Option<Decimal>,
}

/// Fully hydrated view of a quote and its breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub id: QuoteId,
    pub product_id: ProductId,
    pub product_name: String,
    pub broker_id: Option<BrokerId>,
    pub broker_name: Option<String>,
    pub underwriter_id: Option<UnderwriterId>,
    pub underwriter_name: Option<String>,
    pub insured_name: String,
    pub insured_email: Option<String>,
    pub insured_phone: Option<String>,
    pub status: QuoteStatus,
    pub currency: Currency,
    pub base_premium: Option<Decimal>,
    pub total_premium: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub covers: Vec<CoverLine>,
    pub modifiers: Vec<ModifierLine>,
}

/// Header-only view used by listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub id: QuoteId,
    pub product_id: ProductId,
    pub product_name: String,
    pub broker_name: Option<String>,
    pub underwriter_name: Option<String>,
    pub insured_name: String,
    pub status: QuoteStatus,
    pub currency: Currency,
    pub base_premium: Option<Decimal>,
    pub total_premium: Option<Decimal>,
    pub valid_until: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<&QuoteCover> for CoverLine {
    fn from(cover: &QuoteCover) -> Self {
        Self {
            id: cover.id,
            cover_id: cover.cover_id,
            cover_name: cover.cover_name.clone(),
            is_selected: cover.is_selected,
            selected_limit: cover.selected_limit,
            selected_deductible: cover.selected_deductible,
            calculated_premium: cover.calculated_premium,
            basis_value: cover.basis_value,
        }
    }
}

impl From<&QuoteModifier> for ModifierLine {
    fn from(modifier: &QuoteModifier) -> Self {
        Self {
            id: modifier.id,
            modifier_id: modifier.modifier_id,
            modifier_name: modifier.modifier_name.clone(),
            applied_value: modifier.applied_value,
            premium_impact: modifier.premium_impact,
        }
    }
}

impl From<&Quote> for QuoteSnapshot {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            product_id: quote.product_id,
            product_name: quote.product_name.clone(),
            broker_id: quote.broker_id,
            broker_name: quote.broker_name.clone(),
            underwriter_id: quote.underwriter_id,
            underwriter_name: quote.underwriter_name.clone(),
            insured_name: quote.insured_name.clone(),
            insured_email: quote.insured_email.clone(),
            insured_phone: quote.insured_phone.clone(),
            status: quote.status,
            currency: quote.currency,
            base_premium: quote.base_premium,
            total_premium: quote.total_premium,
            valid_until: quote.valid_until,
            notes: quote.notes.clone(),
            created_at: quote.created_at,
            updated_at: quote.updated_at,
            covers: quote.covers.iter().map(CoverLine::from).collect(),
            modifiers: quote.modifiers.iter().map(ModifierLine::from).collect(),
        }
    }
}

impl From<&Quote> for QuoteSummary {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            product_id: quote.product_id,
            product_name: quote.product_name.clone(),
            broker_name: quote.broker_name.clone(),
            underwriter_name: quote.underwriter_name.clone(),
            insured_name: quote.insured_name.clone(),
            status: quote.status,
            currency: quote.currency,
            base_premium: quote.base_premium,
            total_premium: quote.total_premium,
            valid_until: quote.valid_until,
            created_at: quote.created_at,
        }
    }
}

impl QuoteSnapshot {
    /// Sum of the calculated premiums of selected covers, `None` on overflow
    pub fn selected_cover_total(&self) -> Option<Decimal> {
        self.covers
            .iter()
            .filter(|c| c.is_selected)
            .filter_map(|c| c.calculated_premium)
            .try_fold(Decimal::ZERO, |acc, premium| acc.checked_add(premium))
    }

    /// Sum of all modifier impacts, `None` on overflow
    pub fn modifier_total(&self) -> Option<Decimal> {
        self.modifiers
            .iter()
            .filter_map(|m| m.premium_impact)
            .try_fold(Decimal::ZERO, |acc, impact| acc.checked_add(impact))
    }
}
