//! Premium calculation
//!
//! The calculation is split in two: [`compute_breakdown`] is a pure function
//! of a loaded quote, and [`PremiumCalculationEngine`] wraps it in a single
//! unit of work so the read of rating inputs and the write of the result
//! cannot interleave with a concurrent edit.
//!
//! ```text
//! base  = Σ cover_premium(rule, basis)      over selected covers
//! total = base + Σ impact(modifier, base)   over all modifiers
//! ```
//!
//! Arithmetic is exact decimal and nothing is rounded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use core_kernel::{CoverId, ModifierId, QuoteCoverId, QuoteId, QuoteModifierId};

use crate::error::QuoteError;
use crate::ports::{QuotePort, QuoteUnitOfWork};
use crate::quote::Quote;
use crate::snapshot::QuoteSnapshot;

/// Calculated premium of one selected cover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverPremium {
    pub quote_cover_id: QuoteCoverId,
    pub cover_id: CoverId,
    pub premium: Decimal,
}

/// Calculated impact of one applied modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierImpact {
    pub quote_modifier_id: QuoteModifierId,
    pub modifier_id: ModifierId,
    pub impact: Decimal,
}

/// Result of one calculation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    pub base_premium: Decimal,
    pub total_premium: Decimal,
    /// One entry per selected cover, in quote order
    pub covers: Vec<CoverPremium>,
    /// One entry per modifier, in quote order
    pub modifiers: Vec<ModifierImpact>,
}

/// Computes the premium breakdown of a quote
///
/// A selected cover without an active rule is priced at an explicit zero.
/// Unselected covers are left out of the breakdown entirely.
///
/// # Errors
///
/// `QuoteError::Arithmetic` if any premium, impact or sum overflows
pub fn compute_breakdown(quote: &Quote) -> Result<PremiumBreakdown, QuoteError> {
    let covers = quote
        .selected_covers()
        .map(|cover| -> Result<CoverPremium, QuoteError> {
            let premium = match &cover.premium_rule {
                Some(rule) => rule.cover_premium(cover.basis_value)?,
                None => Decimal::ZERO,
            };
            Ok(CoverPremium {
                quote_cover_id: cover.id,
                cover_id: cover.cover_id,
                premium,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let base_premium = checked_sum(Decimal::ZERO, covers.iter().map(|c| c.premium), "base premium")?;

    let modifiers = quote
        .modifiers
        .iter()
        .map(|modifier| -> Result<ModifierImpact, QuoteError> {
            Ok(ModifierImpact {
                quote_modifier_id: modifier.id,
                modifier_id: modifier.modifier_id,
                impact: modifier.impact(base_premium)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total_premium = checked_sum(base_premium, modifiers.iter().map(|m| m.impact), "total premium")?;

    Ok(PremiumBreakdown {
        base_premium,
        total_premium,
        covers,
        modifiers,
    })
}

fn checked_sum<I>(start: Decimal, terms: I, what: &str) -> Result<Decimal, QuoteError>
where
    I: IntoIterator<Item = Decimal>,
{
    terms
        .into_iter()
        .try_fold(start, |acc, term| acc.checked_add(term))
        .ok_or_else(|| QuoteError::arithmetic(format!("{} exceeds the decimal range", what)))
}

/// Loads, prices and persists quotes
#[derive(Clone)]
pub struct PremiumCalculationEngine {
    port: Arc<dyn QuotePort>,
}

impl PremiumCalculationEngine {
    /// Creates an engine over the given storage port
    pub fn new(port: Arc<dyn QuotePort>) -> Self {
        Self { port }
    }

    /// Recalculates a quote's premium in its own unit of work
    ///
    /// # Errors
    ///
    /// - `QuoteError::QuoteNotFound` if the id does not resolve
    /// - `QuoteError::Integrity` if a cover or modifier definition is missing
    /// - `QuoteError::Arithmetic` if the premium overflows; nothing is saved
    /// - `QuoteError::Storage` for persistence failures, which are not retried
    #[instrument(skip_all, fields(quote_id = %quote_id))]
    pub async fn calculate(&self, quote_id: QuoteId) -> Result<QuoteSnapshot, QuoteError> {
        let mut uow = self.port.begin().await?;
        let quote = Self::recalculate(uow.as_mut(), quote_id, Utc::now()).await?;
        uow.commit().await?;

        Ok(QuoteSnapshot::from(&quote))
    }

    /// Recalculates a quote inside a unit of work the caller owns
    ///
    /// Nothing is committed; the caller decides when the unit of work ends.
    pub async fn recalculate(
        uow: &mut dyn QuoteUnitOfWork,
        quote_id: QuoteId,
        now: DateTime<Utc>,
    ) -> Result<Quote, QuoteError> {
        let mut quote = uow
            .load_quote(quote_id)
            .await?
            .ok_or(QuoteError::QuoteNotFound(quote_id))?;

        let breakdown = compute_breakdown(&quote)?;
        debug!(
            covers = breakdown.covers.len(),
            modifiers = breakdown.modifiers.len(),
            "Computed premium breakdown"
        );

        quote.apply_breakdown(&breakdown, now);
        uow.save_breakdown(&quote).await?;

        info!(
            quote_id = %quote_id,
            base_premium = %breakdown.base_premium,
            total_premium = %breakdown.total_premium,
            "Premium calculated"
        );

        Ok(quote)
    }
}
