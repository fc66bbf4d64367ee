//! Quote Aggregate Root
//!
//! A quote owns its cover selections and applied modifiers. The premium
//! fields on the quote and its children are written only by the calculation
//! engine; edits clear the premium of every cover they touch.
//!
//! # Invariants
//!
//! - Only draft quotes accept edits
//! - Status changes follow the Draft/Submitted/Bound state machine
//! - `base_premium` and `total_premium` are `None` until the first calculation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    BrokerId, CoverId, Currency, ModifierId, ProductId, QuoteCoverId, QuoteId, QuoteModifierId,
    Rate, UnderwriterId, UserId,
};

use crate::calculation::PremiumBreakdown;
use crate::error::QuoteError;
use crate::ports::QuoteUpdate;
use crate::rating::{ModifierType, PremiumRule, ValueType};

/// Quote lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[default]
    Draft,
    Submitted,
    Bound,
}

impl QuoteStatus {
    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "Draft",
            QuoteStatus::Submitted => "Submitted",
            QuoteStatus::Bound => "Bound",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(QuoteStatus::Draft),
            "Submitted" => Ok(QuoteStatus::Submitted),
            "Bound" => Ok(QuoteStatus::Bound),
            other => Err(QuoteError::validation(format!("Unknown quote status: {}", other))),
        }
    }
}

/// A cover the insured may select on a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCover {
    pub id: QuoteCoverId,
    pub quote_id: QuoteId,
    pub cover_id: CoverId,
    pub cover_name: String,
    /// Unselected covers contribute nothing to the premium
    pub is_selected: bool,
    pub selected_limit: Option<Decimal>,
    pub selected_deductible: Option<Decimal>,
    /// Rating base such as sum insured or revenue
    pub basis_value: Option<Decimal>,
    /// Written by the engine; `None` means not calculated since the last edit
    pub calculated_premium: Option<Decimal>,
    /// The cover's active rule at load time
    pub premium_rule: Option<PremiumRule>,
}

/// A modifier applied to a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteModifier {
    pub id: QuoteModifierId,
    pub quote_id: QuoteId,
    pub modifier_id: ModifierId,
    pub modifier_name: String,
    pub modifier_type: ModifierType,
    pub value_type: ValueType,
    /// Percentage or amount used for this quote
    pub applied_value: Decimal,
    /// Signed effect on the total premium, written by the engine
    pub premium_impact: Option<Decimal>,
}

impl QuoteModifier {
    /// Computes this modifier's effect on the given base premium
    ///
    /// Discounts are always non-positive whatever the sign of the applied value.
    ///
    /// # Errors
    ///
    /// `QuoteError::Arithmetic` if the percentage of the base overflows
    pub fn impact(&self, base_premium: Decimal) -> Result<Decimal, QuoteError> {
        let impact = match self.value_type {
            ValueType::Percentage => Rate::from_percentage(self.applied_value)
                .apply(base_premium)
                .ok_or_else(|| {
                    QuoteError::arithmetic(format!(
                        "{}% of {} for modifier {}",
                        self.applied_value, base_premium, self.modifier_name
                    ))
                })?,
            ValueType::Fixed => self.applied_value,
        };

        Ok(match self.modifier_type {
            ModifierType::Discount => -impact.abs(),
            ModifierType::Loading | ModifierType::Adjustment => impact,
        })
    }
}

/// The Quote aggregate root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
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
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub covers: Vec<QuoteCover>,
    pub modifiers: Vec<QuoteModifier>,
}

impl Quote {
    /// Checks if the quote accepts edits
    pub fn is_modifiable(&self) -> bool {
        self.status == QuoteStatus::Draft
    }

    /// Checks if a premium has been calculated
    pub fn is_calculated(&self) -> bool {
        self.base_premium.is_some() && self.total_premium.is_some()
    }

    /// Iterates over the covers that take part in rating
    pub fn selected_covers(&self) -> impl Iterator<Item = &QuoteCover> {
        self.covers.iter().filter(|cover| cover.is_selected)
    }

    /// Submits a draft quote for underwriting
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), QuoteError> {
        self.transition(QuoteStatus::Draft, QuoteStatus::Submitted, now)
    }

    /// Binds a submitted quote
    pub fn bind(&mut self, now: DateTime<Utc>) -> Result<(), QuoteError> {
        self.transition(QuoteStatus::Submitted, QuoteStatus::Bound, now)
    }

    /// Sends a submitted quote back to draft
    pub fn revise(&mut self, now: DateTime<Utc>) -> Result<(), QuoteError> {
        self.transition(QuoteStatus::Submitted, QuoteStatus::Draft, now)
    }

    /// Reopens a bound quote as a draft
    pub fn revise_binding(&mut self, now: DateTime<Utc>) -> Result<(), QuoteError> {
        self.transition(QuoteStatus::Bound, QuoteStatus::Draft, now)
    }

    fn transition(
        &mut self,
        expected: QuoteStatus,
        to: QuoteStatus,
        now: DateTime<Utc>,
    ) -> Result<(), QuoteError> {
        if self.status != expected {
            return Err(QuoteError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Applies an edit to a draft quote
    ///
    /// Header fields are replaced wholesale. Cover inputs are matched to
    /// existing covers by cover id; matched covers lose their calculated
    /// premium and unmatched inputs are ignored. Modifiers are untouched.
    pub fn apply_update(&mut self, update: &QuoteUpdate, now: DateTime<Utc>) -> Result<(), QuoteError> {
        if !self.is_modifiable() {
            return Err(QuoteError::NotModifiable(self.status));
        }

        self.broker_id = update.broker_id;
        self.underwriter_id = update.underwriter_id;
        self.insured_name = update.insured_name.clone();
        self.insured_email = update.insured_email.clone();
        self.insured_phone = update.insured_phone.clone();
        self.currency = update.currency;
        self.valid_until = update.valid_until;
        self.notes = update.notes.clone();
        self.updated_at = now;

        for input in &update.covers {
            let Some(cover) = self.covers.iter_mut().find(|c| c.cover_id == input.cover_id) else {
                continue;
            };
            cover.is_selected = input.is_selected;
            cover.basis_value = input.basis_value;
            cover.selected_limit = input.selected_limit;
            cover.selected_deductible = input.selected_deductible;
            cover.calculated_premium = None;
        }

        Ok(())
    }

    /// Copies a calculation result onto the aggregate
    pub fn apply_breakdown(&mut self, breakdown: &PremiumBreakdown, now: DateTime<Utc>) {
        for line in &breakdown.covers {
            if let Some(cover) = self.covers.iter_mut().find(|c| c.id == line.quote_cover_id) {
                cover.calculated_premium = Some(line.premium);
            }
        }
        for line in &breakdown.modifiers {
            if let Some(modifier) = self.modifiers.iter_mut().find(|m| m.id == line.quote_modifier_id) {
                modifier.premium_impact = Some(line.impact);
            }
        }

        self.base_premium = Some(breakdown.base_premium);
        self.total_premium = Some(breakdown.total_premium);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::QuoteCoverInput;
    use rust_decimal_macros::dec;

    fn draft_quote() -> Quote {
        let id = QuoteId::new();
        let now = Utc::now();
        Quote {
            id,
            product_id: ProductId::new(),
            product_name: "Commercial Property".to_string(),
            broker_id: None,
            broker_name: None,
            underwriter_id: None,
            underwriter_name: None,
            insured_name: "Acme Ltd".to_string(),
            insured_email: None,
            insured_phone: None,
            status: QuoteStatus::Draft,
            currency: Currency::USD,
            base_premium: None,
            total_premium: None,
            valid_until: None,
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            covers: vec![QuoteCover {
                id: QuoteCoverId::new(),
                quote_id: id,
                cover_id: CoverId::new(),
                cover_name: "Buildings".to_string(),
                is_selected: true,
                selected_limit: None,
                selected_deductible: None,
                basis_value: Some(dec!(100000)),
                calculated_premium: Some(dec!(1000)),
                premium_rule: None,
            }],
            modifiers: vec![],
        }
    }

    fn modifier(modifier_type: ModifierType, value_type: ValueType, applied: Decimal) -> QuoteModifier {
        QuoteModifier {
            id: QuoteModifierId::new(),
            quote_id: QuoteId::new(),
            modifier_id: ModifierId::new(),
            modifier_name: "Test".to_string(),
            modifier_type,
            value_type,
            applied_value: applied,
            premium_impact: None,
        }
    }

    #[test]
    fn test_percentage_loading() {
        let m = modifier(ModifierType::Loading, ValueType::Percentage, dec!(10));
        assert_eq!(m.impact(dec!(1000)).unwrap(), dec!(100));
    }

    #[test]
    fn test_discount_sign_is_forced() {
        let positive = modifier(ModifierType::Discount, ValueType::Percentage, dec!(20));
        let negative = modifier(ModifierType::Discount, ValueType::Percentage, dec!(-20));
        assert_eq!(positive.impact(dec!(1000)).unwrap(), dec!(-200));
        assert_eq!(negative.impact(dec!(1000)).unwrap(), dec!(-200));

        let fixed = modifier(ModifierType::Discount, ValueType::Fixed, dec!(-75));
        assert_eq!(fixed.impact(dec!(1000)).unwrap(), dec!(-75));
    }

    #[test]
    fn test_adjustment_keeps_sign() {
        let m = modifier(ModifierType::Adjustment, ValueType::Fixed, dec!(-40));
        assert_eq!(m.impact(dec!(1000)).unwrap(), dec!(-40));
    }

    #[test]
    fn test_percentage_overflow_is_an_error() {
        let m = modifier(ModifierType::Loading, ValueType::Percentage, dec!(1000));
        assert!(matches!(m.impact(Decimal::MAX), Err(QuoteError::Arithmetic(_))));

        let fixed = modifier(ModifierType::Loading, ValueType::Fixed, dec!(50));
        assert_eq!(fixed.impact(Decimal::MAX).unwrap(), dec!(50));
    }

    #[test]
    fn test_lifecycle() {
        let mut quote = draft_quote();
        let now = Utc::now();

        quote.submit(now).unwrap();
        assert_eq!(quote.status, QuoteStatus::Submitted);
        quote.revise(now).unwrap();
        assert_eq!(quote.status, QuoteStatus::Draft);
        quote.submit(now).unwrap();
        quote.bind(now).unwrap();
        assert_eq!(quote.status, QuoteStatus::Bound);
        quote.revise_binding(now).unwrap();
        assert_eq!(quote.status, QuoteStatus::Draft);
    }

    #[test]
    fn test_invalid_transition() {
        let mut quote = draft_quote();
        let result = quote.bind(Utc::now());
        assert!(matches!(
            result,
            Err(QuoteError::InvalidStatusTransition {
                from: QuoteStatus::Draft,
                to: QuoteStatus::Bound
            })
        ));
        assert_eq!(quote.status, QuoteStatus::Draft);
    }

    #[test]
    fn test_update_resets_matched_cover() {
        let mut quote = draft_quote();
        let cover_id = quote.covers[0].cover_id;
        let update = QuoteUpdate {
            insured_name: "Acme Holdings".to_string(),
            covers: vec![
                QuoteCoverInput {
                    cover_id,
                    is_selected: true,
                    selected_limit: Some(dec!(5000000)),
                    selected_deductible: None,
                    basis_value: Some(dec!(250000)),
                },
                QuoteCoverInput::selected(CoverId::new(), Some(dec!(1))),
            ],
            ..QuoteUpdate::default()
        };

        quote.apply_update(&update, Utc::now()).unwrap();

        assert_eq!(quote.insured_name, "Acme Holdings");
        assert_eq!(quote.covers.len(), 1);
        assert_eq!(quote.covers[0].basis_value, Some(dec!(250000)));
        assert_eq!(quote.covers[0].calculated_premium, None);
    }

    #[test]
    fn test_update_requires_draft() {
        let mut quote = draft_quote();
        quote.submit(Utc::now()).unwrap();
        let result = quote.apply_update(&QuoteUpdate::default(), Utc::now());
        assert!(matches!(result, Err(QuoteError::NotModifiable(QuoteStatus::Submitted))));
    }

    #[test]
    fn test_status_text() {
        assert_eq!("Bound".parse::<QuoteStatus>().unwrap(), QuoteStatus::Bound);
        assert!("bound".parse::<QuoteStatus>().is_err());
    }
}
