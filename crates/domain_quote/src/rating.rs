//! Rating rules
//!
//! A cover carries a history of premium rules, of which at most one is
//! expected to be active. Modifiers are product-level definitions that a
//! quote applies with its own value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ModifierId, PremiumRuleId};

use crate::error::QuoteError;

/// How a cover premium is derived from its rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PremiumType {
    /// A fixed amount regardless of the basis value
    Flat,
    /// Basis value multiplied by the base rate
    RateBased,
    /// Basis value multiplied by the base rate, one unit being one unit of basis
    PerUnit,
}

/// A premium rule attached to a cover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumRule {
    pub id: PremiumRuleId,
    pub premium_type: PremiumType,
    /// Multiplier for rate based and per unit rules
    pub base_rate: Option<Decimal>,
    /// Amount for flat rules
    pub flat_amount: Option<Decimal>,
    /// Floor applied after the type specific computation
    pub min_premium: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PremiumRule {
    /// Picks the rule a cover is rated with
    ///
    /// Rules are considered oldest first; among rules created at the same
    /// instant the input order wins. Returns `None` when no rule is active,
    /// which is a valid business state rather than an error.
    pub fn select_active<'a, I>(rules: I) -> Option<&'a PremiumRule>
    where
        I: IntoIterator<Item = &'a PremiumRule>,
    {
        rules
            .into_iter()
            .filter(|rule| rule.is_active)
            .min_by(|a, b| a.created_at.cmp(&b.created_at))
    }

    /// Computes the premium of one selected cover
    ///
    /// Missing operands count as zero. When a minimum premium is configured
    /// the result is never below it.
    ///
    /// # Errors
    ///
    /// `QuoteError::Arithmetic` if basis times rate overflows
    pub fn cover_premium(&self, basis_value: Option<Decimal>) -> Result<Decimal, QuoteError> {
        let raw = match self.premium_type {
            PremiumType::Flat => self.flat_amount.unwrap_or(Decimal::ZERO),
            // PerUnit shares the rate based formula
            PremiumType::RateBased | PremiumType::PerUnit => {
                let basis = basis_value.unwrap_or(Decimal::ZERO);
                let rate = self.base_rate.unwrap_or(Decimal::ZERO);
                basis.checked_mul(rate).ok_or_else(|| {
                    QuoteError::arithmetic(format!("basis {} at rate {} for rule {}", basis, rate, self.id))
                })?
            }
        };

        Ok(match self.min_premium {
            Some(floor) if raw < floor => floor,
            _ => raw,
        })
    }
}

/// Direction of a modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierType {
    Loading,
    Discount,
    Adjustment,
}

/// Shape of a modifier's applied value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Applied value is a percentage of the base premium
    Percentage,
    /// Applied value is a monetary amount
    Fixed,
}

/// A modifier as configured on a product
///
/// The bounds constrain what may be configured. They are not enforced when a
/// quote's premium is calculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierDefinition {
    pub id: ModifierId,
    pub name: String,
    pub code: String,
    pub modifier_type: ModifierType,
    pub value_type: ValueType,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub default_value: Option<Decimal>,
    pub is_active: bool,
}

macro_rules! impl_text_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the storage representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = QuoteError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(QuoteError::validation(format!(
                        concat!("Unknown ", $label, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

impl_text_enum!(PremiumType, "premium type", {
    Flat => "Flat",
    RateBased => "RateBased",
    PerUnit => "PerUnit",
});

impl_text_enum!(ModifierType, "modifier type", {
    Loading => "Loading",
    Discount => "Discount",
    Adjustment => "Adjustment",
});

impl_text_enum!(ValueType, "value type", {
    Percentage => "Percentage",
    Fixed => "Fixed",
});
