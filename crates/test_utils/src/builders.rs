//! Test Data Builders
//!
//! Builder patterns for constructing rating data and in-memory quotes with
//! sensible defaults. Tests specify only the fields they care about.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{
    CoverId, Currency, ModifierId, PremiumRuleId, ProductId, QuoteCoverId, QuoteId,
    QuoteModifierId,
};
use domain_quote::{
    ModifierDefinition, ModifierType, PremiumRule, PremiumType, Quote, QuoteCover,
    QuoteModifier, QuoteStatus, ValueType,
};

use crate::fixtures::{StringFixtures, TemporalFixtures};

/// Builder for premium rules
#[derive(Debug, Clone)]
pub struct PremiumRuleBuilder {
    premium_type: PremiumType,
    base_rate: Option<Decimal>,
    flat_amount: Option<Decimal>,
    min_premium: Option<Decimal>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl PremiumRuleBuilder {
    /// Creates an active rule of the given type with no operands
    pub fn new(premium_type: PremiumType) -> Self {
        Self {
            premium_type,
            base_rate: None,
            flat_amount: None,
            min_premium: None,
            is_active: true,
            created_at: TemporalFixtures::catalog_created(),
        }
    }

    /// A flat rule charging `amount`
    pub fn flat(amount: Decimal) -> Self {
        Self::new(PremiumType::Flat).with_flat_amount(amount)
    }

    /// A rule charging `rate` times the basis
    pub fn rate_based(rate: Decimal) -> Self {
        Self::new(PremiumType::RateBased).with_base_rate(rate)
    }

    /// A rule charging `rate` per unit of basis
    pub fn per_unit(rate: Decimal) -> Self {
        Self::new(PremiumType::PerUnit).with_base_rate(rate)
    }

    pub fn with_base_rate(mut self, rate: Decimal) -> Self {
        self.base_rate = Some(rate);
        self
    }

    pub fn with_flat_amount(mut self, amount: Decimal) -> Self {
        self.flat_amount = Some(amount);
        self
    }

    pub fn with_min_premium(mut self, floor: Decimal) -> Self {
        self.min_premium = Some(floor);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Marks the rule as retired
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> PremiumRule {
        PremiumRule {
            id: PremiumRuleId::new(),
            premium_type: self.premium_type,
            base_rate: self.base_rate,
            flat_amount: self.flat_amount,
            min_premium: self.min_premium,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// Builder for modifier definitions
#[derive(Debug, Clone)]
pub struct ModifierDefinitionBuilder {
    name: String,
    code: String,
    modifier_type: ModifierType,
    value_type: ValueType,
    min_value: Option<Decimal>,
    max_value: Option<Decimal>,
    default_value: Option<Decimal>,
}

impl ModifierDefinitionBuilder {
    /// Creates a percentage modifier of the given type
    pub fn new(modifier_type: ModifierType) -> Self {
        Self {
            name: format!("{} modifier", modifier_type),
            code: modifier_type.as_str().to_ascii_uppercase(),
            modifier_type,
            value_type: ValueType::Percentage,
            min_value: None,
            max_value: None,
            default_value: None,
        }
    }

    pub fn loading() -> Self {
        Self::new(ModifierType::Loading)
    }

    pub fn discount() -> Self {
        Self::new(ModifierType::Discount)
    }

    pub fn adjustment() -> Self {
        Self::new(ModifierType::Adjustment)
    }

    /// Switches to a fixed amount modifier
    pub fn fixed(mut self) -> Self {
        self.value_type = ValueType::Fixed;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_bounds(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn with_default(mut self, value: Decimal) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn build(self) -> ModifierDefinition {
        ModifierDefinition {
            id: ModifierId::new(),
            name: self.name,
            code: self.code,
            modifier_type: self.modifier_type,
            value_type: self.value_type,
            min_value: self.min_value,
            max_value: self.max_value,
            default_value: self.default_value,
            is_active: true,
        }
    }
}

/// Builder for hydrated quotes held in memory
///
/// Covers carry their rule directly, the way a storage load would hydrate
/// them, so the result can go straight into `compute_breakdown`.
#[derive(Debug, Clone)]
pub struct TestQuoteBuilder {
    id: QuoteId,
    product_name: String,
    insured_name: String,
    status: QuoteStatus,
    currency: Currency,
    covers: Vec<QuoteCover>,
    modifiers: Vec<QuoteModifier>,
}

impl Default for TestQuoteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestQuoteBuilder {
    /// Creates a draft quote with no covers or modifiers
    pub fn new() -> Self {
        Self {
            id: QuoteId::new(),
            product_name: StringFixtures::product_name().to_string(),
            insured_name: StringFixtures::insured_name().to_string(),
            status: QuoteStatus::Draft,
            currency: Currency::default(),
            covers: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: QuoteStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_insured_name(mut self, name: impl Into<String>) -> Self {
        self.insured_name = name.into();
        self
    }

    /// Adds a selected cover rated by `rule`
    pub fn with_cover(self, rule: Option<PremiumRule>, basis_value: Option<Decimal>) -> Self {
        self.push_cover(rule, basis_value, true)
    }

    /// Adds a cover the insured did not select
    pub fn with_unselected_cover(self, rule: Option<PremiumRule>, basis_value: Option<Decimal>) -> Self {
        self.push_cover(rule, basis_value, false)
    }

    fn push_cover(mut self, rule: Option<PremiumRule>, basis_value: Option<Decimal>, selected: bool) -> Self {
        let position = self.covers.len() + 1;
        self.covers.push(QuoteCover {
            id: QuoteCoverId::new(),
            quote_id: self.id,
            cover_id: CoverId::new(),
            cover_name: format!("Cover {}", position),
            is_selected: selected,
            selected_limit: None,
            selected_deductible: None,
            basis_value,
            calculated_premium: None,
            premium_rule: rule,
        });
        self
    }

    /// Applies a modifier definition with the given value
    pub fn with_modifier(mut self, definition: &ModifierDefinition, applied_value: Decimal) -> Self {
        self.modifiers.push(QuoteModifier {
            id: QuoteModifierId::new(),
            quote_id: self.id,
            modifier_id: definition.id,
            modifier_name: definition.name.clone(),
            modifier_type: definition.modifier_type,
            value_type: definition.value_type,
            applied_value,
            premium_impact: None,
        });
        self
    }

    pub fn build(self) -> Quote {
        let now = Utc::now();
        Quote {
            id: self.id,
            product_id: ProductId::new(),
            product_name: self.product_name,
            broker_id: None,
            broker_name: None,
            underwriter_id: None,
            underwriter_name: None,
            insured_name: self.insured_name,
            insured_email: None,
            insured_phone: None,
            status: self.status,
            currency: self.currency,
            base_premium: None,
            total_premium: None,
            valid_until: Some(TemporalFixtures::valid_until()),
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            covers: self.covers,
            modifiers: self.modifiers,
        }
    }
}
