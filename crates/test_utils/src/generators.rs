//! Property-Based Test Generators
//!
//! Proptest strategies for rating data and whole quotes, plus `fake`-backed
//! generators for realistic insured details.

use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, ProductId};
use domain_quote::{
    ModifierDefinition, NewQuote, PremiumRule, Quote, QuoteCoverInput,
};

use crate::builders::{ModifierDefinitionBuilder, PremiumRuleBuilder, TestQuoteBuilder};

/// Strategy for generating Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::JPY),
        Just(Currency::CHF),
        Just(Currency::AUD),
    ]
}

/// Strategy for non-negative amounts with up to two decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64, 0u32..3u32).prop_map(|(m, s)| Decimal::new(m, s))
}

/// Strategy for a basis value, sometimes missing
pub fn basis_strategy() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::weighted(0.8, amount_strategy())
}

/// Strategy for rating rates between 0 and 0.1
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..1000u32).prop_map(|n| Decimal::new(n as i64, 4))
}

/// Strategy for percentages between -50% and 50%
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (-5000i64..5000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for an active premium rule of any type
pub fn premium_rule_strategy() -> impl Strategy<Value = PremiumRule> {
    let floor = prop::option::weighted(0.3, amount_strategy());
    (
        prop_oneof![
            amount_strategy().prop_map(PremiumRuleBuilder::flat),
            rate_strategy().prop_map(PremiumRuleBuilder::rate_based),
            amount_strategy().prop_map(PremiumRuleBuilder::per_unit),
        ],
        floor,
    )
        .prop_map(|(builder, floor)| match floor {
            Some(min) => builder.with_min_premium(min).build(),
            None => builder.build(),
        })
}

/// Strategy for a modifier definition of any type
pub fn modifier_definition_strategy() -> impl Strategy<Value = ModifierDefinition> {
    (0usize..3, any::<bool>()).prop_map(|(kind, fixed)| {
        let builder = match kind {
            0 => ModifierDefinitionBuilder::loading(),
            1 => ModifierDefinitionBuilder::discount(),
            _ => ModifierDefinitionBuilder::adjustment(),
        };
        if fixed {
            builder.fixed().build()
        } else {
            builder.build()
        }
    })
}

/// Strategy for a hydrated quote with up to six covers and four modifiers
///
/// Covers may lack an active rule and may be unselected; modifiers may
/// carry negative applied values.
pub fn quote_strategy() -> impl Strategy<Value = Quote> {
    let cover = (
        prop::option::weighted(0.85, premium_rule_strategy()),
        basis_strategy(),
        prop::bool::weighted(0.75),
    );
    let modifier = (modifier_definition_strategy(), percentage_strategy());

    (
        prop::collection::vec(cover, 0..6),
        prop::collection::vec(modifier, 0..4),
    )
        .prop_map(|(covers, modifiers)| {
            let builder = covers
                .into_iter()
                .fold(TestQuoteBuilder::new(), |builder, (rule, basis, selected)| {
                    if selected {
                        builder.with_cover(rule, basis)
                    } else {
                        builder.with_unselected_cover(rule, basis)
                    }
                });
            modifiers
                .iter()
                .fold(builder, |builder, (definition, value)| {
                    builder.with_modifier(definition, *value)
                })
                .build()
        })
}

/// Generated contact details for an insured
#[derive(Debug, Clone)]
pub struct FakeInsured {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Generates a plausible insured company
pub fn fake_insured() -> FakeInsured {
    FakeInsured {
        name: CompanyName().fake(),
        email: SafeEmail().fake(),
        phone: PhoneNumber().fake(),
    }
}

/// Generates a create request for `product_id` selecting each cover
pub fn fake_new_quote(product_id: ProductId, covers: Vec<QuoteCoverInput>) -> NewQuote {
    let insured = fake_insured();
    NewQuote {
        product_id,
        insured_name: insured.name,
        insured_email: Some(insured.email),
        insured_phone: Some(insured.phone),
        covers,
        ..NewQuote::default()
    }
}
