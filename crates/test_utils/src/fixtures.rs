//! Pre-built Test Fixtures
//!
//! Ready-to-use rating catalog entries and timestamps. Values are fixed so
//! expected premiums can be worked out by hand.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use domain_quote::{ModifierDefinition, PremiumRule};

use crate::builders::{ModifierDefinitionBuilder, PremiumRuleBuilder};

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// When the standard catalog rules were created (Jan 1, 2026)
    pub fn catalog_created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    /// A later point for superseding rules (Jun 1, 2026)
    pub fn catalog_revised() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    /// Standard quote expiry date
    pub fn valid_until() -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 1, 31).unwrap()
    }
}

/// Fixture for premium rules
pub struct RuleFixtures;

impl RuleFixtures {
    /// Buildings cover rated at 0.2% of sum insured
    pub fn buildings() -> PremiumRule {
        PremiumRuleBuilder::rate_based(dec!(0.002)).build()
    }

    /// Liability cover at a flat 150
    pub fn liability() -> PremiumRule {
        PremiumRuleBuilder::flat(dec!(150)).build()
    }

    /// Contents cover at 0.5% with a 250 minimum
    pub fn contents() -> PremiumRule {
        PremiumRuleBuilder::rate_based(dec!(0.005))
            .with_min_premium(dec!(250))
            .build()
    }

    /// Per-vehicle rate
    pub fn fleet() -> PremiumRule {
        PremiumRuleBuilder::per_unit(dec!(420)).build()
    }
}

/// Fixture for modifier definitions
pub struct ModifierFixtures;

impl ModifierFixtures {
    /// Percentage loading for vacant properties
    pub fn vacancy_loading() -> ModifierDefinition {
        ModifierDefinitionBuilder::loading()
            .with_name("Vacancy Loading")
            .with_code("VACANCY")
            .with_bounds(dec!(0), dec!(50))
            .with_default(dec!(10))
            .build()
    }

    /// Percentage discount for a claims-free history
    pub fn claims_free_discount() -> ModifierDefinition {
        ModifierDefinitionBuilder::discount()
            .with_name("Claims Free Discount")
            .with_code("NCD")
            .with_bounds(dec!(0), dec!(30))
            .build()
    }

    /// Fixed administration fee
    pub fn admin_fee() -> ModifierDefinition {
        ModifierDefinitionBuilder::adjustment()
            .fixed()
            .with_name("Administration Fee")
            .with_code("ADMIN")
            .build()
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn product_name() -> &'static str {
        "Landlord Insurance"
    }

    pub fn insured_name() -> &'static str {
        "Mrs J Patel"
    }

    pub fn insured_email() -> &'static str {
        "j.patel@example.com"
    }

    pub fn broker_name() -> &'static str {
        "Northgate Brokers"
    }

    pub fn underwriter_name() -> &'static str {
        "Alex Morgan"
    }
}
