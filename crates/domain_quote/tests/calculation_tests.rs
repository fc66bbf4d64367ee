//! Premium Calculation Engine Tests
//!
//! # Test Coverage
//!
//! - Literal pricing scenarios for flat, rate based and minimum premium rules
//!   combined with percentage and fixed modifiers
//! - Engine behaviour through the mock port: persistence, idempotence,
//!   missing quotes, integrity failures and failed commits
//! - Property tests for the pricing invariants
//!
//! # Test Organization
//!
//! - `scenarios` - literal end-to-end calculations
//! - `engine` - persistence and error handling
//! - `properties` - proptest invariants over `compute_breakdown`

use std::sync::Arc;

use chrono::{Duration, Utc};
use core_kernel::{
    CoverId, Currency, ModifierId, PremiumRuleId, ProductId, QuoteCoverId, QuoteId, QuoteModifierId,
};
use domain_quote::{
    compute_breakdown, MockQuotePort, ModifierDefinition, ModifierType, NewQuote,
    PremiumCalculationEngine, PremiumRule, PremiumType, Quote, QuoteCover, QuoteCoverInput,
    QuoteError, QuoteModifier, QuoteModifierInput, QuoteStatus, ValueType,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn flat_rule(amount: Decimal) -> PremiumRule {
    PremiumRule {
        id: PremiumRuleId::new(),
        premium_type: PremiumType::Flat,
        base_rate: None,
        flat_amount: Some(amount),
        min_premium: None,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn rated_rule(rate: Decimal, min_premium: Option<Decimal>) -> PremiumRule {
    PremiumRule {
        id: PremiumRuleId::new(),
        premium_type: PremiumType::RateBased,
        base_rate: Some(rate),
        flat_amount: None,
        min_premium,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn modifier_definition(name: &str, modifier_type: ModifierType, value_type: ValueType) -> ModifierDefinition {
    ModifierDefinition {
        id: ModifierId::new(),
        name: name.to_string(),
        code: name.to_uppercase().replace(' ', "_"),
        modifier_type,
        value_type,
        min_value: None,
        max_value: None,
        default_value: None,
        is_active: true,
    }
}

/// Seeds a product and returns a port, an engine and a draft request for it
async fn setup() -> (Arc<MockQuotePort>, PremiumCalculationEngine, NewQuote) {
    let port = Arc::new(MockQuotePort::new());
    let product_id = port.add_product("Commercial Combined").await;
    let engine = PremiumCalculationEngine::new(port.clone());
    let request = NewQuote {
        product_id,
        insured_name: "Harbour Freight Ltd".to_string(),
        currency: Currency::GBP,
        ..NewQuote::default()
    };
    (port, engine, request)
}

/// Inserts a quote without calculating it
async fn insert(port: &MockQuotePort, request: &NewQuote) -> QuoteId {
    use domain_quote::QuotePort;

    let mut uow = port.begin().await.unwrap();
    let id = uow.insert_quote(request, None).await.unwrap();
    uow.commit().await.unwrap();
    id
}

// ============================================================================
// LITERAL SCENARIOS
// ============================================================================

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_flat_premium() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Public Liability", vec![flat_rule(dec!(1500))]).await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.base_premium, Some(dec!(1500)));
        assert_eq!(snapshot.total_premium, Some(dec!(1500)));
        assert_eq!(snapshot.covers[0].calculated_premium, Some(dec!(1500)));
    }

    #[tokio::test]
    async fn test_rate_based_premium() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Buildings", vec![rated_rule(dec!(0.01), None)]).await;
        request.covers.push(QuoteCoverInput::selected(cover, Some(dec!(500000))));
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.base_premium, Some(dec!(5000)));
        assert_eq!(snapshot.total_premium, Some(dec!(5000)));
    }

    #[tokio::test]
    async fn test_minimum_premium_applies() {
        let (port, engine, mut request) = setup().await;
        let cover = port
            .add_cover("Contents", vec![rated_rule(dec!(0.001), Some(dec!(250)))])
            .await;
        request.covers.push(QuoteCoverInput::selected(cover, Some(dec!(1000))));
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.covers[0].calculated_premium, Some(dec!(250)));
        assert_eq!(snapshot.base_premium, Some(dec!(250)));
    }

    #[tokio::test]
    async fn test_percentage_loading() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(1000))]).await;
        let loading = port
            .add_modifier(modifier_definition("Claims Loading", ModifierType::Loading, ValueType::Percentage))
            .await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        request.modifiers.push(QuoteModifierInput { modifier_id: loading, applied_value: dec!(10) });
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.modifiers[0].premium_impact, Some(dec!(100)));
        assert_eq!(snapshot.total_premium, Some(dec!(1100)));
    }

    #[tokio::test]
    async fn test_percentage_discount() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(1000))]).await;
        let discount = port
            .add_modifier(modifier_definition("Loyalty", ModifierType::Discount, ValueType::Percentage))
            .await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        request.modifiers.push(QuoteModifierInput { modifier_id: discount, applied_value: dec!(20) });
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.modifiers[0].premium_impact, Some(dec!(-200)));
        assert_eq!(snapshot.total_premium, Some(dec!(800)));
    }

    #[tokio::test]
    async fn test_fixed_loading_and_discount() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(1000))]).await;
        let loading = port
            .add_modifier(modifier_definition("Survey Fee", ModifierType::Loading, ValueType::Fixed))
            .await;
        let discount = port
            .add_modifier(modifier_definition("Broker Rebate", ModifierType::Discount, ValueType::Fixed))
            .await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        request.modifiers.push(QuoteModifierInput { modifier_id: loading, applied_value: dec!(150) });
        request.modifiers.push(QuoteModifierInput { modifier_id: discount, applied_value: dec!(100) });
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.base_premium, Some(dec!(1000)));
        assert_eq!(snapshot.total_premium, Some(dec!(1050)));
        assert_eq!(snapshot.modifier_total(), Some(dec!(50)));
    }
}

// ============================================================================
// ENGINE BEHAVIOUR
// ============================================================================

mod engine {
    use super::*;

    #[tokio::test]
    async fn test_unknown_quote_is_not_found() {
        let (_port, engine, _request) = setup().await;
        let missing = QuoteId::new();

        let result = engine.calculate(missing).await;

        assert!(matches!(result, Err(QuoteError::QuoteNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_no_selected_covers_is_zero() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Buildings", vec![rated_rule(dec!(0.01), None)]).await;
        request.covers.push(QuoteCoverInput {
            is_selected: false,
            ..QuoteCoverInput::selected(cover, Some(dec!(500000)))
        });
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.base_premium, Some(Decimal::ZERO));
        assert_eq!(snapshot.total_premium, Some(Decimal::ZERO));
        assert_eq!(snapshot.covers[0].calculated_premium, None);
    }

    #[tokio::test]
    async fn test_cover_without_active_rule_is_zero() {
        let (port, engine, mut request) = setup().await;
        let priced = port.add_cover("Liability", vec![flat_rule(dec!(400))]).await;
        let unpriced = port.add_cover("Terrorism", vec![flat_rule(dec!(900))]).await;
        port.deactivate_rules(unpriced).await.unwrap();
        request.covers.push(QuoteCoverInput::selected(priced, None));
        request.covers.push(QuoteCoverInput::selected(unpriced, None));
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();

        assert_eq!(snapshot.base_premium, Some(dec!(400)));
        assert_eq!(snapshot.covers[1].calculated_premium, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_oldest_active_rule_wins() {
        let (port, engine, mut request) = setup().await;
        let mut current = flat_rule(dec!(700));
        current.created_at = Utc::now() - Duration::days(365);
        let cover = port.add_cover("Liability", vec![current]).await;

        let mut superseded = flat_rule(dec!(500));
        superseded.created_at = Utc::now() - Duration::days(730);
        superseded.is_active = false;
        port.add_premium_rule(cover, superseded).await.unwrap();
        port.add_premium_rule(cover, flat_rule(dec!(900))).await.unwrap();

        request.covers.push(QuoteCoverInput::selected(cover, None));
        let id = insert(&port, &request).await;

        let snapshot = engine.calculate(id).await.unwrap();
        assert_eq!(snapshot.base_premium, Some(dec!(700)));
    }

    #[tokio::test]
    async fn test_breakdown_is_persisted() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(1000))]).await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        let id = insert(&port, &request).await;

        let before = port.stored_quote(id).await.unwrap();
        assert!(!before.is_calculated());

        engine.calculate(id).await.unwrap();

        let stored = port.stored_quote(id).await.unwrap();
        assert_eq!(stored.base_premium, Some(dec!(1000)));
        assert_eq!(stored.total_premium, Some(dec!(1000)));
        assert_eq!(stored.covers[0].calculated_premium, Some(dec!(1000)));
        assert!(stored.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_recalculation_is_idempotent() {
        let (port, engine, mut request) = setup().await;
        let liability = port.add_cover("Liability", vec![flat_rule(dec!(1234.56))]).await;
        let buildings = port.add_cover("Buildings", vec![rated_rule(dec!(0.00375), Some(dec!(50)))]).await;
        let loading = port
            .add_modifier(modifier_definition("Flood", ModifierType::Loading, ValueType::Percentage))
            .await;
        request.covers.push(QuoteCoverInput::selected(liability, None));
        request.covers.push(QuoteCoverInput::selected(buildings, Some(dec!(987654.32))));
        request.modifiers.push(QuoteModifierInput { modifier_id: loading, applied_value: dec!(7.5) });
        let id = insert(&port, &request).await;

        let first = engine.calculate(id).await.unwrap();
        let second = engine.calculate(id).await.unwrap();

        assert_eq!(first.base_premium, second.base_premium);
        assert_eq!(first.total_premium, second.total_premium);
        assert_eq!(first.covers, second.covers);
        assert_eq!(first.modifiers, second.modifiers);
    }

    #[tokio::test]
    async fn test_calculation_ignores_status() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(300))]).await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        let id = insert(&port, &request).await;

        {
            use domain_quote::QuotePort;
            let mut uow = port.begin().await.unwrap();
            let mut quote = uow.load_quote(id).await.unwrap().unwrap();
            quote.submit(Utc::now()).unwrap();
            quote.bind(Utc::now()).unwrap();
            uow.save_quote(&quote).await.unwrap();
            uow.commit().await.unwrap();
        }

        let snapshot = engine.calculate(id).await.unwrap();
        assert_eq!(snapshot.status, QuoteStatus::Bound);
        assert_eq!(snapshot.total_premium, Some(dec!(300)));
    }

    #[tokio::test]
    async fn test_missing_cover_definition_is_integrity_error() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(300))]).await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        let id = insert(&port, &request).await;

        port.remove_cover(cover).await;

        let result = engine.calculate(id).await;
        assert!(matches!(result, Err(QuoteError::Integrity(_))));
        assert!(!port.stored_quote(id).await.unwrap().is_calculated());
    }

    #[tokio::test]
    async fn test_missing_modifier_definition_is_integrity_error() {
        let (port, engine, mut request) = setup().await;
        let modifier = port
            .add_modifier(modifier_definition("Flood", ModifierType::Loading, ValueType::Fixed))
            .await;
        request.modifiers.push(QuoteModifierInput { modifier_id: modifier, applied_value: dec!(10) });
        let id = insert(&port, &request).await;

        port.remove_modifier(modifier).await;

        let result = engine.calculate(id).await;
        assert!(matches!(result, Err(QuoteError::Integrity(_))));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_previous_breakdown() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Buildings", vec![rated_rule(dec!(0.01), None)]).await;
        request.covers.push(QuoteCoverInput::selected(cover, Some(dec!(1000))));
        let id = insert(&port, &request).await;
        engine.calculate(id).await.unwrap();

        port.add_premium_rule(cover, {
            let mut earlier = rated_rule(dec!(0.5), None);
            earlier.created_at = Utc::now() - Duration::days(1);
            earlier
        })
        .await
        .unwrap();
        port.fail_next_commit();

        let result = engine.calculate(id).await;
        assert!(matches!(result, Err(QuoteError::Storage(_))));
        assert!(result.unwrap_err().is_transient());

        let stored = port.stored_quote(id).await.unwrap();
        assert_eq!(stored.base_premium, Some(dec!(10)));
        assert_eq!(stored.covers[0].calculated_premium, Some(dec!(10)));
    }

    #[tokio::test]
    async fn test_overflowing_premium_is_rejected_and_not_saved() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Buildings", vec![rated_rule(dec!(10), None)]).await;
        request.covers.push(QuoteCoverInput::selected(cover, Some(Decimal::MAX / dec!(5))));
        let id = insert(&port, &request).await;

        let result = engine.calculate(id).await;
        assert!(matches!(result, Err(QuoteError::Arithmetic(_))), "got {:?}", result);

        let stored = port.stored_quote(id).await.unwrap();
        assert_eq!(stored.base_premium, None);
        assert_eq!(stored.covers[0].calculated_premium, None);
    }

    #[tokio::test]
    async fn test_concurrent_calculations_converge() {
        let (port, engine, mut request) = setup().await;
        let cover = port.add_cover("Liability", vec![flat_rule(dec!(2500))]).await;
        request.covers.push(QuoteCoverInput::selected(cover, None));
        let id = insert(&port, &request).await;

        let (a, b) = tokio::join!(engine.calculate(id), engine.calculate(id));

        assert_eq!(a.unwrap().total_premium, Some(dec!(2500)));
        assert_eq!(b.unwrap().total_premium, Some(dec!(2500)));
    }
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn quote_with(covers: Vec<QuoteCover>, modifiers: Vec<QuoteModifier>) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId::new(),
            product_id: ProductId::new(),
            product_name: "Property".to_string(),
            broker_id: None,
            broker_name: None,
            underwriter_id: None,
            underwriter_name: None,
            insured_name: "Insured".to_string(),
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
            covers,
            modifiers,
        }
    }

    fn cover(rule: Option<PremiumRule>, basis: Option<Decimal>, is_selected: bool) -> QuoteCover {
        QuoteCover {
            id: QuoteCoverId::new(),
            quote_id: QuoteId::new(),
            cover_id: CoverId::new(),
            cover_name: "Cover".to_string(),
            is_selected,
            selected_limit: None,
            selected_deductible: None,
            basis_value: basis,
            calculated_premium: None,
            premium_rule: rule,
        }
    }

    fn modifier(modifier_type: ModifierType, value_type: ValueType, applied_value: Decimal) -> QuoteModifier {
        QuoteModifier {
            id: QuoteModifierId::new(),
            quote_id: QuoteId::new(),
            modifier_id: ModifierId::new(),
            modifier_name: "Modifier".to_string(),
            modifier_type,
            value_type,
            applied_value,
            premium_impact: None,
        }
    }

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn rate() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000i64).prop_map(|v| Decimal::new(v, 6))
    }

    fn percentage() -> impl Strategy<Value = Decimal> {
        (-10_000i64..10_000i64).prop_map(|v| Decimal::new(v, 2))
    }

    fn premium_type() -> impl Strategy<Value = PremiumType> {
        prop_oneof![
            Just(PremiumType::Flat),
            Just(PremiumType::RateBased),
            Just(PremiumType::PerUnit)
        ]
    }

    fn rule() -> impl Strategy<Value = PremiumRule> {
        (premium_type(), rate(), money(), proptest::option::of(money())).prop_map(
            |(premium_type, base_rate, flat_amount, min_premium)| PremiumRule {
                id: PremiumRuleId::new(),
                premium_type,
                base_rate: Some(base_rate),
                flat_amount: Some(flat_amount),
                min_premium,
                is_active: true,
                created_at: Utc::now(),
            },
        )
    }

    fn quote_cover() -> impl Strategy<Value = QuoteCover> {
        (proptest::option::of(rule()), proptest::option::of(money()), any::<bool>())
            .prop_map(|(rule, basis, selected)| cover(rule, basis, selected))
    }

    fn quote_modifier() -> impl Strategy<Value = QuoteModifier> {
        (
            prop_oneof![
                Just(ModifierType::Loading),
                Just(ModifierType::Discount),
                Just(ModifierType::Adjustment)
            ],
            prop_oneof![Just(ValueType::Percentage), Just(ValueType::Fixed)],
            percentage(),
        )
            .prop_map(|(modifier_type, value_type, applied)| modifier(modifier_type, value_type, applied))
    }

    proptest! {
        #[test]
        fn base_is_sum_of_selected_covers(
            covers in proptest::collection::vec(quote_cover(), 0..8)
        ) {
            let quote = quote_with(covers, vec![]);
            let breakdown = compute_breakdown(&quote).unwrap();

            let selected = quote.covers.iter().filter(|c| c.is_selected).count();
            prop_assert_eq!(breakdown.covers.len(), selected);
            prop_assert_eq!(
                breakdown.base_premium,
                breakdown.covers.iter().map(|c| c.premium).sum::<Decimal>()
            );
            prop_assert_eq!(breakdown.total_premium, breakdown.base_premium);
        }

        #[test]
        fn unselected_covers_never_contribute(
            covers in proptest::collection::vec(quote_cover(), 0..8)
        ) {
            let quote = quote_with(covers.clone(), vec![]);
            let only_selected = quote_with(
                covers.into_iter().filter(|c| c.is_selected).collect(),
                vec![],
            );

            prop_assert_eq!(
                compute_breakdown(&quote).unwrap().base_premium,
                compute_breakdown(&only_selected).unwrap().base_premium
            );
        }

        #[test]
        fn cover_premium_respects_floor(r in rule(), basis in proptest::option::of(money())) {
            let premium = r.cover_premium(basis).unwrap();
            let raw = match r.premium_type {
                PremiumType::Flat => r.flat_amount.unwrap_or_default(),
                _ => basis.unwrap_or_default() * r.base_rate.unwrap_or_default(),
            };

            match r.min_premium {
                Some(floor) if raw < floor => prop_assert_eq!(premium, floor),
                _ => prop_assert_eq!(premium, raw),
            }
        }

        #[test]
        fn flat_premium_ignores_basis(amount in money(), basis in money()) {
            let mut r = flat_rule(amount);
            r.base_rate = Some(dec!(0.5));
            let quote = quote_with(vec![cover(Some(r), Some(basis), true)], vec![]);
            prop_assert_eq!(compute_breakdown(&quote).unwrap().base_premium, amount);
        }

        #[test]
        fn total_is_base_plus_impacts(
            covers in proptest::collection::vec(quote_cover(), 0..6),
            modifiers in proptest::collection::vec(quote_modifier(), 0..6)
        ) {
            let quote = quote_with(covers, modifiers);
            let breakdown = compute_breakdown(&quote).unwrap();

            let impacts: Decimal = breakdown.modifiers.iter().map(|m| m.impact).sum();
            prop_assert_eq!(breakdown.total_premium, breakdown.base_premium + impacts);
        }

        #[test]
        fn discounts_are_never_positive(
            base in money(),
            applied in percentage(),
            fixed in any::<bool>()
        ) {
            let value_type = if fixed { ValueType::Fixed } else { ValueType::Percentage };
            let m = modifier(ModifierType::Discount, value_type, applied);
            let impact = m.impact(base).unwrap();

            prop_assert!(impact <= Decimal::ZERO);
            let expected = if fixed { applied.abs() } else { (base * applied / dec!(100)).abs() };
            prop_assert_eq!(impact, -expected);
        }

        #[test]
        fn percentage_loading_is_proportional(base in money(), applied in percentage()) {
            let m = modifier(ModifierType::Loading, ValueType::Percentage, applied);
            prop_assert_eq!(m.impact(base).unwrap(), base * applied / dec!(100));
        }

        #[test]
        fn breakdown_is_deterministic(
            covers in proptest::collection::vec(quote_cover(), 0..6),
            modifiers in proptest::collection::vec(quote_modifier(), 0..6)
        ) {
            let mut quote = quote_with(covers, modifiers);
            let first = compute_breakdown(&quote).unwrap();
            quote.apply_breakdown(&first, Utc::now());
            let second = compute_breakdown(&quote).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
