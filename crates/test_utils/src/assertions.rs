//! Custom Test Assertions
//!
//! Assertion helpers for quotes and premium breakdowns that give more
//! meaningful failure messages than a bare `assert_eq!`.

use rust_decimal::Decimal;

use domain_quote::{Quote, QuoteSnapshot};

/// Asserts that an optional premium is present and equal to `expected`
///
/// Decimal equality ignores scale, so `700.000` equals `700`.
pub fn assert_premium_eq(actual: Option<Decimal>, expected: Decimal) {
    match actual {
        Some(value) => assert_eq!(
            value, expected,
            "Premium mismatch: actual={}, expected={}",
            value, expected
        ),
        None => panic!("Expected premium {}, got none", expected),
    }
}

/// Asserts that the stored totals agree with the stored lines
///
/// The base premium must equal the sum of selected cover premiums and the
/// total must equal the base plus every modifier impact.
pub fn assert_breakdown_consistent(snapshot: &QuoteSnapshot) {
    let base = snapshot
        .base_premium
        .unwrap_or_else(|| panic!("Quote {} has no base premium", snapshot.id));
    let total = snapshot
        .total_premium
        .unwrap_or_else(|| panic!("Quote {} has no total premium", snapshot.id));

    let covers = snapshot
        .selected_cover_total()
        .unwrap_or_else(|| panic!("Quote {} cover premiums overflow", snapshot.id));
    let impacts = snapshot
        .modifier_total()
        .unwrap_or_else(|| panic!("Quote {} modifier impacts overflow", snapshot.id));

    assert_eq!(
        base, covers,
        "Base premium {} does not match selected covers {}",
        base, covers
    );
    assert_eq!(
        Some(total),
        base.checked_add(impacts),
        "Total premium {} does not match base {} plus impacts {}",
        total,
        base,
        impacts
    );
}

/// Asserts that calculation left unselected covers as they were in `before`
pub fn assert_unselected_untouched(before: &Quote, after: &Quote) {
    for cover in before.covers.iter().filter(|c| !c.is_selected) {
        let updated = after
            .covers
            .iter()
            .find(|c| c.id == cover.id)
            .unwrap_or_else(|| panic!("Cover {} disappeared", cover.id));
        assert_eq!(
            updated.calculated_premium, cover.calculated_premium,
            "Unselected cover {} was repriced",
            cover.id
        );
    }
}
