use std::collections::HashMap;
use train_booking_system::models::fare::{Discount, DiscountKind, Quota};
use train_booking_system::services::fare_service::FareService;
use train_booking_system::utils::error::AppError;

fn table(entries: &[(&str, i64)]) -> HashMap<String, i64> {
    entries
        .iter()
        .map(|(class, fare)| (class.to_string(), *fare))
        .collect()
}

fn percent(value: i64, restricted_to: Option<Quota>) -> Discount {
    Discount {
        code: "TEST".to_string(),
        kind: DiscountKind::Percent,
        value,
        restricted_to,
    }
}

#[test]
fn percent_discount_then_service_charge() {
    // base 500 x 2 = 1000, -20% = 800, +5% service charge = 840
    let fares = table(&[("3A", 500)]);
    let quote =
        FareService::quote(&fares, "3A", 2, Some(&percent(20, None)), Quota::General).unwrap();

    assert!(quote.discount_applied);
    assert_eq!(quote.discount_amount, 200);
    assert_eq!(quote.service_charge, 40);
    assert_eq!(quote.final_amount, 840);
    assert!(!quote.class_fallback);
}

#[test]
fn quote_is_deterministic() {
    let fares = table(&[("3A", 500)]);
    let discount = percent(20, None);

    let first =
        FareService::quote(&fares, "3A", 2, Some(&discount), Quota::General).unwrap();
    let second =
        FareService::quote(&fares, "3A", 2, Some(&discount), Quota::General).unwrap();

    assert_eq!(first.final_amount, second.final_amount);
    assert_eq!(first.discount_amount, second.discount_amount);
    assert_eq!(first.service_charge, second.service_charge);
}

#[test]
fn quota_restricted_discount_is_not_applied_for_wrong_quota() {
    let fares = table(&[("3A", 500)]);
    let senior_only = percent(15, Some(Quota::Senior));

    let quote =
        FareService::quote(&fares, "3A", 2, Some(&senior_only), Quota::General).unwrap();

    assert!(!quote.discount_applied);
    assert_eq!(quote.discount_amount, 0);
    // undiscounted 1000 + 5% = 1050
    assert_eq!(quote.final_amount, 1050);
}

#[test]
fn quota_restricted_discount_applies_for_matching_quota() {
    let fares = table(&[("3A", 500)]);
    let senior_only = percent(15, Some(Quota::Senior));

    let quote =
        FareService::quote(&fares, "3A", 2, Some(&senior_only), Quota::Senior).unwrap();

    assert!(quote.discount_applied);
    assert_eq!(quote.discount_amount, 150);
}

#[test]
fn flat_discount_floors_at_zero() {
    let fares = table(&[("SL", 30)]);
    let big_flat = Discount {
        code: "FLAT".to_string(),
        kind: DiscountKind::Flat,
        value: 5000,
        restricted_to: None,
    };

    let quote = FareService::quote(&fares, "SL", 1, Some(&big_flat), Quota::General).unwrap();

    assert_eq!(quote.discount_amount, 30);
    assert_eq!(quote.final_amount, 0);
}

#[test]
fn missing_class_falls_back_to_default_with_flag() {
    let fares = table(&[("SL", 400)]);

    let quote = FareService::quote(&fares, "1A", 2, None, Quota::General).unwrap();

    assert!(quote.class_fallback);
    assert_eq!(quote.base_fare_per_passenger, 400);
    // 800 + 5% = 840
    assert_eq!(quote.final_amount, 840);
}

#[test]
fn missing_class_and_missing_default_is_an_error() {
    let fares = table(&[("2A", 900)]);

    let result = FareService::quote(&fares, "1A", 1, None, Quota::General);

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[test]
fn unknown_discount_code_resolves_to_nothing() {
    assert!(FareService::resolve_discount("NO_SUCH_CODE").is_none());
    assert!(FareService::resolve_discount("SENIOR15").is_some());
}

#[test]
fn absurd_base_fare_is_rejected_not_wrapped() {
    let fares = table(&[("3A", i64::MAX)]);
    let result = FareService::quote(&fares, "3A", 2, None, Quota::General);
    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[test]
fn fare_overflowing_on_the_service_charge_is_rejected() {
    // Survives base x count but the 5% charge cannot be computed.
    let fares = table(&[("3A", i64::MAX - 1)]);
    let result = FareService::quote(&fares, "3A", 1, None, Quota::General);
    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[test]
fn zero_passengers_is_rejected() {
    let fares = table(&[("SL", 400)]);
    let result = FareService::quote(&fares, "SL", 0, None, Quota::General);
    assert!(matches!(result, Err(AppError::ValidationError(_))));
}
