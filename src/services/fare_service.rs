use crate::models::booking::BookingDraft;
use crate::models::fare::{Discount, DiscountKind, FareQuote, Quota};
use crate::utils::error::{AppError, AppResult};
use log::warn;
use std::collections::HashMap;

/// Service charge applied to the discounted base amount.
pub const SERVICE_CHARGE_PERCENT: i64 = 5;

/// Class priced when the selected class is missing from the table.
pub const DEFAULT_CLASS: &str = "SL";

/// Pure fare computation. No I/O, deterministic for identical inputs;
/// the reconciler depends on that to cross-check the client-declared
/// amount.
pub struct FareService;

impl FareService {
    /// Resolve a discount code to its rule. Unknown codes resolve to
    /// nothing and the undiscounted price stands.
    pub fn resolve_discount(code: &str) -> Option<Discount> {
        match code {
            "RAIL20" => Some(Discount {
                code: code.to_string(),
                kind: DiscountKind::Percent,
                value: 20,
                restricted_to: None,
            }),
            "SENIOR15" => Some(Discount {
                code: code.to_string(),
                kind: DiscountKind::Percent,
                value: 15,
                restricted_to: Some(Quota::Senior),
            }),
            "FLAT50" => Some(Discount {
                code: code.to_string(),
                kind: DiscountKind::Flat,
                value: 5000,
                restricted_to: None,
            }),
            _ => None,
        }
    }

    /// Compute the payable amount, in minor units.
    ///
    /// Order of operations is fixed: discount on `base x count`,
    /// floored at zero, then the service charge on the discounted
    /// amount, each rounded to the nearest minor unit.
    pub fn quote(
        class_fares: &HashMap<String, i64>,
        selected_class: &str,
        passenger_count: u32,
        discount: Option<&Discount>,
        quota: Quota,
    ) -> AppResult<FareQuote> {
        if passenger_count == 0 {
            return Err(AppError::ValidationError(
                "passenger count must be at least 1".into(),
            ));
        }

        let (base_fare, class_fallback) = match class_fares.get(selected_class) {
            Some(fare) => (*fare, false),
            None => {
                let fallback = class_fares.get(DEFAULT_CLASS).ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "no fare for class {} and no {} fallback",
                        selected_class, DEFAULT_CLASS
                    ))
                })?;
                warn!(
                    "no fare for class {}, falling back to {}",
                    selected_class, DEFAULT_CLASS
                );
                (*fallback, true)
            }
        };

        if base_fare < 0 {
            return Err(AppError::ValidationError("negative base fare".into()));
        }

        // Fares come straight off the request body; an absurd value
        // must reject, not wrap.
        let overflow = || AppError::ValidationError("fare amount out of range".into());
        let gross = base_fare
            .checked_mul(passenger_count as i64)
            .ok_or_else(overflow)?;

        // A quota-restricted code with the wrong quota is silently not
        // applied; the flag lets callers tell "rejected" from "not
        // supplied".
        let effective = discount.filter(|d| match d.restricted_to {
            Some(required) => required == quota,
            None => true,
        });

        let discount_amount = match effective {
            Some(d) => match d.kind {
                DiscountKind::Percent => round_percent(gross, d.value).ok_or_else(overflow)?,
                DiscountKind::Flat => d.value.min(gross),
            },
            None => 0,
        };

        let discounted = (gross - discount_amount).max(0);
        let service_charge =
            round_percent(discounted, SERVICE_CHARGE_PERCENT).ok_or_else(overflow)?;
        let final_amount = discounted.checked_add(service_charge).ok_or_else(overflow)?;

        Ok(FareQuote {
            base_fare_per_passenger: base_fare,
            passenger_count,
            discount_applied: effective.is_some(),
            discount_amount,
            service_charge,
            final_amount,
            class_fallback,
        })
    }

    /// Quote for a client-declared booking context.
    pub fn quote_for_draft(draft: &BookingDraft) -> AppResult<FareQuote> {
        let discount = draft
            .discount_code
            .as_deref()
            .and_then(Self::resolve_discount);
        Self::quote(
            &draft.class_fares,
            &draft.train.selected_class,
            draft.passengers.len() as u32,
            discount.as_ref(),
            draft.quota,
        )
    }
}

/// Nearest-integer percentage of `amount`, or `None` when the
/// intermediate product overflows. Both arguments are non-negative
/// everywhere this is called.
fn round_percent(amount: i64, percent: i64) -> Option<i64> {
    amount
        .checked_mul(percent)?
        .checked_add(50)
        .map(|v| v / 100)
}
