use serde::Serialize;
use utoipa::ToSchema;

/// Orders at or above this subtotal ship for free (cents).
pub const FREE_SHIPPING_THRESHOLD: i64 = 5_000;

/// Flat shipping fee below the threshold (cents).
pub const FLAT_SHIPPING_FEE: i64 = 490;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CheckoutTotals {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub total: i64,
}

pub fn shipping_cost(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// `subtotal - discount + shipping`, with the discount clamped to the subtotal.
pub fn compute_totals(subtotal: i64, discount: i64) -> CheckoutTotals {
    let discount = discount.clamp(0, subtotal.max(0));
    let shipping = shipping_cost(subtotal);
    CheckoutTotals {
        subtotal,
        discount,
        shipping,
        total: subtotal - discount + shipping,
    }
}

/// Formats cents as euros, e.g. `4.90 €`.
pub fn format_euros(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02} €", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_shipping_starts_at_threshold() {
        assert_eq!(shipping_cost(4_999), FLAT_SHIPPING_FEE);
        assert_eq!(shipping_cost(5_000), 0);
    }

    #[test]
    fn totals_apply_discount_then_shipping() {
        let totals = compute_totals(3_000, 500);
        assert_eq!(
            totals,
            CheckoutTotals {
                subtotal: 3_000,
                discount: 500,
                shipping: 490,
                total: 2_990,
            }
        );
    }

    #[test]
    fn shipping_threshold_uses_subtotal_before_discount() {
        let totals = compute_totals(6_000, 2_000);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.total, 4_000);
    }

    #[test]
    fn discount_is_clamped_to_subtotal() {
        let totals = compute_totals(1_000, 5_000);
        assert_eq!(totals.discount, 1_000);
        assert_eq!(totals.total, FLAT_SHIPPING_FEE);

        let totals = compute_totals(1_000, -20);
        assert_eq!(totals.discount, 0);
    }

    #[test]
    fn formats_euros() {
        assert_eq!(format_euros(490), "4.90 €");
        assert_eq!(format_euros(5_000), "50.00 €");
        assert_eq!(format_euros(-5), "-0.05 €");
    }
}
