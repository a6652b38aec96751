//! Promotion code rules: validity window, minimum purchase and discount math.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::pricing::format_euros;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percent of the subtotal.
    Percentage,
    /// `value` is an amount in cents.
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(format!("unknown discount type `{other}`")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromotionError {
    #[error("Invalid or expired promotion code")]
    Invalid,
    #[error("This promotion code is not active yet")]
    NotYetActive,
    #[error("This promotion code has expired")]
    Expired,
    #[error("Minimum purchase required: {}", euros(.0))]
    MinimumNotReached(i64),
}

/// The rule fields a promotion is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRule {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_purchase: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AppliedPromotion {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    /// Discount in cents for the evaluated subtotal.
    pub discount_amount: i64,
}

fn euros(cents: &i64) -> String {
    format_euros(*cents)
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl PromotionRule {
    pub fn discount_for(&self, subtotal: i64) -> i64 {
        let ceiling = subtotal.max(0);
        match self.discount_type {
            DiscountType::Percentage => {
                let raw = (i128::from(ceiling) * i128::from(self.discount_value) + 50) / 100;
                raw.clamp(0, i128::from(ceiling)) as i64
            }
            DiscountType::Fixed => self.discount_value.clamp(0, ceiling),
        }
    }

    pub fn evaluate(
        &self,
        subtotal: i64,
        now: DateTime<Utc>,
    ) -> Result<AppliedPromotion, PromotionError> {
        if !self.active {
            return Err(PromotionError::Invalid);
        }
        if self.start_date.is_some_and(|start| start > now) {
            return Err(PromotionError::NotYetActive);
        }
        if self.end_date.is_some_and(|end| end < now) {
            return Err(PromotionError::Expired);
        }
        if let Some(min) = self.min_purchase.filter(|min| *min > 0) {
            if subtotal < min {
                return Err(PromotionError::MinimumNotReached(min));
            }
        }

        Ok(AppliedPromotion {
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            discount_amount: self.discount_for(subtotal),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn rule(discount_type: DiscountType, value: i64) -> PromotionRule {
        PromotionRule {
            code: "BIENVENUE".into(),
            discount_type,
            discount_value: value,
            min_purchase: None,
            start_date: None,
            end_date: None,
            active: true,
        }
    }

    #[test]
    fn percentage_discount_rounds_to_nearest_cent() {
        let promo = rule(DiscountType::Percentage, 15);
        assert_eq!(promo.discount_for(2_990), 449);
        assert_eq!(promo.discount_for(10_000), 1_500);
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let promo = rule(DiscountType::Fixed, 1_000);
        assert_eq!(promo.discount_for(4_000), 1_000);
        assert_eq!(promo.discount_for(600), 600);
    }

    #[test]
    fn percentage_discount_handles_extreme_subtotals() {
        let promo = rule(DiscountType::Percentage, 10);
        let applied = promo.evaluate(i64::MAX, Utc::now()).unwrap();
        assert_eq!(applied.discount_amount, i64::MAX / 10 + 1);

        let oversized = rule(DiscountType::Percentage, i64::MAX);
        assert_eq!(oversized.discount_for(i64::MAX), i64::MAX);
        assert_eq!(rule(DiscountType::Percentage, -20).discount_for(1_000), 0);
    }

    #[test]
    fn inactive_code_is_invalid() {
        let mut promo = rule(DiscountType::Fixed, 500);
        promo.active = false;
        assert_eq!(
            promo.evaluate(1_000, Utc::now()),
            Err(PromotionError::Invalid)
        );
    }

    #[test]
    fn validity_window_is_enforced() {
        let now = Utc::now();
        let mut promo = rule(DiscountType::Percentage, 10);

        promo.start_date = Some(now + Duration::days(1));
        assert_eq!(promo.evaluate(1_000, now), Err(PromotionError::NotYetActive));

        promo.start_date = Some(now - Duration::days(10));
        promo.end_date = Some(now - Duration::days(1));
        assert_eq!(promo.evaluate(1_000, now), Err(PromotionError::Expired));

        promo.end_date = Some(now + Duration::days(1));
        let applied = promo.evaluate(1_000, now).unwrap();
        assert_eq!(applied.discount_amount, 100);
    }

    #[test]
    fn minimum_purchase_is_enforced() {
        let mut promo = rule(DiscountType::Fixed, 500);
        promo.min_purchase = Some(3_000);

        let err = promo.evaluate(2_999, Utc::now()).unwrap_err();
        assert_eq!(err, PromotionError::MinimumNotReached(3_000));
        assert_eq!(err.to_string(), "Minimum purchase required: 30.00 €");

        assert!(promo.evaluate(3_000, Utc::now()).is_ok());
    }

    #[test]
    fn codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_code("  bienvenue10 "), "BIENVENUE10");
    }

    #[test]
    fn discount_type_parses() {
        assert_eq!("fixed".parse::<DiscountType>(), Ok(DiscountType::Fixed));
        assert!("bogus".parse::<DiscountType>().is_err());
    }
}
