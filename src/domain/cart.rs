//! Shopping cart lines keyed by `(product_id, variant_id)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Upper bound on the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be greater than 0")]
    InvalidQuantity,

    #[error("quantity cannot exceed {MAX_LINE_QUANTITY} per item")]
    QuantityTooLarge,
}

/// Rejects quantities outside `1..=MAX_LINE_QUANTITY`.
pub fn check_quantity(quantity: i32) -> Result<i32, CartError> {
    if quantity < 1 {
        Err(CartError::InvalidQuantity)
    } else if quantity > MAX_LINE_QUANTITY {
        Err(CartError::QuantityTooLarge)
    } else {
        Ok(quantity)
    }
}

/// Sum of two line quantities, still within bounds.
pub fn merge_quantity(current: i32, added: i32) -> Result<i32, CartError> {
    check_quantity(added)?;
    current
        .checked_add(added)
        .ok_or(CartError::QuantityTooLarge)
        .and_then(check_quantity)
}

/// A priced cart line. `unit_price` is already the variant price when a
/// variant is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub image_url: Option<String>,
}

impl CartLine {
    pub fn matches(&self, product_id: Uuid, variant_id: Option<Uuid>) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }

    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }

    /// Display name used on receipts and payment pages.
    pub fn display_name(&self) -> String {
        match &self.variant_name {
            Some(variant) => format!("{} - {}", self.product_name, variant),
            None => self.product_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Result<Self, CartError> {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line)?;
        }
        Ok(cart)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds a line, merging into an existing line with the same key.
    pub fn add(&mut self, line: CartLine) -> Result<(), CartError> {
        check_quantity(line.quantity)?;

        match self
            .lines
            .iter_mut()
            .find(|existing| existing.matches(line.product_id, line.variant_id))
        {
            Some(existing) => existing.quantity = merge_quantity(existing.quantity, line.quantity)?,
            None => self.lines.push(line),
        }
        Ok(())
    }

    /// Sets the quantity of a line; zero or less removes it. Returns `false`
    /// when no line has that key.
    pub fn update_quantity(
        &mut self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<bool, CartError> {
        if quantity <= 0 {
            return Ok(self.remove(product_id, variant_id));
        }
        let quantity = check_quantity(quantity)?;

        match self
            .lines
            .iter_mut()
            .find(|line| line.matches(product_id, variant_id))
        {
            Some(line) => {
                line.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&mut self, product_id: Uuid, variant_id: Option<Uuid>) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(product_id, variant_id));
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    pub fn subtotal(&self) -> i64 {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(0, i64::saturating_add)
    }
}
