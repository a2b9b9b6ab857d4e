//! Store (Upgates) order as returned by the orders listing.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// A single product line of a store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "price_without_vat", default)]
    pub unit_price_excl_vat: Decimal,
    #[serde(default)]
    pub quantity: Option<Decimal>,
}

impl LineItem {
    /// Quantity used for pricing. A missing or zero quantity counts as one piece.
    pub fn effective_quantity(&self) -> Decimal {
        match self.quantity {
            Some(q) if !q.is_zero() => q,
            _ => Decimal::one(),
        }
    }
}

/// A loyalty-point or voucher discount entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// VAT rate in percent.
    pub vat: Decimal,
    /// Tax-inclusive discount value.
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountGroup {
    #[serde(default)]
    pub discounts: Vec<Discount>,
}

/// The merchant's own record of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOrder {
    pub order_number: String,
    #[serde(rename = "currency_id")]
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub admin_url: String,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default)]
    pub loyalty_points: Option<DiscountGroup>,
    #[serde(default)]
    pub discount_voucher: Option<DiscountGroup>,
}

impl StoreOrder {
    pub fn loyalty_discounts(&self) -> &[Discount] {
        self.loyalty_points
            .as_ref()
            .map(|g| g.discounts.as_slice())
            .unwrap_or(&[])
    }

    pub fn voucher_discounts(&self) -> &[Discount] {
        self.discount_voucher
            .as_ref()
            .map(|g| g.discounts.as_slice())
            .unwrap_or(&[])
    }
}
