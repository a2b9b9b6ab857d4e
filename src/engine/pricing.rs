//! Comparable price computation for both sides of a match.

use crate::domain::{AffiliateTransaction, Decimal, Discount, StoreOrder};

/// Tax-excluded value of a discount: `price / (1 + vat / 100)`.
pub fn discount_excl_vat(discount: &Discount) -> Decimal {
    discount.price / (Decimal::one() + discount.vat / Decimal::hundred())
}

/// Store-side price excluding VAT, net of loyalty-point and voucher discounts.
///
/// Not clamped: discounts larger than the product sum yield a negative price.
pub fn store_price(order: &StoreOrder) -> Decimal {
    let products: Decimal = order
        .products
        .iter()
        .map(|item| item.unit_price_excl_vat * item.effective_quantity())
        .sum();
    let loyalty: Decimal = order.loyalty_discounts().iter().map(discount_excl_vat).sum();
    let vouchers: Decimal = order.voucher_discounts().iter().map(discount_excl_vat).sum();

    products - loyalty - vouchers
}

/// Affiliate amount in the store's currency when possible.
///
/// Uses the original-currency amount when it is denominated in `store_currency`,
/// otherwise the network default-currency amount.
pub fn comparable_affiliate_amount(
    tx: &AffiliateTransaction,
    store_currency: Option<&str>,
) -> Decimal {
    match store_currency {
        Some(currency) if currency == tx.original_currency => tx.original_order_amount,
        _ => tx.order_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiscountGroup, LineItem, TransactionStatus};
    use chrono::Utc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(price: &str, qty: &str) -> LineItem {
        LineItem {
            unit_price_excl_vat: d(price),
            quantity: Some(d(qty)),
        }
    }

    fn discount(vat: &str, price: &str) -> Discount {
        Discount {
            vat: d(vat),
            price: d(price),
        }
    }

    fn order(products: Vec<LineItem>, loyalty: Vec<Discount>, vouchers: Vec<Discount>) -> StoreOrder {
        StoreOrder {
            order_number: "1".to_string(),
            currency: "CZK".to_string(),
            status: None,
            admin_url: String::new(),
            products,
            loyalty_points: Some(DiscountGroup { discounts: loyalty }),
            discount_voucher: Some(DiscountGroup { discounts: vouchers }),
        }
    }

    fn tx(order_amount: &str, original_amount: &str, original_currency: &str) -> AffiliateTransaction {
        AffiliateTransaction {
            id: "t".to_string(),
            order_id: "1".to_string(),
            date_time: Utc::now(),
            order_amount: d(order_amount),
            original_order_amount: d(original_amount),
            original_currency: original_currency.to_string(),
            commission: Decimal::zero(),
            status: TransactionStatus::Pending,
            can_change_status: true,
        }
    }

    #[test]
    fn test_store_price_without_discounts_is_product_sum() {
        let o = order(vec![item("100", "2"), item("49.90", "3")], vec![], vec![]);
        assert_eq!(store_price(&o), d("349.70"));
    }

    #[test]
    fn test_discount_excl_vat() {
        assert_eq!(discount_excl_vat(&discount("21", "121")), d("100"));
        assert_eq!(discount_excl_vat(&discount("0", "50")), d("50"));
    }

    #[test]
    fn test_loyalty_discount_example() {
        let o = order(vec![item("100", "2")], vec![discount("21", "21")], vec![]);
        let price = store_price(&o);
        assert_eq!(price.round_cents(), d("182.64"));
    }

    #[test]
    fn test_each_discount_subtracted_once() {
        let o = order(
            vec![item("500", "1")],
            vec![discount("21", "121"), discount("21", "121")],
            vec![discount("10", "110")],
        );
        assert_eq!(store_price(&o), d("200"));
    }

    #[test]
    fn test_negative_price_is_not_clamped() {
        let o = order(vec![item("10", "1")], vec![], vec![discount("0", "25")]);
        assert_eq!(store_price(&o), d("-15"));
    }

    #[test]
    fn test_missing_discount_groups() {
        let mut o = order(vec![item("10", "1")], vec![], vec![]);
        o.loyalty_points = None;
        o.discount_voucher = None;
        assert_eq!(store_price(&o), d("10"));
    }

    #[test]
    fn test_comparable_amount_same_currency_uses_original() {
        let t = tx("3700", "150", "EUR");
        assert_eq!(comparable_affiliate_amount(&t, Some("EUR")), d("150"));
    }

    #[test]
    fn test_comparable_amount_other_currency_uses_default() {
        let t = tx("3700", "150", "EUR");
        assert_eq!(comparable_affiliate_amount(&t, Some("CZK")), d("3700"));
        assert_eq!(comparable_affiliate_amount(&t, None), d("3700"));
    }
}
