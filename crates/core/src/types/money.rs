//! Money helpers shared by the pricing pipeline and coupon math.
//!
//! All monetary values are `rust_decimal::Decimal` in the currency's
//! standard unit (rupees, not paise). Rounding is half-up (away from zero),
//! matching how payable amounts are presented to the payment gateway.

use rust_decimal::{Decimal, RoundingStrategy};

/// The unit price a line is actually charged at.
///
/// A product on sale is charged at its sale price; otherwise at its list
/// price. A sale price of zero means "no sale" and falls back to the list
/// price rather than making the product free.
#[must_use]
pub fn effective_price(price: Decimal, sale_price: Option<Decimal>) -> Decimal {
    match sale_price {
        Some(sale) if sale > Decimal::ZERO => sale,
        _ => price,
    }
}

/// Round to the nearest integer currency unit, half away from zero.
#[must_use]
pub fn round_to_unit(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    #[test]
    fn sale_price_wins_when_present() {
        assert_eq!(effective_price(d("1000"), Some(d("800"))), d("800"));
    }

    #[test]
    fn falls_back_to_list_price() {
        assert_eq!(effective_price(d("1000"), None), d("1000"));
    }

    #[test]
    fn zero_sale_price_is_not_a_sale() {
        assert_eq!(effective_price(d("1000"), Some(Decimal::ZERO)), d("1000"));
    }

    #[test]
    fn rounds_half_up_to_unit() {
        assert_eq!(round_to_unit(d("1499.5")), d("1500"));
        assert_eq!(round_to_unit(d("1499.4")), d("1499"));
        assert_eq!(round_to_unit(d("1500")), d("1500"));
    }

    #[test]
    fn rounds_half_up_to_cents() {
        assert_eq!(round_to_cents(d("10.005")), d("10.01"));
        assert_eq!(round_to_cents(d("10.004")), d("10.00"));
    }
}
