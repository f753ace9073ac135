//! Currency amounts are compared in minor units (centavos).

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two decimal places, half away from zero.
pub fn to_minor_precision(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Equality at cent precision.
pub fn same_amount(a: Decimal, b: Decimal) -> bool {
    to_minor_precision(a) == to_minor_precision(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_same_amount_ignores_sub_cent_drift() {
        let a = Decimal::from_str("100.00").unwrap();
        let b = Decimal::from_str("99.999").unwrap();
        assert!(same_amount(a, b));
        assert!(!same_amount(a, Decimal::from_str("99.99").unwrap()));
    }
}
