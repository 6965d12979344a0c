// src/common/money.rs

use rust_decimal::{Decimal, RoundingStrategy};

/// Tolerância usada na conciliação de pagamentos (1 centavo).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Arredonda para 2 casas, meio para cima (afastando do zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * rate / 100`, já arredondado.
pub fn percentage_of(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate / Decimal::ONE_HUNDRED)
}

/// Verdadeiro quando |a - b| <= 0,01.
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(dec!(200), dec!(18)), dec!(36.00));
        assert_eq!(percentage_of(dec!(99.99), dec!(5)), dec!(5.00));
        assert_eq!(percentage_of(dec!(10.10), dec!(12)), dec!(1.21));
    }

    #[test]
    fn test_tolerance() {
        assert_eq!(MONEY_TOLERANCE, dec!(0.01));
        assert!(within_tolerance(dec!(236.00), dec!(235.99)));
        assert!(!within_tolerance(dec!(236.00), dec!(235.98)));
    }
}
