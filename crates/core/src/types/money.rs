//! Decimal money helpers.
//!
//! All amounts are Indian rupees held as [`Decimal`] in the rupee unit (not
//! paise). Every stored or displayed amount goes through [`round_money`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for monetary values.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp a percentage to `0..=100`.
#[must_use]
pub fn clamp_percent(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// `percent`% of `amount`, with the percentage clamped and the result rounded.
#[must_use]
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * clamp_percent(percent) / Decimal::ONE_HUNDRED)
}

/// Split `total` across `weights` proportionally.
///
/// Every share but the last weighted one is rounded; that one absorbs the
/// rounding remainder so the shares always sum to exactly `total`. Zero
/// weights always get a zero share, and a zero weight sum yields all-zero
/// shares.
#[must_use]
pub fn allocate_proportionally(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    let weight_sum: Decimal = weights.iter().copied().sum();
    let Some(absorber) = weights.iter().rposition(|w| !w.is_zero()) else {
        return vec![Decimal::ZERO; weights.len()];
    };
    if weight_sum.is_zero() {
        return vec![Decimal::ZERO; weights.len()];
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut allocated = Decimal::ZERO;
    for (i, weight) in weights.iter().enumerate() {
        let share = if i == absorber {
            total - allocated
        } else {
            round_money(total * *weight / weight_sum)
        };
        allocated += share;
        shares.push(share);
    }
    shares
}

/// Format an amount as rupees with Indian digit grouping, e.g. `₹12,34,567.50`.
#[must_use]
pub fn format_inr(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("{sign}₹{}.{fraction}", group_indian(whole))
}

/// Group digits as thousands, then pairs (lakh, crore): `1234567` -> `12,34,567`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_owned();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn test_percent_of_clamps() {
        assert_eq!(percent_of(dec!(200), dec!(12.5)), dec!(25.00));
        assert_eq!(percent_of(dec!(200), dec!(150)), dec!(200.00));
        assert_eq!(percent_of(dec!(200), dec!(-5)), dec!(0.00));
    }

    #[test]
    fn test_allocate_sums_to_total() {
        let shares = allocate_proportionally(dec!(10), &[dec!(1), dec!(1), dec!(1)]);
        assert_eq!(shares, vec![dec!(3.33), dec!(3.33), dec!(3.34)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(10));
    }

    #[test]
    fn test_allocate_skips_trailing_zero_weight() {
        let shares = allocate_proportionally(dec!(10), &[dec!(1), dec!(2), Decimal::ZERO]);
        assert_eq!(shares, vec![dec!(3.33), dec!(6.67), Decimal::ZERO]);
    }

    #[test]
    fn test_allocate_zero_weights() {
        let shares = allocate_proportionally(dec!(5), &[Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(shares, vec![Decimal::ZERO, Decimal::ZERO]);
        assert!(allocate_proportionally(dec!(5), &[]).is_empty());
    }

    #[test]
    fn test_format_inr_grouping() {
        assert_eq!(format_inr(dec!(0)), "₹0.00");
        assert_eq!(format_inr(dec!(999.5)), "₹999.50");
        assert_eq!(format_inr(dec!(1234)), "₹1,234.00");
        assert_eq!(format_inr(dec!(123456.789)), "₹1,23,456.79");
        assert_eq!(format_inr(dec!(12345678)), "₹1,23,45,678.00");
        assert_eq!(format_inr(dec!(-1500)), "-₹1,500.00");
    }
}
