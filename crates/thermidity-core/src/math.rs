//! Integer helpers shared by the calibration formulas

/// Divides `num` by `den` and rounds to the nearest integer, ties away from zero.
///
/// Plain integer division truncates toward zero, which biases every
/// calibrated value downward. All calibration formulas go through this
/// instead.
///
/// `den` must not be zero.
#[inline]
pub const fn div_round_nearest(num: i32, den: i32) -> i32 {
    if (num < 0) ^ (den < 0) {
        (num - den / 2) / den
    } else {
        (num + den / 2) / den
    }
}

/// [`div_round_nearest`] on 64-bit operands, for products that outgrow `i32`.
#[inline]
pub const fn div_round_nearest_wide(num: i64, den: i64) -> i64 {
    if (num < 0) ^ (den < 0) {
        (num - den / 2) / den
    } else {
        (num + den / 2) / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_round_away_from_zero() {
        assert_eq!(div_round_nearest(5, 2), 3);
        assert_eq!(div_round_nearest(-5, 2), -3);
        assert_eq!(div_round_nearest(5, -2), -3);
        assert_eq!(div_round_nearest(-5, -2), 3);
    }

    #[test]
    fn test_rounds_to_nearest() {
        assert_eq!(div_round_nearest(7, 3), 2);
        assert_eq!(div_round_nearest(8, 3), 3);
        assert_eq!(div_round_nearest(-7, 3), -2);
        assert_eq!(div_round_nearest(-8, 3), -3);
        assert_eq!(div_round_nearest(3349, 100), 33);
        assert_eq!(div_round_nearest(3350, 100), 34);
        assert_eq!(div_round_nearest(0, 7), 0);
    }

    #[test]
    fn test_sign_symmetry() {
        for num in -250..=250 {
            for den in [-13, -10, -4, -3, -2, -1, 1, 2, 3, 4, 10, 13] {
                assert_eq!(
                    div_round_nearest(num, den),
                    div_round_nearest(-num, -den),
                    "num={num} den={den}"
                );

                // The result is never further than half a step from the exact quotient
                let exact = num as f64 / den as f64;
                let rounded = div_round_nearest(num, den) as f64;
                let diff = exact - rounded;
                assert!((-0.5..=0.5).contains(&diff), "num={num} den={den}");
            }
        }
    }

    #[test]
    fn test_wide_matches_narrow() {
        for num in -250..=250 {
            for den in [-13, -4, -1, 1, 3, 10] {
                assert_eq!(
                    div_round_nearest_wide(num, den),
                    i64::from(div_round_nearest(num as i32, den as i32))
                );
            }
        }
        // 2471 %RH * 1_000_000 does not fit an i32
        assert_eq!(div_round_nearest_wide(2_471_000_000, 1_000_600), 2470);
    }
}
