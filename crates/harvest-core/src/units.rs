//! Fixed-point token amount conversion.
//!
//! On-chain amounts arrive as raw integers scaled by `10^decimals`. They are
//! converted through [`Decimal`] so the common case (values below 2^96) is
//! exact before the final cast to `f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Decimals used by the reward and LP tokens the engine reads.
pub const WEI_DECIMALS: u32 = 18;

/// Exact decimal value of a raw fixed-point amount, if it fits.
pub fn to_decimal(raw: u128, decimals: u32) -> Option<Decimal> {
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals).ok()
}

/// Converts a raw fixed-point amount into token units.
///
/// Amounts too large for a 96-bit mantissa fall back to `f64` division.
pub fn format_units(raw: u128, decimals: u32) -> f64 {
    to_decimal(raw, decimals)
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| raw as f64 / 10f64.powi(decimals as i32))
}

/// Converts an 18-decimal amount into token units.
pub fn format_ether(raw: u128) -> f64 {
    format_units(raw, WEI_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_decimal_is_exact() {
        assert_eq!(to_decimal(1_234_500_000_000_000_000, 18), Some(dec!(1.2345)));
        assert_eq!(to_decimal(7, 0), Some(dec!(7)));
        assert_eq!(to_decimal(u128::MAX, 18), None);
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(1_000_000_000_000_000_000), 1.0);
        assert_eq!(format_ether(2_500_000_000_000_000_000), 2.5);
        assert_eq!(format_ether(0), 0.0);
    }

    #[test]
    fn test_format_units_small_decimals() {
        assert_eq!(format_units(1_500_000, 6), 1.5);
    }

    #[test]
    fn test_format_units_overflowing_mantissa() {
        // 10^11 tokens at 18 decimals exceeds the decimal mantissa
        let raw: u128 = 100_000_000_000 * 1_000_000_000_000_000_000;
        assert_relative_eq!(format_ether(raw), 1e11, max_relative = 1e-12);
    }
}
