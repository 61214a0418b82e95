//! Conversions between whole-coin amounts and the smallest unit.

/// Smallest units per whole coin.
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Convert a whole-coin amount to MIST, truncating sub-MIST fractions.
///
/// Negative and non-finite inputs map to zero.
pub fn sui_to_mist(sui: f64) -> u64 {
    if !sui.is_finite() || sui <= 0.0 {
        return 0;
    }
    (sui * MIST_PER_SUI as f64).floor() as u64
}

/// Convert MIST to a whole-coin amount for display.
pub fn mist_to_sui(mist: u64) -> f64 {
    mist as f64 / MIST_PER_SUI as f64
}

/// Signed variant for balance deltas.
pub fn signed_mist_to_sui(mist: i128) -> f64 {
    mist as f64 / MIST_PER_SUI as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(sui_to_mist(0.07), 70_000_000);
        assert_eq!(sui_to_mist(1.0), MIST_PER_SUI);
        assert_eq!(sui_to_mist(-3.0), 0);
        assert_eq!(sui_to_mist(f64::NAN), 0);
        assert_eq!(mist_to_sui(50_000_000), 0.05);
        assert_eq!(signed_mist_to_sui(-500_000_000), -0.5);
    }
}
