//! Rounding and printing of the final price.

/// Round to two decimal places.
///
/// Goes through the exact decimal expansion of the binary value, so ties are
/// broken half-to-even on the value actually stored (`2.675` becomes `2.67`).
pub fn round_price(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Shortest representation of an already rounded price, always with a fractional digit.
pub fn format_price(rounded: f64) -> String {
    if rounded.is_finite() && rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}
