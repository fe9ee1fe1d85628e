//! Numeric conversion helpers centralizing the float/int casts used by the
//! scaling and ratio code.

use num_traits::cast::cast;

/// Apply `op` and clamp to the i64 range. `i64::MAX` has no exact f64, so
/// values at the upper edge saturate instead of failing the cast.
fn clamp_to_i64(value: f64, op: fn(f64) -> f64) -> i64 {
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = op(value.clamp(min, max));
    cast::<f64, i64>(clamped).unwrap_or(if clamped > 0.0 { i64::MAX } else { i64::MIN })
}

/// Round half away from zero; 0 for NaN.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    clamp_to_i64(value, f64::round)
}

/// Truncate toward zero; 0 for NaN. Matches the `int(x)` truncation the
/// historical migrations relied on.
#[must_use]
pub fn trunc_f64_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    clamp_to_i64(value, f64::trunc)
}

/// Ceil, returning 0 for non-finite values.
#[must_use]
pub fn ceil_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    clamp_to_i64(value, f64::ceil)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a count to f64 for percentages and means.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Percentage of `part` in `whole`, 0.0 when `whole` is zero.
#[must_use]
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    usize_to_f64(part) / usize_to_f64(whole) * 100.0
}
