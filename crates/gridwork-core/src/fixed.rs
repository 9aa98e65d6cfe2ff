use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Zero in Q32.32.
pub const FIXED_ZERO: Fixed64 = Fixed64::from_bits(0);

/// One in Q32.32.
pub const FIXED_ONE: Fixed64 = Fixed64::from_bits(1_i64 << 32);

/// Convert an f64 to Fixed64. Use only for initialization, never in hot paths.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp `value` into `[lo, hi]`. When `hi < lo` the interval collapses
/// onto `lo`, so the result is never below `lo`.
#[inline]
pub fn clamp_fixed(value: Fixed64, lo: Fixed64, hi: Fixed64) -> Fixed64 {
    let hi = hi.max(lo);
    value.max(lo).min(hi)
}
