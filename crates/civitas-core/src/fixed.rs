use fixed::types::{I16F16, I32F32};

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. All resource
/// amounts and multipliers in the simulation use this type.
pub type Fixed64 = I32F32;

/// Q16.16 fixed-point for compact storage.
pub type Fixed32 = I16F16;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/FFI, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Ceiling of a non-negative Fixed64 as u32, with a floor of `min`.
#[inline]
pub fn ceil_u32(v: Fixed64, min: u32) -> u32 {
    let whole: i64 = v.to_num();
    let ceiled = if v.frac() > Fixed64::ZERO {
        whole + 1
    } else {
        whole
    };
    (ceiled.max(min as i64)) as u32
}
