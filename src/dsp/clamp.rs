//! # Parameter Clamping
//!
//! Hosts are allowed to write anything into a control port, including
//! values outside the advertised range. These functions pull every control
//! value back into the range the delay engine can handle.

/// The longest delay the engine supports, in seconds.
///
/// Buffers are sized from this at instantiation, so raising it costs
/// memory for every instance.
pub const MAX_DELAY_SECONDS: f32 = 5.0;

/// Clamp a dry/wet ratio to `[0, 1]`.
///
/// NaN maps to 0 (fully dry). `f32::max` returns the non-NaN operand,
/// which is what makes this work without an explicit check.
#[inline]
pub fn clamp_unit(x: f32) -> f32 {
    x.max(0.0).min(1.0)
}

/// Clamp a delay time in seconds to `[0, MAX_DELAY_SECONDS]`.
///
/// NaN maps to 0.
#[inline]
pub fn clamp_delay(x: f32) -> f32 {
    x.max(0.0).min(MAX_DELAY_SECONDS)
}
