//! Small numeric helpers shared across the workspace.
//!
//! Servo math and affect dynamics are all f32; a NaN anywhere would poison
//! every downstream computation, so values crossing a boundary (deserialized
//! state, sensor input) go through `sanitize_f32` first.

use serde::{Deserialize, Deserializer};

/// Replace non-finite values with a fallback, warning once per occurrence.
pub fn sanitize_f32(value: f32, fallback: f32, what: &str) -> f32 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!("non-finite {} ({}), using {}", what, value, fallback);
        fallback
    }
}

/// Serde deserializer that maps NaN/inf to 0.0 instead of propagating them.
pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    Ok(if value.is_finite() { value } else { 0.0 })
}

/// Round to two decimals for wire telemetry.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Ease-in-out interpolation parameter, t in [0,1].
pub fn smooth_ease(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}
