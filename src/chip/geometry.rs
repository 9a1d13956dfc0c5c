//! Vector primitives shared by every stage of the pipeline.

use crate::error::{Error, Result};

/// Squared Euclidean distance between two coordinate vectors.
///
/// Returns `f32::INFINITY` when the lengths differ. Callers that need to report the
/// mismatch should go through [`check_dims`] first.
#[inline]
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Squared distance accumulated in `f64`, used by the gating weights.
#[inline]
pub(crate) fn squared_distance_f64(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Elementwise average of two vectors.
#[inline]
pub(crate) fn midpoint(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(x, y)| (x + y) / 2.0).collect()
}

pub(crate) fn check_dims(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::DimensionMismatch { expected, found });
    }
    Ok(())
}

/// `(v > 0) - (v < 0)`.
#[inline]
pub(crate) fn sign(v: f64) -> i8 {
    i8::from(v > 0.0) - i8::from(v < 0.0)
}
