//! Normalisation curves shared by the evaluators.
//!
//! All curves return values in `0.0..=1.0` for finite input. Callers are
//! expected to validate the curve parameters up front (see
//! [`NormalizationBounds::validate`](crate::NormalizationBounds::validate)).

#![expect(
    clippy::float_arithmetic,
    reason = "normalisation curves are piecewise-linear float maps"
)]

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `1` at zero, falling linearly to `0` at `zero_at` and beyond.
#[must_use]
pub fn linear_decay(value: f64, zero_at: f64) -> f64 {
    unit(1.0 - value / zero_at)
}

/// `1` up to `plateau_end`, then linear to `0` at `zero_at`.
#[must_use]
pub fn plateau_then_decay(value: f64, plateau_end: f64, zero_at: f64) -> f64 {
    if value <= plateau_end {
        return 1.0;
    }
    unit(1.0 - (value - plateau_end) / (zero_at - plateau_end))
}

/// Triangle peaking at `peak` with zero at `lower` and `upper`.
#[must_use]
pub fn triangular(value: f64, lower: f64, peak: f64, upper: f64) -> f64 {
    if value <= lower || value >= upper {
        return 0.0;
    }
    if value <= peak {
        unit((value - lower) / (peak - lower))
    } else {
        unit((upper - value) / (upper - peak))
    }
}

/// `0` at or below `floor`, rising linearly to `1` at `saturation`, flat
/// beyond.
#[must_use]
pub fn saturating(value: f64, floor: f64, saturation: f64) -> f64 {
    unit((value - floor) / (saturation - floor))
}
