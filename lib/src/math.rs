//! Math utilities.
use std::f64::consts;

/// Below this `|z|` the Stumpff functions are evaluated from their
/// series expansions.
const STUMPFF_SERIES_LIMIT: f64 = 1e-3;

/// Stumpff function `C(z)`.
///
/// For positive `z` this uses `1 - cos x = 2 sin²(x/2)`, which stays
/// accurate as `√z` approaches `2π`.
pub fn stumpff_c(z: f64) -> f64 {
    if z > STUMPFF_SERIES_LIMIT {
        let half = libm::sin(libm::sqrt(z) / 2.0);
        2.0 * half * half / z
    } else if z < -STUMPFF_SERIES_LIMIT {
        (libm::cosh(libm::sqrt(-z)) - 1.0) / -z
    } else {
        1.0 / 2.0 - z / 24.0 + z.powi(2) / 720.0 - z.powi(3) / 40320.0
    }
}

/// Stumpff function `S(z)`.
pub fn stumpff_s(z: f64) -> f64 {
    if z > STUMPFF_SERIES_LIMIT {
        let sz = libm::sqrt(z);
        (sz - libm::sin(sz)) / sz.powi(3)
    } else if z < -STUMPFF_SERIES_LIMIT {
        let sz = libm::sqrt(-z);
        (libm::sinh(sz) - sz) / sz.powi(3)
    } else {
        1.0 / 6.0 - z / 120.0 + z.powi(2) / 5040.0 - z.powi(3) / 362_880.0
    }
}

/// Wrap an angle into `[-π, π]`.
pub fn wrap_pi(angle: f64) -> f64 {
    libm::remainder(angle, 2.0 * consts::PI)
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_two_pi(angle: f64) -> f64 {
    angle.rem_euclid(2.0 * consts::PI)
}

/// `n` evenly spaced samples over `[start, end]`, endpoints included.
pub fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> + Clone {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| if n > 1 && i == n - 1 { end } else { start + step * i as f64 })
}
