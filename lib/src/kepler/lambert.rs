//! A bracketed universal-variable Lambert's problem solver.
//!
//! This solver follows Algorithm 5.2 of Curtis, "Orbital Mechanics for
//! Engineering Students", restricted to single-revolution elliptical
//! arcs (`0 <= z < 4π²`). Newton steps on the time-of-flight function
//! are safeguarded by a bisection bracket, so every solve terminates
//! within `maxiter` evaluations.

use std::f64::consts;

use nalgebra::Vector3;
use thiserror::Error;
use tracing::trace;

use crate::math::{stumpff_c, stumpff_s};

/// Below this `|sin θ|` the endpoints are treated as collinear. The
/// Lagrange coefficients lose all precision well before `sin θ`
/// reaches rounding level.
const COLLINEAR_SIN: f64 = 1e-5;
/// Below this `|z|` the derivative is evaluated from its `z = 0` limit.
const SMALL_Z: f64 = 1e-6;
/// Largest `z` searched on the single-revolution branch. `F(z)` grows
/// without bound towards `4π²`, so the time of flight here is far
/// beyond any useful transfer.
const Z_MAX: f64 = 4.0 * consts::PI * consts::PI * (1.0 - 1e-6);

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum LambertError {
    #[error("endpoints are collinear with the central body; the transfer plane is undefined")]
    UnsolvableGeometry,
    #[error("no single-revolution elliptical arc has the requested time of flight")]
    NoSolution,
    #[error("universal variable did not converge in {iterations} iterations (residual {residual})")]
    NoConvergence { iterations: u64, residual: f64 },
    #[error("time of flight {0}s must be positive and finite")]
    InvalidTimeOfFlight(f64),
}

/// The angle swept from `r1v` to `r2v` in `[0, 2π)`.
///
/// The short way is taken unless `allow_long_way` is set and the short
/// way would be retrograde (clockwise about `+z`), in which case the
/// prograde long way is returned instead.
pub fn transfer_angle(r1v: Vector3<f64>, r2v: Vector3<f64>, allow_long_way: bool) -> f64 {
    let cross = r1v.cross(&r2v);
    // atan2 keeps full precision near 0 and π, where acos does not.
    let theta = libm::atan2(cross.norm(), r1v.dot(&r2v));
    if allow_long_way && cross[2] < 0.0 {
        2.0 * consts::PI - theta
    } else {
        theta
    }
}

/// Geometry of one Lambert problem, shared by the time-of-flight
/// function and its derivative.
struct Geometry {
    r1: f64,
    r2: f64,
    a: f64,
    sqrt_mu: f64,
    tof: f64,
}

impl Geometry {
    fn y(&self, z: f64) -> f64 {
        self.r1 + self.r2 + self.a * (z * stumpff_s(z) - 1.0) / libm::sqrt(stumpff_c(z))
    }

    /// Time-of-flight residual `F(z)`, scaled by `√μ`.
    fn f(&self, z: f64) -> f64 {
        let y = self.y(z).max(0.0);
        let (c, s) = (stumpff_c(z), stumpff_s(z));
        (y / c).powf(1.5) * s + self.a * libm::sqrt(y) - self.sqrt_mu * self.tof
    }

    fn df(&self, z: f64) -> f64 {
        if z.abs() < SMALL_Z {
            let y0 = self.y(0.0);
            consts::SQRT_2 / 40.0 * y0.powf(1.5)
                + self.a / 8.0 * (libm::sqrt(y0) + self.a * libm::sqrt(1.0 / (2.0 * y0)))
        } else {
            let y = self.y(z);
            let (c, s) = (stumpff_c(z), stumpff_s(z));
            (y / c).powf(1.5) * (1.0 / (2.0 * z) * (c - 3.0 * s / (2.0 * c)) + 3.0 * s * s / (4.0 * c))
                + self.a / 8.0 * (3.0 * s / c * libm::sqrt(y) + self.a * libm::sqrt(c / y))
        }
    }
}

/// Lambert's problem.
///
/// Given position vectors `r1v` and `r2v` in the frame of a central
/// body with gravitational parameter `mu`, find the velocities `(v1,
/// v2)` at each endpoint of the single-revolution elliptical arc that
/// connects them in `tof` seconds.
///
/// # Arguments
///
/// - `allow_long_way`: take the prograde arc even when it sweeps more
///   than π. See [`transfer_angle`].
/// - `tol`: relative tolerance on the time of flight. Recommended
///   value: `1e-10`.
/// - `maxiter`: maximum number of root-finder iterations. Recommended
///   value: `100`.
pub fn solve(
    r1v: Vector3<f64>,
    r2v: Vector3<f64>,
    tof: f64,
    mu: f64,
    allow_long_way: bool,
    tol: f64,
    maxiter: u64,
) -> Result<(Vector3<f64>, Vector3<f64>), LambertError> {
    if !(tof > 0.0 && tof.is_finite()) {
        return Err(LambertError::InvalidTimeOfFlight(tof));
    }
    let r1 = r1v.norm();
    let r2 = r2v.norm();
    if r1 == 0.0 || r2 == 0.0 {
        return Err(LambertError::UnsolvableGeometry);
    }

    let theta = transfer_angle(r1v, r2v, allow_long_way);
    if libm::sin(theta).abs() < COLLINEAR_SIN {
        return Err(LambertError::UnsolvableGeometry);
    }

    let geom = Geometry {
        r1,
        r2,
        // sin θ √(r1 r2 / (1 - cos θ)), in half-angle form
        a: libm::sqrt(2.0 * r1 * r2) * libm::cos(theta / 2.0),
        sqrt_mu: libm::sqrt(mu),
        tof,
    };
    let z = find_z(&geom, tol, maxiter)?;

    let y = geom.y(z);
    let f = 1.0 - y / r1;
    let g = geom.a * libm::sqrt(y / mu);
    let gdot = 1.0 - y / r2;

    let v1 = (r2v - f * r1v) / g;
    let v2 = (gdot * r2v - r1v) / g;
    Ok((v1, v2))
}

/// Safeguarded Newton iteration for the root of `F(z)` on `[0, Z_MAX)`.
fn find_z(geom: &Geometry, tol: f64, maxiter: u64) -> Result<f64, LambertError> {
    let abs_tol = tol * geom.sqrt_mu * geom.tof;

    // F increases with z; a positive F at the parabolic limit means
    // only hyperbolic arcs are fast enough.
    let f_lo = geom.f(0.0);
    if f_lo > 0.0 {
        return Err(LambertError::NoSolution);
    }
    if f_lo.abs() < abs_tol {
        return Ok(0.0);
    }
    let f_hi = geom.f(Z_MAX);
    if !(f_hi > 0.0) {
        return Err(LambertError::NoSolution);
    }

    let (mut lo, mut hi) = (0.0, Z_MAX);
    let mut z = (lo + hi) / 2.0;
    let mut residual = f64::INFINITY;
    for iter in 0..maxiter {
        residual = geom.f(z);
        if residual.abs() < abs_tol {
            trace!(iter, z, residual, "lambert converged");
            return Ok(z);
        }
        if residual < 0.0 {
            lo = z;
        } else {
            hi = z;
        }
        if hi - lo <= f64::EPSILON * hi.max(1.0) {
            // Adjacent floats straddle the root without meeting tolerance.
            trace!(iter, z, residual, "lambert bracket collapsed");
            return Err(LambertError::NoConvergence {
                iterations: iter + 1,
                residual: residual / geom.sqrt_mu,
            });
        }

        let slope = geom.df(z);
        let newton = z - residual / slope;
        z = if slope.is_finite() && slope > 0.0 && newton > lo && newton < hi {
            newton
        } else {
            (lo + hi) / 2.0
        };
    }

    trace!(maxiter, z, residual, "lambert did not converge");
    Err(LambertError::NoConvergence {
        iterations: maxiter,
        residual: residual / geom.sqrt_mu,
    })
}
