//! Keplerian orbits.

use std::f64::consts;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Duration;

use crate::{bodies::BodyId, math, time::UT};

/// Convergence tolerance on the eccentric anomaly (radians).
pub const KEPLER_TOL: f64 = 1e-12;
/// Iteration bound for Kepler's equation.
pub const KEPLER_MAXITER: u64 = 50;

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum KeplerError {
    #[error("Kepler's equation did not converge for M = {ma}, e = {e} within {maxiter} iterations")]
    EccentricAnomaly { ma: f64, e: f64, maxiter: u64 },
    #[error("universal variable did not converge for dt = {delta_t}s within {maxiter} iterations")]
    UniversalVariable { delta_t: f64, maxiter: u64 },
    #[error("eccentricity {0} is not elliptical")]
    NotElliptical(f64),
}

/// An elliptical Keplerian orbit about a parent body.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    /// Semi-major axis (m).
    pub a: f64,
    /// Eccentricity (dimensionless).
    pub e: f64,
    /// Inclination (radians).
    pub i: f64,
    /// Longitude of ascending node (radians).
    pub lan: f64,
    /// Argument of periapsis (radians).
    pub argpe: f64,
    /// Mean anomaly at `epoch` (radians).
    pub ma0: f64,
    /// The epoch at mean anomaly `ma0`.
    #[serde(default)]
    pub epoch: UT,
}

impl Orbit {
    pub fn periapsis_radius(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Mean motion about a parent of gravitational parameter `mu` (rad/s).
    pub fn mean_motion(&self, mu: f64) -> f64 {
        libm::sqrt(mu / self.a.powi(3))
    }

    /// Orbital period about a parent of gravitational parameter `mu` (s).
    pub fn period(&self, mu: f64) -> f64 {
        2.0 * consts::PI / self.mean_motion(mu)
    }

    /// Mean anomaly at time `t`, wrapped into `[-π, π]`.
    pub fn mean_anomaly_at(&self, mu: f64, t: UT) -> f64 {
        let dt = (t - self.epoch).as_seconds_f64();
        math::wrap_pi(self.ma0 + self.mean_motion(mu) * dt)
    }

    /// Position and velocity in the perifocal coordinate system PQW
    /// at eccentric anomaly `ea`.
    fn sv_pqw(&self, mu: f64, ea: f64) -> (Vector3<f64>, Vector3<f64>) {
        let b = libm::sqrt(1.0 - self.e.powi(2));
        let (sin_ea, cos_ea) = (libm::sin(ea), libm::cos(ea));
        let r = self.a * (1.0 - self.e * cos_ea);
        let rv = Vector3::new(self.a * (cos_ea - self.e), self.a * b * sin_ea, 0.0);
        let k = libm::sqrt(mu * self.a) / r;
        let vv = Vector3::new(-k * sin_ea, k * b * cos_ea, 0.0);
        (rv, vv)
    }

    /// State vector at time `t` in the parent's inertial frame `frame`.
    ///
    /// `mu` is the gravitational parameter of the parent. Recommended:
    /// `tol = KEPLER_TOL`, `maxiter = KEPLER_MAXITER`.
    pub fn sv_at(
        &self,
        mu: f64,
        frame: ReferenceFrame,
        t: UT,
        tol: f64,
        maxiter: u64,
    ) -> Result<StateVector, KeplerError> {
        let ma = self.mean_anomaly_at(mu, t);
        let ea = ma_to_ea(ma, self.e, tol, maxiter)?;
        let (rv, vv) = self.sv_pqw(mu, ea);
        let mat = pqw_ijk_matrix(self.i, self.lan, self.argpe);
        Ok(StateVector {
            frame,
            position: mat * rv,
            velocity: mat * vv,
            time: t,
        })
    }
}

/// Classical elements of an arbitrary conic, derived from a state vector.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conic {
    /// Semi-latus rectum (m).
    pub p: f64,
    /// Semi-major axis (m). Negative for hyperbolic orbits, infinite
    /// for parabolic ones.
    pub a: f64,
    pub e: f64,
    pub i: f64,
    pub lan: f64,
    pub argpe: f64,
    /// True anomaly (radians), in `[-π, π)`.
    pub ta: f64,
}

impl Conic {
    pub fn periapsis_radius(&self) -> f64 {
        self.p / (1.0 + self.e)
    }

    /// Elements of the conic through `rv` with velocity `vv` about a
    /// central body of gravitational parameter `mu`.
    ///
    /// Orbits within `tol` of circular or equatorial use the usual
    /// substitutes: argument of latitude, longitude of periapsis or true
    /// longitude. Recommended tolerance: `1e-8`.
    pub fn from_position_velocity(rv: Vector3<f64>, vv: Vector3<f64>, mu: f64, tol: f64) -> Self {
        let r = rv.norm();
        let v = vv.norm();
        let hv = rv.cross(&vv);
        let h = hv.norm();
        let nv = Vector3::new(0.0, 0.0, 1.0).cross(&hv);
        let ev = 1.0 / mu * ((v.powi(2) - mu / r) * rv - rv.dot(&vv) * vv);
        let p = h.powi(2) / mu;
        let e = ev.norm();
        let i = libm::acos((hv[2] / h).clamp(-1.0, 1.0));
        let a = 1.0 / (2.0 / r - v.powi(2) / mu);

        let circular = e < tol;
        let equatorial = i.abs() < tol || (consts::PI - i).abs() < tol;

        let (lan, argpe, ta) = if equatorial && !circular {
            (
                0.0,
                // Longitude of periapsis
                math::wrap_two_pi(libm::atan2(ev[1], ev[0])),
                libm::atan2(hv.dot(&ev.cross(&rv)) / (h * e), rv.dot(&ev) / e),
            )
        } else if !equatorial && circular {
            (
                math::wrap_two_pi(libm::atan2(nv[1], nv[0])),
                0.0,
                // Argument of latitude
                libm::atan2(rv.dot(&hv.cross(&nv)) / h, rv.dot(&nv)),
            )
        } else if equatorial && circular {
            (
                0.0,
                0.0,
                // True longitude
                libm::atan2(rv[1], rv[0]),
            )
        } else {
            let ta = libm::atan2(hv.dot(&ev.cross(&rv)) / (h * e), rv.dot(&ev) / e);
            let lan = math::wrap_two_pi(libm::atan2(nv[1], nv[0]));
            let px = rv.dot(&nv);
            let py = rv.dot(&hv.cross(&nv)) / h;
            let argpe = math::wrap_two_pi(libm::atan2(py, px) - ta);

            (lan, argpe, ta)
        };

        Conic {
            p,
            a,
            e,
            i,
            lan,
            argpe,
            ta: math::wrap_pi(ta),
        }
    }

    /// True anomaly of the outbound asymptote. `None` unless hyperbolic.
    pub fn asymptote_anomaly(&self) -> Option<f64> {
        (self.e > 1.0).then(|| libm::acos(-1.0 / self.e))
    }

    /// Velocity at true anomaly `ta` about a body of gravitational
    /// parameter `mu`.
    pub fn velocity_at(&self, mu: f64, ta: f64) -> Vector3<f64> {
        let k = libm::sqrt(mu / self.p);
        let pqw = Vector3::new(-k * libm::sin(ta), k * (self.e + libm::cos(ta)), 0.0);
        pqw_ijk_matrix(self.i, self.lan, self.argpe) * pqw
    }

    /// Velocity in the limit along the outbound asymptote, or the inbound
    /// one if `inbound` is set. `None` unless hyperbolic.
    pub fn excess_velocity(&self, mu: f64, inbound: bool) -> Option<Vector3<f64>> {
        let ta = self.asymptote_anomaly()?;
        Some(self.velocity_at(mu, if inbound { -ta } else { ta }))
    }
}

/// Rotation from the perifocal frame PQW into the parent's inertial
/// frame (3-1-3 through `lan`, `i`, `argpe`).
fn pqw_ijk_matrix(i: f64, lan: f64, argpe: f64) -> Matrix3<f64> {
    let m11 = libm::cos(lan) * libm::cos(argpe) - libm::sin(lan) * libm::sin(argpe) * libm::cos(i);
    let m12 = -libm::cos(lan) * libm::sin(argpe) - libm::sin(lan) * libm::cos(argpe) * libm::cos(i);
    let m13 = libm::sin(lan) * libm::sin(i);
    let m21 = libm::sin(lan) * libm::cos(argpe) + libm::cos(lan) * libm::sin(argpe) * libm::cos(i);
    let m22 = -libm::sin(lan) * libm::sin(argpe) + libm::cos(lan) * libm::cos(argpe) * libm::cos(i);
    let m23 = -libm::cos(lan) * libm::sin(i);
    let m31 = libm::sin(argpe) * libm::sin(i);
    let m32 = libm::cos(argpe) * libm::sin(i);
    let m33 = libm::cos(i);

    Matrix3::new(m11, m12, m13, m21, m22, m23, m31, m32, m33)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceFrame {
    /// Non-rotating frame centered on the given body.
    BodyCenteredInertial(BodyId),
}

impl ReferenceFrame {
    pub fn body(self) -> BodyId {
        match self {
            ReferenceFrame::BodyCenteredInertial(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub frame: ReferenceFrame,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub time: UT,
}

impl StateVector {
    /// The origin of `frame`, at rest.
    pub fn zero(frame: ReferenceFrame, time: UT) -> Self {
        Self {
            frame,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            time,
        }
    }

    /// Specific orbital energy about a central body of gravitational
    /// parameter `mu`.
    pub fn specific_energy(&self, mu: f64) -> f64 {
        self.velocity.norm_squared() / 2.0 - mu / self.position.norm()
    }

    /// Convert this state vector into a [`Conic`] about a central body
    /// of gravitational parameter `mu`.
    ///
    /// Recommended tolerance (`tol`): `1e-8`.
    pub fn into_conic(&self, mu: f64, tol: f64) -> Conic {
        Conic::from_position_velocity(self.position, self.velocity, mu, tol)
    }

    /// Propagate this state `delta_t` under two-body motion about a
    /// central body of gravitational parameter `mu`.
    ///
    /// `tol` is relative to the universal anomaly, which reaches
    /// `1e6 √m` on interplanetary arcs. Recommended: `tol = 1e-12`,
    /// `maxiter = 50`.
    pub fn propagate(
        self,
        mu: f64,
        delta_t: Duration,
        tol: f64,
        maxiter: u64,
    ) -> Result<StateVector, KeplerError> {
        let full_dt = delta_t.as_seconds_f64();
        let norm_r0 = self.position.norm();
        let alpha = -self.velocity.norm_squared() / mu + 2.0 / norm_r0;

        // Whole revolutions of an ellipse change nothing.
        let delta_t = if alpha > 1e-12 {
            let period = 2.0 * consts::PI * libm::sqrt(1.0 / (alpha.powi(3) * mu));
            libm::remainder(full_dt, period)
        } else {
            full_dt
        };

        let dot_r0v0 = self.position.dot(&self.velocity);
        let sqrt_mu = libm::sqrt(mu);

        let mut xn_new = if alpha > 1e-12 {
            sqrt_mu * delta_t * alpha
        } else if alpha < -1e-12 {
            let a = 1.0 / alpha;
            delta_t.signum()
                * libm::sqrt(-a)
                * libm::log(
                    (-2.0 * mu * alpha * delta_t)
                        / (dot_r0v0
                            + delta_t.signum() * libm::sqrt(-mu * a) * (1.0 - norm_r0 * alpha)),
                )
        } else {
            let h = self.position.cross(&self.velocity);
            let p = h.norm_squared() / mu;
            let s = libm::atan2(1.0, 3.0 * delta_t * libm::sqrt(mu / p.powi(3))) / 2.0;
            let w = libm::atan(libm::cbrt(libm::tan(s)));
            libm::sqrt(p) * 2.0 / libm::tan(2.0 * w)
        };

        let mut converged = None;
        for _ in 0..maxiter {
            let xn = xn_new;
            let psi = xn.powi(2) * alpha;
            let c2 = math::stumpff_c(psi);
            let c3 = math::stumpff_s(psi);
            let r = xn * xn * c2
                + dot_r0v0 / sqrt_mu * xn * (1.0 - psi * c3)
                + norm_r0 * (1.0 - psi * c2);
            xn_new = xn
                + (sqrt_mu * delta_t
                    - xn * xn * xn * c3
                    - dot_r0v0 / sqrt_mu * xn * xn * c2
                    - norm_r0 * xn * (1.0 - psi * c3))
                    / r;

            if (xn_new - xn).abs() < tol * xn_new.abs().max(1.0) {
                converged = Some(xn_new);
                break;
            }
        }
        let Some(xn) = converged else {
            return Err(KeplerError::UniversalVariable {
                delta_t: full_dt,
                maxiter,
            });
        };

        let psi = xn.powi(2) * alpha;
        let c2 = math::stumpff_c(psi);
        let c3 = math::stumpff_s(psi);
        let r = xn * xn * c2
            + dot_r0v0 / sqrt_mu * xn * (1.0 - psi * c3)
            + norm_r0 * (1.0 - psi * c2);

        let f = 1.0 - xn.powi(2) / norm_r0 * c2;
        let g = delta_t - xn.powi(3) / sqrt_mu * c3;
        let gdot = 1.0 - xn.powi(2) / r * c2;
        let fdot = sqrt_mu / (r * norm_r0) * xn * (psi * c3 - 1.0);

        Ok(StateVector {
            frame: self.frame,
            position: f * self.position + g * self.velocity,
            velocity: fdot * self.position + gdot * self.velocity,
            time: self.time + Duration::seconds_f64(full_dt),
        })
    }
}

pub fn ea_to_ta(ea: f64, e: f64) -> f64 {
    let beta = e / (1.0 + libm::sqrt(1.0 - e.powi(2)));
    ea + 2.0 * libm::atan2(beta * libm::sin(ea), 1.0 - beta * libm::cos(ea))
}

/// Solve Kepler's equation `M = E - e sin E` for the eccentric anomaly
/// by Newton iteration.
pub fn ma_to_ea(ma: f64, e: f64, tol: f64, maxiter: u64) -> Result<f64, KeplerError> {
    if !(0.0..1.0).contains(&e) {
        return Err(KeplerError::NotElliptical(e));
    }
    let ma = math::wrap_pi(ma);

    let mut ea_new = if ma < 0.0 { ma - e } else { ma + e };

    for _ in 0..maxiter {
        let ea = ea_new;
        ea_new = ea + (ma - ea + e * libm::sin(ea)) / (1.0 - e * libm::cos(ea));

        if (ea_new - ea).abs() < tol {
            return Ok(ea_new);
        }
    }
    Err(KeplerError::EccentricAnomaly { ma, e, maxiter })
}

pub fn ma_to_ta(ma: f64, e: f64, tol: f64, maxiter: u64) -> Result<f64, KeplerError> {
    let ea = ma_to_ea(ma, e, tol, maxiter)?;
    Ok(ea_to_ta(ea, e))
}
