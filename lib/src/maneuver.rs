//! Impulsive burns at either end of a transfer arc.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{kepler::orbits::Conic, time::UT};

/// Excess speeds below this (m/s) are treated as zero.
pub const NOISE_SPEED: f64 = 1e-6;

/// Burn needed to move between a circular orbit of radius `r` and a
/// hyperbola with excess speed `v_inf` whose periapsis is at `r`, about
/// a body with gravitational parameter `mu`.
///
/// This is the hyperbolic periapsis speed (from vis-viva) minus the
/// circular speed, and is never negative.
pub fn injection_dv(mu: f64, v_inf: f64, r: f64) -> f64 {
    let circular = libm::sqrt(mu / r);
    if !(v_inf > NOISE_SPEED) {
        return libm::sqrt(2.0 * mu / r) - circular;
    }
    libm::sqrt(v_inf.powi(2) + 2.0 * mu / r) - circular
}

/// Which asymptote of a hyperbola carries the excess velocity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asymptote {
    /// Leaving the body, as on an escape.
    Outbound,
    /// Approaching the body, as on a capture.
    Inbound,
}

/// The hyperbola about a body of gravitational parameter `mu` with
/// periapsis radius `r_pe` whose `asymptote` carries excess velocity
/// `v_inf`.
///
/// Of the planes containing `v_inf` the least inclined one is used, so
/// the hyperbola is prograde. Its periapsis is where the burn from or
/// into a circular orbit of radius `r_pe` happens. `None` when the
/// excess speed is below [`NOISE_SPEED`].
pub fn fit_hyperbola(v_inf: Vector3<f64>, r_pe: f64, mu: f64, asymptote: Asymptote) -> Option<Conic> {
    let speed = v_inf.norm();
    if !(speed > NOISE_SPEED) {
        return None;
    }
    let u = v_inf / speed;
    let z = Vector3::z();
    let h = z - z.dot(&u) * u;
    // Straight up or down: any plane through the pole will do.
    let h = if h.norm() > 1e-12 { h.normalize() } else { Vector3::x() };

    let e = 1.0 + r_pe * speed.powi(2) / mu;
    let ta_inf = libm::acos(-1.0 / e);
    let along = match asymptote {
        Asymptote::Outbound => libm::cos(ta_inf),
        Asymptote::Inbound => -libm::cos(ta_inf),
    };
    let periapsis = along * u - libm::sin(ta_inf) * h.cross(&u);
    let v_pe = libm::sqrt(speed.powi(2) + 2.0 * mu / r_pe);

    Some(Conic::from_position_velocity(
        r_pe * periapsis,
        v_pe * h.cross(&periapsis),
        mu,
        1e-8,
    ))
}

/// Parking and capture orbits, with the gravitational parameters of
/// the bodies they circle.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurnTargets {
    pub origin_mu: f64,
    pub parking_radius: f64,
    pub destination_mu: f64,
    /// Circular capture radius at the destination. `None` for a flyby.
    pub capture_radius: Option<f64>,
}

/// Endpoint velocities of a transfer arc in the central body's frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferArc {
    pub departure: UT,
    pub time_of_flight: Duration,
    pub v1: Vector3<f64>,
    pub v2: Vector3<f64>,
}

/// One scored (departure epoch, time of flight) sample.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferCandidate {
    pub arc: TransferArc,
    /// Origin velocity at departure, central frame.
    pub origin_velocity: Vector3<f64>,
    /// Destination velocity at arrival, central frame.
    pub destination_velocity: Vector3<f64>,
    pub departure_dv: f64,
    /// Capture burn, or the arrival excess speed when no capture was
    /// requested.
    pub arrival_dv: f64,
    /// Committed cost: the departure burn plus the capture burn if any.
    pub total_dv: f64,
}

impl TransferCandidate {
    pub fn departure_v_inf(&self) -> Vector3<f64> {
        self.arc.v1 - self.origin_velocity
    }

    pub fn arrival_v_inf(&self) -> Vector3<f64> {
        self.arc.v2 - self.destination_velocity
    }

    pub fn arrival(&self) -> UT {
        self.arc.departure + self.arc.time_of_flight
    }
}

/// Price the burns for `arc`, given the origin's velocity at departure
/// and the destination's velocity at arrival.
pub fn score(
    arc: TransferArc,
    origin_velocity: Vector3<f64>,
    destination_velocity: Vector3<f64>,
    targets: &BurnTargets,
) -> TransferCandidate {
    let departure_dv = injection_dv(
        targets.origin_mu,
        (arc.v1 - origin_velocity).norm(),
        targets.parking_radius,
    );
    let arrival_v_inf = (arc.v2 - destination_velocity).norm();
    let (arrival_dv, total_dv) = match targets.capture_radius {
        Some(r) => {
            let dv = injection_dv(targets.destination_mu, arrival_v_inf, r);
            (dv, departure_dv + dv)
        }
        None => (arrival_v_inf, departure_dv),
    };
    TransferCandidate {
        arc,
        origin_velocity,
        destination_velocity,
        departure_dv,
        arrival_dv,
        total_dv,
    }
}
