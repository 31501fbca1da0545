//! Interplanetary transfer search.
//!
//! [`compute_transfer`] validates a [`TransferRequest`] against the
//! catalog, resolves the common central body, and searches departure
//! epoch and time of flight for the cheapest patched-conic transfer.

use std::{f64::consts, ops::Range};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Duration;
use tracing::debug;

use crate::{
    bodies::{Body, BodyId, Motion, SolarSystem, UnknownBody},
    ephemeris::{self, EphemerisError},
    kepler::{lambert, orbits::Conic},
    maneuver::{self, Asymptote, BurnTargets},
    time::UT,
};

pub use crate::maneuver::TransferCandidate;

mod search;

/// A transfer between two bodies sharing a central body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub origin: BodyId,
    pub destination: BodyId,
    /// Nominal departure epoch; the searched departure window is
    /// centered on it.
    pub departure: UT,
    /// Circular parking orbit radius at the origin (m).
    pub parking_radius: f64,
    /// Whether to price a burn into a circular capture orbit.
    #[serde(default)]
    pub capture: bool,
    /// Capture orbit radius at the destination (m). Required when
    /// `capture` is set.
    #[serde(default)]
    pub capture_radius: Option<f64>,
    /// Departure epochs are searched within `departure ± half_width`.
    #[serde(default)]
    pub departure_half_width: Option<Duration>,
    #[serde(default)]
    pub time_of_flight: Option<Range<Duration>>,
}

/// Search resolution and solver bounds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Coarse grid samples along departure epoch.
    pub departure_samples: usize,
    /// Coarse grid samples along time of flight.
    pub tof_samples: usize,
    /// Coordinate-descent rounds after the coarse pass.
    pub refine_rounds: u64,
    /// Golden-section iterations per line search.
    pub line_search_iters: u64,
    /// Relative time-of-flight tolerance of each Lambert solve.
    pub lambert_tol: f64,
    pub lambert_maxiter: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            departure_samples: 40,
            tof_samples: 40,
            refine_rounds: 8,
            line_search_iters: 60,
            lambert_tol: 1e-10,
            lambert_maxiter: 100,
        }
    }
}

/// Total delta-v over the coarse grid, for plotting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PorkchopGrid {
    pub departures: Vec<UT>,
    pub times_of_flight: Vec<Duration>,
    /// Row-major by departure; `None` where no transfer arc exists.
    pub total_dv: Vec<Option<f64>>,
}

impl PorkchopGrid {
    pub fn get(&self, departure_idx: usize, tof_idx: usize) -> Option<f64> {
        if departure_idx >= self.departures.len() || tof_idx >= self.times_of_flight.len() {
            return None;
        }
        self.total_dv[departure_idx * self.times_of_flight.len() + tof_idx]
    }

    pub fn feasible_count(&self) -> usize {
        self.total_dv.iter().flatten().count()
    }
}

/// The cheapest transfer found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferSolution {
    pub best: TransferCandidate,
    pub origin: BodyId,
    pub destination: BodyId,
    /// The body the transfer arc orbits.
    pub central: BodyId,
    /// Transfer orbit about `central` at departure.
    pub transfer_orbit: Conic,
    /// Angle swept by the transfer arc (radians).
    pub transfer_angle: f64,
    /// Escape hyperbola from the parking orbit, about the origin. `None`
    /// when the departure excess speed is negligible.
    pub departure_hyperbola: Option<Conic>,
    /// Approach hyperbola to the capture orbit, about the destination.
    /// Only present when a capture was requested.
    pub arrival_hyperbola: Option<Conic>,
    pub porkchop: PorkchopGrid,
}

impl TransferSolution {
    pub fn departure(&self) -> UT {
        self.best.arc.departure
    }

    pub fn time_of_flight(&self) -> Duration {
        self.best.arc.time_of_flight
    }

    pub fn arrival(&self) -> UT {
        self.best.arrival()
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.transfer_orbit.a
    }

    pub fn eccentricity(&self) -> f64 {
        self.transfer_orbit.e
    }

    pub fn inclination(&self) -> f64 {
        self.transfer_orbit.i
    }

    /// Departure characteristic energy (m²/s²).
    pub fn c3(&self) -> f64 {
        self.best.departure_v_inf().norm_squared()
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum TransferError {
    #[error(transparent)]
    UnknownBody(#[from] UnknownBody),
    #[error("origin and destination are both {0}")]
    SameBody(BodyId),
    #[error("{inner} orbits {outer}; transfers must be between bodies sharing a central body")]
    NestedBodies { outer: BodyId, inner: BodyId },
    #[error("{origin} and {destination} share no central body")]
    NoCommonAncestor { origin: BodyId, destination: BodyId },
    #[error("parking radius {radius} m must exceed the origin's radius {body_radius} m")]
    ParkingRadius { radius: f64, body_radius: f64 },
    #[error("capture requested without a capture radius")]
    MissingCaptureRadius,
    #[error("capture radius {radius} m must exceed the destination's radius {body_radius} m")]
    CaptureRadius { radius: f64, body_radius: f64 },
    #[error("invalid search window: {0}")]
    InvalidWindow(&'static str),
    #[error("invalid search options: {0}")]
    InvalidOptions(&'static str),
    #[error("no transfer arc exists anywhere in the search window ({samples} samples)")]
    InfeasibleWindow { samples: usize },
    #[error("internal non-convergence: {0}")]
    NonConvergence(#[from] EphemerisError),
}

impl TransferError {
    /// Is this a malformed request, rejected before any search ran?
    pub fn is_invalid_request(&self) -> bool {
        !matches!(
            self,
            TransferError::InfeasibleWindow { .. } | TransferError::NonConvergence(_)
        )
    }
}

/// Hohmann transfer time between circular orbits of radii `r1` and `r2`
/// about a body with gravitational parameter `mu`.
pub fn hohmann_time_of_flight(mu: f64, r1: f64, r2: f64) -> f64 {
    let a = (r1 + r2) / 2.0;
    consts::PI * libm::sqrt(a.powi(3) / mu)
}

/// Distance of `body` from its parent, for window estimates.
fn orbit_radius(body: &Body) -> f64 {
    match &body.motion {
        Motion::Keplerian(orbit) => orbit.a,
        Motion::Fixed { position, .. } => position.norm(),
    }
}

/// Searched departure epochs and times of flight, in seconds.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SearchWindow {
    pub departure: Range<f64>,
    pub time_of_flight: Range<f64>,
}

fn resolve_window(
    system: &SolarSystem,
    request: &TransferRequest,
    central: BodyId,
) -> Result<SearchWindow, TransferError> {
    let mu = system.lookup(central)?.mu;
    let origin_level = system
        .child_toward(central, request.origin)?
        .ok_or(TransferError::NoCommonAncestor {
            origin: request.origin,
            destination: request.destination,
        })?;
    let destination_level = system
        .child_toward(central, request.destination)?
        .ok_or(TransferError::NoCommonAncestor {
            origin: request.origin,
            destination: request.destination,
        })?;
    let origin_level = system.lookup(origin_level)?;
    let hohmann = hohmann_time_of_flight(
        mu,
        orbit_radius(origin_level),
        orbit_radius(system.lookup(destination_level)?),
    );

    let time_of_flight = match &request.time_of_flight {
        Some(range) => range.start.as_seconds_f64()..range.end.as_seconds_f64(),
        None => 0.5 * hohmann..2.0 * hohmann,
    };
    if !(time_of_flight.start > 0.0 && time_of_flight.end.is_finite()) {
        return Err(TransferError::InvalidWindow(
            "time of flight must be positive and finite",
        ));
    }
    if time_of_flight.end < time_of_flight.start {
        return Err(TransferError::InvalidWindow("time of flight range is reversed"));
    }

    let half_width = match request.departure_half_width {
        Some(hw) => hw.as_seconds_f64(),
        None => origin_level.orbit().map_or(hohmann, |orbit| orbit.period(mu)),
    };
    if !(half_width >= 0.0 && half_width.is_finite()) {
        return Err(TransferError::InvalidWindow(
            "departure half-width must be non-negative and finite",
        ));
    }
    let nominal = request.departure.as_seconds_f64();
    let departure = nominal - half_width..nominal + half_width;
    let latest_arrival = departure.end + time_of_flight.end;
    if [departure.start, latest_arrival, time_of_flight.end]
        .into_iter()
        .any(|t| UT::checked_seconds(t).is_none())
    {
        return Err(TransferError::InvalidWindow(
            "window reaches beyond the representable time range",
        ));
    }

    Ok(SearchWindow {
        departure,
        time_of_flight,
    })
}

/// Check `request` against the catalog and resolve its central body.
pub fn validate(system: &SolarSystem, request: &TransferRequest) -> Result<BodyId, TransferError> {
    let origin = system.lookup(request.origin)?;
    let destination = system.lookup(request.destination)?;
    if request.origin == request.destination {
        return Err(TransferError::SameBody(request.origin));
    }
    for (outer, inner) in [
        (request.origin, request.destination),
        (request.destination, request.origin),
    ] {
        if system.is_ancestor(outer, inner)? {
            return Err(TransferError::NestedBodies { outer, inner });
        }
    }
    let central = system
        .common_ancestor(request.origin, request.destination)?
        .ok_or(TransferError::NoCommonAncestor {
            origin: request.origin,
            destination: request.destination,
        })?;

    if !(request.parking_radius > origin.radius && request.parking_radius.is_finite()) {
        return Err(TransferError::ParkingRadius {
            radius: request.parking_radius,
            body_radius: origin.radius,
        });
    }
    if request.capture {
        let radius = request
            .capture_radius
            .ok_or(TransferError::MissingCaptureRadius)?;
        if !(radius > destination.radius && radius.is_finite()) {
            return Err(TransferError::CaptureRadius {
                radius,
                body_radius: destination.radius,
            });
        }
    }
    Ok(central)
}

fn validate_options(options: &SearchOptions) -> Result<(), TransferError> {
    if options.departure_samples == 0 || options.tof_samples == 0 {
        return Err(TransferError::InvalidOptions("grid needs at least one sample per axis"));
    }
    if !(options.lambert_tol > 0.0) || options.lambert_maxiter == 0 {
        return Err(TransferError::InvalidOptions(
            "Lambert tolerance and iteration bound must be positive",
        ));
    }
    Ok(())
}

/// Find the cheapest transfer for `request`.
///
/// The request is validated before any sampling; validation failures
/// are reported as errors for which
/// [`TransferError::is_invalid_request`] holds.
pub fn compute_transfer(
    system: &SolarSystem,
    request: &TransferRequest,
    options: &SearchOptions,
) -> Result<TransferSolution, TransferError> {
    let central = validate(system, request)?;
    validate_options(options)?;
    let window = resolve_window(system, request, central)?;
    debug!(
        origin = %request.origin,
        destination = %request.destination,
        central = %central,
        ?window,
        "transfer request validated"
    );

    let targets = BurnTargets {
        origin_mu: system.lookup(request.origin)?.mu,
        parking_radius: request.parking_radius,
        destination_mu: system.lookup(request.destination)?.mu,
        capture_radius: if request.capture {
            request.capture_radius
        } else {
            None
        },
    };
    let problem = search::Problem {
        system,
        central,
        central_mu: system.lookup(central)?.mu,
        origin: request.origin,
        destination: request.destination,
        targets,
        options: *options,
    };
    let (best, porkchop) = problem.run(&window)?;

    let departure = ephemeris::state_in_common_frame(
        system,
        request.origin,
        best.arc.departure,
        central,
    )?;
    let arrival =
        ephemeris::state_in_common_frame(system, request.destination, best.arrival(), central)?;
    let mut transfer = departure.clone();
    transfer.velocity = best.arc.v1;
    let transfer_orbit = transfer.into_conic(problem.central_mu, 1e-8);
    let transfer_angle = lambert::transfer_angle(departure.position, arrival.position, true);
    let targets = &problem.targets;
    let departure_hyperbola = maneuver::fit_hyperbola(
        best.departure_v_inf(),
        targets.parking_radius,
        targets.origin_mu,
        Asymptote::Outbound,
    );
    let arrival_hyperbola = targets.capture_radius.and_then(|r| {
        maneuver::fit_hyperbola(best.arrival_v_inf(), r, targets.destination_mu, Asymptote::Inbound)
    });

    debug!(
        departure = %best.arc.departure,
        tof = best.arc.time_of_flight.as_seconds_f64(),
        total_dv = best.total_dv,
        a = transfer_orbit.a,
        e = transfer_orbit.e,
        "transfer found"
    );

    Ok(TransferSolution {
        best,
        origin: request.origin,
        destination: request.destination,
        central,
        transfer_orbit,
        transfer_angle,
        departure_hyperbola,
        arrival_hyperbola,
        porkchop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bodies::kerbol::{self, DUNA, EVE, KERBIN, KERBOL, MUN};

    fn request(origin: BodyId, destination: BodyId) -> TransferRequest {
        TransferRequest {
            origin,
            destination,
            departure: UT::default(),
            parking_radius: 700_000.0,
            capture: false,
            capture_radius: None,
            departure_half_width: None,
            time_of_flight: None,
        }
    }

    #[test]
    fn rejects_same_body() {
        let system = kerbol::kerbol_system();
        let err = compute_transfer(&system, &request(KERBIN, KERBIN), &SearchOptions::default())
            .unwrap_err();
        assert_eq!(err, TransferError::SameBody(KERBIN));
        assert!(err.is_invalid_request());
    }

    #[test]
    fn rejects_unknown_and_nested_bodies() {
        let system = kerbol::kerbol_system();
        assert_eq!(
            validate(&system, &request(KERBIN, BodyId(17))),
            Err(TransferError::UnknownBody(UnknownBody(BodyId(17))))
        );
        assert_eq!(
            validate(&system, &request(KERBIN, MUN)),
            Err(TransferError::NestedBodies {
                outer: KERBIN,
                inner: MUN
            })
        );
        assert_eq!(
            validate(&system, &request(KERBOL, DUNA)),
            Err(TransferError::NestedBodies {
                outer: KERBOL,
                inner: DUNA
            })
        );
    }

    #[test]
    fn capture_needs_a_radius_above_the_surface() {
        let system = kerbol::kerbol_system();
        let mut req = request(KERBIN, DUNA);
        req.capture = true;
        assert_eq!(validate(&system, &req), Err(TransferError::MissingCaptureRadius));
        req.capture_radius = Some(300_000.0);
        assert!(matches!(
            validate(&system, &req),
            Err(TransferError::CaptureRadius { .. })
        ));
        req.capture_radius = Some(420_000.0);
        assert_eq!(validate(&system, &req), Ok(KERBOL));

        // The radius is ignored without the capture flag.
        req.capture = false;
        req.capture_radius = None;
        assert_eq!(validate(&system, &req), Ok(KERBOL));

        req.parking_radius = 500_000.0;
        assert!(matches!(
            validate(&system, &req),
            Err(TransferError::ParkingRadius { .. })
        ));
    }

    #[test]
    fn default_window_spans_origin_periods() {
        let system = kerbol::kerbol_system();
        let req = request(KERBIN, DUNA);
        let window = resolve_window(&system, &req, KERBOL).unwrap();
        let mu = system.lookup(KERBOL).unwrap().mu;
        let kerbin = system.lookup(KERBIN).unwrap().orbit().unwrap();
        let period = kerbin.period(mu);
        assert!((window.departure.start + period).abs() < 1e-6);
        assert!((window.departure.end - period).abs() < 1e-6);

        let duna = system.lookup(DUNA).unwrap().orbit().unwrap();
        let hohmann = hohmann_time_of_flight(mu, kerbin.a, duna.a);
        assert!((window.time_of_flight.start - 0.5 * hohmann).abs() < 1e-6);
        assert!((window.time_of_flight.end - 2.0 * hohmann).abs() < 1e-6);
    }

    #[test]
    fn fixed_anchor_window_uses_its_distance() {
        use nalgebra::Vector3;

        use crate::kepler::orbits::Orbit;

        let body = |name: &str, parent, mu, motion| Body {
            name: name.into(),
            parent,
            mu,
            radius: 1.0e5,
            atmosphere_height: 0.0,
            soi: f64::INFINITY,
            motion,
        };
        let mu = 1.172_332_8e18;
        let system = SolarSystem::new(vec![
            body("Star", None, mu, Motion::at_rest()),
            body(
                "Planet",
                Some(BodyId(0)),
                3.5e12,
                Motion::Keplerian(Orbit {
                    a: 1.0e10,
                    e: 0.0,
                    i: 0.0,
                    lan: 0.0,
                    argpe: 0.0,
                    ma0: 0.0,
                    epoch: UT::default(),
                }),
            ),
            body(
                "Beacon",
                Some(BodyId(0)),
                1.0e9,
                Motion::Fixed {
                    position: Vector3::new(0.0, 1.5e10, 0.0),
                    velocity: Vector3::zeros(),
                },
            ),
        ])
        .unwrap();
        let (planet, beacon) = (BodyId(1), BodyId(2));

        // A fixed origin has no period, so the half-width is the Hohmann time.
        let hohmann = hohmann_time_of_flight(mu, 1.5e10, 1.0e10);
        let window = resolve_window(&system, &request(beacon, planet), BodyId(0)).unwrap();
        assert!((window.departure.end - hohmann).abs() / hohmann < 1e-12);
        assert!((window.departure.start + hohmann).abs() / hohmann < 1e-12);
        assert!((window.time_of_flight.start - 0.5 * hohmann).abs() / hohmann < 1e-12);
        assert!((window.time_of_flight.end - 2.0 * hohmann).abs() / hohmann < 1e-12);

        let period = system.lookup(planet).unwrap().orbit().unwrap().period(mu);
        let window = resolve_window(&system, &request(planet, beacon), BodyId(0)).unwrap();
        assert!((window.departure.end - period).abs() / period < 1e-12);
        assert!((window.time_of_flight.end - 2.0 * hohmann).abs() / hohmann < 1e-12);
    }

    #[test]
    fn rejects_bad_windows_and_options() {
        let system = kerbol::kerbol_system();
        let mut req = request(KERBIN, EVE);
        req.time_of_flight = Some(Duration::days(10)..Duration::days(5));
        assert!(matches!(
            compute_transfer(&system, &req, &SearchOptions::default()),
            Err(TransferError::InvalidWindow(_))
        ));

        let mut req = request(KERBIN, EVE);
        req.departure = UT::new_seconds(1e300);
        req.departure_half_width = Some(Duration::seconds(1_000_000));
        assert!(matches!(
            compute_transfer(&system, &req, &SearchOptions::default()),
            Err(TransferError::InvalidWindow(_))
        ));

        let options = SearchOptions {
            tof_samples: 0,
            ..SearchOptions::default()
        };
        let err = compute_transfer(&system, &request(KERBIN, EVE), &options).unwrap_err();
        assert!(matches!(err, TransferError::InvalidOptions(_)));
        assert!(err.is_invalid_request());
    }

    #[test]
    fn porkchop_indexing() {
        let grid = PorkchopGrid {
            departures: vec![UT::default(), UT::new_seconds(10.0)],
            times_of_flight: vec![Duration::seconds(1), Duration::seconds(2), Duration::seconds(3)],
            total_dv: vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), None],
        };
        assert_eq!(grid.get(1, 0), Some(4.0));
        assert_eq!(grid.get(0, 1), None);
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.feasible_count(), 4);
    }
}
