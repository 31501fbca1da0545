use std::f64::consts;

use nalgebra::Vector3;
use time::Duration;
use trajectorize::{
    bodies::{
        kerbol::{self, DUNA, IKE, KERBIN, KERBOL, MINMUS, MUN},
        Body, BodyId, Motion, SolarSystem,
    },
    ephemeris,
    kepler::orbits::Orbit,
    time::UT,
    transfer::{
        compute_transfer, hohmann_time_of_flight, SearchOptions, TransferError, TransferRequest,
        TransferSolution,
    },
};

const MU_STAR: f64 = 1.172_332_8e18;
const MU_PLANET: f64 = 3.5316e12;
const R_INNER: f64 = 1.0e10;
const R_OUTER: f64 = 1.5e10;

fn planet(name: &str, a: f64, ma0: f64) -> Body {
    Body {
        name: name.into(),
        parent: Some(BodyId(0)),
        mu: MU_PLANET,
        radius: 600_000.0,
        atmosphere_height: 0.0,
        soi: 8.0e7,
        motion: Motion::Keplerian(Orbit {
            a,
            e: 0.0,
            i: 0.0,
            lan: 0.0,
            argpe: 0.0,
            ma0,
            epoch: UT::default(),
        }),
    }
}

/// Two coplanar circular planets phased for a Hohmann transfer leaving
/// the inner one at UT 0.
fn hohmann_system() -> SolarSystem {
    let tof = hohmann_time_of_flight(MU_STAR, R_INNER, R_OUTER);
    let n_outer = libm::sqrt(MU_STAR / R_OUTER.powi(3));
    SolarSystem::new(vec![
        Body {
            name: "Star".into(),
            parent: None,
            mu: MU_STAR,
            radius: 2.0e8,
            atmosphere_height: 0.0,
            soi: f64::INFINITY,
            motion: Motion::at_rest(),
        },
        planet("Inner", R_INNER, 0.0),
        planet("Outer", R_OUTER, consts::PI - n_outer * tof),
    ])
    .unwrap()
}

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

/// Fly the winning arc and check it meets the destination.
fn assert_arc_reaches_destination(system: &SolarSystem, sol: &TransferSolution) {
    let mu = system.lookup(sol.central).unwrap().mu;
    let mut start =
        ephemeris::state_in_common_frame(system, sol.origin, sol.departure(), sol.central).unwrap();
    let target =
        ephemeris::state_in_common_frame(system, sol.destination, sol.arrival(), sol.central).unwrap();
    start.velocity = sol.best.arc.v1;
    let end = start.propagate(mu, sol.time_of_flight(), 1e-12, 100).unwrap();
    let miss = (end.position - target.position).norm() / target.position.norm();
    assert!(miss < 1e-6, "arc misses the destination by {miss} (relative)");
    let dv = (end.velocity - sol.best.arc.v2).norm() / sol.best.arc.v2.norm();
    assert!(dv < 1e-6, "arc arrives with velocity error {dv} (relative)");
}

/// The fitted hyperbolas carry the excess velocities and touch the
/// parking and capture orbits.
fn assert_hyperbolas_match(system: &SolarSystem, sol: &TransferSolution, req: &TransferRequest) {
    let origin_mu = system.lookup(sol.origin).unwrap().mu;
    let escape = sol.departure_hyperbola.unwrap();
    let v_inf = sol.best.departure_v_inf();
    let out = escape.excess_velocity(origin_mu, false).unwrap();
    assert!((out - v_inf).norm() < 1e-6 * v_inf.norm(), "{out} vs {v_inf}");
    assert!((escape.periapsis_radius() - req.parking_radius).abs() / req.parking_radius < 1e-9);

    match req.capture_radius.filter(|_| req.capture) {
        Some(radius) => {
            let destination_mu = system.lookup(sol.destination).unwrap().mu;
            let approach = sol.arrival_hyperbola.unwrap();
            let v_inf = sol.best.arrival_v_inf();
            let inbound = approach.excess_velocity(destination_mu, true).unwrap();
            assert!((inbound - v_inf).norm() < 1e-6 * v_inf.norm(), "{inbound} vs {v_inf}");
            assert!((approach.periapsis_radius() - radius).abs() / radius < 1e-9);
        }
        None => assert_eq!(sol.arrival_hyperbola, None),
    }
}

fn injection(v_inf: f64) -> f64 {
    libm::sqrt(v_inf.powi(2) + 2.0 * MU_PLANET / 700_000.0) - libm::sqrt(MU_PLANET / 700_000.0)
}

#[test]
fn phased_circular_orbits_give_a_hohmann_transfer() {
    let system = hohmann_system();
    let tof_h = hohmann_time_of_flight(MU_STAR, R_INNER, R_OUTER);
    let period = 2.0 * consts::PI * libm::sqrt(R_INNER.powi(3) / MU_STAR);

    let mut req = request(BodyId(1), BodyId(2));
    req.departure_half_width = Some(Duration::seconds_f64(0.02 * period));
    req.time_of_flight = Some(Duration::seconds_f64(0.8 * tof_h)..Duration::seconds_f64(1.2 * tof_h));
    let sol = compute_transfer(&system, &req, &SearchOptions::default()).unwrap();

    let tof = sol.time_of_flight().as_seconds_f64();
    assert!((tof - tof_h).abs() / tof_h < 0.03, "tof = {tof}, Hohmann = {tof_h}");

    let a_h = (R_INNER + R_OUTER) / 2.0;
    let e_h = (R_OUTER - R_INNER) / (R_OUTER + R_INNER);
    assert!((sol.semi_major_axis() - a_h).abs() / a_h < 0.02, "a = {}", sol.semi_major_axis());
    assert!((sol.eccentricity() - e_h).abs() < 0.02, "e = {}", sol.eccentricity());
    assert!((sol.transfer_angle - consts::PI).abs() < 0.1);
    // Half of the transfer orbit's period.
    let half_period = consts::PI * libm::sqrt(sol.semi_major_axis().powi(3) / MU_STAR);
    assert!((tof - half_period).abs() / half_period < 0.05);

    let v_inf_dep = libm::sqrt(MU_STAR / R_INNER) * (libm::sqrt(2.0 * R_OUTER / (R_INNER + R_OUTER)) - 1.0);
    let expected = injection(v_inf_dep);
    assert!(
        (sol.best.departure_dv - expected).abs() / expected < 0.01,
        "departure dv = {}, Hohmann = {expected}",
        sol.best.departure_dv
    );
    assert_eq!(sol.best.total_dv, sol.best.departure_dv);
    assert_eq!(sol.central, BodyId(0));
    assert_arc_reaches_destination(&system, &sol);
    assert_hyperbolas_match(&system, &sol, &req);
    // Coplanar orbits give an equatorial escape.
    assert!(sol.departure_hyperbola.unwrap().i < 1e-6);
}

#[test]
fn capture_burns_are_symmetric_in_excess_speed() {
    let system = hohmann_system();
    let tof_h = hohmann_time_of_flight(MU_STAR, R_INNER, R_OUTER);
    let period = 2.0 * consts::PI * libm::sqrt(R_INNER.powi(3) / MU_STAR);

    let mut req = request(BodyId(1), BodyId(2));
    req.capture = true;
    req.capture_radius = Some(700_000.0);
    req.departure_half_width = Some(Duration::seconds_f64(0.02 * period));
    req.time_of_flight = Some(Duration::seconds_f64(0.8 * tof_h)..Duration::seconds_f64(1.2 * tof_h));
    let sol = compute_transfer(&system, &req, &SearchOptions::default()).unwrap();

    let v_inf_arr = libm::sqrt(MU_STAR / R_OUTER) * (1.0 - libm::sqrt(2.0 * R_INNER / (R_INNER + R_OUTER)));
    let expected = injection(v_inf_arr);
    assert!(
        (sol.best.arrival_dv - expected).abs() / expected < 0.02,
        "arrival dv = {}, Hohmann = {expected}",
        sol.best.arrival_dv
    );
    // Same planets, same orbit radii: the burns differ only through the
    // excess speeds.
    let dep = sol.best.departure_v_inf().norm();
    let arr = sol.best.arrival_v_inf().norm();
    assert!((injection(dep) - sol.best.departure_dv).abs() < 1e-6);
    assert!((injection(arr) - sol.best.arrival_dv).abs() < 1e-6);
    assert!((sol.best.total_dv - sol.best.departure_dv - sol.best.arrival_dv).abs() < 1e-9);
    assert_arc_reaches_destination(&system, &sol);
    assert_hyperbolas_match(&system, &sol, &req);
}

#[test]
fn kerbin_to_duna() {
    let system = kerbol::kerbol_system();
    let sol = compute_transfer(&system, &request(KERBIN, DUNA), &SearchOptions::default()).unwrap();
    assert_eq!(sol.central, KERBOL);
    assert!(
        sol.best.total_dv > 800.0 && sol.best.total_dv < 1500.0,
        "total dv = {}",
        sol.best.total_dv
    );
    assert!(sol.best.arrival_dv > 0.0);
    assert!(sol.eccentricity() < 1.0);
    assert!(sol.inclination() < 0.1);
    assert!(sol.c3() > 0.0);
    assert_eq!(sol.porkchop.total_dv.len(), 40 * 40);
    assert!(sol.porkchop.feasible_count() > 0);
    assert_eq!(sol.arrival(), sol.departure() + sol.time_of_flight());
    assert_arc_reaches_destination(&system, &sol);
    assert_hyperbolas_match(&system, &sol, &request(KERBIN, DUNA));
}

#[test]
fn capture_only_adds_cost() {
    let system = kerbol::kerbol_system();
    let options = SearchOptions {
        departure_samples: 16,
        tof_samples: 16,
        refine_rounds: 0,
        ..SearchOptions::default()
    };
    let flyby = compute_transfer(&system, &request(KERBIN, DUNA), &options).unwrap();
    let mut req = request(KERBIN, DUNA);
    req.capture = true;
    req.capture_radius = Some(420_000.0);
    let capture = compute_transfer(&system, &req, &options).unwrap();
    assert!(capture.best.total_dv >= flyby.best.total_dv);
    assert_hyperbolas_match(&system, &capture, &req);
}

#[test]
fn moons_of_different_planets() {
    let system = kerbol::kerbol_system();
    let mut req = request(MUN, IKE);
    req.parking_radius = 220_000.0;
    let sol = compute_transfer(&system, &req, &SearchOptions::default()).unwrap();
    assert_eq!(sol.central, KERBOL);
    assert!(sol.best.total_dv.is_finite() && sol.best.total_dv > 0.0);
    assert_arc_reaches_destination(&system, &sol);
}

#[test]
fn moons_of_the_same_planet() {
    let system = kerbol::kerbol_system();
    let mut req = request(MUN, MINMUS);
    req.parking_radius = 220_000.0;
    let sol = compute_transfer(&system, &req, &SearchOptions::default()).unwrap();
    assert_eq!(sol.central, KERBIN);
    assert!(sol.best.total_dv > 0.0);
    assert_arc_reaches_destination(&system, &sol);
}

/// A planet and a beacon held fixed relative to the star.
fn beacon_system() -> SolarSystem {
    SolarSystem::new(vec![
        hohmann_system().lookup(BodyId(0)).unwrap().clone(),
        planet("Inner", R_INNER, 0.0),
        Body {
            name: "Beacon".into(),
            parent: Some(BodyId(0)),
            mu: 1.0e9,
            radius: 1.0e5,
            atmosphere_height: 0.0,
            soi: 1.0e7,
            motion: Motion::Fixed {
                position: Vector3::new(0.0, R_OUTER, 0.0),
                velocity: Vector3::zeros(),
            },
        },
    ])
    .unwrap()
}

#[test]
fn transfers_to_and_from_a_fixed_anchor() {
    let system = beacon_system();
    let (inner, beacon) = (BodyId(1), BodyId(2));
    let options = SearchOptions {
        departure_samples: 20,
        tof_samples: 20,
        ..SearchOptions::default()
    };

    let mut req = request(inner, beacon);
    req.capture = true;
    req.capture_radius = Some(2.0e5);
    let there = compute_transfer(&system, &req, &options).unwrap();
    assert_eq!(there.central, BodyId(0));
    assert!(there.best.total_dv.is_finite() && there.best.arrival_dv > 0.0);
    // The beacon is at rest, so the arrival excess is the arc's own velocity.
    assert_eq!(there.best.arrival_v_inf(), there.best.arc.v2);
    assert_arc_reaches_destination(&system, &there);
    assert_hyperbolas_match(&system, &there, &req);

    let mut req = request(beacon, inner);
    req.parking_radius = 2.0e5;
    let back = compute_transfer(&system, &req, &options).unwrap();
    assert_eq!(back.best.departure_v_inf(), back.best.arc.v1);
    assert_arc_reaches_destination(&system, &back);
    assert_hyperbolas_match(&system, &back, &req);
    // Departures span one Hohmann time either side of the nominal epoch.
    let hohmann = hohmann_time_of_flight(MU_STAR, R_OUTER, R_INNER);
    assert!(back.departure().as_seconds_f64().abs() <= hohmann * (1.0 + 1e-9));
}

#[test]
fn same_body_is_rejected() {
    let system = kerbol::kerbol_system();
    let err = compute_transfer(&system, &request(DUNA, DUNA), &SearchOptions::default()).unwrap_err();
    assert_eq!(err, TransferError::SameBody(DUNA));
    assert!(err.is_invalid_request());
}

#[test]
fn capture_without_a_usable_radius_is_rejected() {
    let system = kerbol::kerbol_system();
    let mut req = request(KERBIN, DUNA);
    req.capture = true;
    let err = compute_transfer(&system, &req, &SearchOptions::default()).unwrap_err();
    assert_eq!(err, TransferError::MissingCaptureRadius);
    assert!(err.is_invalid_request());

    req.capture_radius = Some(320_000.0);
    let err = compute_transfer(&system, &req, &SearchOptions::default()).unwrap_err();
    assert!(matches!(err, TransferError::CaptureRadius { .. }));
    assert!(err.is_invalid_request());
}

#[test]
fn flights_faster_than_any_ellipse_are_infeasible() {
    let system = kerbol::kerbol_system();
    let mut req = request(KERBIN, DUNA);
    req.time_of_flight = Some(Duration::seconds(10_000)..Duration::seconds(100_000));
    let err = compute_transfer(&system, &req, &SearchOptions::default()).unwrap_err();
    assert_eq!(err, TransferError::InfeasibleWindow { samples: 1600 });
    assert!(!err.is_invalid_request());
}

#[test]
fn concurrent_requests_agree() {
    let system = kerbol::kerbol_system();
    let options = SearchOptions {
        departure_samples: 12,
        tof_samples: 12,
        ..SearchOptions::default()
    };
    let req = request(KERBIN, DUNA);
    let serial = compute_transfer(&system, &req, &options).unwrap();
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| compute_transfer(&system, &req, &options).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for sol in results {
        assert_eq!(sol.best, serial.best);
    }
}
