//! Coarse grid over (departure, time of flight), then coordinate
//! descent with golden-section line searches.

use argmin::{
    core::{CostFunction, Executor},
    solver::goldensectionsearch::GoldenSectionSearch,
};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use time::Duration;
use tracing::{debug, trace, warn};

use super::{PorkchopGrid, SearchOptions, SearchWindow, TransferCandidate, TransferError};
use crate::{
    bodies::{BodyId, SolarSystem},
    ephemeris::{self, EphemerisError},
    kepler::lambert,
    maneuver::{self, BurnTargets, TransferArc},
    math,
    time::UT,
};

/// Cost reported to the line search where no transfer arc exists.
const INFEASIBLE_COST: f64 = f64::MAX;
/// Relative bracket tolerance of each golden-section search.
const LINE_TOL: f64 = 1e-9;

pub(super) struct Problem<'a> {
    pub system: &'a SolarSystem,
    pub central: BodyId,
    pub central_mu: f64,
    pub origin: BodyId,
    pub destination: BodyId,
    pub targets: BurnTargets,
    pub options: SearchOptions,
}

impl<'a> Problem<'a> {
    /// Score one sample. `Ok(None)` when the Lambert solver finds no
    /// arc.
    fn evaluate(&self, departure: f64, tof: f64) -> Result<Option<TransferCandidate>, EphemerisError> {
        let departure = UT::new_seconds(departure);
        let time_of_flight = Duration::seconds_f64(tof);
        let origin =
            ephemeris::state_in_common_frame(self.system, self.origin, departure, self.central)?;
        let destination = ephemeris::state_in_common_frame(
            self.system,
            self.destination,
            departure + time_of_flight,
            self.central,
        )?;

        match lambert::solve(
            origin.position,
            destination.position,
            tof,
            self.central_mu,
            true,
            self.options.lambert_tol,
            self.options.lambert_maxiter,
        ) {
            Ok((v1, v2)) => Ok(Some(maneuver::score(
                TransferArc {
                    departure,
                    time_of_flight,
                    v1,
                    v2,
                },
                origin.velocity,
                destination.velocity,
                &self.targets,
            ))),
            Err(err) => {
                trace!(%departure, tof, %err, "no transfer arc");
                Ok(None)
            }
        }
    }

    /// Search `window`, returning the best candidate and the coarse grid.
    pub fn run(&self, window: &SearchWindow) -> Result<(TransferCandidate, PorkchopGrid), TransferError> {
        let departures: Vec<f64> = math::linspace(
            window.departure.start,
            window.departure.end,
            self.options.departure_samples,
        )
        .collect();
        let tofs: Vec<f64> = math::linspace(
            window.time_of_flight.start,
            window.time_of_flight.end,
            self.options.tof_samples,
        )
        .collect();

        let samples = departures
            .iter()
            .copied()
            .cartesian_product(tofs.iter().copied())
            .collect_vec();
        let candidates = samples
            .par_iter()
            .map(|&(departure, tof)| self.evaluate(departure, tof))
            .collect::<Result<Vec<_>, _>>()?;

        let porkchop = PorkchopGrid {
            departures: departures.iter().map(|&t| UT::new_seconds(t)).collect(),
            times_of_flight: tofs.iter().map(|&t| Duration::seconds_f64(t)).collect(),
            total_dv: candidates.iter().map(|c| c.map(|c| c.total_dv)).collect(),
        };

        let Some(coarse) = candidates
            .into_iter()
            .flatten()
            .min_by_key(|c| OrderedFloat(c.total_dv))
        else {
            return Err(TransferError::InfeasibleWindow {
                samples: samples.len(),
            });
        };
        debug!(
            departure = %coarse.arc.departure,
            tof = coarse.arc.time_of_flight.as_seconds_f64(),
            total_dv = coarse.total_dv,
            feasible = porkchop.feasible_count(),
            "coarse pass done"
        );

        let cell = [cell_width(&departures), cell_width(&tofs)];
        let best = self.refine(coarse, window, cell);
        debug!(
            departure = %best.arc.departure,
            tof = best.arc.time_of_flight.as_seconds_f64(),
            total_dv = best.total_dv,
            improvement = coarse.total_dv - best.total_dv,
            "refinement done"
        );
        Ok((best, porkchop))
    }

    /// Coordinate descent from `start`, each line search bounded to one
    /// coarse cell either side of the current point.
    fn refine(&self, start: TransferCandidate, window: &SearchWindow, cell: [f64; 2]) -> TransferCandidate {
        let bounds = [window.departure.clone(), window.time_of_flight.clone()];
        let mut best = start;
        for round in 0..self.options.refine_rounds {
            let mut improved = false;
            for axis in [Axis::Departure, Axis::TimeOfFlight] {
                let idx = axis as usize;
                let x = axis.get(&best);
                let lo = (x - cell[idx]).max(bounds[idx].start);
                let hi = (x + cell[idx]).min(bounds[idx].end);
                if !(hi > lo) {
                    continue;
                }

                let Some(x_new) = self.line_search(axis, &best, lo, hi) else {
                    continue;
                };
                let (departure, tof) = axis.with(&best, x_new);
                match self.evaluate(departure, tof) {
                    Ok(Some(c)) if c.total_dv < best.total_dv => {
                        best = c;
                        improved = true;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "could not evaluate refined point, keeping previous best");
                    }
                }
            }
            trace!(round, total_dv = best.total_dv, improved, "refinement round");
            if !improved {
                break;
            }
        }
        best
    }

    fn line_search(&self, axis: Axis, best: &TransferCandidate, lo: f64, hi: f64) -> Option<f64> {
        let problem = LineProblem {
            problem: self,
            axis,
            at: *best,
        };
        let solver = match GoldenSectionSearch::new(lo, hi).and_then(|s| s.with_tolerance(LINE_TOL)) {
            Ok(solver) => solver,
            Err(err) => {
                warn!(%err, lo, hi, "bad line search bracket");
                return None;
            }
        };
        let x0 = axis.get(best).clamp(lo, hi);
        let res = match Executor::new(problem, solver)
            .configure(|state| state.param(x0).max_iters(self.options.line_search_iters))
            .run()
        {
            Ok(res) => res,
            Err(err) => {
                warn!(%err, ?axis, "line search failed, keeping previous best");
                return None;
            }
        };
        trace!(?axis, best_cost = res.state.best_cost, iters = res.state.iter, "line search");
        res.state.best_param
    }
}

/// Spacing of a linspace grid, zero for a single sample.
fn cell_width(samples: &[f64]) -> f64 {
    match samples {
        [first, second, ..] => second - first,
        _ => 0.0,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    Departure = 0,
    TimeOfFlight = 1,
}

impl Axis {
    fn get(self, c: &TransferCandidate) -> f64 {
        match self {
            Axis::Departure => c.arc.departure.as_seconds_f64(),
            Axis::TimeOfFlight => c.arc.time_of_flight.as_seconds_f64(),
        }
    }

    /// `(departure, tof)` of `c` with this axis replaced by `x`.
    fn with(self, c: &TransferCandidate, x: f64) -> (f64, f64) {
        match self {
            Axis::Departure => (x, c.arc.time_of_flight.as_seconds_f64()),
            Axis::TimeOfFlight => (c.arc.departure.as_seconds_f64(), x),
        }
    }
}

struct LineProblem<'a, 'b> {
    problem: &'b Problem<'a>,
    axis: Axis,
    at: TransferCandidate,
}

impl<'a, 'b> CostFunction for LineProblem<'a, 'b> {
    type Param = f64;

    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let (departure, tof) = self.axis.with(&self.at, *param);
        Ok(self
            .problem
            .evaluate(departure, tof)?
            .map_or(INFEASIBLE_COST, |c| c.total_dv))
    }
}
