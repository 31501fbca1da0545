//! Entry point for hosts that can only pass and receive numbers.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::debug;

use crate::{
    bodies::{BodyId, SolarSystem},
    time::UT,
    transfer::{self, SearchOptions, TransferError, TransferRequest, TransferSolution},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ErrorCode {
    InvalidBody = 1,
    /// Capture requested without a usable radius: none given, or one at
    /// or below the destination's surface.
    MissingCaptureRadius = 2,
    InfeasibleWindow = 3,
    NonConvergence = 4,
    InvalidRequest = 5,
}

impl From<&TransferError> for ErrorCode {
    fn from(err: &TransferError) -> Self {
        match err {
            TransferError::UnknownBody(_) => ErrorCode::InvalidBody,
            TransferError::MissingCaptureRadius | TransferError::CaptureRadius { .. } => {
                ErrorCode::MissingCaptureRadius
            }
            TransferError::InfeasibleWindow { .. } => ErrorCode::InfeasibleWindow,
            TransferError::NonConvergence(_) => ErrorCode::NonConvergence,
            TransferError::SameBody(_)
            | TransferError::NestedBodies { .. }
            | TransferError::NoCommonAncestor { .. }
            | TransferError::ParkingRadius { .. }
            | TransferError::InvalidWindow(_)
            | TransferError::InvalidOptions(_) => ErrorCode::InvalidRequest,
        }
    }
}

/// Fixed-layout transfer summary. Times in seconds, speeds in m/s,
/// distances in m.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct TransferRecord {
    pub departure: f64,
    pub time_of_flight: f64,
    pub departure_dv: f64,
    pub arrival_dv: f64,
    pub total_dv: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
}

impl From<&TransferSolution> for TransferRecord {
    fn from(sol: &TransferSolution) -> Self {
        Self {
            departure: sol.departure().as_seconds_f64(),
            time_of_flight: sol.time_of_flight().as_seconds_f64(),
            departure_dv: sol.best.departure_dv,
            arrival_dv: sol.best.arrival_dv,
            total_dv: sol.best.total_dv,
            semi_major_axis: sol.semi_major_axis(),
            eccentricity: sol.eccentricity(),
        }
    }
}

/// Interpret a host's numeric body index.
#[allow(clippy::cast_sign_loss)]
fn body_index(system: &SolarSystem, index: f64) -> Result<BodyId, ErrorCode> {
    if index.fract() != 0.0 || !(0.0..system.len() as f64).contains(&index) {
        return Err(ErrorCode::InvalidBody);
    }
    Ok(BodyId(index as usize))
}

#[allow(clippy::cast_sign_loss)]
fn sample_count(n: f64) -> Result<usize, ErrorCode> {
    if n.fract() != 0.0 || !(n >= 1.0 && n <= u32::MAX as f64) {
        return Err(ErrorCode::InvalidRequest);
    }
    Ok(n as usize)
}

/// Compute a transfer from the host's positional arguments.
///
/// Body indices and sample counts arrive as plain numbers and are
/// checked here. `capture` is any non-zero value.
#[allow(clippy::too_many_arguments)]
pub fn calculate_transfer(
    system: &SolarSystem,
    departure: f64,
    origin: f64,
    destination: f64,
    departure_samples: f64,
    tof_samples: f64,
    parking_radius: f64,
    capture_radius: f64,
    capture: f64,
) -> Result<TransferRecord, ErrorCode> {
    let origin = body_index(system, origin)?;
    let destination = body_index(system, destination)?;
    let departure = UT::checked_seconds(departure).ok_or(ErrorCode::InvalidRequest)?;
    let capture = capture != 0.0;
    let request = TransferRequest {
        origin,
        destination,
        departure,
        parking_radius,
        capture,
        capture_radius: (capture_radius > 0.0).then_some(capture_radius),
        departure_half_width: None,
        time_of_flight: None,
    };
    let options = SearchOptions {
        departure_samples: sample_count(departure_samples)?,
        tof_samples: sample_count(tof_samples)?,
        ..SearchOptions::default()
    };

    match transfer::compute_transfer(system, &request, &options) {
        Ok(sol) => Ok(TransferRecord::from(&sol)),
        Err(err) => {
            debug!(%err, "transfer failed");
            Err(ErrorCode::from(&err))
        }
    }
}
