//! Body ephemerides from the catalog.

use thiserror::Error;

use crate::{
    bodies::{BodyId, Motion, SolarSystem, UnknownBody},
    kepler::orbits::{KeplerError, ReferenceFrame, StateVector, KEPLER_MAXITER, KEPLER_TOL},
    time::UT,
};

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum EphemerisError {
    #[error(transparent)]
    UnknownBody(#[from] UnknownBody),
    #[error("{ancestor} is not an ancestor of {body}")]
    NotAncestor { body: BodyId, ancestor: BodyId },
    #[error("ephemeris of {body} failed: {source}")]
    Kepler { body: BodyId, source: KeplerError },
}

/// State of `body` at `epoch` relative to its immediate parent.
///
/// The root star has no parent and is reported at rest at its own
/// origin.
pub fn state_at(system: &SolarSystem, body: BodyId, epoch: UT) -> Result<StateVector, EphemerisError> {
    let b = system.lookup(body)?;
    let frame = ReferenceFrame::BodyCenteredInertial(b.parent.unwrap_or(body));
    match &b.motion {
        Motion::Keplerian(orbit) => {
            let parent = system.lookup(b.parent.unwrap_or(body))?;
            orbit
                .sv_at(parent.mu, frame, epoch, KEPLER_TOL, KEPLER_MAXITER)
                .map_err(|source| EphemerisError::Kepler { body, source })
        }
        Motion::Fixed { position, velocity } => Ok(StateVector {
            frame,
            position: *position,
            velocity: *velocity,
            time: epoch,
        }),
    }
}

/// State of `body` at `epoch` relative to `ancestor`, summing each
/// parent-relative segment of the chain between them.
///
/// `ancestor` may be `body` itself, giving the frame origin.
pub fn state_in_common_frame(
    system: &SolarSystem,
    body: BodyId,
    epoch: UT,
    ancestor: BodyId,
) -> Result<StateVector, EphemerisError> {
    let frame = ReferenceFrame::BodyCenteredInertial(ancestor);
    let mut sv = StateVector::zero(frame, epoch);
    if body == ancestor {
        system.lookup(body)?;
        return Ok(sv);
    }
    if !system.is_ancestor(ancestor, body)? {
        return Err(EphemerisError::NotAncestor { body, ancestor });
    }

    let mut cur = body;
    while cur != ancestor {
        let segment = state_at(system, cur, epoch)?;
        sv.position += segment.position;
        sv.velocity += segment.velocity;
        cur = segment.frame.body();
    }
    Ok(sv)
}
