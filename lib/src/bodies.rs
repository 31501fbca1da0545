//! Definitions of celestial bodies.

use std::{fmt, sync::Arc};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kepler::orbits::Orbit;

pub mod kerbol;

/// Index of a body within a [`SolarSystem`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub usize);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a body moves relative to its parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Two-body motion on an elliptical orbit.
    Keplerian(Orbit),
    /// A fixed anchor with a constant state relative to the parent.
    Fixed {
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    },
}

impl Motion {
    /// The stationary anchor at the parent's origin.
    pub fn at_rest() -> Self {
        Motion::Fixed {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
        }
    }
}

/// A celestial body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Name of this body as displayed in KSP
    pub name: Arc<str>,
    /// The parent body of this body, if any. Only the root star has no
    /// parent.
    pub parent: Option<BodyId>,
    /// Standard gravitational parameter (`m^3/s^2`)
    pub mu: f64,
    /// Mean radius of the body's sphere (`m`)
    pub radius: f64,
    /// Height of the atmosphere above `radius` (`m`), zero if airless
    #[serde(default)]
    pub atmosphere_height: f64,
    /// Radius of this body's sphere of influence (`m`)
    #[serde(default = "infinite_soi")]
    pub soi: f64,
    /// Motion relative to the parent
    pub motion: Motion,
}

fn infinite_soi() -> f64 {
    f64::INFINITY
}

impl Body {
    pub fn is_star(&self) -> bool {
        self.parent.is_none()
    }

    /// The Keplerian orbit about the parent, if this body has one.
    pub fn orbit(&self) -> Option<&Orbit> {
        match &self.motion {
            Motion::Keplerian(orbit) => Some(orbit),
            Motion::Fixed { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("no body with id {0} in the catalog")]
pub struct UnknownBody(pub BodyId);

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("the catalog is empty")]
    Empty,
    #[error("{name}: gravitational parameter {mu} must be positive")]
    NonPositiveMu { name: Arc<str>, mu: f64 },
    #[error("{name}: radius {radius} must be positive")]
    NonPositiveRadius { name: Arc<str>, radius: f64 },
    #[error("{name}: semi-major axis {a} must be positive")]
    NonPositiveSemiMajorAxis { name: Arc<str>, a: f64 },
    #[error("{name}: eccentricity {e} is outside [0, 1)")]
    InvalidEccentricity { name: Arc<str>, e: f64 },
    #[error("{name}: orbital elements must be finite")]
    NonFiniteElements { name: Arc<str> },
    #[error("{name}: parent {parent} does not exist")]
    MissingParent { name: Arc<str>, parent: BodyId },
    #[error("{name}: parent chain does not reach the root")]
    ParentCycle { name: Arc<str> },
    #[error("both {first} and {second} have no parent")]
    MultipleRoots { first: Arc<str>, second: Arc<str> },
    #[error("no root body without a parent")]
    NoRoot,
    #[error("{name}: the root body cannot orbit anything")]
    RootHasOrbit { name: Arc<str> },
}

/// The body catalog. Immutable once built; ids index into `bodies`.
#[derive(Clone, Debug, PartialEq)]
pub struct SolarSystem {
    bodies: Vec<Body>,
    root: BodyId,
}

impl SolarSystem {
    /// Validate a list of bodies and build the catalog.
    pub fn new(bodies: Vec<Body>) -> Result<Self, ConfigurationError> {
        if bodies.is_empty() {
            return Err(ConfigurationError::Empty);
        }

        let mut root: Option<BodyId> = None;
        for (idx, body) in bodies.iter().enumerate() {
            let name = body.name.clone();
            if !(body.mu > 0.0) {
                return Err(ConfigurationError::NonPositiveMu { name, mu: body.mu });
            }
            if !(body.radius > 0.0) {
                return Err(ConfigurationError::NonPositiveRadius {
                    name,
                    radius: body.radius,
                });
            }
            match &body.motion {
                Motion::Keplerian(orbit) => {
                    if [orbit.a, orbit.e, orbit.i, orbit.lan, orbit.argpe, orbit.ma0]
                        .iter()
                        .any(|x| !x.is_finite())
                    {
                        return Err(ConfigurationError::NonFiniteElements { name });
                    }
                    if orbit.a <= 0.0 {
                        return Err(ConfigurationError::NonPositiveSemiMajorAxis {
                            name,
                            a: orbit.a,
                        });
                    }
                    if !(0.0..1.0).contains(&orbit.e) {
                        return Err(ConfigurationError::InvalidEccentricity { name, e: orbit.e });
                    }
                }
                Motion::Fixed { position, velocity } => {
                    if position.iter().chain(velocity.iter()).any(|x| !x.is_finite()) {
                        return Err(ConfigurationError::NonFiniteElements { name });
                    }
                }
            }
            match body.parent {
                None => {
                    if let Some(first) = root {
                        return Err(ConfigurationError::MultipleRoots {
                            first: bodies[first.0].name.clone(),
                            second: name,
                        });
                    }
                    if body.orbit().is_some() {
                        return Err(ConfigurationError::RootHasOrbit { name });
                    }
                    root = Some(BodyId(idx));
                }
                Some(parent) if parent.0 >= bodies.len() || parent.0 == idx => {
                    return Err(ConfigurationError::MissingParent { name, parent });
                }
                Some(_) => {}
            }
        }
        let root = root.ok_or(ConfigurationError::NoRoot)?;

        // Every chain must reach the root in fewer steps than there are bodies.
        for body in &bodies {
            let mut cur = body.parent;
            let mut steps = 0;
            while let Some(id) = cur {
                steps += 1;
                if steps > bodies.len() {
                    return Err(ConfigurationError::ParentCycle {
                        name: body.name.clone(),
                    });
                }
                cur = bodies[id.0].parent;
            }
        }

        Ok(Self { bodies, root })
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn root(&self) -> BodyId {
        self.root
    }

    pub fn lookup(&self, id: BodyId) -> Result<&Body, UnknownBody> {
        self.bodies.get(id.0).ok_or(UnknownBody(id))
    }

    /// Find a body by name, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|b| b.name.eq_ignore_ascii_case(name))
            .map(BodyId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    /// Bodies orbiting `id` directly.
    pub fn satellites(&self, id: BodyId) -> impl Iterator<Item = BodyId> + '_ {
        self.iter()
            .filter(move |(_, b)| b.parent == Some(id))
            .map(|(i, _)| i)
    }

    /// Ancestors of `id`, nearest first, ending at the root.
    pub fn parent_chain(&self, id: BodyId) -> Result<Vec<BodyId>, UnknownBody> {
        let mut chain = vec![];
        let mut cur = self.lookup(id)?.parent;
        while let Some(parent) = cur {
            chain.push(parent);
            cur = self.bodies[parent.0].parent;
        }
        Ok(chain)
    }

    /// Is `ancestor` on the parent chain of `id`?
    pub fn is_ancestor(&self, ancestor: BodyId, id: BodyId) -> Result<bool, UnknownBody> {
        self.lookup(ancestor)?;
        Ok(self.parent_chain(id)?.contains(&ancestor))
    }

    /// The nearest body that is an ancestor of both `a` and `b`.
    pub fn common_ancestor(&self, a: BodyId, b: BodyId) -> Result<Option<BodyId>, UnknownBody> {
        let chain_b = self.parent_chain(b)?;
        Ok(self
            .parent_chain(a)?
            .into_iter()
            .find(|id| chain_b.contains(id)))
    }

    /// The ancestor of `id` (or `id` itself) that directly orbits `central`.
    pub fn child_toward(&self, central: BodyId, id: BodyId) -> Result<Option<BodyId>, UnknownBody> {
        let mut cur = id;
        loop {
            match self.lookup(cur)?.parent {
                Some(parent) if parent == central => return Ok(Some(cur)),
                Some(parent) => cur = parent,
                None => return Ok(None),
            }
        }
    }
}

impl Serialize for SolarSystem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bodies.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SolarSystem {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bodies = Vec::<Body>::deserialize(deserializer)?;
        SolarSystem::new(bodies).map_err(serde::de::Error::custom)
    }
}

impl Default for SolarSystem {
    fn default() -> Self {
        kerbol::kerbol_system()
    }
}
