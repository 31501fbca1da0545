use std::path::{Path, PathBuf};

use color_eyre::eyre::{self, bail, OptionExt, WrapErr};
use serde::Deserialize;
use time::Duration;
use trajectorize::{
    bodies::{BodyId, SolarSystem},
    time::{Calendar, UT},
    transfer::{SearchOptions, TransferRequest},
};

/// A run file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// RON body list to use instead of the built-in Kerbol system.
    /// Relative to the run file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Where to write the porkchop grid (RON). Relative to the run
    /// file.
    #[serde(default)]
    pub porkchop: Option<PathBuf>,
    #[serde(default)]
    pub search: SearchOptions,
    pub transfer: TransferConfig,
}

/// A body by catalog index or by name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BodyRef {
    Index(usize),
    Name(String),
}

impl BodyRef {
    pub fn resolve(&self, system: &SolarSystem) -> eyre::Result<BodyId> {
        match self {
            BodyRef::Index(i) => Ok(BodyId(*i)),
            BodyRef::Name(name) => system
                .find(name)
                .ok_or_else(|| eyre::eyre!("no body named {name:?} in the catalog")),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    pub origin: BodyRef,
    pub destination: BodyRef,
    /// Nominal departure, UT seconds.
    #[serde(default)]
    pub departure: f64,
    /// Parking orbit above the origin's surface (m).
    #[serde(default)]
    pub parking_altitude: Option<f64>,
    /// Parking orbit from the origin's center (m).
    #[serde(default)]
    pub parking_radius: Option<f64>,
    #[serde(default)]
    pub capture_altitude: Option<f64>,
    #[serde(default)]
    pub capture_radius: Option<f64>,
    /// Seconds either side of `departure`.
    #[serde(default)]
    pub departure_half_width: Option<f64>,
    /// `[min, max]` seconds.
    #[serde(default)]
    pub time_of_flight: Option<[f64; 2]>,
    #[serde(default)]
    pub calendar: Calendar,
}

impl RunConfig {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading run file {}", path.display()))?;
        toml::from_str(&text).wrap_err_with(|| format!("parsing run file {}", path.display()))
    }

    pub fn system(&self, base: &Path) -> eyre::Result<SolarSystem> {
        let Some(catalog) = &self.catalog else {
            return Ok(SolarSystem::default());
        };
        let path = base.join(catalog);
        let text = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("reading catalog {}", path.display()))?;
        ron::from_str(&text).wrap_err_with(|| format!("parsing catalog {}", path.display()))
    }
}

fn duration(seconds: f64, what: &str) -> eyre::Result<Duration> {
    Duration::checked_seconds_f64(seconds)
        .ok_or_else(|| eyre::eyre!("{what} of {seconds} s is out of range"))
}

/// Exactly one of an altitude above `body_radius` or a radius.
fn radius_from(altitude: Option<f64>, radius: Option<f64>, body_radius: f64, what: &str) -> eyre::Result<Option<f64>> {
    match (altitude, radius) {
        (Some(_), Some(_)) => bail!("give either {what}_altitude or {what}_radius, not both"),
        (Some(alt), None) => Ok(Some(body_radius + alt)),
        (None, radius) => Ok(radius),
    }
}

impl TransferConfig {
    pub fn request(&self, system: &SolarSystem) -> eyre::Result<TransferRequest> {
        let origin = self.origin.resolve(system)?;
        let destination = self.destination.resolve(system)?;
        let parking_radius = radius_from(
            self.parking_altitude,
            self.parking_radius,
            system.lookup(origin)?.radius,
            "parking",
        )?
        .ok_or_eyre("a parking_altitude or parking_radius is required")?;
        let capture_radius = radius_from(
            self.capture_altitude,
            self.capture_radius,
            system.lookup(destination)?.radius,
            "capture",
        )?;

        let departure = UT::checked_seconds(self.departure)
            .ok_or_else(|| eyre::eyre!("departure of {} s is out of range", self.departure))?;
        let departure_half_width = self
            .departure_half_width
            .map(|hw| duration(hw, "departure_half_width"))
            .transpose()?;
        let time_of_flight = self
            .time_of_flight
            .map(|[lo, hi]| eyre::Ok(duration(lo, "time_of_flight")?..duration(hi, "time_of_flight")?))
            .transpose()?;

        Ok(TransferRequest {
            origin,
            destination,
            departure,
            parking_radius,
            capture: capture_radius.is_some(),
            capture_radius,
            departure_half_width,
            time_of_flight,
        })
    }
}
