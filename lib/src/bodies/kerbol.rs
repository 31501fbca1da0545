//! The stock Kerbol system.
//!
//! All values are SI (`m`, `s`), with distances measured from the body's
//! center of mass rather than its surface. Mean anomalies are given at
//! UT 0.

use super::{Body, BodyId, Motion, SolarSystem};
use crate::{kepler::orbits::Orbit, time::UT};

pub const KERBOL: BodyId = BodyId(0);
pub const MOHO: BodyId = BodyId(1);
pub const EVE: BodyId = BodyId(2);
pub const GILLY: BodyId = BodyId(3);
pub const KERBIN: BodyId = BodyId(4);
pub const MUN: BodyId = BodyId(5);
pub const MINMUS: BodyId = BodyId(6);
pub const DUNA: BodyId = BodyId(7);
pub const IKE: BodyId = BodyId(8);
pub const DRES: BodyId = BodyId(9);
pub const JOOL: BodyId = BodyId(10);
pub const LAYTHE: BodyId = BodyId(11);
pub const VALL: BodyId = BodyId(12);
pub const TYLO: BodyId = BodyId(13);
pub const BOP: BodyId = BodyId(14);
pub const POL: BodyId = BodyId(15);
pub const EELOO: BodyId = BodyId(16);

#[allow(clippy::too_many_arguments)]
fn orbiting(
    name: &str,
    parent: BodyId,
    mu: f64,
    radius: f64,
    atmosphere_height: f64,
    soi: f64,
    [a, e, i, lan, argpe, ma0]: [f64; 6],
) -> Body {
    Body {
        name: name.into(),
        parent: Some(parent),
        mu,
        radius,
        atmosphere_height,
        soi,
        motion: Motion::Keplerian(Orbit {
            a,
            e,
            i: i.to_radians(),
            lan: lan.to_radians(),
            argpe: argpe.to_radians(),
            ma0,
            epoch: UT::default(),
        }),
    }
}

fn bodies() -> Vec<Body> {
    vec![
        Body {
            name: "Kerbol".into(),
            parent: None,
            mu: 1.172_332_8e18,
            radius: 261_600_000.0,
            atmosphere_height: 600_000.0,
            soi: f64::INFINITY,
            motion: Motion::at_rest(),
        },
        orbiting(
            "Moho",
            KERBOL,
            1.686_093_8e11,
            250_000.0,
            0.0,
            9_646_663.0,
            [5_263_138_304.0, 0.2, 7.0, 70.0, 15.0, 3.14],
        ),
        orbiting(
            "Eve",
            KERBOL,
            8.171_730_2e12,
            700_000.0,
            90_000.0,
            85_109_365.0,
            [9_832_684_544.0, 0.01, 2.1, 150.0, 0.0, 3.14],
        ),
        orbiting(
            "Gilly",
            EVE,
            8_289_449.8,
            13_000.0,
            0.0,
            126_123.27,
            [31_500_000.0, 0.55, 12.0, 80.0, 10.0, 0.9],
        ),
        orbiting(
            "Kerbin",
            KERBOL,
            3.531_600_0e12,
            600_000.0,
            70_000.0,
            84_159_286.0,
            [13_599_840_256.0, 0.0, 0.0, 0.0, 0.0, 3.14],
        ),
        orbiting(
            "Mun",
            KERBIN,
            6.513_839_8e10,
            200_000.0,
            0.0,
            2_429_559.1,
            [12_000_000.0, 0.0, 0.0, 0.0, 0.0, 1.7],
        ),
        orbiting(
            "Minmus",
            KERBIN,
            1.765_800_0e9,
            60_000.0,
            0.0,
            2_247_428.4,
            [47_000_000.0, 0.0, 6.0, 78.0, 38.0, 0.9],
        ),
        orbiting(
            "Duna",
            KERBOL,
            3.013_632_1e11,
            320_000.0,
            50_000.0,
            47_921_949.0,
            [20_726_155_264.0, 0.051, 0.06, 135.5, 0.0, 3.14],
        ),
        orbiting(
            "Ike",
            DUNA,
            1.856_836_9e10,
            130_000.0,
            0.0,
            1_049_598.9,
            [32_000_000.0, 0.03, 0.2, 0.0, 0.0, 1.7],
        ),
        orbiting(
            "Dres",
            KERBOL,
            2.148_448_9e10,
            138_000.0,
            0.0,
            32_832_840.0,
            [40_839_348_203.0, 0.145, 5.0, 280.0, 90.0, 3.14],
        ),
        orbiting(
            "Jool",
            KERBOL,
            2.825_280_0e14,
            6_000_000.0,
            200_000.0,
            2.455_985_2e9,
            [68_773_560_320.0, 0.05, 1.304, 52.0, 0.0, 0.1],
        ),
        orbiting(
            "Laythe",
            JOOL,
            1.962_000_0e12,
            500_000.0,
            50_000.0,
            3_723_645.8,
            [27_184_000.0, 0.0, 0.0, 0.0, 0.0, 3.14],
        ),
        orbiting(
            "Vall",
            JOOL,
            2.074_815_0e11,
            300_000.0,
            0.0,
            2_406_401.4,
            [43_152_000.0, 0.0, 0.0, 0.0, 0.0, 0.9],
        ),
        orbiting(
            "Tylo",
            JOOL,
            2.825_280_0e12,
            600_000.0,
            0.0,
            10_856_518.0,
            [68_500_000.0, 0.0, 0.025, 0.0, 0.0, 3.14],
        ),
        orbiting(
            "Bop",
            JOOL,
            2.486_834_9e9,
            65_000.0,
            0.0,
            1_221_060.9,
            [128_500_000.0, 0.235, 15.0, 10.0, 25.0, 0.9],
        ),
        orbiting(
            "Pol",
            JOOL,
            7.217_020_8e8,
            44_000.0,
            0.0,
            1_042_138.9,
            [179_890_000.0, 0.171, 4.25, 2.0, 15.0, 0.9],
        ),
        orbiting(
            "Eeloo",
            KERBOL,
            7.441_081_5e10,
            210_000.0,
            0.0,
            1.190_829_4e8,
            [90_118_820_000.0, 0.26, 6.15, 50.0, 260.0, 3.14],
        ),
    ]
}

/// The built-in Kerbol system catalog.
pub fn kerbol_system() -> SolarSystem {
    SolarSystem {
        bodies: bodies(),
        root: KERBOL,
    }
}
