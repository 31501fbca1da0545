#![warn(clippy::unwrap_used, clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]
use std::path::{Path, PathBuf};

use color_eyre::eyre::{self, OptionExt, WrapErr};
use config::RunConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trajectorize::{
    bodies::SolarSystem,
    time::{Calendar, CalendarTime, UT},
    transfer::{self, TransferSolution},
};

mod config;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let path = PathBuf::from(
        std::env::args_os()
            .nth(1)
            .ok_or_eyre("usage: trajectorize <run.toml>")?,
    );
    let config = RunConfig::load(&path)?;
    let base = path.parent().unwrap_or(Path::new("."));
    let system = config.system(base)?;
    let request = config.transfer.request(&system)?;
    info!(
        origin = %system.lookup(request.origin)?.name,
        destination = %system.lookup(request.destination)?.name,
        bodies = system.len(),
        "searching"
    );

    let solution = transfer::compute_transfer(&system, &request, &config.search)?;
    print!("{}", report(&system, &solution, config.transfer.calendar)?);

    if let Some(out) = &config.porkchop {
        let out = base.join(out);
        let text = ron::ser::to_string_pretty(&solution.porkchop, ron::ser::PrettyConfig::default())?;
        std::fs::write(&out, text).wrap_err_with(|| format!("writing {}", out.display()))?;
        info!(path = %out.display(), "porkchop grid written");
    }
    Ok(())
}

fn date(ut: UT, calendar: Calendar) -> String {
    ut.to_calendar(calendar).to_string()
}

fn interval(seconds: f64, calendar: Calendar) -> String {
    CalendarTime::from_seconds(seconds, calendar).delta_string()
}

fn report(system: &SolarSystem, sol: &TransferSolution, calendar: Calendar) -> eyre::Result<String> {
    use std::fmt::Write;

    let origin = &system.lookup(sol.origin)?.name;
    let destination = &system.lookup(sol.destination)?.name;
    let central = &system.lookup(sol.central)?.name;
    let best = &sol.best;

    let mut out = String::new();
    writeln!(out, "{origin} -> {destination} (about {central})")?;
    writeln!(out, "  departure       {}", date(sol.departure(), calendar))?;
    writeln!(out, "  arrival         {}", date(sol.arrival(), calendar))?;
    writeln!(
        out,
        "  time of flight  {}",
        interval(sol.time_of_flight().as_seconds_f64(), calendar)
    )?;
    writeln!(out, "  departure dv    {:.1} m/s", best.departure_dv)?;
    if best.total_dv > best.departure_dv {
        writeln!(out, "  capture dv      {:.1} m/s", best.arrival_dv)?;
    } else {
        writeln!(out, "  arrival v_inf   {:.1} m/s", best.arrival_dv)?;
    }
    writeln!(out, "  total dv        {:.1} m/s", best.total_dv)?;
    writeln!(out, "  departure C3    {:.4} km^2/s^2", sol.c3() / 1e6)?;
    writeln!(
        out,
        "  transfer orbit  a = {:.0} m, e = {:.4}, i = {:.3} deg, angle = {:.1} deg",
        sol.semi_major_axis(),
        sol.eccentricity(),
        sol.inclination().to_degrees(),
        sol.transfer_angle.to_degrees()
    )?;
    if let Some(h) = &sol.departure_hyperbola {
        writeln!(
            out,
            "  escape          e = {:.4}, i = {:.3} deg, lan = {:.3} deg, argpe = {:.3} deg",
            h.e,
            h.i.to_degrees(),
            h.lan.to_degrees(),
            h.argpe.to_degrees()
        )?;
    }
    if let Some(h) = &sol.arrival_hyperbola {
        writeln!(
            out,
            "  approach        e = {:.4}, i = {:.3} deg, lan = {:.3} deg, argpe = {:.3} deg",
            h.e,
            h.i.to_degrees(),
            h.lan.to_degrees(),
            h.argpe.to_degrees()
        )?;
    }
    writeln!(
        out,
        "  porkchop        {}/{} samples feasible",
        sol.porkchop.feasible_count(),
        sol.porkchop.total_dv.len()
    )?;
    Ok(out)
}
