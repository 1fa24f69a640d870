use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use bess_scheduler::config::Config;
use bess_scheduler::domain::{BatteryAsset, TimeSeries};
use bess_scheduler::report::Assessor;
use bess_scheduler::telemetry::init_tracing;

const USAGE: &str =
    "usage: bess-scheduler <scenario.json> [--config <config.toml>] [--output <report.json>]";

/// One horizon of inputs. `battery` overrides the configured asset.
#[derive(Debug, Deserialize)]
struct Scenario {
    solar_kw: Vec<f64>,
    load_kw: Vec<f64>,
    price_per_kwh: Vec<f64>,
    #[serde(default)]
    battery: Option<BatteryAsset>,
}

#[derive(Debug)]
struct Args {
    scenario: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut scenario = None;
    let mut config = None;
    let mut output = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(args.next().context("--config needs a path")?.into()),
            "--output" => output = Some(args.next().context("--output needs a path")?.into()),
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            path if scenario.is_none() => scenario = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }

    Ok(Args {
        scenario: scenario.context(USAGE)?,
        config,
        output,
    })
}

fn main() -> Result<()> {
    init_tracing();

    let args = parse_args(std::env::args().skip(1))?;

    let cfg = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    let raw = fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", args.scenario.display()))?;

    let asset = scenario.battery.unwrap_or(cfg.battery);
    let series = TimeSeries::new(scenario.solar_kw, scenario.load_kw, scenario.price_per_kwh)
        .context("invalid scenario series")?;

    info!(horizon = series.len(), capacity_kwh = asset.capacity_kwh, "running assessment");
    let assessment = Assessor::from_config(&cfg).assess(&asset, &series)?;

    let report = serde_json::to_string_pretty(&assessment)?;
    match &args.output {
        Some(path) => {
            fs::write(path, report).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{report}"),
    }

    Ok(())
}
