//! Steel Plant Headless Runner
//!
//! Loads a plant configuration, runs the simulation to completion (or to
//! `--until`), prints a production summary and the ranked bottlenecks.
//!
//! Usage:
//!   steel-plant-sim plant.json
//!   steel-plant-sim plant.json --seed 7 --until 720 --out snapshot.json
//!   steel-plant-sim plant.json --events --verbose

use std::error::Error;
use std::fs;
use std::process::ExitCode;

use log::{error, info};
use steel_plant_sim_core::{PlantConfig, PlantSimulation};

const USAGE: &str =
    "usage: steel-plant-sim <config.json> [--seed N] [--until T] [--out snapshot.json] [--events] [--verbose]";

#[derive(Debug, Default)]
struct Args {
    config_path: String,
    seed: Option<u64>,
    until: Option<f64>,
    out: Option<String>,
    events: bool,
    verbose: bool,
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    let mut config_path = None;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--seed" => {
                let value = argv.next().ok_or("--seed needs a value")?;
                args.seed = Some(value.parse().map_err(|_| format!("bad seed: {}", value))?);
            }
            "--until" => {
                let value = argv.next().ok_or("--until needs a value")?;
                args.until = Some(value.parse().map_err(|_| format!("bad time: {}", value))?);
            }
            "--out" => {
                args.out = Some(argv.next().ok_or("--out needs a path")?);
            }
            "--events" => args.events = true,
            "--verbose" => args.verbose = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {}", flag)),
            path => {
                if config_path.replace(path.to_string()).is_some() {
                    return Err("only one config file may be given".to_string());
                }
            }
        }
    }

    args.config_path = config_path.ok_or("missing config file")?;
    Ok(args)
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut config = PlantConfig::from_path(&args.config_path)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    info!("Loaded {} (hash {})", args.config_path, config.config_hash());

    let mut sim = PlantSimulation::new(config)?;
    let summary = match args.until {
        Some(until) => sim.run_until(until)?,
        None => sim.run()?,
    };

    if args.events {
        for event in sim.event_log().events() {
            println!(
                "{:>9.2}  {:<22} {:<12} {}",
                event.time(),
                event.event_type(),
                event.heat_id().unwrap_or("-"),
                event.unit_id().unwrap_or("-")
            );
        }
        println!();
    }

    let stats = sim.stats();
    let counters = sim.counters();
    println!("=== Steel Plant Simulation ===\n");
    println!("  End time:          {:.1} min", summary.end_time);
    println!("  Events processed:  {}", summary.events_processed);
    println!("  Heats generated:   {}", stats.heats_generated);
    println!("  Heats completed:   {}", stats.heats_completed);
    println!("  Heats in plant:    {}", stats.heats_in_plant);
    match stats.avg_cycle_time {
        Some(cycle) => println!("  Avg cycle time:    {:.1} min", cycle),
        None => println!("  Avg cycle time:    -"),
    }
    println!("  Takt time:         {:.1} min", stats.takt_time);
    if let Some(takt) = stats.takt_utilization {
        println!("  Takt utilization:  {:.0}%", takt * 100.0);
    }
    println!("  Car distance:      {:.1}", stats.total_car_distance);

    println!("\nConditions:");
    println!("  ladle shortage        {}", counters.ladle_shortage);
    println!("  transport starvation  {}", counters.transport_starvation);
    println!("  non-conforming        {}", counters.non_conforming);
    println!("  warming timeouts      {}", counters.warming_timeouts);
    println!("  caster turnarounds    {}", counters.caster_turnarounds);
    println!("  short sequences       {}", counters.short_sequences);
    println!("  stranded heats        {}", counters.stranded_heats);

    let bottlenecks = sim.bottlenecks();
    println!("\nBottlenecks:");
    if bottlenecks.is_empty() {
        println!("  none");
    }
    for (rank, b) in bottlenecks.iter().enumerate() {
        println!(
            "  {}. {:<16} score {:>5.2}  util {:>5.1}%  queue {:>5.2}  {:?}",
            rank + 1,
            b.entity_id,
            b.score,
            b.utilization * 100.0,
            b.queue_length,
            b.recommendation
        );
    }

    if let Some(out) = &args.out {
        fs::write(out, sim.snapshot_json()?)?;
        info!("Snapshot written to {}", out);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
