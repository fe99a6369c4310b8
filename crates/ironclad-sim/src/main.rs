//! Headless arena for the ironclad tank agents.

#![forbid(unsafe_code)]

mod errors;
mod map;
mod projectiles;
mod sim;

use clap::{Parser, ValueEnum};
use ironclad_core::AgentConfig;
use log::info;
use sim::{SimSettings, Simulation};
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Runs enemy tanks against a scripted player tank
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of AI tanks
    #[arg(short, long, default_value_t = 6)]
    agents: usize,

    /// Ticks to simulate
    #[arg(short, long, default_value_t = 1200)]
    ticks: u64,

    /// Seed for the arena layout and every agent
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 20)]
    hz: u32,

    /// Half the arena edge, in cells
    #[arg(long, default_value_t = 20)]
    half_extent: i32,

    /// Random wall segments to scatter
    #[arg(long, default_value_t = 12)]
    walls: usize,

    /// Pace ticks to wall-clock time instead of running flat out
    #[arg(long)]
    realtime: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut env_builder = env_logger::Builder::new();
    env_builder.filter_level(args.log_level.into());
    env_builder.parse_default_env();
    env_builder.init();

    let settings = SimSettings {
        agents: args.agents,
        seed: args.seed,
        hz: args.hz,
        half_extent: args.half_extent,
        wall_segments: args.walls,
    };
    let mut simulation = Simulation::new(settings, AgentConfig::default())?;
    info!("Starting simulation: {settings:?}");

    if args.realtime {
        let mut interval = time::interval(simulation.dt());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        for _ in 0..args.ticks {
            if simulation.is_finished() {
                break;
            }
            interval.tick().await;
            simulation.step();
        }
    } else {
        simulation.run_for(args.ticks);
    }

    let stats = simulation.stats();
    info!(
        "Finished after {} ticks: {} shots, {} hits, {:.0} damage, {} deaths, player {}",
        stats.ticks,
        stats.shots_fired,
        stats.hits,
        stats.damage_dealt,
        stats.deaths,
        if simulation.player_alive() { "alive" } else { "destroyed" }
    );
    for agent in simulation.agents() {
        info!("{}", agent.snapshot());
    }
    Ok(())
}
