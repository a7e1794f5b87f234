//! # giant_app: demo host
//!
//! Runs one peer of a giant session against a simulated map, carrying the
//! session protocol over NATS.
//!
//! ## Startup Sequence
//!
//! 1. Load tunables (missing file means defaults).
//! 2. Connect to NATS (`--nats-url`, else `NATS_URL`, else `nats://localhost:4222`).
//! 3. Enter the tick loop as authority or replica.
//!
//! Console lines typed on stdin are run as debug commands
//! (`giantscheat`, `giantsscale <n>`, `giantsprefix <text>`).

mod tick;
mod world;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use giant_net::NatsConnection;
use giant_session::{GiantSession, Tunables};
use tick::{Peer, TickConfig, TickLoop};
use world::{ReplicaWorld, SimWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Authority,
    Replica,
}

#[derive(Debug, Parser)]
#[command(name = "giant_app", about = "Giant creature session demo over NATS")]
struct Args {
    /// Which side of the session to run
    #[arg(long, value_enum, default_value_t = RoleArg::Authority)]
    role: RoleArg,

    /// Number of ticks to run (0 = forever)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Ticks per second
    #[arg(long, default_value_t = 30.0, value_parser = parse_tick_rate)]
    tick_rate: f64,

    /// Tunables JSON file
    #[arg(long, default_value = "giants.json")]
    tunables: PathBuf,

    /// Seed for the promotion roll and the simulated map
    #[arg(long)]
    seed: Option<u64>,

    /// NATS server URL
    #[arg(long)]
    nats_url: Option<String>,
}

const MAX_TICK_RATE: f64 = 1000.0;

fn parse_tick_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if rate > 0.0 && rate <= MAX_TICK_RATE {
        Ok(rate)
    } else {
        Err(format!("tick rate must be in (0, {MAX_TICK_RATE}], got {raw}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("giant_app=info".parse()?))
        .init();

    let args = Args::parse();
    info!(role = ?args.role, "giant host starting");

    let tunables = Tunables::load(&args.tunables)?;
    info!(
        prefix = %tunables.name_prefix,
        scale = tunables.scale,
        cheat_mode = tunables.cheat_mode,
        "tunables loaded"
    );

    let session = match args.seed {
        Some(seed) => GiantSession::with_seed(tunables, seed),
        None => GiantSession::new(tunables),
    };
    let peer = match args.role {
        RoleArg::Authority => {
            let rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
                None => StdRng::from_entropy(),
            };
            Peer::Authority(SimWorld::new(rng))
        }
        RoleArg::Replica => Peer::Replica(ReplicaWorld::new()),
    };

    let conn = match &args.nats_url {
        Some(url) => NatsConnection::connect_to(url).await?,
        None => NatsConnection::connect().await?,
    };

    let config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
        tunables_path: Some(args.tunables),
    };

    let mut tick_loop = TickLoop::new(config, session, peer);
    tick_loop.run_async(&conn).await?;

    info!("giant host shut down");
    Ok(())
}
