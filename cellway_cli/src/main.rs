use cellway_engine::{CellwayConfig, RoutingMode};
use clap::{Parser, Subcommand, ValueEnum};
use mimalloc::MiMalloc;
use tracing::info;

use crate::{
    route::{CompareArgs, RouteArgs},
    towers::TowersArgs,
};

mod parsers;
mod route;
mod towers;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Re-rank routing provider alternatives
    Provider,
    /// Signal-weighted search on the road network
    Graph,
}

impl From<Mode> for RoutingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Provider => RoutingMode::ProviderAlternatives,
            Mode::Graph => RoutingMode::SignalAwareGraph,
        }
    }
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,

    /// Overrides CELLWAY_ROUTING_MODE
    #[arg(short, long, value_enum, global = true)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Computes one optimized route
    #[command(visible_alias = "r")]
    Route {
        #[command(flatten)]
        args: RouteArgs,
    },
    /// Computes the fastest, cell coverage and balanced routes side by side
    Compare {
        #[command(flatten)]
        args: CompareArgs,
    },
    /// Lists the cell towers of an area
    Towers {
        #[command(flatten)]
        args: TowersArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut config = CellwayConfig::from_env()?;
    if let Some(mode) = cli.mode {
        config.optimizer.routing_mode = mode.into();
    }
    info!("Routing mode: {}", config.optimizer.routing_mode);

    match cli.command {
        Some(Commands::Route { args }) => route::run_route(args, config).await?,
        Some(Commands::Compare { args }) => route::run_compare(args, config).await?,
        Some(Commands::Towers { args }) => towers::run(args, config).await?,
        None => {}
    }

    Ok(())
}
