//! fieldhand - harvest and replant fields unattended

use clap::{Parser, Subcommand};
use tracing::error;

use fieldhand_field::Coord;
use fieldhand_world::CropType;

mod commands;

use commands::{init_command, plan_command, simulate_command, status_command, SimulateOptions};

/// fieldhand - field worker for your terminal
#[derive(Parser)]
#[command(name = "fieldhand")]
#[command(about = "◆ Automated harvest and replant worker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config
    Init,
    /// Show config and thresholds
    Status,
    /// Print the bands a region is split into
    Plan {
        /// North-west corner in world units, e.g. 0,0
        #[arg(long, value_parser = parse_coord)]
        nw: Coord,
        /// South-east corner in world units, e.g. 110,330
        #[arg(long, value_parser = parse_coord)]
        se: Coord,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the worker against a simulated farm
    Simulate {
        /// Field width in tiles
        #[arg(long, default_value_t = 4)]
        width: i32,
        /// Field height in tiles
        #[arg(long, default_value_t = 6)]
        height: i32,
        /// Number of fields, laid out side by side
        #[arg(long, default_value_t = 1)]
        fields: usize,
        /// Crop to farm (defaults to the configured crop)
        #[arg(short, long)]
        crop: Option<CropType>,
        /// Maximum ticks to run
        #[arg(short, long, default_value_t = 500)]
        ticks: usize,
        /// Skip harvesting
        #[arg(long)]
        no_harvest: bool,
        /// Skip planting
        #[arg(long)]
        no_plant: bool,
        /// Stop after the last field instead of starting over
        #[arg(long)]
        once: bool,
        /// Run in real time for this many seconds (Ctrl+C stops early)
        #[arg(long)]
        realtime: Option<u64>,
    },
}

/// Parse "x,y" into a coordinate
fn parse_coord(s: &str) -> Result<Coord, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {:?}", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in {:?}: {}", s, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in {:?}: {}", s, e))?;
    Ok(Coord::new(x, y))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Plan { nw, se, json } => {
            if let Err(e) = plan_command(nw, se, json) {
                error!("Plan failed: {}", e);
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Simulate {
            width,
            height,
            fields,
            crop,
            ticks,
            no_harvest,
            no_plant,
            once,
            realtime,
        } => {
            let options = SimulateOptions {
                width,
                height,
                fields,
                crop,
                ticks,
                harvest: !no_harvest,
                plant: !no_plant,
                once,
                realtime,
            };
            if let Err(e) = simulate_command(options).await {
                error!("Simulation failed: {}", e);
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
