//! fieldhand command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fieldhand_bus::{drain, NoticeBus, NoticeReceiver};
use fieldhand_config::{self, Config};
use fieldhand_field::{segment_for_harvest, segment_for_planting, Coord, Region, Segment, TileRange};
use fieldhand_world::sim::SimWorld;
use fieldhand_world::{CropType, InstantClock, Pacer, SlotView, StorageSite, TokioClock};
use fieldhand_worker::{Control, FarmWorker, TickOutcome};

/// Where the simulated actor starts and flees to
const SIM_HOME: Coord = Coord::new(-110, -110);
const SIM_GRANARY: StorageSite = StorageSite {
    id: 1,
    position: Coord::new(-55, -55),
};
/// Empty tiles between simulated fields
const SIM_FIELD_GAP: i32 = 2;

/// Initialize config
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing fieldhand...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    fieldhand_config::init()
        .await
        .context("Failed to write config")?;

    println!("\n◆ fieldhand initialized");
    println!("\nNext steps:");
    println!(
        "  1. Pick a crop in {}",
        fieldhand_config::config_path().display()
    );
    println!("  2. Try it out: fieldhand simulate --crop carrot");

    Ok(())
}

/// Show config and thresholds
pub async fn status_command() -> Result<()> {
    let config_path = fieldhand_config::config_path();

    println!("◆ fieldhand Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:   {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await.context("Failed to load config")?;
    let farming = &config.farming;
    println!(
        "Crop:     {}",
        farming
            .crop
            .map_or_else(|| "[Not set]".to_string(), |c| c.to_string())
    );
    println!(
        "Harvest:  {}",
        if farming.harvest { "[Enabled]" } else { "[Disabled]" }
    );
    println!(
        "Plant:    {}",
        if farming.plant { "[Enabled]" } else { "[Disabled]" }
    );
    println!(
        "Fields:   {}",
        if farming.cycle_fields {
            "cycle"
        } else {
            "once"
        }
    );
    println!("Tick:     every {}ms", config.worker.poll_interval_ms);

    let safety = &config.safety;
    println!(
        "Safety:   health < {:.2} teleports home, energy < {:.2} stops, stamina < {:.2} drinks",
        safety.min_health, safety.min_energy, safety.min_stamina
    );
    println!(
        "Storage:  {} slots of {} units",
        config.storage.slot_count, config.storage.slot_capacity
    );

    println!("\n◆ Ready");

    Ok(())
}

/// Print the harvest and planting bands of a region
pub fn plan_command(nw: Coord, se: Coord, json: bool) -> Result<()> {
    let region = Region::new(nw, se).context("Invalid region")?;
    let harvest = segment_for_harvest(&region);
    let planting = segment_for_planting(&region);

    if json {
        let plan = serde_json::json!({
            "region": region,
            "harvest": harvest,
            "planting": planting,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("◆ Region {}", region);
    print_bands("Harvest", &harvest);
    print_bands("Planting", &planting);
    Ok(())
}

fn print_bands(title: &str, segments: &[Segment]) {
    println!("\n{} bands ({}):", title, segments.len());
    for (i, segment) in segments.iter().enumerate() {
        println!(
            "  {:>3}  {} -> {}  {}x{} tiles  {}  anchor {}",
            i,
            segment.start(),
            segment.end(),
            segment.tile_width(),
            segment.tile_height(),
            if segment.starts_left() { "east" } else { "west" },
            segment.anchor()
        );
    }
}

/// Knobs of the `simulate` command
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub width: i32,
    pub height: i32,
    pub fields: usize,
    pub crop: Option<CropType>,
    pub ticks: usize,
    pub harvest: bool,
    pub plant: bool,
    pub once: bool,
    pub realtime: Option<u64>,
}

/// Run the worker over ripe simulated fields
pub async fn simulate_command(options: SimulateOptions) -> Result<()> {
    let mut config = Config::load().await.context("Failed to load config")?;
    let crop = options
        .crop
        .or(config.farming.crop)
        .context("No crop selected; pass --crop or set farming.crop")?;
    anyhow::ensure!(options.fields > 0, "At least one field is required");

    config.farming.crop = Some(crop);
    config.farming.harvest = options.harvest;
    config.farming.plant = options.plant;
    if options.once {
        config.farming.cycle_fields = false;
    }

    let mut world = SimWorld::new(SIM_HOME);
    let mut regions = Vec::new();
    let mut tiles = Vec::new();
    for i in 0..options.fields {
        let x = i32::try_from(i)? * (options.width + SIM_FIELD_GAP);
        let region = Region::from_tiles(
            Coord::new(x, 0),
            Coord::new(x + options.width, options.height),
        )
        .context("Invalid field size")?;
        let range = TileRange {
            first: Coord::new(x, 0),
            last: Coord::new(x + options.width - 1, options.height - 1),
        };
        world = world.with_crops(range, crop, 10.0, true);
        regions.push(region);
        tiles.push(range);
    }
    let world = Arc::new(world);

    let (bus, mut notices) = NoticeBus::channel();
    let control = Control::from_config(&config.farming, bus);
    for region in regions {
        control.register_field(region).await;
    }
    control.register_storage(SIM_GRANARY).await;
    let started = control.start().await;
    print_notices(&mut notices);
    started.context("Worker refused to start")?;

    println!("◆ Simulating {} field(s) of {}", options.fields, crop);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match options.realtime {
        Some(seconds) => {
            run_realtime(world.clone(), control, &config, &mut notices, seconds).await;
        }
        None => {
            let clock = Arc::new(InstantClock::new());
            let pacer = Pacer::new(clock.clone(), CancellationToken::new());
            let mut worker = FarmWorker::new(world.clone(), control, &config, pacer);

            let mut ran = 0;
            for _ in 0..options.ticks {
                let outcome = worker.tick().await;
                ran += 1;
                print_notices(&mut notices);
                if matches!(outcome, TickOutcome::Finished | TickOutcome::Halted(_)) {
                    break;
                }
            }
            println!(
                "\n◆ Ran {} ticks ({:?} of simulated waiting)",
                ran,
                clock.slept()
            );
            println!("Stage:    {}", worker.stage());
            println!("Field:    {}", worker.current_field());
        }
    }

    let mut standing = 0;
    let mut capacity = 0;
    for range in &tiles {
        standing += world.crops_on(*range).await;
        capacity += range.len();
    }
    println!("Crops:    {}/{}", standing, capacity);
    println!("Carried:  {} seeds", world.seed_units(crop).await);
    println!("Granary:");
    for (i, slot) in world.slots().await.iter().enumerate() {
        if let SlotView::Filled(info) = slot {
            println!(
                "  slot {}: {} x{} (q{})",
                i, info.name, info.amount, info.quality
            );
        }
    }

    Ok(())
}

/// Drive `FarmWorker::run` on the Tokio clock until the deadline or Ctrl+C
async fn run_realtime(
    world: Arc<SimWorld>,
    control: Control,
    config: &Config,
    notices: &mut NoticeReceiver,
    seconds: u64,
) {
    let stop = CancellationToken::new();
    let pacer = Pacer::new(Arc::new(TokioClock), stop.clone());
    let mut worker = FarmWorker::new(world, control, config, pacer);

    let supervise = async {
        let deadline = tokio::time::sleep(Duration::from_secs(seconds));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                Some(notice) = notices.recv() => println!("{}", notice),
                _ = &mut deadline => break,
                _ = tokio::signal::ctrl_c() => {
                    info!("◆ Shutdown signal received");
                    break;
                }
            }
        }
        stop.cancel();
    };
    tokio::join!(worker.run(), supervise);

    print_notices(notices);
    println!("\n◆ Worker stopped in stage {}", worker.stage());
}

fn print_notices(notices: &mut NoticeReceiver) {
    for notice in drain(notices) {
        println!("{}", notice);
    }
}
