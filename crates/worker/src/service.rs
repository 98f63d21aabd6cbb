//! Farm worker service
//!
//! One long-lived loop: every tick releases the hand, runs the safety check,
//! makes sure the current field is segmented and then performs at most one
//! step of the current stage. A tick never fails; world errors are logged and
//! the step is retried on the next tick.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use fieldhand_bus::Notice;
use fieldhand_config::Config;
use fieldhand_field::{Coord, Field, Granularity, Segment};
use fieldhand_storage::{DepositOutcome, Reconciler, WithdrawOutcome};
use fieldhand_world::{CropObject, CropType, Pacer, Result, StorageSite, World, WorldError};

use crate::control::Control;
use crate::safety::{HaltReason, SafetyMonitor, SafetyOutcome};
use crate::stage::{Stage, StageEvent, Toggles};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Inactive, or fields, storage or crop not chosen yet
    Idle,
    /// Segments of the field were computed; nothing else happened
    Segmented(usize),
    /// Waited on the actor or the storage
    Waiting,
    /// Issued an action or moved a cursor
    Acted,
    /// Entered a new stage
    Transitioned(Stage),
    Halted(HaltReason),
    /// Last field done and cycling is off
    Finished,
    /// A world call failed; tried again next tick
    Retrying,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    poll_interval: Duration,
    step_delay: Duration,
    settle: Duration,
    busy_wait: Duration,
}

/// Control values read at the top of a tick
#[derive(Debug, Clone, Copy)]
struct TickContext {
    /// Current field, if the index points at one
    field: Option<usize>,
    fields: usize,
    crop: CropType,
    site: StorageSite,
    toggles: Toggles,
}

/// Drives the harvest/plant cycle over the registered fields
pub struct FarmWorker<W> {
    world: Arc<W>,
    control: Control,
    safety: SafetyMonitor,
    reconciler: Reconciler,
    pacer: Pacer,
    timing: Timing,
    cycle_fields: bool,
    stage: Stage,
    field: usize,
    epoch: u64,
    last_warning: Option<String>,
}

impl<W: World> FarmWorker<W> {
    pub fn new(world: Arc<W>, control: Control, config: &Config, pacer: Pacer) -> Self {
        Self {
            world,
            control,
            safety: SafetyMonitor::new(config.safety.clone(), pacer.clone()),
            reconciler: Reconciler::new(config.storage.clone(), &config.worker, pacer.clone()),
            pacer,
            timing: Timing {
                poll_interval: config.worker.poll_interval(),
                step_delay: config.worker.step_delay(),
                settle: config.worker.settle(),
                busy_wait: config.worker.busy_wait(),
            },
            cycle_fields: config.farming.cycle_fields,
            stage: Stage::default(),
            field: 0,
            epoch: 0,
            last_warning: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Index of the field being worked
    pub fn current_field(&self) -> usize {
        self.field
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Tick until the stop token fires
    pub async fn run(&mut self) {
        let stop = self.pacer.stop_token().clone();
        info!(
            "◆ Farm worker started (tick every {}ms)",
            self.timing.poll_interval.as_millis()
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                outcome = self.tick() => outcome,
            };
            trace!("Tick: {:?}", outcome);

            if !self.pacer.pause(self.timing.poll_interval).await {
                break;
            }
        }

        self.shutdown().await;
        info!("◆ Farm worker stopped");
    }

    async fn shutdown(&self) {
        if let Err(e) = self.world.release_hand().await {
            warn!("Failed to release hand on shutdown: {}", e);
        }
        if let Err(e) = self.world.halt_movement().await {
            warn!("Failed to halt movement on shutdown: {}", e);
        }
    }

    /// Run one tick
    pub async fn tick(&mut self) -> TickOutcome {
        match self.step().await {
            Ok(outcome) => {
                if matches!(outcome, TickOutcome::Acted | TickOutcome::Transitioned(_)) {
                    self.last_warning = None;
                }
                outcome
            }
            Err(e) => {
                warn!("Tick failed, retrying: {}", e);
                TickOutcome::Retrying
            }
        }
    }

    async fn step(&mut self) -> Result<TickOutcome> {
        let snapshot = self.control.snapshot().await;
        if snapshot.epoch != self.epoch {
            debug!("Control was reset, starting over");
            self.epoch = snapshot.epoch;
            self.field = 0;
            self.stage = Stage::initial(snapshot.toggles);
            self.last_warning = None;
        }

        if !snapshot.active {
            return Ok(TickOutcome::Idle);
        }
        if !snapshot.toggles.any() {
            return Ok(self.halt(HaltReason::NothingEnabled).await);
        }
        if !snapshot.is_ready() {
            return Ok(TickOutcome::Idle);
        }
        let (Some(crop), Some(site)) = (snapshot.crop, snapshot.storage) else {
            return Ok(TickOutcome::Idle);
        };

        if let Some(stage) = self.stage.normalize(snapshot.toggles) {
            info!("Harvesting is disabled, switching to {}", stage);
            self.enter(stage).await;
        }

        self.world.release_hand().await?;

        let safety = self.safety.check(&*self.world).await?;
        if let SafetyOutcome::Halt(reason) = safety {
            return Ok(self.halt(reason).await);
        }
        if !safety.may_continue() {
            return Ok(TickOutcome::Waiting);
        }

        if self.field >= snapshot.fields {
            if self.cycle_fields {
                self.field = 0;
            } else if self.stage.is_pass() {
                return Ok(self.finish(snapshot.toggles).await);
            }
        }
        let field = (self.field < snapshot.fields).then_some(self.field);

        if let Some(index) = field {
            if self.control.with_field(index, Field::activate).await == Some(true) {
                info!("Field {} segmented", index);
                return Ok(TickOutcome::Segmented(index));
            }
        }

        let ctx = TickContext {
            field,
            fields: snapshot.fields,
            crop,
            site,
            toggles: snapshot.toggles,
        };

        match self.stage {
            Stage::Harvesting => self.harvest(&ctx).await,
            Stage::DepositSeedsAfterHarvest | Stage::DepositSeedsAfterPlant => {
                let outcome = self.reconciler.deposit(&*self.world, &ctx.site, ctx.crop).await?;
                Ok(self.after_deposit(outcome, &ctx).await)
            }
            Stage::Planting => self.plant(&ctx).await,
        }
    }

    async fn harvest(&mut self, ctx: &TickContext) -> Result<TickOutcome> {
        let Some(index) = ctx.field else {
            return Ok(TickOutcome::Idle);
        };
        if !self.pacer.pause(self.timing.step_delay).await {
            return Ok(TickOutcome::Waiting);
        }

        if self.world.free_slots().await? == 0 {
            debug!("Inventory full, depositing before harvesting on");
            let outcome = self.reconciler.deposit(&*self.world, &ctx.site, ctx.crop).await?;
            return Ok(self.after_deposit(outcome, ctx).await);
        }

        let segment = self
            .control
            .with_field(index, |f| f.current_segment(Granularity::Harvest))
            .await
            .flatten();
        let Some(segment) = segment else {
            return Ok(self.apply(StageEvent::FieldHarvested, ctx).await);
        };

        let position = self.world.position().await?;
        if !segment.contains(position) {
            return self.navigate(&segment).await;
        }

        let crops = self
            .world
            .crops_in(segment.bounds(), ctx.crop.plant_resource())
            .await?;
        let Some(target) = nearest_ripe(&crops, position) else {
            let cursor = self
                .control
                .with_field(index, |f| f.advance(Granularity::Harvest))
                .await;
            debug!("Harvesting next row (field {}, cursor {:?})", index, cursor);
            return Ok(TickOutcome::Acted);
        };

        if !self.world.is_idle().await? {
            return Ok(self.busy_wait().await);
        }
        self.world.harvest(target.id).await?;
        self.world.select_tiles(segment.tiles()).await?;
        Ok(TickOutcome::Acted)
    }

    async fn plant(&mut self, ctx: &TickContext) -> Result<TickOutcome> {
        let Some(index) = ctx.field else {
            return Ok(TickOutcome::Idle);
        };

        let segment = self
            .control
            .with_field(index, |f| f.current_segment(Granularity::Planting))
            .await
            .flatten();
        let Some(segment) = segment else {
            return Ok(self.apply(StageEvent::FieldPlanted, ctx).await);
        };

        let present = self
            .world
            .crops_in(segment.bounds(), ctx.crop.plant_resource())
            .await?
            .len();
        if present >= segment.expected_occupancy() {
            self.control
                .with_field(index, |f| f.advance(Granularity::Planting))
                .await;
            return Ok(TickOutcome::Acted);
        }

        let seed = self
            .world
            .carried_items()
            .await?
            .into_iter()
            .find(|item| ctx.crop.is_seed(&item.resource))
            .map(|item| item.id);
        let Some(seed) = seed else {
            let outcome = self.reconciler.withdraw(&*self.world, &ctx.site, ctx.crop).await?;
            return Ok(self.after_withdraw(outcome, ctx.crop));
        };

        let position = self.world.position().await?;
        if !segment.contains(position) {
            return self.navigate(&segment).await;
        }
        if !self.world.is_idle().await? {
            return Ok(self.busy_wait().await);
        }

        self.world.plant(seed).await?;
        self.world.select_tiles(segment.tiles()).await?;
        Ok(TickOutcome::Acted)
    }

    async fn after_deposit(&mut self, outcome: DepositOutcome, ctx: &TickContext) -> TickOutcome {
        match outcome {
            DepositOutcome::Empty if !self.stage.is_pass() => {
                self.apply(StageEvent::SeedsStowed, ctx).await
            }
            DepositOutcome::Empty => {
                self.warn_once("Inventory is full and holds no seeds to deposit".to_string());
                TickOutcome::Waiting
            }
            DepositOutcome::StorageFull { .. } => self.halt(HaltReason::StorageFull).await,
            DepositOutcome::Deposited { .. } => TickOutcome::Acted,
            DepositOutcome::Opening
            | DepositOutcome::AwaitingSlots
            | DepositOutcome::Waiting
            | DepositOutcome::Cancelled => TickOutcome::Waiting,
        }
    }

    fn after_withdraw(&mut self, outcome: WithdrawOutcome, crop: CropType) -> TickOutcome {
        match outcome {
            WithdrawOutcome::Withdrew { .. } => TickOutcome::Acted,
            WithdrawOutcome::NoSeeds => {
                self.warn_once(format!("No {} seeds in granary", crop));
                TickOutcome::Waiting
            }
            WithdrawOutcome::InventoryFull => {
                self.warn_once("Inventory is full, cannot take seeds".to_string());
                TickOutcome::Waiting
            }
            WithdrawOutcome::Stalled { .. }
            | WithdrawOutcome::Opening
            | WithdrawOutcome::AwaitingSlots
            | WithdrawOutcome::Cancelled => TickOutcome::Waiting,
        }
    }

    async fn navigate(&mut self, segment: &Segment) -> Result<TickOutcome> {
        let anchor = segment.anchor();
        if !self.pacer.pause(self.timing.settle).await {
            return Ok(TickOutcome::Waiting);
        }

        match self.world.move_to(anchor).await {
            Ok(()) => {}
            Err(WorldError::NavigationFailed(_)) => {
                self.warn_once(format!("Could not reach {}, retrying", anchor));
                return Ok(TickOutcome::Retrying);
            }
            Err(e) => return Err(e),
        }

        self.pacer.pause(self.timing.settle).await;
        Ok(TickOutcome::Acted)
    }

    async fn busy_wait(&self) -> TickOutcome {
        self.pacer.pause(self.timing.busy_wait).await;
        TickOutcome::Waiting
    }

    async fn apply(&mut self, event: StageEvent, ctx: &TickContext) -> TickOutcome {
        let from = self.stage;
        let Some(transition) = from.on(event, ctx.toggles) else {
            warn!("{:?} means nothing while {}", event, from);
            return TickOutcome::Waiting;
        };

        let finished_field = self.field;
        if transition.advance_field {
            self.field += 1;
            if self.field >= ctx.fields && self.cycle_fields {
                self.field = 0;
            }
        }
        self.stage = transition.to;
        if transition.reset_cursor {
            self.control.with_field(self.field, Field::reset_cursor).await;
        }

        let message = match (from, transition.to) {
            (_, Stage::DepositSeedsAfterHarvest | Stage::DepositSeedsAfterPlant) => {
                "Field finished, Depositing seeds"
            }
            (Stage::DepositSeedsAfterHarvest, Stage::Planting) => "Seeds deposited, planting.",
            (Stage::DepositSeedsAfterHarvest, _) => "Planting skipped. Next field",
            _ => "Seeds deposited, going to next field.",
        };
        self.control
            .notices()
            .publish(Notice::info(message).for_field(finished_field));
        info!("Now {} (field {})", self.stage, self.field);

        TickOutcome::Transitioned(self.stage)
    }

    /// Switch stage outside the table, resetting the cursor of pass stages
    async fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        if stage.is_pass() {
            self.control.with_field(self.field, Field::reset_cursor).await;
        }
    }

    async fn halt(&mut self, reason: HaltReason) -> TickOutcome {
        warn!("◆ Farm worker halted: {}", reason);
        self.control.halt(&reason.to_string()).await;
        TickOutcome::Halted(reason)
    }

    async fn finish(&mut self, toggles: Toggles) -> TickOutcome {
        self.control.finish().await;
        self.field = 0;
        self.enter(Stage::initial(toggles)).await;
        TickOutcome::Finished
    }

    /// Warn the operator unless this was the last warning sent
    fn warn_once(&mut self, text: String) {
        if self.last_warning.as_deref() == Some(text.as_str()) {
            return;
        }
        warn!("{}", text);
        self.control.notices().warn(text.clone());
        self.last_warning = Some(text);
    }
}

/// Closest ripe crop to `position`
fn nearest_ripe(crops: &[CropObject], position: Coord) -> Option<&CropObject> {
    crops
        .iter()
        .filter(|c| c.ripe)
        .min_by(|a, b| {
            a.position
                .distance(position)
                .total_cmp(&b.position.distance(position))
        })
}
