//! Deposit and withdrawal passes against a live storage

use std::time::Duration;
use tracing::{debug, info, warn};

use fieldhand_config::{StorageConfig, WorkerConfig};
use fieldhand_world::{Actor, CropType, Granary, Pacer, Result, SlotView, StorageSite};

use crate::plan::{plan_deposit, select_withdraw_slot};

/// Result of one deposit pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOutcome {
    /// No seeds of the crop are carried
    Empty,
    /// Storage was closed; it has been opened
    Opening,
    /// Storage is open but not all slots are visible yet
    AwaitingSlots,
    /// Metadata still loading; nothing was issued
    Waiting,
    /// Transfers were issued
    Deposited { moves: usize },
    /// Some item fits nowhere; transfers planned before it were issued
    StorageFull { moves: usize },
    Cancelled,
}

/// Result of one withdrawal pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Opening,
    AwaitingSlots,
    /// No slot holds the crop at positive quality
    NoSeeds,
    /// Nothing could be taken for lack of inventory room
    InventoryFull,
    /// Units that left the chosen slot
    Withdrew { slot: usize, units: u32 },
    /// Take requests changed nothing
    Stalled { slot: usize },
    Cancelled,
}

/// Runs deposit and withdrawal passes for one crop at a time
#[derive(Debug, Clone)]
pub struct Reconciler {
    storage: StorageConfig,
    storage_wait: Duration,
    take_interval: Duration,
    pacer: Pacer,
}

enum Visibility {
    Ready(Vec<SlotView>),
    Opening,
    Partial,
    Cancelled,
}

impl Reconciler {
    pub fn new(storage: StorageConfig, worker: &WorkerConfig, pacer: Pacer) -> Self {
        Self {
            storage,
            storage_wait: worker.storage_wait(),
            take_interval: worker.take_interval(),
            pacer,
        }
    }

    /// Move every carried seed of `crop` into storage
    pub async fn deposit<W>(&self, world: &W, site: &StorageSite, crop: CropType) -> Result<DepositOutcome>
    where
        W: Actor + Granary + ?Sized,
    {
        let items = world.carried_items().await?;
        if !items.iter().any(|i| crop.is_seed(&i.resource)) {
            return Ok(DepositOutcome::Empty);
        }

        let slots = match self.visible_slots(world, site).await? {
            Visibility::Ready(slots) => slots,
            Visibility::Opening => return Ok(DepositOutcome::Opening),
            Visibility::Partial => return Ok(DepositOutcome::AwaitingSlots),
            Visibility::Cancelled => return Ok(DepositOutcome::Cancelled),
        };

        let plan = plan_deposit(&items, &slots, crop, self.storage.slot_capacity);
        if plan.skipped > 0 {
            debug!("{} seed items still loading", plan.skipped);
        }

        for step in &plan.moves {
            debug!("Depositing {} x{} into slot {}", step.item, step.amount, step.slot);
            world.deposit(step.item, step.slot).await?;
        }

        let moves = plan.moves.len();
        if plan.is_full() {
            warn!("No storage slot can take more {} seeds", crop);
            return Ok(DepositOutcome::StorageFull { moves });
        }
        if moves == 0 {
            if !self.pacer.pause(self.storage_wait).await {
                return Ok(DepositOutcome::Cancelled);
            }
            return Ok(DepositOutcome::Waiting);
        }

        info!("Deposited {} stacks of {} seeds", moves, crop);
        Ok(DepositOutcome::Deposited { moves })
    }

    /// Fill free inventory slots with the best seeds of `crop` in storage
    pub async fn withdraw<W>(&self, world: &W, site: &StorageSite, crop: CropType) -> Result<WithdrawOutcome>
    where
        W: Actor + Granary + ?Sized,
    {
        let slots = match self.visible_slots(world, site).await? {
            Visibility::Ready(slots) => slots,
            Visibility::Opening => return Ok(WithdrawOutcome::Opening),
            Visibility::Partial => return Ok(WithdrawOutcome::AwaitingSlots),
            Visibility::Cancelled => return Ok(WithdrawOutcome::Cancelled),
        };

        let free = world.free_slots().await?;
        if free == 0 {
            return Ok(WithdrawOutcome::InventoryFull);
        }

        let Some(slot) = select_withdraw_slot(&slots, crop, free, self.storage.seed_weight) else {
            return Ok(WithdrawOutcome::NoSeeds);
        };

        let start = remaining_in(&slots, slot, crop);
        let mut remaining = start;
        debug!("Withdrawing {} seeds from slot {} ({} stored)", crop, slot, start);

        loop {
            let free = world.free_slots().await?;
            if free == 0 || remaining == 0 {
                break;
            }
            for _ in 0..free {
                world.take(slot).await?;
            }

            if !self.pacer.pause(self.take_interval).await {
                return Ok(WithdrawOutcome::Cancelled);
            }

            let after = remaining_in(&world.storage_slots().await?, slot, crop);
            if after >= remaining {
                debug!("Take round from slot {} made no progress", slot);
                break;
            }
            remaining = after;
        }

        let units = start - remaining;
        if units == 0 {
            return Ok(WithdrawOutcome::Stalled { slot });
        }
        info!("Withdrew {} {} seeds from slot {}", units, crop, slot);
        Ok(WithdrawOutcome::Withdrew { slot, units })
    }

    async fn visible_slots<W>(&self, world: &W, site: &StorageSite) -> Result<Visibility>
    where
        W: Granary + ?Sized,
    {
        let slots = world.storage_slots().await?;
        if slots.len() >= self.storage.slot_count {
            return Ok(Visibility::Ready(slots));
        }

        let visibility = if slots.is_empty() {
            debug!("Opening storage {} at {}", site.id, site.position);
            world.open_storage(site).await?;
            Visibility::Opening
        } else {
            debug!(
                "Storage shows {} of {} slots",
                slots.len(),
                self.storage.slot_count
            );
            Visibility::Partial
        };

        if self.pacer.pause(self.storage_wait).await {
            Ok(visibility)
        } else {
            Ok(Visibility::Cancelled)
        }
    }
}

/// Units of `crop` left in a slot; anything else counts as none
fn remaining_in(slots: &[SlotView], slot: usize, crop: CropType) -> u32 {
    slots
        .get(slot)
        .and_then(SlotView::contents)
        .filter(|c| crop.matches_name(&c.name))
        .map_or(0, |c| c.amount)
}
