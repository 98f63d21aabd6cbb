//! Slot selection for deposits and withdrawals
//!
//! Pure functions over a snapshot of storage slots; nothing here talks to the
//! world.

use fieldhand_world::{CarriedItem, CropType, ItemId, SlotView};

/// One requested transfer of a carried item into a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositMove {
    pub item: ItemId,
    pub slot: usize,
    pub amount: u32,
}

/// Outcome of planning a deposit pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositPlan {
    /// Transfers to issue, in order
    pub moves: Vec<DepositMove>,
    /// Seed items whose metadata has not loaded yet
    pub skipped: usize,
    /// First item no slot could take; nothing after it was planned
    pub overflow: Option<ItemId>,
    /// Planning stopped at a slot whose metadata has not loaded yet
    pub slots_pending: bool,
}

impl DepositPlan {
    pub fn is_full(&self) -> bool {
        self.overflow.is_some()
    }

    /// Nothing to issue now, but a later pass may succeed
    pub fn must_wait(&self) -> bool {
        self.moves.is_empty() && self.overflow.is_none() && (self.skipped > 0 || self.slots_pending)
    }
}

/// Plan where every carried seed of `crop` goes.
///
/// Each item lands in the first slot holding the same crop at equal quality
/// with room left under `capacity`, otherwise in the first empty slot if the
/// item fits under `capacity` on its own. Slots
/// are projected as moves are planned, so a single pass never overfills a
/// slot or books an empty one twice.
pub fn plan_deposit(
    items: &[CarriedItem],
    slots: &[SlotView],
    crop: CropType,
    capacity: u32,
) -> DepositPlan {
    let mut projected = slots.to_vec();
    let mut plan = DepositPlan::default();

    for item in items.iter().filter(|i| crop.is_seed(&i.resource)) {
        let Some(info) = item.info.as_ref() else {
            plan.skipped += 1;
            continue;
        };

        let merge = projected.iter().position(|slot| match slot {
            SlotView::Filled(stored) => {
                crop.matches_name(&stored.name)
                    && stored.quality == info.quality
                    && stored.amount.saturating_add(info.amount) <= capacity
            }
            _ => false,
        });

        let target = merge.or_else(|| {
            (info.amount <= capacity)
                .then(|| projected.iter().position(SlotView::is_empty))
                .flatten()
        });
        let Some(slot) = target else {
            if projected.iter().any(|s| matches!(s, SlotView::Pending)) {
                plan.slots_pending = true;
            } else {
                plan.overflow = Some(item.id);
            }
            break;
        };

        projected[slot] = match &projected[slot] {
            SlotView::Filled(stored) => {
                let mut stored = stored.clone();
                stored.amount += info.amount;
                SlotView::Filled(stored)
            }
            _ => SlotView::Filled(info.clone()),
        };
        plan.moves.push(DepositMove {
            item: item.id,
            slot,
            amount: info.amount,
        });
    }

    plan
}

/// Pick the slot to take seeds of `crop` from.
///
/// Only slots whose contents name the crop with positive quality qualify.
/// Among those holding at least `free_slots * seed_weight` units the highest
/// quality wins; if none holds that much, the highest quality overall. Ties go
/// to the lower slot index.
pub fn select_withdraw_slot(
    slots: &[SlotView],
    crop: CropType,
    free_slots: usize,
    seed_weight: u32,
) -> Option<usize> {
    let needed = u64::try_from(free_slots)
        .unwrap_or(u64::MAX)
        .saturating_mul(u64::from(seed_weight));

    let candidates: Vec<(usize, f64, u32)> = slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.contents().map(|c| (index, c)))
        .filter(|(_, c)| crop.matches_name(&c.name) && c.quality > 0.0)
        .map(|(index, c)| (index, c.quality, c.amount))
        .collect();

    highest_quality(candidates.iter().filter(|(_, _, amount)| u64::from(*amount) >= needed))
        .or_else(|| highest_quality(candidates.iter()))
}

/// Index of the best-quality candidate, first on ties
fn highest_quality<'a>(pool: impl Iterator<Item = &'a (usize, f64, u32)>) -> Option<usize> {
    pool.fold(None::<(usize, f64)>, |best, &(index, quality, _)| match best {
        Some((_, top)) if quality <= top => best,
        _ => Some((index, quality)),
    })
    .map(|(index, _)| index)
}
