//! Deterministic in-memory world
//!
//! Every action completes synchronously: `move_to` arrives at once and a
//! confirmed selection applies its harvest or planting immediately. Crops ripen
//! after a configurable number of crop queries. Used by the integration tests
//! and the `simulate` command.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use fieldhand_field::{Coord, Rect, TileRange, TILE_SIZE};

use crate::{
    Actor, CarriedItem, CropId, CropObject, CropType, Fieldwork, Granary, ItemId, ItemInfo,
    Meters, Navigator, Result, SlotView, StorageSite, Survival, WorldError,
};

/// Units that fit in one inventory slot
pub const STACK_SIZE: u32 = 50;

/// Something the simulated world did, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Moved(Coord),
    NavigationFailed(Coord),
    StorageOpened(u64),
    Harvested { crops: usize },
    Planted { crops: usize },
    Took { slot: usize, amount: u32 },
    Deposited { slot: usize, item: ItemId },
    DepositRejected { slot: usize, item: ItemId },
    MovementHalted,
    Drank,
    TeleportedHome,
}

#[derive(Debug, Clone)]
struct SimCrop {
    id: CropId,
    crop: CropType,
    quality: f64,
    /// Crop-query count at which it becomes harvestable
    ripe_at: u64,
}

#[derive(Debug, Clone, Copy)]
enum PendingAction {
    Harvest(CropType),
    Plant(ItemId),
}

#[derive(Debug)]
struct SimState {
    position: Coord,
    home: Coord,
    meters: Meters,
    idle: bool,
    inventory_capacity: usize,
    items: Vec<CarriedItem>,
    crops: BTreeMap<Coord, SimCrop>,
    slots: Vec<SlotView>,
    storage_open: bool,
    navigation_blocked: bool,
    pending: Option<PendingAction>,
    next_id: u64,
    polls: u64,
    growth_polls: u64,
    seed_yield: u32,
    drink_gain: f64,
    events: Vec<SimEvent>,
}

impl SimState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn free_slots(&self) -> usize {
        self.inventory_capacity.saturating_sub(self.items.len())
    }

    fn is_ripe(&self, crop: &SimCrop) -> bool {
        self.polls >= crop.ripe_at
    }

    /// Merge units into existing stacks, then open new ones; returns units that fit
    fn stow(&mut self, resource: &str, name: &str, quality: f64, mut amount: u32) -> u32 {
        let wanted = amount;
        for item in self.items.iter_mut().filter(|i| i.resource == resource) {
            if let Some(info) = item.info.as_mut() {
                if info.quality == quality && info.amount < STACK_SIZE {
                    let moved = amount.min(STACK_SIZE - info.amount);
                    info.amount += moved;
                    amount -= moved;
                }
            }
            if amount == 0 {
                return wanted;
            }
        }
        while amount > 0 && self.free_slots() > 0 {
            let moved = amount.min(STACK_SIZE);
            let id = ItemId(self.next_id());
            self.items.push(CarriedItem {
                id,
                resource: resource.to_string(),
                info: Some(ItemInfo::new(name, quality, moved)),
            });
            amount -= moved;
        }
        wanted - amount
    }

    fn harvest_range(&mut self, crop: CropType, tiles: TileRange) -> usize {
        let ripe: Vec<Coord> = self
            .crops
            .iter()
            .filter(|(tile, c)| tiles.contains(**tile) && c.crop == crop && self.is_ripe(c))
            .map(|(tile, _)| *tile)
            .collect();

        let mut harvested = 0;
        for tile in ripe {
            if self.free_slots() == 0 && !self.has_room_for(crop) {
                break;
            }
            if let Some(plant) = self.crops.remove(&tile) {
                let name = seed_name(crop);
                self.stow(crop.seed_resource(), &name, plant.quality, self.seed_yield);
                harvested += 1;
            }
        }
        harvested
    }

    fn has_room_for(&self, crop: CropType) -> bool {
        self.items.iter().any(|i| {
            i.resource == crop.seed_resource()
                && i.info.as_ref().is_some_and(|info| info.amount < STACK_SIZE)
        })
    }

    fn plant_range(&mut self, held: ItemId, tiles: TileRange) -> usize {
        let Some(resource) = self
            .items
            .iter()
            .find(|i| i.id == held)
            .map(|i| i.resource.clone())
        else {
            return 0;
        };
        let Some(crop) = CropType::ALL.into_iter().find(|c| c.is_seed(&resource)) else {
            return 0;
        };

        let mut planted = 0;
        for tile in tiles.tiles() {
            if self.crops.contains_key(&tile) {
                continue;
            }
            let Some(quality) = self.consume_seed(held, &resource) else {
                break;
            };
            let id = CropId(self.next_id());
            let ripe_at = self.polls.saturating_add(self.growth_polls);
            self.crops.insert(
                tile,
                SimCrop {
                    id,
                    crop,
                    quality,
                    ripe_at,
                },
            );
            planted += 1;
        }
        planted
    }

    /// Take one unit, preferring the held stack
    fn consume_seed(&mut self, held: ItemId, resource: &str) -> Option<f64> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == held)
            .or_else(|| self.items.iter().position(|i| i.resource == resource))?;

        let info = self.items[index].info.as_mut()?;
        let quality = info.quality;
        info.amount -= 1;
        if info.amount == 0 {
            self.items.remove(index);
        }
        Some(quality)
    }
}

/// Display name of a crop's seed item
pub fn seed_name(crop: CropType) -> String {
    format!("{} Seed", crop.display_name())
}

/// In-memory world implementing every capability trait
#[derive(Debug)]
pub struct SimWorld {
    state: Mutex<SimState>,
}

impl SimWorld {
    /// Empty world with the actor standing at `home`
    pub fn new(home: Coord) -> Self {
        Self {
            state: Mutex::new(SimState {
                position: home,
                home,
                meters: Meters::default(),
                idle: true,
                inventory_capacity: 16,
                items: Vec::new(),
                crops: BTreeMap::new(),
                slots: vec![SlotView::Empty; 10],
                storage_open: false,
                navigation_blocked: false,
                pending: None,
                next_id: 0,
                polls: 0,
                growth_polls: 0,
                seed_yield: 3,
                drink_gain: 0.3,
                events: Vec::new(),
            }),
        }
    }

    /// Number of inventory slots
    pub fn with_inventory(mut self, capacity: usize) -> Self {
        self.state.get_mut().inventory_capacity = capacity;
        self
    }

    /// Replace the storage slots
    pub fn with_storage(mut self, slots: Vec<SlotView>) -> Self {
        self.state.get_mut().slots = slots;
        self
    }

    /// Crop queries a planted crop needs before it ripens
    pub fn with_growth(mut self, polls: u64) -> Self {
        self.state.get_mut().growth_polls = polls;
        self
    }

    /// Seed units each harvested crop yields
    pub fn with_seed_yield(mut self, units: u32) -> Self {
        self.state.get_mut().seed_yield = units;
        self
    }

    pub fn with_meters(mut self, meters: Meters) -> Self {
        self.state.get_mut().meters = meters;
        self
    }

    /// Fill every tile of `tiles` with a crop; unripe ones stay unripe until `ripen_all`
    pub fn with_crops(mut self, tiles: TileRange, crop: CropType, quality: f64, ripe: bool) -> Self {
        let state = self.state.get_mut();
        for tile in tiles.tiles() {
            let id = CropId(state.next_id());
            let ripe_at = if ripe { 0 } else { u64::MAX };
            state.crops.insert(
                tile,
                SimCrop {
                    id,
                    crop,
                    quality,
                    ripe_at,
                },
            );
        }
        self
    }

    /// Put seed units in the inventory
    pub fn with_seeds(mut self, crop: CropType, quality: f64, amount: u32) -> Self {
        let name = seed_name(crop);
        self.state
            .get_mut()
            .stow(crop.seed_resource(), &name, quality, amount);
        self
    }

    /// Put an arbitrary item in the inventory
    pub fn with_item(mut self, resource: &str, info: Option<ItemInfo>) -> Self {
        let state = self.state.get_mut();
        let id = ItemId(state.next_id());
        state.items.push(CarriedItem {
            id,
            resource: resource.to_string(),
            info,
        });
        self
    }

    pub async fn set_meters(&self, meters: Meters) {
        self.state.lock().await.meters = meters;
    }

    pub async fn set_idle(&self, idle: bool) {
        self.state.lock().await.idle = idle;
    }

    pub async fn set_navigation_blocked(&self, blocked: bool) {
        self.state.lock().await.navigation_blocked = blocked;
    }

    /// Make every standing crop ripe
    pub async fn ripen_all(&self) {
        let mut state = self.state.lock().await;
        for crop in state.crops.values_mut() {
            crop.ripe_at = 0;
        }
    }

    pub async fn crop_count(&self) -> usize {
        self.state.lock().await.crops.len()
    }

    /// Crops standing on a tile range
    pub async fn crops_on(&self, tiles: TileRange) -> usize {
        let state = self.state.lock().await;
        state.crops.keys().filter(|t| tiles.contains(**t)).count()
    }

    pub async fn slots(&self) -> Vec<SlotView> {
        self.state.lock().await.slots.clone()
    }

    pub async fn items(&self) -> Vec<CarriedItem> {
        self.state.lock().await.items.clone()
    }

    /// Seed units of a crop in the inventory
    pub async fn seed_units(&self, crop: CropType) -> u32 {
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .filter(|i| crop.is_seed(&i.resource))
            .filter_map(|i| i.info.as_ref().map(|info| info.amount))
            .sum()
    }

    pub async fn events(&self) -> Vec<SimEvent> {
        self.state.lock().await.events.clone()
    }

    /// How many recorded events satisfy `predicate`
    pub async fn count_events(&self, predicate: impl Fn(&SimEvent) -> bool) -> usize {
        self.state
            .lock()
            .await
            .events
            .iter()
            .filter(|e| predicate(e))
            .count()
    }
}

#[async_trait]
impl Actor for SimWorld {
    async fn position(&self) -> Result<Coord> {
        Ok(self.state.lock().await.position)
    }

    async fn is_idle(&self) -> Result<bool> {
        Ok(self.state.lock().await.idle)
    }

    async fn meters(&self) -> Result<Meters> {
        Ok(self.state.lock().await.meters)
    }

    async fn free_slots(&self) -> Result<usize> {
        Ok(self.state.lock().await.free_slots())
    }

    async fn carried_items(&self) -> Result<Vec<CarriedItem>> {
        Ok(self.state.lock().await.items.clone())
    }

    async fn release_hand(&self) -> Result<()> {
        self.state.lock().await.pending = None;
        Ok(())
    }
}

#[async_trait]
impl Navigator for SimWorld {
    async fn move_to(&self, destination: Coord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.navigation_blocked {
            state.events.push(SimEvent::NavigationFailed(destination));
            return Err(WorldError::NavigationFailed(destination));
        }
        state.position = destination;
        state.storage_open = false;
        state.events.push(SimEvent::Moved(destination));
        trace!("sim: moved to {}", destination);
        Ok(())
    }

    async fn halt_movement(&self) -> Result<()> {
        self.state.lock().await.events.push(SimEvent::MovementHalted);
        Ok(())
    }
}

#[async_trait]
impl Fieldwork for SimWorld {
    async fn crops_in(&self, area: Rect, resource: &str) -> Result<Vec<CropObject>> {
        let mut state = self.state.lock().await;
        state.polls += 1;

        let half = TILE_SIZE / 2;
        let found = state
            .crops
            .iter()
            .filter(|(_, c)| c.crop.plant_resource() == resource)
            .map(|(tile, c)| CropObject {
                id: c.id,
                position: Coord::from_tile(*tile) + Coord::new(half, half),
                ripe: state.is_ripe(c),
            })
            .filter(|c| area.contains(c.position))
            .collect();
        Ok(found)
    }

    async fn harvest(&self, crop: CropId) -> Result<()> {
        let mut state = self.state.lock().await;
        let kind = state
            .crops
            .values()
            .find(|c| c.id == crop)
            .map(|c| c.crop)
            .ok_or_else(|| WorldError::Unavailable(format!("crop {} is gone", crop.0)))?;
        state.pending = Some(PendingAction::Harvest(kind));
        Ok(())
    }

    async fn plant(&self, item: ItemId) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.items.iter().any(|i| i.id == item) {
            return Err(WorldError::UnknownItem(item));
        }
        state.pending = Some(PendingAction::Plant(item));
        Ok(())
    }

    async fn select_tiles(&self, tiles: TileRange) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.pending.take() {
            Some(PendingAction::Harvest(crop)) => {
                let crops = state.harvest_range(crop, tiles);
                debug!("sim: harvested {} {}", crops, crop);
                state.events.push(SimEvent::Harvested { crops });
            }
            Some(PendingAction::Plant(item)) => {
                let crops = state.plant_range(item, tiles);
                debug!("sim: planted {} crops", crops);
                state.events.push(SimEvent::Planted { crops });
            }
            None => trace!("sim: selection without a pending action"),
        }
        Ok(())
    }
}

#[async_trait]
impl Granary for SimWorld {
    async fn open_storage(&self, site: &StorageSite) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.navigation_blocked {
            state.events.push(SimEvent::NavigationFailed(site.position));
            return Err(WorldError::NavigationFailed(site.position));
        }
        state.position = site.position;
        state.storage_open = true;
        state.events.push(SimEvent::StorageOpened(site.id));
        Ok(())
    }

    async fn storage_slots(&self) -> Result<Vec<SlotView>> {
        let state = self.state.lock().await;
        if state.storage_open {
            Ok(state.slots.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn take(&self, slot: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        let info = match state.slots.get(slot) {
            None => return Err(WorldError::SlotOutOfRange(slot)),
            Some(SlotView::Filled(info)) => info.clone(),
            Some(_) => return Ok(()),
        };
        if state.free_slots() == 0 {
            return Ok(());
        }

        let Some(crop) = CropType::ALL.into_iter().find(|c| c.matches_name(&info.name)) else {
            return Ok(());
        };
        let amount = info.amount.min(STACK_SIZE);
        let moved = state.stow(crop.seed_resource(), &info.name, info.quality, amount);

        let remaining = info.amount - moved;
        state.slots[slot] = if remaining == 0 {
            SlotView::Empty
        } else {
            SlotView::Filled(ItemInfo::new(info.name, info.quality, remaining))
        };
        state.events.push(SimEvent::Took {
            slot,
            amount: moved,
        });
        Ok(())
    }

    async fn deposit(&self, item: ItemId, slot: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        if slot >= state.slots.len() {
            return Err(WorldError::SlotOutOfRange(slot));
        }
        let index = state
            .items
            .iter()
            .position(|i| i.id == item)
            .ok_or(WorldError::UnknownItem(item))?;
        let Some(info) = state.items[index].info.clone() else {
            state.events.push(SimEvent::DepositRejected { slot, item });
            return Ok(());
        };

        let merged = match &state.slots[slot] {
            SlotView::Empty => Some(info),
            SlotView::Filled(existing)
                if existing.name == info.name && existing.quality == info.quality =>
            {
                Some(ItemInfo::new(
                    existing.name.clone(),
                    existing.quality,
                    existing.amount + info.amount,
                ))
            }
            _ => None,
        };

        match merged {
            Some(contents) => {
                state.slots[slot] = SlotView::Filled(contents);
                state.items.remove(index);
                state.events.push(SimEvent::Deposited { slot, item });
            }
            None => state.events.push(SimEvent::DepositRejected { slot, item }),
        }
        Ok(())
    }
}

#[async_trait]
impl Survival for SimWorld {
    async fn teleport_home(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.position = state.home;
        state.events.push(SimEvent::TeleportedHome);
        Ok(())
    }

    async fn drink(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let gain = state.drink_gain;
        state.meters.stamina = (state.meters.stamina + gain).min(1.0);
        state.meters.hydration = (state.meters.hydration + gain).min(1.0);
        state.events.push(SimEvent::Drank);
        Ok(())
    }
}
