//! World capabilities the farm worker drives
//!
//! Movement, inventory, crops, storage and survival actions are external to the
//! worker. Each concern is a trait; `World` is their union.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fieldhand_field::{Coord, Rect, TileRange};

pub mod clock;
pub mod crop;
pub mod sim;

pub use clock::{Clock, InstantClock, Pacer, TokioClock};
pub use crop::CropType;

/// World errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    #[error("navigation to {0} failed")]
    NavigationFailed(Coord),

    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    #[error("storage slot {0} out of range")]
    SlotOutOfRange(usize),

    #[error("world unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, WorldError>;

/// Handle of a carried item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a crop object standing in a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CropId(pub u64);

/// Descriptive metadata of an item or a storage slot's contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Display name, e.g. "Carrot Seed"
    pub name: String,
    pub quality: f64,
    pub amount: u32,
}

impl ItemInfo {
    pub fn new(name: impl Into<String>, quality: f64, amount: u32) -> Self {
        Self {
            name: name.into(),
            quality,
            amount,
        }
    }
}

/// An item in the actor's inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarriedItem {
    pub id: ItemId,
    /// Resource path, e.g. "gfx/invobjs/seed-carrot"
    pub resource: String,
    /// `None` while the item's metadata is still loading
    pub info: Option<ItemInfo>,
}

/// What a storage slot currently shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotView {
    Empty,
    /// Occupied, but its metadata has not loaded yet
    Pending,
    Filled(ItemInfo),
}

impl SlotView {
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotView::Empty)
    }

    pub fn contents(&self) -> Option<&ItemInfo> {
        match self {
            SlotView::Filled(info) => Some(info),
            _ => None,
        }
    }
}

/// A crop object standing in a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropObject {
    pub id: CropId,
    pub position: Coord,
    /// Grown enough to be harvested
    pub ripe: bool,
}

/// Actor resource meters as fractions in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Meters {
    pub health: f64,
    pub energy: f64,
    pub stamina: f64,
    pub hydration: f64,
}

impl Default for Meters {
    fn default() -> Self {
        Self {
            health: 1.0,
            energy: 1.0,
            stamina: 1.0,
            hydration: 1.0,
        }
    }
}

/// Remote storage the operator registered (a granary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSite {
    pub id: u64,
    pub position: Coord,
}

/// The actor's own state
#[async_trait]
pub trait Actor: Send + Sync {
    async fn position(&self) -> Result<Coord>;

    /// Not moving and not busy with a progress action
    async fn is_idle(&self) -> Result<bool>;

    async fn meters(&self) -> Result<Meters>;

    /// Free inventory slots
    async fn free_slots(&self) -> Result<usize>;

    async fn carried_items(&self) -> Result<Vec<CarriedItem>>;

    /// Drop whatever is held and cancel pending clicks
    async fn release_hand(&self) -> Result<()>;
}

/// Path following
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Resolves once the actor arrives or the path fails
    async fn move_to(&self, destination: Coord) -> Result<()>;

    async fn halt_movement(&self) -> Result<()>;
}

/// Crop interactions
#[async_trait]
pub trait Fieldwork: Send + Sync {
    /// Crop objects of `resource` inside `area`
    async fn crops_in(&self, area: Rect, resource: &str) -> Result<Vec<CropObject>>;

    /// Start the harvest interaction on a crop
    async fn harvest(&self, crop: CropId) -> Result<()>;

    /// Start the plant interaction with a carried item
    async fn plant(&self, item: ItemId) -> Result<()>;

    /// Confirm the pending interaction over a tile range
    async fn select_tiles(&self, tiles: TileRange) -> Result<()>;
}

/// Remote storage slots; transfers are fire-and-forget
#[async_trait]
pub trait Granary: Send + Sync {
    /// Walk to the storage and open it
    async fn open_storage(&self, site: &StorageSite) -> Result<()>;

    /// Visible slots, empty while the storage is closed
    async fn storage_slots(&self) -> Result<Vec<SlotView>>;

    /// Request one take from a slot into the inventory
    async fn take(&self, slot: usize) -> Result<()>;

    /// Request moving a carried item into a slot
    async fn deposit(&self, item: ItemId, slot: usize) -> Result<()>;
}

/// Emergency actions
#[async_trait]
pub trait Survival: Send + Sync {
    async fn teleport_home(&self) -> Result<()>;

    async fn drink(&self) -> Result<()>;
}

/// Everything the farm worker needs from the world
pub trait World: Actor + Navigator + Fieldwork + Granary + Survival {}

impl<T> World for T where T: Actor + Navigator + Fieldwork + Granary + Survival {}
