//! Crop catalogue

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Crop types the worker can farm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropType {
    Barley,
    Beetroot,
    Carrot,
    Flax,
    Hemp,
    Leek,
    Lettuce,
    Millet,
    Pipeweed,
    Poppy,
    Pumpkin,
    RedOnion,
    Turnip,
    Wheat,
    YellowOnion,
}

impl CropType {
    pub const ALL: [CropType; 15] = [
        CropType::Barley,
        CropType::Beetroot,
        CropType::Carrot,
        CropType::Flax,
        CropType::Hemp,
        CropType::Leek,
        CropType::Lettuce,
        CropType::Millet,
        CropType::Pipeweed,
        CropType::Poppy,
        CropType::Pumpkin,
        CropType::RedOnion,
        CropType::Turnip,
        CropType::Wheat,
        CropType::YellowOnion,
    ];

    /// Resource of the plant object standing in a field
    pub fn plant_resource(self) -> &'static str {
        match self {
            CropType::Barley => "gfx/terobjs/plants/barley",
            CropType::Beetroot => "gfx/terobjs/plants/beet",
            CropType::Carrot => "gfx/terobjs/plants/carrot",
            CropType::Flax => "gfx/terobjs/plants/flax",
            CropType::Hemp => "gfx/terobjs/plants/hemp",
            CropType::Leek => "gfx/terobjs/plants/leek",
            CropType::Lettuce => "gfx/terobjs/plants/lettuce",
            CropType::Millet => "gfx/terobjs/plants/millet",
            CropType::Pipeweed => "gfx/terobjs/plants/pipeweed",
            CropType::Poppy => "gfx/terobjs/plants/poppy",
            CropType::Pumpkin => "gfx/terobjs/plants/pumpkin",
            CropType::RedOnion => "gfx/terobjs/plants/redonion",
            CropType::Turnip => "gfx/terobjs/plants/turnip",
            CropType::Wheat => "gfx/terobjs/plants/wheat",
            CropType::YellowOnion => "gfx/terobjs/plants/yellowonion",
        }
    }

    /// Name shown on items and storage slots
    pub fn display_name(self) -> &'static str {
        match self {
            CropType::Barley => "Barley",
            CropType::Beetroot => "Beetroot",
            CropType::Carrot => "Carrot",
            CropType::Flax => "Flax",
            CropType::Hemp => "Hemp",
            CropType::Leek => "Leek",
            CropType::Lettuce => "Lettuce",
            CropType::Millet => "Millet",
            CropType::Pipeweed => "Pipeweed",
            CropType::Poppy => "Poppy",
            CropType::Pumpkin => "Pumpkin",
            CropType::RedOnion => "Red Onion",
            CropType::Turnip => "Turnip",
            CropType::Wheat => "Wheat",
            CropType::YellowOnion => "Yellow Onion",
        }
    }

    /// Resource of the item that gets planted
    pub fn seed_resource(self) -> &'static str {
        match self {
            CropType::Barley => "gfx/invobjs/seed-barley",
            CropType::Beetroot => "gfx/invobjs/beet",
            CropType::Carrot => "gfx/invobjs/seed-carrot",
            CropType::Flax => "gfx/invobjs/seed-flax",
            CropType::Hemp => "gfx/invobjs/seed-hemp",
            CropType::Leek => "gfx/invobjs/seed-leek",
            CropType::Lettuce => "gfx/invobjs/seed-lettuce",
            CropType::Millet => "gfx/invobjs/seed-millet",
            CropType::Pipeweed => "gfx/invobjs/seed-pipeweed",
            CropType::Poppy => "gfx/invobjs/seed-poppy",
            CropType::Pumpkin => "gfx/invobjs/seed-pumpkin",
            CropType::RedOnion => "gfx/invobjs/redonion",
            CropType::Turnip => "gfx/invobjs/seed-turnip",
            CropType::Wheat => "gfx/invobjs/seed-wheat",
            CropType::YellowOnion => "gfx/invobjs/yellowonion",
        }
    }

    /// Whether a display name refers to this crop.
    ///
    /// Substring containment, not equality: "Carrot Seed" matches `Carrot`.
    /// Crops whose names share fragments can match each other.
    pub fn matches_name(self, name: &str) -> bool {
        name.contains(self.display_name())
    }

    /// Whether a carried item is this crop's seed
    pub fn is_seed(self, resource: &str) -> bool {
        resource == self.seed_resource()
    }
}

impl fmt::Display for CropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for CropType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        CropType::ALL
            .into_iter()
            .find(|crop| {
                let name: String = crop
                    .display_name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                name == wanted
            })
            .ok_or_else(|| format!("unknown crop type: {}", s))
    }
}
