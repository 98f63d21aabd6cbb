//! Stage transition table
//!
//! The worker cycles harvest -> deposit -> plant -> deposit. Which stage comes
//! next depends only on the current stage, what just happened and which of
//! harvesting and planting are enabled, so the whole table is a pure function.

use serde::{Deserialize, Serialize};
use std::fmt;

use fieldhand_field::Granularity;

/// Stage of the work cycle, shared by all fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Harvesting,
    DepositSeedsAfterHarvest,
    Planting,
    DepositSeedsAfterPlant,
}

/// Something that finished during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// Every harvest segment of the field is done
    FieldHarvested,
    /// No seeds of the crop are carried any more
    SeedsStowed,
    /// Every planting segment of the field is full
    FieldPlanted,
}

/// Which halves of the cycle are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggles {
    pub harvest: bool,
    pub plant: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            harvest: true,
            plant: true,
        }
    }
}

impl Toggles {
    pub fn any(self) -> bool {
        self.harvest || self.plant
    }
}

/// Where an event leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: Stage,
    /// Move on to the next field
    pub advance_field: bool,
    /// Start the new stage's pass from the first segment
    pub reset_cursor: bool,
}

impl Transition {
    fn to(stage: Stage, advance_field: bool) -> Self {
        Self {
            to: stage,
            advance_field,
            reset_cursor: stage.is_pass(),
        }
    }
}

impl Stage {
    /// Stages that walk a field's segments
    pub fn is_pass(self) -> bool {
        matches!(self, Stage::Harvesting | Stage::Planting)
    }

    /// Segment granularity walked in this stage
    pub fn granularity(self) -> Option<Granularity> {
        match self {
            Stage::Harvesting => Some(Granularity::Harvest),
            Stage::Planting => Some(Granularity::Planting),
            _ => None,
        }
    }

    /// First stage of a fresh cycle
    pub fn initial(toggles: Toggles) -> Stage {
        if toggles.harvest {
            Stage::Harvesting
        } else {
            Stage::Planting
        }
    }

    /// Next stage after `event`, or `None` if the event means nothing here
    pub fn on(self, event: StageEvent, toggles: Toggles) -> Option<Transition> {
        let transition = match (self, event) {
            (Stage::Harvesting, StageEvent::FieldHarvested) => {
                Transition::to(Stage::DepositSeedsAfterHarvest, false)
            }
            (Stage::DepositSeedsAfterHarvest, StageEvent::SeedsStowed) => {
                if toggles.plant {
                    Transition::to(Stage::Planting, false)
                } else {
                    Transition::to(Stage::Harvesting, true)
                }
            }
            (Stage::Planting, StageEvent::FieldPlanted) => {
                Transition::to(Stage::DepositSeedsAfterPlant, true)
            }
            (Stage::DepositSeedsAfterPlant, StageEvent::SeedsStowed) => {
                Transition::to(Stage::initial(toggles), false)
            }
            _ => return None,
        };
        Some(transition)
    }

    /// Stage to switch to when the toggles no longer allow this one
    pub fn normalize(self, toggles: Toggles) -> Option<Stage> {
        match self {
            Stage::Harvesting | Stage::DepositSeedsAfterHarvest if !toggles.harvest => {
                Some(Stage::Planting)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Harvesting => "harvesting",
            Stage::DepositSeedsAfterHarvest => "depositing seeds after harvest",
            Stage::Planting => "planting",
            Stage::DepositSeedsAfterPlant => "depositing seeds after planting",
        };
        f.write_str(label)
    }
}
