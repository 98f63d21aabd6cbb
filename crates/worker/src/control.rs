//! Operator control surface shared with the worker
//!
//! Fields, storage, toggles, crop and the active flag sit behind one async
//! mutex. The worker only locks it between world calls.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use fieldhand_bus::{Notice, NoticeBus};
use fieldhand_config::FarmingConfig;
use fieldhand_field::{Field, FieldRegistry, Region};
use fieldhand_world::{CropType, StorageSite};

use crate::stage::Toggles;

/// Reasons the worker cannot start
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Need to select at least one field and granary.")]
    MissingFieldOrStorage,

    #[error("Crop not yet selected")]
    NoCrop,

    #[error("Need to choose either harvest, plant or both")]
    NothingEnabled,
}

pub type Result<T> = std::result::Result<T, ControlError>;

#[derive(Debug)]
pub(crate) struct ControlState {
    pub(crate) registry: FieldRegistry,
    pub(crate) storage: Option<StorageSite>,
    pub(crate) toggles: Toggles,
    pub(crate) crop: Option<CropType>,
    pub(crate) active: bool,
}

/// Copy of the control state at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSnapshot {
    pub fields: usize,
    pub storage: Option<StorageSite>,
    pub toggles: Toggles,
    pub crop: Option<CropType>,
    pub active: bool,
    pub epoch: u64,
}

impl ControlSnapshot {
    /// Fields, storage and crop are all chosen
    pub fn is_ready(&self) -> bool {
        self.fields > 0 && self.storage.is_some() && self.crop.is_some()
    }
}

/// Cloneable handle to the shared control state
#[derive(Debug, Clone)]
pub struct Control {
    state: Arc<Mutex<ControlState>>,
    notices: NoticeBus,
}

impl Control {
    pub fn new(toggles: Toggles, crop: Option<CropType>, notices: NoticeBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControlState {
                registry: FieldRegistry::new(),
                storage: None,
                toggles,
                crop,
                active: false,
            })),
            notices,
        }
    }

    /// Toggles and crop taken from the farming config
    pub fn from_config(farming: &FarmingConfig, notices: NoticeBus) -> Self {
        let toggles = Toggles {
            harvest: farming.harvest,
            plant: farming.plant,
        };
        Self::new(toggles, farming.crop, notices)
    }

    pub(crate) async fn state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().await
    }

    pub(crate) fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    /// Register a field, returning its index
    pub async fn register_field(&self, region: Region) -> usize {
        let index = self.state().await.registry.register(region);
        self.notices.publish(
            Notice::info(format!(
                "Area selected: {}x{}",
                region.tile_width(),
                region.tile_height()
            ))
            .for_field(index),
        );
        index
    }

    /// Set the storage seeds are deposited to and taken from
    pub async fn register_storage(&self, site: StorageSite) {
        self.state().await.storage = Some(site);
        info!("Storage {} registered at {}", site.id, site.position);
        self.notices.info("Granary found.");
    }

    pub async fn set_harvest(&self, enabled: bool) {
        self.state().await.toggles.harvest = enabled;
    }

    pub async fn set_plant(&self, enabled: bool) {
        self.state().await.toggles.plant = enabled;
    }

    pub async fn select_crop(&self, crop: CropType) {
        self.state().await.crop = Some(crop);
        info!("Crop selected: {}", crop);
    }

    /// Activate the worker once fields, storage and crop are chosen
    pub async fn start(&self) -> Result<()> {
        let result = {
            let mut state = self.state().await;
            if state.registry.is_empty() || state.storage.is_none() {
                Err(ControlError::MissingFieldOrStorage)
            } else if state.crop.is_none() {
                Err(ControlError::NoCrop)
            } else if !state.toggles.any() {
                Err(ControlError::NothingEnabled)
            } else {
                state.active = true;
                Ok(())
            }
        };

        match &result {
            Ok(()) => {
                info!("◆ Farming started");
                self.notices.info("Farmer Bot start working");
            }
            Err(e) => {
                self.notices.error(e.to_string());
            }
        }
        result
    }

    /// Pause the worker; progress is kept
    pub async fn stop(&self) {
        let was_active = std::mem::replace(&mut self.state().await.active, false);
        if was_active {
            info!("◆ Farming stopped");
        }
    }

    /// Forget every field and the storage; the worker restarts from scratch
    pub async fn reset(&self) {
        let mut state = self.state().await;
        state.registry.clear();
        state.storage = None;
        state.active = false;
        info!("◆ Farming reset (epoch {})", state.registry.epoch());
    }

    pub async fn is_active(&self) -> bool {
        self.state().await.active
    }

    pub async fn snapshot(&self) -> ControlSnapshot {
        let state = self.state().await;
        ControlSnapshot {
            fields: state.registry.len(),
            storage: state.storage,
            toggles: state.toggles,
            crop: state.crop,
            active: state.active,
            epoch: state.registry.epoch(),
        }
    }

    /// Cursor of a field's current pass
    pub async fn cursor(&self, index: usize) -> Option<usize> {
        self.state().await.registry.get(index).map(Field::cursor)
    }

    /// Copy of a registered field
    pub async fn field(&self, index: usize) -> Option<Field> {
        self.state().await.registry.get(index).cloned()
    }

    /// Run `f` on a field under the lock
    pub(crate) async fn with_field<R>(&self, index: usize, f: impl FnOnce(&mut Field) -> R) -> Option<R> {
        self.state().await.registry.get_mut(index).map(f)
    }

    /// Deactivate and tell the operator why, once
    pub(crate) async fn halt(&self, message: &str) {
        let was_active = std::mem::replace(&mut self.state().await.active, false);
        if was_active {
            self.notices.error(message);
        }
    }

    /// Deactivate after the last field
    pub(crate) async fn finish(&self) {
        let was_active = std::mem::replace(&mut self.state().await.active, false);
        if was_active {
            info!("◆ Farming finished");
            self.notices.info("Farming Finished.");
        }
    }
}
