//! Meter checks run ahead of every active tick

use std::fmt;
use tracing::{debug, info, warn};

use fieldhand_config::SafetyConfig;
use fieldhand_world::{Actor, Meters, Navigator, Pacer, Result, Survival};

/// Why the worker stopped itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HaltReason {
    LowHealth,
    LowEnergy,
    StorageFull,
    NothingEnabled,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            HaltReason::LowHealth => "Low HP, porting home.",
            HaltReason::LowEnergy => "Energy critical. Farmer stopping.",
            HaltReason::StorageFull => "No space in granary. Stopping.",
            HaltReason::NothingEnabled => "Need to choose either harvest, plant or both",
        };
        f.write_str(message)
    }
}

/// Result of one safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyOutcome {
    /// Meters are fine
    Clear,
    /// Stamina was low and has been restored
    Recovered,
    /// Stamina is still low after the allowed drinks
    Thirsty,
    Halt(HaltReason),
}

impl SafetyOutcome {
    /// The state machine may run this tick
    pub fn may_continue(self) -> bool {
        matches!(self, SafetyOutcome::Clear | SafetyOutcome::Recovered)
    }
}

/// Checks health, energy and stamina; never touches field progress
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    config: SafetyConfig,
    pacer: Pacer,
}

impl SafetyMonitor {
    pub fn new(config: SafetyConfig, pacer: Pacer) -> Self {
        Self { config, pacer }
    }

    pub async fn check<W>(&self, world: &W) -> Result<SafetyOutcome>
    where
        W: Actor + Navigator + Survival + ?Sized,
    {
        let meters = world.meters().await?;

        if meters.health < self.config.min_health {
            warn!("Health at {:.2}, teleporting home", meters.health);
            world.teleport_home().await?;
            return Ok(SafetyOutcome::Halt(HaltReason::LowHealth));
        }

        if meters.energy < self.config.min_energy {
            warn!("Energy at {:.2}", meters.energy);
            return Ok(SafetyOutcome::Halt(HaltReason::LowEnergy));
        }

        if meters.stamina < self.config.min_stamina {
            return self.drink_until_full(world, meters).await;
        }

        Ok(SafetyOutcome::Clear)
    }

    async fn drink_until_full<W>(&self, world: &W, mut meters: Meters) -> Result<SafetyOutcome>
    where
        W: Actor + Navigator + Survival + ?Sized,
    {
        info!("Stamina at {:.2}, stopping to drink", meters.stamina);
        world.halt_movement().await?;

        for round in 0..self.config.max_drink_rounds {
            if self.is_refreshed(&meters) {
                debug!("Refreshed after {} drinks", round);
                return Ok(SafetyOutcome::Recovered);
            }
            world.drink().await?;
            if !self.pacer.pause(self.config.drink_interval()).await {
                return Ok(SafetyOutcome::Thirsty);
            }
            meters = world.meters().await?;
        }

        if self.is_refreshed(&meters) {
            return Ok(SafetyOutcome::Recovered);
        }
        warn!(
            "Still thirsty after {} drinks (stamina {:.2})",
            self.config.max_drink_rounds, meters.stamina
        );
        Ok(SafetyOutcome::Thirsty)
    }

    fn is_refreshed(&self, meters: &Meters) -> bool {
        meters.stamina >= self.config.drink_target && meters.hydration >= self.config.drink_target
    }
}
