//! Game rules and tunables.
//!
//! [`GameConfig`] holds every knob the engine reads. The defaults are the
//! standard rules; tests inject degenerate spawn weights to make spawns
//! deterministic.
//!
//! ```rust
//! use tilefuse_core::config::{GameConfig, SpawnWeights};
//!
//! let config = GameConfig {
//!     spawn_weights: SpawnWeights { joker: 0, rank1: 1, rank2: 0 },
//!     ..Default::default()
//! };
//! config.validate().expect("valid config");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::SIZE;

/// Default number of inventory slots.
pub const DEFAULT_INVENTORY_CAP: usize = 4;

/// Turns a Freeze power-up adds to its target.
pub const DEFAULT_FREEZE_TURNS: u32 = 3;

/// Turns of spawn suppression granted by SlowMo.
pub const DEFAULT_SLOW_MOTION_TURNS: u32 = 5;

/// Relative weights for the level of a spawned tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnWeights {
    pub joker: u32,
    pub rank1: u32,
    pub rank2: u32,
}

impl SpawnWeights {
    pub fn total(&self) -> u32 {
        self.joker + self.rank1 + self.rank2
    }
}

impl Default for SpawnWeights {
    /// About 2% Jokers; the rest is 90/10 between rank 1 and rank 2.
    fn default() -> Self {
        SpawnWeights {
            joker: 2,
            rank1: 88,
            rank2: 10,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub spawn_weights: SpawnWeights,
    /// Tiles placed on a fresh board.
    pub initial_tiles: usize,
    pub inventory_cap: usize,
    pub freeze_turns: u32,
    pub slow_motion_turns: u32,
    /// Lock input after a Joker spawns until the driver releases it.
    pub rare_spawn_guard: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            spawn_weights: SpawnWeights::default(),
            initial_tiles: 2,
            inventory_cap: DEFAULT_INVENTORY_CAP,
            freeze_turns: DEFAULT_FREEZE_TURNS,
            slow_motion_turns: DEFAULT_SLOW_MOTION_TURNS,
            rare_spawn_guard: true,
        }
    }
}

impl GameConfig {
    /// Check that the configuration describes a playable game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spawn_weights.total() == 0 {
            return Err(ConfigError::ZeroSpawnWeights);
        }
        if self.initial_tiles == 0 || self.initial_tiles > SIZE * SIZE {
            return Err(ConfigError::InitialTiles(self.initial_tiles));
        }
        if self.inventory_cap == 0 {
            return Err(ConfigError::ZeroInventory);
        }
        if self.freeze_turns == 0 {
            return Err(ConfigError::ZeroTurns("freeze_turns"));
        }
        if self.slow_motion_turns == 0 {
            return Err(ConfigError::ZeroTurns("slow_motion_turns"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.inventory_cap, 4);
        assert_eq!(config.freeze_turns, 3);
        assert_eq!(config.slow_motion_turns, 5);
        assert_eq!(config.spawn_weights.total(), 100);
    }

    #[test]
    fn test_rejects_zero_weights() {
        let config = GameConfig {
            spawn_weights: SpawnWeights {
                joker: 0,
                rank1: 0,
                rank2: 0,
            },
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSpawnWeights));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let too_many = GameConfig {
            initial_tiles: 17,
            ..Default::default()
        };
        assert_eq!(too_many.validate(), Err(ConfigError::InitialTiles(17)));

        let no_slots = GameConfig {
            inventory_cap: 0,
            ..Default::default()
        };
        assert_eq!(no_slots.validate(), Err(ConfigError::ZeroInventory));

        let no_freeze = GameConfig {
            freeze_turns: 0,
            ..Default::default()
        };
        assert_eq!(no_freeze.validate(), Err(ConfigError::ZeroTurns("freeze_turns")));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{ "freeze_turns": 4 }"#).unwrap();
        assert_eq!(config.freeze_turns, 4);
        assert_eq!(config.inventory_cap, DEFAULT_INVENTORY_CAP);
        assert!(config.rare_spawn_guard);
    }
}
