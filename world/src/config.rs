//! Tunables governing movement, crossings and interiors.

use serde::{Deserialize, Serialize};
use starcell_core::ZoneDimensions;
use thiserror::Error;

/// Configuration consumed when constructing a [`crate::World`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Seed for the world's random source.
    pub seed: u64,
    /// Columns per zone and interior grid.
    pub zone_width: u32,
    /// Rows per zone and interior grid.
    pub zone_height: u32,
    /// Number of most recent memory entries a candidate is checked against.
    pub memory_window: usize,
    /// Occurrences of the current cell within the window that confirm a loop.
    pub loop_threshold: usize,
    /// Minimum ticks between explicit zone changes and interior transitions.
    pub zone_change_cooldown: u64,
    /// Minimum ticks between seamless corridor crossings.
    pub seamless_cross_cooldown: u64,
    /// Zone membership above which arrivals must merge or stay out.
    pub population_cap: usize,
    /// Consecutive calls with an unchanged goal before it is abandoned.
    pub target_stuck_threshold: u32,
    /// Minimum ticks between greedy seek steps.
    pub seek_interval: u64,
    /// Steps attempted per call while heading for a zone exit.
    pub exit_urgency: u32,
    /// Probability that an entity next to an entrance goes inside this call.
    pub subscreen_entry_chance: f64,
    /// Zone membership at or below which doubled entities may split.
    pub split_population: usize,
    /// Probability per tick that an eligible doubled entity splits.
    pub split_chance: f64,
}

impl WorldConfig {
    /// Grid dimensions shared by every zone and interior.
    #[must_use]
    pub const fn dimensions(&self) -> ZoneDimensions {
        ZoneDimensions::new(self.zone_width, self.zone_height)
    }

    /// Returns a copy of the configuration with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that the configuration describes a usable world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone_width < MIN_EXTENT || self.zone_height < MIN_EXTENT {
            return Err(ConfigError::ZoneTooSmall {
                width: self.zone_width,
                height: self.zone_height,
            });
        }
        if self.memory_window == 0 {
            return Err(ConfigError::EmptyMemoryWindow);
        }
        if self.loop_threshold == 0 || self.loop_threshold > self.memory_window {
            return Err(ConfigError::LoopThreshold {
                threshold: self.loop_threshold,
                window: self.memory_window,
            });
        }
        if self.exit_urgency == 0 {
            return Err(ConfigError::NoExitUrgency);
        }
        if !(0.0..=1.0).contains(&self.subscreen_entry_chance) {
            return Err(ConfigError::EntryChance(self.subscreen_entry_chance));
        }
        if !(0.0..=1.0).contains(&self.split_chance) {
            return Err(ConfigError::SplitChance(self.split_chance));
        }
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        let dimensions = ZoneDimensions::default();
        Self {
            seed: 0x5eed_ce11_0000_0001,
            zone_width: dimensions.width(),
            zone_height: dimensions.height(),
            memory_window: 6,
            loop_threshold: 3,
            zone_change_cooldown: 1800,
            seamless_cross_cooldown: 30,
            population_cap: 15,
            target_stuck_threshold: 180,
            seek_interval: 5,
            exit_urgency: 3,
            subscreen_entry_chance: 0.1,
            split_population: 3,
            split_chance: 0.05,
        }
    }
}

// Corridors, doorways and the border ring need at least this many cells per axis.
const MIN_EXTENT: u32 = 6;

/// Errors reported while validating a [`WorldConfig`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The grid cannot hold a border ring, corridors and a doorway.
    #[error("zone grid {width}x{height} is too small; both sides need at least 6 cells")]
    ZoneTooSmall {
        /// Configured width.
        width: u32,
        /// Configured height.
        height: u32,
    },
    /// The memory window must cover at least one entry.
    #[error("memory window must be at least one cell")]
    EmptyMemoryWindow,
    /// The loop threshold must fit inside the memory window.
    #[error("loop threshold {threshold} must be between 1 and the memory window ({window})")]
    LoopThreshold {
        /// Configured threshold.
        threshold: usize,
        /// Configured window.
        window: usize,
    },
    /// Exit seeking must attempt at least one step.
    #[error("exit urgency must be at least one step")]
    NoExitUrgency,
    /// The entry chance is not a probability.
    #[error("subscreen entry chance {0} is not within 0..=1")]
    EntryChance(f64),
    /// The split chance is not a probability.
    #[error("split chance {0} is not within 0..=1")]
    SplitChance(f64),
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, WorldConfig};

    #[test]
    fn defaults_validate() {
        let config = WorldConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.dimensions().width(), 24);
        assert_eq!(config.dimensions().height(), 18);
    }

    #[test]
    fn rejects_loop_threshold_outside_window() {
        let config = WorldConfig {
            loop_threshold: 9,
            ..WorldConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LoopThreshold {
                threshold: 9,
                window: 6
            })
        );
    }

    #[test]
    fn rejects_split_chance_above_one() {
        let config = WorldConfig {
            split_chance: 1.5,
            ..WorldConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SplitChance(1.5)));
    }

    #[test]
    fn rejects_tiny_zones() {
        let config = WorldConfig {
            zone_width: 4,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZoneTooSmall { width: 4, .. })
        ));
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: WorldConfig =
            toml::from_str("seed = 7\nzone_change_cooldown = 10\n").expect("parse config");
        assert_eq!(config.seed, 7);
        assert_eq!(config.zone_change_cooldown, 10);
        assert_eq!(config.population_cap, 15);
    }
}
