use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use starcell_world::WorldConfig;

/// Contents of a scenario file: world tunables plus population settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) world: WorldConfig,
    pub(crate) population: Population,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Population {
    /// Share of spawned entities that are sent toward a zone exit.
    pub(crate) travellers: f64,
}

impl Default for Population {
    fn default() -> Self {
        Self { travellers: 0.2 }
    }
}

impl Scenario {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text)?;
        ensure!(
            (0.0..=1.0).contains(&scenario.population.travellers),
            "population.travellers must lie within [0, 1]"
        );
        Ok(scenario)
    }
}
