use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    error::{ConfigError, MalformedFootprint},
    footprint::{FootprintLibrary, InlineFootprint},
    outline::OutlineConfig,
    placement::{BoardFrame, PlacementConfig},
    route::RoutingConfig,
};

/// Footprint search configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directories holding `<library>.pretty` folders
    pub paths: Vec<PathBuf>,
    pub footprints: Vec<InlineFootprint>,
}

/// Everything a run needs besides the netlist itself.
///
/// Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub board: BoardFrame,
    pub placement: PlacementConfig,
    pub outline: OutlineConfig,
    pub routing: RoutingConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut config: Config = content.parse()?;

        // library paths are relative to the config file
        if let Some(base) = path.parent() {
            for p in config.library.paths.iter_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
        Ok(config)
    }

    /// Rejects NaN and infinite dimensions, which TOML allows
    fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("board.width", self.board.width),
            ("board.height", self.board.height),
            ("board.margin", self.board.margin),
            ("placement.pitch_x", self.placement.pitch_x),
            ("placement.pitch_y", self.placement.pitch_y),
            ("outline.line_width", self.outline.line_width),
            ("outline.fit_margin", self.outline.fit_margin),
            ("routing.track_width", self.routing.track_width),
        ];
        match values.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, _)) => Err(ConfigError::NotFinite(*name)),
            None => Ok(()),
        }
    }

    pub fn footprint_library(&self) -> Result<FootprintLibrary, MalformedFootprint> {
        FootprintLibrary::new(self.library.paths.clone()).with_inline(&self.library.footprints)
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
