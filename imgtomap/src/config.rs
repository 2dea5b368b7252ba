//! The `itm_config.json` configuration file.
//!
//! ```json
//! {
//!     "output": "./",
//!     "tiles": {
//!         "deep_ocean": true,
//!         "close_ocean": false
//!     }
//! }
//! ```
//!
//! Tiles set to `true` are used in the order they appear in the file; any
//! other value disables the tile.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::debug;

use crate::convert::ConversionError;
use crate::tiles::{PaletteSelection, TileCatalog};

/// Name of the configuration file, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "itm_config.json";

/// Configuration for converting a batch of images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory the converted maps and previews are written to
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Tile ids mapped to whether the tile may be used
    #[serde(default)]
    pub tiles: Map<String, Value>,
    /// Optional JSON file replacing the built-in map template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

fn default_output() -> PathBuf {
    PathBuf::from("./")
}

impl Default for Config {
    fn default() -> Self {
        Config::for_catalog(TileCatalog::builtin())
    }
}

impl Config {
    /// Default configuration with every tile of `catalog` enabled
    pub fn for_catalog(catalog: &TileCatalog) -> Self {
        Config {
            output: default_output(),
            tiles: catalog
                .iter()
                .map(|tile| (tile.id.clone(), Value::Bool(true)))
                .collect(),
            template: None,
        }
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConversionError> {
        let json = fs::read(path)?;
        let config: Config = serde_json::from_slice(&json)?;
        debug!(path = %path.display(), tiles = config.tiles.len(), "Loaded config");
        Ok(config)
    }

    /// Write the configuration as JSON indented with four spaces.
    pub fn save(&self, path: &Path) -> Result<(), ConversionError> {
        let mut json = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut json,
            PrettyFormatter::with_indent(b"    "),
        );
        self.serialize(&mut serializer)?;

        let mut file = fs::File::create(path)?;
        file.write_all(&json)?;
        Ok(())
    }

    /// Tiles switched on, in file order
    pub fn enabled_tiles(&self) -> PaletteSelection {
        PaletteSelection::new(
            self.tiles
                .iter()
                .filter(|(_, enabled)| matches!(enabled, Value::Bool(true)))
                .map(|(id, _)| id.clone()),
        )
    }
}
