//! WorldBox map documents.
//!
//! A `map.wbox` file is zlib-compressed compact JSON. The converter only
//! owns five of its fields; the rest come from a template and are written
//! back untouched, in the template's key order.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::convert::ConversionError;
use crate::encode::EncodedRow;

const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const TILE_MAP: &str = "tileMap";
const TILE_ARRAY: &str = "tileArray";
const TILE_AMOUNTS: &str = "tileAmounts";

/// Fields written by the converter, in the order used when the template
/// does not place them
const DOCUMENT_FIELDS: [&str; 5] = [WIDTH, HEIGHT, TILE_MAP, TILE_ARRAY, TILE_AMOUNTS];

/// Fixed fields of a map document
#[derive(Debug, Clone, PartialEq)]
pub struct MapTemplate {
    fields: Map<String, Value>,
}

impl Default for MapTemplate {
    /// An empty world: no units, buildings, kingdoms or history.
    fn default() -> Self {
        let template = json!({
            "saveVersion": 11,
            "width": 0,
            "height": 0,
            "mapStats": {
                "name": "",
                "description": "",
                "worldTime": 0.0,
                "life_dna": 0,
                "player_name": "",
            },
            "worldLaws": {
                "list": [],
            },
            "tileMap": [],
            "tileArray": [],
            "tileAmounts": [],
            "fire": [],
            "conwayEater": [],
            "conwayCreator": [],
            "frozen_tiles": [],
            "tiles": [],
            "cities": [],
            "actors_data": [],
            "buildings": [],
            "kingdoms": [],
            "clans": [],
            "alliances": [],
            "wars": [],
            "plots": [],
            "relations": [],
            "cultures": [],
        });

        match template {
            Value::Object(fields) => MapTemplate { fields },
            _ => MapTemplate { fields: Map::new() },
        }
    }
}

impl MapTemplate {
    /// Parse a template from a JSON object.
    pub fn from_json(json: &[u8]) -> Result<Self, ConversionError> {
        match serde_json::from_slice::<Value>(json)? {
            Value::Object(fields) => Ok(MapTemplate { fields }),
            other => Err(ConversionError::InvalidDocument(format!(
                "map template must be a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Read a template from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConversionError> {
        let json = fs::read(path)?;
        Self::from_json(&json)
    }

    /// Template fields in document order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// A complete map: size, tile names, encoded rows and template fields
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Tile ids; a tile index is a position in this list
    pub tile_map: Vec<String>,
    /// Encoded pixel rows, bottom row first
    pub rows: Vec<EncodedRow>,
    template: MapTemplate,
}

impl MapDocument {
    /// Create a document from encoded rows, bottom row first.
    pub fn new(
        template: &MapTemplate,
        width: u32,
        height: u32,
        tile_map: Vec<String>,
        rows: Vec<EncodedRow>,
    ) -> Self {
        MapDocument {
            width,
            height,
            tile_map,
            rows,
            template: template.clone(),
        }
    }

    /// Fields written back untouched
    pub fn template(&self) -> &MapTemplate {
        &self.template
    }

    /// Compact JSON with no whitespace
    pub fn to_json(&self) -> Result<Vec<u8>, ConversionError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serialize and compress with zlib at the highest level.
    ///
    /// The output only depends on the document, so equal documents give
    /// identical bytes.
    pub fn compress(&self) -> Result<Vec<u8>, ConversionError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        serde_json::to_writer(&mut encoder, self)?;
        let data = encoder.finish()?;

        debug!(
            rows = self.rows.len(),
            tiles = self.tile_map.len(),
            bytes = data.len(),
            "Compressed map document"
        );
        Ok(data)
    }

    /// Decompress and parse a map file.
    ///
    /// Fields other than the five the converter writes are kept as the
    /// template of the returned document.
    pub fn decode(data: &[u8]) -> Result<Self, ConversionError> {
        let mut json = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut json)?;

        let mut fields = match serde_json::from_slice::<Value>(&json)? {
            Value::Object(fields) => fields,
            other => {
                return Err(ConversionError::InvalidDocument(format!(
                    "map must be a JSON object, found {}",
                    json_kind(&other)
                )))
            }
        };

        let width: u32 = take_field(&mut fields, WIDTH)?;
        let height: u32 = take_field(&mut fields, HEIGHT)?;
        let tile_map: Vec<String> = take_field(&mut fields, TILE_MAP)?;
        let tile_array: Vec<Vec<u8>> = take_field(&mut fields, TILE_ARRAY)?;
        let tile_amounts: Vec<Vec<u32>> = take_field(&mut fields, TILE_AMOUNTS)?;

        if tile_array.len() != tile_amounts.len() {
            return Err(ConversionError::InvalidDocument(format!(
                "{} has {} rows but {} has {}",
                TILE_ARRAY,
                tile_array.len(),
                TILE_AMOUNTS,
                tile_amounts.len()
            )));
        }

        let rows = tile_array
            .into_iter()
            .zip(tile_amounts)
            .enumerate()
            .map(|(i, (values, run_lengths))| {
                if values.len() == run_lengths.len() {
                    Ok(EncodedRow {
                        values,
                        run_lengths,
                    })
                } else {
                    Err(ConversionError::InvalidDocument(format!(
                        "row {} has {} values but {} run lengths",
                        i,
                        values.len(),
                        run_lengths.len()
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MapDocument {
            width,
            height,
            tile_map,
            rows,
            template: MapTemplate { fields },
        })
    }

    /// Write one of the converter's own fields, returning false for any
    /// other key.
    fn serialize_field<M: SerializeMap>(
        &self,
        map: &mut M,
        key: &str,
    ) -> Result<bool, M::Error> {
        match key {
            WIDTH => map.serialize_entry(key, &self.width)?,
            HEIGHT => map.serialize_entry(key, &self.height)?,
            TILE_MAP => map.serialize_entry(key, &self.tile_map)?,
            TILE_ARRAY => map.serialize_entry(key, &TileArray(&self.rows))?,
            TILE_AMOUNTS => map.serialize_entry(key, &TileAmounts(&self.rows))?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Serialize for MapDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let missing: Vec<&str> = DOCUMENT_FIELDS
            .into_iter()
            .filter(|key| !self.template.fields.contains_key(*key))
            .collect();

        let mut map = serializer.serialize_map(Some(self.template.fields.len() + missing.len()))?;
        for (key, value) in self.template.fields.iter() {
            if !self.serialize_field(&mut map, key)? {
                map.serialize_entry(key, value)?;
            }
        }
        for key in missing {
            self.serialize_field(&mut map, key)?;
        }
        map.end()
    }
}

/// `values` of every row
struct TileArray<'a>(&'a [EncodedRow]);

impl Serialize for TileArray<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|row| &row.values))
    }
}

/// `run_lengths` of every row
struct TileAmounts<'a>(&'a [EncodedRow]);

impl Serialize for TileAmounts<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|row| &row.run_lengths))
    }
}

/// Move a field out of `fields`, leaving `null` so the key keeps its place.
fn take_field<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &str,
) -> Result<T, ConversionError> {
    let value = fields
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| ConversionError::InvalidDocument(format!("missing field '{}'", key)))?;
    Ok(serde_json::from_value(value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
