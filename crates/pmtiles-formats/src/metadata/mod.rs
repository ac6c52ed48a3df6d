//! JSON metadata blob and the reconciled archive metadata record
//!
//! The metadata section holds a JSON object. `vector_layers` carries the
//! schema of an MVT archive; every other key is kept as a string. When the
//! blob is combined with the header into an [`ArchiveMetadata`], the
//! well-known keys (`name`, `description`, `attribution`, `version`, `type`)
//! are lifted into their own fields and removed from the residual map.

pub mod error;

pub use error::{MetadataError, Result};

use crate::compression::Compression;
use crate::header::{Bounds, Center, Header, TileType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key of the archive name
pub const NAME_KEY: &str = "name";
/// Key of the human readable description
pub const DESCRIPTION_KEY: &str = "description";
/// Key of the attribution string
pub const ATTRIBUTION_KEY: &str = "attribution";
/// Key of the dataset version
pub const VERSION_KEY: &str = "version";
/// Key of the archive type (`baselayer` or `overlay`)
pub const TYPE_KEY: &str = "type";
/// Key of the vector layer schema
pub const VECTOR_LAYERS_KEY: &str = "vector_layers";

/// Attribute type of a vector layer field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Numeric attribute
    Number,
    /// Boolean attribute
    Boolean,
    /// String attribute
    String,
    /// Free-form description some producers put in place of a type
    Other(String),
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Number" => Self::Number,
            "Boolean" => Self::Boolean,
            "String" => Self::String,
            _ => Self::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Number => "Number".to_string(),
            FieldType::Boolean => "Boolean".to_string(),
            FieldType::String => "String".to_string(),
            FieldType::Other(other) => other,
        }
    }
}

/// Schema of one layer in a vector tile archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorLayer {
    /// Layer name as used inside tiles
    pub id: String,
    /// Attribute names and types
    #[serde(default)]
    pub fields: BTreeMap<String, FieldType>,
    /// Layer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lowest zoom the layer appears at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    /// Highest zoom the layer appears at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
}

impl VectorLayer {
    /// Create a layer with no fields
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            description: None,
            minzoom: None,
            maxzoom: None,
        }
    }

    /// Add an attribute
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }
}

/// Decoded metadata blob
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct JsonMetadata {
    /// Vector layer schema, empty when absent
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vector_layers: Vec<VectorLayer>,
    /// Every other top-level key
    ///
    /// Non-string values are kept as their compact JSON text.
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

impl JsonMetadata {
    /// Decode an uncompressed metadata blob
    pub fn parse(data: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)?;
        let Value::Object(mut map) = value else {
            return Err(MetadataError::NotAnObject(json_kind(&value)));
        };

        let vector_layers = match map.remove(VECTOR_LAYERS_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(layers) => serde_json::from_value(layers)?,
        };

        let other = map
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();

        Ok(Self {
            vector_layers,
            other,
        })
    }

    /// Encode as compact JSON
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Tile format tag derived from the header tile type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    /// Mapbox Vector Tile (protobuf)
    Pbf,
    /// PNG image
    Png,
    /// JPEG image
    Jpg,
    /// WebP image
    Webp,
    /// AVIF image
    Avif,
}

impl TileFormat {
    /// Format for a tile type, `None` when the type is unknown
    pub const fn from_tile_type(tile_type: TileType) -> Option<Self> {
        match tile_type {
            TileType::Mvt => Some(Self::Pbf),
            TileType::Png => Some(Self::Png),
            TileType::Jpeg => Some(Self::Jpg),
            TileType::Webp => Some(Self::Webp),
            TileType::Avif => Some(Self::Avif),
            TileType::Unknown => None,
        }
    }

    /// TileJSON/MBTiles style format string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pbf => "pbf",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive-level metadata combining the header and the JSON blob
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveMetadata {
    /// Archive name
    pub name: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Attribution (HTML allowed)
    pub attribution: Option<String>,
    /// Dataset version
    pub version: Option<String>,
    /// `baselayer` or `overlay`
    pub archive_type: Option<String>,
    /// Tile format, `None` for unknown tile types
    pub format: Option<TileFormat>,
    /// Geographic bounds
    pub bounds: Bounds,
    /// Center point
    pub center: Center,
    /// Center zoom
    pub zoom: f64,
    /// Lowest zoom with tiles
    pub min_zoom: u8,
    /// Highest zoom with tiles
    pub max_zoom: u8,
    /// Vector layer schema
    pub vector_layers: Vec<VectorLayer>,
    /// Keys not lifted into a dedicated field
    pub others: BTreeMap<String, String>,
    /// Compression of tile payloads
    pub tile_compression: Compression,
}

impl ArchiveMetadata {
    /// Reconcile the header with a decoded metadata blob
    pub fn from_parts(header: &Header, json: JsonMetadata) -> Self {
        let JsonMetadata {
            vector_layers,
            mut other,
        } = json;

        Self {
            name: other.remove(NAME_KEY),
            description: other.remove(DESCRIPTION_KEY),
            attribution: other.remove(ATTRIBUTION_KEY),
            version: other.remove(VERSION_KEY),
            archive_type: other.remove(TYPE_KEY),
            format: TileFormat::from_tile_type(header.tile_type),
            bounds: header.bounds(),
            center: header.center(),
            zoom: f64::from(header.center_zoom),
            min_zoom: header.min_zoom,
            max_zoom: header.max_zoom,
            vector_layers,
            others: other,
            tile_compression: header.tile_compression,
        }
    }
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
