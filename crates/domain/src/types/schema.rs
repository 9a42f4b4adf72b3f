//! Container and column schema types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::impl_wire_name_conversions;

/// Declared scalar type of a column.
///
/// Unknown type names (array types, future additions) are kept verbatim in
/// `Other` so a schema fetched from the service never fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Timestamp,
    Geometry,
    Blob,
    Other(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bool => "BOOL",
            Self::String => "STRING",
            Self::Byte => "BYTE",
            Self::Short => "SHORT",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Timestamp => "TIMESTAMP",
            Self::Geometry => "GEOMETRY",
            Self::Blob => "BLOB",
            Self::Other(name) => name,
        }
    }

    /// Whole-number column (`BYTE`, `SHORT`, `INTEGER`, `LONG`).
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Integer | Self::Long)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

impl FromStr for ColumnType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Self::Bool,
            "STRING" => Self::String,
            "BYTE" => Self::Byte,
            "SHORT" => Self::Short,
            "INTEGER" => Self::Integer,
            "LONG" => Self::Long,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "TIMESTAMP" => Self::Timestamp,
            "GEOMETRY" => Self::Geometry,
            "BLOB" => Self::Blob,
            _ => Self::Other(s.to_owned()),
        };
        Ok(parsed)
    }
}

impl From<&str> for ColumnType {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// One column of a container schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self { name: name.into(), column_type: column_type.into() }
    }
}

/// Storage layout of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerType {
    /// General-purpose keyed collection
    #[default]
    Collection,
    /// Append-only series indexed by a leading timestamp column
    TimeSeries,
}

impl_wire_name_conversions!(ContainerType {
    Collection => "COLLECTION",
    TimeSeries => "TIME_SERIES",
});

/// Container schema descriptor, used both for creation and for
/// `GET /containers/{name}/info` responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub container_name: String,
    #[serde(default)]
    pub container_type: ContainerType,
    #[serde(default)]
    pub rowkey: bool,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

impl ContainerInfo {
    pub fn new(name: impl Into<String>, container_type: ContainerType) -> Self {
        Self {
            container_name: name.into(),
            container_type,
            rowkey: false,
            columns: Vec::new(),
        }
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, ContainerType::Collection)
    }

    pub fn time_series(name: impl Into<String>) -> Self {
        Self::new(name, ContainerType::TimeSeries)
    }

    /// Mark the first column as row key.
    #[must_use]
    pub fn with_rowkey(mut self, rowkey: bool) -> Self {
        self.rowkey = rowkey;
        self
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        self.columns.push(ColumnDescriptor::new(name, column_type));
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
