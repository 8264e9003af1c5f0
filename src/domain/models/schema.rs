//! Record schema and typed field access
//!
//! A schema is announced by the transport as a comma separated list of
//! `<type> <name>` pairs, e.g. `double FEATURE_OUTPUT_PROBA,ipaddr DST_IP,uint16 DST_PORT`.
//! Fields are laid out contiguously in declaration order, little-endian.
//! Any schema announcement invalidates every previously resolved [`FieldAccessor`].

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use super::record::Record;
use crate::domain::error::SchemaError;

/// Maximum payload carried by a single frame
pub const MAX_RECORD_SIZE: usize = u16::MAX as usize;

/// Fixed-width field types understood by the accessor layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Char,
    Float,
    Double,
    Time,
    Macaddr,
    Ipaddr,
}

impl FieldKind {
    /// Width of the field in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Char => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float => 4,
            Self::Int64 | Self::Uint64 | Self::Double | Self::Time => 8,
            Self::Macaddr => 6,
            Self::Ipaddr => 16,
        }
    }

    /// Type name as written in a schema announcement
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Char => "char",
            Self::Float => "float",
            Self::Double => "double",
            Self::Time => "time",
            Self::Macaddr => "macaddr",
            Self::Ipaddr => "ipaddr",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "char" => Self::Char,
            "float" => Self::Float,
            "double" => Self::Double,
            "time" => Self::Time,
            "macaddr" => Self::Macaddr,
            "ipaddr" => Self::Ipaddr,
            _ => return Err(()),
        })
    }
}

/// A single named field with its resolved offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub offset: usize,
}

/// Parsed record layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    record_size: usize,
}

impl Schema {
    /// Parse the textual schema announcement
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0usize;

        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.split_whitespace();
            let (Some(kind), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(SchemaError::MalformedEntry(entry.to_string()));
            };

            let kind = kind.parse::<FieldKind>().map_err(|()| SchemaError::UnknownKind {
                kind: kind.to_string(),
                field: name.to_string(),
            })?;

            if !seen.insert(name.to_string()) {
                return Err(SchemaError::DuplicateField(name.to_string()));
            }

            fields.push(FieldSpec {
                name: name.to_string(),
                kind,
                offset,
            });
            offset += kind.size();
        }

        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        if offset > MAX_RECORD_SIZE {
            return Err(SchemaError::TooLarge(offset));
        }

        Ok(Self {
            fields,
            record_size: offset,
        })
    }

    /// Fields in wire order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Size in bytes of a record laid out with this schema
    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Look a field up by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{} {}", field.kind, field.name)?;
        }
        Ok(())
    }
}

/// Resolved location of one field inside records of a given schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAccessor {
    offset: usize,
    kind: FieldKind,
}

impl FieldAccessor {
    /// Resolve `name` in `schema`, accepting only the listed kinds
    pub fn resolve(schema: &Schema, name: &str, accepted: &[FieldKind]) -> Result<Self, SchemaError> {
        let field = schema
            .field(name)
            .ok_or_else(|| SchemaError::MissingField(name.to_string()))?;

        if !accepted.contains(&field.kind) {
            return Err(SchemaError::KindMismatch {
                field: name.to_string(),
                actual: field.kind,
                expected: accepted.to_vec(),
            });
        }

        Ok(Self {
            offset: field.offset,
            kind: field.kind,
        })
    }

    /// Type of the resolved field
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    fn bytes<'a>(&self, record: &'a Record) -> Option<&'a [u8]> {
        record
            .payload()
            .get(self.offset..self.offset + self.kind.size())
    }

    /// Read a floating point field (`double` or `float`)
    pub fn read_f64(&self, record: &Record) -> Option<f64> {
        let bytes = self.bytes(record)?;
        match self.kind {
            FieldKind::Double => Some(LittleEndian::read_f64(bytes)),
            FieldKind::Float => Some(f64::from(LittleEndian::read_f32(bytes))),
            _ => None,
        }
    }

    /// Read a `uint16` field, `None` when the record is too short
    pub fn read_u16(&self, record: &Record) -> Option<u16> {
        let bytes = self.bytes(record)?;
        match self.kind {
            FieldKind::Uint16 => Some(LittleEndian::read_u16(bytes)),
            _ => None,
        }
    }

    /// Read an `ipaddr` field; IPv4-mapped addresses decode to IPv4
    pub fn read_ip(&self, record: &Record) -> Option<IpAddr> {
        let bytes = self.bytes(record)?;
        if self.kind != FieldKind::Ipaddr {
            return None;
        }
        let octets: [u8; 16] = bytes.try_into().ok()?;
        let v6 = Ipv6Addr::from(octets);
        Some(v6.to_ipv4_mapped().map_or(IpAddr::V6(v6), IpAddr::V4))
    }
}
