//! SQL data type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage class of the MySQL-style sized text and blob families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobSize {
    /// `TINYTEXT` / `TINYBLOB` (255 bytes).
    Tiny,
    /// `TEXT` / `BLOB` (64 KiB).
    Regular,
    /// `MEDIUMTEXT` / `MEDIUMBLOB` (16 MiB).
    Medium,
    /// `LONGTEXT` / `LONGBLOB` (4 GiB).
    Long,
}

impl LobSize {
    /// Maximum number of bytes the type can hold.
    #[must_use]
    pub const fn capacity(self) -> u64 {
        match self {
            Self::Tiny => 255,
            Self::Regular => 65_535,
            Self::Medium => 16_777_215,
            Self::Long => 4_294_967_295,
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Tiny => "TINY",
            Self::Regular => "",
            Self::Medium => "MEDIUM",
            Self::Long => "LONG",
        }
    }
}

/// Normalized, dialect-independent category of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Whole numbers, including booleans stored as small integers.
    Integer,
    /// Fixed and floating point numbers.
    Decimal,
    /// Character data, including enumerations.
    String,
    /// Byte strings.
    Binary,
    /// Dates, times and timestamps.
    Temporal,
    /// Everything else (JSON, UUID, arrays, vendor types).
    Other,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Temporal => "temporal",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// SQL data types, normalized across dialect spellings.
///
/// `INT`, `INTEGER` and `INT4` all become [`DataType::Integer`]; the text the
/// user wrote is kept separately on the schema model for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    // Integer types, with the MySQL display width if one was given.
    /// 1-byte integer.
    Tinyint(Option<u32>),
    /// 2-byte integer.
    Smallint(Option<u32>),
    /// 3-byte integer.
    Mediumint(Option<u32>),
    /// 4-byte integer.
    Integer(Option<u32>),
    /// 8-byte integer.
    Bigint(Option<u32>),
    /// Boolean.
    Boolean,

    // Numeric types
    /// Exact numeric with precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u32>,
        /// Number of digits after the decimal point.
        scale: Option<u32>,
    },
    /// `FLOAT` with optional precision in bits.
    Float(Option<u32>),
    /// 4-byte float.
    Real,
    /// 8-byte float.
    Double,

    // String types
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string; `None` means unbounded.
    Varchar(Option<u32>),
    /// Text of the given storage class.
    Text(LobSize),
    /// `ENUM('a', 'b')`.
    Enum(Vec<String>),
    /// `SET('a', 'b')`.
    Set(Vec<String>),

    // Binary types
    /// Fixed-length binary.
    Binary(Option<u32>),
    /// Variable-length binary; `None` means unbounded (`BYTEA`).
    Varbinary(Option<u32>),
    /// Binary large object of the given storage class.
    Blob(LobSize),

    // Temporal types
    /// Calendar date.
    Date,
    /// Time of day.
    Time {
        /// Fractional seconds precision.
        precision: Option<u32>,
        /// `WITH TIME ZONE`.
        with_time_zone: bool,
    },
    /// Timestamp.
    Timestamp {
        /// Fractional seconds precision.
        precision: Option<u32>,
        /// `WITH TIME ZONE` / `TIMESTAMPTZ`.
        with_time_zone: bool,
    },
    /// MySQL `DATETIME` with optional fractional seconds precision.
    Datetime(Option<u32>),
    /// MySQL `YEAR`.
    Year,

    // Other
    /// JSON document (`JSON`, `JSONB`).
    Json,
    /// UUID.
    Uuid,
    /// PostgreSQL array of an element type.
    Array(Box<DataType>),
    /// Any type the normalizer does not model, upper-cased as written.
    Custom(String),
}

impl DataType {
    /// Returns the normalized kind of this type.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Tinyint(_)
            | Self::Smallint(_)
            | Self::Mediumint(_)
            | Self::Integer(_)
            | Self::Bigint(_)
            | Self::Boolean => TypeKind::Integer,
            Self::Decimal { .. } | Self::Float(_) | Self::Real | Self::Double => TypeKind::Decimal,
            Self::Char(_) | Self::Varchar(_) | Self::Text(_) | Self::Enum(_) | Self::Set(_) => {
                TypeKind::String
            }
            Self::Binary(_) | Self::Varbinary(_) | Self::Blob(_) => TypeKind::Binary,
            Self::Date
            | Self::Time { .. }
            | Self::Timestamp { .. }
            | Self::Datetime(_)
            | Self::Year => TypeKind::Temporal,
            Self::Json | Self::Uuid | Self::Array(_) | Self::Custom(_) => TypeKind::Other,
        }
    }

    /// Returns the canonical SQL spelling of the data type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        fn sized(name: &str, size: Option<u32>) -> String {
            match size {
                Some(n) => format!("{name}({n})"),
                None => name.to_string(),
            }
        }
        fn quoted_list(values: &[String]) -> String {
            values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            Self::Tinyint(w) => sized("TINYINT", *w),
            Self::Smallint(w) => sized("SMALLINT", *w),
            Self::Mediumint(w) => sized("MEDIUMINT", *w),
            Self::Integer(w) => sized("INT", *w),
            Self::Bigint(w) => sized("BIGINT", *w),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p},{s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => "DECIMAL".to_string(),
            },
            Self::Float(p) => sized("FLOAT", *p),
            Self::Real => "REAL".to_string(),
            Self::Double => "DOUBLE".to_string(),
            Self::Char(n) => sized("CHAR", *n),
            Self::Varchar(n) => sized("VARCHAR", *n),
            Self::Text(size) => format!("{}TEXT", size.prefix()),
            Self::Enum(values) => format!("ENUM({})", quoted_list(values)),
            Self::Set(values) => format!("SET({})", quoted_list(values)),
            Self::Binary(n) => sized("BINARY", *n),
            Self::Varbinary(n) => sized("VARBINARY", *n),
            Self::Blob(size) => format!("{}BLOB", size.prefix()),
            Self::Date => "DATE".to_string(),
            Self::Time {
                precision,
                with_time_zone,
            } => with_zone(sized("TIME", *precision), *with_time_zone),
            Self::Timestamp {
                precision,
                with_time_zone,
            } => with_zone(sized("TIMESTAMP", *precision), *with_time_zone),
            Self::Datetime(p) => sized("DATETIME", *p),
            Self::Year => "YEAR".to_string(),
            Self::Json => "JSON".to_string(),
            Self::Uuid => "UUID".to_string(),
            Self::Array(inner) => format!("{}[]", inner.to_sql()),
            Self::Custom(name) => name.clone(),
        }
    }
}

fn with_zone(base: String, with_time_zone: bool) -> String {
    if with_time_zone {
        format!("{base} WITH TIME ZONE")
    } else {
        base
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
