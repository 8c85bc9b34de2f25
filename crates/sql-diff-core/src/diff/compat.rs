//! Type compatibility and data-loss risk classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{DataType, TypeKind};
use crate::schema::{Column, ColumnType};

/// How an old column type relates to a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCompatibility {
    /// Same normalized type.
    Identical,
    /// Every old value fits the new type.
    Widening,
    /// Some old values may not fit the new type.
    Narrowing,
    /// Values are converted between kinds or representations.
    Conversion,
}

impl TypeCompatibility {
    /// Returns true for narrowing and conversions.
    #[must_use]
    pub const fn is_risky(self) -> bool {
        matches!(self, Self::Narrowing | Self::Conversion)
    }
}

impl fmt::Display for TypeCompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identical => "identical",
            Self::Widening => "widening",
            Self::Narrowing => "narrowing",
            Self::Conversion => "conversion",
        })
    }
}

/// Why a change may lose data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    /// The new type cannot hold every old value.
    TypeNarrowing,
    /// Values are converted to a different kind.
    TypeConversion,
    /// `NOT NULL` added without a default; existing `NULL`s fail.
    NotNullWithoutDefault,
    /// A column is dropped.
    ColumnDropped,
    /// A table is dropped.
    TableDropped,
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TypeNarrowing => "type narrowing",
            Self::TypeConversion => "type conversion",
            Self::NotNullWithoutDefault => "NOT NULL without default",
            Self::ColumnDropped => "column dropped",
            Self::TableDropped => "table dropped",
        })
    }
}

/// Classifies a column type change.
#[must_use]
pub fn classify(old: &ColumnType, new: &ColumnType) -> TypeCompatibility {
    if old == new {
        return TypeCompatibility::Identical;
    }
    if old.data_type == new.data_type && old.unsigned == new.unsigned {
        // Only charset or collation differ.
        return if charset_changed(old, new) {
            TypeCompatibility::Conversion
        } else {
            TypeCompatibility::Widening
        };
    }

    let base = classify_data_types(&old.data_type, old.unsigned, &new.data_type, new.unsigned);
    if base == TypeCompatibility::Widening && charset_changed(old, new) {
        TypeCompatibility::Conversion
    } else {
        base
    }
}

fn charset_changed(old: &ColumnType, new: &ColumnType) -> bool {
    match (&old.charset, &new.charset) {
        (Some(a), Some(b)) => !a.eq_ignore_ascii_case(b),
        (None, None) => false,
        _ => true,
    }
}

/// Risks of modifying `old` into `new`.
#[must_use]
pub fn modify_risks(old: &Column, new: &Column, compatibility: TypeCompatibility) -> Vec<RiskReason> {
    let mut risks = Vec::new();
    match compatibility {
        TypeCompatibility::Narrowing => risks.push(RiskReason::TypeNarrowing),
        TypeCompatibility::Conversion => risks.push(RiskReason::TypeConversion),
        TypeCompatibility::Identical | TypeCompatibility::Widening => {}
    }
    if old.nullable && !new.nullable && new.default.is_none() {
        risks.push(RiskReason::NotNullWithoutDefault);
    }
    risks
}

fn ordering(widens: bool) -> TypeCompatibility {
    if widens {
        TypeCompatibility::Widening
    } else {
        TypeCompatibility::Narrowing
    }
}

fn classify_data_types(
    old: &DataType,
    old_unsigned: bool,
    new: &DataType,
    new_unsigned: bool,
) -> TypeCompatibility {
    use TypeKind as K;

    match (old.kind(), new.kind()) {
        (K::Integer, K::Integer) => {
            match (integer_range(old, old_unsigned), integer_range(new, new_unsigned)) {
                (Some((old_min, old_max)), Some((new_min, new_max))) => {
                    ordering(new_min <= old_min && new_max >= old_max)
                }
                _ => TypeCompatibility::Conversion,
            }
        }
        (K::Integer, K::Decimal) => match (new, integer_range(old, old_unsigned)) {
            (DataType::Decimal { precision, scale }, Some((min, max))) => {
                let digits = decimal_digits(min.unsigned_abs().max(max.unsigned_abs()));
                let (int_digits, _) = decimal_shape(*precision, *scale);
                let sign_ok = !new_unsigned || min >= 0;
                ordering(int_digits >= digits && sign_ok)
            }
            _ => TypeCompatibility::Conversion,
        },
        (K::Decimal, K::Decimal) => classify_numeric(old, old_unsigned, new, new_unsigned),
        (K::String, K::String) => classify_strings(old, new),
        (K::Binary, K::Binary) => match (binary_capacity(old), binary_capacity(new)) {
            (Some(a), Some(b)) => ordering(b >= a),
            _ => TypeCompatibility::Conversion,
        },
        (K::Temporal, K::Temporal) => classify_temporal(old, new),
        (K::Other, K::Other) => match (old, new) {
            (DataType::Array(a), DataType::Array(b)) => classify_data_types(a, false, b, false),
            _ => TypeCompatibility::Conversion,
        },
        _ => TypeCompatibility::Conversion,
    }
}

/// Value range of an integer type.
fn integer_range(data_type: &DataType, unsigned: bool) -> Option<(i128, i128)> {
    let bytes: u32 = match data_type {
        DataType::Boolean => return Some((0, 1)),
        DataType::Tinyint(_) => 1,
        DataType::Smallint(_) => 2,
        DataType::Mediumint(_) => 3,
        DataType::Integer(_) => 4,
        DataType::Bigint(_) => 8,
        _ => return None,
    };
    let bits = bytes * 8;
    Some(if unsigned {
        (0, (1_i128 << bits) - 1)
    } else {
        (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
    })
}

fn decimal_digits(mut value: u128) -> u32 {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

/// Integer digits and scale of a `DECIMAL`. A missing precision is
/// unbounded; a missing scale is zero.
fn decimal_shape(precision: Option<u32>, scale: Option<u32>) -> (u32, u32) {
    match precision {
        Some(p) => {
            let s = scale.unwrap_or(0);
            (p.saturating_sub(s), s)
        }
        None => (u32::MAX, u32::MAX),
    }
}

fn float_bytes(data_type: &DataType) -> Option<u32> {
    match data_type {
        DataType::Float(Some(p)) if *p > 24 => Some(8),
        DataType::Float(_) | DataType::Real => Some(4),
        DataType::Double => Some(8),
        _ => None,
    }
}

fn classify_numeric(
    old: &DataType,
    old_unsigned: bool,
    new: &DataType,
    new_unsigned: bool,
) -> TypeCompatibility {
    let sign_ok = old_unsigned || !new_unsigned;
    match (old, new) {
        (
            DataType::Decimal {
                precision: p1,
                scale: s1,
            },
            DataType::Decimal {
                precision: p2,
                scale: s2,
            },
        ) => {
            let (old_int, old_scale) = decimal_shape(*p1, *s1);
            let (new_int, new_scale) = decimal_shape(*p2, *s2);
            ordering(new_int >= old_int && new_scale >= old_scale && sign_ok)
        }
        _ => match (float_bytes(old), float_bytes(new)) {
            (Some(a), Some(b)) => ordering(b >= a && sign_ok),
            _ => TypeCompatibility::Conversion,
        },
    }
}

/// Character capacity of a string type; `u64::MAX` when unbounded.
fn string_capacity(data_type: &DataType) -> Option<u64> {
    match data_type {
        DataType::Char(n) => Some(u64::from(n.unwrap_or(1))),
        DataType::Varchar(n) => Some(n.map_or(u64::MAX, u64::from)),
        DataType::Text(size) => Some(size.capacity()),
        _ => None,
    }
}

fn classify_strings(old: &DataType, new: &DataType) -> TypeCompatibility {
    match (old, new) {
        (DataType::Enum(a), DataType::Enum(b)) | (DataType::Set(a), DataType::Set(b)) => {
            ordering(a.iter().all(|v| b.contains(v)))
        }
        (DataType::Enum(values), other) => match string_capacity(other) {
            Some(capacity) => {
                let longest = values.iter().map(|v| v.chars().count()).max().unwrap_or(0);
                ordering(capacity >= longest as u64)
            }
            None => TypeCompatibility::Conversion,
        },
        (DataType::Set(_), _) | (_, DataType::Set(_)) => TypeCompatibility::Conversion,
        (_, DataType::Enum(_)) => TypeCompatibility::Narrowing,
        _ => match (string_capacity(old), string_capacity(new)) {
            (Some(a), Some(b)) => ordering(b >= a),
            _ => TypeCompatibility::Conversion,
        },
    }
}

/// Byte capacity of a binary type; `u64::MAX` when unbounded.
fn binary_capacity(data_type: &DataType) -> Option<u64> {
    match data_type {
        DataType::Binary(n) => Some(u64::from(n.unwrap_or(1))),
        DataType::Varbinary(n) => Some(n.map_or(u64::MAX, u64::from)),
        DataType::Blob(size) => Some(size.capacity()),
        _ => None,
    }
}

fn classify_temporal(old: &DataType, new: &DataType) -> TypeCompatibility {
    match (old, new) {
        (
            DataType::Time {
                precision: p1,
                with_time_zone: z1,
            },
            DataType::Time {
                precision: p2,
                with_time_zone: z2,
            },
        )
        | (
            DataType::Timestamp {
                precision: p1,
                with_time_zone: z1,
            },
            DataType::Timestamp {
                precision: p2,
                with_time_zone: z2,
            },
        ) => {
            if z1 == z2 {
                ordering(p2.unwrap_or(0) >= p1.unwrap_or(0))
            } else {
                TypeCompatibility::Conversion
            }
        }
        (DataType::Datetime(p1), DataType::Datetime(p2)) => {
            ordering(p2.unwrap_or(0) >= p1.unwrap_or(0))
        }
        (DataType::Date, DataType::Datetime(_) | DataType::Timestamp { .. }) => {
            TypeCompatibility::Widening
        }
        (DataType::Datetime(_) | DataType::Timestamp { .. }, DataType::Date) => {
            TypeCompatibility::Narrowing
        }
        _ => TypeCompatibility::Conversion,
    }
}
