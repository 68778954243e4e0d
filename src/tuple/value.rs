use std::fmt::Display;

use crate::common::{TEXT_MAX_LEN, TEXT_SIZE};
use crate::error::{DbError, Result};
use crate::tuple::schema::Type;

/// Comparison operators a predicate can apply to a pair of fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Like,
}

fn compare<T: PartialEq + PartialOrd + ?Sized>(left: &T, right: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::Less => left < right,
        CompareOp::LessEq => left <= right,
        CompareOp::Greater => left > right,
        CompareOp::GreaterEq => left >= right,
        CompareOp::Like => unreachable!(),
    }
}

/// A tagged scalar value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// Creates a text field, truncating the payload to the fixed on-disk size
    /// (backing up to a character boundary if necessary).
    pub fn text(value: impl Into<String>) -> Self {
        let mut value = value.into();
        if value.len() > TEXT_MAX_LEN {
            let mut cut = TEXT_MAX_LEN;
            while !value.is_char_boundary(cut) {
                cut -= 1;
            }
            value.truncate(cut);
        }
        Field::Text(value)
    }

    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Text(_) => Type::Text,
        }
    }

    /// Compares itself against another field of the same type.
    /// Fields of different types never compare as true.
    pub fn compare(&self, op: CompareOp, other: &Field) -> bool {
        match (self, other) {
            (Field::Int(left), Field::Int(right)) => match op {
                CompareOp::Like => left == right,
                _ => compare(left, right, op),
            },
            (Field::Text(left), Field::Text(right)) => match op {
                CompareOp::Like => left.contains(right.as_str()),
                _ => compare(left.as_str(), right.as_str(), op),
            },
            _ => false,
        }
    }

    /// Parses a field of the given type from its on-disk representation.
    pub fn parse(bytes: &[u8], field_type: Type) -> Result<Self> {
        match field_type {
            Type::Int => {
                let val = i32::from_be_bytes(bytes[..4].try_into().unwrap());
                Ok(Field::Int(val))
            }
            Type::Text => {
                let len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
                if len > TEXT_MAX_LEN {
                    return Err(DbError::Invalid(format!(
                        "text field length {} exceeds the maximum of {}",
                        len, TEXT_MAX_LEN
                    )));
                }
                let slice = &bytes[4..4 + len];
                let val = std::str::from_utf8(slice)
                    .map_err(|e| DbError::Invalid(format!("text field is not valid utf-8: {}", e)))?
                    .to_owned();
                Ok(Field::Text(val))
            }
        }
    }

    /// Writes the field into the buffer. Every field occupies exactly
    /// `field_type().size()` bytes; text payloads are zero padded.
    pub fn serialize(&self, buffer: &mut [u8]) {
        match self {
            Field::Int(val) => buffer[..4].copy_from_slice(val.to_be_bytes().as_slice()),
            Field::Text(val) => {
                let bytes = val.as_bytes();
                let len = bytes.len().min(TEXT_MAX_LEN);
                buffer[..4].copy_from_slice((len as u32).to_be_bytes().as_slice());
                buffer[4..4 + len].copy_from_slice(&bytes[..len]);
                buffer[4 + len..TEXT_SIZE].fill(0);
            }
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Field::Int(val) => *val,
            _ => unreachable!(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Field::Text(val) => val,
            _ => unreachable!(),
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Int(val) => Display::fmt(val, f),
            Field::Text(val) => Display::fmt(val, f),
        }
    }
}
