use std::fmt::Display;

use crate::common::TEXT_SIZE;
use crate::error::{DbError, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Text,
}

impl Type {
    /// Number of bytes a serialized field of this type occupies.
    pub fn size(&self) -> usize {
        match self {
            Type::Int => std::mem::size_of::<i32>(),
            Type::Text => TEXT_SIZE,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Text => write!(f, "TEXT"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TdItem {
    field_type: Type,
    name: Option<String>,
}

impl TdItem {
    pub fn new(field_type: Type) -> Self {
        Self {
            field_type,
            name: None,
        }
    }

    pub fn named(field_type: Type, name: impl Into<String>) -> Self {
        Self {
            field_type,
            name: Some(name.into()),
        }
    }

    pub fn field_type(&self) -> Type {
        self.field_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The schema of a tuple: an ordered sequence of typed, optionally named fields.
/// Two descriptors are equal iff they have the same arity and pointwise equal
/// types. Field names never influence equality.
#[derive(Clone, Debug)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Creates a new descriptor. It must contain at least one field.
    pub fn new(items: Vec<TdItem>) -> Self {
        debug_assert!(!items.is_empty());
        Self { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[TdItem] {
        &self.items
    }

    pub fn field_type(&self, index: usize) -> Result<Type> {
        self.items
            .get(index)
            .map(|item| item.field_type)
            .ok_or_else(|| DbError::NoSuchElement(format!("no field with index {}", index)))
    }

    pub fn field_name(&self, index: usize) -> Result<Option<&str>> {
        self.items
            .get(index)
            .map(|item| item.name())
            .ok_or_else(|| DbError::NoSuchElement(format!("no field with index {}", index)))
    }

    /// Returns the index of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.name() == Some(name))
            .ok_or_else(|| DbError::NoSuchElement(format!("no field named {}", name)))
    }

    /// The fixed number of bytes a serialized tuple of this schema occupies.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.size()).sum()
    }

    /// Concatenates two descriptors, the fields of `left` coming first.
    pub fn merge(left: &TupleDesc, right: &TupleDesc) -> TupleDesc {
        let mut items = left.items.clone();
        items.extend(right.items.iter().cloned());
        TupleDesc::new(items)
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl Display for TupleDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .items
            .iter()
            .map(|item| format!("{}({})", item.field_type, item.name().unwrap_or("")))
            .collect::<Vec<_>>();
        write!(f, "{}", fields.join(", "))
    }
}
