//! Property value objects and the closed dispatch over their names.
//!
//! Each concrete property is an immutable struct that knows how to build
//! itself from a raw field record and validate itself against the siblings
//! that precede it in the registry order. The [`Property`] enum is the
//! tagged union the collector stores; there is no reflective attribute
//! wiring, only the `match` in [`Property::from_fields`].

mod custom;
mod globals;
mod intra_site;

pub use custom::CustomProperty;
pub use globals::{Cell, Pbc};
pub use intra_site::{Charge, Kinds, Mass, Positions, Symbols};

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::PropertyError;
use super::schema::PropertyName;
use crate::hubbard::Hubbard;
use crate::magnetic::Magnetization;

/// One property's raw field record (`{"value": ...}` and friends).
pub type FieldMap = serde_json::Map<String, Value>;

/// Full construction input: property name to field record.
pub type Payload = BTreeMap<String, FieldMap>;

/// A validated property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Pbc(Pbc),
    Cell(Cell),
    Positions(Positions),
    Symbols(Symbols),
    Mass(Mass),
    Charge(Charge),
    Kinds(Kinds),
    Magnetization(Magnetization),
    Hubbard(Hubbard),
    Custom(CustomProperty),
}

/// Read-only view over the properties validated so far.
///
/// Handed to each validator during the construction pass; this is the only
/// channel through which a property can see its siblings, and it never
/// outlives the pass.
#[derive(Debug, Clone, Copy)]
pub struct SiblingView<'a> {
    validated: &'a BTreeMap<PropertyName, Property>,
}

impl<'a> SiblingView<'a> {
    pub(crate) fn new(validated: &'a BTreeMap<PropertyName, Property>) -> Self {
        Self { validated }
    }

    pub fn positions(&self) -> Option<&'a Positions> {
        match self.validated.get(&PropertyName::Positions) {
            Some(Property::Positions(positions)) => Some(positions),
            _ => None,
        }
    }

    pub fn symbols(&self) -> Option<&'a Symbols> {
        match self.validated.get(&PropertyName::Symbols) {
            Some(Property::Symbols(symbols)) => Some(symbols),
            _ => None,
        }
    }

    /// Site count anchored by `positions`, if validated already.
    pub fn site_count(&self) -> Option<usize> {
        self.positions().map(|positions| positions.value.len())
    }
}

impl Property {
    pub fn name(&self) -> PropertyName {
        match self {
            Property::Pbc(_) => PropertyName::Pbc,
            Property::Cell(_) => PropertyName::Cell,
            Property::Positions(_) => PropertyName::Positions,
            Property::Symbols(_) => PropertyName::Symbols,
            Property::Mass(_) => PropertyName::Mass,
            Property::Charge(_) => PropertyName::Charge,
            Property::Kinds(_) => PropertyName::Kinds,
            Property::Magnetization(_) => PropertyName::Magnetization,
            Property::Hubbard(_) => PropertyName::Hubbard,
            Property::Custom(_) => PropertyName::Custom,
        }
    }

    /// Instantiate and validate the property `name` from its field record.
    pub(crate) fn from_fields(
        name: PropertyName,
        fields: &FieldMap,
        view: SiblingView<'_>,
    ) -> Result<Self, PropertyError> {
        match name {
            PropertyName::Pbc => Pbc::from_fields(fields).map(Property::Pbc),
            PropertyName::Cell => Cell::from_fields(fields).map(Property::Cell),
            PropertyName::Positions => Positions::from_fields(fields).map(Property::Positions),
            PropertyName::Symbols => Symbols::from_fields(fields, view).map(Property::Symbols),
            PropertyName::Mass => Mass::from_fields(fields, view).map(Property::Mass),
            PropertyName::Charge => Charge::from_fields(fields, view).map(Property::Charge),
            PropertyName::Kinds => Kinds::from_fields(fields, view).map(Property::Kinds),
            PropertyName::Magnetization => {
                Magnetization::from_fields(fields, view).map(Property::Magnetization)
            }
            PropertyName::Hubbard => Hubbard::from_fields(fields).map(Property::Hubbard),
            PropertyName::Custom => CustomProperty::from_fields(fields).map(Property::Custom),
        }
    }

    /// Serialize back to the raw field record this property round-trips to.
    pub(crate) fn to_fields(&self) -> FieldMap {
        match self {
            Property::Pbc(p) => serialize_fields(p),
            Property::Cell(p) => serialize_fields(p),
            Property::Positions(p) => serialize_fields(p),
            Property::Symbols(p) => serialize_fields(p),
            Property::Mass(p) => serialize_fields(p),
            Property::Charge(p) => serialize_fields(p),
            Property::Kinds(p) => serialize_fields(p),
            Property::Magnetization(p) => serialize_fields(p),
            Property::Hubbard(p) => serialize_fields(p),
            Property::Custom(p) => p.fields.clone(),
        }
    }
}

pub(crate) fn parse_fields<T: DeserializeOwned>(
    name: PropertyName,
    fields: &FieldMap,
) -> Result<T, PropertyError> {
    serde_json::from_value(Value::Object(fields.clone()))
        .map_err(|e| PropertyError::invalid_payload(name.as_str(), e.to_string()))
}

fn serialize_fields<T: Serialize>(property: &T) -> FieldMap {
    match serde_json::to_value(property) {
        Ok(Value::Object(map)) => map,
        // Property structs always serialize to objects.
        _ => FieldMap::new(),
    }
}
