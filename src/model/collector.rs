//! The immutable property container.
//!
//! A [`PropertyCollector`] owns the full set of validated properties for one
//! structure snapshot. Construction runs the fixed five-step procedure
//! (presence, defaulting, membership, shape, ordered validation); once built
//! the collector exposes no mutating method. Updates go through
//! [`PropertyCollector::with_property`], which overlays one field record on
//! the current payload and re-runs the whole construction, yielding a brand
//! new snapshot and leaving the old one untouched.

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::PropertyError;
use super::property::{
    Cell, Charge, CustomProperty, FieldMap, Kinds, Mass, Payload, Pbc, Positions, Property,
    SiblingView, Symbols,
};
use super::schema::{self, PropertyName, SCHEMAS};
use crate::hubbard::Hubbard;
use crate::magnetic::Magnetization;

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCollector {
    /// Normalized payload: what was provided, with defaults substituted.
    raw: Payload,
    validated: BTreeMap<PropertyName, Property>,
}

impl PropertyCollector {
    /// Build a collector from a `name -> {field: value}` payload mapping.
    ///
    /// Steps, in order:
    /// 1. every required property name must be present,
    /// 2. absent derived properties get a null placeholder (their concrete
    ///    default is computed during validation),
    /// 3. every name must have a schema,
    /// 4. every field record must be a non-empty mapping,
    /// 5. properties are instantiated in registry order, each validator
    ///    seeing only the siblings validated before it.
    pub fn from_payload(payload: Payload) -> Result<Self, PropertyError> {
        // Step 1: presence of required properties.
        for required in schema::required_names() {
            if !payload.contains_key(required) {
                return Err(PropertyError::missing_required(required));
            }
        }

        // Step 2: placeholders for absent derived properties.
        let mut raw = payload;
        for derived in schema::derived_names() {
            raw.entry(derived.to_string()).or_insert_with(|| {
                let mut fields = FieldMap::new();
                fields.insert("value".to_string(), Value::Null);
                fields
            });
        }

        // Steps 3 and 4: schema membership and payload shape.
        for (name, fields) in &raw {
            name.parse::<PropertyName>()?;
            if fields.is_empty() {
                return Err(PropertyError::invalid_payload(name, "empty field record"));
            }
        }

        // Step 5: instantiation in registry order against validated siblings.
        let mut validated = BTreeMap::new();
        for schema in &SCHEMAS {
            let name = schema.name;
            if let Some(fields) = raw.get(name.as_str()) {
                let property = Property::from_fields(name, fields, SiblingView::new(&validated))?;
                validated.insert(name, property);
            }
        }

        // Normalize the stored payload so defaults and canonical field forms
        // survive a round trip.
        let mut normalized = Payload::new();
        for (name, property) in &validated {
            normalized.insert(name.as_str().to_string(), property.to_fields());
        }

        Ok(Self {
            raw: normalized,
            validated,
        })
    }

    /// Serialize to the payload mapping this collector reconstructs from.
    pub fn to_payload(&self) -> Payload {
        self.raw.clone()
    }

    /// New collector with `name` replaced (or added), all invariants
    /// re-checked. The current collector is left untouched.
    pub fn with_property(&self, name: &str, fields: FieldMap) -> Result<Self, PropertyError> {
        let parsed: PropertyName = name.parse()?;
        let mut payload = self.to_payload();
        payload.insert(parsed.as_str().to_string(), fields);
        Self::from_payload(payload)
    }

    /// Generic accessor over the closed property set.
    pub fn get(&self, name: PropertyName) -> Result<&Property, PropertyError> {
        self.validated
            .get(&name)
            .ok_or_else(|| PropertyError::not_set(name.as_str()))
    }

    /// Names of all supported properties, in validation order.
    pub fn supported_names() -> Vec<&'static str> {
        schema::supported_names()
    }

    /// Names of the properties stored on this snapshot, in validation order.
    pub fn stored_names(&self) -> Vec<&'static str> {
        SCHEMAS
            .iter()
            .map(|schema| schema.name)
            .filter(|name| self.validated.contains_key(name))
            .map(|name| name.as_str())
            .collect()
    }

    pub fn pbc(&self) -> &Pbc {
        match self.validated.get(&PropertyName::Pbc) {
            Some(Property::Pbc(pbc)) => pbc,
            _ => unreachable!("pbc is derived and always stored"),
        }
    }

    pub fn cell(&self) -> &Cell {
        match self.validated.get(&PropertyName::Cell) {
            Some(Property::Cell(cell)) => cell,
            _ => unreachable!("cell is derived and always stored"),
        }
    }

    pub fn positions(&self) -> &Positions {
        match self.validated.get(&PropertyName::Positions) {
            Some(Property::Positions(positions)) => positions,
            _ => unreachable!("positions is required and always stored"),
        }
    }

    pub fn symbols(&self) -> &Symbols {
        match self.validated.get(&PropertyName::Symbols) {
            Some(Property::Symbols(symbols)) => symbols,
            _ => unreachable!("symbols is required and always stored"),
        }
    }

    pub fn mass(&self) -> &Mass {
        match self.validated.get(&PropertyName::Mass) {
            Some(Property::Mass(mass)) => mass,
            _ => unreachable!("mass is derived and always stored"),
        }
    }

    pub fn charge(&self) -> Option<&Charge> {
        match self.validated.get(&PropertyName::Charge) {
            Some(Property::Charge(charge)) => Some(charge),
            _ => None,
        }
    }

    pub fn kinds(&self) -> Option<&Kinds> {
        match self.validated.get(&PropertyName::Kinds) {
            Some(Property::Kinds(kinds)) => Some(kinds),
            _ => None,
        }
    }

    pub fn magnetization(&self) -> Option<&Magnetization> {
        match self.validated.get(&PropertyName::Magnetization) {
            Some(Property::Magnetization(magnetization)) => Some(magnetization),
            _ => None,
        }
    }

    pub fn hubbard(&self) -> Option<&Hubbard> {
        match self.validated.get(&PropertyName::Hubbard) {
            Some(Property::Hubbard(hubbard)) => Some(hubbard),
            _ => None,
        }
    }

    pub fn custom(&self) -> Option<&CustomProperty> {
        match self.validated.get(&PropertyName::Custom) {
            Some(Property::Custom(custom)) => Some(custom),
            _ => None,
        }
    }

    #[inline]
    pub fn site_count(&self) -> usize {
        self.positions().site_count()
    }

    /// Kind name of each site: the stored `kinds` labels, or the bare
    /// chemical symbols when no kinds are set.
    pub fn site_kind_names(&self) -> Vec<String> {
        match self.kinds() {
            Some(kinds) => kinds.value.clone(),
            None => self
                .symbols()
                .value
                .iter()
                .map(|element| element.symbol().to_string())
                .collect(),
        }
    }
}
