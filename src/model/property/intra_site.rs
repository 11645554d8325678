use serde::{Deserialize, Serialize};

use super::{parse_fields, FieldMap, SiblingView};
use crate::model::error::PropertyError;
use crate::model::schema::PropertyName;
use crate::model::types::Element;

/// Cartesian site positions in Angstrom. Anchors the site count: every other
/// intra-site property must match its length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Positions {
    pub value: Vec<[f64; 3]>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PositionsFields {
    #[serde(default)]
    value: Option<Vec<[f64; 3]>>,
}

impl Positions {
    pub(crate) fn from_fields(fields: &FieldMap) -> Result<Self, PropertyError> {
        let parsed: PositionsFields = parse_fields(PropertyName::Positions, fields)?;
        let value = parsed
            .value
            .ok_or_else(|| PropertyError::invalid_payload("positions", "no value provided"))?;
        if value.is_empty() {
            return Err(PropertyError::invalid_payload(
                "positions",
                "at least one site is required",
            ));
        }
        Ok(Self { value })
    }

    #[inline]
    pub fn site_count(&self) -> usize {
        self.value.len()
    }
}

/// Chemical symbol of each site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbols {
    pub value: Vec<Element>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SymbolsFields {
    #[serde(default)]
    value: Option<Vec<Element>>,
}

impl Symbols {
    pub(crate) fn from_fields(
        fields: &FieldMap,
        view: SiblingView<'_>,
    ) -> Result<Self, PropertyError> {
        let parsed: SymbolsFields = parse_fields(PropertyName::Symbols, fields)?;
        let value = parsed
            .value
            .ok_or_else(|| PropertyError::invalid_payload("symbols", "no value provided"))?;
        check_site_count("symbols", value.len(), view)?;
        Ok(Self { value })
    }
}

/// Mass of each site in atomic mass units. Defaults per chemical symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mass {
    pub value: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MassFields {
    #[serde(default)]
    value: Option<Vec<f64>>,
}

impl Mass {
    pub(crate) fn from_fields(
        fields: &FieldMap,
        view: SiblingView<'_>,
    ) -> Result<Self, PropertyError> {
        let parsed: MassFields = parse_fields(PropertyName::Mass, fields)?;
        let value = match parsed.value {
            Some(value) => {
                check_site_count("mass", value.len(), view)?;
                value
            }
            // Symbols are validated before mass, so the default can read them.
            None => view
                .symbols()
                .map(|symbols| {
                    symbols
                        .value
                        .iter()
                        .map(|element| element.atomic_mass())
                        .collect()
                })
                .ok_or_else(|| {
                    PropertyError::invalid_payload("mass", "symbols are needed for default masses")
                })?,
        };
        Ok(Self { value })
    }
}

/// Electric charge of each site, in units of e.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charge {
    pub value: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ChargeFields {
    #[serde(default)]
    value: Option<Vec<f64>>,
}

impl Charge {
    pub(crate) fn from_fields(
        fields: &FieldMap,
        view: SiblingView<'_>,
    ) -> Result<Self, PropertyError> {
        let parsed: ChargeFields = parse_fields(PropertyName::Charge, fields)?;
        let value = parsed
            .value
            .ok_or_else(|| PropertyError::invalid_payload("charge", "no value provided"))?;
        check_site_count("charge", value.len(), view)?;
        Ok(Self { value })
    }
}

/// Kind label of each site. Sites sharing a label are treated as equivalent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kinds {
    pub value: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KindsFields {
    #[serde(default)]
    value: Option<Vec<String>>,
}

impl Kinds {
    pub(crate) fn from_fields(
        fields: &FieldMap,
        view: SiblingView<'_>,
    ) -> Result<Self, PropertyError> {
        let parsed: KindsFields = parse_fields(PropertyName::Kinds, fields)?;
        let value = parsed
            .value
            .ok_or_else(|| PropertyError::invalid_payload("kinds", "no value provided"))?;
        if view.symbols().is_none() {
            return Err(PropertyError::invalid_payload(
                "kinds",
                "kinds require the corresponding symbols",
            ));
        }
        check_site_count("kinds", value.len(), view)?;
        Ok(Self { value })
    }
}

fn check_site_count(
    name: &str,
    actual: usize,
    view: SiblingView<'_>,
) -> Result<(), PropertyError> {
    match view.site_count() {
        Some(expected) if expected != actual => {
            Err(PropertyError::length_mismatch(name, expected, actual))
        }
        Some(_) => Ok(()),
        None => Err(PropertyError::invalid_payload(
            name,
            "positions must be defined first",
        )),
    }
}
