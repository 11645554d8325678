//! Static registry of property schemas.
//!
//! Each supported property has exactly one [`PropertySchema`] entry. The
//! registry order is the validation order: global properties first, then
//! intra-site properties in dependency order, so every validator only needs
//! to look at siblings that were validated before it (`symbols` needs
//! `positions`; `mass` and `charge` need `positions`; `kinds` needs
//! `symbols`).

use std::fmt;
use std::str::FromStr;

use super::error::PropertyError;

/// Closed enumeration of the supported property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyName {
    Pbc,
    Cell,
    Positions,
    Symbols,
    Mass,
    Charge,
    Kinds,
    Magnetization,
    Hubbard,
    Custom,
}

/// Domain of a property: one value for the whole structure, one value per
/// site, or an unmodeled escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Global,
    IntraSite,
    Custom,
}

/// Schema entry for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySchema {
    pub name: PropertyName,
    pub domain: Domain,
    /// Construction fails if the property is absent.
    pub required: bool,
    /// Absent property is filled with its schema default during construction.
    pub derived: bool,
}

/// All schemas, in validation order. `required` and `derived` are disjoint.
pub static SCHEMAS: [PropertySchema; 10] = [
    PropertySchema {
        name: PropertyName::Pbc,
        domain: Domain::Global,
        required: false,
        derived: true,
    },
    PropertySchema {
        name: PropertyName::Cell,
        domain: Domain::Global,
        required: false,
        derived: true,
    },
    PropertySchema {
        name: PropertyName::Positions,
        domain: Domain::IntraSite,
        required: true,
        derived: false,
    },
    PropertySchema {
        name: PropertyName::Symbols,
        domain: Domain::IntraSite,
        required: true,
        derived: false,
    },
    PropertySchema {
        name: PropertyName::Mass,
        domain: Domain::IntraSite,
        required: false,
        derived: true,
    },
    PropertySchema {
        name: PropertyName::Charge,
        domain: Domain::IntraSite,
        required: false,
        derived: false,
    },
    PropertySchema {
        name: PropertyName::Kinds,
        domain: Domain::IntraSite,
        required: false,
        derived: false,
    },
    PropertySchema {
        name: PropertyName::Magnetization,
        domain: Domain::IntraSite,
        required: false,
        derived: false,
    },
    PropertySchema {
        name: PropertyName::Hubbard,
        domain: Domain::IntraSite,
        required: false,
        derived: false,
    },
    PropertySchema {
        name: PropertyName::Custom,
        domain: Domain::Custom,
        required: false,
        derived: false,
    },
];

impl PropertyName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::Pbc => "pbc",
            PropertyName::Cell => "cell",
            PropertyName::Positions => "positions",
            PropertyName::Symbols => "symbols",
            PropertyName::Mass => "mass",
            PropertyName::Charge => "charge",
            PropertyName::Kinds => "kinds",
            PropertyName::Magnetization => "magnetization",
            PropertyName::Hubbard => "hubbard",
            PropertyName::Custom => "custom",
        }
    }

    /// Schema entry for this name. Every name has exactly one.
    pub fn schema(&self) -> &'static PropertySchema {
        // Variant order matches the SCHEMAS table order.
        &SCHEMAS[*self as usize]
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyName {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SCHEMAS
            .iter()
            .map(|schema| schema.name)
            .find(|name| name.as_str() == s)
            .ok_or_else(|| PropertyError::Unsupported {
                name: s.to_string(),
                supported: supported_names().join(", "),
            })
    }
}

/// Names of all supported properties, in validation order.
pub fn supported_names() -> Vec<&'static str> {
    SCHEMAS.iter().map(|schema| schema.name.as_str()).collect()
}

/// Names of the properties that must be present in every construction input.
pub fn required_names() -> Vec<&'static str> {
    SCHEMAS
        .iter()
        .filter(|schema| schema.required)
        .map(|schema| schema.name.as_str())
        .collect()
}

/// Names of the properties that are defaulted when absent.
pub fn derived_names() -> Vec<&'static str> {
    SCHEMAS
        .iter()
        .filter(|schema| schema.derived)
        .map(|schema| schema.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_and_derived_are_disjoint() {
        for schema in &SCHEMAS {
            assert!(
                !(schema.required && schema.derived),
                "'{}' is both required and derived",
                schema.name
            );
        }
    }

    #[test]
    fn every_name_resolves() {
        for schema in &SCHEMAS {
            let name: PropertyName = schema.name.as_str().parse().unwrap();
            assert_eq!(name, schema.name);
            assert_eq!(name.schema(), schema);
        }
    }

    #[test]
    fn unknown_name_is_unsupported() {
        let err = "velocity".parse::<PropertyName>().unwrap_err();
        assert!(matches!(err, PropertyError::Unsupported { ref name, .. } if name == "velocity"));
    }

    #[test]
    fn globals_precede_intra_site() {
        let first_intra = SCHEMAS
            .iter()
            .position(|schema| schema.domain == Domain::IntraSite)
            .unwrap();
        assert!(SCHEMAS[..first_intra]
            .iter()
            .all(|schema| schema.domain == Domain::Global));
    }

    #[test]
    fn expected_required_and_derived_sets() {
        assert_eq!(required_names(), vec!["positions", "symbols"]);
        assert_eq!(derived_names(), vec!["pbc", "cell", "mass"]);
    }
}
