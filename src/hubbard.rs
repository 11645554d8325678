//! Hubbard interaction parameters and their builder.
//!
//! A [`Hubbard`] aggregate holds an ordered list of [`HubbardParameter`]
//! entries (insertion order is significant for downstream card rendering)
//! plus the projector and formulation choices. The [`HubbardBuilder`] layers
//! the mutation vocabulary on top of a [`PropertyCollector`] snapshot: every
//! operation yields a new snapshot, never an in-place edit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geometry;
use crate::model::error::PropertyError;
use crate::model::property::FieldMap;
use crate::model::schema::PropertyName;
use crate::model::PropertyCollector;

/// Default value used when initializing parameters that a calculation will
/// refine later.
pub const INITIAL_VALUE_EV: f64 = 1e-8;

/// Errors raised by Hubbard parameter handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubbardError {
    /// A manifold string does not match `{N}{L}` or `{N1}{L1}-{N2}{L2}`.
    #[error("invalid manifold syntax '{manifold}': {detail}")]
    InvalidManifold {
        /// The offending manifold string.
        manifold: String,
        /// Description of the problem.
        detail: String,
    },

    /// A site or parameter index is out of range.
    #[error("index {index} is out of range (length {len})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Length of the indexed list.
        len: usize,
    },

    /// A kind or species name matched no site.
    #[error("species or kind name '{name}' not in structure")]
    UnknownAtomName {
        /// The unmatched name.
        name: String,
    },

    /// Storing the updated property failed collector validation.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl HubbardError {
    fn invalid_manifold(manifold: &str, detail: impl Into<String>) -> Self {
        Self::InvalidManifold {
            manifold: manifold.to_string(),
            detail: detail.into(),
        }
    }
}

/// Type of a Hubbard interaction term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubbardType {
    Ueff,
    U,
    V,
    J,
    B,
    E2,
    E3,
}

/// Projectors used to define the Hubbard manifold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Projectors {
    #[serde(rename = "atomic")]
    Atomic,
    #[default]
    #[serde(rename = "ortho-atomic")]
    OrthoAtomic,
    #[serde(rename = "norm-atomic")]
    NormAtomic,
    #[serde(rename = "wannier-functions")]
    WannierFunctions,
    #[serde(rename = "pseudo-potentials")]
    PseudoPotentials,
}

/// Hubbard energy functional formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Formulation {
    #[default]
    #[serde(rename = "dudarev")]
    Dudarev,
    #[serde(rename = "liechtenstein")]
    Liechtenstein,
}

/// Check a manifold string.
///
/// Allowed formats are `{N}{L}` (2 characters) and `{N1}{L1}-{N2}{L2}`
/// (5 characters), with N a quantum number in `1..=6` and L an orbital
/// letter in `{s, p, d, f, h}`.
pub fn validate_manifold(manifold: &str) -> Result<(), HubbardError> {
    let chars: Vec<char> = manifold.chars().collect();
    if chars.len() != 2 && chars.len() != 5 {
        return Err(HubbardError::invalid_manifold(
            manifold,
            format!("invalid length {}, only 2 or 5 allowed", chars.len()),
        ));
    }

    let check_pair = |n: char, l: char| -> Result<(), HubbardError> {
        if !('1'..='6').contains(&n) {
            return Err(HubbardError::invalid_manifold(
                manifold,
                format!("invalid quantum number '{n}'"),
            ));
        }
        if !matches!(l, 's' | 'p' | 'd' | 'f' | 'h') {
            return Err(HubbardError::invalid_manifold(
                manifold,
                format!("invalid orbital letter '{l}'"),
            ));
        }
        Ok(())
    };

    check_pair(chars[0], chars[1])?;
    if chars.len() == 5 {
        if chars[2] != '-' {
            return Err(HubbardError::invalid_manifold(
                manifold,
                format!("separator '{}' is not allowed, only '-'", chars[2]),
            ));
        }
        check_pair(chars[3], chars[4])?;
    }
    Ok(())
}

/// One onsite or intersite Hubbard interaction parameter.
///
/// Serialized as the 7-tuple `(atom_index, atom_manifold, neighbour_index,
/// neighbour_manifold, value, translation, hubbard_type)`. Equality is
/// structural over all fields and drives deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HubbardParameterTuple", into = "HubbardParameterTuple")]
pub struct HubbardParameter {
    /// Atom index in the structure.
    pub atom_index: usize,
    /// Atom manifold (syntax `3d`, `3d-2p`).
    pub atom_manifold: String,
    /// Neighbour index in the structure.
    pub neighbour_index: usize,
    /// Neighbour manifold (syntax `3d`, `3d-2p`).
    pub neighbour_manifold: String,
    /// Value of the parameter, in eV.
    pub value: f64,
    /// Lattice translation of the neighbour atom.
    pub translation: [i32; 3],
    /// Type of the interaction term.
    pub hubbard_type: HubbardType,
}

type HubbardParameterTuple = (usize, String, usize, String, f64, [i32; 3], HubbardType);

impl TryFrom<HubbardParameterTuple> for HubbardParameter {
    type Error = HubbardError;

    fn try_from(tuple: HubbardParameterTuple) -> Result<Self, Self::Error> {
        let (atom_index, atom_manifold, neighbour_index, neighbour_manifold, value, translation, hubbard_type) =
            tuple;
        validate_manifold(&atom_manifold)?;
        validate_manifold(&neighbour_manifold)?;
        Ok(Self {
            atom_index,
            atom_manifold,
            neighbour_index,
            neighbour_manifold,
            value,
            translation,
            hubbard_type,
        })
    }
}

impl From<HubbardParameter> for HubbardParameterTuple {
    fn from(parameter: HubbardParameter) -> Self {
        (
            parameter.atom_index,
            parameter.atom_manifold,
            parameter.neighbour_index,
            parameter.neighbour_manifold,
            parameter.value,
            parameter.translation,
            parameter.hubbard_type,
        )
    }
}

/// Complete description of the Hubbard interactions of one structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hubbard {
    #[serde(default)]
    pub parameters: Vec<HubbardParameter>,
    #[serde(default)]
    pub projectors: Projectors,
    #[serde(default)]
    pub formulation: Formulation,
}

impl Hubbard {
    pub(crate) fn from_fields(fields: &FieldMap) -> Result<Self, PropertyError> {
        crate::model::property::parse_fields(PropertyName::Hubbard, fields)
    }
}

/// Snapshot-replacing mutation vocabulary for the `hubbard` property.
#[derive(Debug, Clone, Copy)]
pub struct HubbardBuilder<'a> {
    collector: &'a PropertyCollector,
}

impl<'a> HubbardBuilder<'a> {
    pub fn new(collector: &'a PropertyCollector) -> Self {
        Self { collector }
    }

    /// Stored Hubbard data, or the empty default when the property is not
    /// set yet.
    pub fn current(&self) -> Hubbard {
        self.collector.hubbard().cloned().unwrap_or_default()
    }

    /// Append one parameter, inferring the neighbour translation from the
    /// geometry when not supplied. A structural duplicate is silently
    /// dropped: the returned snapshot carries the unchanged list.
    #[allow(clippy::too_many_arguments)]
    pub fn append_hubbard_parameter(
        &self,
        atom_index: usize,
        atom_manifold: &str,
        neighbour_index: usize,
        neighbour_manifold: &str,
        value: f64,
        translation: Option<[i32; 3]>,
        hubbard_type: HubbardType,
    ) -> Result<PropertyCollector, HubbardError> {
        let mut hubbard = self.current();
        self.append_into(
            &mut hubbard,
            atom_index,
            atom_manifold,
            neighbour_index,
            neighbour_manifold,
            value,
            translation,
            hubbard_type,
        )?;
        self.store(hubbard)
    }

    /// Remove the parameter at `index`.
    pub fn pop_hubbard_parameters(&self, index: usize) -> Result<PropertyCollector, HubbardError> {
        let mut hubbard = self.current();
        if index >= hubbard.parameters.len() {
            return Err(HubbardError::IndexOutOfRange {
                index,
                len: hubbard.parameters.len(),
            });
        }
        hubbard.parameters.remove(index);
        self.store(hubbard)
    }

    /// Empty the parameter list, preserving projectors and formulation.
    pub fn clear_hubbard_parameters(&self) -> Result<PropertyCollector, HubbardError> {
        let mut hubbard = self.current();
        hubbard.parameters.clear();
        self.store(hubbard)
    }

    /// Replace the whole Hubbard description at once.
    pub fn from_list(
        &self,
        parameters: Vec<HubbardParameter>,
        projectors: Projectors,
        formulation: Formulation,
    ) -> Result<PropertyCollector, HubbardError> {
        self.store(Hubbard {
            parameters,
            projectors,
            formulation,
        })
    }

    /// Append an onsite parameter (`neighbour = atom`, zero translation) for
    /// every site resolved from `atom_name`.
    pub fn initialize_onsites_hubbard(
        &self,
        atom_name: &str,
        atom_manifold: &str,
        value: f64,
        hubbard_type: HubbardType,
        use_kinds: bool,
    ) -> Result<PropertyCollector, HubbardError> {
        let atom_indices = self.resolve_site_indices(atom_name, use_kinds)?;

        let mut hubbard = self.current();
        for atom_index in atom_indices {
            self.append_into(
                &mut hubbard,
                atom_index,
                atom_manifold,
                atom_index,
                atom_manifold,
                value,
                Some([0, 0, 0]),
                hubbard_type,
            )?;
        }
        self.store(hubbard)
    }

    /// Append an intersite parameter for every (atom, neighbour) pair in the
    /// Cartesian product of the two resolved site sets, with translations
    /// inferred from the geometry.
    pub fn initialize_intersites_hubbard(
        &self,
        atom_name: &str,
        atom_manifold: &str,
        neighbour_name: &str,
        neighbour_manifold: &str,
        value: f64,
        hubbard_type: HubbardType,
        use_kinds: bool,
    ) -> Result<PropertyCollector, HubbardError> {
        let atom_indices = self.resolve_site_indices(atom_name, use_kinds)?;
        let neighbour_indices = self.resolve_site_indices(neighbour_name, use_kinds)?;

        let mut hubbard = self.current();
        for &atom_index in &atom_indices {
            for &neighbour_index in &neighbour_indices {
                self.append_into(
                    &mut hubbard,
                    atom_index,
                    atom_manifold,
                    neighbour_index,
                    neighbour_manifold,
                    value,
                    None,
                    hubbard_type,
                )?;
            }
        }
        self.store(hubbard)
    }

    #[allow(clippy::too_many_arguments)]
    fn append_into(
        &self,
        hubbard: &mut Hubbard,
        atom_index: usize,
        atom_manifold: &str,
        neighbour_index: usize,
        neighbour_manifold: &str,
        value: f64,
        translation: Option<[i32; 3]>,
        hubbard_type: HubbardType,
    ) -> Result<(), HubbardError> {
        validate_manifold(atom_manifold)?;
        validate_manifold(neighbour_manifold)?;

        let site_count = self.collector.site_count();
        for index in [atom_index, neighbour_index] {
            if index >= site_count {
                return Err(HubbardError::IndexOutOfRange {
                    index,
                    len: site_count,
                });
            }
        }

        let translation = match translation {
            Some(translation) => translation,
            None => {
                let positions = &self.collector.positions().value;
                geometry::minimum_image_translation(
                    &self.collector.cell().value,
                    self.collector.pbc().value,
                    positions[atom_index],
                    positions[neighbour_index],
                )
            }
        };

        let parameter = HubbardParameter {
            atom_index,
            atom_manifold: atom_manifold.to_string(),
            neighbour_index,
            neighbour_manifold: neighbour_manifold.to_string(),
            value,
            translation,
            hubbard_type,
        };
        if !hubbard.parameters.contains(&parameter) {
            hubbard.parameters.push(parameter);
        }
        Ok(())
    }

    /// Site indices for a kind or species name: the first site of the
    /// matching kind, or every site of the matching species.
    fn resolve_site_indices(
        &self,
        name: &str,
        use_kinds: bool,
    ) -> Result<Vec<usize>, HubbardError> {
        let indices: Vec<usize> = if use_kinds {
            self.collector
                .site_kind_names()
                .iter()
                .position(|kind| kind == name)
                .into_iter()
                .collect()
        } else {
            self.collector
                .symbols()
                .value
                .iter()
                .enumerate()
                .filter(|(_, element)| element.symbol() == name)
                .map(|(index, _)| index)
                .collect()
        };

        if indices.is_empty() {
            return Err(HubbardError::UnknownAtomName {
                name: name.to_string(),
            });
        }
        Ok(indices)
    }

    fn store(&self, hubbard: Hubbard) -> Result<PropertyCollector, HubbardError> {
        let fields = match serde_json::to_value(&hubbard) {
            Ok(Value::Object(map)) => map,
            _ => FieldMap::new(),
        };
        Ok(self.collector.with_property("hubbard", fields)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Payload;
    use serde_json::json;

    fn record(value: serde_json::Value) -> FieldMap {
        match json!({ "value": value }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    // Rock-salt-like FeO fragment in a cubic cell.
    fn make_feo() -> PropertyCollector {
        let mut payload = Payload::new();
        payload.insert(
            "cell".into(),
            record(json!([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]])),
        );
        payload.insert(
            "positions".into(),
            record(json!([[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]])),
        );
        payload.insert("symbols".into(), record(json!(["Fe", "O", "O"])));
        PropertyCollector::from_payload(payload).unwrap()
    }

    #[test]
    fn manifold_accept_reject_table() {
        assert!(validate_manifold("3d").is_ok());
        assert!(validate_manifold("3d-2p").is_ok());
        assert!(validate_manifold("1s").is_ok());
        assert!(validate_manifold("6h").is_ok());

        assert!(validate_manifold("3").is_err());
        assert!(validate_manifold("3x").is_err());
        assert!(validate_manifold("3d2p").is_err());
        assert!(validate_manifold("3d_2p").is_err());
        assert!(validate_manifold("7d").is_err());
        assert!(validate_manifold("3g").is_err());
        assert!(validate_manifold("3d-7p").is_err());
        assert!(validate_manifold("3d-2g").is_err());
    }

    #[test]
    fn append_deduplicates_structural_equals() {
        // Scenario D: the same parameter appended twice stores one entry.
        let structure = make_feo();
        let builder = HubbardBuilder::new(&structure);
        let once = builder
            .append_hubbard_parameter(0, "3d", 0, "3d", 7.2362, Some([0, 0, 0]), HubbardType::V)
            .unwrap();
        let twice = HubbardBuilder::new(&once)
            .append_hubbard_parameter(0, "3d", 0, "3d", 7.2362, Some([0, 0, 0]), HubbardType::V)
            .unwrap();
        assert_eq!(twice.hubbard().unwrap().parameters.len(), 1);
    }

    #[test]
    fn append_leaves_previous_snapshot_untouched() {
        let structure = make_feo();
        let updated = HubbardBuilder::new(&structure)
            .append_hubbard_parameter(0, "3d", 1, "2p", 0.5, Some([0, 0, 0]), HubbardType::V)
            .unwrap();
        assert!(structure.hubbard().is_none());
        assert_eq!(updated.hubbard().unwrap().parameters.len(), 1);
    }

    #[test]
    fn append_infers_translation_from_geometry() {
        let structure = make_feo();
        // Neighbour near the far face: closest image is one cell back.
        let mut payload = structure.to_payload();
        payload.insert(
            "positions".into(),
            record(json!([[0.0, 0.0, 0.0], [3.5, 0.0, 0.0], [0.0, 2.0, 0.0]])),
        );
        let structure = PropertyCollector::from_payload(payload).unwrap();

        let updated = HubbardBuilder::new(&structure)
            .append_hubbard_parameter(0, "3d", 1, "2p", 0.3, None, HubbardType::V)
            .unwrap();
        let parameter = &updated.hubbard().unwrap().parameters[0];
        assert_eq!(parameter.translation, [-1, 0, 0]);
    }

    #[test]
    fn append_rejects_bad_manifold_and_index() {
        let structure = make_feo();
        let builder = HubbardBuilder::new(&structure);

        let err = builder
            .append_hubbard_parameter(0, "3x", 0, "3d", 1.0, Some([0, 0, 0]), HubbardType::Ueff)
            .unwrap_err();
        assert!(matches!(err, HubbardError::InvalidManifold { .. }));

        let err = builder
            .append_hubbard_parameter(0, "3d", 9, "2p", 1.0, Some([0, 0, 0]), HubbardType::V)
            .unwrap_err();
        assert!(matches!(
            err,
            HubbardError::IndexOutOfRange { index: 9, len: 3 }
        ));
    }

    #[test]
    fn pop_and_clear() {
        let structure = make_feo();
        let with_two = HubbardBuilder::new(&structure)
            .append_hubbard_parameter(0, "3d", 0, "3d", 5.0, Some([0, 0, 0]), HubbardType::Ueff)
            .and_then(|s| {
                HubbardBuilder::new(&s).append_hubbard_parameter(
                    0,
                    "3d",
                    1,
                    "2p",
                    0.5,
                    Some([0, 0, 0]),
                    HubbardType::V,
                )
            })
            .unwrap();
        assert_eq!(with_two.hubbard().unwrap().parameters.len(), 2);

        let popped = HubbardBuilder::new(&with_two).pop_hubbard_parameters(0).unwrap();
        let hubbard = popped.hubbard().unwrap();
        assert_eq!(hubbard.parameters.len(), 1);
        assert_eq!(hubbard.parameters[0].hubbard_type, HubbardType::V);

        let err = HubbardBuilder::new(&popped).pop_hubbard_parameters(5).unwrap_err();
        assert!(matches!(err, HubbardError::IndexOutOfRange { index: 5, len: 1 }));

        let cleared = HubbardBuilder::new(&with_two).clear_hubbard_parameters().unwrap();
        let hubbard = cleared.hubbard().unwrap();
        assert!(hubbard.parameters.is_empty());
        assert_eq!(hubbard.projectors, Projectors::OrthoAtomic);
        assert_eq!(hubbard.formulation, Formulation::Dudarev);
    }

    #[test]
    fn initialize_onsites_by_species() {
        let structure = make_feo();
        let updated = HubbardBuilder::new(&structure)
            .initialize_onsites_hubbard("O", "2p", INITIAL_VALUE_EV, HubbardType::Ueff, false)
            .unwrap();
        let parameters = &updated.hubbard().unwrap().parameters;
        // Both oxygen sites get an onsite term.
        assert_eq!(parameters.len(), 2);
        for parameter in parameters {
            assert_eq!(parameter.atom_index, parameter.neighbour_index);
            assert_eq!(parameter.translation, [0, 0, 0]);
        }
    }

    #[test]
    fn initialize_onsites_by_kind_takes_first_match() {
        let structure = make_feo();
        let tagged = structure
            .with_property("kinds", record(json!(["Fe0", "O0", "O0"])))
            .unwrap();
        let updated = HubbardBuilder::new(&tagged)
            .initialize_onsites_hubbard("O0", "2p", INITIAL_VALUE_EV, HubbardType::Ueff, true)
            .unwrap();
        let parameters = &updated.hubbard().unwrap().parameters;
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].atom_index, 1);
    }

    #[test]
    fn initialize_intersites_cartesian_product() {
        let structure = make_feo();
        let updated = HubbardBuilder::new(&structure)
            .initialize_intersites_hubbard(
                "Fe",
                "3d",
                "O",
                "2p",
                INITIAL_VALUE_EV,
                HubbardType::V,
                false,
            )
            .unwrap();
        let parameters = &updated.hubbard().unwrap().parameters;
        // One Fe site times two O sites.
        assert_eq!(parameters.len(), 2);
        assert!(parameters.iter().all(|p| p.atom_index == 0));
    }

    #[test]
    fn unknown_atom_name() {
        let structure = make_feo();
        let err = HubbardBuilder::new(&structure)
            .initialize_onsites_hubbard("Cu", "3d", INITIAL_VALUE_EV, HubbardType::Ueff, false)
            .unwrap_err();
        assert!(matches!(err, HubbardError::UnknownAtomName { ref name } if name == "Cu"));
    }

    #[test]
    fn parameter_serializes_as_seven_tuple() {
        let parameter = HubbardParameter {
            atom_index: 0,
            atom_manifold: "3d".into(),
            neighbour_index: 1,
            neighbour_manifold: "2p".into(),
            value: 5.0,
            translation: [0, 0, -1],
            hubbard_type: HubbardType::V,
        };
        let serialized = serde_json::to_value(&parameter).unwrap();
        assert_eq!(serialized, json!([0, "3d", 1, "2p", 5.0, [0, 0, -1], "V"]));

        let parsed: HubbardParameter = serde_json::from_value(serialized).unwrap();
        assert_eq!(parsed, parameter);
    }

    #[test]
    fn deserialization_validates_manifolds() {
        let bad = json!([0, "3d2p", 0, "3d", 1.0, [0, 0, 0], "Ueff"]);
        assert!(serde_json::from_value::<HubbardParameter>(bad).is_err());
    }

    #[test]
    fn hubbard_property_round_trips_through_payload() {
        let structure = make_feo();
        let updated = HubbardBuilder::new(&structure)
            .append_hubbard_parameter(0, "3d", 1, "2p", 0.25, Some([0, 0, 0]), HubbardType::V)
            .unwrap();
        let rebuilt = PropertyCollector::from_payload(updated.to_payload()).unwrap();
        assert_eq!(updated, rebuilt);
        assert_eq!(rebuilt.hubbard().unwrap().parameters.len(), 1);
    }
}
