use serde::{Deserialize, Serialize};

use super::{parse_fields, FieldMap};
use crate::model::error::PropertyError;
use crate::model::schema::PropertyName;

/// Periodic boundary conditions along the three cell vectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pbc {
    pub value: [bool; 3],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PbcFields {
    #[serde(default)]
    value: Option<[bool; 3]>,
}

impl Pbc {
    /// Defaults to fully periodic when the payload carries no value.
    pub(crate) fn from_fields(fields: &FieldMap) -> Result<Self, PropertyError> {
        let parsed: PbcFields = parse_fields(PropertyName::Pbc, fields)?;
        Ok(Self {
            value: parsed.value.unwrap_or([true, true, true]),
        })
    }
}

/// The 3x3 cell matrix, rows are lattice vectors, in Angstrom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub value: [[f64; 3]; 3],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CellFields {
    #[serde(default)]
    value: Option<[[f64; 3]; 3]>,
}

impl Cell {
    /// Defaults to the zero matrix (no lattice) when the payload carries no
    /// value.
    pub(crate) fn from_fields(fields: &FieldMap) -> Result<Self, PropertyError> {
        let parsed: CellFields = parse_fields(PropertyName::Cell, fields)?;
        Ok(Self {
            value: parsed.value.unwrap_or([[0.0; 3]; 3]),
        })
    }

    /// Cell volume in Angstrom^3.
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.value;
        let cross = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        match json!({ "value": value }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn pbc_explicit_value() {
        let pbc = Pbc::from_fields(&fields(json!([true, false, true]))).unwrap();
        assert_eq!(pbc.value, [true, false, true]);
    }

    #[test]
    fn pbc_defaults_to_fully_periodic() {
        let pbc = Pbc::from_fields(&fields(json!(null))).unwrap();
        assert_eq!(pbc.value, [true, true, true]);
    }

    #[test]
    fn pbc_rejects_wrong_arity() {
        assert!(Pbc::from_fields(&fields(json!([true, false]))).is_err());
    }

    #[test]
    fn pbc_rejects_unknown_field() {
        let mut map = fields(json!([true, true, true]));
        map.insert("extra".into(), json!(1));
        let err = Pbc::from_fields(&map).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidPayload { ref name, .. } if name == "pbc"));
    }

    #[test]
    fn cell_defaults_to_zero_matrix() {
        let cell = Cell::from_fields(&fields(json!(null))).unwrap();
        assert_eq!(cell.value, [[0.0; 3]; 3]);
        assert_eq!(cell.volume(), 0.0);
    }

    #[test]
    fn cell_volume_cubic() {
        let cell = Cell::from_fields(&fields(json!([
            [3.5, 0.0, 0.0],
            [0.0, 3.5, 0.0],
            [0.0, 0.0, 3.5]
        ])))
        .unwrap();
        assert!((cell.volume() - 3.5f64.powi(3)).abs() < 1e-12);
    }

    #[test]
    fn cell_volume_is_unsigned() {
        // Left-handed cell still yields a positive volume.
        let cell = Cell {
            value: [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        };
        assert!((cell.volume() - 1.0).abs() < 1e-12);
    }
}
