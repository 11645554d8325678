use super::FieldMap;
use crate::model::error::PropertyError;

/// Escape hatch for unmodeled properties.
///
/// The record is kept opaque: no schema is applied beyond the collector's
/// non-empty-mapping check, and the fields round-trip byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomProperty {
    pub fields: FieldMap,
}

impl CustomProperty {
    pub(crate) fn from_fields(fields: &FieldMap) -> Result<Self, PropertyError> {
        Ok(Self {
            fields: fields.clone(),
        })
    }

    /// Value of one custom field, if present.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn carries_arbitrary_fields() {
        let mut fields = FieldMap::new();
        fields.insert("value".into(), json!([1, 2, 3]));
        fields.insert("units".into(), json!("arbitrary"));

        let custom = CustomProperty::from_fields(&fields).unwrap();
        assert_eq!(custom.get("value"), Some(&json!([1, 2, 3])));
        assert_eq!(custom.get("units"), Some(&json!("arbitrary")));
        assert_eq!(custom.get("missing"), None);
    }
}
