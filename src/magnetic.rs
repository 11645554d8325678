//! Magnetization property and the kind-based magnetic configuration builder.
//!
//! The builder turns per-site (or per-kind) magnetic moments into a kind
//! tagging of the structure: per chemical element, sites are split by
//! moment sign (zero, positive, negative, with `ztol` as the zero
//! threshold), sorted by descending absolute moment and greedily grouped
//! within `atol` of the current kind's representative. Positive and
//! negative moments never share a kind, so each kind carries the largest
//! absolute moment of its sites as representative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::error::PropertyError;
use crate::model::property::{FieldMap, SiblingView};
use crate::model::schema::PropertyName;
use crate::model::{Element, Payload, PropertyCollector};

/// Errors raised by the magnetic configuration builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MagneticError {
    /// Zero or two moment inputs were supplied; exactly one is needed.
    #[error("exactly one of per-site and per-kind moments must be provided")]
    AmbiguousMomentInput,

    /// The number of per-site moments disagrees with the site count.
    #[error("{actual} magnetic moments provided for {expected} sites")]
    MomentCountMismatch {
        /// Site count of the structure.
        expected: usize,
        /// Number of moments supplied.
        actual: usize,
    },

    /// A site carries a kind name of a different species.
    #[error("alloys are currently not supported")]
    AlloyNotSupported,

    /// The requested moment transform is not modeled.
    #[error("transformation from {from} to {to} coordinates is not supported")]
    UnsupportedCoordinateTransform {
        from: &'static str,
        to: &'static str,
    },

    /// Storing the rebuilt structure failed collector validation.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Units of magnetic moments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MagneticUnits {
    #[default]
    #[serde(rename = "Bohr_magneton")]
    BohrMagneton,
}

/// The magnetization property: per-site cartesian moments plus the
/// kind-resolved collinear map the builder produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Magnetization {
    pub moments: Vec<[f64; 3]>,
    #[serde(default)]
    pub collinear_kind_moments: BTreeMap<String, f64>,
    #[serde(default)]
    pub units: MagneticUnits,
}

impl Magnetization {
    pub(crate) fn from_fields(
        fields: &FieldMap,
        view: SiblingView<'_>,
    ) -> Result<Self, PropertyError> {
        let parsed: Magnetization =
            crate::model::property::parse_fields(PropertyName::Magnetization, fields)?;
        if let Some(expected) = view.site_count() {
            if parsed.moments.len() != expected {
                return Err(PropertyError::length_mismatch(
                    "magnetization",
                    expected,
                    parsed.moments.len(),
                ));
            }
        }
        Ok(parsed)
    }
}

/// Per-site moment input for [`MagneticBuilder::set_from_components`].
#[derive(Debug, Clone, PartialEq)]
pub enum SiteMoments {
    /// Signed scalars along one axis.
    Collinear(Vec<f64>),
    /// Full 3D vectors. Reducing these to the collinear kind representation
    /// is not modeled, so they are rejected.
    Cartesian(Vec<[f64; 3]>),
}

/// Tolerances of the kind assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentOptions {
    /// Absolute tolerance for two sites sharing a kind.
    pub atol: f64,
    /// Threshold below which a moment counts as zero.
    pub ztol: f64,
}

impl Default for MomentOptions {
    fn default() -> Self {
        Self {
            atol: 0.5,
            ztol: 0.49,
        }
    }
}

/// Collinear-to-cartesian moment transform: `m -> (0, 0, m)`.
pub fn collinear_to_cartesian(moments: &[f64]) -> Vec<[f64; 3]> {
    moments.iter().map(|&m| [0.0, 0.0, m]).collect()
}

/// The kind tagging derived from a set of magnetic moments.
#[derive(Debug, Clone, PartialEq)]
pub struct MagneticConfiguration {
    /// Kind name per rebuilt site.
    pub kind_names: Vec<String>,
    /// Chemical symbol per rebuilt site.
    pub symbols: Vec<Element>,
    /// Position per rebuilt site.
    pub positions: Vec<[f64; 3]>,
    /// Representative collinear moment per kind.
    pub kind_moments: BTreeMap<String, f64>,
}

/// Snapshot-replacing mutation vocabulary for the `magnetization` property.
#[derive(Debug, Clone, Copy)]
pub struct MagneticBuilder<'a> {
    collector: &'a PropertyCollector,
}

impl<'a> MagneticBuilder<'a> {
    pub fn new(collector: &'a PropertyCollector) -> Self {
        Self { collector }
    }

    /// Re-tag the structure's kinds from magnetic moments and store the
    /// resulting magnetization.
    ///
    /// Exactly one of `moments_per_site` and `moments_per_kind` must be
    /// given. Per-kind input is broadcast over the current kind names, with
    /// unmatched sites getting `0.0`. The returned snapshot has its site
    /// list rebuilt in kind order and carries only the geometry, symbols,
    /// new kinds and the magnetization; mass re-derives from the symbols
    /// and other intra-site data is dropped with the old sites.
    pub fn set_from_components(
        &self,
        moments_per_site: Option<SiteMoments>,
        moments_per_kind: Option<BTreeMap<String, f64>>,
        options: &MomentOptions,
    ) -> Result<PropertyCollector, MagneticError> {
        let moments = match (moments_per_site, moments_per_kind) {
            (Some(per_site), None) => match per_site {
                SiteMoments::Collinear(moments) => moments,
                SiteMoments::Cartesian(_) => {
                    return Err(MagneticError::UnsupportedCoordinateTransform {
                        from: "cartesian",
                        to: "collinear",
                    })
                }
            },
            (None, Some(per_kind)) => self
                .collector
                .site_kind_names()
                .iter()
                .map(|kind| per_kind.get(kind).copied().unwrap_or(0.0))
                .collect(),
            _ => return Err(MagneticError::AmbiguousMomentInput),
        };

        let expected = self.collector.site_count();
        if moments.len() != expected {
            return Err(MagneticError::MomentCountMismatch {
                expected,
                actual: moments.len(),
            });
        }

        let configuration = self.create_magnetic_configuration(&moments, options)?;

        // Rebuild the payload around the reordered site list.
        let site_moments: Vec<f64> = configuration
            .kind_names
            .iter()
            .map(|kind| configuration.kind_moments[kind])
            .collect();
        let magnetization = Magnetization {
            moments: collinear_to_cartesian(&site_moments),
            collinear_kind_moments: configuration.kind_moments.clone(),
            units: MagneticUnits::default(),
        };

        let mut payload = Payload::new();
        let current = self.collector.to_payload();
        for carried in ["pbc", "cell"] {
            if let Some(fields) = current.get(carried) {
                payload.insert(carried.to_string(), fields.clone());
            }
        }
        payload.insert(
            "positions".into(),
            value_record(serde_json::to_value(&configuration.positions)),
        );
        payload.insert(
            "symbols".into(),
            value_record(serde_json::to_value(&configuration.symbols)),
        );
        payload.insert(
            "kinds".into(),
            value_record(serde_json::to_value(&configuration.kind_names)),
        );
        let magnetization_fields = match serde_json::to_value(&magnetization) {
            Ok(Value::Object(map)) => map,
            _ => FieldMap::new(),
        };
        payload.insert("magnetization".into(), magnetization_fields);

        Ok(PropertyCollector::from_payload(payload)?)
    }

    /// Derive the kind tagging for a list of collinear per-site moments.
    pub fn create_magnetic_configuration(
        &self,
        moments: &[f64],
        options: &MomentOptions,
    ) -> Result<MagneticConfiguration, MagneticError> {
        let symbols = &self.collector.symbols().value;
        let positions = &self.collector.positions().value;
        let kind_names = self.collector.site_kind_names();

        // A kind name of one species attached to a site of another marks a
        // mixed-species (alloy-like) site.
        for (kind, element) in kind_names.iter().zip(symbols) {
            let stripped = kind.trim_end_matches(|c: char| c.is_ascii_digit());
            if stripped != element.symbol() {
                return Err(MagneticError::AlloyNotSupported);
            }
        }

        let mut elements: Vec<Element> = Vec::new();
        for element in symbols {
            if !elements.contains(element) {
                elements.push(*element);
            }
        }

        let mut configuration = MagneticConfiguration {
            kind_names: Vec::with_capacity(moments.len()),
            symbols: Vec::with_capacity(moments.len()),
            positions: Vec::with_capacity(moments.len()),
            kind_moments: BTreeMap::new(),
        };

        for element in elements {
            let element_sites: Vec<usize> = (0..symbols.len())
                .filter(|&site| symbols[site] == element)
                .collect();

            // Split by sign; zero-moment sites are recorded with exactly 0.
            let mut zero_sites: Vec<(usize, f64)> = Vec::new();
            let mut pos_sites: Vec<(usize, f64)> = Vec::new();
            let mut neg_sites: Vec<(usize, f64)> = Vec::new();
            for &site in &element_sites {
                let moment = moments[site];
                if moment.abs() <= options.ztol {
                    zero_sites.push((site, 0.0));
                } else if moment > 0.0 {
                    pos_sites.push((site, moment));
                } else {
                    neg_sites.push((site, moment));
                }
            }

            let mut kind_index: i32 = -1;
            let mut element_kind_names: Vec<String> = Vec::new();
            let mut element_kind_sites: Vec<usize> = Vec::new();
            let mut element_kind_moments: BTreeMap<String, f64> = BTreeMap::new();
            let mut current_kind_name = String::new();

            for bucket in [&mut zero_sites, &mut pos_sites, &mut neg_sites] {
                if bucket.is_empty() {
                    continue;
                }
                bucket.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

                kind_index += 1;
                current_kind_name = format!("{}{}", element.symbol(), kind_index);
                element_kind_moments.insert(current_kind_name.clone(), bucket[0].1);
                element_kind_sites.push(bucket[0].0);
                element_kind_names.push(current_kind_name.clone());

                for &(site, moment) in &bucket[1..] {
                    if (moment - element_kind_moments[&current_kind_name]).abs() > options.atol {
                        kind_index += 1;
                        current_kind_name = format!("{}{}", element.symbol(), kind_index);
                        element_kind_moments.insert(current_kind_name.clone(), moment);
                    }
                    element_kind_sites.push(site);
                    element_kind_names.push(current_kind_name.clone());
                }
            }

            // One kind for the whole element: drop the numeric suffix.
            if current_kind_name == format!("{}0", element.symbol()) {
                let moment = element_kind_moments[&current_kind_name];
                element_kind_names = vec![element.symbol().to_string(); element_sites.len()];
                element_kind_moments =
                    [(element.symbol().to_string(), moment)].into_iter().collect();
            }

            configuration.kind_moments.extend(element_kind_moments);
            for (name, site) in element_kind_names.into_iter().zip(element_kind_sites) {
                configuration.kind_names.push(name);
                configuration.symbols.push(element);
                configuration.positions.push(positions[site]);
            }
        }

        Ok(configuration)
    }
}

fn value_record(value: Result<Value, serde_json::Error>) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("value".to_string(), value.unwrap_or(Value::Null));
    fields
}
