//! Space-grid kind clustering.
//!
//! Sites are partitioned by bucketing a scalar property on a grid of width
//! `thr` anchored at the minimum value: the bucket of site `i` is
//! `floor((v[i] - min(v)) / thr)`. Two sites in one bucket differ by at most
//! `thr`; each bucket's representative value is the minimum raw value among
//! its members, so representatives are reproducible and monotonic with the
//! grid origin. Bucket indices are relabeled to a dense `0..k` range ordered
//! by first occurrence in site order.
//!
//! [`get_kinds`] aggregates this over several properties: per-site label
//! tuples (chemical symbol included) are intersected, and distinct tuples
//! are mapped to dense final labels, again by first occurrence.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{PropertyCollector, PropertyName};

/// Default clustering threshold per clusterable property, in registry order.
static CLUSTERABLE: [(PropertyName, f64); 2] =
    [(PropertyName::Mass, 1e-3), (PropertyName::Charge, 0.1)];

/// Errors raised by the clustering engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KindError {
    /// Clustering was requested on an empty value array.
    #[error("cannot cluster an empty property value array")]
    EmptyProperty,

    /// A threshold or exclusion referenced a property that is not
    /// clusterable or not stored on the structure.
    #[error("'{name}' is not a clusterable property of this structure")]
    UnknownProperty {
        /// The offending property name.
        name: String,
    },

    /// The threshold is negative or not finite.
    #[error("invalid clustering threshold {threshold}")]
    InvalidThreshold { threshold: f64 },
}

/// Result of clustering one property array.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Dense kind label per site, `0..k`.
    pub labels: Vec<usize>,
    /// Representative property value per site (its kind's bucket minimum).
    pub representatives: Vec<f64>,
}

/// Options for [`get_kinds`].
#[derive(Debug, Clone, Default)]
pub struct GetKindsOptions {
    /// Properties to cluster; empty selects every clusterable stored
    /// property.
    pub properties_to_cluster: Vec<String>,
    /// Per-property threshold overrides, keyed by property name.
    pub custom_thresholds: BTreeMap<String, f64>,
    /// Properties skipped from clustering. Their first-site-per-kind value
    /// is still reported as representative metadata.
    pub exclude: Vec<String>,
}

/// Aggregated kind assignment over a structure.
#[derive(Debug, Clone, PartialEq)]
pub struct KindsData {
    /// Kind name per site (`{symbol}{label}`).
    pub names: Vec<String>,
    /// Representative value per site, per contributing property.
    pub representatives: BTreeMap<String, Vec<f64>>,
}

/// Cluster one scalar property array with threshold `thr`.
///
/// `thr == 0` short-circuits: every site becomes its own kind and keeps its
/// raw value, for callers whose per-site tags already disambiguate kinds.
pub fn to_kinds(values: &[f64], thr: f64) -> Result<Clustering, KindError> {
    if values.is_empty() {
        return Err(KindError::EmptyProperty);
    }
    if !thr.is_finite() || thr < 0.0 {
        return Err(KindError::InvalidThreshold { threshold: thr });
    }
    if thr == 0.0 {
        return Ok(Clustering {
            labels: (0..values.len()).collect(),
            representatives: values.to_vec(),
        });
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let buckets: Vec<i64> = values.iter().map(|v| ((v - min) / thr).floor() as i64).collect();

    // Bucket representative: the minimum raw value among members.
    let mut bucket_min: BTreeMap<i64, f64> = BTreeMap::new();
    for (&bucket, &value) in buckets.iter().zip(values) {
        bucket_min
            .entry(bucket)
            .and_modify(|m| *m = m.min(value))
            .or_insert(value);
    }

    // Dense relabel by first occurrence in site order.
    let mut dense: BTreeMap<i64, usize> = BTreeMap::new();
    let mut labels = Vec::with_capacity(values.len());
    let mut representatives = Vec::with_capacity(values.len());
    for &bucket in &buckets {
        let next = dense.len();
        let label = *dense.entry(bucket).or_insert(next);
        labels.push(label);
        representatives.push(bucket_min[&bucket]);
    }

    Ok(Clustering {
        labels,
        representatives,
    })
}

/// Cluster one property and name the kinds `{symbol}{label}`.
///
/// A species whose sites all fall in a single cluster keeps the bare symbol
/// with no numeric suffix.
pub fn to_named_kinds(
    values: &[f64],
    symbols: &[String],
    thr: f64,
) -> Result<Vec<String>, KindError> {
    let clustering = to_kinds(values, thr)?;

    let mut labels_per_symbol: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (symbol, &label) in symbols.iter().zip(&clustering.labels) {
        let seen = labels_per_symbol.entry(symbol.as_str()).or_default();
        if !seen.contains(&label) {
            seen.push(label);
        }
    }

    Ok(symbols
        .iter()
        .zip(&clustering.labels)
        .map(|(symbol, &label)| {
            if labels_per_symbol[symbol.as_str()].len() == 1 {
                symbol.clone()
            } else {
                format!("{symbol}{label}")
            }
        })
        .collect())
}

/// Derive kinds from every clusterable stored property of `collector`.
///
/// Two sites share a final kind only if they agree on the chemical symbol
/// and on every clustered property's kind label. Final labels are dense and
/// global across the structure, ordered by first occurrence.
pub fn get_kinds(
    collector: &PropertyCollector,
    options: &GetKindsOptions,
) -> Result<KindsData, KindError> {
    for name in options
        .properties_to_cluster
        .iter()
        .chain(options.custom_thresholds.keys())
        .chain(options.exclude.iter())
    {
        if !is_clustered_name(collector, name) {
            return Err(KindError::UnknownProperty { name: name.clone() });
        }
    }

    let symbols: Vec<String> = collector
        .symbols()
        .value
        .iter()
        .map(|element| element.symbol().to_string())
        .collect();
    let site_count = symbols.len();

    // Cluster each stored, non-excluded clusterable property.
    let mut clustered: Vec<(PropertyName, Clustering)> = Vec::new();
    let mut excluded: Vec<(PropertyName, Vec<f64>)> = Vec::new();
    for &(name, default_thr) in &CLUSTERABLE {
        let Some(values) = clusterable_values(collector, name) else {
            continue;
        };
        if !options.properties_to_cluster.is_empty()
            && !options.properties_to_cluster.iter().any(|n| n == name.as_str())
        {
            continue;
        }
        if options.exclude.iter().any(|n| n == name.as_str()) {
            excluded.push((name, values));
            continue;
        }
        let thr = options
            .custom_thresholds
            .get(name.as_str())
            .copied()
            .unwrap_or(default_thr);
        clustered.push((name, to_kinds(&values, thr)?));
    }

    // Intersect labels: a site's signature is its symbol plus one label per
    // clustered property.
    let mut final_labels = Vec::with_capacity(site_count);
    let mut dense: BTreeMap<(String, Vec<usize>), usize> = BTreeMap::new();
    for site in 0..site_count {
        let signature = (
            symbols[site].clone(),
            clustered
                .iter()
                .map(|(_, clustering)| clustering.labels[site])
                .collect::<Vec<_>>(),
        );
        let next = dense.len();
        final_labels.push(*dense.entry(signature).or_insert(next));
    }

    let names: Vec<String> = symbols
        .iter()
        .zip(&final_labels)
        .map(|(symbol, label)| format!("{symbol}{label}"))
        .collect();

    let mut representatives = BTreeMap::new();
    for (name, clustering) in &clustered {
        representatives.insert(name.as_str().to_string(), clustering.representatives.clone());
    }
    // Excluded properties report the value of each kind's first site.
    for (name, values) in &excluded {
        let mut first_value: BTreeMap<usize, f64> = BTreeMap::new();
        for (site, &label) in final_labels.iter().enumerate() {
            first_value.entry(label).or_insert(values[site]);
        }
        representatives.insert(
            name.as_str().to_string(),
            final_labels.iter().map(|label| first_value[label]).collect(),
        );
    }

    Ok(KindsData {
        names,
        representatives,
    })
}

fn is_clustered_name(collector: &PropertyCollector, name: &str) -> bool {
    CLUSTERABLE.iter().any(|(candidate, _)| {
        candidate.as_str() == name && clusterable_values(collector, *candidate).is_some()
    })
}

fn clusterable_values(collector: &PropertyCollector, name: PropertyName) -> Option<Vec<f64>> {
    match name {
        PropertyName::Mass => Some(collector.mass().value.clone()),
        PropertyName::Charge => collector.charge().map(|charge| charge.value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldMap, Payload};
    use serde_json::{json, Value};

    fn record(value: Value) -> FieldMap {
        match json!({ "value": value }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn collector(symbols: Value, extra: &[(&str, Value)]) -> PropertyCollector {
        let n = symbols.as_array().unwrap().len();
        let positions: Vec<Value> = (0..n)
            .map(|i| json!([1.5 * i as f64, 1.5 * i as f64, 1.5 * i as f64]))
            .collect();
        let mut payload = Payload::new();
        payload.insert("positions".into(), record(json!(positions)));
        payload.insert("symbols".into(), record(symbols));
        for (name, value) in extra {
            payload.insert((*name).to_string(), record(value.clone()));
        }
        PropertyCollector::from_payload(payload).unwrap()
    }

    #[test]
    fn empty_array_is_rejected() {
        assert_eq!(to_kinds(&[], 0.1).unwrap_err(), KindError::EmptyProperty);
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        assert!(matches!(
            to_kinds(&[1.0], -0.5).unwrap_err(),
            KindError::InvalidThreshold { .. }
        ));
        assert!(matches!(
            to_kinds(&[1.0], f64::NAN).unwrap_err(),
            KindError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn zero_threshold_gives_singleton_kinds() {
        let clustering = to_kinds(&[0.3, 0.3, 0.7], 0.0).unwrap();
        assert_eq!(clustering.labels, vec![0, 1, 2]);
        assert_eq!(clustering.representatives, vec![0.3, 0.3, 0.7]);
    }

    #[test]
    fn grid_assignment_groups_close_values() {
        // Buckets of width 0.5 anchored at 1.0: [1.0, 1.2] and [2.0].
        let clustering = to_kinds(&[1.0, 2.0, 1.2], 0.5).unwrap();
        assert_eq!(clustering.labels, vec![0, 1, 0]);
        assert_eq!(clustering.representatives, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn representative_is_bucket_minimum() {
        let clustering = to_kinds(&[1.4, 1.0, 1.2], 0.5).unwrap();
        assert_eq!(clustering.labels, vec![0, 0, 0]);
        assert_eq!(clustering.representatives, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn labels_are_dense_and_first_occurrence_ordered() {
        let clustering = to_kinds(&[5.0, 1.0, 5.0, 3.0], 0.5).unwrap();
        assert_eq!(clustering.labels, vec![0, 1, 0, 2]);
    }

    #[test]
    fn clustering_is_idempotent() {
        let values = [0.11, 0.52, 0.13, 0.49, 0.92];
        let first = to_kinds(&values, 0.2).unwrap();
        let second = to_kinds(&values, 0.2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn kind_count_is_monotonic_in_threshold() {
        let values = [0.1, 0.4, 0.9, 1.3, 2.0, 2.2];
        let mut previous = usize::MAX;
        for thr in [0.1, 0.3, 0.6, 1.0, 3.0] {
            let clustering = to_kinds(&values, thr).unwrap();
            let count = clustering.labels.iter().max().unwrap() + 1;
            assert!(count <= previous, "thr={thr} produced more kinds");
            previous = count;
        }
    }

    #[test]
    fn named_kinds_drop_suffix_for_single_cluster_species() {
        let values = [1.0, 0.0, 0.5, 0.5];
        let symbols: Vec<String> =
            ["Li", "Li", "Cu", "Cu"].iter().map(|s| s.to_string()).collect();
        let names = to_named_kinds(&values, &symbols, 0.6).unwrap();
        // Li splits in two clusters; Cu collapses to one and loses its suffix.
        assert_eq!(names, vec!["Li0", "Li1", "Cu", "Cu"]);
    }

    #[test]
    fn get_kinds_splits_on_charge() {
        // Scenario A: identical masses, distinct charges.
        let collector = collector(
            json!(["Li", "Li"]),
            &[
                ("mass", json!([6.941, 6.941])),
                ("charge", json!([1.0, 0.0])),
            ],
        );
        let kinds = get_kinds(&collector, &GetKindsOptions::default()).unwrap();
        assert_eq!(kinds.names, vec!["Li0", "Li1"]);
        assert_eq!(kinds.representatives["charge"], vec![1.0, 0.0]);
    }

    #[test]
    fn get_kinds_with_exclusion_merges_sites() {
        // Scenario B: excluding charge leaves only the identical masses.
        let collector = collector(
            json!(["Li", "Li"]),
            &[
                ("mass", json!([6.941, 6.941])),
                ("charge", json!([1.0, 0.0])),
            ],
        );
        let options = GetKindsOptions {
            exclude: vec!["charge".into()],
            ..Default::default()
        };
        let kinds = get_kinds(&collector, &options).unwrap();
        assert_eq!(kinds.names, vec!["Li0", "Li0"]);
        // Excluded property still reported: the kind's first site value.
        assert_eq!(kinds.representatives["charge"], vec![1.0, 1.0]);
    }

    #[test]
    fn get_kinds_four_sites_two_species() {
        // Scenario C: charge threshold 0.6 splits the two Li (difference
        // 0.5 lands in separate grid buckets) and merges the two Cu.
        let collector = collector(
            json!(["Li", "Li", "Cu", "Cu"]),
            &[("charge", json!([1.0, 0.5, 0.0, 0.0]))],
        );
        let options = GetKindsOptions {
            custom_thresholds: [("charge".to_string(), 0.6)].into_iter().collect(),
            ..Default::default()
        };
        let kinds = get_kinds(&collector, &options).unwrap();
        assert_eq!(kinds.names, vec!["Li0", "Li1", "Cu2", "Cu2"]);
    }

    #[test]
    fn get_kinds_unknown_threshold_name() {
        let collector = collector(json!(["Li", "Li"]), &[]);
        let options = GetKindsOptions {
            custom_thresholds: [("velocity".to_string(), 0.1)].into_iter().collect(),
            ..Default::default()
        };
        let err = get_kinds(&collector, &options).unwrap_err();
        assert!(matches!(err, KindError::UnknownProperty { ref name } if name == "velocity"));
    }

    #[test]
    fn get_kinds_threshold_for_unstored_property() {
        // charge is clusterable but not stored on this structure.
        let collector = collector(json!(["Li", "Li"]), &[]);
        let options = GetKindsOptions {
            custom_thresholds: [("charge".to_string(), 0.1)].into_iter().collect(),
            ..Default::default()
        };
        let err = get_kinds(&collector, &options).unwrap_err();
        assert!(matches!(err, KindError::UnknownProperty { ref name } if name == "charge"));
    }

    #[test]
    fn get_kinds_clusters_only_the_selected_properties() {
        // Selecting mass alone is equivalent to excluding charge, except no
        // charge representatives are reported.
        let collector = collector(
            json!(["Li", "Li"]),
            &[
                ("mass", json!([6.941, 6.941])),
                ("charge", json!([1.0, 0.0])),
            ],
        );
        let options = GetKindsOptions {
            properties_to_cluster: vec!["mass".into()],
            ..Default::default()
        };
        let kinds = get_kinds(&collector, &options).unwrap();
        assert_eq!(kinds.names, vec!["Li0", "Li0"]);
        assert!(!kinds.representatives.contains_key("charge"));
    }

    #[test]
    fn get_kinds_without_clusterable_split_uses_symbols() {
        let collector = collector(json!(["Li", "Cl"]), &[]);
        let kinds = get_kinds(&collector, &GetKindsOptions::default()).unwrap();
        assert_eq!(kinds.names, vec!["Li0", "Cl1"]);
    }
}
