//! A validated, immutable property store for atomistic structures, with
//! tolerance-based derivation of site *kinds* and builders for Hubbard
//! interaction parameters and magnetic configurations.
//!
//! # Features
//!
//! - **Property validation** — A closed registry of property schemas
//!   (positions, symbols, cell, pbc, mass, charge, kinds, magnetization,
//!   Hubbard, custom) with presence rules, per-symbol defaults and
//!   cross-property consistency checks, run in a fixed dependency order
//! - **Immutable snapshots** — A [`PropertyCollector`] is never mutated;
//!   every update re-validates the full payload and yields a new snapshot
//! - **Kind clustering** — Deterministic space-grid clustering of scalar
//!   properties ([`to_kinds`]) and multi-property aggregation
//!   ([`get_kinds`]) into named site kinds
//! - **Hubbard parameters** — Manifold syntax validation, minimum-image
//!   translation inference, deduplicated append/pop/clear of onsite and
//!   intersite terms
//! - **Magnetic configurations** — Sign-aware, tolerance-grouped conversion
//!   of per-site moments into kind tags
//!
//! # Quick Start
//!
//! Construct a structure snapshot from a payload mapping and derive its
//! kinds:
//!
//! ```
//! use kind_forge::{get_kinds, GetKindsOptions, Payload, PropertyCollector};
//! use serde_json::json;
//!
//! // Two lithium sites with distinct charges.
//! let mut payload = Payload::new();
//! let record = |value: serde_json::Value| {
//!     json!({ "value": value }).as_object().unwrap().clone()
//! };
//! payload.insert("positions".into(), record(json!([[0.0, 0.0, 0.0], [1.5, 1.5, 1.5]])));
//! payload.insert("symbols".into(), record(json!(["Li", "Li"])));
//! payload.insert("charge".into(), record(json!([1.0, 0.0])));
//!
//! let structure = PropertyCollector::from_payload(payload)?;
//!
//! // Derived properties were defaulted.
//! assert_eq!(structure.pbc().value, [true, true, true]);
//! assert!((structure.mass().value[0] - 6.94).abs() < 1e-12);
//!
//! // The charge difference splits the two sites into two kinds.
//! let kinds = get_kinds(&structure, &GetKindsOptions::default())?;
//! assert_eq!(kinds.names, vec!["Li0", "Li1"]);
//! assert_eq!(kinds.representatives["charge"], vec![1.0, 0.0]);
//!
//! // Updates never touch the original snapshot.
//! let updated = structure.with_property("charge", record(json!([0.0, 0.0])))?;
//! assert_eq!(structure.charge().unwrap().value, vec![1.0, 0.0]);
//! assert_eq!(updated.charge().unwrap().value, vec![0.0, 0.0]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`kinds`] — Space-grid clustering and multi-property kind derivation
//! - [`hubbard`] — Hubbard interaction parameters and their builder
//! - [`magnetic`] — Magnetization property and the magnetic configuration
//!   builder
//!
//! # Data Types
//!
//! - [`PropertyCollector`] — Immutable, validated property container
//! - [`Property`] / [`PropertyName`] — Closed tagged union of property
//!   values and names
//! - [`Element`] — Chemical element with symbol and atomic mass lookups
//! - [`HubbardParameter`] / [`Hubbard`] — Interaction terms and their
//!   aggregate
//! - [`Magnetization`] — Per-site moments plus the kind-resolved collinear
//!   map

mod geometry;
mod model;

pub mod hubbard;
pub mod kinds;
pub mod magnetic;

pub use model::{
    Cell, Charge, CustomProperty, Domain, Element, FieldMap, Kinds, Mass, ParseElementError,
    Payload, Pbc, Positions, Property, PropertyCollector, PropertyError, PropertyName,
    PropertySchema, Symbols,
};

pub use kinds::{
    get_kinds, to_kinds, to_named_kinds, Clustering, GetKindsOptions, KindError, KindsData,
};

pub use hubbard::{
    validate_manifold, Formulation, Hubbard, HubbardBuilder, HubbardError, HubbardParameter,
    HubbardType, Projectors,
};

pub use magnetic::{
    collinear_to_cartesian, MagneticBuilder, MagneticConfiguration, MagneticError, MagneticUnits,
    Magnetization, MomentOptions, SiteMoments,
};
