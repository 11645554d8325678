pub mod collector;
pub mod error;
pub mod property;
pub mod schema;
pub mod types;

pub use collector::PropertyCollector;
pub use error::PropertyError;
pub use property::{
    Cell, Charge, CustomProperty, FieldMap, Kinds, Mass, Payload, Pbc, Positions, Property,
    SiblingView, Symbols,
};
pub use schema::{Domain, PropertyName, PropertySchema};
pub use types::{Element, ParseElementError};
