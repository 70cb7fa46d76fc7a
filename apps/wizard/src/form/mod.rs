//! Editable résumé: field rules, repeating groups, and the wire mappers.

pub mod checks;
pub mod fields;
pub mod group;
pub mod model;
pub mod rules;

pub use fields::{FieldPath, GroupKind};
pub use group::{Cardinality, EntryId, RepeatingGroup};
pub use model::{FieldEdit, FieldValue, ResumeFormModel};
