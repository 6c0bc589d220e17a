//! Phase 3: Value Extraction
//!
//! Produces the current values of each active matching field. Where the
//! values come from depends on the entity's provenance:
//!
//! 1.  **Persisted**: a saved entity with no live submission reads its stored
//!     items.
//! 2.  **Submitted**: when live form values exist, a transient entity is first
//!     materialized by running them through the field type's item extraction,
//!     so values match what saving would store.
//! 3.  **Fresh defaults**: a new entity on first render uses the field
//!     instance's configured default value. Widget-level defaults are not
//!     consulted; widgets structure them inconsistently.
//!
//! Only the primary matchable column is extracted: the identifier column for
//! references and the first declared column otherwise. Matching on several
//! columns at once is not supported.

use log::{debug, warn};

use crate::form::Submission;
use crate::reference::ReferenceRegistry;
use crate::schema::{Entity, FieldInstance, FieldItem, Value};
use crate::store::{ItemExtractor, MetadataProvider};

/// Where match values are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Persisted,
    Submitted,
    FreshDefaults,
}

impl Provenance {
    /// Classify an entity and the optional live submission.
    pub fn of(entity: &Entity, submission: Option<&Submission>) -> Self {
        if submission.is_some() {
            Provenance::Submitted
        } else if entity.is_persisted() {
            Provenance::Persisted
        } else {
            Provenance::FreshDefaults
        }
    }
}

/// Current values of one matching field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchValues {
    pub field: String,
    pub column: String,
    /// Distinct values in item order.
    pub values: Vec<Value>,
}

/// Build the transient entity a submission describes.
///
/// Submitted fields not attached to the entity's bundle are ignored.
pub fn materialize(
    entity: &Entity,
    submission: &Submission,
    metadata: &dyn MetadataProvider,
    extractor: &dyn ItemExtractor,
) -> Entity {
    let mut transient = entity.clone();
    for (field, raw) in &submission.values {
        if metadata
            .field_instance(&entity.kind, &entity.bundle, field)
            .is_none()
        {
            debug!("Ignoring submitted value for unattached field {}", field);
            continue;
        }
        if let Some(definition) = metadata.field_definition(&entity.kind, field) {
            let items = extractor.extract_items(definition, raw);
            transient.fields.insert(field.clone(), items);
        }
    }
    transient
}

/// Distinct values of `column` across `items`, in item order.
pub fn column_values(items: &[FieldItem], column: &str) -> Vec<Value> {
    let mut values = Vec::new();
    for value in items.iter().filter_map(|item| item.get(column)) {
        if !value.is_blank() && !values.contains(value) {
            values.push(value.clone());
        }
    }
    values
}

/// Execute Phase 3 for one matching field.
///
/// `entity` must already be materialized when the provenance is `Submitted`.
pub fn execute(
    entity: &Entity,
    provenance: Provenance,
    instance: &FieldInstance,
    column: &str,
) -> Vec<Value> {
    let items = match provenance {
        Provenance::FreshDefaults => instance.default_value.as_slice(),
        Provenance::Persisted | Provenance::Submitted => entity.items(&instance.field),
    };
    column_values(items, column)
}

/// Execute Phase 3 for every active matching field.
pub fn collect(
    entity: &Entity,
    provenance: Provenance,
    matching_fields: &[String],
    metadata: &dyn MetadataProvider,
    registry: &ReferenceRegistry,
) -> Vec<MatchValues> {
    matching_fields
        .iter()
        .filter_map(|field| {
            let instance = metadata.field_instance(&entity.kind, &entity.bundle, field);
            let definition = metadata.field_definition(&entity.kind, field);
            match (instance, definition) {
                (Some(instance), Some(definition)) => {
                    let column = registry.match_column(definition);
                    Some(MatchValues {
                        field: field.clone(),
                        column: column.to_string(),
                        values: execute(entity, provenance, instance, column),
                    })
                }
                _ => {
                    warn!(
                        "Matching field {} is not attached to {}.{}",
                        field, entity.kind, entity.bundle
                    );
                    None
                }
            }
        })
        .collect()
}
