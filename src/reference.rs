//! # Reference Types
//!
//! Each supported reference field type implements `ReferenceType`, which
//! answers the three type-dependent questions of the pipeline:
//!
//! - **`resolve_target`**: which entity kind and bundles the field may point at;
//! - **`match_column`** and **`ordering`**: how stored values are matched and
//!   how candidates are ordered;
//! - **`label_options`**: how loaded candidates become labelled options.
//!
//! `ReferenceRegistry` holds the implementations. New reference types are
//! added by registering another implementation.

use std::collections::BTreeMap;

use crate::phases::{OptionEntry, OptionItem, OptionKey};
use crate::schema::{
    Direction, Entity, FieldDefinition, FieldType, SortSettings, TAXONOMY_TERM,
};
use crate::store::{EntityStore, MetadataProvider, Ordering};

/// The entity kind and bundles a reference field may point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub entity_kind: String,
    /// Empty when no filtering is possible.
    pub bundles: Vec<String>,
}

impl ResolvedTarget {
    /// A target with no bundles: filtering unavailable.
    pub fn unresolved(entity_kind: &str) -> Self {
        Self {
            entity_kind: entity_kind.to_string(),
            bundles: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.bundles.is_empty()
    }
}

/// Behaviour of one reference field type.
pub trait ReferenceType {
    /// Machine name of the handled field type.
    fn type_name(&self) -> &'static str;

    /// Whether this implementation handles the given field type.
    fn handles(&self, field_type: &FieldType) -> bool;

    /// Resolve the target kind and bundles. Never fails; an unresolvable
    /// target has an empty bundle set.
    fn resolve_target(
        &self,
        definition: &FieldDefinition,
        metadata: &dyn MetadataProvider,
    ) -> ResolvedTarget;

    /// Column holding the referenced identifier.
    fn match_column(&self) -> &'static str;

    /// Result ordering for candidate queries.
    fn ordering(&self, definition: &FieldDefinition) -> Option<Ordering>;

    /// Label loaded candidates, possibly grouped.
    fn label_options(
        &self,
        store: &dyn EntityStore,
        target: &ResolvedTarget,
        entities: &[Entity],
    ) -> Vec<OptionItem>;
}

/// References to taxonomy terms of a single vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomyTermReference;

impl ReferenceType for TaxonomyTermReference {
    fn type_name(&self) -> &'static str {
        "taxonomy_term_reference"
    }

    fn handles(&self, field_type: &FieldType) -> bool {
        matches!(field_type, FieldType::TaxonomyTermReference { .. })
    }

    fn resolve_target(
        &self,
        definition: &FieldDefinition,
        _metadata: &dyn MetadataProvider,
    ) -> ResolvedTarget {
        match &definition.field_type {
            FieldType::TaxonomyTermReference { vocabulary } if !vocabulary.is_empty() => {
                ResolvedTarget {
                    entity_kind: TAXONOMY_TERM.to_string(),
                    bundles: vec![vocabulary.clone()],
                }
            }
            _ => ResolvedTarget::unresolved(TAXONOMY_TERM),
        }
    }

    fn match_column(&self) -> &'static str {
        "tid"
    }

    fn ordering(&self, _definition: &FieldDefinition) -> Option<Ordering> {
        Some(Ordering::property("weight", Direction::Asc))
    }

    fn label_options(
        &self,
        store: &dyn EntityStore,
        target: &ResolvedTarget,
        entities: &[Entity],
    ) -> Vec<OptionItem> {
        entities
            .iter()
            .filter_map(|entity| {
                entity.id.map(|id| {
                    OptionItem::Choice(OptionEntry {
                        key: OptionKey::Entity(id),
                        label: store.label_of(&target.entity_kind, entity),
                    })
                })
            })
            .collect()
    }
}

/// References to entities of any kind, with configurable sort.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReference;

impl ReferenceType for EntityReference {
    fn type_name(&self) -> &'static str {
        "entity_reference"
    }

    fn handles(&self, field_type: &FieldType) -> bool {
        matches!(field_type, FieldType::EntityReference { .. })
    }

    fn resolve_target(
        &self,
        definition: &FieldDefinition,
        metadata: &dyn MetadataProvider,
    ) -> ResolvedTarget {
        let FieldType::EntityReference {
            target_type,
            target_bundles,
            ..
        } = &definition.field_type
        else {
            return ResolvedTarget::unresolved("");
        };

        if !target_bundles.is_empty() {
            return ResolvedTarget {
                entity_kind: target_type.clone(),
                bundles: target_bundles.clone(),
            };
        }

        // Kinds without real sub-typing carry exactly one implicit bundle.
        match metadata.entity_kind_info(target_type) {
            Some(info) if info.fieldable && info.bundles.len() == 1 => ResolvedTarget {
                entity_kind: target_type.clone(),
                bundles: info.bundles.clone(),
            },
            _ => ResolvedTarget::unresolved(target_type),
        }
    }

    fn match_column(&self) -> &'static str {
        "target_id"
    }

    fn ordering(&self, definition: &FieldDefinition) -> Option<Ordering> {
        let FieldType::EntityReference { sort, .. } = &definition.field_type else {
            return None;
        };
        match sort {
            SortSettings::None => None,
            SortSettings::Property {
                property,
                direction,
            } => Some(Ordering::property(property, *direction)),
            SortSettings::Field { field, direction } => {
                let (field, column) = field.split_once(':').unwrap_or((field.as_str(), "value"));
                Some(Ordering::field(field, column, *direction))
            }
        }
    }

    fn label_options(
        &self,
        store: &dyn EntityStore,
        target: &ResolvedTarget,
        entities: &[Entity],
    ) -> Vec<OptionItem> {
        let entry = |entity: &Entity| {
            entity.id.map(|id| OptionEntry {
                key: OptionKey::Entity(id),
                label: store.label_of(&target.entity_kind, entity),
            })
        };

        if target.bundles.len() <= 1 {
            return entities
                .iter()
                .filter_map(entry)
                .map(OptionItem::Choice)
                .collect();
        }

        // Several target bundles: one group per bundle, in target order.
        let mut grouped: BTreeMap<&str, Vec<OptionEntry>> = BTreeMap::new();
        for entity in entities {
            if let Some(option) = entry(entity) {
                grouped.entry(entity.bundle.as_str()).or_default().push(option);
            }
        }
        target
            .bundles
            .iter()
            .filter_map(|bundle| {
                grouped.remove(bundle.as_str()).map(|entries| OptionItem::Group {
                    label: bundle.clone(),
                    entries,
                })
            })
            .collect()
    }
}

/// Registered reference types.
pub struct ReferenceRegistry {
    handlers: Vec<Box<dyn ReferenceType>>,
}

impl ReferenceRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register an implementation. Later registrations take precedence.
    pub fn register(&mut self, handler: Box<dyn ReferenceType>) {
        self.handlers.insert(0, handler);
    }

    /// The implementation handling `field_type`, if it is a reference type.
    pub fn handler_for(&self, field_type: &FieldType) -> Option<&dyn ReferenceType> {
        self.handlers
            .iter()
            .find(|h| h.handles(field_type))
            .map(|h| h.as_ref())
    }

    /// Primary matchable column of any field.
    ///
    /// Reference fields match on their identifier column. Other types match
    /// on their first declared column only.
    pub fn match_column(&self, definition: &FieldDefinition) -> &'static str {
        match self.handler_for(&definition.field_type) {
            Some(handler) => handler.match_column(),
            None => definition.field_type.columns()[0],
        }
    }
}

impl Default for ReferenceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(EntityReference));
        registry.register(Box::new(TaxonomyTermReference));
        registry
    }
}

impl std::fmt::Debug for ReferenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.handlers.iter().map(|h| h.type_name()).collect();
        f.debug_struct("ReferenceRegistry")
            .field("handlers", &names)
            .finish()
    }
}
