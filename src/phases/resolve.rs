//! Phase 1: Target Resolution
//!
//! Derives the target entity kind and bundles of a reference field by asking
//! the registered `ReferenceType` for its field type. Resolution is total: a
//! field that is not a reference, or whose target cannot be resolved, yields
//! an empty bundle set, which later phases read as "filtering unavailable".

use log::debug;

use crate::error::Error;
use crate::reference::{ReferenceRegistry, ResolvedTarget};
use crate::schema::FieldDefinition;
use crate::store::MetadataProvider;

/// Execute Phase 1: resolve the reference target of `definition`.
pub fn execute(
    definition: &FieldDefinition,
    metadata: &dyn MetadataProvider,
    registry: &ReferenceRegistry,
) -> ResolvedTarget {
    let target = match registry.handler_for(&definition.field_type) {
        Some(handler) => handler.resolve_target(definition, metadata),
        None => ResolvedTarget::unresolved(""),
    };
    if !target.is_resolved() {
        debug!(
            "Field {} ({}) has no resolvable target bundles",
            definition.name,
            definition.field_type.type_name()
        );
    }
    target
}

/// Describe an unresolved target as an `UnresolvedTarget` value.
pub fn unresolved_reason(definition: &FieldDefinition, target: &ResolvedTarget) -> Option<Error> {
    if target.is_resolved() {
        return None;
    }
    let message = if target.entity_kind.is_empty() {
        format!(
            "'{}' is not a reference field type",
            definition.field_type.type_name()
        )
    } else {
        format!(
            "entity kind '{}' has no resolvable bundles",
            target.entity_kind
        )
    };
    Some(Error::UnresolvedTarget {
        field: definition.name.clone(),
        message,
    })
}
