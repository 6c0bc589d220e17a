//! Phase 2: Matching Field Discovery
//!
//! A field can act as a matcher when it is attached to the bundle that owns
//! the option-limited field and to at least one target bundle. The
//! option-limited field itself is never a candidate.
//!
//! Candidates keep the owner's form order so that the settings checklist and
//! the query conditions are stable across requests.

use crate::reference::ResolvedTarget;
use crate::store::MetadataProvider;

/// A candidate matching field with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingField {
    pub name: String,
    /// `"Label (field_name)"`, for the settings checklist.
    pub label: String,
}

/// Execute Phase 2: discover candidate matching fields.
pub fn execute(
    metadata: &dyn MetadataProvider,
    owner_kind: &str,
    owner_bundle: &str,
    limited_field: &str,
    target: &ResolvedTarget,
) -> Vec<MatchingField> {
    if !target.is_resolved() {
        return Vec::new();
    }

    let target_fields: Vec<String> = target
        .bundles
        .iter()
        .flat_map(|bundle| metadata.field_instances(&target.entity_kind, bundle))
        .map(|instance| instance.field.clone())
        .collect();

    metadata
        .field_instances(owner_kind, owner_bundle)
        .into_iter()
        .filter(|instance| instance.field != limited_field)
        .filter(|instance| target_fields.contains(&instance.field))
        .map(|instance| MatchingField {
            name: instance.field.clone(),
            label: format!("{} ({})", instance.label, instance.field),
        })
        .collect()
}

/// Bare candidate names.
pub fn names(candidates: &[MatchingField]) -> Vec<String> {
    candidates.iter().map(|c| c.name.clone()).collect()
}
