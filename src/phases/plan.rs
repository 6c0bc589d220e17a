//! Phase 4: Query Planning
//!
//! Builds the candidate query for one option-limited field and executes it.
//!
//! ## Rules
//!
//! 1.  **Scope**: the target entity kind, OR-ed across all target bundles.
//! 2.  **Conditions**: one per active matcher with values, satisfied when the
//!     target holds *any* of them (`column IN values`). Conditions of different
//!     matchers are AND-ed.
//! 3.  **Empty matchers**: with `empty_behavior_hides_all` the condition is
//!     given a value no entity can hold, so nothing matches; otherwise the
//!     matcher is left out.
//! 4.  **Ordering**: whatever the reference type dictates.
//! 5.  **Tags**: `option_limit` and `option_limit:<field>`, for
//!     instrumentation.

use log::debug;

use super::extract::MatchValues;
use super::LimitedField;
use crate::error::{Error, Result};
use crate::reference::ReferenceRegistry;
use crate::schema::{Entity, Value};
use crate::store::{Condition, EntityQuery, EntityStore};

/// Base query tag.
pub const QUERY_TAG: &str = "option_limit";

/// Value substituted for an empty matcher when every option must be hidden.
pub const IMPOSSIBLE_VALUE: &str = "\u{0}option_limit:none";

/// A built, not yet executed, candidate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub field: String,
    pub query: EntityQuery,
}

impl QueryPlan {
    /// Whether an empty matcher forces the result to be empty.
    pub fn hides_all(&self) -> bool {
        let sentinel = Value::from(IMPOSSIBLE_VALUE);
        self.query
            .conditions
            .iter()
            .any(|c| c.values.len() == 1 && c.values[0] == sentinel)
    }
}

/// Execute Phase 4 planning for one field.
pub fn build(
    field: &LimitedField,
    match_values: &[MatchValues],
    registry: &ReferenceRegistry,
) -> QueryPlan {
    let mut conditions = Vec::new();
    if field.settings.enabled {
        for matcher in match_values {
            if !field.is_matched_by(&matcher.field) {
                continue;
            }
            let values = if !matcher.values.is_empty() {
                matcher.values.clone()
            } else if field.settings.empty_behavior_hides_all {
                vec![Value::from(IMPOSSIBLE_VALUE)]
            } else {
                continue;
            };
            conditions.push(Condition {
                field: matcher.field.clone(),
                column: matcher.column.clone(),
                values,
            });
        }
    }

    let ordering = registry
        .handler_for(&field.definition.field_type)
        .and_then(|handler| handler.ordering(&field.definition));

    let plan = QueryPlan {
        field: field.name().to_string(),
        query: EntityQuery {
            entity_kind: field.target.entity_kind.clone(),
            bundles: field.target.bundles.clone(),
            conditions,
            ordering,
            tags: vec![
                QUERY_TAG.to_string(),
                format!("{}:{}", QUERY_TAG, field.name()),
            ],
        },
    };
    debug!(
        "Planned {} with {} conditions on {} [{}]",
        plan.field,
        plan.query.conditions.len(),
        plan.query.entity_kind,
        plan.query.bundles.join(",")
    );
    plan
}

/// Execute Phase 4 planning output against the store, loading candidates.
///
/// Store failures are reported against the target kind.
pub fn execute(plan: &QueryPlan, store: &dyn EntityStore) -> Result<Vec<Entity>> {
    if plan.query.bundles.is_empty() {
        return Ok(Vec::new());
    }
    let kind = &plan.query.entity_kind;
    let ids = store.query(&plan.query).map_err(|e| store_failure(kind, e))?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    store.load(kind, &ids).map_err(|e| store_failure(kind, e))
}

fn store_failure(kind: &str, error: Error) -> Error {
    match error {
        Error::StoreFailure { .. } => error,
        other => Error::StoreFailure {
            entity_kind: kind.to_string(),
            message: other.to_string(),
        },
    }
}
