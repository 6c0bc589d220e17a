//! The option limiting pipeline.
//!
//! ## Overview
//!
//! A full form build runs, for every option-limited field:
//! 1. Target Resolution - which kind and bundles the reference may point at
//! 2. Matching Field Discovery - fields present on the owner and a target bundle
//! 3. Value Extraction - current values of each active matcher
//! 4. Query Planning - bundle-scoped, OR-matched, ordered candidate query
//! 5. Option Building - labelled options plus empty-state policy
//!
//! A partial update first runs Routing to pick the one field whose options
//! depend on the changed element, then re-runs phases 3-5 for it.
//!
//! Each phase depends only on the previous phases and the collaborator traits
//! in `store`. Nothing is cached between requests.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::reference::ResolvedTarget;
use crate::schema::{EntityId, FieldDefinition, FieldInstance};
use crate::settings::EffectiveSettings;

pub mod discovery;
pub mod extract;
pub mod options;
pub mod orchestrator;
pub mod plan;
pub mod resolve;
pub mod routing;

pub use discovery as phase2;
pub use extract as phase3;
pub use options as phase5;
pub use plan as phase4;
pub use resolve as phase1;
pub use routing::{RouterState, route};

/// Key of the "none" option, also the value a select submits for it.
pub const NONE_KEY: &str = "_none";

/// Key of a selectable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    /// The explicit "no value" choice.
    None,
    Entity(EntityId),
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKey::None => write!(f, "{}", NONE_KEY),
            OptionKey::Entity(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for OptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A labelled option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub key: OptionKey,
    pub label: String,
}

/// An option or a labelled group of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionItem {
    Choice(OptionEntry),
    Group {
        label: String,
        entries: Vec<OptionEntry>,
    },
}

/// Explanation attached to an empty option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    /// Label of the option-limited field.
    pub field_label: String,
    /// Names of the active matching fields responsible.
    pub matching_fields: Vec<String>,
}

impl Advisory {
    pub fn message(&self) -> String {
        format!(
            "There are no options available for {} based on the current values of: {}",
            self.field_label,
            self.matching_fields.join(", ")
        )
    }
}

/// The options a widget offers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OptionList {
    pub items: Vec<OptionItem>,
    /// True when there is nothing to pick besides the "none" entry.
    pub is_empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

impl OptionList {
    /// Every option in display order, groups expanded.
    pub fn entries(&self) -> Vec<&OptionEntry> {
        self.items
            .iter()
            .flat_map(|item| match item {
                OptionItem::Choice(entry) => std::slice::from_ref(entry).iter(),
                OptionItem::Group { entries, .. } => entries.iter(),
            })
            .collect()
    }

    /// Labels of the entity options, without the "none" entry.
    pub fn labels(&self) -> Vec<&str> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.key != OptionKey::None)
            .map(|entry| entry.label.as_str())
            .collect()
    }

    pub fn has_none_entry(&self) -> bool {
        self.entries().iter().any(|entry| entry.key == OptionKey::None)
    }
}

/// An option-limited field instance, resolved for the current schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitedField {
    pub instance: FieldInstance,
    pub definition: FieldDefinition,
    pub target: ResolvedTarget,
    /// Candidate matching field names, in owner form order.
    pub candidates: Vec<String>,
    pub settings: EffectiveSettings,
}

impl LimitedField {
    pub fn name(&self) -> &str {
        &self.instance.field
    }

    /// Whether `field` is one of this field's active matchers.
    pub fn is_matched_by(&self, field: &str) -> bool {
        self.settings.matching_fields.iter().any(|m| m == field)
    }
}
