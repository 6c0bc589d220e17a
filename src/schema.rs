//! # Entity and Field Data Model
//!
//! This module defines the site structure the engine reasons about:
//!
//! - **`EntityKindInfo`**: a category of entity (`node`, `taxonomy_term`,
//!   `user`) with its bundles and the property used as its label.
//! - **`FieldDefinition`**: a named, typed field. Definitions are site-wide
//!   and keyed by name; they become part of a bundle through a
//!   `FieldInstance`.
//! - **`FieldInstance`**: the binding of a definition to one bundle, with its
//!   label, widget, default value and option limiting settings.
//! - **`Entity`**: a persisted or transient instance of a bundle holding
//!   properties and per-field item lists.
//!
//! Everything here is plain data and deserializes directly from a site file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::settings::OptionLimitSettings;

/// Identifier of a persisted entity.
pub type EntityId = u64;

/// Taxonomy term entity kind name.
pub const TAXONOMY_TERM: &str = "taxonomy_term";

/// A scalar stored in a field column or entity property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    /// Whether this value carries no data (an empty string).
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim().is_empty())
    }

    /// Interpret the value as an entity identifier.
    ///
    /// Text values holding digits are accepted because submitted form values
    /// arrive as strings.
    pub fn as_entity_id(&self) -> Option<EntityId> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Value::Int(id as i64)
    }
}

/// One stored item of a field: column name to value.
pub type FieldItem = BTreeMap<String, Value>;

/// Build a single-column field item.
pub fn item(column: &str, value: impl Into<Value>) -> FieldItem {
    let mut item = FieldItem::new();
    item.insert(column.to_string(), value.into());
    item
}

/// Sort direction for result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Result ordering configured on an entity reference field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SortSettings {
    /// Store order (by identifier).
    #[default]
    None,
    /// Order by an entity property such as `title` or `created`.
    Property {
        property: String,
        #[serde(default)]
        direction: Direction,
    },
    /// Order by a field column, written `field_name:column`.
    Field {
        field: String,
        #[serde(default)]
        direction: Direction,
    },
}

/// The closed set of field types a site can declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Reference to a term in a single vocabulary.
    TaxonomyTermReference { vocabulary: String },
    /// Reference to any entity kind.
    EntityReference {
        target_type: String,
        #[serde(default)]
        target_bundles: Vec<String>,
        #[serde(default)]
        sort: SortSettings,
    },
    /// Free text.
    Text,
    /// Integer value.
    Integer,
}

impl FieldType {
    /// Declared storage columns, primary column first.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            FieldType::TaxonomyTermReference { .. } => &["tid"],
            FieldType::EntityReference { .. } => &["target_id"],
            FieldType::Text => &["value", "format"],
            FieldType::Integer => &["value"],
        }
    }

    /// Convert a primary column value to the shape this type stores.
    ///
    /// References and integers become `Value::Int`; text always becomes
    /// `Value::Text`. Returns `None` for values the type cannot hold.
    pub fn normalize(&self, value: &Value) -> Option<Value> {
        match self {
            FieldType::TaxonomyTermReference { .. } | FieldType::EntityReference { .. } => {
                value.as_entity_id().map(Value::from)
            }
            FieldType::Integer => match value {
                Value::Int(i) => Some(Value::Int(*i)),
                Value::Text(s) => s.trim().parse().ok().map(Value::Int),
            },
            FieldType::Text => Some(Value::Text(value.to_string())),
        }
    }

    /// Convert the primary column of `item` in place.
    ///
    /// Returns `false` when the item has a primary value the type cannot
    /// hold.
    pub fn normalize_item(&self, item: &mut FieldItem) -> bool {
        let primary = self.columns()[0];
        let Some(value) = item.get(primary) else {
            return true;
        };
        match self.normalize(value) {
            Some(normalized) => {
                item.insert(primary.to_string(), normalized);
                true
            }
            None => false,
        }
    }

    /// Short machine name of the type.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::TaxonomyTermReference { .. } => "taxonomy_term_reference",
            FieldType::EntityReference { .. } => "entity_reference",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
        }
    }
}

/// How many items a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Single,
    Limited(u32),
    Unlimited,
}

impl Cardinality {
    /// Whether more than one item may be selected.
    pub fn is_multiple(&self) -> bool {
        !matches!(self, Cardinality::Single | Cardinality::Limited(1))
    }
}

/// A site-wide field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl FieldDefinition {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            cardinality: Cardinality::Single,
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}

/// Widget used to edit a field instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    /// Select list, single or multiple; supports option groups.
    #[default]
    Select,
    /// Radios or checkboxes; flat options only.
    Buttons,
    /// Free-typed autocomplete; has no option list to limit.
    Autocomplete,
    /// Plain text input.
    TextField,
}

impl Widget {
    /// Whether this widget renders a fixed option list.
    pub fn has_options(&self) -> bool {
        matches!(self, Widget::Select | Widget::Buttons)
    }
}

/// The binding of a field definition to a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInstance {
    pub entity_kind: String,
    pub bundle: String,
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub widget: Widget,
    /// Field-level default items applied to fresh entities.
    #[serde(default)]
    pub default_value: Vec<FieldItem>,
    #[serde(default)]
    pub option_limit: OptionLimitSettings,
}

impl FieldInstance {
    pub fn new(entity_kind: &str, bundle: &str, field: &str, label: &str) -> Self {
        Self {
            entity_kind: entity_kind.to_string(),
            bundle: bundle.to_string(),
            field: field.to_string(),
            label: label.to_string(),
            required: false,
            widget: Widget::default(),
            default_value: Vec::new(),
            option_limit: OptionLimitSettings::default(),
        }
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widget = widget;
        self
    }

    pub fn with_default(mut self, default_value: Vec<FieldItem>) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn with_option_limit(mut self, settings: OptionLimitSettings) -> Self {
        self.option_limit = settings;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Describes an entity kind and its bundles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityKindInfo {
    pub name: String,
    /// Property holding the human-readable label.
    #[serde(default = "default_label_property")]
    pub label_property: String,
    /// Bundles of this kind. Kinds without real sub-typing have one implicit
    /// bundle named after the kind.
    #[serde(default)]
    pub bundles: Vec<String>,
    /// Whether fields can be attached to this kind at all.
    #[serde(default = "default_fieldable")]
    pub fieldable: bool,
}

fn default_label_property() -> String {
    "label".to_string()
}

fn default_fieldable() -> bool {
    true
}

impl EntityKindInfo {
    pub fn new(name: &str, label_property: &str, bundles: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label_property: label_property.to_string(),
            bundles: bundles.iter().map(|b| b.to_string()).collect(),
            fieldable: true,
        }
    }

    pub fn not_fieldable(mut self) -> Self {
        self.fieldable = false;
        self
    }
}

/// A persisted or transient entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub bundle: String,
    /// Absent for entities that only exist as form state.
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldItem>>,
}

impl Entity {
    /// A fresh, unsaved entity of the given bundle.
    pub fn new(kind: &str, bundle: &str) -> Self {
        Self {
            kind: kind.to_string(),
            bundle: bundle.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn with_items(mut self, field: &str, items: Vec<FieldItem>) -> Self {
        self.fields.insert(field.to_string(), items);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Stored items for a field, empty when the field holds nothing.
    pub fn items(&self, field: &str) -> &[FieldItem] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of `column` on `field`, used for field sorts.
    pub fn first_value(&self, field: &str, column: &str) -> Option<&Value> {
        self.items(field).iter().find_map(|item| item.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_columns_primary_first() {
        let term = FieldType::TaxonomyTermReference {
            vocabulary: "teams".to_string(),
        };
        assert_eq!(term.columns()[0], "tid");
        assert_eq!(FieldType::Text.columns(), &["value", "format"]);
    }

    #[test]
    fn test_cardinality_multiple() {
        assert!(!Cardinality::Single.is_multiple());
        assert!(!Cardinality::Limited(1).is_multiple());
        assert!(Cardinality::Limited(3).is_multiple());
        assert!(Cardinality::Unlimited.is_multiple());
    }

    #[test]
    fn test_value_as_entity_id() {
        assert_eq!(Value::Int(4).as_entity_id(), Some(4));
        assert_eq!(Value::from("12").as_entity_id(), Some(12));
        assert_eq!(Value::Int(-1).as_entity_id(), None);
        assert_eq!(Value::from("_none").as_entity_id(), None);
    }

    #[test]
    fn test_normalize_follows_stored_type() {
        assert_eq!(FieldType::Integer.normalize(&Value::from(" 1892 ")), Some(Value::Int(1892)));
        assert_eq!(FieldType::Integer.normalize(&Value::from("soon")), None);
        assert_eq!(FieldType::Text.normalize(&Value::Int(1999)), Some(Value::from("1999")));
        let term = FieldType::TaxonomyTermReference {
            vocabulary: "teams".to_string(),
        };
        assert_eq!(term.normalize(&Value::from("3")), Some(Value::Int(3)));
    }

    #[test]
    fn test_normalize_item_keeps_secondary_columns() {
        let mut text = item("value", 1999_i64);
        text.insert("format".to_string(), Value::from("plain_text"));
        assert!(FieldType::Text.normalize_item(&mut text));
        assert_eq!(text["value"], Value::from("1999"));
        assert_eq!(text["format"], Value::from("plain_text"));

        let mut year = item("value", "nineteen");
        assert!(!FieldType::Integer.normalize_item(&mut year));
    }

    #[test]
    fn test_field_definition_deserializes_flattened_type() {
        let yaml = r#"
name: related
type: entity_reference
target_type: node
target_bundles: [article]
sort:
  type: field
  field: "priority:value"
  direction: DESC
cardinality: unlimited
"#;
        let def: FieldDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.cardinality, Cardinality::Unlimited);
        match def.field_type {
            FieldType::EntityReference {
                target_type,
                target_bundles,
                sort,
            } => {
                assert_eq!(target_type, "node");
                assert_eq!(target_bundles, vec!["article".to_string()]);
                assert_eq!(
                    sort,
                    SortSettings::Field {
                        field: "priority:value".to_string(),
                        direction: Direction::Desc,
                    }
                );
            }
            other => panic!("unexpected type {:?}", other),
        }
    }

    #[test]
    fn test_entity_items_and_first_value() {
        let entity = Entity::new("node", "news")
            .with_id(3)
            .with_items("priority", vec![item("value", 5), item("value", 1)]);
        assert!(entity.is_persisted());
        assert_eq!(entity.items("priority").len(), 2);
        assert_eq!(entity.items("missing").len(), 0);
        assert_eq!(entity.first_value("priority", "value"), Some(&Value::Int(5)));
    }
}
