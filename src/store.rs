//! # Collaborator Interfaces and In-Memory Store
//!
//! The engine reads everything it needs through three traits, so the hosting
//! framework can plug in its own metadata, storage and field handling:
//!
//! - **`MetadataProvider`**: field definitions, field instances and entity
//!   kind information.
//! - **`EntityStore`**: filtered, ordered candidate queries plus entity
//!   loading and labelling.
//! - **`ItemExtractor`**: turns raw submitted widget values into stored-shape
//!   field items, the way the field type would save them.
//!
//! `MemoryStore` implements the first two over plain collections and is what
//! site files load into. `FieldTypeItemExtractor` is the default
//! `ItemExtractor`.

use std::cell::RefCell;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;

use log::debug;

use crate::error::{Error, Result};
use crate::form::SubmittedValue;
use crate::schema::{
    item, Direction, Entity, EntityId, EntityKindInfo, FieldDefinition, FieldInstance, FieldItem,
    Value,
};

/// One OR-within-field condition: `field.column IN values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub column: String,
    pub values: Vec<Value>,
}

impl Condition {
    /// Whether any item of the entity satisfies the condition.
    pub fn matches(&self, entity: &Entity) -> bool {
        entity.items(&self.field).iter().any(|item| {
            item.get(&self.column)
                .is_some_and(|value| self.values.contains(value))
        })
    }
}

/// What a query result is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKey {
    /// An entity property (`title`, `weight`, ...).
    Property(String),
    /// The first item of a field column.
    Field { field: String, column: String },
}

/// Result ordering of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub key: OrderKey,
    pub direction: Direction,
}

impl Ordering {
    pub fn property(name: &str, direction: Direction) -> Self {
        Self {
            key: OrderKey::Property(name.to_string()),
            direction,
        }
    }

    pub fn field(field: &str, column: &str, direction: Direction) -> Self {
        Self {
            key: OrderKey::Field {
                field: field.to_string(),
                column: column.to_string(),
            },
            direction,
        }
    }

    fn sort_value<'a>(&self, entity: &'a Entity) -> Option<&'a Value> {
        match &self.key {
            OrderKey::Property(name) => entity.properties.get(name),
            OrderKey::Field { field, column } => entity.first_value(field, column),
        }
    }

    /// Compare two entities. Entities without a sort value go last in
    /// either direction; ties fall back to identifier order.
    pub fn compare(&self, a: &Entity, b: &Entity) -> CmpOrdering {
        let primary = match (self.sort_value(a), self.sort_value(b)) {
            (Some(x), Some(y)) => match self.direction {
                Direction::Asc => x.cmp(y),
                Direction::Desc => y.cmp(x),
            },
            (Some(_), None) => CmpOrdering::Less,
            (None, Some(_)) => CmpOrdering::Greater,
            (None, None) => CmpOrdering::Equal,
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// A candidate query against the entity store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityQuery {
    pub entity_kind: String,
    /// Bundles are OR-ed; an empty set matches nothing.
    pub bundles: Vec<String>,
    /// Conditions are AND-ed with each other.
    pub conditions: Vec<Condition>,
    pub ordering: Option<Ordering>,
    /// Pass-through tags for instrumentation.
    pub tags: Vec<String>,
}

impl EntityQuery {
    /// Whether an entity satisfies the bundle scope and every condition.
    pub fn matches(&self, entity: &Entity) -> bool {
        entity.kind == self.entity_kind
            && self.bundles.contains(&entity.bundle)
            && self.conditions.iter().all(|c| c.matches(entity))
    }
}

/// Field and entity metadata.
pub trait MetadataProvider {
    /// The definition of `name`, if the field is attached to `entity_kind`.
    fn field_definition(&self, entity_kind: &str, name: &str) -> Option<&FieldDefinition>;

    /// Field instances of a bundle in form order.
    fn field_instances(&self, entity_kind: &str, bundle: &str) -> Vec<&FieldInstance>;

    /// Kind information, `None` for unknown kinds.
    fn entity_kind_info(&self, entity_kind: &str) -> Option<&EntityKindInfo>;

    /// A single instance of a bundle.
    fn field_instance(&self, entity_kind: &str, bundle: &str, field: &str) -> Option<&FieldInstance> {
        self.field_instances(entity_kind, bundle)
            .into_iter()
            .find(|instance| instance.field == field)
    }
}

/// Read-only access to stored entities.
pub trait EntityStore {
    /// Identifiers of the entities matching the query, in result order.
    fn query(&self, query: &EntityQuery) -> Result<Vec<EntityId>>;

    /// Load entities, preserving the order of `ids`. Unknown ids are skipped.
    fn load(&self, entity_kind: &str, ids: &[EntityId]) -> Result<Vec<Entity>>;

    /// Human-readable label of an entity.
    fn label_of(&self, entity_kind: &str, entity: &Entity) -> String;
}

/// Normalizes raw submitted values into stored-shape items.
pub trait ItemExtractor {
    fn extract_items(&self, definition: &FieldDefinition, raw: &[SubmittedValue]) -> Vec<FieldItem>;
}

/// Item extraction following each field type's storage columns.
///
/// Scalars land in the primary column; full items are kept with their other
/// columns. Blank values and the `_none` select sentinel are dropped. The
/// primary value is converted with `FieldType::normalize`, so submitted
/// strings compare equal to stored integers and references; values the
/// type cannot hold are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTypeItemExtractor;

impl ItemExtractor for FieldTypeItemExtractor {
    fn extract_items(&self, definition: &FieldDefinition, raw: &[SubmittedValue]) -> Vec<FieldItem> {
        let field_type = &definition.field_type;
        let primary = field_type.columns()[0];

        raw.iter()
            .filter_map(|submitted| {
                let mut item = match submitted {
                    SubmittedValue::Scalar(value) => item(primary, value.clone()),
                    SubmittedValue::Item(item) => item.clone(),
                };
                let value = item.get(primary)?.clone();
                if value.is_blank() || value == Value::from(crate::phases::NONE_KEY) {
                    return None;
                }
                if !field_type.normalize_item(&mut item) {
                    debug!(
                        "Dropping submitted value {} for {} field {}",
                        value,
                        field_type.type_name(),
                        definition.name
                    );
                    return None;
                }
                Some(item)
            })
            .collect()
    }
}

/// In-memory metadata and entity storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    kinds: BTreeMap<String, EntityKindInfo>,
    definitions: BTreeMap<String, FieldDefinition>,
    instances: Vec<FieldInstance>,
    entities: BTreeMap<String, BTreeMap<EntityId, Entity>>,
    executed: RefCell<Vec<EntityQuery>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_kind(&mut self, info: EntityKindInfo) {
        self.kinds.insert(info.name.clone(), info);
    }

    pub fn add_field(&mut self, definition: FieldDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Attach a field to a bundle, replacing any previous instance.
    pub fn add_instance(&mut self, instance: FieldInstance) {
        if let Some(existing) = self.instances.iter_mut().find(|i| {
            i.entity_kind == instance.entity_kind
                && i.bundle == instance.bundle
                && i.field == instance.field
        }) {
            *existing = instance;
        } else {
            self.instances.push(instance);
        }
    }

    /// Store a persisted entity. Entities without an identifier are rejected.
    pub fn add_entity(&mut self, entity: Entity) -> Result<()> {
        let id = entity.id.ok_or_else(|| Error::ConfigParse {
            message: format!(
                "Entity of bundle {}.{} has no id",
                entity.kind, entity.bundle
            ),
            hint: Some("Every stored entity needs a numeric 'id'".to_string()),
        })?;
        self.entities
            .entry(entity.kind.clone())
            .or_default()
            .insert(id, entity);
        Ok(())
    }

    pub fn entity(&self, entity_kind: &str, id: EntityId) -> Option<&Entity> {
        self.entities.get(entity_kind).and_then(|e| e.get(&id))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &EntityKindInfo> {
        self.kinds.values()
    }

    pub fn instances(&self) -> impl Iterator<Item = &FieldInstance> {
        self.instances.iter()
    }

    pub fn instance_mut(
        &mut self,
        entity_kind: &str,
        bundle: &str,
        field: &str,
    ) -> Option<&mut FieldInstance> {
        self.instances
            .iter_mut()
            .find(|i| i.entity_kind == entity_kind && i.bundle == bundle && i.field == field)
    }

    pub fn definition(&self, name: &str) -> Option<&FieldDefinition> {
        self.definitions.get(name)
    }

    /// Queries executed so far, oldest first.
    pub fn executed_queries(&self) -> Vec<EntityQuery> {
        self.executed.borrow().clone()
    }
}

impl MetadataProvider for MemoryStore {
    fn field_definition(&self, entity_kind: &str, name: &str) -> Option<&FieldDefinition> {
        let attached = self
            .instances
            .iter()
            .any(|i| i.entity_kind == entity_kind && i.field == name);
        if attached {
            self.definitions.get(name)
        } else {
            None
        }
    }

    fn field_instances(&self, entity_kind: &str, bundle: &str) -> Vec<&FieldInstance> {
        self.instances
            .iter()
            .filter(|i| i.entity_kind == entity_kind && i.bundle == bundle)
            .collect()
    }

    fn entity_kind_info(&self, entity_kind: &str) -> Option<&EntityKindInfo> {
        self.kinds.get(entity_kind)
    }
}

impl EntityStore for MemoryStore {
    fn query(&self, query: &EntityQuery) -> Result<Vec<EntityId>> {
        self.executed.borrow_mut().push(query.clone());

        let mut matched: Vec<&Entity> = self
            .entities
            .get(&query.entity_kind)
            .map(|entities| entities.values().filter(|e| query.matches(e)).collect())
            .unwrap_or_default();

        if let Some(ordering) = &query.ordering {
            matched.sort_by(|a, b| ordering.compare(a, b));
        }

        debug!(
            "Query on {} [{}] matched {} entities",
            query.entity_kind,
            query.tags.join(","),
            matched.len()
        );

        Ok(matched.into_iter().filter_map(|e| e.id).collect())
    }

    fn load(&self, entity_kind: &str, ids: &[EntityId]) -> Result<Vec<Entity>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.entity(entity_kind, *id).cloned())
            .collect())
    }

    fn label_of(&self, entity_kind: &str, entity: &Entity) -> String {
        let property = self
            .kinds
            .get(entity_kind)
            .map(|info| info.label_property.as_str())
            .unwrap_or("label");
        match entity.properties.get(property) {
            Some(value) => value.to_string(),
            None => match entity.id {
                Some(id) => format!("{} {}", entity_kind, id),
                None => entity_kind.to_string(),
            },
        }
    }
}
