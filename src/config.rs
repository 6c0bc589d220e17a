//! # Site Definition Files
//!
//! This module parses the YAML site files the CLI and the tests work from. A
//! site file describes everything the engine would otherwise get from the
//! hosting framework:
//!
//! - **`entity_kinds`**: kinds with their bundles and label property.
//! - **`fields`**: site-wide field definitions (type, cardinality, reference
//!   settings).
//! - **`instances`**: fields attached to bundles, with widget, default value
//!   and `option_limit` settings.
//! - **`entities`**: stored entities.
//! - **`forms`**: optional explicit form trees per bundle. Bundles without one
//!   get the default `field/und/0/<column>` layout.
//!
//! ## Example
//!
//! ```yaml
//! entity_kinds:
//!   - name: node
//!     label_property: title
//!     bundles: [news]
//! fields:
//!   - name: team
//!     type: taxonomy_term_reference
//!     vocabulary: teams
//! instances:
//!   - entity_kind: node
//!     bundle: news
//!     field: team
//!     label: Team
//!     option_limit:
//!       enabled: true
//!       matching_fields: [sport]
//! ```
//!
//! Parsing validates machine names and cross references, so a `Site` that
//! loads is internally consistent.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::form::FormNode;
use crate::schema::{Entity, EntityKindInfo, FieldDefinition, FieldInstance, FieldItem};
use crate::settings::validate_machine_name;
use crate::store::{MemoryStore, MetadataProvider};

/// An explicit form tree for one bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub entity_kind: String,
    pub bundle: String,
    pub root: FormNode,
}

/// The raw contents of a site file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteFile {
    #[serde(default)]
    pub entity_kinds: Vec<EntityKindInfo>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub instances: Vec<FieldInstance>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub forms: Vec<FormDefinition>,
}

/// A loaded, validated site.
#[derive(Debug)]
pub struct Site {
    pub store: MemoryStore,
    forms: Vec<FormDefinition>,
}

impl Site {
    /// The form tree of a bundle: explicit if defined, generated otherwise.
    pub fn form_for(&self, entity_kind: &str, bundle: &str) -> FormNode {
        if let Some(form) = self
            .forms
            .iter()
            .find(|f| f.entity_kind == entity_kind && f.bundle == bundle)
        {
            return form.root.clone();
        }
        let store = &self.store;
        FormNode::for_instances(store.field_instances(entity_kind, bundle).into_iter().filter_map(
            |instance| {
                store
                    .definition(&instance.field)
                    .map(|definition| (instance, definition.field_type.columns()[0]))
            },
        ))
    }
}

/// Parses a YAML string into a `Site`.
pub fn parse(yaml_content: &str) -> Result<Site> {
    let file: SiteFile = serde_yaml::from_str(yaml_content)?;
    build(file)
}

/// Load and parse a site file from disk.
pub fn from_file(path: &Path) -> Result<Site> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Validate a `SiteFile` and load it into a `MemoryStore`.
pub fn build(file: SiteFile) -> Result<Site> {
    let mut store = MemoryStore::new();

    for kind in file.entity_kinds {
        validate_machine_name("entity kind", &kind.name)?;
        for bundle in &kind.bundles {
            validate_machine_name("bundle", bundle)?;
        }
        store.add_kind(kind);
    }

    for field in file.fields {
        validate_machine_name("field", &field.name)?;
        if store.definition(&field.name).is_some() {
            return Err(Error::ConfigParse {
                message: format!("Field '{}' is declared twice", field.name),
                hint: None,
            });
        }
        store.add_field(field);
    }

    for mut instance in file.instances {
        check_bundle(&store, &instance.entity_kind, &instance.bundle)?;
        let Some(definition) = store.definition(&instance.field) else {
            return Err(Error::ConfigParse {
                message: format!(
                    "Instance {}.{} uses unknown field '{}'",
                    instance.entity_kind, instance.bundle, instance.field
                ),
                hint: Some("Declare the field under 'fields:' first".to_string()),
            });
        };
        let subject = format!(
            "default value of {}.{}",
            instance.entity_kind, instance.bundle
        );
        normalize_items(definition, &mut instance.default_value, &subject)?;
        store.add_instance(instance);
    }

    for mut entity in file.entities {
        check_bundle(&store, &entity.kind, &entity.bundle)?;
        let subject = match entity.id {
            Some(id) => format!("{} {}", entity.kind, id),
            None => format!("{}.{} entity", entity.kind, entity.bundle),
        };
        for (field, items) in entity.fields.iter_mut() {
            let definition = store
                .field_instance(&entity.kind, &entity.bundle, field)
                .and_then(|_| store.definition(field))
                .ok_or_else(|| Error::UnknownField {
                    entity_kind: entity.kind.clone(),
                    bundle: entity.bundle.clone(),
                    field: field.clone(),
                })?;
            normalize_items(definition, items, &subject)?;
        }
        if let Some(id) = entity.id {
            if store.entity(&entity.kind, id).is_some() {
                return Err(Error::ConfigParse {
                    message: format!("Duplicate {} id {}", entity.kind, id),
                    hint: None,
                });
            }
        }
        store.add_entity(entity)?;
    }

    for form in &file.forms {
        check_bundle(&store, &form.entity_kind, &form.bundle)?;
    }

    Ok(Site {
        store,
        forms: file.forms,
    })
}

/// Store field items in the shape their type saves them, so an unquoted
/// `value: 1999` on a text field compares equal to the submitted "1999".
fn normalize_items(definition: &FieldDefinition, items: &mut [FieldItem], subject: &str) -> Result<()> {
    for item in items.iter_mut() {
        if !definition.field_type.normalize_item(item) {
            return Err(Error::ConfigParse {
                message: format!(
                    "Invalid value for {} field '{}' on {}",
                    definition.field_type.type_name(),
                    definition.name,
                    subject
                ),
                hint: Some(format!(
                    "Use a value the '{}' type can store",
                    definition.field_type.type_name()
                )),
            });
        }
    }
    Ok(())
}

fn check_bundle(store: &MemoryStore, entity_kind: &str, bundle: &str) -> Result<()> {
    let info = store
        .entity_kind_info(entity_kind)
        .ok_or_else(|| Error::ConfigParse {
            message: format!("Unknown entity kind '{}'", entity_kind),
            hint: Some("Declare it under 'entity_kinds:'".to_string()),
        })?;
    if info.bundles.iter().any(|b| b == bundle) {
        Ok(())
    } else {
        Err(Error::ConfigParse {
            message: format!("Unknown bundle '{}' of entity kind '{}'", bundle, entity_kind),
            hint: Some(format!("Known bundles: {}", info.bundles.join(", "))),
        })
    }
}
