//! Orchestrator for full form builds and partial updates
//!
//! `Engine` ties the phases to the collaborator traits. A full build computes
//! options for every option-limited field recorded in the request context; a
//! partial update routes the triggering element first and recomputes a single
//! field.
//!
//! Failures are isolated per field: a store failure for one field is returned
//! in that field's slot and reported as an error message, while the other
//! fields are still computed.

use log::{debug, error};

use super::extract::Provenance;
use super::options::WidgetShape;
use super::{phase1, phase2, phase3, phase4, phase5, LimitedField, OptionList};
use crate::context::{MessageLevel, RequestContext};
use crate::error::Result;
use crate::form::{ElementPath, FormNode, Submission};
use crate::reference::ReferenceRegistry;
use crate::schema::{Entity, FieldInstance};
use crate::store::{EntityStore, ItemExtractor, MetadataProvider};

/// Options computed for one field.
#[derive(Debug)]
pub struct FieldOptions {
    pub field: String,
    pub result: Result<OptionList>,
}

/// Result of a full form build.
#[derive(Debug, Default)]
pub struct FormBuild {
    /// One slot per option-limited field, in form order.
    pub fields: Vec<FieldOptions>,
}

impl FormBuild {
    pub fn get(&self, field: &str) -> Option<&Result<OptionList>> {
        self.fields.iter().find(|f| f.field == field).map(|f| &f.result)
    }
}

/// Result of a routed partial update.
#[derive(Debug)]
pub struct PartialUpdate {
    /// The recomputed option-limited field.
    pub field: String,
    /// Where the field's container sits in the form, if present.
    pub path: Option<ElementPath>,
    pub result: Result<OptionList>,
}

/// The option limiting engine over a set of collaborators.
pub struct Engine<'a> {
    metadata: &'a dyn MetadataProvider,
    store: &'a dyn EntityStore,
    extractor: &'a dyn ItemExtractor,
    registry: &'a ReferenceRegistry,
}

impl<'a> Engine<'a> {
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        store: &'a dyn EntityStore,
        extractor: &'a dyn ItemExtractor,
        registry: &'a ReferenceRegistry,
    ) -> Self {
        Self {
            metadata,
            store,
            extractor,
            registry,
        }
    }

    pub fn metadata(&self) -> &'a dyn MetadataProvider {
        self.metadata
    }

    pub fn registry(&self) -> &'a ReferenceRegistry {
        self.registry
    }

    /// Run Phases 1-2 for an instance and reconcile its settings.
    ///
    /// Returns `None` for instances that are not reference fields.
    pub fn limited_field(&self, instance: &FieldInstance) -> Option<LimitedField> {
        let definition = self
            .metadata
            .field_definition(&instance.entity_kind, &instance.field)?;
        self.registry.handler_for(&definition.field_type)?;

        let target = phase1::execute(definition, self.metadata, self.registry);
        let candidates = phase2::names(&phase2::execute(
            self.metadata,
            &instance.entity_kind,
            &instance.bundle,
            &instance.field,
            &target,
        ));
        let settings = instance.option_limit.effective(&instance.field, &candidates);

        Some(LimitedField {
            instance: instance.clone(),
            definition: definition.clone(),
            target,
            candidates,
            settings,
        })
    }

    /// Every enabled option-limited field of a bundle, in form order.
    pub fn limited_fields(&self, entity_kind: &str, bundle: &str) -> Vec<LimitedField> {
        self.metadata
            .field_instances(entity_kind, bundle)
            .into_iter()
            .filter(|instance| instance.widget.has_options())
            .filter_map(|instance| self.limited_field(instance))
            .filter(|field| field.settings.enabled)
            .collect()
    }

    /// The entity values are read from, with its provenance.
    pub fn working_entity(
        &self,
        entity: &Entity,
        submission: Option<&Submission>,
    ) -> (Entity, Provenance) {
        let provenance = Provenance::of(entity, submission);
        match submission {
            Some(submission) => (
                phase3::materialize(entity, submission, self.metadata, self.extractor),
                provenance,
            ),
            None => (entity.clone(), provenance),
        }
    }

    /// Run Phases 3-5 for one field.
    pub fn compute(
        &self,
        field: &LimitedField,
        entity: &Entity,
        provenance: Provenance,
    ) -> Result<OptionList> {
        let values = phase3::collect(
            entity,
            provenance,
            &field.settings.matching_fields,
            self.metadata,
            self.registry,
        );
        let plan = phase4::build(field, &values, self.registry);
        let candidates = phase4::execute(&plan, self.store)?;
        let shape = WidgetShape::of(&field.instance, &field.definition);
        Ok(phase5::execute(
            field,
            &candidates,
            &shape,
            self.store,
            self.registry,
        ))
    }

    /// Compute options for every field recorded in the context.
    pub fn build_form(&self, ctx: &mut RequestContext, entity: &Entity) -> FormBuild {
        let (working, provenance) = self.working_entity(entity, ctx.submission());
        let fields: Vec<LimitedField> = ctx.intents().to_vec();

        let mut build = FormBuild::default();
        for field in &fields {
            let result = self.compute(field, &working, provenance);
            report(ctx, field, &result);
            build.fields.push(FieldOptions {
                field: field.name().to_string(),
                result,
            });
        }
        build
    }

    /// Route the context's change event and recompute the affected field.
    ///
    /// Returns `None` when the event concerns no option-limited field.
    pub fn partial_update(
        &self,
        ctx: &mut RequestContext,
        entity: &Entity,
        form: &FormNode,
    ) -> Option<PartialUpdate> {
        let state = ctx.router().clone().resolve(form, ctx.intents());
        ctx.set_router(state.clone());

        let name = state.resolved_field()?;
        let field = ctx.intent(name)?.clone();
        debug!("Partial update recomputes {}", name);

        let (working, provenance) = self.working_entity(entity, ctx.submission());
        let result = self.compute(&field, &working, provenance);
        report(ctx, &field, &result);

        Some(PartialUpdate {
            field: field.name().to_string(),
            path: form.find_field(field.name()).map(|(_, path)| path),
            result,
        })
    }
}

/// Turn a field's outcome into status messages.
fn report(ctx: &mut RequestContext, field: &LimitedField, result: &Result<OptionList>) {
    match result {
        Ok(list) => {
            if let Some(advisory) = &list.advisory {
                ctx.add_message(MessageLevel::Warning, advisory.message());
            }
        }
        Err(e) => {
            error!("Option computation failed for {}: {}", field.name(), e);
            ctx.add_message(
                MessageLevel::Error,
                format!("Options for {} could not be loaded", field.instance.label),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{item, EntityId, EntityKindInfo, FieldDefinition, FieldType, Value};
    use crate::settings::OptionLimitSettings;
    use crate::store::{EntityQuery, FieldTypeItemExtractor, MemoryStore};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_kind(EntityKindInfo::new("node", "title", &["news"]));
        store.add_kind(EntityKindInfo::new("taxonomy_term", "name", &["teams", "venues"]));
        store.add_field(FieldDefinition::new("sport", FieldType::Text));
        store.add_field(FieldDefinition::new(
            "team",
            FieldType::TaxonomyTermReference {
                vocabulary: "teams".to_string(),
            },
        ));
        store.add_field(FieldDefinition::new(
            "venue",
            FieldType::TaxonomyTermReference {
                vocabulary: "venues".to_string(),
            },
        ));
        store.add_instance(FieldInstance::new("node", "news", "sport", "Sport"));
        store.add_instance(
            FieldInstance::new("node", "news", "team", "Team")
                .with_option_limit(OptionLimitSettings::matching(&["sport"])),
        );
        store.add_instance(
            FieldInstance::new("node", "news", "venue", "Venue")
                .with_option_limit(OptionLimitSettings::matching(&["sport"])),
        );
        store.add_instance(FieldInstance::new("taxonomy_term", "teams", "sport", "Sport"));
        store.add_instance(FieldInstance::new("taxonomy_term", "venues", "sport", "Sport"));
        for (id, bundle, name, sport) in [
            (1, "teams", "Chudley Cannons", "Quidditch"),
            (2, "teams", "Real Madrid", "Football"),
            (3, "venues", "Bernabeu", "Football"),
        ] {
            store
                .add_entity(
                    Entity::new("taxonomy_term", bundle)
                        .with_id(id)
                        .with_property("name", name)
                        .with_items("sport", vec![item("value", sport)]),
                )
                .unwrap();
        }
        store
    }

    /// Store whose queries on one kind always fail
    struct FailingStore<'a> {
        inner: &'a MemoryStore,
        failing_bundle: &'a str,
    }

    impl EntityStore for FailingStore<'_> {
        fn query(&self, query: &EntityQuery) -> Result<Vec<EntityId>> {
            if query.bundles.iter().any(|b| b == self.failing_bundle) {
                return Err(Error::StoreFailure {
                    entity_kind: query.entity_kind.clone(),
                    message: "simulated outage".to_string(),
                });
            }
            self.inner.query(query)
        }

        fn load(&self, entity_kind: &str, ids: &[EntityId]) -> Result<Vec<Entity>> {
            self.inner.load(entity_kind, ids)
        }

        fn label_of(&self, entity_kind: &str, entity: &Entity) -> String {
            self.inner.label_of(entity_kind, entity)
        }
    }

    fn prepared(engine: &Engine<'_>, ctx: &mut RequestContext) {
        for field in engine.limited_fields("node", "news") {
            ctx.record_intent(field);
        }
    }

    #[test]
    fn test_build_form_computes_every_recorded_field() {
        let store = store();
        let registry = ReferenceRegistry::default();
        let engine = Engine::new(&store, &store, &FieldTypeItemExtractor, &registry);
        let mut ctx = RequestContext::new();
        prepared(&engine, &mut ctx);

        let story = Entity::new("node", "news")
            .with_id(10)
            .with_items("sport", vec![item("value", "Football")]);
        let build = engine.build_form(&mut ctx, &story);
        assert_eq!(build.fields.len(), 2);
        let team = build.get("team").unwrap().as_ref().unwrap();
        assert_eq!(team.labels(), vec!["Real Madrid"]);
        let venue = build.get("venue").unwrap().as_ref().unwrap();
        assert_eq!(venue.labels(), vec!["Bernabeu"]);
    }

    #[test]
    fn test_store_failure_is_isolated_per_field() {
        let store = store();
        let failing = FailingStore {
            inner: &store,
            failing_bundle: "teams",
        };
        let registry = ReferenceRegistry::default();
        let engine = Engine::new(&store, &failing, &FieldTypeItemExtractor, &registry);
        let mut ctx = RequestContext::new();
        prepared(&engine, &mut ctx);

        let story = Entity::new("node", "news")
            .with_id(10)
            .with_items("sport", vec![item("value", "Football")]);
        let build = engine.build_form(&mut ctx, &story);
        assert!(matches!(
            build.get("team"),
            Some(Err(Error::StoreFailure { .. }))
        ));
        assert!(build.get("venue").unwrap().is_ok());
        assert!(ctx
            .messages()
            .iter()
            .any(|m| m.level == MessageLevel::Error && m.text.contains("Team")));
    }

    #[test]
    fn test_partial_update_uses_live_values_and_first_match() {
        let store = store();
        let registry = ReferenceRegistry::default();
        let engine = Engine::new(&store, &store, &FieldTypeItemExtractor, &registry);
        let form = FormNode::for_instances(
            store
                .field_instances("node", "news")
                .into_iter()
                .map(|i| (i, "value")),
        );
        let submission = Submission::new()
            .with_values("sport", vec![Value::from("Quidditch")])
            .triggered_by(ElementPath::new(&["sport", "und", "0", "value"]));
        let mut ctx = RequestContext::with_submission(submission);
        prepared(&engine, &mut ctx);

        let story = Entity::new("node", "news")
            .with_id(10)
            .with_items("sport", vec![item("value", "Football")]);
        let update = engine.partial_update(&mut ctx, &story, &form).unwrap();
        assert_eq!(update.field, "team");
        assert_eq!(update.path, Some(ElementPath::new(&["team"])));
        assert_eq!(
            update.result.unwrap().labels(),
            vec!["Chudley Cannons"]
        );
    }

    #[test]
    fn test_limited_fields_skip_disabled_and_non_reference() {
        let mut store = store();
        if let Some(venue) = store.instance_mut("node", "news", "venue") {
            venue.option_limit.enabled = false;
        }
        let registry = ReferenceRegistry::default();
        let engine = Engine::new(&store, &store, &FieldTypeItemExtractor, &registry);
        let names: Vec<_> = engine
            .limited_fields("node", "news")
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["team".to_string()]);
        let sport = store.field_instance("node", "news", "sport").unwrap();
        assert!(engine.limited_field(sport).is_none());
    }
}
