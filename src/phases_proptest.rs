//! Property-based tests for the option limiting pipeline.
//!
//! These tests generate random schemas and stores and check that the
//! pipeline's guarantees hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::phases::extract::MatchValues;
    use crate::phases::orchestrator::Engine;
    use crate::phases::{phase1, phase2, phase4};
    use crate::reference::ReferenceRegistry;
    use crate::schema::{
        item, Entity, EntityKindInfo, FieldDefinition, FieldInstance, FieldType, SortSettings,
        Value,
    };
    use crate::settings::OptionLimitSettings;
    use crate::store::{FieldTypeItemExtractor, MemoryStore, MetadataProvider};
    use proptest::prelude::*;

    const FIELDS: [&str; 6] = ["f0", "f1", "f2", "f3", "f4", "f5"];
    const BUNDLES: [&str; 3] = ["b0", "b1", "b2"];
    const SPORTS: [&str; 4] = ["Quidditch", "Football", "Hockey", "Curling"];

    /// A site whose `team` field references the first `referenced` term
    /// bundles. Bit `i` of a mask attaches `FIELDS[i]`.
    fn masked_site(owner_mask: u8, target_masks: &[u8; 3], referenced: usize) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_kind(EntityKindInfo::new("node", "title", &["news"]));
        store.add_kind(EntityKindInfo::new("taxonomy_term", "name", &BUNDLES));
        for name in FIELDS {
            store.add_field(FieldDefinition::new(name, FieldType::Text));
        }
        store.add_field(FieldDefinition::new(
            "team",
            FieldType::EntityReference {
                target_type: "taxonomy_term".to_string(),
                target_bundles: BUNDLES[..referenced].iter().map(|b| b.to_string()).collect(),
                sort: SortSettings::None,
            },
        ));
        store.add_instance(
            FieldInstance::new("node", "news", "team", "Team")
                .with_option_limit(OptionLimitSettings::matching(&["f0"])),
        );
        for (i, name) in FIELDS.iter().enumerate() {
            if owner_mask & (1u8 << i) != 0 {
                store.add_instance(FieldInstance::new("node", "news", name, name));
            }
            for (bundle, mask) in BUNDLES.iter().zip(target_masks) {
                if *mask & (1u8 << i) != 0 {
                    store.add_instance(FieldInstance::new("taxonomy_term", bundle, name, name));
                }
            }
        }
        store
    }

    /// A teams vocabulary with one term per `(sport, weight)` pair.
    fn sports_site(terms: &[(usize, i64)], hides_all: bool) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_kind(EntityKindInfo::new("node", "title", &["news"]));
        store.add_kind(EntityKindInfo::new("taxonomy_term", "name", &["teams"]));
        store.add_field(FieldDefinition::new("sport", FieldType::Text));
        store.add_field(FieldDefinition::new(
            "team",
            FieldType::TaxonomyTermReference {
                vocabulary: "teams".to_string(),
            },
        ));
        let mut settings = OptionLimitSettings::matching(&["sport"]);
        settings.empty_behavior_hides_all = hides_all;
        store.add_instance(FieldInstance::new("node", "news", "sport", "Sport"));
        store.add_instance(FieldInstance::new("node", "news", "team", "Team").with_option_limit(settings));
        store.add_instance(FieldInstance::new("taxonomy_term", "teams", "sport", "Sport"));
        for (id, (sport, weight)) in terms.iter().enumerate() {
            store
                .add_entity(
                    Entity::new("taxonomy_term", "teams")
                        .with_id(id as u64 + 1)
                        .with_property("name", format!("Team {}", id + 1).as_str())
                        .with_property("weight", *weight)
                        .with_items("sport", vec![item("value", SPORTS[*sport])]),
                )
                .unwrap();
        }
        store
    }

    fn story(sports: &[usize]) -> Entity {
        Entity::new("node", "news").with_id(100).with_items(
            "sport",
            sports.iter().map(|s| item("value", SPORTS[*s])).collect(),
        )
    }

    // ============================================================================
    // Target resolution
    // ============================================================================

    proptest! {
        /// Property: resolution yields a full (kind, bundles) pair or no bundles
        #[test]
        fn resolution_is_total(
            target_type in prop::sample::select(vec!["taxonomy_term", "node", "user", "missing"]),
            explicit in prop::collection::vec("[a-z]{1,6}", 0..3),
            vocabulary in "[a-z]{1,8}",
            use_term_type in any::<bool>(),
        ) {
            let mut store = MemoryStore::new();
            store.add_kind(EntityKindInfo::new("taxonomy_term", "name", &BUNDLES));
            store.add_kind(EntityKindInfo::new("node", "title", &["page"]));
            store.add_kind(EntityKindInfo::new("user", "name", &["user"]).not_fieldable());
            let field_type = if use_term_type {
                FieldType::TaxonomyTermReference { vocabulary }
            } else {
                FieldType::EntityReference {
                    target_type: target_type.to_string(),
                    target_bundles: explicit,
                    sort: SortSettings::None,
                }
            };
            let definition = FieldDefinition::new("related", field_type);
            let target = phase1::execute(&definition, &store, &ReferenceRegistry::default());
            prop_assert!(
                target.bundles.is_empty() || !target.entity_kind.is_empty(),
                "bundles without a kind: {:?}",
                target
            );
            prop_assert!(target.bundles.iter().all(|b| !b.is_empty()));
        }
    }

    // ============================================================================
    // Matching field discovery
    // ============================================================================

    proptest! {
        /// Property: every candidate exists on the owner and on a target bundle
        #[test]
        fn discovered_fields_exist_on_both_sides(
            owner_mask in 0u8..64,
            target_masks in any::<[u8; 3]>(),
            referenced in 0usize..=3,
        ) {
            let store = masked_site(owner_mask, &target_masks, referenced);
            let definition = store.field_definition("node", "team").unwrap();
            let target = phase1::execute(definition, &store, &ReferenceRegistry::default());
            let found = phase2::execute(&store, "node", "news", "team", &target);
            for candidate in &found {
                prop_assert!(candidate.name != "team");
                prop_assert!(store.field_instance("node", "news", &candidate.name).is_some());
                prop_assert!(target
                    .bundles
                    .iter()
                    .any(|b| store.field_instance("taxonomy_term", b, &candidate.name).is_some()));
            }
        }

        /// Property: no candidates means filtering is off, whatever was stored
        #[test]
        fn no_candidates_forces_disabled(
            owner_mask in 0u8..64,
            target_masks in any::<[u8; 3]>(),
            referenced in 0usize..=3,
        ) {
            let store = masked_site(owner_mask, &target_masks, referenced);
            let registry = ReferenceRegistry::default();
            let engine = Engine::new(&store, &store, &FieldTypeItemExtractor, &registry);
            let team = store.field_instance("node", "news", "team").unwrap();
            prop_assert!(team.option_limit.enabled);
            let field = engine.limited_field(team).unwrap();
            if field.candidates.is_empty() {
                prop_assert!(!field.settings.enabled);
            }
            prop_assert!(field
                .settings
                .matching_fields
                .iter()
                .all(|m| field.candidates.contains(m)));
        }
    }

    // ============================================================================
    // Query planning
    // ============================================================================

    proptest! {
        /// Property: a matcher with several values accepts a target holding any one
        #[test]
        fn match_values_are_ored(
            picks in prop::sample::subsequence(vec![0usize, 1, 2, 3], 2..=3),
            held in 0usize..4,
        ) {
            let store = sports_site(&[], false);
            let registry = ReferenceRegistry::default();
            let engine = Engine::new(&store, &store, &FieldTypeItemExtractor, &registry);
            let team = store.field_instance("node", "news", "team").unwrap();
            let field = engine.limited_field(team).unwrap();
            let values: Vec<Value> = picks.iter().map(|p| Value::from(SPORTS[*p])).collect();
            let plan = phase4::build(
                &field,
                &[MatchValues {
                    field: "sport".to_string(),
                    column: "value".to_string(),
                    values,
                }],
                &registry,
            );
            prop_assert_eq!(plan.query.conditions.len(), 1);
            let term = Entity::new("taxonomy_term", "teams")
                .with_id(1)
                .with_items("sport", vec![item("value", SPORTS[held])]);
            prop_assert_eq!(plan.query.matches(&term), picks.contains(&held));
        }
    }

    // ============================================================================
    // Whole pipeline
    // ============================================================================

    proptest! {
        /// Property: identical state yields identical option lists
        #[test]
        fn pipeline_is_idempotent(
            terms in prop::collection::vec((0usize..4, -3i64..3), 0..12),
            selected in prop::collection::vec(0usize..4, 0..3),
            hides_all in any::<bool>(),
        ) {
            let store = sports_site(&terms, hides_all);
            let registry = ReferenceRegistry::default();
            let engine = Engine::new(&store, &store, &FieldTypeItemExtractor, &registry);
            let team = store.field_instance("node", "news", "team").unwrap();
            let field = engine.limited_field(team).unwrap();
            let entity = story(&selected);

            let (working, provenance) = engine.working_entity(&entity, None);
            let first = engine.compute(&field, &working, provenance).unwrap();
            let (working, provenance) = engine.working_entity(&entity, None);
            let second = engine.compute(&field, &working, provenance).unwrap();
            prop_assert_eq!(&first, &second);

            if selected.is_empty() && hides_all {
                prop_assert!(first.is_empty);
            }
            let expected = terms
                .iter()
                .filter(|(sport, _)| selected.is_empty() || selected.contains(sport))
                .count();
            if !(selected.is_empty() && hides_all) {
                prop_assert_eq!(first.labels().len(), expected);
            }
        }
    }
}
