//! # Option Limit Library
//!
//! This library restricts the selectable options of a reference field on an
//! entity edit form to the referenceable entities whose values agree with the
//! current values of selected "matching fields" on the entity being edited.
//! It is used by the `option-limit` command-line tool, and can be driven by any
//! host that implements the collaborator traits in [`store`].
//!
//! ## Quick Example
//!
//! ```
//! use option_limit::config;
//! use option_limit::context::RequestContext;
//! use option_limit::hooks::{entity_form_assembly, prepare_form, FormAssembly};
//! use option_limit::phases::orchestrator::Engine;
//! use option_limit::reference::ReferenceRegistry;
//! use option_limit::schema::{item, Entity};
//! use option_limit::store::FieldTypeItemExtractor;
//!
//! let site = config::parse(r#"
//! entity_kinds:
//!   - name: node
//!     label_property: title
//!     bundles: [news]
//!   - name: taxonomy_term
//!     label_property: name
//!     bundles: [teams]
//! fields:
//!   - name: sport
//!     type: text
//!   - name: team
//!     type: taxonomy_term_reference
//!     vocabulary: teams
//! instances:
//!   - { entity_kind: node, bundle: news, field: sport, label: Sport, widget: text_field }
//!   - entity_kind: node
//!     bundle: news
//!     field: team
//!     label: Team
//!     option_limit: { enabled: true, matching_fields: [sport] }
//!   - { entity_kind: taxonomy_term, bundle: teams, field: sport, label: Sport }
//! entities:
//!   - kind: taxonomy_term
//!     bundle: teams
//!     id: 1
//!     properties: { name: Chudley Cannons }
//!     fields: { sport: [{ value: Quidditch }] }
//!   - kind: taxonomy_term
//!     bundle: teams
//!     id: 2
//!     properties: { name: Real Madrid }
//!     fields: { sport: [{ value: Football }] }
//! "#).unwrap();
//!
//! let registry = ReferenceRegistry::default();
//! let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);
//! let story = Entity::new("node", "news")
//!     .with_id(7)
//!     .with_items("sport", vec![item("value", "Football")]);
//!
//! let mut ctx = RequestContext::new();
//! prepare_form(&engine, &mut ctx, &story);
//! let form = site.form_for("node", "news");
//! let FormAssembly::Full(build) = entity_form_assembly(&engine, &mut ctx, &story, &form) else {
//!     unreachable!()
//! };
//! let team = build.get("team").unwrap().as_ref().unwrap();
//! assert_eq!(team.labels(), vec!["Real Madrid"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Schema (`schema`)**: entity kinds, bundles, field definitions and field
//!   instances, and the entities themselves.
//! - **Settings (`settings`)**: the per-instance `option_limit` configuration
//!   and its reconciliation against the fields that actually exist.
//! - **Collaborators (`store`)**: traits for metadata, entity queries and
//!   widget value extraction, with the in-memory `MemoryStore`.
//! - **Reference types (`reference`)**: pluggable handlers that resolve a
//!   reference field's target and label its options.
//! - **Phases (`phases`)**: the pipeline that turns an entity and its live
//!   values into an option list.
//! - **Hooks (`hooks`)**: the framework entry points, tied together by a
//!   per-request [`context::RequestContext`].
//!
//! ## Execution Flow
//!
//! 1.  **Target resolution**: find the kind and bundles a field references.
//! 2.  **Matching field discovery**: fields on the owner bundle that also
//!     exist on a target bundle.
//! 3.  **Value extraction**: current values of the matching fields, from live
//!     form input, stored values or defaults.
//! 4.  **Query planning**: conditions, ordering and tags for the candidate
//!     query.
//! 5.  **Option list construction**: labels, grouping and the "none" entry.
//!
//! Partial updates route the changed element to the field that depends on it
//! and rerun Phases 3-5 for that field only.

pub mod config;
pub mod context;
pub mod error;
pub mod form;
pub mod hooks;
pub mod output;
pub mod phases;
pub mod reference;
pub mod schema;
pub mod settings;
pub mod store;

#[cfg(test)]
mod phases_proptest;
