//! Benchmarks for the option limiting pipeline.
//!
//! These benchmarks measure site parsing, a full form build and a routed
//! partial update against `MemoryStore` sites of growing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use option_limit::config::{self, Site};
use option_limit::context::RequestContext;
use option_limit::form::{ElementPath, Submission};
use option_limit::hooks;
use option_limit::phases::orchestrator::Engine;
use option_limit::reference::ReferenceRegistry;
use option_limit::schema::{Entity, Value};
use option_limit::store::FieldTypeItemExtractor;

const SPORTS: [&str; 5] = ["Quidditch", "Football", "Hockey", "Curling", "Rugby"];

/// A site with `terms` teams spread over five sports, and a story bundle
/// whose team options follow its sport.
fn generate_site(terms: usize) -> String {
    let mut yaml = String::from(
        r#"
entity_kinds:
  - { name: node, label_property: title, bundles: [news] }
  - { name: taxonomy_term, label_property: name, bundles: [teams] }
fields:
  - { name: sport, type: text }
  - { name: country, type: text }
  - { name: team, type: taxonomy_term_reference, vocabulary: teams }
instances:
  - { entity_kind: node, bundle: news, field: sport, label: Sport, widget: text_field }
  - { entity_kind: node, bundle: news, field: country, label: Country, widget: text_field }
  - entity_kind: node
    bundle: news
    field: team
    label: Team
    option_limit: { enabled: true, matching_fields: [sport, country] }
  - { entity_kind: taxonomy_term, bundle: teams, field: sport, label: Sport }
  - { entity_kind: taxonomy_term, bundle: teams, field: country, label: Country }
entities:
"#,
    );
    for id in 1..=terms {
        yaml.push_str(&format!(
            "  - kind: taxonomy_term\n    bundle: teams\n    id: {}\n    properties: {{ name: Team {}, weight: {} }}\n    fields: {{ sport: [{{ value: {} }}], country: [{{ value: C{} }}] }}\n",
            id,
            id,
            id % 7,
            SPORTS[id % SPORTS.len()],
            id % 3
        ));
    }
    yaml
}

fn bench_site_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("site_parsing");
    for terms in [10, 100, 1000] {
        let yaml = generate_site(terms);
        group.bench_with_input(BenchmarkId::new("terms", terms), &yaml, |b, yaml| {
            b.iter(|| config::parse(black_box(yaml)))
        });
    }
    group.finish();
}

fn full_build(site: &Site, story: &Entity) {
    let registry = ReferenceRegistry::default();
    let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);
    let mut ctx = RequestContext::new();
    hooks::prepare_form(&engine, &mut ctx, story);
    let form = site.form_for(&story.kind, &story.bundle);
    black_box(hooks::entity_form_assembly(&engine, &mut ctx, story, &form));
}

fn partial_update(site: &Site, story: &Entity) {
    let registry = ReferenceRegistry::default();
    let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);
    let submission = Submission::new()
        .with_values("sport", vec![Value::from("Hockey")])
        .with_values("country", vec![Value::from("C1")])
        .triggered_by(ElementPath::new(&["sport", "und", "0", "value"]));
    let mut ctx = RequestContext::with_submission(submission);
    hooks::prepare_form(&engine, &mut ctx, story);
    let form = site.form_for(&story.kind, &story.bundle);
    black_box(hooks::entity_form_assembly(&engine, &mut ctx, story, &form));
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let story = Entity::new("node", "news")
        .with_id(1)
        .with_items("sport", vec![option_limit::schema::item("value", "Football")]);

    for terms in [10, 100, 1000] {
        let site = config::parse(&generate_site(terms)).expect("generated site is valid");
        group.bench_with_input(BenchmarkId::new("full_build", terms), &site, |b, site| {
            b.iter(|| full_build(site, black_box(&story)))
        });
        group.bench_with_input(BenchmarkId::new("partial_update", terms), &site, |b, site| {
            b.iter(|| partial_update(site, black_box(&story)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_site_parsing, bench_pipeline);
criterion_main!(benches);
