//! # Check Command Implementation
//!
//! This module implements the `check` subcommand, which validates a site file
//! and reviews every reference field instance in it.
//!
//! ## Functionality
//!
//! - **Site validation**: the file must parse and its cross references must
//!   hold.
//! - **Target resolution**: reports the kind and bundles each reference field
//!   points at.
//! - **Matching fields**: lists the candidates and flags stored names that no
//!   longer exist on both sides.
//! - **Forced disables**: flags fields configured as enabled whose filtering
//!   is switched off because no common fields exist.
//! - **Dry run**: computes options for a fresh form of every bundle with
//!   option-limited fields. A failure there is an error.
//!
//! Problems with the configuration are warnings and only fail the command
//! with `--strict`. This command does not modify any files.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::load_site;
use option_limit::config::Site;
use option_limit::context::RequestContext;
use option_limit::error::Error;
use option_limit::hooks;
use option_limit::output::{emoji, OutputConfig};
use option_limit::phases::orchestrator::Engine;
use option_limit::phases::phase1;
use option_limit::reference::ReferenceRegistry;
use option_limit::schema::Entity;
use option_limit::store::FieldTypeItemExtractor;

/// Check every option-limited field of a site
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the site definition file to check.
    #[arg(short, long, value_name = "FILE", default_value = "site.yaml")]
    pub site: PathBuf,

    /// Use strict checking (fail on warnings).
    #[arg(long)]
    pub strict: bool,
}

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One observation about a field instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// `kind.bundle.field`
    pub subject: String,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, subject: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.to_string(),
            message: message.into(),
        }
    }
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Checking site: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.site.display()
    );

    let site = match load_site(&args.site) {
        Ok(site) => {
            println!("{} Site loaded successfully", emoji(&out, "✅", "[OK]"));
            site
        }
        Err(e) => {
            println!("{} Site loading failed: {:#}", emoji(&out, "❌", "[ERR]"), e);
            return Err(e);
        }
    };

    let findings = inspect(&site);
    for finding in &findings {
        let marker = match finding.severity {
            Severity::Info => emoji(&out, "ℹ️", "[INFO]"),
            Severity::Warning => emoji(&out, "⚠️", "[WARN]"),
            Severity::Error => emoji(&out, "❌", "[ERR]"),
        };
        println!("{} {}: {}", marker, finding.subject, finding.message);
    }

    let errors = count(&findings, Severity::Error);
    let warnings = count(&findings, Severity::Warning);
    println!(
        "\n{} Summary: {} errors, {} warnings",
        emoji(&out, "📊", "[INFO]"),
        errors,
        warnings
    );

    if errors > 0 {
        anyhow::bail!("Check failed with {} errors", errors);
    }
    if args.strict && warnings > 0 {
        anyhow::bail!("Check failed: {} warnings in strict mode", warnings);
    }
    println!("{} Site check passed", emoji(&out, "✅", "[OK]"));
    Ok(())
}

fn count(findings: &[Finding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}

/// Review every reference field instance of a loaded site.
pub fn inspect(site: &Site) -> Vec<Finding> {
    let registry = ReferenceRegistry::default();
    let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);
    let mut findings = Vec::new();

    for instance in site.store.instances() {
        let Some(field) = engine.limited_field(instance) else {
            continue;
        };
        let subject = format!("{}.{}.{}", instance.entity_kind, instance.bundle, instance.field);
        let configured = instance.option_limit.enabled;

        match phase1::unresolved_reason(&field.definition, &field.target) {
            Some(reason) if configured => {
                findings.push(Finding::new(Severity::Warning, &subject, reason.to_string()))
            }
            Some(_) => {}
            None => findings.push(Finding::new(
                Severity::Info,
                &subject,
                format!(
                    "targets {} [{}], candidates: {}",
                    field.target.entity_kind,
                    field.target.bundles.join(", "),
                    if field.candidates.is_empty() {
                        "none".to_string()
                    } else {
                        field.candidates.join(", ")
                    }
                ),
            )),
        }

        if !configured {
            continue;
        }
        if field.target.is_resolved() && field.candidates.is_empty() {
            let unavailable = Error::ConfigurationUnavailable {
                entity_kind: instance.entity_kind.clone(),
                bundle: instance.bundle.clone(),
                field: instance.field.clone(),
            };
            findings.push(Finding::new(
                Severity::Warning,
                &subject,
                format!("{}; filtering is forced off", unavailable),
            ));
        }
        if !field.candidates.is_empty() {
            if let Some(drift) = field.settings.drift(&instance.field) {
                findings.push(Finding::new(Severity::Warning, &subject, drift.to_string()));
            }
        }
        if !instance.widget.has_options() {
            findings.push(Finding::new(
                Severity::Warning,
                &subject,
                "widget has no option list, so options are never limited",
            ));
        }
        if field.settings.enabled && field.settings.matching_fields.is_empty() {
            findings.push(Finding::new(
                Severity::Warning,
                &subject,
                "enabled without matching fields, so options are never limited",
            ));
        }
    }

    findings.extend(dry_run(site, &engine));
    findings
}

/// Compute options for a fresh form of every bundle that has limited fields.
fn dry_run(site: &Site, engine: &Engine<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for kind in site.store.kinds() {
        for bundle in &kind.bundles {
            let entity = Entity::new(&kind.name, bundle);
            let mut ctx = RequestContext::new();
            hooks::prepare_form(engine, &mut ctx, &entity);
            if ctx.intents().is_empty() {
                continue;
            }
            for slot in engine.build_form(&mut ctx, &entity).fields {
                if let Err(e) = slot.result {
                    let subject = format!("{}.{}.{}", kind.name, bundle, slot.field);
                    findings.push(Finding::new(Severity::Error, &subject, e.to_string()));
                }
            }
        }
    }
    findings
}
