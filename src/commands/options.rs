//! # Options Command Implementation
//!
//! This module implements the `options` subcommand, which runs the full
//! pipeline for one option-limited field and prints the resulting option list.
//!
//! ## Functionality
//!
//! - **Persisted entities**: `--entity ID` reads match values from the stored
//!   entity.
//! - **Fresh forms**: without `--entity`, match values come from the field
//!   instances' default values.
//! - **Live submissions**: each `--set field=value` simulates a value the user
//!   has entered but not saved. Submitted values take precedence.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::{load_entity, load_site, submission_from, Format};
use option_limit::config::Site;
use option_limit::context::{RequestContext, StatusMessage};
use option_limit::error::Error;
use option_limit::form::Submission;
use option_limit::hooks::{self, FormAssembly};
use option_limit::output::{emoji, render_messages, render_options, OutputConfig};
use option_limit::phases::orchestrator::Engine;
use option_limit::phases::OptionList;
use option_limit::reference::ReferenceRegistry;
use option_limit::schema::{Entity, EntityId};
use option_limit::store::{FieldTypeItemExtractor, MetadataProvider};

/// Compute the options of one option-limited field
#[derive(Args, Debug)]
pub struct OptionsArgs {
    /// Path to the site definition file.
    #[arg(short, long, value_name = "FILE", default_value = "site.yaml")]
    pub site: PathBuf,

    /// Entity kind owning the form.
    #[arg(long, value_name = "KIND", default_value = "node")]
    pub entity_kind: String,

    /// Bundle owning the form.
    #[arg(long, value_name = "BUNDLE")]
    pub bundle: String,

    /// Identifier of a stored entity to edit. Omit for a fresh form.
    #[arg(long, value_name = "ID")]
    pub entity: Option<EntityId>,

    /// The option-limited field.
    #[arg(long, value_name = "FIELD")]
    pub field: String,

    /// Simulated live value, as `field=value`. May be repeated.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Options computed for one field, with the messages the request produced.
#[derive(Debug)]
pub struct FieldReport {
    pub field: String,
    pub label: String,
    pub options: OptionList,
    pub messages: Vec<StatusMessage>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    field: &'a str,
    label: &'a str,
    options: &'a OptionList,
    messages: Vec<&'a str>,
}

/// Execute the `options` command.
pub fn execute(args: OptionsArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let site = load_site(&args.site)?;
    let entity = load_entity(&site, &args.entity_kind, &args.bundle, args.entity)?;
    let submission = submission_from(&args.set)?;

    let report = compute(&site, &entity, submission, &args.field)?;

    match args.format {
        Format::Json => {
            let json = JsonReport {
                field: &report.field,
                label: &report.label,
                options: &report.options,
                messages: report.messages.iter().map(|m| m.text.as_str()).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Format::Text => {
            println!(
                "{} Options for {} ({}):",
                emoji(&out, "📋", "[OPTIONS]"),
                report.label,
                report.field
            );
            print!("{}", render_options(&report.options));
            print!("{}", render_messages(&out, &report.messages));
        }
    }
    Ok(())
}

/// Run a full form build restricted to `field`.
pub fn compute(
    site: &Site,
    entity: &Entity,
    submission: Option<Submission>,
    field: &str,
) -> Result<FieldReport> {
    let instance = site
        .store
        .field_instance(&entity.kind, &entity.bundle, field)
        .ok_or_else(|| Error::UnknownField {
            entity_kind: entity.kind.clone(),
            bundle: entity.bundle.clone(),
            field: field.to_string(),
        })?;

    let registry = ReferenceRegistry::default();
    let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);

    match engine.limited_field(instance) {
        None => anyhow::bail!("Field '{}' is not a reference field", field),
        Some(_) if !instance.widget.has_options() => {
            anyhow::bail!("Field '{}' uses a widget without an option list", field)
        }
        Some(_) if !instance.option_limit.enabled => {
            anyhow::bail!("Option limiting is not enabled for field '{}'", field)
        }
        Some(limited) if !limited.settings.enabled => {
            return Err(Error::ConfigurationUnavailable {
                entity_kind: entity.kind.clone(),
                bundle: entity.bundle.clone(),
                field: field.to_string(),
            }
            .into())
        }
        Some(_) => {}
    }

    let mut ctx = match submission {
        Some(submission) => RequestContext::with_submission(submission),
        None => RequestContext::new(),
    };
    hooks::widget_build(&engine, &mut ctx, instance);

    let form = site.form_for(&entity.kind, &entity.bundle);
    let FormAssembly::Full(build) = hooks::entity_form_assembly(&engine, &mut ctx, entity, &form)
    else {
        anyhow::bail!("Unexpected partial update while building {}", field);
    };
    let slot = build
        .fields
        .into_iter()
        .find(|f| f.field == field)
        .ok_or_else(|| anyhow::anyhow!("No options were computed for field '{}'", field))?;

    Ok(FieldReport {
        field: field.to_string(),
        label: instance.label.clone(),
        options: slot.result?,
        messages: ctx.take_messages(),
    })
}
