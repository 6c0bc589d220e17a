//! # Route Command Implementation
//!
//! This module implements the `route` subcommand, which simulates a partial
//! update: an element of the entity form changed, and the router decides which
//! option-limited field, if any, must be rebuilt.
//!
//! The element is given as a slash-separated path into the bundle's form tree,
//! such as `sport/und/0/value`. When the change concerns no option-limited
//! field the command reports that and succeeds; ignoring such events is the
//! normal outcome for most elements.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::{load_entity, load_site, submission_from, Format};
use option_limit::config::Site;
use option_limit::context::RequestContext;
use option_limit::form::{ElementPath, Submission};
use option_limit::hooks::{self, FormAssembly, PartialUpdateResponse};
use option_limit::output::{emoji, render_messages, render_options, OutputConfig};
use option_limit::phases::orchestrator::Engine;
use option_limit::phases::OptionList;
use option_limit::reference::ReferenceRegistry;
use option_limit::schema::{Entity, EntityId};
use option_limit::store::FieldTypeItemExtractor;

/// Route a changed form element to the field whose options depend on it
#[derive(Args, Debug)]
pub struct RouteArgs {
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

    /// Path of the changed element, e.g. `sport/und/0/value`.
    #[arg(long, value_name = "PATH")]
    pub path: String,

    /// Live value, as `field=value`. May be repeated.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Serialize)]
struct JsonRoute<'a> {
    path: String,
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a OptionList>,
    messages: Vec<&'a str>,
}

/// Execute the `route` command.
pub fn execute(args: RouteArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let site = load_site(&args.site)?;
    let entity = load_entity(&site, &args.entity_kind, &args.bundle, args.entity)?;
    let path: ElementPath = args.path.parse()?;
    let submission = submission_from(&args.set)?.unwrap_or_default();

    let response = route(&site, &entity, submission, path.clone())?;

    match args.format {
        Format::Json => {
            let options = match &response {
                Some(r) => Some(r.options.as_ref().map_err(|e| anyhow::anyhow!("{}", e))?),
                None => None,
            };
            let json = JsonRoute {
                path: path.to_string(),
                field: response.as_ref().map(|r| r.field.as_str()),
                options,
                messages: response
                    .iter()
                    .flat_map(|r| r.messages.iter().map(|m| m.text.as_str()))
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Format::Text => match response {
            Some(response) => {
                println!(
                    "{} {} rebuilds {} at {}",
                    emoji(&out, "🔀", "[ROUTE]"),
                    path,
                    response.field,
                    response.path
                );
                let options = response
                    .options
                    .map_err(|e| anyhow::anyhow!("Options for {} failed: {}", response.field, e))?;
                print!("{}", render_options(&options));
                print!("{}", render_messages(&out, &response.messages));
            }
            None => {
                println!(
                    "{} No option-limited field depends on {}",
                    emoji(&out, "💤", "[IGNORED]"),
                    path
                );
            }
        },
    }
    Ok(())
}

/// Run the partial-update flow for a change at `path`.
///
/// Returns `None` when the router ignores the event.
pub fn route(
    site: &Site,
    entity: &Entity,
    submission: Submission,
    path: ElementPath,
) -> Result<Option<PartialUpdateResponse>> {
    let registry = ReferenceRegistry::default();
    let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);

    let mut ctx = RequestContext::with_submission(submission.triggered_by(path));
    hooks::prepare_form(&engine, &mut ctx, entity);

    let form = site.form_for(&entity.kind, &entity.bundle);
    match hooks::entity_form_assembly(&engine, &mut ctx, entity, &form) {
        FormAssembly::Partial(Some(update)) => {
            Ok(Some(hooks::partial_update_response(&mut ctx, update)))
        }
        FormAssembly::Partial(None) => Ok(None),
        FormAssembly::Full(_) => anyhow::bail!("Change event was not treated as a partial update"),
    }
}
