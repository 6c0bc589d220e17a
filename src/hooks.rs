//! # Framework Hooks
//!
//! Entry points the hosting framework calls at fixed moments of a request:
//!
//! - **`settings_form`** / **`apply_settings`**: while an administrator edits
//!   a field instance, contribute the option limiting controls and store what
//!   was submitted.
//! - **`widget_build`**: while each field widget is built, note which fields
//!   are option-limited. No options are computed yet because sibling widgets
//!   do not exist at this point.
//! - **`entity_form_assembly`**: once the whole entity form exists, compute
//!   options for every noted field, or only for the routed field during a
//!   partial update.
//! - **`partial_update_response`**: the fragment and messages returned to the
//!   client after a partial update.

use crate::context::{RequestContext, StatusMessage};
use crate::error::Result;
use crate::form::{ElementPath, FormNode};
use crate::phases::orchestrator::{Engine, FormBuild, PartialUpdate};
use crate::phases::{phase1, phase2, OptionList};
use crate::schema::{Entity, FieldInstance};
use crate::settings::OptionLimitSettings;

/// Explanation shown when no common matching fields exist.
pub const NO_MATCHING_FIELDS_MESSAGE: &str =
    "There are no fields in common between this bundle and the referenced bundles, so options cannot be limited.";

/// Option limiting controls contributed to the field settings form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsContribution {
    /// Current value of the enable control.
    pub enabled: bool,
    /// The enable control cannot be switched on.
    pub enable_disabled: bool,
    /// Checklist choices: field name and `"Label (field_name)"`.
    pub matching_options: Vec<(String, String)>,
    /// Checked choices.
    pub selected: Vec<String>,
    /// The checklist is greyed out.
    pub checklist_disabled: bool,
    /// Explanation shown with a disabled checklist.
    pub message: Option<String>,
    pub empty_behavior_hides_all: bool,
}

/// Build the settings contribution for a field instance.
///
/// Returns `None` for fields that are not of a reference type.
pub fn settings_form(engine: &Engine<'_>, instance: &FieldInstance) -> Option<SettingsContribution> {
    let metadata = engine.metadata();
    let definition = metadata.field_definition(&instance.entity_kind, &instance.field)?;
    engine.registry().handler_for(&definition.field_type)?;

    let target = phase1::execute(definition, metadata, engine.registry());
    let candidates = phase2::execute(
        metadata,
        &instance.entity_kind,
        &instance.bundle,
        &instance.field,
        &target,
    );
    let names = phase2::names(&candidates);
    let effective = instance.option_limit.effective(&instance.field, &names);
    let unavailable = candidates.is_empty();

    Some(SettingsContribution {
        enabled: effective.enabled,
        enable_disabled: unavailable,
        matching_options: candidates
            .into_iter()
            .map(|candidate| (candidate.name, candidate.label))
            .collect(),
        selected: effective.matching_fields,
        checklist_disabled: unavailable,
        message: unavailable.then(|| NO_MATCHING_FIELDS_MESSAGE.to_string()),
        empty_behavior_hides_all: effective.empty_behavior_hides_all,
    })
}

/// Store submitted settings on the instance.
///
/// Names that are not candidates are pruned, and filtering is forced off
/// when no candidates exist. Returns the settings as stored.
pub fn apply_settings(
    engine: &Engine<'_>,
    instance: &mut FieldInstance,
    submitted: OptionLimitSettings,
) -> OptionLimitSettings {
    let names = match settings_form(engine, instance) {
        Some(contribution) => contribution
            .matching_options
            .into_iter()
            .map(|(name, _)| name)
            .collect(),
        None => Vec::new(),
    };
    let effective = submitted.effective(&instance.field, &names);
    instance.option_limit = OptionLimitSettings {
        enabled: effective.enabled,
        matching_fields: effective.matching_fields,
        empty_behavior_hides_all: effective.empty_behavior_hides_all,
    };
    instance.option_limit.clone()
}

/// Note an option-limited field while its widget is built.
///
/// Inert unless the instance has filtering enabled and an option widget.
/// Returns whether the field was recorded.
pub fn widget_build(engine: &Engine<'_>, ctx: &mut RequestContext, instance: &FieldInstance) -> bool {
    if !instance.option_limit.enabled || !instance.widget.has_options() {
        return false;
    }
    match engine.limited_field(instance) {
        Some(field) if field.settings.enabled => {
            ctx.record_intent(field);
            true
        }
        _ => false,
    }
}

/// Run `widget_build` for every field of the entity's bundle.
pub fn prepare_form(engine: &Engine<'_>, ctx: &mut RequestContext, entity: &Entity) {
    let instances: Vec<FieldInstance> = engine
        .metadata()
        .field_instances(&entity.kind, &entity.bundle)
        .into_iter()
        .cloned()
        .collect();
    for instance in &instances {
        widget_build(engine, ctx, instance);
    }
}

/// Outcome of the form-assembly hook.
#[derive(Debug)]
pub enum FormAssembly {
    /// Full build: options for every recorded field.
    Full(FormBuild),
    /// Partial update: the routed field, or `None` when the event is ignored.
    Partial(Option<PartialUpdate>),
}

/// Compute options once the whole entity form exists.
pub fn entity_form_assembly(
    engine: &Engine<'_>,
    ctx: &mut RequestContext,
    entity: &Entity,
    form: &FormNode,
) -> FormAssembly {
    if ctx.is_partial_update() {
        FormAssembly::Partial(engine.partial_update(ctx, entity, form))
    } else {
        FormAssembly::Full(engine.build_form(ctx, entity))
    }
}

/// What a partial update sends back to the client.
#[derive(Debug)]
pub struct PartialUpdateResponse {
    /// Location of the replaced fragment.
    pub path: ElementPath,
    pub field: String,
    pub options: Result<OptionList>,
    pub messages: Vec<StatusMessage>,
}

/// Package a routed partial update with the request's pending messages.
pub fn partial_update_response(
    ctx: &mut RequestContext,
    update: PartialUpdate,
) -> PartialUpdateResponse {
    let path = update
        .path
        .unwrap_or_else(|| ElementPath(vec![update.field.clone()]));
    PartialUpdateResponse {
        path,
        field: update.field,
        options: update.result,
        messages: ctx.take_messages(),
    }
}
