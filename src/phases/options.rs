//! Phase 5: Option Building
//!
//! Turns loaded candidates into the option list a widget renders:
//!
//! 1.  Label each candidate through the reference type.
//! 2.  Flatten groups when the widget cannot show them.
//! 3.  Prepend the "none" entry for optional single-value widgets.
//! 4.  Flag the list as empty and attach an advisory naming the active
//!     matchers when there is nothing to pick.

use super::{Advisory, LimitedField, OptionEntry, OptionItem, OptionKey, OptionList};
use crate::reference::ReferenceRegistry;
use crate::schema::{Entity, FieldDefinition, FieldInstance, Widget};
use crate::store::EntityStore;

/// Label of the none entry in select lists.
pub const SELECT_NONE_LABEL: &str = "- None -";

/// Label of the none entry for radios.
pub const BUTTONS_NONE_LABEL: &str = "N/A";

/// What the widget needs from an option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetShape {
    pub multiple: bool,
    pub optgroups: bool,
    pub required: bool,
    /// Label of the "none" entry, if the widget wants one.
    pub none_label: Option<String>,
}

impl WidgetShape {
    pub fn of(instance: &FieldInstance, definition: &FieldDefinition) -> Self {
        let multiple = definition.cardinality.is_multiple();
        let none_label = if multiple || instance.required {
            None
        } else {
            match instance.widget {
                Widget::Select => Some(SELECT_NONE_LABEL.to_string()),
                Widget::Buttons => Some(BUTTONS_NONE_LABEL.to_string()),
                Widget::Autocomplete | Widget::TextField => None,
            }
        };
        Self {
            multiple,
            optgroups: instance.widget == Widget::Select,
            required: instance.required,
            none_label,
        }
    }

    /// Replace the none label, e.g. with a translated one.
    pub fn with_none_label(mut self, label: &str) -> Self {
        if self.none_label.is_some() {
            self.none_label = Some(label.to_string());
        }
        self
    }
}

/// Expand every group into plain choices.
pub fn flatten(items: Vec<OptionItem>) -> Vec<OptionItem> {
    items
        .into_iter()
        .flat_map(|item| match item {
            OptionItem::Choice(entry) => vec![OptionItem::Choice(entry)],
            OptionItem::Group { entries, .. } => {
                entries.into_iter().map(OptionItem::Choice).collect()
            }
        })
        .collect()
}

/// Execute Phase 5 for one field.
pub fn execute(
    field: &LimitedField,
    entities: &[Entity],
    shape: &WidgetShape,
    store: &dyn EntityStore,
    registry: &ReferenceRegistry,
) -> OptionList {
    let mut items = registry
        .handler_for(&field.definition.field_type)
        .map(|handler| handler.label_options(store, &field.target, entities))
        .unwrap_or_default();

    if !shape.optgroups {
        items = flatten(items);
    }

    let is_empty = items.iter().all(|item| match item {
        OptionItem::Choice(_) => false,
        OptionItem::Group { entries, .. } => entries.is_empty(),
    });

    if let Some(label) = &shape.none_label {
        items.insert(
            0,
            OptionItem::Choice(OptionEntry {
                key: OptionKey::None,
                label: label.clone(),
            }),
        );
    }

    let advisory = if is_empty && field.settings.enabled && !field.settings.matching_fields.is_empty()
    {
        Some(Advisory {
            field_label: field.instance.label.clone(),
            matching_fields: field.settings.matching_fields.clone(),
        })
    } else {
        None
    };

    OptionList {
        items,
        is_empty,
        advisory,
    }
}
