//! Partial-update routing.
//!
//! When one form element changes, only the option-limited field that uses
//! the changed field as a matcher needs new options. The router walks the
//! triggering element's path upward to its enclosing field container and
//! looks that field up among the active matchers.
//!
//! ```text
//! Idle --event--> EventReceived --resolve--> Resolved(field) | Ignored
//! ```
//!
//! When several option-limited fields share the matcher, only the first in
//! form order is resolved. Updating several fields from one event is not
//! supported.

use log::debug;

use super::LimitedField;
use crate::form::{ElementPath, FormNode};

/// State of the router for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RouterState {
    /// Full form build, no event.
    #[default]
    Idle,
    /// A change event arrived from the element at this path.
    EventReceived(ElementPath),
    /// The named option-limited field must be recomputed.
    Resolved(String),
    /// The event does not concern any option-limited field.
    Ignored,
}

impl RouterState {
    /// Record a change event. Only valid from `Idle`; later states are kept.
    pub fn receive(self, path: ElementPath) -> Self {
        match self {
            RouterState::Idle => RouterState::EventReceived(path),
            other => other,
        }
    }

    /// Decide which field the received event affects.
    pub fn resolve(self, form: &FormNode, limited: &[LimitedField]) -> Self {
        let path = match self {
            RouterState::EventReceived(path) => path,
            other => return other,
        };
        let Some(source) = source_field(form, &path) else {
            debug!("No field container encloses {}", path);
            return RouterState::Ignored;
        };
        match limited.iter().find(|field| field.is_matched_by(&source)) {
            Some(field) => {
                debug!("Change on {} recomputes {}", source, field.name());
                RouterState::Resolved(field.name().to_string())
            }
            None => {
                debug!("Change on {} affects no option-limited field", source);
                RouterState::Ignored
            }
        }
    }

    pub fn resolved_field(&self) -> Option<&str> {
        match self {
            RouterState::Resolved(field) => Some(field),
            _ => None,
        }
    }
}

/// The field whose container is the nearest ancestor-or-self of the element.
pub fn source_field(form: &FormNode, path: &ElementPath) -> Option<String> {
    form.trail(path)
        .into_iter()
        .rev()
        .find(|node| node.is_field_container())
        .and_then(|node| node.field.clone())
}

/// Route one change event from `Idle` to a final state.
pub fn route(form: &FormNode, path: &ElementPath, limited: &[LimitedField]) -> RouterState {
    RouterState::Idle.receive(path.clone()).resolve(form, limited)
}
