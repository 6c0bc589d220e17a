//! Request-scoped state.
//!
//! The hosting framework invokes the widget-build hook, the form-assembly hook
//! and the partial-update hook separately. A `RequestContext` is created per
//! request and passed to each of them, carrying what earlier hooks learned to
//! later ones. It is dropped with the request; nothing survives across
//! requests.

use crate::form::Submission;
use crate::phases::{LimitedField, RouterState};

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Status,
    Warning,
    Error,
}

/// A user-facing message accumulated during the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
}

/// State of one form build or partial-update request.
#[derive(Debug, Default)]
pub struct RequestContext {
    submission: Option<Submission>,
    intents: Vec<LimitedField>,
    messages: Vec<StatusMessage>,
    router: RouterState,
}

impl RequestContext {
    /// Context for a first render, with no submitted values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a request carrying live form values. A triggering element
    /// makes it a partial update.
    pub fn with_submission(submission: Submission) -> Self {
        let router = match &submission.triggering_element {
            Some(path) => RouterState::Idle.receive(path.clone()),
            None => RouterState::Idle,
        };
        Self {
            submission: Some(submission),
            router,
            ..Default::default()
        }
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    pub fn is_partial_update(&self) -> bool {
        self.submission
            .as_ref()
            .is_some_and(|s| s.triggering_element.is_some())
    }

    /// Remember that `field` is option-limited on this form. Recording the
    /// same field twice keeps the first record.
    pub fn record_intent(&mut self, field: LimitedField) {
        if !self.intents.iter().any(|f| f.name() == field.name()) {
            self.intents.push(field);
        }
    }

    pub fn intents(&self) -> &[LimitedField] {
        &self.intents
    }

    pub fn intent(&self, field: &str) -> Option<&LimitedField> {
        self.intents.iter().find(|f| f.name() == field)
    }

    pub fn add_message(&mut self, level: MessageLevel, text: impl Into<String>) {
        self.messages.push(StatusMessage {
            level,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[StatusMessage] {
        &self.messages
    }

    /// Hand over the pending messages, leaving none behind.
    pub fn take_messages(&mut self) -> Vec<StatusMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn router(&self) -> &RouterState {
        &self.router
    }

    pub(crate) fn set_router(&mut self, state: RouterState) {
        self.router = state;
    }
}
