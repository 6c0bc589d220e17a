//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `option-limit` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `option_limit` library.
//!
//! The helpers below load the pieces several commands share: the site file,
//! the entity being edited and the simulated live submission.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;

use option_limit::config::{self, Site};
use option_limit::error::Error;
use option_limit::form::Submission;
use option_limit::schema::{Entity, EntityId};

pub mod check;
pub mod completions;
pub mod options;
pub mod route;
pub mod tree;

/// Output format of commands that print option lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Load a site file, naming the path on failure.
pub fn load_site(path: &Path) -> Result<Site> {
    config::from_file(path).with_context(|| format!("Failed to load site from {}", path.display()))
}

/// The entity a form is built for: a stored one, or a fresh one.
pub fn load_entity(
    site: &Site,
    entity_kind: &str,
    bundle: &str,
    id: Option<EntityId>,
) -> Result<Entity> {
    let Some(id) = id else {
        return Ok(Entity::new(entity_kind, bundle));
    };
    let entity = site
        .store
        .entity(entity_kind, id)
        .ok_or_else(|| Error::UnknownEntity {
            entity_kind: entity_kind.to_string(),
            id,
        })?;
    if entity.bundle != bundle {
        anyhow::bail!(
            "{} {} belongs to bundle '{}', not '{}'",
            entity_kind,
            id,
            entity.bundle,
            bundle
        );
    }
    Ok(entity.clone())
}

/// Build a live submission from `field=value` assignments.
///
/// Returns `None` when there are no assignments, i.e. a first render.
pub fn submission_from(assignments: &[String]) -> Result<Option<Submission>> {
    if assignments.is_empty() {
        return Ok(None);
    }
    let mut submission = Submission::new();
    for assignment in assignments {
        submission.parse_assignment(assignment)?;
    }
    Ok(Some(submission))
}
