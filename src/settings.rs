//! Per-instance option limiting settings.
//!
//! `OptionLimitSettings` is what the field configuration UI stores on a field
//! instance. It is never used directly by the pipeline: `effective` reconciles
//! it with the matching fields that actually exist today, producing
//! `EffectiveSettings`.

use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Stored configuration of an option-limited field instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionLimitSettings {
    /// Whether filtering was switched on for this instance.
    #[serde(default)]
    pub enabled: bool,
    /// Names of the fields used as matchers, in configured order.
    #[serde(default)]
    pub matching_fields: Vec<String>,
    /// When a matcher has no value: `true` hides every option, `false` ignores
    /// the matcher.
    #[serde(default)]
    pub empty_behavior_hides_all: bool,
}

impl OptionLimitSettings {
    /// Enabled settings matching on the given fields.
    pub fn matching(fields: &[&str]) -> Self {
        Self {
            enabled: true,
            matching_fields: fields.iter().map(|f| f.to_string()).collect(),
            empty_behavior_hides_all: false,
        }
    }

    pub fn hide_all_when_empty(mut self) -> Self {
        self.empty_behavior_hides_all = true;
        self
    }

    /// Reconcile stored settings with the current candidate matching fields.
    ///
    /// Filtering is forced off when there are no candidates. Stored names that
    /// are not candidates are dropped and reported in `stale`.
    pub fn effective(&self, field: &str, candidates: &[String]) -> EffectiveSettings {
        if candidates.is_empty() {
            if self.enabled {
                info!(
                    "Option limiting disabled for {}: no common matching fields",
                    field
                );
            }
            return EffectiveSettings {
                enabled: false,
                matching_fields: Vec::new(),
                empty_behavior_hides_all: self.empty_behavior_hides_all,
                stale: self.matching_fields.clone(),
            };
        }

        let mut matching_fields = Vec::new();
        let mut stale = Vec::new();
        for name in &self.matching_fields {
            if candidates.contains(name) {
                if !matching_fields.contains(name) {
                    matching_fields.push(name.clone());
                }
            } else if !stale.contains(name) {
                stale.push(name.clone());
            }
        }

        if self.enabled && !stale.is_empty() {
            warn!(
                "Ignoring stale matching fields on {}: {}",
                field,
                stale.join(", ")
            );
        }

        EffectiveSettings {
            enabled: self.enabled,
            matching_fields,
            empty_behavior_hides_all: self.empty_behavior_hides_all,
            stale,
        }
    }
}

/// Settings after reconciliation with the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub enabled: bool,
    /// Active matchers: stored names that are still candidates.
    pub matching_fields: Vec<String>,
    pub empty_behavior_hides_all: bool,
    /// Stored names that no longer exist on both sides.
    pub stale: Vec<String>,
}

impl EffectiveSettings {
    /// Report schema drift as a `MalformedConfiguration` value.
    pub fn drift(&self, field: &str) -> Option<Error> {
        if self.stale.is_empty() {
            None
        } else {
            Some(Error::MalformedConfiguration {
                field: field.to_string(),
                stale: self.stale.clone(),
            })
        }
    }
}

const MACHINE_NAME: &str = r"^[a-z][a-z0-9_]*$";

/// Compile `source` once into `cell`.
fn compiled(cell: &'static OnceLock<Regex>, source: &str) -> Result<&'static Regex> {
    if let Some(pattern) = cell.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(source)?;
    Ok(cell.get_or_init(|| pattern))
}

/// Validate a field, bundle or entity kind machine name.
pub fn validate_machine_name(what: &str, name: &str) -> Result<()> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if compiled(&PATTERN, MACHINE_NAME)?.is_match(name) {
        Ok(())
    } else {
        Err(Error::ConfigParse {
            message: format!("Invalid {} name '{}'", what, name),
            hint: Some(
                "Use lowercase letters, digits and underscores, starting with a letter"
                    .to_string(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_are_disabled() {
        let settings: OptionLimitSettings = serde_yaml::from_str("{}").unwrap();
        assert!(!settings.enabled);
        assert!(settings.matching_fields.is_empty());
        assert!(!settings.empty_behavior_hides_all);
    }

    #[test]
    fn test_effective_forces_disabled_without_candidates() {
        let settings = OptionLimitSettings::matching(&["sport"]);
        let effective = settings.effective("team", &[]);
        assert!(!effective.enabled);
        assert!(effective.matching_fields.is_empty());
    }

    #[test]
    fn test_effective_drops_stale_names() {
        let settings = OptionLimitSettings::matching(&["sport", "league"]);
        let effective = settings.effective("team", &names(&["sport", "country"]));
        assert!(effective.enabled);
        assert_eq!(effective.matching_fields, names(&["sport"]));
        assert_eq!(effective.stale, names(&["league"]));
        assert!(matches!(
            effective.drift("team"),
            Some(Error::MalformedConfiguration { .. })
        ));
    }

    #[test]
    fn test_effective_warns_on_stale_names() {
        testing_logger::setup();
        let settings = OptionLimitSettings::matching(&["league"]);
        settings.effective("team", &names(&["sport"]));
        testing_logger::validate(|captured| {
            assert!(captured
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("league")));
        });
    }

    #[test]
    fn test_effective_keeps_configured_order_without_duplicates() {
        let settings = OptionLimitSettings::matching(&["country", "sport", "country"]);
        let effective = settings.effective("team", &names(&["sport", "country"]));
        assert_eq!(effective.matching_fields, names(&["country", "sport"]));
        assert!(effective.drift("team").is_none());
    }

    #[test]
    fn test_validate_machine_name() {
        assert!(validate_machine_name("field", "field_sport").is_ok());
        assert!(validate_machine_name("field", "Sport").is_err());
        assert!(validate_machine_name("field", "1st").is_err());
        assert!(validate_machine_name("field", "").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_a_regex_error() {
        static BROKEN: OnceLock<Regex> = OnceLock::new();
        let err = compiled(&BROKEN, "^[a-z").unwrap_err();
        assert!(matches!(err, Error::Regex(_)));
        assert!(err.to_string().contains("Regex error"));
        assert!(BROKEN.get().is_none());
    }
}
