//! # Terminal Output
//!
//! Rendering of option lists and status messages for the CLI, plus the
//! colour/emoji policy.
//!
//! Colour is decided once from the `--color` flag and the environment:
//! `NO_COLOR`, `CLICOLOR=0` and `TERM=dumb` turn it off, `CLICOLOR_FORCE`
//! turns it on, and otherwise the terminal's capabilities decide.

use std::env;
use std::fmt::Write as _;

use crate::context::{MessageLevel, StatusMessage};
use crate::phases::{OptionItem, OptionList};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Decide from the `--color` flag (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The emoji when colours are on, the plain marker otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Render an option list, one option per line, groups indented.
pub fn render_options(list: &OptionList) -> String {
    let mut out = String::new();
    for item in &list.items {
        match item {
            OptionItem::Choice(entry) => {
                let _ = writeln!(out, "  [{}] {}", entry.key, entry.label);
            }
            OptionItem::Group { label, entries } => {
                let _ = writeln!(out, "  {}:", label);
                for entry in entries {
                    let _ = writeln!(out, "    [{}] {}", entry.key, entry.label);
                }
            }
        }
    }
    if list.is_empty {
        let _ = writeln!(out, "  (no options)");
    }
    out
}

/// Render status messages with a level marker.
pub fn render_messages(config: &OutputConfig, messages: &[StatusMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let marker = match message.level {
            MessageLevel::Status => emoji(config, "ℹ️", "[INFO]"),
            MessageLevel::Warning => emoji(config, "⚠️", "[WARN]"),
            MessageLevel::Error => emoji(config, "❌", "[ERR]"),
        };
        let _ = writeln!(out, "{} {}", marker, message.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::{OptionEntry, OptionKey};

    #[test]
    fn test_color_flag() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(!OutputConfig::from_env_and_flag("never").use_color);
    }

    #[test]
    fn test_emoji_helper_without_color() {
        assert_eq!(emoji(&OutputConfig::plain(), "✅", "[OK]"), "[OK]");
    }

    #[test]
    fn test_render_options() {
        let list = OptionList {
            items: vec![
                OptionItem::Choice(OptionEntry {
                    key: OptionKey::None,
                    label: "- None -".to_string(),
                }),
                OptionItem::Group {
                    label: "article".to_string(),
                    entries: vec![OptionEntry {
                        key: OptionKey::Entity(2),
                        label: "Launch".to_string(),
                    }],
                },
            ],
            is_empty: false,
            advisory: None,
        };
        insta::assert_snapshot!(
            render_options(&list).replace('\n', "|"),
            @"  [_none] - None -|  article:|    [2] Launch|"
        );
    }

    #[test]
    fn test_render_messages_plain() {
        let messages = vec![StatusMessage {
            level: MessageLevel::Warning,
            text: "No options".to_string(),
        }];
        assert_eq!(
            render_messages(&OutputConfig::plain(), &messages),
            "[WARN] No options\n"
        );
    }
}
