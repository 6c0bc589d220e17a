//! Typed form structure and live submissions.
//!
//! A `FormNode` tree mirrors the rendered entity form: the root holds one
//! field container per field instance, and each container holds the widget's
//! elements. Partial updates identify their triggering element by an
//! `ElementPath` of node keys from the root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::{FieldInstance, FieldItem, Value};

/// Path of node keys from the form root to an element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementPath(pub Vec<String>);

impl ElementPath {
    pub fn new(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for ElementPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<String> = s
            .split(['/', '.'])
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return Err(Error::ConfigParse {
                message: format!("Empty element path '{}'", s),
                hint: Some("Write paths as segments separated by '/', e.g. sport/und/0/value".to_string()),
            });
        }
        Ok(Self(segments))
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A node of the form structure tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormNode {
    pub key: String,
    /// Set on a field's top-level container.
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub children: Vec<FormNode>,
}

impl FormNode {
    pub fn element(key: &str) -> Self {
        Self {
            key: key.to_string(),
            field: None,
            children: Vec::new(),
        }
    }

    pub fn field_container(field: &str) -> Self {
        Self {
            key: field.to_string(),
            field: Some(field.to_string()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: FormNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_field_container(&self) -> bool {
        self.field.is_some()
    }

    pub fn child(&self, key: &str) -> Option<&FormNode> {
        self.children.iter().find(|c| c.key == key)
    }

    /// The default form layout of a bundle: `field/und/0/<primary column>`.
    pub fn for_instances<'a>(
        instances: impl IntoIterator<Item = (&'a FieldInstance, &'static str)>,
    ) -> Self {
        let mut root = FormNode::element("form");
        for (instance, column) in instances {
            let delta = FormNode::element("0").with_child(FormNode::element(column));
            let language = FormNode::element("und").with_child(delta);
            root.children
                .push(FormNode::field_container(&instance.field).with_child(language));
        }
        root
    }

    /// Nodes along `path`, starting below the root. Stops at the first
    /// segment that does not resolve.
    pub fn trail(&self, path: &ElementPath) -> Vec<&FormNode> {
        let mut trail = Vec::new();
        let mut current = self;
        for segment in path.segments() {
            match current.child(segment) {
                Some(next) => {
                    trail.push(next);
                    current = next;
                }
                None => break,
            }
        }
        trail
    }

    /// Find the field container with the given field name.
    pub fn find_field(&self, field: &str) -> Option<(&FormNode, ElementPath)> {
        fn walk<'a>(
            node: &'a FormNode,
            field: &str,
            path: &mut Vec<String>,
        ) -> Option<(&'a FormNode, ElementPath)> {
            for child in &node.children {
                path.push(child.key.clone());
                if child.field.as_deref() == Some(field) {
                    return Some((child, ElementPath(path.clone())));
                }
                if let Some(found) = walk(child, field, path) {
                    return Some(found);
                }
                path.pop();
            }
            None
        }
        walk(self, field, &mut Vec::new())
    }
}

/// A raw value submitted by a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    /// A full item keyed by column.
    Item(FieldItem),
    /// A bare scalar such as a selected option key.
    Scalar(Value),
}

/// Live, in-progress form values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub values: BTreeMap<String, Vec<SubmittedValue>>,
    /// Set when the submission is a partial update triggered by one element.
    #[serde(default)]
    pub triggering_element: Option<ElementPath>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to the given scalar values.
    pub fn with_values(mut self, field: &str, values: Vec<Value>) -> Self {
        self.values.insert(
            field.to_string(),
            values.into_iter().map(SubmittedValue::Scalar).collect(),
        );
        self
    }

    pub fn triggered_by(mut self, path: ElementPath) -> Self {
        self.triggering_element = Some(path);
        self
    }

    /// Parse a `field=value` assignment, as given on the command line.
    ///
    /// Values are kept as text, the way a browser submits them; the item
    /// extractor converts them to the field's stored type.
    pub fn parse_assignment(&mut self, assignment: &str) -> Result<()> {
        let (field, value) = assignment.split_once('=').ok_or_else(|| Error::ConfigParse {
            message: format!("Invalid assignment '{}'", assignment),
            hint: Some("Use field=value".to_string()),
        })?;
        let value = Value::Text(value.to_string());
        let entry = self.values.entry(field.trim().to_string()).or_default();
        if !value.is_blank() {
            entry.push(SubmittedValue::Scalar(value));
        }
        Ok(())
    }
}
