//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays a site's
//! entity kinds, their bundles and the fields attached to each bundle.
//!
//! Option-limited fields are marked and list their active matching fields as
//! children, so the dependencies between fields of a form can be read at a
//! glance.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::path::PathBuf;

use super::load_site;
use option_limit::config::Site;
use option_limit::phases::orchestrator::Engine;
use option_limit::reference::ReferenceRegistry;
use option_limit::store::{FieldTypeItemExtractor, MetadataProvider};

/// Display kinds, bundles and fields of a site as a tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Path to the site definition file.
    #[arg(short, long, value_name = "FILE", default_value = "site.yaml")]
    pub site: PathBuf,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let site = load_site(&args.site)?;
    let root = build_tree(&site, &args.site.display().to_string());
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Build the display tree of a site.
fn build_tree(site: &Site, label: &str) -> TreeNode {
    let registry = ReferenceRegistry::default();
    let engine = Engine::new(&site.store, &site.store, &FieldTypeItemExtractor, &registry);

    let kinds = site
        .store
        .kinds()
        .map(|kind| {
            let bundles = kind
                .bundles
                .iter()
                .map(|bundle| {
                    let fields = site
                        .store
                        .field_instances(&kind.name, bundle)
                        .into_iter()
                        .map(|instance| {
                            let type_name = site
                                .store
                                .definition(&instance.field)
                                .map(|d| d.field_type.type_name())
                                .unwrap_or("unknown");
                            let label = format!("{} ({})", instance.field, type_name);
                            match engine.limited_field(instance) {
                                Some(field) if field.settings.enabled => TreeNode::branch(
                                    format!("{} [limited → {}]", label, field.target.bundles.join(", ")),
                                    field
                                        .settings
                                        .matching_fields
                                        .iter()
                                        .map(|m| TreeNode::leaf(format!("matches {}", m)))
                                        .collect(),
                                ),
                                _ => TreeNode::leaf(label),
                            }
                        })
                        .collect();
                    TreeNode::branch(bundle.clone(), fields)
                })
                .collect();
            TreeNode::branch(kind.name.clone(), bundles)
        })
        .collect();

    TreeNode::branch(label.to_string(), kinds)
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: vec![],
        }
    }

    fn branch(label: String, children: Vec<TreeNode>) -> Self {
        Self { label, children }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
