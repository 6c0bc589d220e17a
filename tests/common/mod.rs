//! Shared test utilities for integration and E2E tests.
//!
//! This module provides the site fixtures and a temp-directory helper used
//! across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_site(sites::SPORTS);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::sites;
    pub use super::TestFixture;
}

/// Site files shared with the datatest suite.
#[allow(dead_code)]
pub mod sites {
    /// Stories whose team options follow the story's sport.
    pub const SPORTS: &str = include_str!("../testdata/sports.yaml");

    /// Featured products ordered by descending priority.
    pub const PRIORITY: &str = include_str!("../testdata/priority.yaml");

    /// Home and away sides matched on an integer and a numeric-looking
    /// text field.
    pub const FOUNDING: &str = include_str!("../testdata/founding.yaml");

    /// A bundle with a hand-written form tree.
    pub const EXPLICIT_FORM: &str = include_str!("../testdata/explicit_form.yaml");

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "entity_kinds: [unclosed";
}

/// A temporary directory holding a `site.yaml`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `site.yaml` with the given content.
    pub fn with_site(self, content: &str) -> Self {
        self.temp_dir
            .child("site.yaml")
            .write_str(content)
            .expect("Failed to write site file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the site file.
    pub fn site_path(&self) -> PathBuf {
        self.temp_dir.path().join("site.yaml")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
