// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Contract for test discovery
//!
//! Discovering tests means parsing PHP source, which lives outside this crate. The types
//! here describe what a discoverer hands back so terminal records can be matched to the
//! declarations they came from through [`TestResult::test_id`](crate::result::TestResult).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Line and column in a source file, both 1-based
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

/// Annotations attached to a test declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    /// `@depends` targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends: Option<Vec<String>>,
    /// `@dataProvider` methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_provider: Option<Vec<String>>,
    /// `@testdox` descriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testdox: Option<Vec<String>>,
}

/// A test class or method found in a source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDescriptor {
    /// Stable identifier, see [`test_identity`]
    pub id: String,
    /// Fully qualified class name
    pub qualified_class: String,
    /// Namespace, empty at the top level
    pub namespace: String,
    /// Class name, absent for functions declared outside a class
    pub class: Option<String>,
    /// Method name, absent for the class itself
    pub method: Option<String>,
    /// Start of the declaration
    pub start: Position,
    /// End of the declaration
    pub end: Position,
    /// Declared relationships and descriptions
    pub annotations: Annotations,
    /// Methods declared inside a class
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TestDescriptor>,
}

/// Something that can find tests in PHP source
pub trait TestDiscovery {
    /// Find the tests declared in `source`, read from `path`
    ///
    /// Files that declare no tests or fail to parse yield an empty forest.
    fn discover(&self, source: &str, path: &Path) -> Vec<TestDescriptor>;
}

/// Build the identity of a test: `<namespace>\<class>::<method>`
///
/// Separators are only written between parts that are present.
#[must_use]
pub fn test_identity(namespace: Option<&str>, class: Option<&str>, method: Option<&str>) -> String {
    let namespace = namespace.filter(|s| !s.is_empty());
    let class = class.filter(|s| !s.is_empty());
    let method = method.filter(|s| !s.is_empty());

    let mut id = String::new();
    if let Some(namespace) = namespace {
        id.push_str(namespace);
    }
    if let Some(class) = class {
        if !id.is_empty() {
            id.push('\\');
        }
        id.push_str(class);
    }
    if let Some(method) = method {
        if !id.is_empty() {
            id.push_str("::");
        }
        id.push_str(method);
    }
    id
}

/// Walk a forest depth-first, parents before children
#[must_use]
pub fn flatten(forest: &[TestDescriptor]) -> Vec<&TestDescriptor> {
    let mut out = Vec::new();
    let mut stack: Vec<&TestDescriptor> = forest.iter().rev().collect();
    while let Some(descriptor) = stack.pop() {
        out.push(descriptor);
        stack.extend(descriptor.children.iter().rev());
    }
    out
}

/// Find the descriptor with the given identity
#[must_use]
pub fn find_by_id<'a>(forest: &'a [TestDescriptor], id: &str) -> Option<&'a TestDescriptor> {
    flatten(forest).into_iter().find(|d| d.id == id)
}

/// Discover tests across several files, skipping files that yield nothing
pub fn discover_all<'a, D, I>(discovery: &D, files: I) -> Vec<TestDescriptor>
where
    D: TestDiscovery + ?Sized,
    I: IntoIterator<Item = (&'a Path, &'a str)>,
{
    files
        .into_iter()
        .flat_map(|(path, source)| {
            let found = discovery.discover(source, path);
            if found.is_empty() {
                tracing::debug!(path = %path.display(), "No tests found");
            }
            found
        })
        .collect()
}
