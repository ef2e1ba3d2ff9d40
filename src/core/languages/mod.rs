//! Language-specific parsers
//!
//! A parser lowers source text into the persistent [`SourceTree`] the
//! refactoring pipeline works on, and performs the lightweight usage scan the
//! heuristic resolver needs.

mod csharp;

pub use csharp::CSharpParser;

use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

use crate::error::Result;
use super::syntax::{DirectiveParts, SourceTree};

/// An import directive found by a usage scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImport {
    /// Byte span of the directive text
    pub span: Range<usize>,

    pub parts: DirectiveParts,

    /// Start offsets of the enclosing namespace declarations, outermost first.
    /// Empty for directives at compilation unit level.
    pub scope: Vec<usize>,
}

/// Names referenced by a file and the import directives it declares
#[derive(Debug, Clone, Default)]
pub struct UsageScan {
    /// Identifiers referenced outside import directives and declaration names
    pub identifiers: HashSet<String>,

    /// Import directives in document order
    pub imports: Vec<ScannedImport>,

    /// Capitalized names in positions where they may denote a type: not a
    /// declaration name and not the member part of `a.B` or `a?.B`
    pub type_references: BTreeSet<String>,

    /// Names introduced by declarations (types, members, locals, parameters)
    pub declared: HashSet<String>,

    /// Fully qualified names of the namespaces the file declares
    pub namespaces: Vec<String>,

    pub has_errors: bool,
}

impl UsageScan {
    /// Whether `name` is referenced. `Foo` written as an attribute (`[Foo]`)
    /// refers to `FooAttribute`.
    pub fn references(&self, name: &str) -> bool {
        if self.identifiers.contains(name) {
            return true;
        }

        name.strip_suffix("Attribute")
            .filter(|short| !short.is_empty())
            .is_some_and(|short| self.identifiers.contains(short))
    }
}

/// Trait that all language parsers must implement
pub trait LanguageParser: Send {
    /// Parse source code into a round-trip exact tree
    fn parse(&mut self, content: &str, file_path: &std::path::Path) -> Result<SourceTree>;

    /// Collect referenced identifiers and import directives
    fn scan_usage(&mut self, content: &str) -> Result<UsageScan>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name, the key used in `parsing.languages`
    fn language_name(&self) -> &str;
}
