// src/core/resolver.rs
//! Semantic resolver seam and the symbol-index based implementation.
//!
//! The pipeline never holds ambient semantic state: every split and prune call
//! receives a resolver explicitly and asks it about one specific tree.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{Result, SplitError};
use super::languages::{CSharpParser, LanguageParser, ScannedImport, UsageScan};
use super::syntax::{DeclarationSite, SourceTree};

/// Import diagnostics the pruner acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportDiagnosticKind {
    /// Nothing in the file needs the directive
    UnusedImport,
    /// The same directive is already in effect
    RedundantImport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDiagnostic {
    pub kind: ImportDiagnosticKind,

    /// Byte span inside `tree.to_text()` of the tree that was analysed
    pub span: Range<usize>,

    pub message: String,
}

/// Oracle for questions that need more than syntax
#[async_trait]
pub trait SemanticResolver: Send + Sync {
    /// Fully qualified namespace containing the declaration; empty for the global namespace
    async fn containing_namespace_of(&self, tree: &SourceTree, site: &DeclarationSite) -> Result<String>;

    /// Unused and redundant import directives of `tree`. Each call analyses the
    /// given tree afresh.
    async fn import_diagnostics(&self, tree: &SourceTree) -> Result<Vec<ImportDiagnostic>>;
}

/// Namespace → names it exports
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    namespaces: HashMap<String, BTreeSet<String>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut index = Self::new();
        for (namespace, names) in &config.known_namespaces {
            for name in names {
                index.register(namespace, name);
            }
        }
        index
    }

    pub fn register(&mut self, namespace: &str, name: &str) {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string());
    }

    /// Register every top-level type of `tree` under its enclosing namespace.
    /// Returns the number of types registered.
    pub fn register_tree(&mut self, tree: &SourceTree) -> usize {
        let mut registered = 0;
        for (path, declaration) in tree.type_declarations() {
            let Some(names) = tree.namespace_of(&path) else {
                continue;
            };
            if names.is_empty() || declaration.identifier.is_empty() {
                continue;
            }
            self.register(&names.join("."), &declaration.identifier);
            registered += 1;
        }
        registered
    }

    pub fn names_in(&self, namespace: &str) -> Option<&BTreeSet<String>> {
        self.namespaces.get(namespace)
    }

    /// Whether `namespace` exports `name`, or `nameAttribute` when `name` is
    /// written as an attribute
    pub fn exports(&self, namespace: &str, name: &str) -> bool {
        self.names_in(namespace).is_some_and(|names| {
            names.contains(name) || names.contains(&format!("{}Attribute", name))
        })
    }

    /// Whether `segment` starts the name of an indexed namespace (`System` in `System.IO`)
    pub fn is_namespace_root(&self, segment: &str) -> bool {
        self.namespaces.keys().any(|namespace| {
            namespace == segment
                || namespace.strip_prefix(segment).is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }
}

/// Heuristic resolver: namespaces come from the enclosing declarations, import
/// usage from matching referenced identifiers against a [`SymbolIndex`].
///
/// The index is never assumed to be complete. A namespace import is only
/// reported unused when every capitalized name the file references is
/// accounted for: declared in the file, exported by one of its own namespaces
/// or by another import, or the root of a namespace. Directives it cannot
/// reason about are always reported as used.
pub struct IndexResolver {
    index: SymbolIndex,
}

impl IndexResolver {
    pub fn new(index: SymbolIndex) -> Self {
        Self { index }
    }

    /// Referenced names that neither the file nor the index account for
    fn unresolved<'a>(&self, scan: &'a UsageScan) -> Vec<&'a str> {
        // The file's own namespaces and their parents are in scope without an import
        let mut in_scope: Vec<&str> = Vec::new();
        for namespace in &scan.namespaces {
            let mut end = namespace.len();
            loop {
                in_scope.push(&namespace[..end]);
                match namespace[..end].rfind('.') {
                    Some(dot) => end = dot,
                    None => break,
                }
            }
        }

        let aliases: Vec<&str> = scan.imports.iter()
            .filter_map(|import| import.parts.alias.as_deref())
            .collect();
        let imported: Vec<&str> = scan.imports.iter()
            .filter(|import| import.parts.alias.is_none() && !import.parts.is_static)
            .map(|import| import.parts.target.as_str())
            .collect();

        scan.type_references.iter()
            .map(String::as_str)
            .filter(|name| !scan.declared.contains(*name))
            .filter(|name| !aliases.contains(name))
            .filter(|name| !self.index.is_namespace_root(name))
            .filter(|name| !in_scope.iter().chain(&imported).any(|namespace| self.index.exports(namespace, name)))
            .collect()
    }

    fn diagnose(&self, scan: &UsageScan) -> Vec<ImportDiagnostic> {
        let mut diagnostics = Vec::new();

        let unresolved = self.unresolved(scan);
        if !unresolved.is_empty() {
            debug!("Unresolved names {:?}; keeping every namespace import", unresolved);
        }

        for (position, import) in scan.imports.iter().enumerate() {
            let parts = &import.parts;

            if parts.is_global {
                continue;
            }

            if let Some(earlier) = scan.imports[..position].iter().find(|other| shadows(other, import)) {
                diagnostics.push(ImportDiagnostic {
                    kind: ImportDiagnosticKind::RedundantImport,
                    span: import.span.clone(),
                    message: format!(
                        "'{}' is already imported at offset {}",
                        parts.target, earlier.span.start
                    ),
                });
                continue;
            }

            if let Some(alias) = &parts.alias {
                if !scan.identifiers.contains(alias) {
                    diagnostics.push(unused(import, format!("alias '{}' is never used", alias)));
                }
                continue;
            }

            if parts.is_static {
                continue;
            }

            if !unresolved.is_empty() {
                continue;
            }

            match self.index.names_in(&parts.target) {
                Some(names) => {
                    if !names.iter().any(|name| scan.references(name)) {
                        diagnostics.push(unused(import, format!("nothing from '{}' is referenced", parts.target)));
                    }
                }
                None => debug!("Namespace {} is not indexed; keeping its import", parts.target),
            }
        }

        diagnostics
    }
}

fn unused(import: &ScannedImport, message: String) -> ImportDiagnostic {
    ImportDiagnostic {
        kind: ImportDiagnosticKind::UnusedImport,
        span: import.span.clone(),
        message,
    }
}

/// Whether `earlier` already brings `later` into effect: the same directive in
/// the same scope or an enclosing one
fn shadows(earlier: &ScannedImport, later: &ScannedImport) -> bool {
    earlier.parts.target == later.parts.target
        && earlier.parts.alias == later.parts.alias
        && earlier.parts.is_static == later.parts.is_static
        && later.scope.starts_with(&earlier.scope)
}

#[async_trait]
impl SemanticResolver for IndexResolver {
    async fn containing_namespace_of(&self, tree: &SourceTree, site: &DeclarationSite) -> Result<String> {
        if tree.has_errors {
            return Err(SplitError::Resolution("the file has syntax errors".to_string()));
        }

        let declaration = tree.declaration_at(site)
            .ok_or_else(|| SplitError::Resolution(format!(
                "type '{}' is not part of this tree",
                site.declaration.identifier
            )))?;

        let names = tree.namespace_of(&site.path)
            .ok_or_else(|| SplitError::Resolution(format!(
                "no namespace information for '{}'",
                declaration.identifier
            )))?;

        Ok(names.join("."))
    }

    async fn import_diagnostics(&self, tree: &SourceTree) -> Result<Vec<ImportDiagnostic>> {
        let text = tree.to_text();
        let mut parser = CSharpParser::new()?;
        let scan = parser.scan_usage(&text)?;

        if scan.has_errors {
            return Err(SplitError::Resolution("cannot analyse imports of a file with syntax errors".to_string()));
        }

        Ok(self.diagnose(&scan))
    }
}
