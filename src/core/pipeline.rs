// src/core/pipeline.rs
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SplitError};
use super::pruner::ImportPruner;
use super::resolver::SemanticResolver;
use super::selection::{self, Action, ActionKind};
use super::splitter;
use super::syntax::{DeclarationSite, SourceTree};

/// A file and its complete new content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    pub name: String,
    pub text: String,
}

/// Output of one refactoring run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditSet {
    Move {
        original_file: FileEdit,
        new_file: FileEdit,
    },
    Rename {
        old_name: String,
        new_name: String,
        text: String,
    },
}

impl EditSet {
    /// Name of the file this edit set creates
    pub fn created_file(&self) -> &str {
        match self {
            EditSet::Move { new_file, .. } => &new_file.name,
            EditSet::Rename { new_name, .. } => new_name,
        }
    }
}

/// Names of the files that already exist next to the one being refactored
pub trait FileSet {
    fn contains(&self, name: &str) -> bool;
}

impl FileSet for HashSet<String> {
    fn contains(&self, name: &str) -> bool {
        HashSet::contains(self, name)
    }
}

impl FileSet for BTreeSet<String> {
    fn contains(&self, name: &str) -> bool {
        BTreeSet::contains(self, name)
    }
}

/// Resolve the selection and, when an action is offered, run it.
/// `Ok(None)` means nothing is offered for this selection.
pub async fn run(
    tree: &SourceTree,
    selection: Range<usize>,
    file_name: &str,
    resolver: &dyn SemanticResolver,
    files: &dyn FileSet,
    config: &Config,
) -> Result<Option<EditSet>> {
    let Some(action) = selection::resolve(tree, selection, file_name, &config.parsing.default_extension) else {
        debug!("No action offered in {}", file_name);
        return Ok(None);
    };

    execute(tree, &action, file_name, resolver, files, config).await.map(Some)
}

/// Run an action produced by [`selection::resolve`] for `tree`
pub async fn execute(
    tree: &SourceTree,
    action: &Action,
    file_name: &str,
    resolver: &dyn SemanticResolver,
    files: &dyn FileSet,
    config: &Config,
) -> Result<EditSet> {
    if files.contains(&action.file_name) {
        return Err(SplitError::NameCollision { name: action.file_name.clone() });
    }

    match action.kind {
        ActionKind::Rename => {
            info!("Renaming {} to {}", file_name, action.file_name);
            Ok(EditSet::Rename {
                old_name: file_name.to_string(),
                new_name: action.file_name.clone(),
                text: tree.to_text(),
            })
        }
        ActionKind::Move => {
            let identifier = &action.site.declaration.identifier;
            info!("Moving {} from {} to {}", identifier, file_name, action.file_name);

            let namespace = resolver.containing_namespace_of(tree, &action.site).await?;
            debug!("{} lives in namespace '{}'", identifier, namespace);

            let (original, new_file) = splitter::split(tree, &action.site, &namespace, &config.format)?;

            let pruner = ImportPruner::new(resolver, &config.pruning)?;
            let (original, new_file) = tokio::try_join!(pruner.prune(&original), pruner.prune(&new_file))?;

            check_complete(tree, &original, &new_file, &action.site)?;

            Ok(EditSet::Move {
                original_file: FileEdit {
                    name: file_name.to_string(),
                    text: original.to_text(),
                },
                new_file: FileEdit {
                    name: action.file_name.clone(),
                    text: new_file.to_text(),
                },
            })
        }
    }
}

/// Exactly one output holds the moved declaration and nothing else went missing
fn check_complete(before: &SourceTree, original: &SourceTree, new_file: &SourceTree, site: &DeclarationSite) -> Result<()> {
    let identifier = &site.declaration.identifier;
    let named = |tree: &SourceTree| tree.type_declarations().into_iter()
        .filter(|(_, declaration)| &declaration.identifier == identifier)
        .count();

    if new_file.top_level_type_count() != 1 || named(new_file) != 1 {
        return Err(SplitError::Invariant(format!("new file must hold exactly '{}'", identifier)));
    }

    // A nested type leaves its container behind
    let moved_top_level = usize::from(!site.is_nested());
    let kept_everything = original.type_count() + new_file.type_count() == before.type_count()
        && original.top_level_type_count() + moved_top_level == before.top_level_type_count()
        && named(original) + moved_top_level == named(before);

    if !kept_everything {
        return Err(SplitError::Invariant(format!(
            "original file must keep every declaration except '{}'",
            identifier
        )));
    }

    Ok(())
}
