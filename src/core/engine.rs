// src/core/engine.rs
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn, debug};

use crate::config::Config;
use crate::error::SplitError;
use super::{
    pipeline, selection, ActionKind, CodeParser, EditSet, FileSet, IndexResolver, ParsedFile,
    PlannedEdit, SymbolIndex, Workspace,
};

const CONFIG_FILE_NAME: &str = "Typesplit.toml";

/// How the user points at a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// First top-level type with this identifier
    Type(String),
    /// Byte offset into the file
    Offset(usize),
    /// 1-based line and column; the column counts characters
    Position { line: usize, column: usize },
}

impl Selector {
    /// Selection range this selector denotes in `parsed`
    pub fn to_range(&self, parsed: &ParsedFile) -> std::result::Result<Range<usize>, SplitError> {
        let text = &parsed.source_content;

        match self {
            Selector::Type(name) => {
                let path = parsed.tree.type_declarations().into_iter()
                    .find(|(_, declaration)| &declaration.identifier == name)
                    .map(|(path, _)| path)
                    .ok_or_else(|| SplitError::Selection(format!("no top-level type named '{}'", name)))?;

                parsed.tree.type_spans().into_iter()
                    .find(|(candidate, _)| *candidate == path)
                    .map(|(_, span)| span)
                    .ok_or_else(|| SplitError::Selection(format!("no span for '{}'", name)))
            }
            Selector::Offset(offset) => {
                if *offset > text.len() || !text.is_char_boundary(*offset) {
                    return Err(SplitError::Selection(format!("offset {} is outside the file", offset)));
                }
                Ok(*offset..*offset)
            }
            Selector::Position { line, column } => {
                let offset = offset_of_position(text, *line, *column)
                    .ok_or_else(|| SplitError::Selection(format!("{}:{} is outside the file", line, column)))?;
                Ok(offset..offset)
            }
        }
    }
}

fn offset_of_position(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 || column == 0 {
        return None;
    }

    let mut start = 0;
    for (index, content) in text.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let content = content.trim_end_matches(['\r', '\n']);
            return match content.char_indices().nth(column - 1) {
                Some((byte, _)) => Some(start + byte),
                None if content.chars().count() == column - 1 => Some(start + content.len()),
                None => None,
            };
        }
        start += content.len();
    }

    None
}

/// One top-level type and the action offered for it
#[derive(Debug, Clone, Serialize)]
pub struct TypeListing {
    pub identifier: String,
    pub kind: String,
    pub namespace: String,
    pub action: Option<ActionKind>,
    pub target_file: Option<String>,
}

/// Main orchestration engine for typesplit
pub struct Engine {
    config: Config,
    parser: CodeParser,
    resolver: IndexResolver,
}

impl Engine {
    /// Load configuration and build the symbol index, scanning `root` when enabled
    pub async fn new(config_path: Option<&Path>, root: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        let mut parser = CodeParser::new(&config.parsing)?;
        let mut index = SymbolIndex::from_config(&config.resolver);

        match root {
            Some(root) if config.resolver.scan_workspace => {
                info!("Indexing types under {}", root.display());
                let files = parser.parse_directory(root, &config.resolver.ignore_patterns).await
                    .map_err(|e| anyhow::anyhow!("Failed to scan workspace {}: {}", root.display(), e))?;

                let registered: usize = files.iter()
                    .filter(|file| !file.tree.has_errors)
                    .map(|file| index.register_tree(&file.tree))
                    .sum();
                info!("Indexed {} types from {} files", registered, files.len());
            }
            _ => debug!("Workspace scan disabled"),
        }

        debug!("Symbol index covers {} namespaces", index.namespace_count());

        Ok(Self {
            config,
            parser,
            resolver: IndexResolver::new(index),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write the active configuration to `Typesplit.toml` in `dir`
    pub async fn init(&self, dir: &Path, force: bool) -> Result<PathBuf> {
        let target = dir.join(CONFIG_FILE_NAME);
        if target.exists() && !force {
            anyhow::bail!("{} already exists; pass --force to overwrite it", target.display());
        }

        self.config.save(&target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!("Wrote configuration to {}", target.display());
        Ok(target)
    }

    /// Top-level types of `file` with the action each one offers
    pub async fn list(&mut self, file: &Path) -> Result<Vec<TypeListing>> {
        let parsed = self.parse(file).await?;
        let file_name = parsed.file_name();
        let extension = &self.config.parsing.default_extension;

        let spans = parsed.tree.type_spans();
        let listings = parsed.tree.type_declarations().into_iter()
            .zip(spans)
            .map(|((path, declaration), (_, span))| {
                let action = selection::resolve(&parsed.tree, span, &file_name, extension);
                TypeListing {
                    identifier: declaration.identifier.clone(),
                    kind: declaration.kind.keyword().to_string(),
                    namespace: parsed.tree.namespace_of(&path)
                        .map(|names| names.join("."))
                        .unwrap_or_default(),
                    action: action.as_ref().map(|action| action.kind),
                    target_file: action.map(|action| action.file_name),
                }
            })
            .collect();

        Ok(listings)
    }

    /// Compute the edits for `selector` without touching disk
    pub async fn plan(&mut self, file: &Path, selector: &Selector) -> Result<Option<PlannedEdit>> {
        let parsed = self.parse(file).await?;
        let workspace = workspace_of(file)?;
        let selection = selector.to_range(&parsed)?;

        let edits = pipeline::run(
            &parsed.tree,
            selection,
            &parsed.file_name(),
            &self.resolver,
            &workspace,
            &self.config,
        )
        .await
        .with_context(|| format!("Failed to plan split of {}", file.display()))?;

        match edits {
            Some(edits) => Ok(Some(PlannedEdit::new(parsed.content_hash, edits))),
            None => {
                info!("No refactoring offered at the selection in {}", file.display());
                Ok(None)
            }
        }
    }

    /// Plan and write the edits for `selector`
    pub async fn apply(&mut self, file: &Path, selector: &Selector, dry_run: bool) -> Result<Option<PlannedEdit>> {
        let Some(plan) = self.plan(file, selector).await? else {
            return Ok(None);
        };

        if dry_run {
            info!("Dry run: not writing {}", plan.edits.created_file());
        } else {
            let written = workspace_of(file)?.apply(&plan)?;
            info!("✅ Updated {} file(s)", written.len());
        }

        Ok(Some(plan))
    }

    /// Move every relocatable type out of `file`, then rename the file if the
    /// type left behind does not match its name
    pub async fn split_all(&mut self, file: &Path, dry_run: bool) -> Result<Vec<EditSet>> {
        let workspace = workspace_of(file)?;
        let mut text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let mut path = file.to_path_buf();
        let mut created = BTreeSet::new();
        let mut applied = Vec::new();

        loop {
            let parsed = self.parser.parse_source(&path, text.clone())?;
            let file_name = parsed.file_name();
            let actions = selection::available_actions(&parsed.tree, &file_name, &self.config.parsing.default_extension);

            let Some(action) = actions.into_iter().next() else {
                break;
            };

            let files = PendingFiles { base: &workspace, created: &created };
            let edits = pipeline::execute(&parsed.tree, &action, &file_name, &self.resolver, &files, &self.config)
                .await
                .with_context(|| format!("Failed to split {} out of {}", action.site.declaration.identifier, file_name))?;

            if !dry_run {
                workspace.apply(&PlannedEdit::new(parsed.content_hash.clone(), edits.clone()))?;
            }

            created.insert(edits.created_file().to_string());

            match &edits {
                EditSet::Move { original_file, .. } => text = original_file.text.clone(),
                EditSet::Rename { new_name, .. } => path = workspace.path_of(new_name),
            }

            let renamed = matches!(edits, EditSet::Rename { .. });
            applied.push(edits);
            if renamed {
                break;
            }
        }

        if applied.is_empty() {
            warn!("Nothing to split in {}", file.display());
        } else {
            info!("Produced {} edit(s) for {}", applied.len(), file.display());
        }

        Ok(applied)
    }

    async fn parse(&mut self, file: &Path) -> Result<ParsedFile> {
        let parsed = self.parser.parse_file(file).await
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", file.display(), e))?;

        if parsed.tree.has_errors {
            warn!("{} contains syntax errors", file.display());
        }

        Ok(parsed)
    }
}

fn workspace_of(file: &Path) -> Result<Workspace> {
    let directory = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(Workspace::new(directory)?)
}

/// Files on disk plus the ones a dry run would have created
struct PendingFiles<'a> {
    base: &'a Workspace,
    created: &'a BTreeSet<String>,
}

impl FileSet for PendingFiles<'_> {
    fn contains(&self, name: &str) -> bool {
        self.created.iter().any(|created| created.eq_ignore_ascii_case(name))
            || FileSet::contains(self.base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SOURCE: &str = "namespace App\n{\n    public class Alpha { }\n\n    public class Beta { }\n}\n";

    async fn engine() -> Engine {
        Engine::new(Some(Path::new("no-such-config.toml")), None).await.unwrap()
    }

    #[test]
    fn test_offset_of_position() {
        let text = "ab\r\ncdé\nf";
        assert_eq!(offset_of_position(text, 1, 1), Some(0));
        assert_eq!(offset_of_position(text, 2, 3), Some(6));
        assert_eq!(offset_of_position(text, 2, 4), Some(8));
        assert_eq!(offset_of_position(text, 3, 1), Some(9));
        assert_eq!(offset_of_position(text, 2, 9), None);
        assert_eq!(offset_of_position(text, 7, 1), None);
        assert_eq!(offset_of_position(text, 0, 1), None);
    }

    #[tokio::test]
    async fn test_list() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Alpha.cs");
        fs::write(&file, SOURCE).unwrap();

        let listings = engine().await.list(&file).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].identifier, "Alpha");
        assert_eq!(listings[0].action, None);
        assert_eq!(listings[1].namespace, "App");
        assert_eq!(listings[1].action, Some(ActionKind::Move));
        assert_eq!(listings[1].target_file.as_deref(), Some("Beta.cs"));
    }

    #[tokio::test]
    async fn test_plan_by_type_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Alpha.cs");
        fs::write(&file, SOURCE).unwrap();

        let plan = engine().await
            .plan(&file, &Selector::Type("Beta".to_string()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(plan.edits.created_file(), "Beta.cs");
        assert!(!dir.path().join("Beta.cs").exists());
        assert_eq!(fs::read_to_string(&file).unwrap(), SOURCE);
    }

    #[tokio::test]
    async fn test_unknown_type_selector() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Alpha.cs");
        fs::write(&file, SOURCE).unwrap();

        let result = engine().await.plan(&file, &Selector::Type("Gamma".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_split_all_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Misc.cs");
        fs::write(&file, "class One { }\n\nclass Two { }\n\nclass Three { }\n").unwrap();

        let edits = engine().await.split_all(&file, true).await.unwrap();
        let created: Vec<&str> = edits.iter().map(|edits| edits.created_file()).collect();

        assert_eq!(created, vec!["One.cs", "Two.cs", "Three.cs"]);
        assert!(matches!(edits[2], EditSet::Rename { .. }));
        assert!(!dir.path().join("One.cs").exists());
    }

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine().await;

        let written = engine.init(dir.path(), false).await.unwrap();
        assert_eq!(written, dir.path().join("Typesplit.toml"));

        let loaded = Config::load(&written).unwrap();
        assert_eq!(loaded.format.namespace_style, engine.config().format.namespace_style);
        assert_eq!(loaded.parsing.default_extension, engine.config().parsing.default_extension);
    }

    #[tokio::test]
    async fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Typesplit.toml");
        fs::write(&existing, "[format]\n").unwrap();
        let engine = engine().await;

        assert!(engine.init(dir.path(), false).await.is_err());
        assert_eq!(fs::read_to_string(&existing).unwrap(), "[format]\n");

        engine.init(dir.path(), true).await.unwrap();
        assert!(Config::load(&existing).is_ok());
    }
}
