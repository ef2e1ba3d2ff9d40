// src/core/pruner.rs
use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::config::PruningConfig;
use crate::error::{Result, SplitError};
use super::resolver::SemanticResolver;
use super::syntax::{ImportPath, SourceTree};

/// Removes the import directives a resolver reports as unused or redundant
pub struct ImportPruner<'r> {
    resolver: &'r dyn SemanticResolver,
    enabled: bool,

    /// Import targets that are never removed
    keep: Vec<Regex>,
}

impl<'r> ImportPruner<'r> {
    pub fn new(resolver: &'r dyn SemanticResolver, config: &PruningConfig) -> Result<Self> {
        let keep = config.keep_imports.iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| SplitError::Config(format!("Invalid keep_imports pattern '{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            resolver,
            enabled: config.enabled,
            keep,
        })
    }

    /// Tree without the directives the resolver flags for this exact tree.
    /// Running it on its own output changes nothing.
    pub async fn prune(&self, tree: &SourceTree) -> Result<SourceTree> {
        if !self.enabled {
            return Ok(tree.clone());
        }

        let diagnostics = self.resolver.import_diagnostics(tree).await?;
        if diagnostics.is_empty() {
            return Ok(tree.clone());
        }

        let spans = tree.import_spans();
        let mut remove = HashSet::new();

        for diagnostic in &diagnostics {
            let Some((path, _)) = spans.iter()
                .find(|(_, span)| span.start <= diagnostic.span.start && diagnostic.span.start < span.end)
            else {
                debug!("No import directive at {:?}; ignoring diagnostic", diagnostic.span);
                continue;
            };

            if self.is_kept(tree, path) {
                continue;
            }

            debug!("{:?}: {}", diagnostic.kind, diagnostic.message);
            remove.insert(path.clone());
        }

        if remove.is_empty() {
            return Ok(tree.clone());
        }

        debug!("Removing {} import directive(s)", remove.len());
        Ok(tree.without_imports(&remove))
    }

    /// Directives matching `keep_imports`, and directives whose leading trivia
    /// holds a preprocessor line that would go with them
    fn is_kept(&self, tree: &SourceTree, path: &ImportPath) -> bool {
        tree.import_at(path).is_some_and(|import| {
            import.trivia.has_directive() || self.keep.iter().any(|pattern| pattern.is_match(&import.target))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::core::languages::{CSharpParser, LanguageParser};
    use crate::core::resolver::{IndexResolver, SymbolIndex};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn parse(source: &str) -> SourceTree {
        CSharpParser::new().unwrap().parse(source, Path::new("Test.cs")).unwrap()
    }

    fn resolver() -> IndexResolver {
        IndexResolver::new(SymbolIndex::from_config(&ResolverConfig::default()))
    }

    const HEADER_AND_IMPORTS: &str = r#"// <auto-generated>
// Header survives pruning
// </auto-generated>

using System;
using System.IO;
using System.Linq;
using System.Text;

namespace Tools
{
    public class Reader
    {
        public string Load(string path) => File.ReadAllText(path);
    }
}
"#;

    #[tokio::test]
    async fn test_prune_keeps_header_and_order() {
        let resolver = resolver();
        let pruner = ImportPruner::new(&resolver, &PruningConfig::default()).unwrap();

        let pruned = pruner.prune(&parse(HEADER_AND_IMPORTS)).await.unwrap();

        assert_eq!(pruned.to_text(), r#"// <auto-generated>
// Header survives pruning
// </auto-generated>

using System.IO;

namespace Tools
{
    public class Reader
    {
        public string Load(string path) => File.ReadAllText(path);
    }
}
"#);
    }

    #[tokio::test]
    async fn test_prune_is_idempotent() {
        let resolver = resolver();
        let pruner = ImportPruner::new(&resolver, &PruningConfig::default()).unwrap();

        let sources = [
            HEADER_AND_IMPORTS,
            "using System.IO;\nusing System.IO;\nusing Vendor.Lib;\n\nclass A\n{\n    Stream s;\n}\n",
            "class Empty { }\n",
        ];

        for source in sources {
            let once = pruner.prune(&parse(source)).await.unwrap();
            let twice = pruner.prune(&once).await.unwrap();
            assert_eq!(twice, once);
            assert_eq!(twice.to_text(), once.to_text());
        }
    }

    #[tokio::test]
    async fn test_prune_removes_duplicates_only_once() {
        let resolver = resolver();
        let pruner = ImportPruner::new(&resolver, &PruningConfig::default()).unwrap();

        let source = "using System.IO;\nusing System.IO;\n\nclass A\n{\n    Stream s;\n}\n";
        let pruned = pruner.prune(&parse(source)).await.unwrap();
        assert_eq!(pruned.to_text(), "using System.IO;\n\nclass A\n{\n    Stream s;\n}\n");
    }

    #[tokio::test]
    async fn test_keep_patterns_and_disabled() {
        let resolver = resolver();
        let source = "using System;\nusing System.Text;\n\nclass A { }\n";

        let keep_system = PruningConfig {
            enabled: true,
            keep_imports: vec!["^System$".to_string()],
        };
        let pruned = ImportPruner::new(&resolver, &keep_system).unwrap()
            .prune(&parse(source)).await.unwrap();
        assert_eq!(pruned.to_text(), "using System;\n\nclass A { }\n");

        let disabled = PruningConfig {
            enabled: false,
            keep_imports: vec![],
        };
        let untouched = ImportPruner::new(&resolver, &disabled).unwrap()
            .prune(&parse(source)).await.unwrap();
        assert_eq!(untouched.to_text(), source);
    }

    #[tokio::test]
    async fn test_unlisted_type_keeps_imports() {
        let resolver = resolver();
        let pruner = ImportPruner::new(&resolver, &PruningConfig::default()).unwrap();

        // ApplicationException is missing from the System table
        let source = "using System;\nusing System.Linq;\n\nclass Guard\n{\n    void Fail() => throw new ApplicationException();\n}\n";
        let pruned = pruner.prune(&parse(source)).await.unwrap();
        assert_eq!(pruned.to_text(), source);

        // Once every name is accounted for the unused directive goes
        let source = "using System;\nusing System.Linq;\n\nclass Guard\n{\n    void Fail() => throw new InvalidOperationException();\n}\n";
        let pruned = pruner.prune(&parse(source)).await.unwrap();
        assert_eq!(pruned.to_text(), "using System;\n\nclass Guard\n{\n    void Fail() => throw new InvalidOperationException();\n}\n");
    }

    #[tokio::test]
    async fn test_directive_before_import_is_never_dropped() {
        let resolver = resolver();
        let pruner = ImportPruner::new(&resolver, &PruningConfig::default()).unwrap();

        let source = "using System.IO;\n#region Unused\nusing System.Text;\n#endregion\n\nclass A\n{\n    Stream s;\n}\n";
        let pruned = pruner.prune(&parse(source)).await.unwrap();
        assert_eq!(pruned.to_text(), source);
    }

    #[test]
    fn test_invalid_keep_pattern() {
        let resolver = resolver();
        let config = PruningConfig {
            enabled: true,
            keep_imports: vec!["(".to_string()],
        };
        assert!(matches!(ImportPruner::new(&resolver, &config), Err(SplitError::Config(_))));
    }
}
