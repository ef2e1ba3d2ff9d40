// src/core/selection.rs
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::syntax::{DeclarationSite, SourceTree};

/// What to do with the selected type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Extract the type into a new file, leaving its siblings behind
    Move,
    /// The type is alone in its file; give the file the type's name
    Rename,
}

impl ActionKind {
    pub fn title(&self) -> &'static str {
        match self {
            ActionKind::Move => "Move type to file",
            ActionKind::Rename => "Rename file to match type name",
        }
    }
}

/// A refactoring offered for a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub site: DeclarationSite,

    /// `<Identifier>.<ext>`
    pub file_name: String,
}

/// File name a type declaration should live in
pub fn expected_file_name(identifier: &str, extension: &str) -> String {
    format!("{}.{}", identifier, extension)
}

/// Decide whether the selection offers an action for the innermost type
/// declaration containing it.
///
/// `default_extension` is used when `current_file_name` has no extension.
pub fn resolve(
    tree: &SourceTree,
    selection: Range<usize>,
    current_file_name: &str,
    default_extension: &str,
) -> Option<Action> {
    let spans = tree.type_spans();
    let (path, span) = spans.iter()
        .find(|(_, span)| span.start <= selection.start && selection.end <= span.end)?;

    let mut declaration = tree.type_at(path)?;
    let mut nesting = Vec::new();
    let mut base = span.start;
    while let Some((index, nested)) = declaration.nested.iter().enumerate().find(|(_, nested)| {
        let span = nested.span();
        base + span.start <= selection.start && selection.end <= base + span.end
    }) {
        nesting.push(index);
        base += nested.span().start;
        declaration = &nested.declaration;
    }

    let extension = Path::new(current_file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or(default_extension);
    let file_name = expected_file_name(&declaration.identifier, extension);

    if file_name.to_lowercase() == current_file_name.to_lowercase() {
        return None;
    }

    if declaration.is_private() {
        return None;
    }

    // A nested type always leaves its container behind
    let kind = if !nesting.is_empty() || spans.len() > 1 {
        ActionKind::Move
    } else {
        ActionKind::Rename
    };

    Some(Action {
        kind,
        site: DeclarationSite {
            path: path.clone(),
            nesting,
            declaration: declaration.clone(),
        },
        file_name,
    })
}

/// Every action offered by the file, one per top-level type, in document order
pub fn available_actions(tree: &SourceTree, current_file_name: &str, default_extension: &str) -> Vec<Action> {
    tree.type_spans()
        .into_iter()
        .filter_map(|(_, span)| resolve(tree, span, current_file_name, default_extension))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::{CSharpParser, LanguageParser};

    fn parse(source: &str) -> SourceTree {
        CSharpParser::new().unwrap().parse(source, Path::new("bar.cs")).unwrap()
    }

    fn offset_of(source: &str, needle: &str) -> Range<usize> {
        let start = source.find(needle).unwrap();
        start..start
    }

    const TWO: &str = "namespace Demo\n{\n    public class Foo\n    {\n        int value;\n    }\n\n    public class Bar { }\n}\n";

    #[test]
    fn test_single_declaration_renames() {
        let source = "public class Foo\n{\n}\n";
        let tree = parse(source);

        let action = resolve(&tree, offset_of(source, "Foo"), "bar.cs", "cs").unwrap();
        assert_eq!(action.kind, ActionKind::Rename);
        assert_eq!(action.file_name, "Foo.cs");
    }

    #[test]
    fn test_two_declarations_move() {
        let tree = parse(TWO);

        let action = resolve(&tree, offset_of(TWO, "int value"), "bar.cs", "cs").unwrap();
        assert_eq!(action.kind, ActionKind::Move);
        assert_eq!(action.site.declaration.identifier, "Foo");
        assert_eq!(action.file_name, "Foo.cs");
    }

    #[test]
    fn test_nested_selection_moves_innermost_type() {
        let source = "namespace N\n{\n    public class Outer\n    {\n        public class Inner\n        {\n            int x;\n        }\n    }\n}\n";
        let tree = parse(source);

        let action = resolve(&tree, offset_of(source, "int x"), "Outer.cs", "cs").unwrap();
        assert_eq!(action.kind, ActionKind::Move);
        assert_eq!(action.site.declaration.identifier, "Inner");
        assert_eq!(action.site.nesting, vec![0]);
        assert_eq!(action.file_name, "Inner.cs");

        // Selecting the container itself still matches its file
        assert!(resolve(&tree, offset_of(source, "class Outer"), "Outer.cs", "cs").is_none());
    }

    #[test]
    fn test_private_nested_type_not_offered() {
        let source = "public class Outer\n{\n    private class Hidden\n    {\n        int x;\n    }\n}\n";
        let tree = parse(source);
        assert!(resolve(&tree, offset_of(source, "int x"), "Outer.cs", "cs").is_none());
    }

    #[test]
    fn test_matching_name_is_case_insensitive() {
        let tree = parse(TWO);
        assert!(resolve(&tree, offset_of(TWO, "Bar"), "BAR.CS", "cs").is_none());
        assert!(resolve(&tree, offset_of(TWO, "Bar"), "Other.cs", "cs").is_some());
    }

    #[test]
    fn test_private_never_offered() {
        let source = "private class Hidden { }\n\npublic class Shown { }\n";
        let tree = parse(source);

        assert!(resolve(&tree, offset_of(source, "Hidden"), "bar.cs", "cs").is_none());

        let single = "private class Hidden { }\n";
        assert!(resolve(&parse(single), offset_of(single, "Hidden"), "bar.cs", "cs").is_none());
    }

    #[test]
    fn test_outside_any_declaration() {
        let tree = parse(TWO);
        assert!(resolve(&tree, offset_of(TWO, "namespace"), "bar.cs", "cs").is_none());
        assert!(resolve(&tree, 0..TWO.len(), "bar.cs", "cs").is_none());
    }

    #[test]
    fn test_extension_follows_current_file() {
        let source = "class Foo { }\nclass Baz { }\n";
        let tree = parse(source);

        let action = resolve(&tree, offset_of(source, "Foo"), "legacy.CS", "cs").unwrap();
        assert_eq!(action.file_name, "Foo.CS");

        let action = resolve(&tree, offset_of(source, "Foo"), "Makefile", "cs").unwrap();
        assert_eq!(action.file_name, "Foo.cs");
    }

    #[test]
    fn test_available_actions() {
        let tree = parse(TWO);
        let actions = available_actions(&tree, "Bar.cs", "cs");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].site.declaration.identifier, "Foo");
    }
}
