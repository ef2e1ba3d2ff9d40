use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tree_sitter::{Node, Parser};

use crate::core::syntax::{
    normalize_name, scan_trailing, split_header, Body, DirectiveParts, HasTrivia, ImportDirective, LineEnding,
    Member, Modifier, NamespaceDeclaration, NestedType, SourceTree, Trivia, TypeDeclaration, TypeKind,
    Verbatim,
};
use crate::error::{Result, SplitError};
use super::{LanguageParser, ScannedImport, UsageScan};

/// C#-specific parser using Tree-sitter
pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let csharp_language = tree_sitter_c_sharp::language();
        parser.set_language(&csharp_language)
            .map_err(|e| SplitError::Parser(format!("Failed to set C# language: {}", e)))?;

        Ok(Self { parser })
    }

    fn parse_tree(&mut self, content: &str) -> Result<tree_sitter::Tree> {
        self.parser.parse(content, None)
            .ok_or_else(|| SplitError::Parser("Failed to parse C# code".to_string()))
    }
}

impl LanguageParser for CSharpParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<SourceTree> {
        let tree = self.parse_tree(content)?;
        let root = tree.root_node();

        let lowering = Lowering { source: content };
        let children = significant_children(root);
        let mut body = lowering.body(&children, 0, content.len());
        let header = detach_header(&mut body);

        if root.has_error() {
            debug!("Syntax errors in {}", file_path.display());
        }

        Ok(SourceTree {
            header,
            body,
            line_ending: LineEnding::detect(content),
            has_errors: root.has_error(),
        })
    }

    fn scan_usage(&mut self, content: &str) -> Result<UsageScan> {
        let tree = self.parse_tree(content)?;
        let root = tree.root_node();

        let mut scanner = UsageScanner {
            source: content,
            scope: Vec::new(),
            namespace_names: Vec::new(),
            scan: UsageScan {
                has_errors: root.has_error(),
                ..UsageScan::default()
            },
        };
        scanner.visit(root);

        Ok(scanner.scan)
    }

    fn file_extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn language_name(&self) -> &str {
        "csharp"
    }
}

/// Comments are trivia, not nodes of the lowered tree
fn is_comment(kind: &str) -> bool {
    kind == "comment"
}

fn is_directive(kind: &str) -> bool {
    kind.starts_with("preproc")
}

fn is_import(kind: &str) -> bool {
    matches!(kind, "using_directive" | "extern_alias_directive")
}

fn significant_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| !is_comment(child.kind()))
        .collect()
}

/// The `{` and closing `}` of a declaration body
fn braces<'t>(list: Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
    let mut cursor = list.walk();
    let children: Vec<Node> = list.children(&mut cursor).collect();
    let open = children.iter().find(|c| c.kind() == "{").copied()?;
    let close = children.iter().rev().find(|c| c.kind() == "}" && !c.is_missing()).copied()?;
    Some((open, close))
}

fn is_string_kind(kind: &str) -> bool {
    matches!(
        kind,
        "string_literal"
            | "verbatim_string_literal"
            | "raw_string_literal"
            | "interpolated_string_expression"
    )
}

/// Move the leading trivia of the first node into the file header
fn detach_header(body: &mut Body) -> String {
    if let Some(first) = body.prelude.first_mut() {
        let (header, leading) = split_header(&first.trivia.leading, false);
        first.trivia.leading = leading;
        return header;
    }

    if let Some(first) = body.imports.first_mut() {
        let (header, leading) = split_header(&first.trivia.leading, false);
        first.trivia.leading = leading;
        return header;
    }

    if let Some(first) = body.members.first_mut() {
        let member = Arc::make_mut(first);
        let is_type = matches!(member, Member::Type(_));
        let trivia = member.trivia_mut();
        let (header, leading) = split_header(&trivia.leading, is_type);
        trivia.leading = leading;
        return header;
    }

    String::new()
}

/// Converts tree-sitter nodes into the persistent tree, assigning every byte
/// of the source to exactly one piece of text
struct Lowering<'s> {
    source: &'s str,
}

impl<'s> Lowering<'s> {
    fn slice(&self, start: usize, end: usize) -> String {
        self.source[start..end.max(start)].to_string()
    }

    fn text(&self, node: Node) -> String {
        self.source[node.byte_range()].to_string()
    }

    /// Lower the nodes that occupy the byte region `start..end`
    fn body(&self, nodes: &[Node], start: usize, end: usize) -> Body {
        let mut body = Body::default();
        let mut cursor = start;
        let mut index = 0;

        // Directives among the imports stay in the trivia of the next node
        let last_import = nodes.iter().rposition(|node| is_import(node.kind()));

        while index < nodes.len() {
            let node = nodes[index];
            if is_directive(node.kind()) && last_import.is_some_and(|last| index < last) {
                index += 1;
                continue;
            }

            let node_start = node.start_byte().max(cursor);
            let node_end = node.end_byte().max(node_start);
            let leading = self.slice(cursor, node_start);

            if node.kind() == "file_scoped_namespace_declaration" {
                // Everything after `namespace X;` belongs to the namespace
                let namespace = self.file_scoped_namespace(node, leading, &nodes[index + 1..], end);
                body.members.push(Arc::new(Member::Namespace(namespace)));
                cursor = end;
                break;
            }

            let trailing_end = scan_trailing(self.source, node_end, end);
            let trivia = Trivia::new(leading, self.slice(node_end, trailing_end));
            let text = self.slice(node_start, node_end);

            match node.kind() {
                "extern_alias_directive" if body.imports.is_empty() && body.members.is_empty() => {
                    body.prelude.push(Verbatim {
                        trivia,
                        kind: node.kind().to_string(),
                        text,
                    });
                }
                "using_directive" if body.members.is_empty() => {
                    body.imports.push(ImportDirective::from_text(&text, trivia));
                }
                "namespace_declaration" => {
                    body.members.push(Arc::new(self.block_namespace(node, trivia, text)));
                }
                kind => {
                    let member = match TypeKind::from_node_kind(kind) {
                        Some(type_kind) => Member::Type(self.type_declaration(node, type_kind, trivia, text, node_start)),
                        None => Member::Other(Verbatim {
                            trivia,
                            kind: kind.to_string(),
                            text,
                        }),
                    };
                    body.members.push(Arc::new(member));
                }
            }

            cursor = trailing_end;
            index += 1;
        }

        body.tail = self.slice(cursor.min(end), end);
        body
    }

    fn block_namespace(&self, node: Node, trivia: Trivia, text: String) -> Member {
        let name = node.child_by_field_name("name")
            .map(|n| normalize_name(&self.text(n)))
            .unwrap_or_default();

        let Some(list) = node.child_by_field_name("body") else {
            return Member::Other(Verbatim { trivia, kind: node.kind().to_string(), text });
        };

        let Some((open_brace, close_brace)) = braces(list) else {
            return Member::Other(Verbatim { trivia, kind: node.kind().to_string(), text });
        };

        let inner_start = open_brace.end_byte();
        let inner_end = close_brace.start_byte();
        let open_end = scan_trailing(self.source, inner_start, inner_end);

        let inner: Vec<Node> = significant_children(list).into_iter()
            .filter(|c| c.start_byte() >= inner_start && c.end_byte() <= inner_end)
            .collect();

        Member::Namespace(NamespaceDeclaration {
            trivia,
            name,
            file_scoped: false,
            open: self.slice(node.start_byte(), open_end),
            body: self.body(&inner, open_end, inner_end),
            close: self.slice(inner_end, node.end_byte()),
        })
    }

    fn file_scoped_namespace(&self, node: Node, leading: String, rest: &[Node], end: usize) -> NamespaceDeclaration {
        let name = node.child_by_field_name("name")
            .map(|n| normalize_name(&self.text(n)))
            .unwrap_or_default();

        let children = significant_children(node);
        let header_end = children.iter()
            .find(|c| c.kind() == ";")
            .map(|c| c.end_byte())
            .unwrap_or_else(|| node.end_byte());
        let open_end = scan_trailing(self.source, header_end, end);

        // Members may be children of the namespace node or its following siblings
        let mut inner: Vec<Node> = children.into_iter()
            .filter(|c| c.start_byte() >= header_end)
            .collect();
        inner.extend(rest.iter().copied());

        NamespaceDeclaration {
            trivia: Trivia::new(leading, ""),
            name,
            file_scoped: true,
            open: self.slice(node.start_byte(), open_end),
            body: self.body(&inner, open_end, end),
            close: String::new(),
        }
    }

    /// `start` is the offset of `text` in the source
    fn type_declaration(&self, node: Node, kind: TypeKind, trivia: Trivia, text: String, start: usize) -> TypeDeclaration {
        let identifier = node.child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();

        let mut modifiers = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let candidate = if child.kind() == "modifier" {
                self.text(child)
            } else if !child.is_named() {
                child.kind().to_string()
            } else {
                continue;
            };

            if let Some(modifier) = Modifier::parse(&candidate) {
                modifiers.push(modifier);
            }
        }

        let nested = node.child_by_field_name("body")
            .map(|list| self.nested_types(list, start))
            .unwrap_or_default();

        let mut rows = BTreeSet::new();
        collect_verbatim_rows(node, node.start_position().row, &mut rows);

        TypeDeclaration {
            trivia,
            kind,
            identifier,
            modifiers,
            text,
            nested,
            verbatim_rows: rows.into_iter().collect(),
        }
    }

    /// Types declared in a type body. Offsets are relative to `base`, the
    /// start of the enclosing declaration's text.
    fn nested_types(&self, list: Node, base: usize) -> Vec<NestedType> {
        let Some((open_brace, close_brace)) = braces(list) else {
            return Vec::new();
        };

        let inner_end = close_brace.start_byte();
        let mut cursor = list.walk();
        let members: Vec<Node> = list.named_children(&mut cursor)
            .filter(|c| !is_comment(c.kind()))
            .filter(|c| c.start_byte() >= open_brace.end_byte() && c.end_byte() <= inner_end)
            .collect();

        let mut nested = Vec::new();
        let mut previous_end = scan_trailing(self.source, open_brace.end_byte(), inner_end);

        for (position, member) in members.iter().enumerate() {
            let member_start = member.start_byte().max(previous_end);
            let member_end = member.end_byte().max(member_start);
            let trailing_end = scan_trailing(self.source, member_end, inner_end);

            if let Some(kind) = TypeKind::from_node_kind(member.kind()) {
                let trivia = Trivia::new(
                    self.slice(previous_end, member_start),
                    self.slice(member_end, trailing_end),
                );
                let text = self.slice(member_start, member_end);
                nested.push(NestedType {
                    range: (previous_end - base)..(trailing_end - base),
                    first: position == 0,
                    last: position + 1 == members.len(),
                    declaration: self.type_declaration(*member, kind, trivia, text, member_start),
                });
            }

            previous_end = trailing_end;
        }

        nested
    }
}

/// Rows that begin inside a multi-line string literal, relative to `base_row`
fn collect_verbatim_rows(node: Node, base_row: usize, rows: &mut BTreeSet<usize>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if is_string_kind(child.kind()) {
            let first = child.start_position().row;
            let last = child.end_position().row;
            for row in (first + 1)..=last {
                rows.insert(row - base_row);
            }
        } else if child.child_count() > 0 {
            collect_verbatim_rows(child, base_row, rows);
        }
    }
}

/// Whether `child` is the name a declaration introduces
fn is_declaration_name(parent: Node, child: Node) -> bool {
    let kind = parent.kind();
    let declares = kind.ends_with("_declaration")
        || matches!(
            kind,
            "variable_declarator" | "parameter" | "type_parameter" | "local_function_statement"
                | "foreach_statement" | "catch_declaration" | "tuple_element" | "single_variable_designation"
        );

    if !declares {
        return false;
    }

    if parent.child_by_field_name("name") == Some(child) || parent.child_by_field_name("left") == Some(child) {
        return true;
    }

    // Declarators and designations without a `name` field lead with the identifier
    matches!(kind, "variable_declarator" | "single_variable_designation")
        && child.kind() == "identifier"
        && parent.named_child(0) == Some(child)
}

/// Whether the identifier `child` of `parent` names a member rather than a
/// type: `B` in `a.B`, `a?.B`, `A.B` qualified names, named arguments and
/// object initializer targets
fn is_member_name(parent: Node, child: Node) -> bool {
    // `B<T>` in `a.B<T>`: look one level up
    let (name, holder) = if parent.kind() == "generic_name" {
        match parent.parent() {
            Some(grandparent) => (parent, grandparent),
            None => return false,
        }
    } else {
        (child, parent)
    };

    match holder.kind() {
        "member_access_expression" | "member_binding_expression" | "qualified_name" | "alias_qualified_name" => {
            holder.child_by_field_name("name") == Some(name)
        }
        "name_equals" | "name_colon" => true,
        "assignment_expression" => {
            holder.child_by_field_name("left") == Some(name)
                && holder.parent().is_some_and(|p| p.kind() == "initializer_expression")
        }
        _ => false,
    }
}

/// Walks a syntax tree collecting identifiers, declarations and import directives
struct UsageScanner<'s> {
    source: &'s str,

    /// Start offsets of the enclosing namespace declarations
    scope: Vec<usize>,

    /// Names of the enclosing namespace declarations
    namespace_names: Vec<String>,

    scan: UsageScan,
}

impl UsageScanner<'_> {
    fn visit(&mut self, node: Node) {
        let mut opened = 0;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_child(node, child, &mut opened);
        }
        self.leave(opened);
    }

    fn visit_child(&mut self, parent: Node, child: Node, opened: &mut usize) {
        if is_declaration_name(parent, child) {
            self.declare(child);
            return;
        }

        match child.kind() {
            "using_directive" => {
                self.scan.imports.push(ScannedImport {
                    span: child.byte_range(),
                    parts: DirectiveParts::parse(&self.source[child.byte_range()]),
                    scope: self.scope.clone(),
                });
            }
            "namespace_declaration" => {
                self.enter(child);
                self.visit(child);
                self.leave(1);
            }
            "file_scoped_namespace_declaration" => {
                // Scopes the rest of the file, including later siblings
                self.enter(child);
                *opened += 1;
                self.visit(child);
            }
            "identifier" => self.reference(parent, child),
            kind if is_comment(kind) => {}
            kind if is_directive(kind) => self.visit_directive(child),
            _ => self.visit(child),
        }
    }

    /// Code inside `#if` regions counts; the directive's own condition does not
    fn visit_directive(&mut self, node: Node) {
        let condition = node.child_by_field_name("condition");
        let mut opened = 0;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) == condition || child.kind() == "identifier" || child.kind() == "preproc_arg" {
                continue;
            }
            self.visit_child(node, child, &mut opened);
        }
        self.leave(opened);
    }

    fn enter(&mut self, namespace: Node) {
        let name = namespace.child_by_field_name("name")
            .map(|n| normalize_name(&self.source[n.byte_range()]))
            .unwrap_or_default();

        self.scope.push(namespace.start_byte());
        self.namespace_names.push(name);
        self.scan.namespaces.push(self.namespace_names.join("."));
    }

    fn leave(&mut self, count: usize) {
        for _ in 0..count {
            self.scope.pop();
            self.namespace_names.pop();
        }
    }

    fn declare(&mut self, node: Node) {
        if node.kind() == "identifier" {
            self.scan.declared.insert(self.source[node.byte_range()].to_string());
            return;
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.declare(child);
        }
    }

    fn reference(&mut self, parent: Node, identifier: Node) {
        let name = self.source[identifier.byte_range()].trim_start_matches('@').to_string();

        if name.starts_with(|c: char| c.is_uppercase()) && !is_member_name(parent, identifier) {
            self.scan.type_references.insert(name.clone());
        }
        self.scan.identifiers.insert(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> SourceTree {
        let mut parser = CSharpParser::new().unwrap();
        parser.parse(source, Path::new("Test.cs")).unwrap()
    }

    const TWO_TYPES: &str = r#"// Copyright (c) Contoso

using System;
using System.Collections.Generic;

namespace Contoso.Billing
{
    /// <summary>An invoice.</summary>
    public class Invoice
    {
        public List<string> Lines { get; } = new List<string>();
    }

    internal sealed class Ledger
    {
        public DateTime Opened { get; set; }
    }
}
"#;

    #[test]
    fn test_round_trip_is_exact() {
        let sources = [
            TWO_TYPES,
            "",
            "class A { } class B { }",
            "namespace N;\n\nusing System;\n\npublic record Point(int X, int Y);\n",
            "using System;\r\n\r\nnamespace N\r\n{\r\n    class A\r\n    {\r\n    }\r\n}\r\n",
            "extern alias Legacy;\nusing System;\n[assembly: System.CLSCompliant(true)]\nclass A {}\n// trailing comment\n",
        ];

        for source in sources {
            assert_eq!(parse(source).to_text(), source);
        }
    }

    #[test]
    fn test_lowering_structure() {
        let tree = parse(TWO_TYPES);

        assert_eq!(tree.header, "// Copyright (c) Contoso\n\n");
        assert_eq!(tree.body.imports.len(), 2);
        assert_eq!(tree.body.imports[1].target, "System.Collections.Generic");
        assert!(!tree.has_errors);

        let types = tree.type_declarations();
        assert_eq!(types.len(), 2);

        let (path, invoice) = &types[0];
        assert_eq!(invoice.identifier, "Invoice");
        assert_eq!(invoice.kind, TypeKind::Class);
        assert_eq!(invoice.modifiers, vec![Modifier::Public]);
        assert!(invoice.trivia.leading.contains("/// <summary>An invoice.</summary>"));
        assert!(invoice.nested.is_empty());
        assert_eq!(tree.namespace_of(path), Some(vec!["Contoso.Billing"]));

        let (_, ledger) = &types[1];
        assert_eq!(ledger.modifiers, vec![Modifier::Internal, Modifier::Sealed]);
    }

    #[test]
    fn test_nested_namespaces_and_nested_types() {
        let source = "namespace Outer\n{\n    namespace Inner\n    {\n        public class Shell\n        {\n            private class Core { }\n        }\n    }\n}\n";
        let tree = parse(source);

        let types = tree.type_declarations();
        assert_eq!(types.len(), 1, "nested types are not top-level declarations");
        assert_eq!(tree.namespace_of(&types[0].0), Some(vec!["Outer", "Inner"]));

        let shell = types[0].1;
        assert_eq!(shell.nested.len(), 1);
        let core = &shell.nested[0];
        assert_eq!(core.declaration.identifier, "Core");
        assert!(core.declaration.is_private());
        assert!(core.first && core.last);
        assert_eq!(&shell.text[core.span()], "private class Core { }");
        assert_eq!(tree.type_count(), 2);
    }

    #[test]
    fn test_nested_type_offsets() {
        let source = "class Outer\n{\n    int a;\n\n    /// Doc\n    public class Inner\n    {\n        int x;\n    }\n\n    public enum Mode { On }\n}\n";
        let tree = parse(source);
        let outer = tree.type_declarations()[0].1;

        assert_eq!(outer.nested.len(), 2);
        let inner = &outer.nested[0];
        assert!(!inner.first && !inner.last);
        assert_eq!(inner.declaration.trivia.leading, "\n    /// Doc\n    ");
        assert_eq!(
            &outer.text[inner.range.clone()],
            "\n    /// Doc\n    public class Inner\n    {\n        int x;\n    }\n"
        );

        let mode = &outer.nested[1];
        assert!(mode.last);
        assert_eq!(&outer.text[mode.span()], "public enum Mode { On }");
    }

    #[test]
    fn test_directives_keep_their_place() {
        let source = "using System;\n\n#region Models\npublic class A { }\n#endregion\n\n#if DEBUG\npublic class Dbg { }\n#endif\n\npublic class B { }\n";
        let tree = parse(source);

        assert_eq!(tree.to_text(), source);
        let names: Vec<&str> = tree.type_declarations().into_iter()
            .map(|(_, declaration)| declaration.identifier.as_str())
            .collect();
        assert!(names.contains(&"A"));
        assert!(names.contains(&"B"));
        // Directive lines are never part of a type's trivia
        for (_, declaration) in tree.type_declarations() {
            assert!(!declaration.trivia.leading.contains('#'), "{:?}", declaration.trivia.leading);
        }
    }

    #[test]
    fn test_directive_among_imports_stays_trivia() {
        let source = "#nullable enable\nusing System;\n#region Json\nusing System.Text.Json;\n#endregion\n\nclass A { }\n";
        let tree = parse(source);

        assert_eq!(tree.to_text(), source);
        assert_eq!(tree.header, "#nullable enable\n");
        assert_eq!(tree.body.imports.len(), 2);
        assert!(tree.body.imports[1].trivia.has_directive());
        assert_eq!(tree.top_level_type_count(), 1);
    }

    #[test]
    fn test_file_scoped_namespace() {
        let source = "namespace Shop.Orders;\n\npublic class Order { }\n\npublic enum Status { Open, Closed }\n";
        let tree = parse(source);

        let types = tree.type_declarations();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].1.kind, TypeKind::Enum);
        assert_eq!(tree.namespace_of(&types[0].0), Some(vec!["Shop.Orders"]));
        assert_eq!(tree.to_text(), source);
    }

    #[test]
    fn test_type_spans_point_at_declarations() {
        let tree = parse(TWO_TYPES);
        let text = tree.to_text();

        let spans = tree.type_spans();
        assert_eq!(spans.len(), 2);
        assert!(text[spans[0].1.clone()].starts_with("public class Invoice"));
        assert!(text[spans[1].1.clone()].starts_with("internal sealed class Ledger"));

        let imports = tree.import_spans();
        assert_eq!(&text[imports[0].1.clone()], "using System;");
    }

    #[test]
    fn test_verbatim_rows() {
        let source = "class Sql\n{\n    const string Query = @\"\nSELECT *\n  FROM t\";\n}\n";
        let tree = parse(source);
        let decl = tree.type_declarations()[0].1;
        assert_eq!(decl.verbatim_rows, vec![3, 4]);
    }

    #[test]
    fn test_scan_usage() {
        let mut parser = CSharpParser::new().unwrap();
        let scan = parser.scan_usage(TWO_TYPES).unwrap();

        assert!(scan.identifiers.contains("List"));
        assert!(scan.identifiers.contains("DateTime"));
        // Declared names are not references
        assert!(!scan.identifiers.contains("Invoice"));
        assert!(!scan.identifiers.contains("Contoso"));

        assert_eq!(scan.imports.len(), 2);
        assert_eq!(scan.imports[0].parts.target, "System");
        assert!(scan.imports[0].scope.is_empty());
    }

    #[test]
    fn test_scan_type_references() {
        let mut parser = CSharpParser::new().unwrap();
        let source = r#"namespace Shop.Orders
{
    public class Order<TKey>
    {
        public IServiceProvider Services { get; set; }
        public void Run(Basket basket)
        {
            var total = basket.Total;
            Console.WriteLine(new Receipt { Amount = total });
            System.Threading.Tasks.Task.Run(() => Save(Named: 1));
        }
        void Save(int Named) { }
    }
}
"#;
        let scan = parser.scan_usage(source).unwrap();

        for name in ["IServiceProvider", "Basket", "Console", "Receipt", "System", "Save"] {
            assert!(scan.type_references.contains(name), "{} should be a reference", name);
        }
        for name in ["Total", "WriteLine", "Amount", "Threading", "Tasks", "Task", "Named", "Order", "Services", "TKey"] {
            assert!(!scan.type_references.contains(name), "{} should not be a reference", name);
        }

        assert!(scan.declared.contains("Order"));
        assert!(scan.declared.contains("TKey"));
        assert!(scan.declared.contains("basket"));
        assert_eq!(scan.namespaces, vec!["Shop.Orders".to_string()]);
    }

    #[test]
    fn test_scan_sees_code_inside_conditional_regions() {
        let mut parser = CSharpParser::new().unwrap();
        let source = "using System.Diagnostics;\n\nclass A\n{\n#if DEBUG\n    Stopwatch watch;\n#endif\n}\n";
        let scan = parser.scan_usage(source).unwrap();

        assert!(scan.type_references.contains("Stopwatch"));
        assert!(!scan.type_references.contains("DEBUG"));
        assert_eq!(scan.imports.len(), 1);
    }

    #[test]
    fn test_attribute_reference() {
        let mut parser = CSharpParser::new().unwrap();
        let scan = parser.scan_usage("[Serializable]\npublic class Token { }\n").unwrap();
        assert!(scan.references("SerializableAttribute"));
        assert!(!scan.references("ObsoleteAttribute"));
    }
}
