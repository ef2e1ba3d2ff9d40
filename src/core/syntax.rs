// src/core/syntax.rs
//! Persistent syntax tree for one C# source file.
//!
//! The tree keeps every byte of the source it was lowered from: each node owns
//! its leading trivia (whitespace and comments before it), its own text, and its
//! trailing trivia (spaces, an optional line comment, and the end of line).
//! Serializing an unedited tree reproduces the original text exactly.
//!
//! Trees are values. Every transform returns a new tree; unchanged members are
//! shared between the old and new tree through `Arc`.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Line terminator style of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Non-semantic text attached to a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trivia {
    /// Whitespace and comments between the previous node and this one
    pub leading: String,

    /// Spaces, an optional `//` comment and the newline following the node
    pub trailing: String,
}

impl Trivia {
    pub fn new(leading: impl Into<String>, trailing: impl Into<String>) -> Self {
        Self {
            leading: leading.into(),
            trailing: trailing.into(),
        }
    }

    /// Whether a preprocessor line (`#if`, `#region`, ...) sits in the leading trivia
    pub fn has_directive(&self) -> bool {
        self.leading.lines().any(|line| line.trim_start().starts_with('#'))
    }
}

pub trait HasTrivia {
    fn trivia(&self) -> &Trivia;
    fn trivia_mut(&mut self) -> &mut Trivia;
}

/// A node kept as opaque text (extern aliases, global attributes, delegates, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verbatim {
    pub trivia: Trivia,
    pub kind: String,
    pub text: String,
}

/// Parsed shape of a `using` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveParts {
    pub target: String,
    pub alias: Option<String>,
    pub is_static: bool,
    pub is_global: bool,
}

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(global\s+)?using\s+(static\s+)?(?:(@?[A-Za-z_][A-Za-z0-9_]*)\s*=\s*)?(.+?)\s*;?$")
        .expect("Invalid using directive regex")
});

impl DirectiveParts {
    pub fn parse(text: &str) -> Self {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

        match DIRECTIVE_RE.captures(&collapsed) {
            Some(caps) => {
                let raw_target = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
                Self {
                    target: normalize_name(raw_target),
                    alias: caps.get(3).map(|m| m.as_str().to_string()),
                    is_static: caps.get(2).is_some(),
                    is_global: caps.get(1).is_some(),
                }
            }
            None => Self {
                target: normalize_name(collapsed.trim_end_matches(';')),
                alias: None,
                is_static: false,
                is_global: false,
            },
        }
    }
}

/// Strip whitespace and a leading `global::` qualifier from a dotted name
pub fn normalize_name(name: &str) -> String {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_start_matches("global::").to_string()
}

/// An import (`using`) directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub trivia: Trivia,

    /// Source text from `using` (or `global`) through the semicolon
    pub text: String,

    /// Imported namespace or type, whitespace removed
    pub target: String,

    pub alias: Option<String>,
    pub is_static: bool,
    pub is_global: bool,
}

impl ImportDirective {
    pub fn from_text(text: &str, trivia: Trivia) -> Self {
        let parts = DirectiveParts::parse(text);
        Self {
            trivia,
            text: text.to_string(),
            target: parts.target,
            alias: parts.alias,
            is_static: parts.is_static,
            is_global: parts.is_global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Record,
    RecordStruct,
}

impl TypeKind {
    /// Map a tree-sitter node kind onto a type declaration kind.
    /// Delegates are not type declarations here.
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(TypeKind::Class),
            "struct_declaration" => Some(TypeKind::Struct),
            "interface_declaration" => Some(TypeKind::Interface),
            "enum_declaration" => Some(TypeKind::Enum),
            "record_declaration" => Some(TypeKind::Record),
            "record_struct_declaration" => Some(TypeKind::RecordStruct),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Record => "record",
            TypeKind::RecordStruct => "record struct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Abstract,
    Sealed,
    Static,
    Partial,
    ReadOnly,
    Unsafe,
    New,
    File,
    Ref,
    Other(String),
}

impl Modifier {
    /// Returns None for text that is not a modifier keyword
    pub fn parse(text: &str) -> Option<Self> {
        let modifier = match text.trim() {
            "public" => Modifier::Public,
            "private" => Modifier::Private,
            "protected" => Modifier::Protected,
            "internal" => Modifier::Internal,
            "abstract" => Modifier::Abstract,
            "sealed" => Modifier::Sealed,
            "static" => Modifier::Static,
            "partial" => Modifier::Partial,
            "readonly" => Modifier::ReadOnly,
            "unsafe" => Modifier::Unsafe,
            "new" => Modifier::New,
            "file" => Modifier::File,
            "ref" => Modifier::Ref,
            "extern" | "virtual" | "override" | "volatile" | "async" | "const" | "required" => {
                Modifier::Other(text.trim().to_string())
            }
            _ => return None,
        };
        Some(modifier)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Internal => "internal",
            Modifier::Abstract => "abstract",
            Modifier::Sealed => "sealed",
            Modifier::Static => "static",
            Modifier::Partial => "partial",
            Modifier::ReadOnly => "readonly",
            Modifier::Unsafe => "unsafe",
            Modifier::New => "new",
            Modifier::File => "file",
            Modifier::Ref => "ref",
            Modifier::Other(text) => text,
        };
        f.write_str(text)
    }
}

/// A class, struct, interface, enum or record declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub trivia: Trivia,
    pub kind: TypeKind,
    pub identifier: String,
    pub modifiers: Vec<Modifier>,

    /// Source text of the declaration including attributes and body
    pub text: String,

    /// Types declared directly in the body, in document order
    pub nested: Vec<NestedType>,

    /// Rows of `text` (0 = first line) that start inside a multi-line string
    /// literal. Re-indenting must not touch them.
    pub verbatim_rows: Vec<usize>,
}

/// A type declared inside another type's body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedType {
    /// Bytes of the parent's `text` held by the declaration and its trivia
    pub range: Range<usize>,

    /// No member of the parent body precedes it
    pub first: bool,

    /// No member of the parent body follows it
    pub last: bool,

    pub declaration: TypeDeclaration,
}

impl NestedType {
    /// Bytes of the parent's `text` holding the declaration itself
    pub fn span(&self) -> Range<usize> {
        let start = self.range.start + self.declaration.trivia.leading.len();
        start..start + self.declaration.text.len()
    }
}

impl TypeDeclaration {
    pub fn has_modifier(&self, modifier: &Modifier) -> bool {
        self.modifiers.contains(modifier)
    }

    pub fn is_private(&self) -> bool {
        self.has_modifier(&Modifier::Private)
    }

    /// Comment lines directly attached above the declaration, trimmed
    pub fn attached_comments(&self) -> Vec<&str> {
        let leading = strip_blank_prefix(&self.trivia.leading);
        // The part after the last newline is the declaration's own indentation
        let complete = match leading.rfind('\n') {
            Some(pos) => &leading[..pos],
            None => "",
        };
        let mut lines: Vec<&str> = Vec::new();

        for line in complete.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                // A blank line detaches everything above it
                lines.clear();
            } else if trimmed.starts_with("//") {
                lines.push(trimmed);
            }
        }

        lines
    }

    /// The declaration `nesting` leads to, one index into `nested` per level
    pub fn nested_at(&self, nesting: &[usize]) -> Option<&TypeDeclaration> {
        match nesting.split_first() {
            None => Some(self),
            Some((&index, rest)) => self.nested.get(index)?.declaration.nested_at(rest),
        }
    }

    /// Number of types declared inside this one, at any depth
    pub fn nested_count(&self) -> usize {
        self.nested.iter().map(|nested| 1 + nested.declaration.nested_count()).sum()
    }

    /// Copy without the type `nesting` leads to. Separation follows the same
    /// rules as removing a member from a namespace body.
    pub fn without_nested(&self, nesting: &[usize]) -> Option<TypeDeclaration> {
        let (&index, rest) = nesting.split_first()?;
        let target = self.nested.get(index)?;

        if !rest.is_empty() {
            let inner = target.declaration.without_nested(rest)?;
            let replacement = format!("{}{}{}", inner.trivia.leading, inner.text, inner.trivia.trailing);
            let first_row = inner.trivia.leading.matches('\n').count();
            let rows = inner.verbatim_rows.iter().map(|row| row + first_row).collect();

            let start = target.range.start;
            let mut updated = self.splice(target.range.clone(), &replacement, rows);
            updated.nested[index] = NestedType {
                range: start..start + replacement.len(),
                first: target.first,
                last: target.last,
                declaration: inner,
            };
            return Some(updated);
        }

        let own = blank_prefix(&target.declaration.trivia.leading);
        let next = blank_prefix(&self.text[target.range.end..]);
        let separation = if target.last || (!target.first && next.matches('\n').count() > own.matches('\n').count()) {
            next
        } else {
            own
        };

        let removed = target.range.start..target.range.end + next.len();
        let delta = separation.len() as isize - removed.len() as isize;
        let mut updated = self.splice(removed.clone(), separation, Vec::new());
        updated.nested.remove(index);

        // The member right after the removed one loses its blank prefix to `separation`
        if let Some(follower) = self.nested.get(index + 1).filter(|n| n.range.start == target.range.end) {
            let mut declaration = follower.declaration.clone();
            declaration.trivia.leading = format!("{}{}", separation, strip_blank_prefix(&declaration.trivia.leading));
            updated.nested[index] = NestedType {
                range: removed.start..(follower.range.end as isize + delta) as usize,
                first: target.first,
                last: follower.last,
                declaration,
            };
        }

        if target.last {
            if let Some(previous) = index.checked_sub(1).filter(|&i| self.nested[i].range.end == target.range.start) {
                updated.nested[previous].last = true;
            }
        }

        Some(updated)
    }

    /// Copy with `removed` replaced by `replacement`. `replacement_rows` are
    /// verbatim rows of the replacement, counted from its first line.
    fn splice(&self, removed: Range<usize>, replacement: &str, replacement_rows: Vec<usize>) -> TypeDeclaration {
        let mut text = String::with_capacity(self.text.len() + replacement.len());
        text.push_str(&self.text[..removed.start]);
        text.push_str(replacement);
        text.push_str(&self.text[removed.end..]);

        let start_row = self.text[..removed.start].matches('\n').count();
        let removed_rows = self.text[removed.clone()].matches('\n').count();
        let added_rows = replacement.matches('\n').count();

        let mut verbatim_rows: Vec<usize> = self.verbatim_rows.iter()
            .filter_map(|&row| {
                if row <= start_row {
                    Some(row)
                } else if row > start_row + removed_rows {
                    Some(row - removed_rows + added_rows)
                } else {
                    None
                }
            })
            .chain(replacement_rows.into_iter().map(|row| start_row + row))
            .collect();
        verbatim_rows.sort_unstable();
        verbatim_rows.dedup();

        let nested = self.nested.iter()
            .map(|nested| {
                if nested.range.start < removed.end {
                    return nested.clone();
                }
                let shift = |offset: usize| offset - removed.len() + replacement.len();
                NestedType {
                    range: shift(nested.range.start)..shift(nested.range.end),
                    ..nested.clone()
                }
            })
            .collect();

        TypeDeclaration {
            trivia: self.trivia.clone(),
            kind: self.kind,
            identifier: self.identifier.clone(),
            modifiers: self.modifiers.clone(),
            text,
            nested,
            verbatim_rows,
        }
    }
}

/// A namespace declaration, block (`namespace A { }`) or file scoped (`namespace A;`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    pub trivia: Trivia,

    /// Dotted name, whitespace removed
    pub name: String,

    pub file_scoped: bool,

    /// Text from `namespace` through the opening brace (or semicolon) and its line end
    pub open: String,

    pub body: Body,

    /// Closing brace and optional semicolon; empty for file scoped namespaces
    pub close: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Namespace(NamespaceDeclaration),
    Type(TypeDeclaration),
    Other(Verbatim),
}

impl HasTrivia for ImportDirective {
    fn trivia(&self) -> &Trivia {
        &self.trivia
    }
    fn trivia_mut(&mut self) -> &mut Trivia {
        &mut self.trivia
    }
}

impl HasTrivia for Verbatim {
    fn trivia(&self) -> &Trivia {
        &self.trivia
    }
    fn trivia_mut(&mut self) -> &mut Trivia {
        &mut self.trivia
    }
}

impl HasTrivia for Member {
    fn trivia(&self) -> &Trivia {
        match self {
            Member::Namespace(ns) => &ns.trivia,
            Member::Type(decl) => &decl.trivia,
            Member::Other(other) => &other.trivia,
        }
    }
    fn trivia_mut(&mut self) -> &mut Trivia {
        match self {
            Member::Namespace(ns) => &mut ns.trivia,
            Member::Type(decl) => &mut decl.trivia,
            Member::Other(other) => &mut other.trivia,
        }
    }
}

/// Contents of a compilation unit or namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    /// Directives that must precede imports (`extern alias`)
    pub prelude: Vec<Verbatim>,
    pub imports: Vec<ImportDirective>,
    pub members: Vec<Arc<Member>>,

    /// Text after the last node (before the closing brace, or end of file)
    pub tail: String,
}

/// Structural address of a member: member indices from the root body down
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(pub Vec<usize>);

/// Structural address of an import directive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportPath {
    /// Path of the namespace holding the directive; empty for the compilation unit
    pub scope: NodePath,
    pub index: usize,
}

/// A type declaration together with its location in a specific tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSite {
    /// Path of the top-level type holding the declaration
    pub path: NodePath,

    /// Indices into [`TypeDeclaration::nested`] below that type; empty for
    /// a top-level declaration
    pub nesting: Vec<usize>,

    pub declaration: TypeDeclaration,
}

impl DeclarationSite {
    pub fn top_level(path: NodePath, declaration: TypeDeclaration) -> Self {
        Self {
            path,
            nesting: Vec::new(),
            declaration,
        }
    }

    pub fn is_nested(&self) -> bool {
        !self.nesting.is_empty()
    }
}

/// Immutable syntax tree of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// Leading trivia of the compilation unit (file header comments)
    pub header: String,
    pub body: Body,
    pub line_ending: LineEnding,

    /// Whether the parser reported syntax errors
    pub has_errors: bool,
}

impl SourceTree {
    pub fn to_text(&self) -> String {
        self.render().text
    }

    /// Every top-level type declaration (not nested in another type), in document order
    pub fn type_declarations(&self) -> Vec<(NodePath, &TypeDeclaration)> {
        let mut found = Vec::new();
        collect_types(&self.body, &mut Vec::new(), &mut found);
        found
    }

    pub fn top_level_type_count(&self) -> usize {
        self.type_declarations().len()
    }

    /// Number of type declarations at any depth
    pub fn type_count(&self) -> usize {
        self.type_declarations().into_iter()
            .map(|(_, declaration)| 1 + declaration.nested_count())
            .sum()
    }

    /// Whether the file declares its namespace as `namespace A.B;`
    pub fn uses_file_scoped_namespace(&self) -> bool {
        self.body.members.iter()
            .any(|member| matches!(member.as_ref(), Member::Namespace(ns) if ns.file_scoped))
    }

    /// Byte span of each top-level type declaration's text in `to_text()`
    pub fn type_spans(&self) -> Vec<(NodePath, Range<usize>)> {
        self.render().types
    }

    /// Byte span of each import directive's text in `to_text()`
    pub fn import_spans(&self) -> Vec<(ImportPath, Range<usize>)> {
        self.render().imports
    }

    /// All import directives, compilation unit first, then namespaces in document order
    pub fn imports(&self) -> Vec<(ImportPath, &ImportDirective)> {
        let mut found = Vec::new();
        collect_imports(&self.body, &mut Vec::new(), &mut found);
        found
    }

    pub fn import_at(&self, path: &ImportPath) -> Option<&ImportDirective> {
        self.body_at(&path.scope)?.imports.get(path.index)
    }

    pub fn member_at(&self, path: &NodePath) -> Option<&Member> {
        let (last, parents) = path.0.split_last()?;
        let body = self.body_at(&NodePath(parents.to_vec()))?;
        body.members.get(*last).map(|m| m.as_ref())
    }

    pub fn type_at(&self, path: &NodePath) -> Option<&TypeDeclaration> {
        match self.member_at(path)? {
            Member::Type(decl) => Some(decl),
            _ => None,
        }
    }

    /// Names of the namespaces enclosing the member at `path`, outermost first
    pub fn namespace_of(&self, path: &NodePath) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        let mut body = &self.body;
        let (_, parents) = path.0.split_last()?;

        for index in parents {
            match body.members.get(*index)?.as_ref() {
                Member::Namespace(ns) => {
                    names.push(ns.name.as_str());
                    body = &ns.body;
                }
                _ => return None,
            }
        }

        Some(names)
    }

    /// The declaration at `site`, provided it still carries the site's identifier
    pub fn declaration_at(&self, site: &DeclarationSite) -> Option<&TypeDeclaration> {
        self.type_at(&site.path)?
            .nested_at(&site.nesting)
            .filter(|declaration| declaration.identifier == site.declaration.identifier)
    }

    /// New tree without the member at `path`. The member's trivia is dropped.
    pub fn without_member(&self, path: &NodePath) -> Option<SourceTree> {
        let body = edit_body(&self.body, &path.0, &|body: &Body, index| {
            body.members.get(index)?;
            Some(retain_body(body, |_| true, |i| i != index))
        })?;
        Some(self.with_body(body))
    }

    /// New tree without the declaration at `site`, top level or nested
    pub fn without_declaration(&self, site: &DeclarationSite) -> Option<SourceTree> {
        if !site.is_nested() {
            return self.without_member(&site.path);
        }

        let container = self.type_at(&site.path)?.without_nested(&site.nesting)?;
        let container = Arc::new(Member::Type(container));
        let body = edit_body(&self.body, &site.path.0, &|body: &Body, index| {
            let mut updated = body.clone();
            *updated.members.get_mut(index)? = Arc::clone(&container);
            Some(updated)
        })?;
        Some(self.with_body(body))
    }

    fn with_body(&self, body: Body) -> SourceTree {
        SourceTree {
            header: self.header.clone(),
            body,
            line_ending: self.line_ending,
            has_errors: self.has_errors,
        }
    }

    /// New tree without the given import directives. Order of the rest is kept.
    pub fn without_imports(&self, remove: &HashSet<ImportPath>) -> SourceTree {
        SourceTree {
            header: self.header.clone(),
            body: remove_imports(&self.body, &mut Vec::new(), remove),
            line_ending: self.line_ending,
            has_errors: self.has_errors,
        }
    }

    fn body_at(&self, scope: &NodePath) -> Option<&Body> {
        let mut body = &self.body;
        for index in &scope.0 {
            match body.members.get(*index)?.as_ref() {
                Member::Namespace(ns) => body = &ns.body,
                _ => return None,
            }
        }
        Some(body)
    }

    fn render(&self) -> Rendered {
        let mut renderer = Renderer::default();
        renderer.push(&self.header);
        renderer.body(&self.body);
        Rendered {
            text: renderer.out,
            types: renderer.types,
            imports: renderer.imports,
        }
    }
}

struct Rendered {
    text: String,
    types: Vec<(NodePath, Range<usize>)>,
    imports: Vec<(ImportPath, Range<usize>)>,
}

#[derive(Default)]
struct Renderer {
    out: String,
    path: Vec<usize>,
    types: Vec<(NodePath, Range<usize>)>,
    imports: Vec<(ImportPath, Range<usize>)>,
}

impl Renderer {
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn body(&mut self, body: &Body) {
        for directive in &body.prelude {
            self.push(&directive.trivia.leading);
            self.push(&directive.text);
            self.push(&directive.trivia.trailing);
        }

        for (index, import) in body.imports.iter().enumerate() {
            self.push(&import.trivia.leading);
            let start = self.out.len();
            self.push(&import.text);
            let path = ImportPath {
                scope: NodePath(self.path.clone()),
                index,
            };
            self.imports.push((path, start..self.out.len()));
            self.push(&import.trivia.trailing);
        }

        for (index, member) in body.members.iter().enumerate() {
            self.path.push(index);
            match member.as_ref() {
                Member::Namespace(ns) => {
                    self.push(&ns.trivia.leading);
                    self.push(&ns.open);
                    self.body(&ns.body);
                    self.push(&ns.close);
                    self.push(&ns.trivia.trailing);
                }
                Member::Type(decl) => {
                    self.push(&decl.trivia.leading);
                    let start = self.out.len();
                    self.push(&decl.text);
                    self.types.push((NodePath(self.path.clone()), start..self.out.len()));
                    self.push(&decl.trivia.trailing);
                }
                Member::Other(other) => {
                    self.push(&other.trivia.leading);
                    self.push(&other.text);
                    self.push(&other.trivia.trailing);
                }
            }
            self.path.pop();
        }

        self.push(&body.tail);
    }
}

fn collect_types<'a>(body: &'a Body, path: &mut Vec<usize>, found: &mut Vec<(NodePath, &'a TypeDeclaration)>) {
    for (index, member) in body.members.iter().enumerate() {
        path.push(index);
        match member.as_ref() {
            Member::Namespace(ns) => collect_types(&ns.body, path, found),
            Member::Type(decl) => found.push((NodePath(path.clone()), decl)),
            Member::Other(_) => {}
        }
        path.pop();
    }
}

fn collect_imports<'a>(body: &'a Body, path: &mut Vec<usize>, found: &mut Vec<(ImportPath, &'a ImportDirective)>) {
    for (index, import) in body.imports.iter().enumerate() {
        found.push((
            ImportPath {
                scope: NodePath(path.clone()),
                index,
            },
            import,
        ));
    }

    for (index, member) in body.members.iter().enumerate() {
        if let Member::Namespace(ns) = member.as_ref() {
            path.push(index);
            collect_imports(&ns.body, path, found);
            path.pop();
        }
    }
}

/// Apply `edit` to the body holding the member at `path`, given the member's index
fn edit_body(body: &Body, path: &[usize], edit: &dyn Fn(&Body, usize) -> Option<Body>) -> Option<Body> {
    let (&index, rest) = path.split_first()?;

    if rest.is_empty() {
        return edit(body, index);
    }

    let Member::Namespace(ns) = body.members.get(index)?.as_ref() else {
        return None;
    };

    let mut namespace = ns.clone();
    namespace.body = edit_body(&ns.body, rest, edit)?;

    let mut updated = body.clone();
    updated.members[index] = Arc::new(Member::Namespace(namespace));
    Some(updated)
}

fn remove_imports(body: &Body, path: &mut Vec<usize>, remove: &HashSet<ImportPath>) -> Body {
    let scope = NodePath(path.clone());
    let mut pruned = retain_body(
        body,
        |index| {
            !remove.contains(&ImportPath {
                scope: scope.clone(),
                index,
            })
        },
        |_| true,
    );

    for index in 0..pruned.members.len() {
        if let Member::Namespace(ns) = pruned.members[index].as_ref() {
            path.push(index);
            let inner = remove_imports(&ns.body, path, remove);
            path.pop();

            if inner != ns.body {
                let mut namespace = ns.clone();
                namespace.body = inner;
                pruned.members[index] = Arc::new(Member::Namespace(namespace));
            }
        }
    }

    pruned
}

/// Drop imports and members rejected by the predicates without leaving an
/// empty region behind. At the start of a body the first survivor takes over
/// the separation of the removed run; elsewhere it keeps the wider of the two.
fn retain_body(body: &Body, keep_import: impl Fn(usize) -> bool, keep_member: impl Fn(usize) -> bool) -> Body {
    let mut separation = Separation {
        carry: None,
        seen_kept: !body.prelude.is_empty(),
    };

    let mut imports = Vec::with_capacity(body.imports.len());
    for (index, import) in body.imports.iter().enumerate() {
        if keep_import(index) {
            imports.push(separation.apply(import.clone()));
        } else {
            separation.removed(&import.trivia.leading);
        }
    }

    let mut members = Vec::with_capacity(body.members.len());
    for (index, member) in body.members.iter().enumerate() {
        if keep_member(index) {
            if separation.carry.is_some() {
                members.push(Arc::new(separation.apply(member.as_ref().clone())));
            } else {
                separation.seen_kept = true;
                members.push(Arc::clone(member));
            }
        } else {
            separation.removed(&member.trivia().leading);
        }
    }

    Body {
        prelude: body.prelude.clone(),
        imports,
        members,
        tail: body.tail.clone(),
    }
}

struct Separation {
    /// Blank lines that preceded the first node of the current removed run
    carry: Option<String>,
    seen_kept: bool,
}

impl Separation {
    fn removed(&mut self, leading: &str) {
        if self.carry.is_none() {
            self.carry = Some(blank_prefix(leading).to_string());
        }
    }

    fn apply<T: HasTrivia>(&mut self, mut node: T) -> T {
        if let Some(carried) = self.carry.take() {
            let own = blank_prefix(&node.trivia().leading);
            let prefix = if self.seen_kept && own.matches('\n').count() > carried.matches('\n').count() {
                own.to_string()
            } else {
                carried
            };
            let rest = strip_blank_prefix(&node.trivia().leading).to_string();
            node.trivia_mut().leading = prefix + &rest;
        }
        self.seen_kept = true;
        node
    }
}

/// Leading run of whitespace-only lines, including their line ends
pub fn blank_prefix(text: &str) -> &str {
    let mut end = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\n' => end = i + 1,
            ' ' | '\t' | '\r' => {}
            _ => break,
        }
    }
    &text[..end]
}

pub fn strip_blank_prefix(text: &str) -> &str {
    &text[blank_prefix(text).len()..]
}

/// Indentation of a node whose leading trivia is `leading`: whatever follows the
/// last newline, provided it is only whitespace
pub fn indentation_of(leading: &str) -> &str {
    let last_line = match leading.rfind('\n') {
        Some(pos) => &leading[pos + 1..],
        None => leading,
    };

    if last_line.chars().all(|c| c == ' ' || c == '\t') {
        last_line
    } else {
        ""
    }
}

/// End offset of the trailing trivia of a node ending at `pos`: spaces, an
/// optional line comment, then one line end. Never passes `limit`.
pub fn scan_trailing(source: &str, pos: usize, limit: usize) -> usize {
    let bytes = source.as_bytes();
    let limit = limit.min(bytes.len());

    // Nodes that end with their own line end (`#region`) have no trailing trivia
    if pos > 0 && bytes.get(pos - 1) == Some(&b'\n') {
        return pos;
    }

    let mut end = pos;

    while end < limit && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }

    if end + 1 < limit && bytes[end] == b'/' && bytes[end + 1] == b'/' {
        while end < limit && bytes[end] != b'\n' && bytes[end] != b'\r' {
            end += 1;
        }
    }

    if end < limit && bytes[end] == b'\r' && end + 1 < limit && bytes[end + 1] == b'\n' {
        end + 2
    } else if end < limit && bytes[end] == b'\n' {
        end + 1
    } else if end < limit {
        // Something else follows on the same line; keep only the spaces
        let mut spaces_end = pos;
        while spaces_end < end && (bytes[spaces_end] == b' ' || bytes[spaces_end] == b'\t') {
            spaces_end += 1;
        }
        spaces_end
    } else {
        end
    }
}

/// Split the leading trivia of the first node in a file into the file header
/// and the node's own leading trivia. Comments directly above a type
/// declaration stay with it; everything up to the last blank line is header.
pub fn split_header(leading: &str, first_is_type: bool) -> (String, String) {
    if !first_is_type {
        return (leading.to_string(), String::new());
    }

    let mut header_end = 0;
    let mut line_start = 0;
    for (i, c) in leading.char_indices() {
        if c == '\n' {
            if leading[line_start..i].trim().is_empty() {
                header_end = i + 1;
            }
            line_start = i + 1;
        }
    }

    (leading[..header_end].to_string(), leading[header_end..].to_string())
}
