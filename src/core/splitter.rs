// src/core/splitter.rs
use std::sync::Arc;

use crate::config::{FormatConfig, NamespaceStyle};
use crate::error::{Result, SplitError};
use super::syntax::{
    indentation_of, Body, DeclarationSite, ImportDirective, Member, NamespaceDeclaration, SourceTree,
    Trivia, TypeDeclaration, Verbatim,
};

/// Detach the declaration at `site` from `tree` and wrap it in a new
/// compilation unit.
///
/// Returns `(original without the declaration, new file)`. The new file gets
/// every import of the original; pruning the surplus is the caller's job.
/// Without a configured namespace style the new file follows the original's.
pub fn split(
    tree: &SourceTree,
    site: &DeclarationSite,
    containing_namespace: &str,
    format: &FormatConfig,
) -> Result<(SourceTree, SourceTree)> {
    let declaration = tree.declaration_at(site)
        .ok_or_else(|| SplitError::Resolution(format!(
            "type '{}' is not at the expected position",
            site.declaration.identifier
        )))?;

    let original = tree.without_declaration(site)
        .ok_or_else(|| SplitError::Resolution(format!(
            "could not detach '{}'",
            declaration.identifier
        )))?;

    let new_file = build_new_file(tree, declaration, containing_namespace, format);

    Ok((original, new_file))
}

fn build_new_file(
    tree: &SourceTree,
    declaration: &TypeDeclaration,
    containing_namespace: &str,
    format: &FormatConfig,
) -> SourceTree {
    let nl = tree.line_ending.as_str();

    let prelude: Vec<Verbatim> = tree.body.prelude.iter()
        .map(|directive| Verbatim {
            trivia: Trivia::new("", nl),
            ..directive.clone()
        })
        .collect();

    let imports: Vec<ImportDirective> = tree.imports().into_iter()
        .map(|(_, import)| ImportDirective {
            trivia: Trivia::new("", nl),
            ..import.clone()
        })
        .collect();

    let separation = if prelude.is_empty() && imports.is_empty() { "" } else { nl };
    let namespace = containing_namespace.trim();

    let member = if namespace.is_empty() {
        Member::Type(relocate(declaration, "", separation, nl))
    } else {
        let style = format.namespace_style.unwrap_or(if tree.uses_file_scoped_namespace() {
            NamespaceStyle::FileScoped
        } else {
            NamespaceStyle::Block
        });

        match style {
            NamespaceStyle::Block => {
                let indent = " ".repeat(format.indent_width);
                Member::Namespace(NamespaceDeclaration {
                    trivia: Trivia::new(separation, nl),
                    name: namespace.to_string(),
                    file_scoped: false,
                    open: format!("namespace {namespace}{nl}{{{nl}"),
                    body: Body {
                        members: vec![Arc::new(Member::Type(relocate(declaration, &indent, "", nl)))],
                        ..Body::default()
                    },
                    close: "}".to_string(),
                })
            }
            NamespaceStyle::FileScoped => Member::Namespace(NamespaceDeclaration {
                trivia: Trivia::new(separation, ""),
                name: namespace.to_string(),
                file_scoped: true,
                open: format!("namespace {namespace};{nl}"),
                body: Body {
                    members: vec![Arc::new(Member::Type(relocate(declaration, "", nl, nl)))],
                    ..Body::default()
                },
                close: String::new(),
            }),
        }
    };

    SourceTree {
        header: String::new(),
        body: Body {
            prelude,
            imports,
            members: vec![Arc::new(member)],
            tail: String::new(),
        },
        line_ending: tree.line_ending,
        has_errors: false,
    }
}

/// Copy of `declaration` re-indented to `indent`, with its attached comments
fn relocate(declaration: &TypeDeclaration, indent: &str, separation: &str, nl: &str) -> TypeDeclaration {
    let mut leading = separation.to_string();
    for comment in declaration.attached_comments() {
        leading.push_str(indent);
        leading.push_str(comment);
        leading.push_str(nl);
    }
    leading.push_str(indent);

    let original_indent = indentation_of(&declaration.trivia.leading);

    TypeDeclaration {
        trivia: Trivia::new(leading, nl),
        text: reindent(&declaration.text, original_indent, indent, &declaration.verbatim_rows),
        ..declaration.clone()
    }
}

/// Replace the `from` indentation of every line after the first with `to`.
/// Blank lines lose their whitespace; rows in `verbatim_rows` are copied as is.
pub fn reindent(text: &str, from: &str, to: &str, verbatim_rows: &[usize]) -> String {
    let mut out = String::with_capacity(text.len());

    for (row, line) in text.split('\n').enumerate() {
        if row > 0 {
            out.push('\n');
        }

        if row == 0 || verbatim_rows.contains(&row) {
            out.push_str(line);
            continue;
        }

        let (content, cr) = match line.strip_suffix('\r') {
            Some(content) => (content, "\r"),
            None => (line, ""),
        };

        if content.trim().is_empty() {
            out.push_str(cr);
            continue;
        }

        out.push_str(to);
        out.push_str(strip_indent(content, from));
        out.push_str(cr);
    }

    out
}

fn strip_indent<'a>(line: &'a str, indent: &str) -> &'a str {
    if let Some(rest) = line.strip_prefix(indent) {
        return rest;
    }

    // Shallower or differently indented line: drop what whitespace there is
    let whitespace = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[whitespace.min(indent.len())..]
}
