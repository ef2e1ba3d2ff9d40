// src/core/mod.rs
mod engine;
mod parser;
mod workspace;

pub mod languages;
pub mod pipeline;
pub mod pruner;
pub mod resolver;
pub mod selection;
pub mod splitter;
pub mod syntax;

pub use parser::{content_hash, CodeParser, ParsedFile};
pub use workspace::{PlannedEdit, Workspace};
pub use languages::{CSharpParser, LanguageParser};
pub use pipeline::{EditSet, FileEdit, FileSet};
pub use pruner::ImportPruner;
pub use resolver::{ImportDiagnostic, ImportDiagnosticKind, IndexResolver, SemanticResolver, SymbolIndex};
pub use selection::{Action, ActionKind};
pub use syntax::{DeclarationSite, SourceTree};

// Export the main engine
pub use engine::{Engine, Selector, TypeListing};
