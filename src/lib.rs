//! Move C# type declarations into files named after them.
//!
//! A selection inside a source file resolves to an [`core::Action`]; the
//! pipeline splits the selected type out of its [`core::SourceTree`], prunes
//! the import directives of both resulting files and emits an
//! [`core::EditSet`].

pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use error::{Result, SplitError};
