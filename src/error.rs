use thiserror::Error;

/// Main error type for typesplit operations
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid selection: {0}")]
    Selection(String),

    /// The semantic resolver could not answer for this tree. Nothing is emitted.
    #[error("Semantic resolution failed: {0}")]
    Resolution(String),

    #[error("A file named '{name}' already exists")]
    NameCollision { name: String },

    #[error("File {path} changed on disk since the edit was planned")]
    StaleFile { path: String },

    #[error("Split produced an inconsistent result: {0}")]
    Invariant(String),

    #[error("File system error: {0}")]
    FileSystem(String),
}

pub type Result<T> = std::result::Result<T, SplitError>;
