use std::path::{Path, PathBuf};
use std::collections::HashMap;
use sha2::{Sha256, Digest};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tracing::{debug, warn};

use crate::config::ParsingConfig;
use crate::error::{SplitError, Result};
use super::languages::{LanguageParser, CSharpParser};
use super::syntax::SourceTree;

/// A parsed source file together with the text it was parsed from
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// File path as given to the parser
    pub path: PathBuf,

    /// Programming language detected
    pub language: String,

    /// SHA-256 of the content, used to detect edits made after planning
    pub content_hash: String,

    pub tree: SourceTree,

    /// Raw source content
    pub source_content: String,
}

impl ParsedFile {
    /// File name without its directory
    pub fn file_name(&self) -> String {
        self.path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Code parser that delegates to the configured language parsers
pub struct CodeParser {
    config: ParsingConfig,
    language_parsers: HashMap<String, Box<dyn LanguageParser>>,
}

impl CodeParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let mut language_parsers: HashMap<String, Box<dyn LanguageParser>> = HashMap::new();

        for language in &config.languages {
            match language.as_str() {
                "csharp" => {
                    let csharp_parser = CSharpParser::new()?;
                    language_parsers.insert(csharp_parser.language_name().to_string(), Box::new(csharp_parser));
                }
                other => {
                    warn!("Language '{}' is not supported; skipping", other);
                    continue;
                }
            }
        }

        if language_parsers.is_empty() {
            return Err(SplitError::Config("no supported language configured".to_string()));
        }

        Ok(Self {
            config: config.clone(),
            language_parsers,
        })
    }

    /// Parse every supported file below `dir`, honouring `.gitignore` and
    /// `ignore_patterns`. Files that fail to parse are skipped.
    pub async fn parse_directory<P: AsRef<Path>>(&mut self, dir: P, ignore_patterns: &[String]) -> Result<Vec<ParsedFile>> {
        let dir = dir.as_ref();
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in ignore_patterns {
            overrides.add(&format!("!{}", pattern))
                .map_err(|e| SplitError::Config(format!("Invalid ignore pattern '{}': {}", pattern, e)))?;
        }
        let overrides = overrides.build()
            .map_err(|e| SplitError::Config(e.to_string()))?;

        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            .build();

        let mut parsed_files = Vec::new();

        for entry in walker {
            let entry = entry.map_err(|e| SplitError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if path.is_file() && self.should_parse_file(path) {
                match self.parse_file(path).await {
                    Ok(parsed) => parsed_files.push(parsed),
                    Err(e) => debug!("Skipping {}: {}", path.display(), e),
                }
            }
        }

        Ok(parsed_files)
    }

    /// Parse a single source file
    pub async fn parse_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<ParsedFile> {
        let path = file_path.as_ref();
        let source_content = std::fs::read_to_string(path)?;
        self.parse_source(path, source_content)
    }

    /// Parse `source_content` as if it were the content of `path`
    pub fn parse_source(&mut self, path: &Path, source_content: String) -> Result<ParsedFile> {
        let language = self.detect_language(path)?;

        if source_content.len() > self.config.max_file_size {
            return Err(SplitError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        let content_hash = content_hash(&source_content);

        let parser = self.language_parsers.get_mut(&language)
            .ok_or_else(|| SplitError::Parser(format!("No parser for language {}", language)))?;
        let tree = parser.parse(&source_content, path)?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            language,
            content_hash,
            tree,
            source_content,
        })
    }

    fn should_parse_file(&self, path: &Path) -> bool {
        self.detect_language(path).is_ok()
    }

    /// Detect programming language from file path
    fn detect_language(&self, path: &Path) -> Result<String> {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            for (lang, parser) in &self.language_parsers {
                if parser.file_extensions().iter().any(|known| known.eq_ignore_ascii_case(extension)) {
                    return Ok(lang.clone());
                }
            }
        }

        Err(SplitError::Parser(
            format!("Could not detect language for file: {}", path.display())
        ))
    }
}

/// SHA-256 of `content`, hex encoded
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Widget.cs");
        fs::write(&path, "public class Widget { }\n").unwrap();

        let mut parser = CodeParser::new(&ParsingConfig::default()).unwrap();
        let parsed = parser.parse_file(&path).await.unwrap();

        assert_eq!(parsed.language, "csharp");
        assert_eq!(parsed.file_name(), "Widget.cs");
        assert_eq!(parsed.content_hash, content_hash("public class Widget { }\n"));
        assert_eq!(parsed.tree.to_text(), parsed.source_content);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Big.cs");
        fs::write(&path, "class Big { }\n").unwrap();

        let config = ParsingConfig {
            max_file_size: 4,
            ..ParsingConfig::default()
        };
        let mut parser = CodeParser::new(&config).unwrap();
        assert!(matches!(parser.parse_file(&path).await, Err(SplitError::Parser(_))));
    }

    #[tokio::test]
    async fn test_parse_directory_skips_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("obj")).unwrap();
        fs::write(dir.path().join("src/A.cs"), "class A { }\n").unwrap();
        fs::write(dir.path().join("obj/Generated.cs"), "class Generated { }\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not code").unwrap();

        let mut parser = CodeParser::new(&ParsingConfig::default()).unwrap();
        let parsed = parser.parse_directory(dir.path(), &["obj/".to_string()]).await.unwrap();

        let names: Vec<String> = parsed.iter().map(|file| file.file_name()).collect();
        assert_eq!(names, vec!["A.cs".to_string()]);
    }

    #[test]
    fn test_unsupported_languages_only() {
        let config = ParsingConfig {
            languages: vec!["cobol".to_string()],
            ..ParsingConfig::default()
        };
        assert!(matches!(CodeParser::new(&config), Err(SplitError::Config(_))));
    }
}
