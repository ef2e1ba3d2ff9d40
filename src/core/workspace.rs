// src/core/workspace.rs
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SplitError};
use super::parser::content_hash;
use super::pipeline::{EditSet, FileSet};

/// An edit set together with the hash of the file it was computed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEdit {
    pub base_hash: String,
    pub edits: EditSet,
}

impl PlannedEdit {
    /// `base_hash` is the [`content_hash`] of the file the edits were computed from
    pub fn new(base_hash: impl Into<String>, edits: EditSet) -> Self {
        Self {
            base_hash: base_hash.into(),
            edits,
        }
    }

    /// Name of the file the edit set was computed from
    pub fn source_name(&self) -> &str {
        match &self.edits {
            EditSet::Move { original_file, .. } => &original_file.name,
            EditSet::Rename { old_name, .. } => old_name,
        }
    }
}

/// A directory of source files that edit sets are applied to.
///
/// File names compare case-insensitively, the way the file systems C#
/// projects usually live on do.
#[derive(Debug, Clone)]
pub struct Workspace {
    directory: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(SplitError::FileSystem(format!("{} is not a directory", directory.display())));
        }

        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    /// Names of the regular files in the directory
    pub fn file_names(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(names)
    }

    /// Write a planned edit to disk. Returns the paths that were written.
    pub fn apply(&self, plan: &PlannedEdit) -> Result<Vec<PathBuf>> {
        let source = self.path_of(plan.source_name());
        let current = fs::read_to_string(&source)?;
        if content_hash(&current) != plan.base_hash {
            return Err(SplitError::StaleFile {
                path: source.display().to_string(),
            });
        }

        match &plan.edits {
            EditSet::Move { original_file, new_file } => {
                let created = self.create(&new_file.name, &new_file.text)?;
                if let Err(e) = replace_contents(&source, &original_file.text) {
                    // Never leave the declaration in both files
                    warn!("Could not update {}; removing {}", source.display(), created.display());
                    if let Err(cleanup) = fs::remove_file(&created) {
                        warn!("Could not remove {}: {}", created.display(), cleanup);
                    }
                    return Err(e);
                }
                info!("Wrote {} and updated {}", created.display(), source.display());
                Ok(vec![source, created])
            }
            EditSet::Rename { new_name, text, .. } => {
                let created = self.create(new_name, text)?;
                fs::remove_file(&source)?;
                info!("Renamed {} to {}", source.display(), created.display());
                Ok(vec![created])
            }
        }
    }

    fn create(&self, name: &str, text: &str) -> Result<PathBuf> {
        if FileSet::contains(self, name) {
            return Err(SplitError::NameCollision { name: name.to_string() });
        }

        let path = self.path_of(name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => SplitError::NameCollision { name: name.to_string() },
                _ => SplitError::Io(e),
            })?;

        file.write_all(text.as_bytes())?;
        debug!("Created {}", path.display());
        Ok(path)
    }
}

/// Write `text` next to `path` and rename it over `path`, so `path` holds
/// either its old or its new content
fn replace_contents(path: &Path, text: &str) -> Result<()> {
    let tmp_path = temp_path(path);
    if let Err(e) = fs::write(&tmp_path, text) {
        return Err(SplitError::FileSystem(format!("writing {}: {}", tmp_path.display(), e)));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        SplitError::FileSystem(format!("replacing {}: {}", path.display(), e))
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

impl FileSet for Workspace {
    fn contains(&self, name: &str) -> bool {
        match self.file_names() {
            Ok(names) => names.iter().any(|existing| existing.eq_ignore_ascii_case(name)),
            Err(e) => {
                warn!("Could not list {}: {}", self.directory.display(), e);
                self.path_of(name).exists()
            }
        }
    }
}
