use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::{EmbedError, Result};

/// The directory engine code reads staged files from.
///
/// Staging always rewrites the whole file, so a file never carries content
/// from an earlier call.
#[derive(Debug)]
pub struct WorkingArea {
    root: PathBuf,
    // Removed on drop when the area is session-owned
    _temp: Option<TempDir>,
}

impl WorkingArea {
    /// Use `dir` when given (creating it if needed), otherwise a fresh
    /// temporary directory owned by the returned value.
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(Self {
                    root: dir.to_path_buf(),
                    _temp: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new().prefix("flamapy-").tempdir()?;
                Ok(Self {
                    root: temp.path().to_path_buf(),
                    _temp: Some(temp),
                })
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to `name` and return the absolute path.
    pub fn stage(&self, name: &str, contents: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return Err(EmbedError::InvalidName(name.to_string()));
        }

        let path = self.root.join(name);
        fs::write(&path, contents).map_err(|source| EmbedError::Stage {
            name: name.to_string(),
            source,
        })?;

        log::trace!("Staged {} ({} bytes)", path.display(), contents.len());
        Ok(path)
    }
}
