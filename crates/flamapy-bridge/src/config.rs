use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use flamapy_embed::EngineOptions;

use crate::error::{FlamapyError, Result};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "flamapy.toml";

/// Host-side options of a feature model
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Options {
    /// Report dispatch and initialization at info level
    pub debug: bool,
    pub engine: EngineSettings,
}

/// Engine bootstrap settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineSettings {
    pub working_dir: Option<PathBuf>,
    pub module_paths: Vec<PathBuf>,
    pub wheels_dir: Option<PathBuf>,
}

impl From<&EngineSettings> for EngineOptions {
    fn from(settings: &EngineSettings) -> Self {
        EngineOptions {
            working_dir: settings.working_dir.clone(),
            module_paths: settings.module_paths.clone(),
            wheels_dir: settings.wheels_dir.clone(),
        }
    }
}

impl Options {
    /// Parse options from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| FlamapyError::Config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))
    }

    /// Load options from a file. Relative paths are taken relative to the
    /// file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| FlamapyError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut options = Self::from_toml(&contents)?;
        if let Some(base) = path.parent() {
            options.engine.rebase(base);
        }
        Ok(options)
    }

    /// Build options from all sources
    ///
    /// Priority (highest to lowest):
    /// 1. FLAMAPY_* environment variables
    /// 2. The nearest flamapy.toml at or above `start_dir`
    /// 3. Defaults
    pub fn load<P: AsRef<Path>>(start_dir: P) -> Result<Self> {
        ConfigLoader::new(true).load(start_dir)
    }
}

impl EngineSettings {
    fn rebase(&mut self, base: &Path) {
        let paths = self
            .working_dir
            .iter_mut()
            .chain(self.module_paths.iter_mut())
            .chain(self.wheels_dir.iter_mut());

        for path in paths.filter(|p| p.is_relative()) {
            *path = base.join(&*path);
        }
    }
}

/// Loads options from the project file and the environment
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Find the nearest configuration file at or above `start_dir`
    pub fn find<P: AsRef<Path>>(&self, start_dir: P) -> Option<PathBuf> {
        search_dirs(start_dir.as_ref())
            .into_iter()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    pub fn load<P: AsRef<Path>>(&self, start_dir: P) -> Result<Options> {
        let mut options = match self.find(start_dir) {
            Some(path) => {
                log::debug!("Loading options from {}", path.display());
                Options::from_file(path)?
            }
            None => Options::default(),
        };

        self.apply_env(&mut options);
        Ok(options)
    }

    fn apply_env(&self, options: &mut Options) {
        if let Some(debug) = self.get_env_bool("debug") {
            options.debug = debug;
        }
        if let Some(dir) = self.get_env_path("working-dir") {
            options.engine.working_dir = Some(dir);
        }
        if let Some(paths) = self.get_env_config("module-path") {
            options.engine.module_paths = env::split_paths(&paths).collect();
        }
        if let Some(dir) = self.get_env_path("wheels-dir") {
            options.engine.wheels_dir = Some(dir);
        }
    }

    /// Get a configuration value from the environment.
    /// Converts "foo-bar" to "FLAMAPY_FOO_BAR"
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        let var = format!("FLAMAPY_{}", key.replace('-', "_").to_uppercase());
        env::var(var).ok().filter(|s| !s.is_empty())
    }

    pub fn get_env_bool(&self, key: &str) -> Option<bool> {
        self.get_env_config(key)
            .map(|val| !matches!(val.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
    }

    pub fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.get_env_config(key).map(PathBuf::from)
    }
}

/// `start_dir` and its parents, made absolute so relative paths reach the root
fn search_dirs(start_dir: &Path) -> Vec<PathBuf> {
    let start = match std::path::absolute(start_dir) {
        Ok(path) => path,
        Err(e) => {
            log::warn!("Cannot resolve {}: {}", start_dir.display(), e);
            start_dir.to_path_buf()
        }
    };
    start.ancestors().map(Path::to_path_buf).collect()
}
