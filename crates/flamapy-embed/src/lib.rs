//! Flamapy Embed - the boundary between a Rust host and an embedded analysis engine
//!
//! This crate describes what the host needs from an in-process engine runtime
//! and provides a CPython-backed implementation of it.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "python")]
//! # fn main() -> flamapy_embed::Result<()> {
//! use flamapy_embed::{Bootstrap, Engine, EngineOptions, PythonEngine};
//!
//! let mut engine = PythonEngine::bootstrap(&EngineOptions::default())?;
//! let model = engine.stage("model.uvl", "features\n    Root\n")?;
//! let value = engine.execute(&format!("result = open({:?}).read()", model))?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "python"))]
//! # fn main() {}
//! ```
//!
//! # Building
//!
//! The default build carries no interpreter dependency: it only exposes the
//! [`Engine`] boundary, the [`EngineValue`] marshalling type and the
//! [`WorkingArea`] used to stage files.
//!
//! Enabling the `python` feature links CPython through pyo3. The interpreter
//! found on `PATH` (or named by `PYO3_PYTHON`) must be able to import
//! `flamapy` at runtime, either from its own site-packages or from the
//! module paths and wheels given in [`EngineOptions`]:
//!
//! ```bash
//! PYO3_PYTHON=/opt/python3.12/bin/python3 cargo build --features python
//! ```

mod value;
mod workdir;

#[cfg(feature = "python")]
mod python;

use std::path::PathBuf;
use thiserror::Error;

pub use value::{EngineValue, ForeignHandle};
pub use workdir::WorkingArea;

#[cfg(feature = "python")]
pub use python::PythonEngine;

/// Errors that can occur at the engine boundary
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Engine bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Invalid staged file name: {0}")]
    InvalidName(String),

    #[error("Failed to stage {name}: {source}")]
    Stage {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine execution failed: {0}")]
    Execution(String),

    #[error("Engine value could not be marshalled: {0}")]
    Marshal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Settings consumed once, when an engine session is bootstrapped
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Directory used as the engine's working area. A temporary directory
    /// owned by the session is used when unset.
    pub working_dir: Option<PathBuf>,
    /// Extra module search paths, highest priority first
    pub module_paths: Vec<PathBuf>,
    /// Directory holding pure wheels to put on the module search path
    pub wheels_dir: Option<PathBuf>,
}

/// An embedded engine session.
///
/// A session owns one working area and executes one piece of source text at a
/// time. It is not reentrant: callers serialize access to it.
pub trait Engine: Send + 'static {
    /// Writes `contents` to the file `name` inside the working area,
    /// replacing any previous contents, and returns the path engine code
    /// must use to open it.
    fn stage(&mut self, name: &str, contents: &str) -> Result<String>;

    /// Executes `source` and returns the value it bound to [`RESULT_BINDING`].
    ///
    /// A source that leaves the binding unset yields [`EngineValue::Null`].
    fn execute(&mut self, source: &str) -> Result<EngineValue>;
}

/// Engines that can construct themselves from [`EngineOptions`].
pub trait Bootstrap: Engine + Sized {
    fn bootstrap(options: &EngineOptions) -> Result<Self>;
}

/// Name of the variable executed source assigns its outcome to
pub const RESULT_BINDING: &str = "result";
