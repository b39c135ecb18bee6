//! CPython-backed engine session.
//!
//! The interpreter is process-wide; a [`PythonEngine`] owns a working area and
//! a fresh globals dictionary per [`Engine::execute`] call, so no Python state
//! leaks from one call into the next.

use indexmap::IndexMap;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyFrozenSet, PyList, PyLong, PySet, PyString, PyTuple};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    Bootstrap, EmbedError, Engine, EngineOptions, EngineValue, ForeignHandle, Result,
    WorkingArea, RESULT_BINDING,
};

/// An engine session running inside the embedded CPython interpreter
#[derive(Debug)]
pub struct PythonEngine {
    area: WorkingArea,
}

impl PythonEngine {
    /// Prepare the interpreter's search path and the working area without
    /// checking that flamapy itself is importable.
    pub fn new(options: &EngineOptions) -> Result<Self> {
        let area = WorkingArea::new(options.working_dir.as_deref())?;

        let mut search_paths = options.module_paths.clone();
        if let Some(dir) = &options.wheels_dir {
            search_paths.extend(find_wheels(dir)?);
        }

        Python::with_gil(|py| -> PyResult<()> {
            let sys_path = py.import_bound("sys")?.getattr("path")?;
            for path in search_paths.iter().rev() {
                let entry = path.to_string_lossy().into_owned();
                if !sys_path.contains(entry.as_str())? {
                    sys_path.call_method1("insert", (0, entry))?;
                }
            }
            Ok(())
        })
        .map_err(|e| EmbedError::Bootstrap(e.to_string()))?;

        log::debug!(
            "Python engine ready (working area {}, {} extra search paths)",
            area.root().display(),
            search_paths.len()
        );

        Ok(Self { area })
    }
}

impl Bootstrap for PythonEngine {
    fn bootstrap(options: &EngineOptions) -> Result<Self> {
        let engine = Self::new(options)?;

        Python::with_gil(|py| py.import_bound("flamapy").map(|_| ()))
            .map_err(|e| EmbedError::Bootstrap(format!("flamapy is not importable: {}", e)))?;

        Ok(engine)
    }
}

impl Engine for PythonEngine {
    fn stage(&mut self, name: &str, contents: &str) -> Result<String> {
        let path = self.area.stage(name, contents)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn execute(&mut self, source: &str) -> Result<EngineValue> {
        Python::with_gil(|py| {
            let globals = PyDict::new_bound(py);
            py.run_bound(source, Some(&globals), None)
                .map_err(|e| EmbedError::Execution(e.to_string()))?;

            match globals
                .get_item(RESULT_BINDING)
                .map_err(|e| EmbedError::Marshal(e.to_string()))?
            {
                Some(value) => Ok(marshal(&value)),
                None => Ok(EngineValue::Null),
            }
        })
    }
}

/// Pure wheels are zip archives the import system can load directly.
fn find_wheels(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut wheels: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| EmbedError::Bootstrap(format!("cannot read {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "whl"))
        .collect();
    wheels.sort();
    Ok(wheels)
}

/// Top-level results: scalars are copied out, everything else stays a handle.
fn marshal(value: &Bound<'_, PyAny>) -> EngineValue {
    scalar(value)
        .unwrap_or_else(|| EngineValue::Handle(Box::new(PyHandle(value.clone().unbind()))))
}

fn scalar(value: &Bound<'_, PyAny>) -> Option<EngineValue> {
    if value.is_none() {
        return Some(EngineValue::Null);
    }
    // bool is a subclass of int, test it first
    if let Ok(b) = value.downcast::<PyBool>() {
        return Some(EngineValue::Bool(b.is_true()));
    }
    if value.is_instance_of::<PyLong>() {
        if let Ok(i) = value.extract::<i64>() {
            return Some(EngineValue::Int(i));
        }
        // counts on large models overflow i64
        let f = value.extract::<f64>().ok()?;
        log::warn!("Integer result {} exceeds 64 bits, returned as a float", display(value));
        return Some(EngineValue::Float(f));
    }
    if let Ok(f) = value.downcast::<PyFloat>() {
        return Some(EngineValue::Float(f.value()));
    }
    if let Ok(s) = value.downcast::<PyString>() {
        return Some(EngineValue::Str(s.to_string_lossy().into_owned()));
    }
    None
}

fn collection(value: &Bound<'_, PyAny>) -> Option<EngineValue> {
    if let Ok(dict) = value.downcast::<PyDict>() {
        let mut map = IndexMap::with_capacity(dict.len());
        for (key, item) in dict.iter() {
            let key = match key.downcast::<PyString>() {
                Ok(s) => s.to_string_lossy().into_owned(),
                Err(_) => display(&key),
            };
            map.insert(key, nested(&item));
        }
        return Some(EngineValue::Map(map));
    }

    if value.is_instance_of::<PyList>()
        || value.is_instance_of::<PyTuple>()
        || value.is_instance_of::<PySet>()
        || value.is_instance_of::<PyFrozenSet>()
    {
        let items = value
            .iter()
            .ok()?
            .filter_map(|item| item.ok())
            .map(|item| nested(&item))
            .collect();
        return Some(EngineValue::List(items));
    }

    None
}

fn nested(value: &Bound<'_, PyAny>) -> EngineValue {
    scalar(value)
        .or_else(|| collection(value))
        .unwrap_or_else(|| EngineValue::Opaque(display(value)))
}

fn display(value: &Bound<'_, PyAny>) -> String {
    value
        .str()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from("<unprintable>"))
}

#[derive(Debug)]
struct PyHandle(Py<PyAny>);

impl ForeignHandle for PyHandle {
    fn to_native(&self) -> Option<EngineValue> {
        Python::with_gil(|py| collection(self.0.bind(py)))
    }

    fn repr(&self) -> String {
        Python::with_gil(|py| display(self.0.bind(py)))
    }
}

impl Drop for PyHandle {
    fn drop(&mut self) {
        // Release the reference now rather than at the next GIL acquisition
        Python::with_gil(|py| {
            let object = std::mem::replace(&mut self.0, py.None());
            drop(object);
        });
    }
}
