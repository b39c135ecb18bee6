//! Turning user-supplied values into content.
//!
//! A value is either a path to a readable file or the content itself. Only
//! a file that exists but cannot be read is an error; anything that does not
//! name a file is taken literally.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::error::{FlamapyError, Result};

/// Suffix marking configuration files
pub const CONFIG_SUFFIX: &str = ".csvconf";

/// Resolve `value` to content: the text of the file it names, or `value`
/// itself.
pub fn resolve(value: &str) -> Result<Cow<'_, str>> {
    if !is_file(value) {
        return Ok(Cow::Borrowed(value));
    }

    fs::read_to_string(value)
        .map(Cow::Owned)
        .map_err(|source| FlamapyError::Unreadable {
            path: value.into(),
            source,
        })
}

/// Whether `value` names a configuration file by suffix
pub fn is_config_like(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.ends_with(CONFIG_SUFFIX))
}

/// Resolve a configuration parameter.
///
/// A value carrying the configuration suffix must name a readable file;
/// any other value goes through [`resolve`].
pub fn resolve_configuration(value: &str) -> Result<Cow<'_, str>> {
    if is_config_like(Some(value)) {
        log::debug!("Reading configuration file {}", value);
        return fs::read_to_string(value)
            .map(Cow::Owned)
            .map_err(|source| FlamapyError::Unreadable {
                path: value.into(),
                source,
            });
    }
    resolve(value)
}

// Content such as a whole model is not a plausible path; a failed metadata
// call means "not a file".
fn is_file(value: &str) -> bool {
    if value.is_empty() || value.contains('\n') {
        return false;
    }
    fs::metadata(Path::new(value)).is_ok_and(|m| m.is_file())
}
