//! Ordered `KEY=VALUE` lists
//!
//! Used for creation options, open options and metadata domains.

use std::fmt::{Debug, Formatter};

use crate::config::is_true;
use crate::errors::{GeoDataError, Result};

/// An ordered list of `KEY=VALUE` pairs.
///
/// Keys are compared ASCII case-insensitively; the spelling of the first
/// insertion is kept.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NameValueList {
    entries: Vec<(String, String)>,
}

impl NameValueList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `name`.
    ///
    /// Overwrites duplicate `name`s.
    ///
    /// Returns `Err` if `name` has non alphanumeric characters, or `value`
    /// has newline characters.
    pub fn set_name_value(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(GeoDataError::BadArgument(format!(
                "Invalid characters in name: '{name}'"
            )));
        }
        if value.contains(['\n', '\r']) {
            return Err(GeoDataError::BadArgument(format!(
                "Invalid characters in value: '{value}'"
            )));
        }

        match self.position(name) {
            Some(idx) => self.entries[idx].1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Parses and adds a `KEY=VALUE` string.
    pub fn add_string(&mut self, entry: &str) -> Result<()> {
        match entry.split_once('=') {
            Some((name, value)) => self.set_name_value(name.trim(), value),
            None => Err(GeoDataError::BadArgument(format!(
                "Expected KEY=VALUE, got '{entry}'"
            ))),
        }
    }

    /// Removes `name`, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Looks up the value corresponding to `key`.
    pub fn fetch_name_value(&self, key: &str) -> Option<&str> {
        self.position(key).map(|idx| self.entries[idx].1.as_str())
    }

    /// Looks up `key` and interprets it as a boolean (`YES`, `ON`, `TRUE`, `1`).
    pub fn fetch_bool(&self, key: &str, default: bool) -> bool {
        self.fetch_name_value(key).map(is_true).unwrap_or(default)
    }

    /// Determine the number of entries in the list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Determine if the list has any values
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an iterator over the name/value elements of the list.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the list as `KEY=VALUE` strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

impl Debug for NameValueList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (k, v) in self.iter() {
            f.write_fmt(format_args!("{k}={v}\n"))?;
        }
        Ok(())
    }
}

/// Convenience shorthand for specifying an empty `NameValueList`.
impl From<()> for NameValueList {
    fn from(_: ()) -> Self {
        NameValueList::default()
    }
}

/// Creates a [`NameValueList`] from a slice of _key_/_value_ tuples.
impl<const N: usize> From<&[(&str, &str); N]> for NameValueList {
    fn from(pairs: &[(&str, &str); N]) -> Self {
        let mut result = Self::default();
        for (k, v) in pairs {
            result.set_name_value(k, v).expect("valid key/value pair");
        }
        result
    }
}

/// Parses a slice of `KEY=VALUE` strings.
impl TryFrom<&[&str]> for NameValueList {
    type Error = GeoDataError;

    fn try_from(entries: &[&str]) -> Result<Self> {
        let mut result = Self::default();
        for entry in entries {
            result.add_string(entry)?;
        }
        Ok(result)
    }
}
