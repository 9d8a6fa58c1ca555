//! Environment variable parsing with type safety.
//!
//! Provides a type-safe parser for `FONTSRC_*` environment variables with
//! validation, error collection, and source tracking.

use super::source::Sourced;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during environment variable parsing.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Invalid value for a variable.
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    /// Value out of valid range.
    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: String,
        min: String,
        max: String,
    },
}

/// Type-safe environment variable parser.
///
/// Collects errors during parsing so all issues can be reported at once.
/// Every getter returns `None` when the variable is unset so callers can
/// layer the result over file and default values.
pub struct EnvParser {
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvParser {
    /// Create a new parser with the FONTSRC_ prefix.
    pub fn new() -> Self {
        Self::with_prefix("FONTSRC_")
    }

    pub fn with_prefix(prefix: &'static str) -> Self {
        Self {
            prefix,
            errors: Vec::new(),
        }
    }

    /// Get all accumulated errors.
    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    /// Check if any errors occurred.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take ownership of errors.
    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Get the full variable name with prefix.
    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Get a path value, with `~` expanded to the home directory.
    pub fn get_path(&mut self, name: &str) -> Option<Sourced<PathBuf>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok().filter(|v| !v.is_empty())?;
        Some(Sourced::from_env(expand_home(&value), var_name))
    }

    /// Get a boolean value.
    ///
    /// Accepts: 1, true, yes, on (for true)
    ///          0, false, no, off, "" (for false)
    pub fn get_bool(&mut self, name: &str) -> Option<Sourced<bool>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok()?;
        let parsed = match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                self.errors.push(EnvError::InvalidValue {
                    var: var_name,
                    expected: "boolean (true/false/1/0/yes/no)".to_string(),
                    value,
                });
                return None;
            }
        };
        Some(Sourced::from_env(parsed, var_name))
    }

    /// Get a u32 value with range validation.
    pub fn get_u32_range(&mut self, name: &str, min: u32, max: u32) -> Option<Sourced<u32>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok()?;
        match value.parse::<u32>() {
            Ok(n) if n >= min && n <= max => Some(Sourced::from_env(n, var_name)),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var: var_name,
                    value: n.to_string(),
                    min: min.to_string(),
                    max: max.to_string(),
                });
                None
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var: var_name,
                    expected: "unsigned 32-bit integer".to_string(),
                    value,
                });
                None
            }
        }
    }

    /// Get a comma-separated list; blank items are dropped.
    pub fn get_list(&mut self, name: &str) -> Option<Sourced<Vec<String>>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok()?;
        let items = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Some(Sourced::from_env(items, var_name))
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(value: &str) -> PathBuf {
    if value == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(value));
    }
    if let Some(rest) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(value)
}
