// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable stores the overlay reads and mutates.

use std::collections::BTreeMap;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./env_test.rs"]
mod env_test;

/// A string-keyed variable store.
///
/// Implementations must keep "unset" and "set to the empty string" apart:
/// [`EnvStore::get`] returns `None` only for unset variables.
pub trait EnvStore {
    /// Read a variable, `None` when it is not set.
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Set a variable, creating it if needed.
    fn set(&mut self, name: &str, value: &str);

    /// Remove a variable if present.
    fn remove(&mut self, name: &str);

    /// Read a variable, treating unset as the empty string.
    fn get_or_default(&self, name: &str) -> Result<String> {
        Ok(self.get(name)?.unwrap_or_default())
    }

    /// Restore a variable to a previously read value.
    fn restore(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(value) => self.set(name, value),
            None => self.remove(name),
        }
    }
}

/// The environment of the current process.
///
/// Mutating the process environment is only sound while no other thread
/// reads or writes it. The overlay is driven by a single control thread, and
/// this type must not be used from anywhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }
}

impl EnvStore for ProcessEnv {
    fn get(&self, name: &str) -> Result<Option<String>> {
        match std::env::var_os(name) {
            None => Ok(None),
            Some(value) => value
                .into_string()
                .map(Some)
                .map_err(|_| Error::NonUnicodeVariable(name.to_string())),
        }
    }

    fn set(&mut self, name: &str, value: &str) {
        // SAFETY: the process environment is only touched from the single
        // control thread that owns this store.
        unsafe { std::env::set_var(name, value) }
    }

    fn remove(&mut self, name: &str) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(name) }
    }
}

/// An in-memory variable store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the named variables that are set in `source`.
    pub fn capture<S: EnvStore>(source: &S, names: &[&str]) -> Result<Self> {
        let mut env = Self::new();
        for name in names {
            if let Some(value) = source.get(name)? {
                env.set(name, &value);
            }
        }
        Ok(env)
    }

    /// Iterate over all variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.vars.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    fn remove(&mut self, name: &str) {
        self.vars.remove(name);
    }
}

/// Join entries with the platform list separator.
pub fn join_list<I, S>(entries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for (i, entry) in entries.into_iter().enumerate() {
        if i > 0 {
            joined.push(crate::PATH_LIST_SEPARATOR);
        }
        joined.push_str(entry.as_ref());
    }
    joined
}
