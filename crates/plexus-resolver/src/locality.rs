//! Heuristic lookup shortcuts.
//!
//! [`NamespaceOwners`] remembers, for every namespace, which plugins most
//! recently defined something in it. [`LocalNamespaces`] remembers, per
//! plugin, which namespaces its own libraries are known to provide. Both are
//! hints only; a stale entry costs a failed local lookup, never a wrong
//! answer.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use tracing::debug;

use crate::descriptor::PluginId;
use crate::namespace::{ancestor_namespaces, parent_namespace};

/// Runtime-wide map of namespace to owning plugins, most recent first.
#[derive(Debug, Default)]
pub struct NamespaceOwners {
    owners: DashMap<String, Vec<PluginId>>,
    warn_threshold: usize,
}

impl NamespaceOwners {
    /// Create an empty map that reports namespaces split across more than
    /// `warn_threshold` plugins.
    #[must_use]
    pub fn new(warn_threshold: usize) -> Self {
        Self {
            owners: DashMap::new(),
            warn_threshold,
        }
    }

    /// Move `plugin_id` to the front of the owners of `name`'s namespace.
    ///
    /// Names without a namespace are ignored.
    pub fn promote(&self, name: &str, plugin_id: &PluginId) {
        let Some(namespace) = parent_namespace(name) else {
            return;
        };
        let mut owners = self.owners.entry(namespace.to_string()).or_default();
        owners.retain(|id| id != plugin_id);
        owners.insert(0, plugin_id.clone());
        if owners.len() > self.warn_threshold {
            debug!(
                namespace,
                owners = ?owners.as_slice(),
                "same namespace is provided by several plugins"
            );
        }
        debug!(namespace, plugin_id = %plugin_id, "registered namespace owner");
    }

    /// Owners of `name`'s namespace, most recent first.
    #[must_use]
    pub fn guesses(&self, name: &str) -> Vec<PluginId> {
        parent_namespace(name).map_or_else(Vec::new, |ns| self.owners_of(ns))
    }

    /// Owners of every namespace above `name`'s own, nearest namespace
    /// first, most recent owner first within a namespace.
    #[must_use]
    pub fn ancestor_guesses(&self, name: &str) -> Vec<PluginId> {
        ancestor_namespaces(name)
            .flat_map(|ns| self.owners_of(ns))
            .collect()
    }

    /// Owners of exactly `namespace`.
    #[must_use]
    pub fn owners_of(&self, namespace: &str) -> Vec<PluginId> {
        self.owners
            .get(namespace)
            .map(|owners| owners.clone())
            .unwrap_or_default()
    }

    /// Drop `plugin_id` from every namespace, removing namespaces left
    /// without owners.
    ///
    /// Used when a guessed owner turns out to be unknown to the registry.
    pub fn forget(&self, plugin_id: &PluginId) {
        self.owners.retain(|_, owners| {
            owners.retain(|id| id != plugin_id);
            !owners.is_empty()
        });
    }

    /// Number of namespaces with at least one recorded owner.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Namespaces a single plugin has resolved from its own libraries.
#[derive(Debug, Default)]
pub struct LocalNamespaces {
    namespaces: RwLock<HashSet<String>>,
}

impl LocalNamespaces {
    /// Whether `name`'s namespace is known to be local.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        let Some(namespace) = parent_namespace(name) else {
            return false;
        };
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(namespace)
    }

    /// Record `name`'s namespace as local.
    pub fn record(&self, name: &str) {
        let Some(namespace) = parent_namespace(name) else {
            return;
        };
        if self.contains_name(name) {
            return;
        }
        let inserted = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string());
        if inserted {
            debug!(namespace, "registered local namespace");
        }
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of local namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no namespace is known to be local.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
