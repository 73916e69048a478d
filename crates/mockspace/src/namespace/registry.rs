//! NamespaceRegistry - lifecycle management for namespaces.

use super::core::Namespace;
use super::types::NamespaceError;
use crate::config::UrlComparison;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns every active namespace, keyed by id.
pub struct NamespaceRegistry {
    namespaces: RwLock<HashMap<String, Arc<Namespace>>>,
    url_comparison: UrlComparison,
}

impl NamespaceRegistry {
    pub fn new(url_comparison: UrlComparison) -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            url_comparison,
        }
    }

    /// Create an empty namespace and return it.
    pub fn create(&self, strict: bool) -> Arc<Namespace> {
        let mut namespaces = self.namespaces.write();
        let id = loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !namespaces.contains_key(&candidate) {
                break candidate;
            }
        };
        let namespace = Arc::new(Namespace::new(id.clone(), strict, self.url_comparison));
        namespaces.insert(id.clone(), Arc::clone(&namespace));
        info!(namespace = %id, strict, "Namespace created");
        namespace
    }

    pub fn get(&self, id: &str) -> Result<Arc<Namespace>, NamespaceError> {
        self.namespaces
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| NamespaceError::NotFound(id.to_string()))
    }

    /// Remove a namespace. Strict namespaces with unexercised rules are kept
    /// and `UnmetExpectations` is returned.
    pub fn destroy(&self, id: &str) -> Result<(), NamespaceError> {
        let mut namespaces = self.namespaces.write();
        let namespace = namespaces
            .get(id)
            .ok_or_else(|| NamespaceError::NotFound(id.to_string()))?;

        if namespace.is_strict() {
            let unmet = namespace.unmet_rules();
            if !unmet.is_empty() {
                warn!(namespace = %id, ?unmet, "Refusing to close strict namespace");
                return Err(NamespaceError::UnmetExpectations {
                    namespace_id: id.to_string(),
                    unmet,
                });
            }
        }

        namespaces.remove(id);
        info!(namespace = %id, "Namespace deleted");
        Ok(())
    }

    pub fn reset(&self, id: &str) -> Result<(), NamespaceError> {
        self.get(id)?.reset();
        info!(namespace = %id, "Namespace reset");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.namespaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.namespaces.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every namespace regardless of strictness. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut namespaces = self.namespaces.write();
        let count = namespaces.len();
        namespaces.clear();
        if count > 0 {
            info!("Dropped {} namespace(s)", count);
        }
        count
    }

    pub fn url_comparison(&self) -> UrlComparison {
        self.url_comparison
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new(UrlComparison::default())
    }
}
