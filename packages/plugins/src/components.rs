//! # Component Registry
//!
//! Host-side table of plugin implementations keyed by identity tag. The first
//! binding for a tag wins; later attempts are ignored.

use crate::host::HostEvent;
use quire_dom::{Document, NodeId};
use quire_editor::{EventBus, NodeFactory};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A loaded plugin implementation
pub trait PluginComponent: Send + Sync {
    /// Run against the current document
    ///
    /// Mutations go through `cx.dispatch`; the context never hands out the
    /// attached tree mutably.
    fn run(&self, cx: &mut PluginContext<'_>);
}

/// What a running plugin may see and do
pub struct PluginContext<'a> {
    nodes: Option<NodeFactory<'a>>,
    bus: &'a EventBus<HostEvent>,
}

impl<'a> PluginContext<'a> {
    pub fn new(nodes: Option<NodeFactory<'a>>, bus: &'a EventBus<HostEvent>) -> Self {
        Self { nodes, bus }
    }

    pub fn document(&self) -> Option<&Document> {
        self.nodes.as_ref().map(|n| n.document())
    }

    /// Create a detached element for a later `Insert`
    pub fn create_element(&mut self, name: &str) -> Option<NodeId> {
        self.nodes.as_mut().map(|n| n.create_element(name))
    }

    pub fn create_text(&mut self, text: &str) -> Option<NodeId> {
        self.nodes.as_mut().map(|n| n.create_text(text))
    }

    pub fn dispatch(&self, event: impl Into<HostEvent>) -> bool {
        self.bus.dispatch(event)
    }
}

/// Shared tag → implementation table
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: Arc<RwLock<HashMap<String, Arc<dyn PluginComponent>>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `component` under `tag` unless the tag is already bound
    ///
    /// Returns whether this call created the binding.
    pub fn define(&self, tag: &str, component: Arc<dyn PluginComponent>) -> bool {
        let mut components = self.components.write().unwrap_or_else(PoisonError::into_inner);
        if components.contains_key(tag) {
            return false;
        }
        components.insert(tag.to_string(), component);
        true
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn PluginComponent>> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.components.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let components = self.components.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ComponentRegistry")
            .field("tags", &components.keys().collect::<Vec<_>>())
            .finish()
    }
}
