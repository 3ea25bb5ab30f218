//! # Plugin Registry
//!
//! Turns declared plugin descriptors into loaded, tagged implementations.
//!
//! ## Loading
//!
//! For each descriptor:
//! 1. Resolve `src` against the base URL and derive its identity tag
//! 2. Nothing to do if the `(name, kind)` slot is already loaded under that tag
//! 3. If the component registry already binds the tag, record the slot at once
//! 4. Otherwise reserve the tag as pending and load the module; requests for a
//!    pending tag wait on the load in flight instead of starting another
//!
//! State sits behind a mutex that is never held across an `.await`. Loads are
//! handed back as [`PendingLoads`] for the caller to drive, and every change
//! to the loaded set is published on a watch channel.

use crate::components::{ComponentRegistry, PluginContext};
use crate::descriptor::{LoadedPlugins, PluginDescriptor, PluginKind, PluginSet};
use crate::error::{LoadError, PluginError, PluginResult};
use crate::host::HostEvent;
use crate::identity::{plugin_tag, resolve_locator, TagCache};
use crate::loader::{LoadResult, ModuleLoader};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use quire_editor::{EditSession, EventBus};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use url::Url;

/// A load that did not produce a module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadFailure {
    pub tag: String,
    pub locator: String,
    pub error: LoadError,
    pub time: DateTime<Utc>,
}

/// Loads started by a registry call
///
/// Each load only makes progress while this is awaited (or spawned); until
/// then its tag stays pending.
#[must_use = "pending loads do nothing unless awaited or spawned"]
#[derive(Default)]
pub struct PendingLoads {
    loads: Vec<BoxFuture<'static, ()>>,
}

impl PendingLoads {
    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn extend(&mut self, other: PendingLoads) {
        self.loads.extend(other.loads);
    }

    /// Drive every load to completion
    pub async fn wait(self) {
        join_all(self.loads).await;
    }

    /// Drive the loads on the tokio runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.wait())
    }
}

impl fmt::Debug for PendingLoads {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PendingLoads").field("loads", &self.loads.len()).finish()
    }
}

#[derive(Default)]
struct RegistryState {
    declared: PluginSet,
    loaded: LoadedPlugins,

    /// Tags with a load in flight, and the slots waiting on each
    pending: HashMap<String, Vec<(PluginKind, PluginDescriptor)>>,

    failures: Vec<LoadFailure>,
    tags: TagCache,
}

#[derive(Clone)]
pub struct PluginRegistry {
    base_url: Option<Url>,
    loader: Arc<dyn ModuleLoader>,
    components: ComponentRegistry,
    state: Arc<Mutex<RegistryState>>,
    published: Arc<watch::Sender<LoadedPlugins>>,
}

impl PluginRegistry {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self::with_components(loader, ComponentRegistry::new())
    }

    /// Registry binding into an existing component table
    pub fn with_components(loader: Arc<dyn ModuleLoader>, components: ComponentRegistry) -> Self {
        let (published, _) = watch::channel(LoadedPlugins::new());
        Self {
            base_url: None,
            loader,
            components,
            state: Arc::new(Mutex::new(RegistryState::default())),
            published: Arc::new(published),
        }
    }

    /// Base for relative `src` locators
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the declared plugin set and load whatever is missing
    pub fn set_plugins(&self, plugins: PluginSet) -> PendingLoads {
        let mut state = self.state();
        state.declared = plugins.clone();

        let before = state.loaded.len();
        state.loaded.retain_declared(&plugins);
        if state.loaded.len() != before {
            self.publish(&state);
        }

        let mut pending = PendingLoads::default();
        for (kind, descriptor) in plugins.iter() {
            if let Some(load) = self.request(&mut state, kind, descriptor.clone()) {
                pending.loads.push(load);
            }
        }
        tracing::debug!(declared = plugins.len(), loads = pending.len(), "plugin set updated");
        pending
    }

    /// Add, replace or (with `None`) remove the plugin `(name, kind)`
    ///
    /// The descriptor is stored under `name` whatever name it carries.
    pub fn configure(
        &self,
        name: &str,
        kind: PluginKind,
        config: Option<PluginDescriptor>,
    ) -> PendingLoads {
        let mut state = self.state();
        let mut pending = PendingLoads::default();

        // Any earlier load of this slot is stale now
        for waiters in state.pending.values_mut() {
            waiters.retain(|(k, d)| !(*k == kind && d.name == name));
        }
        let dropped = state.loaded.remove(kind, name);

        match config {
            None => {
                state.declared.remove(kind, name);
                tracing::info!(%kind, name, "plugin removed");
            }
            Some(mut descriptor) => {
                if descriptor.name != name {
                    tracing::warn!(%kind, name, given = %descriptor.name, "descriptor renamed to its slot");
                    descriptor.name = name.to_string();
                }
                state.declared.upsert(kind, name, descriptor.clone());
                if let Some(load) = self.request(&mut state, kind, descriptor) {
                    pending.loads.push(load);
                }
            }
        }

        if dropped.is_some() {
            self.publish(&state);
        }
        pending
    }

    fn request(
        &self,
        state: &mut RegistryState,
        kind: PluginKind,
        descriptor: PluginDescriptor,
    ) -> Option<BoxFuture<'static, ()>> {
        let locator = match resolve_locator(self.base_url.as_ref(), &descriptor.src) {
            Ok(locator) => locator,
            Err(error) => {
                tracing::warn!(name = %descriptor.name, %kind, %error, "cannot resolve plugin");
                state.failures.push(LoadFailure {
                    tag: plugin_tag(&descriptor.src),
                    locator: descriptor.src.clone(),
                    error,
                    time: Utc::now(),
                });
                return None;
            }
        };
        let tag = state.tags.tag(&locator);

        match state.loaded.tag_of(kind, &descriptor.name).map(str::to_string) {
            Some(current) if current == tag => {
                // Same module; only the descriptor metadata may have changed
                if state.loaded.get(kind, &descriptor.name).map(|(d, _)| d) != Some(&descriptor) {
                    state.loaded.insert(kind, descriptor, tag);
                    self.publish(state);
                }
                return None;
            }
            Some(_) => {
                // Loaded from another module before; that binding no longer applies
                state.loaded.remove(kind, &descriptor.name);
                self.publish(state);
            }
            None => {}
        }

        if self.components.is_defined(&tag) {
            tracing::debug!(name = %descriptor.name, %kind, tag = %tag, "module already bound");
            state.loaded.insert(kind, descriptor, tag);
            self.publish(state);
            return None;
        }

        if let Some(waiters) = state.pending.get_mut(&tag) {
            tracing::debug!(name = %descriptor.name, %kind, tag = %tag, "joining load in flight");
            waiters.retain(|(k, d)| !(*k == kind && d.name == descriptor.name));
            waiters.push((kind, descriptor));
            return None;
        }

        tracing::info!(name = %descriptor.name, %kind, %locator, tag = %tag, "loading plugin module");
        state.pending.insert(tag.clone(), vec![(kind, descriptor)]);
        let load = self.loader.load(&locator);
        let registry = self.clone();
        Some(
            async move {
                let result = load.await;
                registry.finish(tag, locator, result);
            }
            .boxed(),
        )
    }

    fn finish(&self, tag: String, locator: Url, result: LoadResult) {
        let mut state = self.state();
        let waiters = state.pending.remove(&tag).unwrap_or_default();

        match result {
            Ok(component) => {
                if !self.components.define(&tag, component) {
                    tracing::debug!(tag = %tag, "tag bound while loading, keeping first binding");
                }
                state.failures.retain(|f| f.tag != tag);

                let mut recorded = 0;
                for (kind, descriptor) in waiters {
                    if state.declared.find(kind, &descriptor.name) != Some(&descriptor) {
                        continue;
                    }
                    state.loaded.insert(kind, descriptor, tag.clone());
                    recorded += 1;
                }
                tracing::info!(tag = %tag, %locator, plugins = recorded, "plugin module loaded");
                self.publish(&state);
            }
            Err(error) => {
                tracing::warn!(tag = %tag, %locator, %error, "plugin failed to load");
                state.failures.push(LoadFailure {
                    tag,
                    locator: locator.to_string(),
                    error,
                    time: Utc::now(),
                });
            }
        }
    }

    fn publish(&self, state: &RegistryState) {
        self.published.send_replace(state.loaded.clone());
    }

    pub fn declared(&self) -> PluginSet {
        self.state().declared.clone()
    }

    pub fn loaded(&self) -> LoadedPlugins {
        self.state().loaded.clone()
    }

    /// Receiver updated whenever the loaded set changes
    pub fn subscribe(&self) -> watch::Receiver<LoadedPlugins> {
        self.published.subscribe()
    }

    pub fn failures(&self) -> Vec<LoadFailure> {
        self.state().failures.clone()
    }

    pub fn is_pending(&self, tag: &str) -> bool {
        self.state().pending.contains_key(tag)
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Run the loaded menu plugin `name` against the session's current document
    pub fn activate(
        &self,
        name: &str,
        session: &mut EditSession,
        bus: &EventBus<HostEvent>,
    ) -> PluginResult<()> {
        let not_loaded = || PluginError::NotLoaded {
            name: name.to_string(),
            kind: PluginKind::Menu,
        };

        let (descriptor, tag) = {
            let state = self.state();
            let (descriptor, tag) = state.loaded.get(PluginKind::Menu, name).ok_or_else(not_loaded)?;
            (descriptor.clone(), tag.to_string())
        };
        let component = self.components.get(&tag).ok_or_else(not_loaded)?;

        if descriptor.requires_doc() && session.document().is_none() {
            tracing::warn!(name, "plugin needs an open document, skipping");
            return Err(PluginError::RequiresDocument(name.to_string()));
        }

        tracing::debug!(name, tag = %tag, "activating plugin");
        let mut cx = PluginContext::new(session.node_factory(), bus);
        component.run(&mut cx);
        Ok(())
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("base_url", &self.base_url)
            .field("components", &self.components)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PluginComponent;
    use crate::loader::StaticModuleLoader;

    struct Noop;

    impl PluginComponent for Noop {
        fn run(&self, _cx: &mut PluginContext<'_>) {}
    }

    fn registry() -> PluginRegistry {
        let loader = StaticModuleLoader::new().with_module("builtin:noop", Arc::new(Noop));
        PluginRegistry::new(Arc::new(loader))
    }

    fn menu(name: &str, src: &str) -> PluginSet {
        PluginSet {
            menu: vec![PluginDescriptor::new(name, src)],
            editor: vec![],
        }
    }

    #[tokio::test]
    async fn test_load_records_tag() {
        let registry = registry();
        let pending = registry.set_plugins(menu("Noop", "builtin:noop"));
        assert_eq!(pending.len(), 1);
        assert!(registry.loaded().is_empty());

        pending.wait().await;

        let loaded = registry.loaded();
        assert_eq!(loaded.tag_of(PluginKind::Menu, "Noop"), Some(plugin_tag("builtin:noop").as_str()));
        assert!(registry.failures().is_empty());
    }

    #[tokio::test]
    async fn test_reload_of_loaded_slot_is_noop() {
        let registry = registry();
        registry.set_plugins(menu("Noop", "builtin:noop")).wait().await;

        let again = registry.set_plugins(menu("Noop", "builtin:noop"));
        assert!(again.is_empty());
        assert_eq!(registry.loaded().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let registry = registry();
        registry.set_plugins(menu("Missing", "builtin:missing")).wait().await;

        assert!(registry.loaded().is_empty());
        let failures = registry.failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].error, LoadError::NotFound(_)));
    }

    #[test]
    fn test_unresolvable_locator_fails_synchronously() {
        let registry = registry();
        let pending = registry.set_plugins(menu("Relative", "plugins/a.js"));

        assert!(pending.is_empty());
        assert!(matches!(
            registry.failures()[0].error,
            LoadError::InvalidLocator { .. }
        ));
    }

    #[tokio::test]
    async fn test_configure_remove() {
        let registry = registry();
        registry.set_plugins(menu("Noop", "builtin:noop")).wait().await;

        let pending = registry.configure("Noop", PluginKind::Menu, None);
        assert!(pending.is_empty());
        assert!(registry.loaded().is_empty());
        assert!(registry.declared().is_empty());
    }

    #[test]
    fn test_activate_requires_loaded_plugin() {
        let registry = registry();
        let mut session = EditSession::new();
        let (bus, _rx) = EventBus::<HostEvent>::channel();

        assert!(matches!(
            registry.activate("Nope", &mut session, &bus),
            Err(PluginError::NotLoaded { .. })
        ));
    }
}
