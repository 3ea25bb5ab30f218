//! # Host
//!
//! Wires an [`EditSession`] and a [`PluginRegistry`] to one event bus. Editor
//! events go to the session; plugin configuration events go to the registry.

use crate::config::Config;
use crate::descriptor::{PluginDescriptor, PluginKind, PluginSet};
use crate::error::PluginResult;
use crate::loader::ModuleLoader;
use crate::registry::{PendingLoads, PluginRegistry};
use chrono::{DateTime, Utc};
use quire_editor::{Diagnostic, DiagnosticKind, EditSession, EditorError, EditorEvent, EventBus};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum HostEvent {
    Editor(EditorEvent),

    /// Add, replace or (with `config: None`) remove a plugin
    ConfigurePlugin {
        name: String,
        kind: PluginKind,
        config: Option<PluginDescriptor>,
    },
}

impl From<EditorEvent> for HostEvent {
    fn from(event: EditorEvent) -> Self {
        HostEvent::Editor(event)
    }
}

pub struct Host {
    session: EditSession,
    registry: PluginRegistry,
    bus: EventBus<HostEvent>,
    events: mpsc::UnboundedReceiver<HostEvent>,
    loads: PendingLoads,

    /// Failures already copied into the diagnostics log
    reported: HashSet<(String, DateTime<Utc>)>,
}

impl Host {
    pub fn new(registry: PluginRegistry) -> Self {
        let (bus, events) = EventBus::<HostEvent>::channel();
        Self {
            session: EditSession::new(),
            registry,
            bus,
            events,
            loads: PendingLoads::default(),
            reported: HashSet::new(),
        }
    }

    /// Host whose registry declares the configured plugins
    ///
    /// Loading starts on the next [`settle`](Self::settle).
    pub fn from_config(config: &Config, loader: Arc<dyn ModuleLoader>) -> PluginResult<Self> {
        let mut registry = PluginRegistry::new(loader);
        if let Some(base_url) = config.base_url()? {
            registry = registry.with_base_url(base_url);
        }
        let mut host = Self::new(registry);
        host.set_plugins(config.plugins.clone());
        Ok(host)
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn bus(&self) -> EventBus<HostEvent> {
        self.bus.clone()
    }

    pub fn set_plugins(&mut self, plugins: PluginSet) {
        let loads = self.registry.set_plugins(plugins);
        self.loads.extend(loads);
    }

    pub fn handle(&mut self, event: HostEvent) -> Result<(), EditorError> {
        match event {
            HostEvent::Editor(event) => self.session.handle(event),
            HostEvent::ConfigurePlugin { name, kind, config } => {
                let loads = self.registry.configure(&name, kind, config);
                self.loads.extend(loads);
                Ok(())
            }
        }
    }

    /// Handle every queued event, returning how many were handled
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            if let Err(err) = self.handle(event) {
                tracing::warn!(error = %err, "event failed");
            }
            handled += 1;
        }
        handled
    }

    /// Process events and finish plugin loads until both run dry
    ///
    /// Load failures end up in the session's diagnostics.
    pub async fn settle(&mut self) {
        loop {
            self.process_pending();
            if self.loads.is_empty() {
                break;
            }
            std::mem::take(&mut self.loads).wait().await;
        }
        self.report_failures();
    }

    fn report_failures(&mut self) {
        for failure in self.registry.failures() {
            if !self.reported.insert((failure.tag.clone(), failure.time)) {
                continue;
            }
            self.session.log(
                Diagnostic::new(DiagnosticKind::Warning, "Plugin failed to load")
                    .with_message(failure.error.to_string()),
            );
        }
    }

    /// Run a loaded menu plugin and apply whatever it dispatched
    pub fn activate(&mut self, name: &str) -> PluginResult<()> {
        self.registry.activate(name, &mut self.session, &self.bus)?;
        self.process_pending();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{PluginComponent, PluginContext};
    use crate::loader::StaticModuleLoader;
    use quire_editor::Edit;

    /// Removes the first child of the document element
    struct DropFirst;

    impl PluginComponent for DropFirst {
        fn run(&self, cx: &mut PluginContext<'_>) {
            let Some(doc) = cx.document() else { return };
            let Some(first) = doc.document_element().and_then(|e| doc.children(e).first().copied()) else {
                return;
            };
            cx.dispatch(EditorEvent::titled_edit(Edit::remove(first), "drop first"));
        }
    }

    fn host() -> Host {
        let loader = StaticModuleLoader::new().with_module("builtin:drop-first", Arc::new(DropFirst));
        let mut config = Config::default();
        config.plugins.menu.push(PluginDescriptor::new("Drop", "builtin:drop-first").requiring_doc());
        config.plugins.editor.push(PluginDescriptor::new("Broken", "builtin:broken"));
        Host::from_config(&config, Arc::new(loader)).unwrap()
    }

    #[tokio::test]
    async fn test_settle_loads_and_reports_failures() {
        let mut host = host();
        host.settle().await;

        assert!(host.registry().loaded().contains(PluginKind::Menu, "Drop"));
        let diagnostics = host.session().diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Warning);

        host.settle().await;
        assert_eq!(host.session().diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn test_activate_commits_dispatched_edit() {
        let mut host = host();
        host.settle().await;

        assert!(host.activate("Drop").is_err());

        host.session_mut().open_source("doc.xml", "<a><b/><c/></a>").unwrap();
        host.activate("Drop").unwrap();

        let session = host.session();
        assert_eq!(session.history().undo_title(), Some("drop first"));
        assert_eq!(quire_dom::serialize(session.document().unwrap()), "<a><c/></a>");
    }

    #[tokio::test]
    async fn test_configure_event_loads_plugin() {
        let mut host = host();
        host.settle().await;

        host.bus().dispatch(HostEvent::ConfigurePlugin {
            name: "Broken".to_string(),
            kind: PluginKind::Editor,
            config: Some(PluginDescriptor::new("Broken", "builtin:drop-first")),
        });
        host.settle().await;

        let loaded = host.registry().loaded();
        assert_eq!(
            loaded.tag_of(PluginKind::Editor, "Broken"),
            loaded.tag_of(PluginKind::Menu, "Drop")
        );
        assert_eq!(host.registry().components().len(), 1);
    }
}
