//! # Edit Session Management
//!
//! An EditSession owns everything one editing session mutates: the open
//! documents, the undo/redo history of the current document, the wizard
//! queue and the diagnostics log. It is created when editing starts and
//! dropped when it ends; nothing here is process-wide.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::edits::Edit;
use crate::events::EditorEvent;
use crate::history::{CommitOptions, History};
use crate::wizards::{WizardQueue, WizardRequest};
use crate::EditorError;
use quire_dom::{Document, NodeId};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct EditSession {
    /// Open documents by name
    documents: BTreeMap<String, Document>,

    /// Name of the document being edited
    current: Option<String>,

    history: History,

    wizards: WizardQueue,

    diagnostics: Vec<Diagnostic>,
}

/// Create-only access to the current document
///
/// Hands out detached nodes that an `Insert` edit can then attach. Nothing
/// reachable from here changes the attached tree.
pub struct NodeFactory<'a> {
    doc: &'a mut Document,
}

impl NodeFactory<'_> {
    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.doc.create_element(name)
    }

    pub fn create_element_ns(&mut self, namespace: Option<String>, name: impl Into<String>) -> NodeId {
        self.doc.create_element_ns(namespace, name)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.doc.create_text(text)
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `doc` under `name` and start editing it
    ///
    /// History and pending wizards refer to the previous document, so both
    /// are reset.
    pub fn open_document(&mut self, name: impl Into<String>, doc: Document) {
        let name = name.into();
        tracing::info!(doc_name = %name, nodes = doc.len(), "opened document");
        self.documents.insert(name.clone(), doc);
        self.current = Some(name);
        self.history.clear();
        self.wizards.clear();
    }

    /// Parse `source` and open it under `name`
    pub fn open_source(&mut self, name: impl Into<String>, source: &str) -> Result<(), EditorError> {
        let doc = quire_dom::parse(source)?;
        self.open_document(name, doc);
        Ok(())
    }

    /// Read and open a file, named after its file name
    pub fn load(&mut self, path: &Path) -> Result<(), EditorError> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.open_source(name, &source)
    }

    /// Switch to another open document (history restarts)
    pub fn select_document(&mut self, name: &str) -> Result<(), EditorError> {
        if !self.documents.contains_key(name) {
            return Err(EditorError::UnknownDocument(name.to_string()));
        }
        self.current = Some(name.to_string());
        self.history.clear();
        self.wizards.clear();
        Ok(())
    }

    pub fn document(&self) -> Option<&Document> {
        self.current.as_ref().and_then(|name| self.documents.get(name))
    }

    pub fn document_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn documents(&self) -> &BTreeMap<String, Document> {
        &self.documents
    }

    /// Create-only handle on the current document
    pub fn node_factory(&mut self) -> Option<NodeFactory<'_>> {
        let name = self.current.as_ref()?;
        let doc = self.documents.get_mut(name)?;
        Some(NodeFactory { doc })
    }

    /// Apply `edit` to the current document and record it
    ///
    /// A rejected edit leaves document and history untouched and is logged
    /// as an error diagnostic.
    pub fn commit(&mut self, edit: Edit, options: CommitOptions) -> Result<(), EditorError> {
        let doc = match self.current.as_ref().and_then(|name| self.documents.get_mut(name)) {
            Some(doc) => doc,
            None => return Err(EditorError::NoDocument),
        };

        if let Err(err) = self.history.commit(doc, edit, options) {
            tracing::error!(error = %err, "rejected edit");
            self.diagnostics.push(
                Diagnostic::new(DiagnosticKind::Error, "Invalid edit").with_message(err.to_string()),
            );
            return Err(err.into());
        }
        Ok(())
    }

    pub fn undo(&mut self, n: usize) -> Result<usize, EditorError> {
        let name = self.current.clone().ok_or(EditorError::NoDocument)?;
        let doc = self
            .documents
            .get_mut(&name)
            .ok_or(EditorError::UnknownDocument(name))?;
        Ok(self.history.undo(doc, n)?)
    }

    pub fn redo(&mut self, n: usize) -> Result<usize, EditorError> {
        let name = self.current.clone().ok_or(EditorError::NoDocument)?;
        let doc = self
            .documents
            .get_mut(&name)
            .ok_or(EditorError::UnknownDocument(name))?;
        Ok(self.history.redo(doc, n)?)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn edit_count(&self) -> usize {
        self.history.edit_count()
    }

    pub fn request_wizard(&mut self, request: WizardRequest) {
        self.wizards.enqueue(request);
    }

    /// Close the active wizard
    ///
    /// `closing` is the request the wizard believes it is; the active request
    /// is removed regardless.
    pub fn close_wizard(&mut self, closing: Option<&WizardRequest>) -> Option<WizardRequest> {
        let closed = self.wizards.close();
        if let (Some(expected), Some(actual)) = (closing, closed.as_ref()) {
            if expected != actual {
                tracing::debug!(?expected, ?actual, "close signal did not match the active wizard");
            }
        }
        closed
    }

    pub fn active_wizard(&self) -> Option<&WizardRequest> {
        self.wizards.active()
    }

    pub fn wizards(&self) -> &WizardQueue {
        &self.wizards
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn log(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Route one boundary event
    pub fn handle(&mut self, event: EditorEvent) -> Result<(), EditorError> {
        match event {
            EditorEvent::Edit {
                edit,
                title,
                squash,
            } => self.commit(edit, CommitOptions { title, squash }),
            EditorEvent::OpenDocument { doc, doc_name } => {
                self.open_document(doc_name, doc);
                Ok(())
            }
            EditorEvent::Wizard(request) => {
                self.request_wizard(request);
                Ok(())
            }
            EditorEvent::CloseWizard(request) => {
                self.close_wizard(Some(&request));
                Ok(())
            }
            EditorEvent::Undo(n) => self.undo(n).map(|_| ()),
            EditorEvent::Redo(n) => self.redo(n).map(|_| ()),
        }
    }

    /// Handle every event already queued, returning how many were handled
    ///
    /// A failing event does not stop the drain; its error is logged.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<EditorEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = rx.try_recv() {
            if let Err(err) = self.handle(event) {
                tracing::warn!(error = %err, "event failed");
            }
            handled += 1;
        }
        handled
    }

    /// Handle events until every sender is dropped
    pub async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<EditorEvent>) {
        while let Some(event) = rx.recv().await {
            if let Err(err) = self.handle(event) {
                tracing::warn!(error = %err, "event failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventBus;

    const SOURCE: &str = r#"<Parent><Element><ChildElement a="1"/></Element></Parent>"#;

    #[test]
    fn test_session_creation() {
        let session = EditSession::new();
        assert!(session.document().is_none());
        assert_eq!(session.edit_count(), 0);
        assert!(session.active_wizard().is_none());
    }

    #[test]
    fn test_commit_without_document() {
        let mut session = EditSession::new();
        let result = session.commit(Edit::remove(NodeId(1)), CommitOptions::default());
        assert!(matches!(result, Err(EditorError::NoDocument)));
    }

    #[test]
    fn test_rejected_edit_is_logged() {
        let mut session = EditSession::new();
        session.open_source("test.xml", SOURCE).unwrap();

        let result = session.commit(Edit::remove(NodeId(42)), CommitOptions::default());
        assert!(matches!(result, Err(EditorError::Edit(_))));
        assert_eq!(session.edit_count(), 0);
        assert_eq!(session.diagnostics().len(), 1);
        assert_eq!(session.diagnostics()[0].kind, DiagnosticKind::Error);
    }

    #[test]
    fn test_open_document_resets_history() {
        let mut session = EditSession::new();
        session.open_source("a.xml", SOURCE).unwrap();
        let child = session.document().unwrap().elements_by_name("ChildElement").next().unwrap();
        session.commit(Edit::remove(child), CommitOptions::default()).unwrap();
        session.request_wizard(WizardRequest::edit(child));

        session.open_source("b.xml", "<Other/>").unwrap();
        assert_eq!(session.document_name(), Some("b.xml"));
        assert_eq!(session.documents().len(), 2);
        assert_eq!(session.edit_count(), 0);
        assert!(session.active_wizard().is_none());
    }

    #[test]
    fn test_select_unknown_document() {
        let mut session = EditSession::new();
        assert!(matches!(
            session.select_document("missing.xml"),
            Err(EditorError::UnknownDocument(_))
        ));
    }

    #[test]
    fn test_node_factory_creates_detached_nodes() {
        let mut session = EditSession::new();
        session.open_source("test.xml", SOURCE).unwrap();

        let bay = session.node_factory().unwrap().create_element("Bay");
        let doc = session.document().unwrap();
        assert!(doc.contains(bay));
        assert!(!doc.is_attached(bay));
    }

    #[test]
    fn test_drain_handles_events_in_order() {
        let mut session = EditSession::new();
        let (bus, mut rx) = EventBus::<EditorEvent>::channel();

        bus.dispatch(EditorEvent::OpenDocument {
            doc: quire_dom::parse(SOURCE).unwrap(),
            doc_name: "test.xml".to_string(),
        });
        let child = NodeId(3);
        bus.dispatch(EditorEvent::titled_edit(
            Edit::set_attribute(child, "a", Some("2")),
            "change a",
        ));
        bus.dispatch(EditorEvent::Undo(1));

        assert_eq!(session.drain(&mut rx), 3);
        assert_eq!(session.document().unwrap().attribute(child, "a"), Some("1"));
        assert_eq!(session.history().redo_title(), Some("change a"));
    }

    #[tokio::test]
    async fn test_run_until_senders_dropped() {
        let mut session = EditSession::new();
        let (bus, rx) = EventBus::<EditorEvent>::channel();

        bus.dispatch(EditorEvent::OpenDocument {
            doc: quire_dom::parse(SOURCE).unwrap(),
            doc_name: "test.xml".to_string(),
        });
        bus.dispatch(EditorEvent::Wizard(WizardRequest::edit(NodeId(2))));
        drop(bus);

        session.run(rx).await;
        assert_eq!(session.active_wizard(), Some(&WizardRequest::edit(NodeId(2))));
    }
}
