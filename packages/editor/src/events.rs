//! # Event Bus
//!
//! Plugins never hold a reference to the session. They dispatch events onto a
//! bus and the session drains it in dispatch order.

use crate::edits::Edit;
use crate::wizards::WizardRequest;
use quire_dom::Document;
use tokio::sync::mpsc;

/// Boundary events consumed by [`EditSession`](crate::EditSession)
#[derive(Debug, Clone)]
pub enum EditorEvent {
    /// Commit an edit to the current document
    Edit {
        edit: Edit,
        title: Option<String>,
        squash: bool,
    },

    /// Register a document under a name and make it current
    OpenDocument { doc: Document, doc_name: String },

    /// Request an edit or create wizard
    Wizard(WizardRequest),

    /// Close the active wizard
    CloseWizard(WizardRequest),

    Undo(usize),

    Redo(usize),
}

impl EditorEvent {
    pub fn edit(edit: Edit) -> Self {
        EditorEvent::Edit {
            edit,
            title: None,
            squash: false,
        }
    }

    pub fn titled_edit(edit: Edit, title: impl Into<String>) -> Self {
        EditorEvent::Edit {
            edit,
            title: Some(title.into()),
            squash: false,
        }
    }
}

/// Sending half of an event channel
///
/// Cheap to clone; every clone feeds the same receiver.
#[derive(Debug)]
pub struct EventBus<E = EditorEvent> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<E> EventBus<E> {
    /// Create a bus and the receiver draining it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event; returns false once the receiver is gone
    pub fn dispatch(&self, event: impl Into<E>) -> bool {
        if self.tx.send(event.into()).is_err() {
            tracing::warn!("event dispatched after the session ended");
            return false;
        }
        true
    }
}
