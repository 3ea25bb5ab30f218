//! # Quire Editor
//!
//! Supervisory core of the Quire document editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ plugins: propose edits / wizard requests    │
//! └─────────────────────────────────────────────┘
//!                     ↓ EventBus
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - Apply edits, record inverses (History)   │
//! │  - Undo / redo with branch discard          │
//! │  - Wizard queue (FIFO siblings, LIFO subs)  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dom: Document tree                          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Edits are data**: every mutation is an [`Edit`] value
//! 2. **Every edit has an exact inverse**: computed before mutating
//! 3. **All-or-nothing**: a rejected edit never leaves a half-mutated tree
//! 4. **Plugins propose, the session disposes**: no plugin mutates the tree
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_editor::{CommitOptions, Edit, EditSession};
//!
//! let mut session = EditSession::new();
//! session.open_source("station.scd", &source)?;
//!
//! let bay = session.document().unwrap().elements_by_name("Bay").next().unwrap();
//! session.commit(Edit::remove(bay), CommitOptions::titled("Remove bay"))?;
//!
//! session.undo(1)?;
//! ```

mod diagnostics;
mod edits;
mod errors;
mod events;
mod history;
mod session;
mod wizards;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use edits::{AttributeValues, Edit, EditError};
pub use errors::EditorError;
pub use events::{EditorEvent, EventBus};
pub use history::{CommitOptions, History, LogEntry};
pub use session::{EditSession, NodeFactory};
pub use wizards::{WizardQueue, WizardRequest};

// Re-export document types for convenience
pub use quire_dom::{Document, NodeId};
