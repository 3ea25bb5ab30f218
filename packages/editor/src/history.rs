//! # History Log
//!
//! Cursor-addressed log of committed edits enabling undo/redo.
//!
//! ## Design
//!
//! - Each commit applies the edit and records it with its inverse
//! - `edit_count` points just past the last applied entry
//! - Undo applies the inverse at the cursor and moves the cursor back
//! - Redo reapplies the edit at the cursor and moves it forward
//! - Committing after an undo discards the redo branch
//! - Squashing merges a commit into the previous entry (one undo step)
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//!
//! history.commit(&mut doc, Edit::remove(node), CommitOptions::titled("Remove bay"))?;
//! history.undo(&mut doc, 1)?;
//! history.redo(&mut doc, 1)?;
//! ```

use crate::edits::{Edit, EditError};
use chrono::{DateTime, Utc};
use quire_dom::Document;

/// A committed edit together with the edit that reverts it
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub undo: Edit,
    pub redo: Edit,
    pub title: Option<String>,
    pub time: DateTime<Utc>,
}

/// How a commit is recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    pub title: Option<String>,

    /// Merge into the previous entry instead of appending
    pub squash: bool,
}

impl CommitOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            squash: false,
        }
    }

    pub fn squash() -> Self {
        Self {
            title: None,
            squash: true,
        }
    }
}

/// Undo/redo history for one editing session
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<LogEntry>,
    edit_count: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `edit` to `doc` and record it
    ///
    /// Nothing is recorded if the edit is rejected.
    pub fn commit(&mut self, doc: &mut Document, edit: Edit, options: CommitOptions) -> Result<(), EditError> {
        let inverse = edit.apply(doc)?;

        // New edit invalidates the redo branch
        self.entries.truncate(self.edit_count);

        if options.squash {
            if let Some(last) = self.entries.last_mut() {
                let redo = std::mem::replace(&mut last.redo, Edit::Compound(Vec::new()));
                let undo = std::mem::replace(&mut last.undo, Edit::Compound(Vec::new()));
                last.redo = Edit::Compound(vec![redo, edit]);
                last.undo = Edit::Compound(vec![inverse, undo]);
                tracing::debug!(edit_count = self.edit_count, "squashed edit into last entry");
                return Ok(());
            }
        }

        tracing::debug!(kind = edit.kind(), title = ?options.title, "committed edit");
        self.entries.push(LogEntry {
            undo: inverse,
            redo: edit,
            title: options.title,
            time: Utc::now(),
        });
        self.edit_count += 1;
        Ok(())
    }

    /// Undo up to `n` entries, returning how many were undone
    pub fn undo(&mut self, doc: &mut Document, n: usize) -> Result<usize, EditError> {
        let mut undone = 0;
        while undone < n && self.can_undo() {
            self.entries[self.edit_count - 1].undo.apply(doc)?;
            self.edit_count -= 1;
            undone += 1;
        }
        Ok(undone)
    }

    /// Redo up to `n` entries, returning how many were redone
    pub fn redo(&mut self, doc: &mut Document, n: usize) -> Result<usize, EditError> {
        let mut redone = 0;
        while redone < n && self.can_redo() {
            self.entries[self.edit_count].redo.apply(doc)?;
            self.edit_count += 1;
            redone += 1;
        }
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.edit_count > 0
    }

    pub fn can_redo(&self) -> bool {
        self.edit_count < self.entries.len()
    }

    /// Cursor position: number of entries currently applied
    pub fn edit_count(&self) -> usize {
        self.edit_count
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Title of the entry the next undo reverts
    pub fn undo_title(&self) -> Option<&str> {
        self.edit_count
            .checked_sub(1)
            .and_then(|i| self.entries[i].title.as_deref())
    }

    /// Title of the entry the next redo reapplies
    pub fn redo_title(&self) -> Option<&str> {
        self.entries
            .get(self.edit_count)
            .and_then(|entry| entry.title.as_deref())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.edit_count = 0;
    }
}
