//! # Wizard Request Queue
//!
//! Pending modal edit requests. Only the front request is active.
//!
//! - Top-level requests queue behind each other (FIFO)
//! - Sub-wizard requests jump the queue and stack on top of the active one (LIFO)
//! - Closing always removes the active request

use quire_dom::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Request to present a modal edit form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardRequest {
    /// Edit an existing element
    Edit {
        element: NodeId,
        #[serde(default)]
        sub_wizard: bool,
    },

    /// Create a new `tag_name` child under `parent`
    Create {
        parent: NodeId,
        tag_name: String,
        #[serde(default)]
        sub_wizard: bool,
    },
}

impl WizardRequest {
    pub fn edit(element: NodeId) -> Self {
        WizardRequest::Edit {
            element,
            sub_wizard: false,
        }
    }

    pub fn create(parent: NodeId, tag_name: impl Into<String>) -> Self {
        WizardRequest::Create {
            parent,
            tag_name: tag_name.into(),
            sub_wizard: false,
        }
    }

    /// Mark as nested under the currently active request
    pub fn nested(mut self) -> Self {
        match &mut self {
            WizardRequest::Edit { sub_wizard, .. } | WizardRequest::Create { sub_wizard, .. } => {
                *sub_wizard = true;
            }
        }
        self
    }

    pub fn is_sub_wizard(&self) -> bool {
        match self {
            WizardRequest::Edit { sub_wizard, .. } | WizardRequest::Create { sub_wizard, .. } => *sub_wizard,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct WizardQueue {
    workflow: VecDeque<WizardRequest>,
}

impl WizardQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: WizardRequest) {
        if request.is_sub_wizard() {
            tracing::debug!(?request, "stacking sub-wizard");
            self.workflow.push_front(request);
        } else {
            tracing::debug!(?request, queued = self.workflow.len(), "queueing wizard");
            self.workflow.push_back(request);
        }
    }

    /// Remove the active request; the next one (if any) becomes active
    pub fn close(&mut self) -> Option<WizardRequest> {
        self.workflow.pop_front()
    }

    pub fn active(&self) -> Option<&WizardRequest> {
        self.workflow.front()
    }

    pub fn len(&self) -> usize {
        self.workflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflow.is_empty()
    }

    /// Requests from active to last queued
    pub fn iter(&self) -> impl Iterator<Item = &WizardRequest> {
        self.workflow.iter()
    }

    pub fn clear(&mut self) {
        self.workflow.clear();
    }
}
