//! # Edits
//!
//! Data descriptions of document mutations, and the engine that applies them.
//!
//! ## Inversion
//!
//! Applying an edit returns its inverse, computed from the state captured just
//! before the mutation:
//!
//! | Edit | Inverse |
//! |---|---|
//! | `Insert` of a detached node | `Remove` of that node |
//! | `Insert` of an attached node (move) | `Insert` back before its old next sibling |
//! | `Remove` | `Insert` under the old parent, before the old next sibling |
//! | `SetAttributes` | `SetAttributes` with every named attribute's prior value (`None` if absent) |
//! | `SetTextContent` | `SetTextContent` with the prior text |
//! | `Compound[e1..en]` | `Compound[inv(en)..inv(e1)]` |
//!
//! ## Validation
//!
//! Single edits are validated before anything is touched. The parent of an
//! `Insert` only has to exist: a move out of a removed subtree inverts to an
//! insert back under the detached old parent.
//!
//! A compound applies its members in order against a snapshot of the tree;
//! if one is rejected the snapshot is restored before the error is returned,
//! so a failed edit never leaves the tree half-mutated.

use quire_dom::{split_qualified_name, DomError, Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Attribute values keyed by name; `None` removes the attribute
pub type AttributeValues = BTreeMap<String, Option<String>>;

/// Intended document mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Edit {
    /// Place `node` under `parent` before `reference` (append when `None`)
    Insert {
        parent: NodeId,
        node: NodeId,
        #[serde(default)]
        reference: Option<NodeId>,
    },

    /// Detach `node` from its parent
    Remove { node: NodeId },

    /// Set or clear plain and namespaced attributes
    SetAttributes {
        element: NodeId,
        #[serde(default)]
        attributes: AttributeValues,
        /// Namespace URI → qualified name → value
        #[serde(default)]
        attributes_ns: BTreeMap<String, AttributeValues>,
    },

    /// Replace the text content of an element (or the data of a text node)
    SetTextContent { element: NodeId, text_content: String },

    /// Ordered edits applied as one unit
    Compound(Vec<Edit>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not attached to the document")]
    Detached(NodeId),

    #[error("Reference {reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },

    #[error("Node {0} has no parent")]
    NoParent(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} cannot have children")]
    CannotHaveChildren(NodeId),

    #[error("Inserting {node} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, node: NodeId },

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

impl Edit {
    pub fn insert(parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Self {
        Edit::Insert {
            parent,
            node,
            reference,
        }
    }

    pub fn remove(node: NodeId) -> Self {
        Edit::Remove { node }
    }

    /// Set (or with `None`, remove) a single plain attribute
    pub fn set_attribute(element: NodeId, name: impl Into<String>, value: Option<&str>) -> Self {
        let mut attributes = AttributeValues::new();
        attributes.insert(name.into(), value.map(str::to_string));
        Edit::SetAttributes {
            element,
            attributes,
            attributes_ns: BTreeMap::new(),
        }
    }

    pub fn set_text_content(element: NodeId, text_content: impl Into<String>) -> Self {
        Edit::SetTextContent {
            element,
            text_content: text_content.into(),
        }
    }

    pub fn compound(edits: impl IntoIterator<Item = Edit>) -> Self {
        Edit::Compound(edits.into_iter().collect())
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Edit::Insert { .. } => "insert",
            Edit::Remove { .. } => "remove",
            Edit::SetAttributes { .. } => "set-attributes",
            Edit::SetTextContent { .. } => "set-text-content",
            Edit::Compound(_) => "compound",
        }
    }

    /// Apply to `doc` and return the inverse edit
    pub fn apply(&self, doc: &mut Document) -> Result<Edit, EditError> {
        match self {
            Edit::Compound(edits) => {
                let snapshot = doc.clone();
                apply_members(doc, edits).map_err(|err| {
                    *doc = snapshot;
                    err
                })
            }
            _ => {
                self.validate(doc)?;
                self.apply_validated(doc)
            }
        }
    }

    /// Validate without applying
    ///
    /// Compound members are checked against the current tree only, so a
    /// member depending on an earlier one may pass `apply` yet fail here.
    pub fn validate(&self, doc: &Document) -> Result<(), EditError> {
        match self {
            Edit::Insert {
                parent,
                node,
                reference,
            } => {
                if !doc.contains(*parent) {
                    return Err(EditError::NodeNotFound(*parent));
                }
                if !doc.contains(*node) {
                    return Err(EditError::NodeNotFound(*node));
                }
                if doc.is_text(*parent) {
                    return Err(EditError::CannotHaveChildren(*parent));
                }
                if let Some(reference) = reference {
                    if doc.parent(*reference) != Some(*parent) {
                        return Err(EditError::NotAChild {
                            parent: *parent,
                            reference: *reference,
                        });
                    }
                }
                if doc.is_inclusive_ancestor(*node, *parent) {
                    return Err(EditError::CycleDetected {
                        parent: *parent,
                        node: *node,
                    });
                }
                Ok(())
            }

            Edit::Remove { node } => {
                require_attached(doc, *node)?;
                if doc.parent(*node).is_none() {
                    return Err(EditError::NoParent(*node));
                }
                Ok(())
            }

            Edit::SetAttributes { element, .. } => {
                require_attached(doc, *element)?;
                if !doc.is_element(*element) {
                    return Err(EditError::NotAnElement(*element));
                }
                Ok(())
            }

            Edit::SetTextContent { element, .. } => {
                require_attached(doc, *element)?;
                if !doc.is_element(*element) && !doc.is_text(*element) {
                    return Err(EditError::NotAnElement(*element));
                }
                Ok(())
            }

            Edit::Compound(edits) => edits.iter().try_for_each(|edit| edit.validate(doc)),
        }
    }

    fn apply_validated(&self, doc: &mut Document) -> Result<Edit, EditError> {
        match self {
            Edit::Insert {
                parent,
                node,
                reference,
            } => {
                let original = doc
                    .parent(*node)
                    .map(|old_parent| (old_parent, doc.next_sibling(*node)));

                doc.insert_before(*parent, *node, *reference)?;

                Ok(match original {
                    Some((old_parent, old_next)) => Edit::insert(old_parent, *node, old_next),
                    None => Edit::remove(*node),
                })
            }

            Edit::Remove { node } => {
                let parent = doc.parent(*node).ok_or(EditError::NoParent(*node))?;
                let next = doc.next_sibling(*node);

                doc.detach(*node)?;

                Ok(Edit::insert(parent, *node, next))
            }

            Edit::SetAttributes {
                element,
                attributes,
                attributes_ns,
            } => {
                let prior: AttributeValues = attributes
                    .keys()
                    .map(|name| {
                        let value = doc.attribute(*element, name).map(str::to_string);
                        (name.clone(), value)
                    })
                    .collect();

                let prior_ns: BTreeMap<String, AttributeValues> = attributes_ns
                    .iter()
                    .map(|(namespace, values)| {
                        let captured = values
                            .keys()
                            .map(|qualified| {
                                let (_, local) = split_qualified_name(qualified);
                                let value = doc
                                    .attribute_ns(*element, Some(namespace), local)
                                    .map(str::to_string);
                                (qualified.clone(), value)
                            })
                            .collect();
                        (namespace.clone(), captured)
                    })
                    .collect();

                for (name, value) in attributes {
                    doc.set_attribute(*element, name, value.as_deref())?;
                }
                for (namespace, values) in attributes_ns {
                    for (qualified, value) in values {
                        doc.set_attribute_ns(*element, Some(namespace), qualified, value.as_deref())?;
                    }
                }

                Ok(Edit::SetAttributes {
                    element: *element,
                    attributes: prior,
                    attributes_ns: prior_ns,
                })
            }

            Edit::SetTextContent {
                element,
                text_content,
            } => {
                let prior_text = doc.text_content(*element);
                let replacement = doc.set_text_content(*element, text_content)?;

                if replacement.removed.is_empty() {
                    return Ok(Edit::set_text_content(*element, prior_text));
                }

                // Mixed content: restore the exact prior children
                let mut inverse = Vec::with_capacity(replacement.removed.len() + 2);
                if let Some(text_node) = replacement.text_node {
                    inverse.push(Edit::remove(text_node));
                }
                for child in &replacement.removed {
                    inverse.push(Edit::insert(*element, *child, None));
                }
                if let Some((slot, previous)) = replacement.overwritten {
                    if replacement.removed.contains(&slot) {
                        inverse.push(Edit::set_text_content(slot, previous));
                    }
                }
                Ok(Edit::Compound(inverse))
            }

            Edit::Compound(edits) => apply_members(doc, edits),
        }
    }
}

fn require_attached(doc: &Document, id: NodeId) -> Result<(), EditError> {
    if !doc.contains(id) {
        return Err(EditError::NodeNotFound(id));
    }
    if !doc.is_attached(id) {
        return Err(EditError::Detached(id));
    }
    Ok(())
}

/// Apply compound members in order; the caller restores the tree on failure
fn apply_members(doc: &mut Document, edits: &[Edit]) -> Result<Edit, EditError> {
    let mut inverses = Vec::with_capacity(edits.len());

    for (index, edit) in edits.iter().enumerate() {
        let inverse = match edit {
            Edit::Compound(members) => apply_members(doc, members),
            _ => edit.validate(doc).and_then(|()| edit.apply_validated(doc)),
        };
        match inverse {
            Ok(inverse) => inverses.push(inverse),
            Err(err) => {
                tracing::debug!(index, error = %err, "compound member rejected, restoring snapshot");
                return Err(err);
            }
        }
    }

    inverses.reverse();
    Ok(Edit::Compound(inverses))
}
