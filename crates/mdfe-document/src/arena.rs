//! # Node Arena
//!
//! The mutable tree a builder owns during assembly. Nodes live in one
//! `Vec` and refer to each other by [`NodeId`]. Every insertion into a
//! group goes through [`Arena::insert_at_slot`], which positions the child
//! by its rank in the group's slot table.
//!
//! Nodes may be created detached and attached later; repeating groups that
//! are fanned out to several parents are copied with [`Arena::deep_clone`].

use mdfe_core::Element;

use crate::error::BuildError;
use crate::schema;

/// Index of a node inside its [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Owner of every node of one document under construction.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was created yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached group node.
    pub fn create(&mut self, name: &'static str) -> NodeId {
        self.nodes.push(Node {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            parent: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached leaf node carrying text.
    pub fn create_leaf(&mut self, name: &'static str, text: impl Into<String>) -> NodeId {
        let id = self.create(name);
        self.nodes[id.0].text = Some(text.into());
        id
    }

    /// Element name of a node.
    pub fn name(&self, id: NodeId) -> &'static str {
        self.nodes[id.0].name
    }

    /// Text of a leaf node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    /// Replace the text of a node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = Some(text.into());
    }

    /// Attribute value of a node.
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute, keeping its position if it exists.
    pub fn set_attribute(&mut self, id: NodeId, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.nodes[id.0].attributes;
        match attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => attributes.push((key, value)),
        }
    }

    /// Children of a node in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Parent of an attached node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// First direct child with the given name.
    pub fn first_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.name(*c) == name)
    }

    /// Insert `child` into `parent` at the position its schema slot
    /// dictates: immediately before the first sibling whose slot ranks
    /// later, after any siblings sharing its slot. A child that is already
    /// attached elsewhere is moved.
    ///
    /// # Errors
    ///
    /// [`BuildError::SchemaOrder`] when the parent's schema has no slot for
    /// the child. The tree is left unchanged.
    pub fn insert_at_slot(&mut self, parent: NodeId, child: NodeId) -> Result<(), BuildError> {
        let parent_name = self.name(parent);
        let child_name = self.name(child);
        let position = match schema::slots(parent_name) {
            None => self.children(parent).len(),
            Some(_) => {
                let rank = schema::slot_rank(parent_name, child_name).ok_or_else(|| {
                    BuildError::SchemaOrder {
                        parent: parent_name.to_string(),
                        child: child_name.to_string(),
                    }
                })?;
                self.children(parent)
                    .iter()
                    .position(|c| {
                        schema::slot_rank(parent_name, self.name(*c)).is_some_and(|r| r > rank)
                    })
                    .unwrap_or(self.children(parent).len())
            }
        };
        self.detach(child);
        // Detaching from this same parent may shift later siblings left.
        let position = position.min(self.children(parent).len());
        self.nodes[parent.0].children.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Remove a node from its parent's child list. The node keeps its own
    /// subtree.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Copy a subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let source = self.nodes[id.0].clone();
        let copy = self.create(source.name);
        self.nodes[copy.0].attributes = source.attributes;
        self.nodes[copy.0].text = source.text;
        for child in source.children {
            let child_copy = self.deep_clone(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Export a subtree as an immutable [`Element`].
    pub fn to_element(&self, id: NodeId) -> Element {
        let node = &self.nodes[id.0];
        Element {
            name: node.name.to_string(),
            attributes: node
                .attributes
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            text: node.text.clone(),
            children: node.children.iter().map(|c| self.to_element(*c)).collect(),
        }
    }
}
