// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::dir::{Dir, WeakDir};
use crate::file::{File, WeakFile};
use crate::metadata::{DirEntry, FileInfo};

/// Type of node (file or directory)
#[derive(Clone, Debug)]
pub enum Node {
    File(File),
    Dir(Dir),
}

impl Node {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Node::File(f) => f.name(),
            Node::Dir(d) => d.name(),
        }
    }

    #[must_use]
    pub fn as_dir(&self) -> Option<&Dir> {
        match self {
            Node::Dir(d) => Some(d),
            Node::File(_) => None,
        }
    }

    #[must_use]
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Node::File(f) => Some(f),
            Node::Dir(_) => None,
        }
    }

    #[must_use]
    pub fn info(&self) -> FileInfo {
        match self {
            Node::File(f) => f.info(),
            Node::Dir(d) => d.info(),
        }
    }

    /// Listing entry describing this node under `name`, which differs from
    /// the node's own name when it is reached through an alias.
    #[must_use]
    pub fn to_dir_entry(&self, name: &str) -> DirEntry {
        let mut info = self.info();
        name.clone_into(&mut info.name);
        DirEntry::new(info)
    }

    /// True when both refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::File(a), Node::File(b)) => a.ptr_eq(b),
            (Node::Dir(a), Node::Dir(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        match self {
            Node::File(f) => WeakNode::File(f.downgrade()),
            Node::Dir(d) => WeakNode::Dir(d.downgrade()),
        }
    }
}

impl From<File> for Node {
    fn from(file: File) -> Self {
        Node::File(file)
    }
}

impl From<Dir> for Node {
    fn from(dir: Dir) -> Self {
        Node::Dir(dir)
    }
}

/// Non-owning reference to a node, used for aliases so that a directory
/// aliased beneath itself does not keep itself alive.
#[derive(Clone)]
pub(crate) enum WeakNode {
    File(WeakFile),
    Dir(WeakDir),
}

impl WeakNode {
    pub(crate) fn upgrade(&self) -> Option<Node> {
        match self {
            WeakNode::File(f) => f.upgrade().map(Node::File),
            WeakNode::Dir(d) => d.upgrade().map(Node::Dir),
        }
    }
}

/// A directory slot: either the node it owns, or an alias of a node owned
/// elsewhere in the tree.
#[derive(Clone)]
pub(crate) enum Child {
    Owned(Node),
    Alias(WeakNode),
}

impl Child {
    pub(crate) fn node(&self) -> Option<Node> {
        match self {
            Child::Owned(node) => Some(node.clone()),
            Child::Alias(weak) => weak.upgrade(),
        }
    }
}
