//! Concrete syntax trees that can be patched in place.
//!
//! A [`SyntaxTree`] stores its nodes in an arena and hands out [`NodeId`]s. Ids stay valid across
//! edits that do not remove the node they refer to, which is what lets an incremental reparse keep
//! every untouched node of an old tree.

mod builder;

use std::fmt::Write;

use fxhash::FxBuildHasher;
use lasso::{Capacity, Spur};
use text_size::{TextRange, TextSize};

use crate::{
    pool::{Pool, RawId},
    Kind, ReparseError,
};

pub use self::builder::{Checkpoint, TreeBuilder};

type Rodeo = lasso::Rodeo<Spur, FxBuildHasher>;

/// Default number of strings that the interner will initially allocate space for.
const DEFAULT_STRING_CAPACITY: usize = 512;

/// Allocates the nodes of a materialized tree.
///
/// [`Builder::build_tree`](crate::Builder::build_tree) drives a factory to turn the finished
/// production list into real nodes. Children are always added in text order, and a composite node is
/// only added to its parent after all of its own children were added to it.
pub trait NodeFactory<K: Kind> {
    type Node: Clone;

    fn composite(&mut self, kind: K) -> Self::Node;

    fn leaf(&mut self, kind: K, text: &str) -> Self::Node;

    /// An error node. It receives children if it was produced by closing a marker as an error, and
    /// stays empty if it was produced by a free-standing error.
    fn error_element(&mut self, message: Option<&str>) -> Self::Node;

    fn add_child(&mut self, parent: Self::Node, child: Self::Node);
}

/// Handle to a node of a [`SyntaxTree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(RawId);

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({:?})", self.0)
    }
}

/// The shape of a node together with its syntax kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind<K> {
    Composite(K),
    Leaf(K),
    Error,
}

impl<K: Kind> NodeKind<K> {
    /// The syntax kind, unless this is an error node.
    pub fn kind(self) -> Option<K> {
        match self {
            NodeKind::Composite(kind) | NodeKind::Leaf(kind) => Some(kind),
            NodeKind::Error => None,
        }
    }
}

#[derive(Debug)]
struct NodeData<K> {
    kind:     NodeKind<K>,
    parent:   Option<NodeId>,
    children: Vec<NodeId>,
    /// Leaf text, unless the kind has static text.
    text:     Option<Spur>,
    message:  Option<Spur>,
    text_len: TextSize,
    hc:       u32,
}

/// Structural fingerprint of a piece of text: the wrapping sum of its characters.
pub(crate) fn text_hc(text: &str) -> u32 {
    text.chars().fold(0u32, |hc, c| hc.wrapping_add(c as u32))
}

/// A mutable concrete syntax tree with interned leaf text.
///
/// Every node knows its text length and its fingerprint (see [`hc`](SyntaxTree::hc)); both are kept
/// up to date by all edits.
///
/// Accessors panic when given the id of a node that was removed from the tree. Use
/// [`contains`](SyntaxTree::contains) to check ids of unknown provenance.
#[derive(Debug)]
pub struct SyntaxTree<K> {
    nodes:    Pool<NodeData<K>>,
    root:     Option<NodeId>,
    interner: Rodeo,
}

impl<K: Kind> Default for SyntaxTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kind> SyntaxTree<K> {
    /// Creates an empty tree. Nodes are created through the [`NodeFactory`] implementation and become
    /// part of the tree once attached below the root set with [`set_root`](SyntaxTree::set_root).
    pub fn new() -> Self {
        Self {
            nodes:    Pool::with_capacity(usize::MAX),
            root:     None,
            interner: Rodeo::with_capacity_and_hasher(
                Capacity::for_strings(DEFAULT_STRING_CAPACITY),
                FxBuildHasher::default(),
            ),
        }
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Makes the detached node `node` the root of this tree. A previous root is freed together with
    /// all of its descendants.
    pub fn set_root(&mut self, node: NodeId) -> Result<(), ReparseError> {
        self.check_detached(node)?;
        if let Some(old) = self.root.replace(node) {
            if old != node {
                self.free_subtree(old);
            }
        }
        Ok(())
    }

    /// Whether `node` refers to a live node.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node.0)
    }

    /// Number of live nodes, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    #[inline]
    fn data(&self, node: NodeId) -> &NodeData<K> {
        match self.nodes.get(node.0) {
            Some(data) => data,
            None => panic!("{:?} is no longer part of the tree", node),
        }
    }

    #[inline]
    fn data_mut(&mut self, node: NodeId) -> &mut NodeData<K> {
        match self.nodes.get_mut(node.0) {
            Some(data) => data,
            None => panic!("{:?} is no longer part of the tree", node),
        }
    }

    #[inline]
    pub fn node_kind(&self, node: NodeId) -> NodeKind<K> {
        self.data(node).kind
    }

    /// The syntax kind of `node`, or `None` for error nodes.
    #[inline]
    pub fn kind(&self, node: NodeId) -> Option<K> {
        self.data(node).kind.kind()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        matches!(self.data(node).kind, NodeKind::Leaf(_))
    }

    #[inline]
    pub fn is_error(&self, node: NodeId) -> bool {
        matches!(self.data(node).kind, NodeKind::Error)
    }

    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    #[inline]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.data(node).children
    }

    /// Text of a leaf. `None` for composite and error nodes.
    pub fn leaf_text(&self, node: NodeId) -> Option<&str> {
        let data = self.data(node);
        match data.kind {
            NodeKind::Leaf(kind) => match data.text {
                Some(key) => Some(self.interner.resolve(&key)),
                None => kind.static_text(),
            },
            _ => None,
        }
    }

    pub fn error_message(&self, node: NodeId) -> Option<&str> {
        self.data(node).message.map(|key| self.interner.resolve(&key))
    }

    #[inline]
    pub fn text_len(&self, node: NodeId) -> TextSize {
        self.data(node).text_len
    }

    /// The fingerprint of `node`: for leaves the sum of the characters of their text, for all other
    /// nodes the sum of the fingerprints of their children. Sums wrap around.
    #[inline]
    pub fn hc(&self, node: NodeId) -> u32 {
        self.data(node).hc
    }

    /// Offset of `node` from the start of the top-most node above it.
    pub fn offset(&self, node: NodeId) -> TextSize {
        let mut offset = TextSize::from(0);
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            for &sibling in self.children(parent) {
                if sibling == current {
                    break;
                }
                offset += self.text_len(sibling);
            }
            current = parent;
        }
        offset
    }

    pub fn text_range(&self, node: NodeId) -> TextRange {
        TextRange::at(self.offset(node), self.text_len(node))
    }

    /// The text of all leaves below `node`, in order.
    pub fn text(&self, node: NodeId) -> String {
        let mut text = String::with_capacity(usize::from(self.text_len(node)));
        for event in self.preorder(node) {
            if let WalkEvent::Enter(id) = event {
                if let Some(leaf) = self.leaf_text(id) {
                    text.push_str(leaf);
                }
            }
        }
        text
    }

    /// Walks the subtree of `node`, entering and leaving every node in order.
    pub fn preorder(&self, node: NodeId) -> Preorder<'_, K> {
        Preorder {
            tree:  self,
            start: Some(node),
            stack: Vec::new(),
        }
    }

    /// All leaves below `node`, in order.
    pub fn leaves(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.preorder(node).filter_map(move |event| match event {
            WalkEvent::Enter(id) if self.is_leaf(id) => Some(id),
            _ => None,
        })
    }

    /// Renders `node`, and with `recursive` its whole subtree, one node per line.
    pub fn debug(&self, node: NodeId, recursive: bool) -> String {
        let mut res = String::new();
        let start = self.offset(node);
        if !recursive {
            self.write_head(&mut res, node, start);
            return res;
        }

        let mut offset = start;
        let mut level = 0;
        for event in self.preorder(node) {
            match event {
                WalkEvent::Enter(id) => {
                    for _ in 0..level {
                        res.push_str("  ");
                    }
                    self.write_head(&mut res, id, offset);
                    res.push('\n');
                    if self.is_leaf(id) {
                        offset += self.text_len(id);
                    }
                    level += 1;
                }
                WalkEvent::Leave(_) => level -= 1,
            }
        }
        res
    }

    fn write_head(&self, res: &mut String, node: NodeId, offset: TextSize) {
        let range = TextRange::at(offset, self.text_len(node));
        // writing into a `String` cannot fail
        let _ = match self.node_kind(node) {
            NodeKind::Composite(kind) => write!(res, "{:?}@{:?}", kind, range),
            NodeKind::Leaf(kind) => write!(res, "{:?}@{:?} {:?}", kind, range, self.leaf_text(node).unwrap_or("")),
            NodeKind::Error => match self.error_message(node) {
                Some(message) => write!(res, "Error@{:?} {:?}", range, message),
                None => write!(res, "Error@{:?}", range),
            },
        };
    }

    fn alloc(
        &mut self,
        kind: NodeKind<K>,
        text: Option<Spur>,
        message: Option<Spur>,
        text_len: TextSize,
        hc: u32,
    ) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            text,
            message,
            text_len,
            hc,
        };
        NodeId(self.nodes.alloc(data))
    }

    /// Adds `(removed, added)` length and fingerprint changes to `from` and all of its ancestors.
    fn propagate(&mut self, from: Option<NodeId>, removed: (TextSize, u32), added: (TextSize, u32)) {
        let mut current = from;
        while let Some(node) = current {
            let data = self.data_mut(node);
            data.text_len = data.text_len + added.0 - removed.0;
            data.hc = data.hc.wrapping_add(added.1).wrapping_sub(removed.1);
            current = data.parent;
        }
    }

    fn check_live(&self, node: NodeId) -> Result<(), ReparseError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(ReparseError::StaleNode(node))
        }
    }

    fn check_detached(&self, node: NodeId) -> Result<(), ReparseError> {
        self.check_live(node)?;
        if self.parent(node).is_some() || self.root == Some(node) {
            return Err(ReparseError::NotDetached(node));
        }
        Ok(())
    }

    /// Inserts the detached node `child` as the `position`-th child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, position: usize, child: NodeId) -> Result<(), ReparseError> {
        self.check_live(parent)?;
        self.check_detached(child)?;
        if self.is_leaf(parent) {
            return Err(ReparseError::LeafParent(parent));
        }
        let len = self.children(parent).len();
        if position > len {
            return Err(ReparseError::PositionOutOfBounds { parent, position, len });
        }
        self.attach(parent, position, child);
        Ok(())
    }

    /// Removes `child` from `parent` and frees it together with its descendants.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ReparseError> {
        self.check_live(parent)?;
        self.check_live(child)?;
        if self.parent(child) != Some(parent) {
            return Err(ReparseError::NotAChild { parent, child });
        }
        self.detach(child);
        self.free_subtree(child);
        Ok(())
    }

    /// Puts the detached node `new` where `old` is and frees `old` with its descendants.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), ReparseError> {
        self.check_live(old)?;
        self.check_detached(new)?;
        self.swap(old, new);
        Ok(())
    }

    pub(crate) fn attach(&mut self, parent: NodeId, position: usize, child: NodeId) {
        let added = {
            let data = self.data_mut(child);
            data.parent = Some(parent);
            (data.text_len, data.hc)
        };
        self.data_mut(parent).children.insert(position, child);
        self.propagate(Some(parent), (0.into(), 0), added);
    }

    pub(crate) fn detach(&mut self, child: NodeId) {
        let (parent, removed) = {
            let data = self.data_mut(child);
            (data.parent.take(), (data.text_len, data.hc))
        };
        if let Some(parent) = parent {
            self.data_mut(parent).children.retain(|&c| c != child);
            self.propagate(Some(parent), removed, (0.into(), 0));
        } else if self.root == Some(child) {
            self.root = None;
        }
    }

    pub(crate) fn swap(&mut self, old: NodeId, new: NodeId) {
        let (parent, removed) = {
            let data = self.data_mut(old);
            (data.parent.take(), (data.text_len, data.hc))
        };
        match parent {
            Some(parent) => {
                let added = {
                    let data = self.data_mut(new);
                    data.parent = Some(parent);
                    (data.text_len, data.hc)
                };
                for slot in self.data_mut(parent).children.iter_mut() {
                    if *slot == old {
                        *slot = new;
                    }
                }
                self.propagate(Some(parent), removed, added);
            }
            None => {
                if self.root == Some(old) {
                    self.root = Some(new);
                }
            }
        }
        self.free_subtree(old);
    }

    /// Frees `node` and every node below it. `node` must already be detached.
    pub(crate) fn free_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(data) = self.nodes.recycle(id.0) {
                stack.extend(data.children);
            }
        }
    }
}

impl<K: Kind> NodeFactory<K> for SyntaxTree<K> {
    type Node = NodeId;

    fn composite(&mut self, kind: K) -> NodeId {
        self.alloc(NodeKind::Composite(kind), None, None, 0.into(), 0)
    }

    fn leaf(&mut self, kind: K, text: &str) -> NodeId {
        let text_len = TextSize::of(text);
        let hc = text_hc(text);
        let key = match kind.static_text() {
            Some(static_text) => {
                debug_assert_eq!(
                    static_text, text,
                    "Received `{:?}` token which should have text {:?}, but {:?} was given.",
                    kind, static_text, text
                );
                None
            }
            None => Some(self.interner.get_or_intern(text)),
        };
        self.alloc(NodeKind::Leaf(kind), key, None, text_len, hc)
    }

    fn error_element(&mut self, message: Option<&str>) -> NodeId {
        let message = message.map(|message| self.interner.get_or_intern(message));
        self.alloc(NodeKind::Error, None, message, 0.into(), 0)
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let position = self.children(parent).len();
        self.attach(parent, position, child);
    }
}

/// One step of a [`Preorder`] walk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WalkEvent<T> {
    Enter(T),
    /// Emitted once all children were walked.
    Leave(T),
}

impl<T> WalkEvent<T> {
    /// The node the walk entered or left.
    pub fn node(self) -> T {
        match self {
            WalkEvent::Enter(node) | WalkEvent::Leave(node) => node,
        }
    }
}

/// Iterator returned by [`SyntaxTree::preorder`].
#[derive(Debug)]
pub struct Preorder<'a, K> {
    tree:  &'a SyntaxTree<K>,
    start: Option<NodeId>,
    stack: Vec<(NodeId, usize)>,
}

impl<K: Kind> Iterator for Preorder<'_, K> {
    type Item = WalkEvent<NodeId>;

    fn next(&mut self) -> Option<WalkEvent<NodeId>> {
        if let Some(start) = self.start.take() {
            self.stack.push((start, 0));
            return Some(WalkEvent::Enter(start));
        }
        let (node, index) = self.stack.last_mut()?;
        let node = *node;
        match self.tree.children(node).get(*index) {
            Some(&child) => {
                *index += 1;
                self.stack.push((child, 0));
                Some(WalkEvent::Enter(child))
            }
            None => {
                self.stack.pop();
                Some(WalkEvent::Leave(node))
            }
        }
    }
}
