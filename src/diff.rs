//! Merging a new parse into an existing tree.
//!
//! The new parse is walked as a [`LightTree`] side by side with the old [`SyntaxTree`]. Subtrees that
//! compare equal are kept as they are; only where the two trees differ are nodes of the new parse
//! materialized, and the differences are recorded as a [`DiffLog`] of edits against the old tree.

use fxhash::{FxHashMap, FxHashSet};
use text_size::TextSize;

use crate::{
    light::{LightNode, LightTree},
    Builder, Kind, LeafCategory, Marker, NodeFactory, NodeId, ReparseError, SyntaxTree,
};

/// The answer of a comparison that may not be able to decide on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreeState {
    Yes,
    No,
    Unsure,
}

/// One change to the old tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edit {
    /// The detached `node` is inserted as the `position`-th child of `parent`.
    Inserted { parent: NodeId, node: NodeId, position: usize },
    /// `node` is removed from `parent` and freed.
    Deleted { parent: NodeId, node: NodeId },
    /// `old` is freed and the detached `new` takes its place.
    Replaced { old: NodeId, new: NodeId },
}

/// Edits that turn an old subtree into the result of a new parse, produced by
/// [`Builder::merge`](crate::Builder::merge).
///
/// Edits refer to positions as they are when the edit is applied, so they must be applied in
/// order. All nodes that the edits insert are already allocated in the tree, detached, and are
/// freed again by [`discard`](DiffLog::discard).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffLog {
    edits: Vec<Edit>,
}

impl DiffLog {
    #[inline]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Applies all edits to `tree` and returns how many there were.
    ///
    /// The whole log is checked against `tree` before anything is changed. If any edit does not fit,
    /// the tree is left untouched, the nodes materialized for the log are freed and the error is
    /// returned.
    pub fn apply<K: Kind>(self, tree: &mut SyntaxTree<K>) -> Result<usize, ReparseError> {
        if let Err(err) = self.validate(tree) {
            self.discard(tree);
            return Err(err);
        }
        let count = self.edits.len();
        for edit in self.edits {
            match edit {
                Edit::Inserted { parent, node, position } => tree.attach(parent, position, node),
                Edit::Deleted { node, .. } => {
                    tree.detach(node);
                    tree.free_subtree(node);
                }
                Edit::Replaced { old, new } => tree.swap(old, new),
            }
        }
        Ok(count)
    }

    /// Drops the log without applying it, freeing the nodes that were materialized for it.
    pub fn discard<K: Kind>(self, tree: &mut SyntaxTree<K>) {
        for edit in self.edits {
            let node = match edit {
                Edit::Inserted { node, .. } => node,
                Edit::Replaced { new, .. } => new,
                Edit::Deleted { .. } => continue,
            };
            if tree.contains(node) && tree.parent(node).is_none() && tree.root() != Some(node) {
                tree.free_subtree(node);
            }
        }
    }

    fn validate<K: Kind>(&self, tree: &SyntaxTree<K>) -> Result<(), ReparseError> {
        let mut counts: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut removed: FxHashSet<NodeId> = FxHashSet::default();
        let mut used: FxHashSet<NodeId> = FxHashSet::default();

        for edit in &self.edits {
            match *edit {
                Edit::Inserted { parent, node, position } => {
                    check_attached(tree, parent, &removed)?;
                    check_branch(tree, parent)?;
                    check_fresh(tree, node, &mut used)?;
                    let len = counts.entry(parent).or_insert_with(|| tree.children(parent).len());
                    if position > *len {
                        return Err(ReparseError::PositionOutOfBounds {
                            parent,
                            position,
                            len: *len,
                        });
                    }
                    *len += 1;
                }
                Edit::Deleted { parent, node } => {
                    check_attached(tree, parent, &removed)?;
                    check_branch(tree, parent)?;
                    check_attached(tree, node, &removed)?;
                    if tree.parent(node) != Some(parent) {
                        return Err(ReparseError::NotAChild { parent, child: node });
                    }
                    let len = counts.entry(parent).or_insert_with(|| tree.children(parent).len());
                    *len = len.saturating_sub(1);
                    removed.insert(node);
                }
                Edit::Replaced { old, new } => {
                    check_attached(tree, old, &removed)?;
                    check_fresh(tree, new, &mut used)?;
                    removed.insert(old);
                }
            }
        }
        Ok(())
    }
}

/// `node` must be live and not be removed by an earlier edit, neither itself nor with an ancestor.
fn check_attached<K: Kind>(
    tree: &SyntaxTree<K>,
    node: NodeId,
    removed: &FxHashSet<NodeId>,
) -> Result<(), ReparseError> {
    if !tree.contains(node) {
        return Err(ReparseError::StaleNode(node));
    }
    let mut current = Some(node);
    while let Some(id) = current {
        if removed.contains(&id) {
            return Err(ReparseError::StaleNode(node));
        }
        current = tree.parent(id);
    }
    Ok(())
}

/// Leaves never have children.
fn check_branch<K: Kind>(tree: &SyntaxTree<K>, node: NodeId) -> Result<(), ReparseError> {
    if tree.is_leaf(node) {
        return Err(ReparseError::LeafParent(node));
    }
    Ok(())
}

/// `node` must be live, detached and not be put into the tree by an earlier edit.
fn check_fresh<K: Kind>(tree: &SyntaxTree<K>, node: NodeId, used: &mut FxHashSet<NodeId>) -> Result<(), ReparseError> {
    if !tree.contains(node) {
        return Err(ReparseError::StaleNode(node));
    }
    if tree.parent(node).is_some() || tree.root() == Some(node) || !used.insert(node) {
        return Err(ReparseError::NotDetached(node));
    }
    Ok(())
}

/// How an old node relates to a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    /// Different kinds, or different shapes.
    NotEqual,
    /// Same kind, but known to differ.
    TypeOnly,
    /// Same kind, children need to be compared.
    DrillDown,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildResult {
    Equal,
    Patched,
    Replace,
}

pub(crate) struct DiffTree<'a, 'b, 't, K: Kind> {
    light:     LightTree<'b, 't, K>,
    tree:      &'a mut SyntaxTree<K>,
    threshold: usize,
    edits:     Vec<Edit>,
}

impl<'a, 'b, 't, K: Kind> DiffTree<'a, 'b, 't, K> {
    pub(crate) fn new(builder: &'b Builder<'t, K>, tree: &'a mut SyntaxTree<K>, root: Marker) -> Self {
        Self {
            light: LightTree::new(builder, root),
            tree,
            threshold: builder.config().change_threshold(),
            edits: Vec::new(),
        }
    }

    /// Compares the new parse with the subtree of `old_root`.
    pub(crate) fn diff(mut self, old_root: NodeId) -> DiffLog {
        let new_root = self.light.root();
        match self.looks_equal(old_root, new_root) {
            Match::Equal => {}
            Match::DrillDown => {
                if self.build(old_root, new_root, true) == BuildResult::Replace {
                    self.replace(old_root, new_root);
                }
            }
            Match::NotEqual | Match::TypeOnly => self.replace(old_root, new_root),
        }
        DiffLog { edits: self.edits }
    }

    /// Compares the children of `old` and `new`. Without `emit`, only checks whether they are equal.
    fn build(&mut self, old: NodeId, new: LightNode, emit: bool) -> BuildResult {
        let olds = self.tree.children(old).to_vec();
        let mut news = Vec::new();
        self.light.children(new, &mut news);
        let result = self.build_children(old, new, &olds, &news, emit);
        self.light.dispose_children(&news);
        result
    }

    fn build_children(
        &mut self,
        old: NodeId,
        new: LightNode,
        olds: &[NodeId],
        news: &[LightNode],
        emit: bool,
    ) -> BuildResult {
        let (old_len, new_len) = (olds.len(), news.len());
        let min = std::cmp::min(old_len, new_len);
        if std::cmp::max(old_len, new_len) - min > self.threshold {
            return BuildResult::Replace;
        }
        if old_len == 0 && new_len == 0 {
            return if self.hash_codes_equal(old, new) && self.types_equal(old, new) {
                BuildResult::Equal
            } else {
                BuildResult::Replace
            };
        }

        let mut suffix = 0;
        while suffix < min && self.matches(olds[old_len - 1 - suffix], news[new_len - 1 - suffix]) {
            suffix += 1;
        }
        // with equal lengths, at least one pair is left for the middle unless everything matched
        let max_prefix = min - suffix - usize::from(old_len == new_len && suffix < min);
        let mut prefix = 0;
        while prefix < max_prefix && self.matches(olds[prefix], news[prefix]) {
            prefix += 1;
        }

        if old_len == new_len && prefix + suffix == old_len {
            return BuildResult::Equal;
        }
        if !emit {
            return BuildResult::Replace;
        }

        let old_middle = &olds[prefix..old_len - suffix];
        let new_middle = &news[prefix..new_len - suffix];
        let paired = std::cmp::min(old_middle.len(), new_middle.len());
        for i in 0..paired {
            let (old_child, new_child) = (old_middle[i], new_middle[i]);
            match self.looks_equal(old_child, new_child) {
                Match::Equal => {}
                Match::DrillDown => {
                    if self.build(old_child, new_child, true) == BuildResult::Replace {
                        self.replace(old_child, new_child);
                    }
                }
                Match::NotEqual | Match::TypeOnly => self.replace(old_child, new_child),
            }
        }
        for &old_child in &old_middle[paired..] {
            self.edits.push(Edit::Deleted {
                parent: old,
                node:   old_child,
            });
        }
        for (j, &new_child) in new_middle[paired..].iter().enumerate() {
            let node = self.convert(new_child);
            self.edits.push(Edit::Inserted {
                parent: old,
                node,
                position: prefix + paired + j,
            });
        }
        BuildResult::Patched
    }

    /// Whether `old` can be kept for `new` without any edit below it.
    fn matches(&mut self, old: NodeId, new: LightNode) -> bool {
        match self.looks_equal(old, new) {
            Match::Equal => true,
            Match::DrillDown => self.hash_codes_equal(old, new) && self.build(old, new, false) == BuildResult::Equal,
            Match::NotEqual | Match::TypeOnly => false,
        }
    }

    fn looks_equal(&self, old: NodeId, new: LightNode) -> Match {
        if !self.types_equal(old, new) {
            return Match::NotEqual;
        }
        match self.deep_equal(old, new) {
            ThreeState::Yes => Match::Equal,
            ThreeState::Unsure => Match::DrillDown,
            ThreeState::No => Match::TypeOnly,
        }
    }

    fn types_equal(&self, old: NodeId, new: LightNode) -> bool {
        let tree = &*self.tree;
        let whitespace = self.light.builder().whitespace();
        let new_kind = self.light.kind(new);
        let new_is_token = matches!(new, LightNode::Token(_));
        if let Some(old_kind) = tree.kind(old) {
            if tree.is_leaf(old) && whitespace.contains(old_kind) {
                return new_is_token && new_kind.map_or(false, |kind| whitespace.contains(kind));
            }
        }
        match (tree.kind(old), new_kind) {
            (None, None) => true,
            (Some(old_kind), Some(new_kind)) if old_kind == new_kind => match new_kind.leaf_category() {
                LeafCategory::Ordinary => tree.is_leaf(old) == new_is_token,
                // a new token is compared by text, whatever the old shape
                LeafCategory::LazyParseable | LeafCategory::CustomParsed => new_is_token || !tree.is_leaf(old),
            },
            _ => false,
        }
    }

    fn deep_equal(&self, old: NodeId, new: LightNode) -> ThreeState {
        let tree = &*self.tree;
        let old_is_error = tree.is_error(old);
        if old_is_error != self.light.is_error(new) {
            return ThreeState::No;
        }
        if old_is_error {
            return if tree.error_message(old) == self.light.error_message(new) {
                ThreeState::Unsure
            } else {
                ThreeState::No
            };
        }

        if let Some(custom) = self.light.builder().custom_comparator() {
            let result = custom(tree, old, &self.light, new);
            if result != ThreeState::Unsure {
                return result;
            }
        }

        if let (LightNode::Token(_), Some(kind)) = (new, self.light.kind(new)) {
            if tree.is_leaf(old) || kind.leaf_category() != LeafCategory::Ordinary {
                return if self.text_matches(old, self.light.text(new)) {
                    ThreeState::Yes
                } else {
                    ThreeState::No
                };
            }
        }
        ThreeState::Unsure
    }

    fn hash_codes_equal(&self, old: NodeId, new: LightNode) -> bool {
        let tree = &*self.tree;
        if tree.is_leaf(old) && matches!(new, LightNode::Token(_)) {
            return self.text_matches(old, self.light.text(new));
        }
        if tree.is_error(old) && self.light.is_error(new) && tree.error_message(old) != self.light.error_message(new) {
            return false;
        }
        tree.hc(old) == self.light.hc(new)
    }

    fn text_matches(&self, old: NodeId, text: &str) -> bool {
        let tree = &*self.tree;
        if tree.text_len(old) != TextSize::of(text) {
            return false;
        }
        match tree.leaf_text(old) {
            Some(leaf) => leaf == text,
            None => tree.text(old) == text,
        }
    }

    fn replace(&mut self, old: NodeId, new: LightNode) {
        let node = self.convert(new);
        self.edits.push(Edit::Replaced { old, new: node });
    }

    /// Materializes `node` with everything below it as a detached subtree of the old tree.
    fn convert(&mut self, node: LightNode) -> NodeId {
        let builder = self.light.builder();
        match node {
            LightNode::Marker(marker) => {
                let composite = builder.create_composite(&mut *self.tree, marker);
                builder.bind(&mut *self.tree, marker, composite);
                composite
            }
            LightNode::Error(_) => self.tree.error_element(self.light.error_message(node)),
            LightNode::Token(_) => match self.light.kind(node) {
                Some(kind) => self.tree.leaf(kind, self.light.text(node)),
                None => self.tree.error_element(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum K {
        Root,
        Word,
    }
    impl Kind for K {}

    #[test]
    fn edits_below_a_leaf_are_rejected() {
        let mut tree = SyntaxTree::new();
        let root = tree.composite(K::Root);
        let word = tree.leaf(K::Word, "a");
        tree.add_child(root, word);
        tree.set_root(root).unwrap();
        let extra = tree.leaf(K::Word, "b");

        let log = DiffLog {
            edits: vec![Edit::Inserted {
                parent:   word,
                node:     extra,
                position: 0,
            }],
        };
        assert_eq!(log.apply(&mut tree), Err(ReparseError::LeafParent(word)));
        assert!(!tree.contains(extra));
        assert!(tree.children(word).is_empty());
        assert_eq!(tree.text(root), "a");
    }
}
