use crate::{Kind, NodeFactory, NodeId, SyntaxTree};

/// A checkpoint for maybe wrapping a node. See [`TreeBuilder::checkpoint`] for details.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint(usize);

#[derive(Debug)]
enum Pending<K> {
    Node(K),
    Error(Option<String>),
}

/// Builds a [`SyntaxTree`] by hand, without a lexer or markers.
///
/// Start nodes with [`start_node`](TreeBuilder::start_node), add [`token`](TreeBuilder::token)s and
/// then [`finish_node`](TreeBuilder::finish_node). When the whole tree is constructed, call
/// [`finish`](TreeBuilder::finish) to obtain it.
///
/// # Examples
/// ```
/// use marktree::{Kind, TreeBuilder};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum SyntaxKind {
///     Root,
///     Int,
/// }
/// impl Kind for SyntaxKind {}
///
/// let mut builder = TreeBuilder::new();
/// builder.start_node(SyntaxKind::Root);
/// builder.token(SyntaxKind::Int, "42");
/// builder.finish_node();
/// let tree = builder.finish();
///
/// let root = tree.root().unwrap();
/// assert_eq!(tree.kind(root), Some(SyntaxKind::Root));
/// let int = tree.children(root)[0];
/// assert_eq!(tree.leaf_text(int), Some("42"));
/// ```
#[derive(Debug)]
pub struct TreeBuilder<K> {
    tree:     SyntaxTree<K>,
    parents:  Vec<(Pending<K>, usize)>,
    children: Vec<NodeId>,
}

impl<K: Kind> Default for TreeBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kind> TreeBuilder<K> {
    pub fn new() -> Self {
        Self::with_tree(SyntaxTree::new())
    }

    /// Builds into `tree`, re-using its interned text. Its current root is replaced on
    /// [`finish`](TreeBuilder::finish).
    pub fn with_tree(tree: SyntaxTree<K>) -> Self {
        Self {
            tree,
            parents: Vec::with_capacity(8),
            children: Vec::with_capacity(8),
        }
    }

    /// Add a new leaf to the current branch.
    ///
    /// ## Panics
    /// In debug mode, if `kind` has static text, this function will verify that `text` matches that text.
    #[inline]
    pub fn token(&mut self, kind: K, text: &str) {
        let leaf = self.tree.leaf(kind, text);
        self.children.push(leaf);
    }

    /// Add an empty error node carrying `message` to the current branch.
    #[inline]
    pub fn error(&mut self, message: &str) {
        let error = self.tree.error_element(Some(message));
        self.children.push(error);
    }

    /// Start new node of the given `kind` and make it current.
    #[inline]
    pub fn start_node(&mut self, kind: K) {
        let len = self.children.len();
        self.parents.push((Pending::Node(kind), len));
    }

    /// Start an error node that wraps what is added until the matching
    /// [`finish_node`](TreeBuilder::finish_node).
    #[inline]
    pub fn start_error(&mut self, message: Option<&str>) {
        let len = self.children.len();
        self.parents.push((Pending::Error(message.map(str::to_string)), len));
    }

    /// Finish the current branch and restore the previous branch as current.
    pub fn finish_node(&mut self) {
        let (pending, first_child) = match self.parents.pop() {
            Some(parent) => parent,
            None => panic!("called `finish_node` without a matching `start_node`"),
        };
        let node = match pending {
            Pending::Node(kind) => self.tree.composite(kind),
            Pending::Error(message) => self.tree.error_element(message.as_deref()),
        };
        for child in self.children.drain(first_child..) {
            self.tree.add_child(node, child);
        }
        self.children.push(node);
    }

    /// Remembers how many children the current node has so far.
    ///
    /// Children added after the checkpoint, finished nodes included, can later be moved into a new
    /// node with [`start_node_at`](TreeBuilder::start_node_at), once it is clear that they need one.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.children.len())
    }

    /// Starts a node of `kind` that takes over every child added to the current node since
    /// `checkpoint`, and makes it current.
    ///
    /// ## Panics
    /// If the node that was current when `checkpoint` was taken is already finished.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: K) {
        let Checkpoint(first_child) = checkpoint;
        let current_start = self.parents.last().map_or(0, |&(_, start)| start);
        assert!(
            current_start <= first_child && first_child <= self.children.len(),
            "{:?} does not belong to the current node",
            checkpoint
        );
        self.parents.push((Pending::Node(kind), first_child));
    }

    /// Complete building the tree.
    ///
    /// Make sure that calls to [`start_node`](TreeBuilder::start_node) /
    /// [`start_node_at`](TreeBuilder::start_node_at) and
    /// [`finish_node`](TreeBuilder::finish_node) are balanced, i.e. that every started node has
    /// been completed!
    pub fn finish(mut self) -> SyntaxTree<K> {
        assert!(self.parents.is_empty(), "called `finish` with unfinished nodes");
        assert_eq!(self.children.len(), 1, "a tree must have exactly one root");
        let root = self.children[0];
        if self.tree.is_leaf(root) {
            panic!("called `finish` on a `TreeBuilder` which only contained a token");
        }
        if let Err(err) = self.tree.set_root(root) {
            panic!("fresh root could not be installed: {}", err);
        }
        self.tree
    }
}
