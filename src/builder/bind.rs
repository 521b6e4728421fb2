use tracing::debug;

use super::{fatal, Builder, Marker, MarkerState, Production, UNBALANCED_MESSAGE};
use crate::{Kind, NodeFactory, SyntaxTree};

impl<'t, K: Kind> Builder<'t, K> {
    /// Materializes the finished tree with `factory` and returns its root node.
    ///
    /// Every lexeme of the text ends up in exactly one leaf, in order. Empty lexemes are left out,
    /// unless their kind is a [zero-width leaf](Kind::is_zero_width_leaf).
    pub fn build_tree<F: NodeFactory<K>>(&mut self, factory: &mut F) -> F::Node {
        let root = self.prepare();
        let node = self.create_composite(factory, root);
        self.bind(factory, root, node.clone());
        debug!(lexemes = self.lexemes.len(), "built tree");
        node
    }

    /// Builds the finished tree into a new [`SyntaxTree`].
    ///
    /// # Examples
    /// ```
    /// # use marktree::*;
    /// # use text_size::TextSize;
    /// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// enum SyntaxKind {
    ///     Word,
    ///     Root,
    /// }
    /// impl Kind for SyntaxKind {}
    ///
    /// // one token covering the whole text
    /// struct Single(Option<TextSize>);
    /// impl Lexer for Single {
    ///     type Kind = SyntaxKind;
    ///     fn start(&mut self, text: &str) {
    ///         self.0 = Some(TextSize::of(text)).filter(|len| *len > 0.into());
    ///     }
    ///     fn current_kind(&self) -> Option<SyntaxKind> {
    ///         self.0.map(|_| SyntaxKind::Word)
    ///     }
    ///     fn current_start(&self) -> TextSize {
    ///         0.into()
    ///     }
    ///     fn current_end(&self) -> TextSize {
    ///         self.0.unwrap_or_default()
    ///     }
    ///     fn advance(&mut self) {
    ///         self.0 = None;
    ///     }
    /// }
    ///
    /// let mut builder = Builder::new("hello", &mut Single(None), Config::new(KindSet::empty(), KindSet::empty()));
    /// let root = builder.mark();
    /// assert_eq!(builder.current_kind(), Some(SyntaxKind::Word));
    /// builder.advance();
    /// assert!(builder.eof());
    /// builder.done(root, SyntaxKind::Root);
    ///
    /// let tree = builder.finish();
    /// let root = tree.root().unwrap();
    /// assert_eq!(tree.kind(root), Some(SyntaxKind::Root));
    /// assert_eq!(tree.text(root), "hello");
    /// ```
    pub fn finish(mut self) -> SyntaxTree<K> {
        let mut tree = SyntaxTree::new();
        let root = self.build_tree(&mut tree);
        match tree.set_root(root) {
            Ok(()) => tree,
            Err(err) => fatal(err),
        }
    }

    /// A node for `marker`: a composite of its kind, or an error node if it was closed as an error.
    pub(crate) fn create_composite<F: NodeFactory<K>>(&self, factory: &mut F, marker: Marker) -> F::Node {
        let data = self.start_data(marker);
        match (data.kind, data.done) {
            (Some(kind), _) => factory.composite(kind),
            (None, Some(done)) => factory.error_element(self.done_data(done).message.as_deref()),
            (None, None) => fatal(UNBALANCED_MESSAGE),
        }
    }

    /// Adds everything below `marker` to `node`. Composite children are handed to their parent only
    /// once they are complete.
    pub(crate) fn bind<F: NodeFactory<K>>(&self, factory: &mut F, marker: Marker, node: F::Node) {
        let end = Production::Done(self.done_of(marker));
        let mut parents: Vec<(Marker, F::Node)> = Vec::new();
        let mut cur_marker = marker;
        let mut cur_node = node;

        let mut lexeme = self.start_data(marker).lexeme;
        let mut item = self.start_data(marker).first_child.unwrap_or(end);
        loop {
            lexeme = self.insert_leaves(factory, lexeme, self.lexeme_of(item), &cur_node);
            if item == end {
                break;
            }

            match item {
                Production::Start(child) => {
                    if self.start_data(child).state != MarkerState::Collapsed {
                        let child_node = self.create_composite(factory, child);
                        parents.push((cur_marker, cur_node));
                        cur_marker = child;
                        cur_node = child_node;
                        item = match self.start_data(child).first_child {
                            Some(first) => first,
                            None => Production::Done(self.done_of(child)),
                        };
                        continue;
                    }
                    lexeme = self.collapse_leaves(factory, &cur_node, child);
                }
                Production::Error(error) => {
                    let error_node = factory.error_element(Some(&self.error_data(error).message));
                    factory.add_child(cur_node.clone(), error_node);
                }
                Production::Done(done) => {
                    let (parent_marker, parent_node) = match parents.pop() {
                        Some(parent) => parent,
                        None => fatal(UNBALANCED_MESSAGE),
                    };
                    factory.add_child(parent_node.clone(), cur_node);
                    cur_marker = parent_marker;
                    cur_node = parent_node;
                    item = Production::Start(self.done_data(done).start);
                }
            }

            item = match self.next_of(item) {
                Some(next) => next,
                None => Production::Done(self.done_of(cur_marker)),
            };
        }
    }

    /// Adds a leaf for every lexeme in `from..to` to `parent`, and returns where it stopped.
    fn insert_leaves<F: NodeFactory<K>>(&self, factory: &mut F, from: usize, to: usize, parent: &F::Node) -> usize {
        let to = std::cmp::min(to, self.lexemes.len());
        let mut lexeme = from;
        while lexeme < to {
            let kind = self.lexemes.kind(lexeme);
            let range = self.lexemes.range(lexeme);
            if !range.is_empty() || kind.is_zero_width_leaf() {
                let leaf = factory.leaf(kind, &self.text[range]);
                factory.add_child(parent.clone(), leaf);
            }
            lexeme += 1;
        }
        lexeme
    }

    /// Adds the text of the collapsed `marker` as a single leaf.
    fn collapse_leaves<F: NodeFactory<K>>(&self, factory: &mut F, parent: &F::Node, marker: Marker) -> usize {
        let data = self.start_data(marker);
        let done = self.done_lexeme(marker);
        let kind = match data.kind {
            Some(kind) => kind,
            None => fatal(UNBALANCED_MESSAGE),
        };
        let start = usize::from(self.lexemes.boundary(data.lexeme));
        let end = usize::from(self.lexemes.boundary(done));
        let leaf = factory.leaf(kind, &self.text[start..end]);
        factory.add_child(parent.clone(), leaf);
        done
    }
}
