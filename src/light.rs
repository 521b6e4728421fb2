//! A lightweight view of a finished parse.
//!
//! Unlike [`Builder::build_tree`](crate::Builder::build_tree), the light tree creates no nodes: markers
//! and errors of the production list are its inner nodes, and only the leaves are materialized, on
//! demand, as pooled [`LightToken`]s. Tokens are handed out by [`LightTree::children`] and go back to
//! the pool with [`LightTree::dispose_children`].

use std::fmt::Write;

use text_size::{TextRange, TextSize};

use crate::{
    builder::{fatal, Production},
    pool::{Pool, RawId},
    tree::text_hc,
    Builder, ErrorItem, Kind, Marker, MarkerState,
};

/// A leaf of a [`LightTree`]. Goes stale once disposed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightToken(RawId);

impl std::fmt::Debug for LightToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LightToken({:?})", self.0)
    }
}

/// A node of a [`LightTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightNode {
    /// A closed marker, possibly closed as an error.
    Marker(Marker),
    /// A free-standing error. Always empty.
    Error(ErrorItem),
    Token(LightToken),
}

#[derive(Debug)]
struct TokenData<K> {
    kind:   K,
    range:  TextRange,
    parent: Marker,
}

/// The finished tree of a [`Builder`], obtained with
/// [`Builder::build_light_tree`](crate::Builder::build_light_tree).
pub struct LightTree<'b, 't, K: Kind> {
    builder: &'b Builder<'t, K>,
    root:    Marker,
    tokens:  Pool<TokenData<K>>,
}

impl<'b, 't, K: Kind> LightTree<'b, 't, K> {
    pub(crate) fn new(builder: &'b Builder<'t, K>, root: Marker) -> Self {
        Self {
            builder,
            root,
            tokens: Pool::with_capacity(builder.config().token_pool_capacity()),
        }
    }

    #[inline]
    pub(crate) fn builder(&self) -> &'b Builder<'t, K> {
        self.builder
    }

    #[inline]
    pub fn root(&self) -> LightNode {
        LightNode::Marker(self.root)
    }

    fn token(&self, token: LightToken) -> &TokenData<K> {
        match self.tokens.get(token.0) {
            Some(data) => data,
            None => fatal(format_args!("{:?} was disposed and can no longer be used", token)),
        }
    }

    /// Collects the children of `node` into `out`, replacing its previous contents, and returns how
    /// many there are. Tokens and free-standing errors have no children.
    ///
    /// Gaps between child markers become tokens, one per lexeme. A collapsed child marker becomes a
    /// single token of the marker's kind.
    pub fn children(&mut self, node: LightNode, out: &mut Vec<LightNode>) -> usize {
        out.clear();
        let marker = match node {
            LightNode::Marker(marker) => marker,
            _ => return 0,
        };
        let builder = self.builder;
        let data = builder.start_data(marker);
        if data.state == MarkerState::Collapsed && marker != self.root {
            return 0;
        }

        let mut lexeme = data.lexeme;
        let mut child = data.first_child;
        while let Some(item) = child {
            lexeme = self.insert_leaves(lexeme, builder.lexeme_of(item), marker, out);
            match item {
                Production::Start(child_marker) => {
                    let child_data = builder.start_data(child_marker);
                    let end = builder.done_lexeme(child_marker);
                    if child_data.state == MarkerState::Collapsed {
                        if let Some(kind) = child_data.kind {
                            self.insert_leaf(kind, child_data.lexeme, end, marker, true, out);
                        }
                    } else {
                        out.push(LightNode::Marker(child_marker));
                    }
                    lexeme = end;
                }
                Production::Error(error) => out.push(LightNode::Error(error)),
                Production::Done(_) => {}
            }
            child = builder.next_of(item);
        }
        self.insert_leaves(lexeme, builder.done_lexeme(marker), marker, out);
        out.len()
    }

    fn insert_leaves(&mut self, from: usize, to: usize, parent: Marker, out: &mut Vec<LightNode>) -> usize {
        let builder = self.builder;
        let lexemes = builder.lexemes();
        let to = std::cmp::min(to, lexemes.len());
        let mut lexeme = from;
        while lexeme < to {
            self.insert_leaf(lexemes.kind(lexeme), lexeme, lexeme + 1, parent, false, out);
            lexeme += 1;
        }
        lexeme
    }

    /// Adds a token spanning lexemes `start..end`. Empty tokens are only kept if `force`d or for
    /// zero-width leaf kinds.
    fn insert_leaf(
        &mut self,
        kind: K,
        start: usize,
        end: usize,
        parent: Marker,
        force: bool,
        out: &mut Vec<LightNode>,
    ) {
        let lexemes = self.builder.lexemes();
        let start = lexemes.boundary(start);
        let end = lexemes.boundary(end);
        if start > end || (!force && start == end && !kind.is_zero_width_leaf()) {
            return;
        }
        let id = self.tokens.alloc(TokenData {
            kind,
            range: TextRange::new(start, end),
            parent,
        });
        out.push(LightNode::Token(LightToken(id)));
    }

    /// Returns the tokens among `children` to the pool. Markers and errors are left alone.
    pub fn dispose_children(&mut self, children: &[LightNode]) {
        for child in children {
            if let LightNode::Token(token) = child {
                self.tokens.recycle(token.0);
            }
        }
    }

    /// Number of tokens handed out and not yet disposed.
    pub fn live_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// The kind of `node`. `None` for errors, including markers closed as errors.
    pub fn kind(&self, node: LightNode) -> Option<K> {
        match node {
            LightNode::Marker(marker) => self.builder.marker_kind(marker),
            LightNode::Error(_) => None,
            LightNode::Token(token) => Some(self.token(token).kind),
        }
    }

    pub fn is_error(&self, node: LightNode) -> bool {
        self.kind(node).is_none()
    }

    /// The message of an error node.
    pub fn error_message(&self, node: LightNode) -> Option<&'b str> {
        let builder = self.builder;
        match node {
            LightNode::Marker(marker) => {
                let data = builder.start_data(marker);
                match (data.kind, data.done) {
                    (None, Some(done)) => builder.done_data(done).message.as_deref(),
                    _ => None,
                }
            }
            LightNode::Error(error) => Some(&builder.error_data(error).message),
            LightNode::Token(_) => None,
        }
    }

    pub fn text_range(&self, node: LightNode) -> TextRange {
        let lexemes = self.builder.lexemes();
        match node {
            LightNode::Marker(marker) => {
                let start = lexemes.boundary(self.builder.start_data(marker).lexeme);
                let end = lexemes.boundary(self.builder.done_lexeme(marker));
                TextRange::new(start, end)
            }
            LightNode::Error(error) => TextRange::empty(lexemes.boundary(self.builder.error_data(error).lexeme)),
            LightNode::Token(token) => self.token(token).range,
        }
    }

    #[inline]
    pub fn start_offset(&self, node: LightNode) -> TextSize {
        self.text_range(node).start()
    }

    #[inline]
    pub fn end_offset(&self, node: LightNode) -> TextSize {
        self.text_range(node).end()
    }

    /// The text covered by `node`.
    pub fn text(&self, node: LightNode) -> &'t str {
        if let LightNode::Token(token) = node {
            let data = self.token(token);
            if let Some(text) = data.kind.static_text() {
                return text;
            }
            return &self.builder.text()[data.range];
        }
        &self.builder.text()[self.text_range(node)]
    }

    pub fn parent(&self, node: LightNode) -> Option<LightNode> {
        let parent = match node {
            LightNode::Marker(marker) => self.builder.start_data(marker).parent,
            LightNode::Error(error) => self.builder.error_data(error).parent,
            LightNode::Token(token) => Some(self.token(token).parent),
        };
        parent.map(LightNode::Marker)
    }

    /// The fingerprint of `node`, comparable with [`SyntaxTree::hc`](crate::SyntaxTree::hc).
    pub fn hc(&self, node: LightNode) -> u32 {
        match node {
            LightNode::Marker(marker) => self.builder.marker_hc(marker),
            LightNode::Error(_) => 0,
            LightNode::Token(_) => text_hc(self.text(node)),
        }
    }

    /// Renders the subtree of `node` like [`SyntaxTree::debug`](crate::SyntaxTree::debug).
    pub fn debug(&mut self, node: LightNode) -> String {
        let mut res = String::new();
        self.write_subtree(&mut res, node, 0);
        res
    }

    fn write_subtree(&mut self, res: &mut String, node: LightNode, level: usize) {
        for _ in 0..level {
            res.push_str("  ");
        }
        let range = self.text_range(node);
        // writing into a `String` cannot fail
        let _ = match (node, self.kind(node)) {
            (LightNode::Token(_), Some(kind)) => writeln!(res, "{:?}@{:?} {:?}", kind, range, self.text(node)),
            (_, Some(kind)) => writeln!(res, "{:?}@{:?}", kind, range),
            (_, None) => match self.error_message(node) {
                Some(message) => writeln!(res, "Error@{:?} {:?}", range, message),
                None => writeln!(res, "Error@{:?}", range),
            },
        };
        let mut children = Vec::new();
        self.children(node, &mut children);
        for &child in &children {
            self.write_subtree(res, child, level + 1);
        }
        self.dispose_children(&children);
    }
}

impl<K: Kind> std::fmt::Debug for LightTree<'_, '_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightTree")
            .field("root", &self.root)
            .field("live_tokens", &self.tokens.len())
            .finish()
    }
}

impl<'t, K: Kind> Builder<'t, K> {
    /// Fingerprint of the text below `marker`, cached per marker.
    pub(crate) fn marker_hc(&self, marker: Marker) -> u32 {
        let data = self.start_data(marker);
        if let Some(hc) = data.hc.get() {
            return hc;
        }

        let text = self.text();
        let lexemes = self.lexemes();
        let gap = |from: usize, to: usize| {
            let start = lexemes.boundary(from);
            let end = lexemes.boundary(to);
            if start < end {
                text_hc(&text[TextRange::new(start, end)])
            } else {
                0
            }
        };

        let mut hc = 0u32;
        let mut lexeme = data.lexeme;
        let mut child = data.first_child;
        while let Some(item) = child {
            let next_lexeme = self.lexeme_of(item);
            hc = hc.wrapping_add(gap(lexeme, next_lexeme));
            lexeme = std::cmp::max(lexeme, next_lexeme);
            if let Production::Start(child_marker) = item {
                hc = hc.wrapping_add(self.marker_hc(child_marker));
                lexeme = self.done_lexeme(child_marker);
            }
            child = self.next_of(item);
        }
        hc = hc.wrapping_add(gap(lexeme, self.done_lexeme(marker)));
        data.hc.set(Some(hc));
        hc
    }
}
