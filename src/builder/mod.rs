//! The marker-driven builder.
//!
//! A grammar drives a [`Builder`] by inspecting the current token, advancing over it, and bracketing
//! ranges of tokens with [markers](Marker). Every marker operation only appends to (or splices into)
//! a flat production list; the tree it describes is only laid out once parsing is finished, either
//! into real nodes ([`build_tree`](Builder::build_tree)), into a [`LightTree`] view, or as a patch
//! against a previously built tree ([`merge`](Builder::merge)).

mod bind;
mod marker;
mod prepare;

use std::{
    backtrace::{Backtrace, BacktraceStatus},
    fmt,
};

use text_size::{TextRange, TextSize};
use tracing::{debug, error, warn};

use crate::{
    diff::{DiffLog, DiffTree, ThreeState},
    lexemes::LexemeCache,
    light::{LightNode, LightTree},
    pool::Pool,
    Config, EdgeBinder, Kind, KindSet, Lexer, NodeId, ReparseError, SyntaxTree,
};

pub use self::marker::{ErrorItem, Marker, MarkerState};
pub(crate) use self::marker::{DoneData, DoneId, ErrorData, Production, StartData};

pub(crate) const UNBALANCED_MESSAGE: &str = "Unbalanced tree. Most probably caused by unbalanced markers. \
                                             Try enabling debug mode to identify the exact location of the problem";

type KindRemapper<'t, K> = Box<dyn FnMut(K, TextRange, &str) -> K + 't>;
type SkipCallback<'t, K> = Box<dyn FnMut(K, TextRange) + 't>;

/// A user-supplied equality check between an old tree node and a node of the new parse, consulted
/// during [`merge`](Builder::merge) before the built-in rules. Returning
/// [`ThreeState::Unsure`] defers to the built-in rules.
pub type CustomComparator<'t, K> = dyn Fn(&SyntaxTree<K>, NodeId, &LightTree<'_, 't, K>, LightNode) -> ThreeState + 't;

/// Reports a misuse of the marker API. These are bugs in the grammar, never in the parsed text.
#[cold]
#[track_caller]
pub(crate) fn fatal(message: impl fmt::Display) -> ! {
    let message = message.to_string();
    error!("{}", message);
    panic!("{}", message)
}

/// Builds a concrete syntax tree for one text under the control of a grammar.
///
/// The whole text is lexed on construction. The grammar then walks the significant tokens with
/// [`current_kind`](Builder::current_kind) and [`advance`](Builder::advance), skipping whitespace and
/// comments automatically, and describes the tree with [`mark`](Builder::mark),
/// [`done`](Builder::done) and friends.
pub struct Builder<'t, K: Kind> {
    text:         &'t str,
    lexemes:      LexemeCache<K>,
    current:      usize,
    cached_kind:  Option<Option<K>>,
    kind_checked: bool,
    whitespace:   KindSet<K>,
    comments:     KindSet<K>,
    production:   Vec<Production>,
    starts:       Pool<StartData<K>>,
    dones:        Pool<DoneData<K>>,
    errors:       Pool<ErrorData>,
    remapper:     Option<KindRemapper<'t, K>>,
    on_skip:      Option<SkipCallback<'t, K>>,
    comparator:   Option<Box<CustomComparator<'t, K>>>,
    config:       Config<K>,
    prepared:     bool,
    depth:        usize,
}

impl<'t, K: Kind> Builder<'t, K> {
    /// Lexes `text` with `lexer` and sets up an empty production list.
    pub fn new<L>(text: &'t str, lexer: &mut L, config: Config<K>) -> Self
    where
        L: Lexer<Kind = K> + ?Sized,
    {
        let lexemes = LexemeCache::lex(text, lexer);
        debug!(lexemes = lexemes.len(), text_len = text.len(), "created builder");
        Self {
            text,
            lexemes,
            current: 0,
            cached_kind: None,
            kind_checked: false,
            whitespace: config.whitespace.clone(),
            comments: config.comments.clone(),
            production: Vec::with_capacity(256),
            starts: Pool::with_capacity(config.marker_pool_capacity),
            dones: Pool::with_capacity(config.marker_pool_capacity),
            errors: Pool::with_capacity(config.marker_pool_capacity),
            remapper: None,
            on_skip: None,
            comparator: None,
            config,
            prepared: false,
            depth: 0,
        }
    }

    #[inline]
    pub fn text(&self) -> &'t str {
        self.text
    }

    #[inline]
    pub fn config(&self) -> &Config<K> {
        &self.config
    }

    pub fn set_debug_mode(&mut self, debug_mode: bool) {
        self.config.debug_mode = debug_mode;
    }

    /// Replaces the kinds treated as comments.
    pub fn enforce_comment_kinds(&mut self, comments: KindSet<K>) {
        self.comments = comments;
    }

    /// Installs a function that may re-tag every lexeme when the cursor reaches it. It receives the
    /// cached kind, the lexeme's range and its text.
    pub fn set_kind_remapper(&mut self, remapper: impl FnMut(K, TextRange, &str) -> K + 't) {
        self.remapper = Some(Box::new(remapper));
        self.cached_kind = None;
    }

    /// Installs a function called for every whitespace or comment lexeme the cursor skips.
    pub fn set_whitespace_skipped_callback(&mut self, callback: impl FnMut(K, TextRange) + 't) {
        self.on_skip = Some(Box::new(callback));
    }

    /// Installs an equality check consulted by [`merge`](Builder::merge) before its built-in rules.
    pub fn set_custom_comparator(
        &mut self,
        comparator: impl Fn(&SyntaxTree<K>, NodeId, &LightTree<'_, 't, K>, LightNode) -> ThreeState + 't,
    ) {
        self.comparator = Some(Box::new(comparator));
    }

    pub(crate) fn custom_comparator(&self) -> Option<&CustomComparator<'t, K>> {
        self.comparator.as_deref()
    }

    #[inline]
    pub(crate) fn is_trivia(&self, kind: K) -> bool {
        self.whitespace.contains(kind) || self.comments.contains(kind)
    }

    #[inline]
    pub(crate) fn whitespace(&self) -> &KindSet<K> {
        &self.whitespace
    }

    #[inline]
    pub(crate) fn lexemes(&self) -> &LexemeCache<K> {
        &self.lexemes
    }

    /// Whether all significant tokens were consumed. Skips whitespace and comments in front of the
    /// cursor.
    pub fn eof(&mut self) -> bool {
        if !self.kind_checked {
            self.kind_checked = true;
            self.skip_whitespace();
        }
        self.current >= self.lexemes.len()
    }

    /// The kind of the current significant token, or `None` at the end of input.
    pub fn current_kind(&mut self) -> Option<K> {
        if let Some(kind) = self.cached_kind {
            return kind;
        }
        let kind = self.calc_kind();
        self.cached_kind = Some(kind);
        kind
    }

    fn calc_kind(&mut self) -> Option<K> {
        if self.eof() {
            return None;
        }
        if self.remapper.is_some() {
            // remaps the current lexeme, and skips what got remapped to whitespace
            self.skip_whitespace();
        }
        self.lexemes.kinds().get(self.current).copied()
    }

    /// The text of the current significant token.
    pub fn current_text(&mut self) -> Option<&'t str> {
        let kind = self.current_kind()?;
        match kind.static_text() {
            Some(text) => Some(text),
            None => Some(&self.text[self.lexemes.range(self.current)]),
        }
    }

    /// Offset of the current significant token, or the text length at the end of input.
    pub fn current_offset(&mut self) -> TextSize {
        if self.eof() {
            return TextSize::of(self.text);
        }
        self.lexemes.start(self.current)
    }

    /// Moves past the current significant token.
    pub fn advance(&mut self) {
        let checked = self.kind_checked;
        if self.eof() {
            return;
        }
        if !checked {
            warn!(lexeme = self.current, "eating token without checking its kind");
        }
        self.kind_checked = false;
        self.current += 1;
        self.cached_kind = None;
    }

    /// Moves the cursor `steps` lexemes forward, including whitespace and comments.
    pub fn raw_advance(&mut self, steps: usize) {
        if steps == 0 {
            return;
        }
        self.current = std::cmp::min(self.current + steps, self.lexemes.len());
        self.kind_checked = false;
        self.cached_kind = None;
    }

    /// The kind of the `steps`-th significant token after the current one.
    pub fn look_ahead(&mut self, steps: usize) -> Option<K> {
        if self.eof() {
            return None;
        }
        let count = self.lexemes.len();
        let mut cur = self.current;
        for _ in 0..steps {
            cur += 1;
            while cur < count && self.is_trivia(self.lexemes.kind(cur)) {
                cur += 1;
            }
        }
        self.lexemes.kinds().get(cur).copied()
    }

    /// The kind of the lexeme `steps` away from the cursor, whitespace and comments included.
    pub fn raw_lookup(&self, steps: isize) -> Option<K> {
        let cur = self.current as isize + steps;
        if cur < 0 {
            return None;
        }
        self.lexemes.kinds().get(cur as usize).copied()
    }

    /// Start offset of the lexeme `steps` away from the cursor. Positions past the end yield the
    /// text length.
    pub fn raw_token_start(&self, steps: isize) -> Option<TextSize> {
        let cur = self.current as isize + steps;
        if cur < 0 {
            return None;
        }
        Some(self.lexemes.boundary(cur as usize))
    }

    /// Index of the lexeme under the cursor.
    #[inline]
    pub fn raw_token_index(&self) -> usize {
        self.current
    }

    /// Re-tags the current lexeme.
    pub fn remap_current_token(&mut self, kind: K) {
        if self.current < self.lexemes.len() {
            self.lexemes.remap(self.current, kind);
            self.cached_kind = None;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current < self.lexemes.len() {
            let kind = self.remap_current();
            if !self.is_trivia(kind) {
                break;
            }
            if let Some(on_skip) = self.on_skip.as_mut() {
                on_skip(kind, self.lexemes.range(self.current));
            }
            self.current += 1;
            self.cached_kind = None;
        }
    }

    fn remap_current(&mut self) -> K {
        if let Some(Some(kind)) = self.cached_kind {
            return kind;
        }
        let index = self.current;
        let kind = self.lexemes.kind(index);
        match self.remapper.as_mut() {
            Some(remapper) => {
                let range = self.lexemes.range(index);
                let remapped = remapper(kind, range, &self.text[range]);
                self.lexemes.remap(index, remapped);
                remapped
            }
            None => kind,
        }
    }

    fn is_empty(&self, start: usize, end: usize) -> bool {
        (start..end).all(|i| self.is_trivia(self.lexemes.kind(i)))
    }

    #[inline]
    pub(crate) fn start_data(&self, marker: Marker) -> &StartData<K> {
        match self.starts.get(marker.0) {
            Some(data) => data,
            None => fatal(format_args!("{:?} was dropped or rolled back and can no longer be used", marker)),
        }
    }

    #[inline]
    fn start_data_mut(&mut self, marker: Marker) -> &mut StartData<K> {
        match self.starts.get_mut(marker.0) {
            Some(data) => data,
            None => fatal(format_args!("{:?} was dropped or rolled back and can no longer be used", marker)),
        }
    }

    #[inline]
    pub(crate) fn done_data(&self, done: DoneId) -> &DoneData<K> {
        match self.dones.get(done.0) {
            Some(data) => data,
            None => fatal(format_args!("{:?} was recycled while still in use", done)),
        }
    }

    #[inline]
    pub(crate) fn error_data(&self, error: ErrorItem) -> &ErrorData {
        match self.errors.get(error.0) {
            Some(data) => data,
            None => fatal(format_args!("{:?} was rolled back and can no longer be used", error)),
        }
    }

    /// The done marker of a closed marker.
    pub(crate) fn done_of(&self, marker: Marker) -> DoneId {
        match self.start_data(marker).done {
            Some(done) => done,
            None => fatal(UNBALANCED_MESSAGE),
        }
    }

    /// The lexeme index at which `marker` was closed.
    #[inline]
    pub(crate) fn done_lexeme(&self, marker: Marker) -> usize {
        self.done_data(self.done_of(marker)).lexeme
    }

    pub(crate) fn lexeme_of(&self, item: Production) -> usize {
        match item {
            Production::Start(marker) => self.start_data(marker).lexeme,
            Production::Done(done) => self.done_data(done).lexeme,
            Production::Error(error) => self.error_data(error).lexeme,
        }
    }

    pub(crate) fn next_of(&self, item: Production) -> Option<Production> {
        match item {
            Production::Start(marker) => self.start_data(marker).next,
            Production::Error(error) => self.error_data(error).next,
            Production::Done(_) => None,
        }
    }

    fn index_of(&self, item: Production) -> Option<usize> {
        self.production.iter().rposition(|&it| it == item)
    }

    fn check_unprepared(&self) {
        if self.prepared {
            fatal("The tree was already built, the production list can no longer change");
        }
    }

    fn create_marker(&mut self, lexeme: usize) -> Marker {
        self.check_unprepared();
        let created_at = if self.config.debug_mode {
            Some(Backtrace::capture())
        } else {
            None
        };
        Marker(self.starts.alloc(StartData::new(lexeme, created_at)))
    }

    fn recycle(&mut self, item: Production) {
        match item {
            Production::Start(marker) => {
                self.starts.recycle(marker.0);
            }
            Production::Done(done) => {
                self.dones.recycle(done.0);
            }
            Production::Error(error) => {
                self.errors.recycle(error.0);
            }
        }
    }

    /// Opens a new marker at the current significant token.
    pub fn mark(&mut self) -> Marker {
        if !self.production.is_empty() {
            self.skip_whitespace();
        }
        let marker = self.create_marker(self.current);
        self.production.push(Production::Start(marker));
        marker
    }

    /// Opens a new marker right before `marker`, at the same position, so that it will enclose it.
    pub fn precede(&mut self, marker: Marker) -> Marker {
        let index = match self.index_of(Production::Start(marker)) {
            Some(index) => index,
            None => fatal("Cannot precede dropped or rolled-back marker"),
        };
        let lexeme = self.start_data(marker).lexeme;
        let pre = self.create_marker(lexeme);
        self.production.insert(index, Production::Start(pre));
        pre
    }

    /// Closes `marker` as a node of `kind` ending at the cursor.
    pub fn done(&mut self, marker: Marker, kind: K) {
        self.check_closable(marker, None);
        let done = self.close(marker, Some(kind), self.current, None, kind.is_left_bound());
        self.production.push(Production::Done(done));
    }

    /// Closes `marker` as a node of `kind` that will become a single leaf.
    pub fn collapse(&mut self, marker: Marker, kind: K) {
        self.done(marker, kind);
        self.start_data_mut(marker).state = MarkerState::Collapsed;
    }

    /// Closes `marker` as an error node carrying `message`.
    pub fn error_marker(&mut self, marker: Marker, message: impl Into<String>) {
        self.check_closable(marker, None);
        let done = self.close(marker, None, self.current, Some(message.into()), true);
        self.production.push(Production::Done(done));
    }

    /// Closes `marker` as a node of `kind` that ends where the open marker `before` starts.
    pub fn done_before(&mut self, marker: Marker, kind: K, before: Marker) {
        self.check_closable(marker, Some(before));
        let (index, lexeme) = self.before_position(before);
        let done = self.close(marker, Some(kind), lexeme, None, kind.is_left_bound());
        self.production.insert(index, Production::Done(done));
    }

    /// Like [`done_before`](Builder::done_before), and also records an error right before `before`,
    /// at the end of the new node.
    pub fn done_before_with_error(&mut self, marker: Marker, kind: K, before: Marker, message: impl Into<String>) {
        self.check_unprepared();
        let (index, lexeme) = self.before_position(before);
        let error = self.alloc_error(lexeme, message.into());
        self.production.insert(index, Production::Error(error));
        self.done_before(marker, kind, before);
    }

    /// Closes `marker` as an error node that ends where the open marker `before` starts.
    pub fn error_before(&mut self, marker: Marker, message: impl Into<String>, before: Marker) {
        self.check_closable(marker, Some(before));
        let (index, lexeme) = self.before_position(before);
        let done = self.close(marker, None, lexeme, Some(message.into()), true);
        self.production.insert(index, Production::Done(done));
    }

    fn before_position(&self, before: Marker) -> (usize, usize) {
        match self.index_of(Production::Start(before)) {
            Some(index) => (index, self.start_data(before).lexeme),
            None => fatal("'Before' marker has never been added."),
        }
    }

    /// Records the done marker of `marker` at `lexeme`. An empty node of a left-bound kind (and any
    /// empty error node) is tied to the left: its start edge gets the trailing binder.
    fn close(
        &mut self,
        marker: Marker,
        kind: Option<K>,
        lexeme: usize,
        message: Option<String>,
        left_bound: bool,
    ) -> DoneId {
        let start = self.start_data(marker).lexeme;
        let tie_to_left = left_bound && self.is_empty(start, lexeme);
        let done = DoneId(self.dones.alloc(DoneData {
            start: marker,
            lexeme,
            binder: EdgeBinder::Trailing,
            message,
        }));
        let data = self.start_data_mut(marker);
        data.kind = kind;
        data.done = Some(done);
        data.state = MarkerState::Done;
        if tie_to_left {
            data.binder = EdgeBinder::Trailing;
        }
        done
    }

    fn check_closable(&self, marker: Marker, before: Option<Marker>) {
        self.check_unprepared();
        if self.start_data(marker).done.is_some() {
            fatal("Marker already done.");
        }
        if !self.config.debug_mode {
            return;
        }

        let index = match self.index_of(Production::Start(marker)) {
            Some(index) => index,
            None => fatal("Marker has never been added."),
        };
        let mut end = self.production.len();
        if let Some(before) = before {
            end = match self.index_of(Production::Start(before)) {
                Some(end) => end,
                None => fatal("'Before' marker has never been added."),
            };
            if index > end {
                fatal("'Before' marker precedes this one.");
            }
        }

        let between = self.production.get(index + 1..end).unwrap_or(&[]);
        for &item in between.iter().rev() {
            if let Production::Start(other) = item {
                if self.start_data(other).done.is_none() {
                    fatal(self.out_of_order_message(marker, other));
                }
            }
        }
    }

    fn out_of_order_message(&self, marker: Marker, other: Marker) -> String {
        let mut message = String::from("Another not done marker added after this one. Must be done before this.");
        let traces = [("this marker", marker), ("the other marker", other)];
        for (what, marker) in traces.iter() {
            if let Some(trace) = &self.start_data(*marker).created_at {
                if trace.status() == BacktraceStatus::Captured {
                    message.push_str(&format!("\n{} was created at:\n{}", what, trace));
                }
            }
        }
        message
    }

    /// Removes `marker` from the production list. Whatever it enclosed moves up to its parent.
    pub fn drop(&mut self, marker: Marker) {
        self.check_unprepared();
        let done = match self.starts.get(marker.0) {
            Some(data) => data.done,
            None => fatal("The marker must be added before it is dropped."),
        };
        if let Some(done) = done {
            if let Some(index) = self.index_of(Production::Done(done)) {
                self.production.remove(index);
            }
            self.dones.recycle(done.0);
        }
        match self.index_of(Production::Start(marker)) {
            Some(index) => {
                self.production.remove(index);
            }
            None => fatal("The marker must be added before it is dropped."),
        }
        self.starts.recycle(marker.0);
    }

    /// Resets the cursor to where `marker` was opened and forgets everything recorded since,
    /// including `marker` itself.
    pub fn rollback_to(&mut self, marker: Marker) {
        self.check_unprepared();
        let index = match self.index_of(Production::Start(marker)) {
            Some(index) => index,
            None => fatal("The marker must be added before rolled back to."),
        };
        self.current = self.start_data(marker).lexeme;
        self.kind_checked = true;
        for item in self.production.split_off(index) {
            self.recycle(item);
        }
        self.cached_kind = None;
    }

    /// Records an error at the cursor, unless an error was just recorded at the same position.
    pub fn error(&mut self, message: impl Into<String>) {
        self.check_unprepared();
        if let Some(&Production::Error(last)) = self.production.last() {
            if self.error_data(last).lexeme == self.current {
                return;
            }
        }
        let error = self.alloc_error(self.current, message.into());
        self.production.push(Production::Error(error));
    }

    fn alloc_error(&mut self, lexeme: usize, message: String) -> ErrorItem {
        ErrorItem(self.errors.alloc(ErrorData {
            lexeme,
            message,
            parent: None,
            next: None,
        }))
    }

    /// Whether an error was recorded after `marker` was opened.
    pub fn has_errors_after(&self, marker: Marker) -> bool {
        let index = match self.index_of(Production::Start(marker)) {
            Some(index) => index,
            None => fatal("The marker must be added before checked for errors."),
        };
        self.production[index + 1..].iter().any(|&item| match item {
            Production::Error(_) => true,
            Production::Done(done) => self.done_data(done).message.is_some(),
            Production::Start(_) => false,
        })
    }

    /// The marker closed most recently (by position in the production list).
    pub fn latest_done_marker(&self) -> Option<Marker> {
        self.production.iter().rev().find_map(|&item| match item {
            Production::Done(done) => Some(self.done_data(done).start),
            _ => None,
        })
    }

    /// The kind `marker` was closed with. `None` while open and for error nodes.
    pub fn marker_kind(&self, marker: Marker) -> Option<K> {
        self.start_data(marker).kind
    }

    /// The state of `marker`, or `None` if it was dropped or rolled back.
    pub fn marker_state(&self, marker: Marker) -> Option<MarkerState> {
        self.starts.get(marker.0).map(|data| data.state)
    }

    /// Changes the kind of a closed marker.
    pub fn remap_marker_kind(&mut self, marker: Marker, kind: K) {
        self.start_data_mut(marker).kind = Some(kind);
    }

    /// Overrides how the edges of `marker` are placed among surrounding whitespace and comments.
    /// The right edge can only be set once the marker is closed.
    pub fn set_edge_binders(&mut self, marker: Marker, left: Option<EdgeBinder<K>>, right: Option<EdgeBinder<K>>) {
        if let Some(left) = left {
            self.start_data_mut(marker).binder = left;
        }
        if let Some(right) = right {
            let done = match self.start_data(marker).done {
                Some(done) => done,
                None => fatal("Cannot set right-edge processor for unclosed marker"),
            };
            if let Some(data) = self.dones.get_mut(done.0) {
                data.binder = right;
            }
        }
    }

    /// A view of the finished tree that allocates nothing but pooled leaf tokens.
    pub fn build_light_tree(&mut self) -> LightTree<'_, 't, K> {
        let root = self.prepare();
        LightTree::new(self, root)
    }

    /// Compares the finished tree with the subtree of `tree` rooted at `old_root`, which is expected
    /// to cover the same text before an edit, and returns the edits that turn the old subtree into
    /// the new one. Nodes that need to be inserted are already allocated in `tree`, detached.
    ///
    /// Apply the result with [`DiffLog::apply`], or drop it with [`DiffLog::discard`].
    pub fn merge(&mut self, tree: &mut SyntaxTree<K>, old_root: NodeId) -> Result<DiffLog, ReparseError> {
        if !tree.contains(old_root) {
            return Err(ReparseError::StaleNode(old_root));
        }
        let root = self.prepare();
        let limit = self.config.incremental_depth_limit;
        if self.depth > limit {
            return Err(ReparseError::TooDeep {
                depth: self.depth,
                limit,
            });
        }
        let log = DiffTree::new(self, tree, root).diff(old_root);
        debug!(edits = log.len(), "merged new parse");
        Ok(log)
    }

    /// Depth of the finished tree, counted in markers below the root.
    pub fn depth(&mut self) -> usize {
        self.prepare();
        self.depth
    }

    #[cfg(test)]
    pub(crate) fn production(&self) -> &[Production] {
        &self.production
    }
}

impl<K: Kind> fmt::Debug for Builder<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("lexemes", &self.lexemes.len())
            .field("current", &self.current)
            .field("production", &self.production.len())
            .field("prepared", &self.prepared)
            .finish()
    }
}
