use crate::{Kind, KindSet};

/// Settings of a [`Builder`](crate::Builder).
///
/// # Examples
/// ```
/// use marktree::{Config, Kind, KindSet};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum SyntaxKind {
///     Whitespace,
///     Comment,
/// }
/// impl Kind for SyntaxKind {}
///
/// let config = Config::new(
///     KindSet::new(&[SyntaxKind::Whitespace]),
///     KindSet::new(&[SyntaxKind::Comment]),
/// )
/// .with_debug_mode(true)
/// .with_change_threshold(8);
/// assert!(config.debug_mode());
/// assert_eq!(config.marker_pool_capacity(), 2000);
/// ```
#[derive(Debug, Clone)]
pub struct Config<K> {
    pub(crate) whitespace:              KindSet<K>,
    pub(crate) comments:                KindSet<K>,
    pub(crate) debug_mode:              bool,
    pub(crate) marker_pool_capacity:    usize,
    pub(crate) token_pool_capacity:     usize,
    pub(crate) change_threshold:        usize,
    pub(crate) incremental_depth_limit: usize,
}

impl<K: Kind> Config<K> {
    pub fn new(whitespace: KindSet<K>, comments: KindSet<K>) -> Self {
        Self {
            whitespace,
            comments,
            debug_mode: cfg!(debug_assertions),
            marker_pool_capacity: 2000,
            token_pool_capacity: 1000,
            change_threshold: 20,
            incremental_depth_limit: 1000,
        }
    }

    /// Kinds skipped by the builder's cursor.
    pub fn whitespace(&self) -> &KindSet<K> {
        &self.whitespace
    }

    /// Kinds skipped like whitespace. Comments can be replaced later with
    /// [`Builder::enforce_comment_kinds`](crate::Builder::enforce_comment_kinds).
    pub fn comments(&self) -> &KindSet<K> {
        &self.comments
    }

    /// Whether closing markers checks the nesting discipline. Defaults to on in debug builds.
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// How many marker slots of each variant are kept once all markers of that variant were recycled.
    pub fn marker_pool_capacity(&self) -> usize {
        self.marker_pool_capacity
    }

    pub fn with_marker_pool_capacity(mut self, capacity: usize) -> Self {
        self.marker_pool_capacity = capacity;
        self
    }

    /// How many token slots a light tree keeps once all of its tokens were disposed.
    pub fn token_pool_capacity(&self) -> usize {
        self.token_pool_capacity
    }

    pub fn with_token_pool_capacity(mut self, capacity: usize) -> Self {
        self.token_pool_capacity = capacity;
        self
    }

    /// If the child counts of two matched nodes differ by more than this, the merge replaces the
    /// old node as a whole instead of diffing the children.
    pub fn change_threshold(&self) -> usize {
        self.change_threshold
    }

    pub fn with_change_threshold(mut self, threshold: usize) -> Self {
        self.change_threshold = threshold;
        self
    }

    /// New trees deeper than this are not merged into an old tree.
    pub fn incremental_depth_limit(&self) -> usize {
        self.incremental_depth_limit
    }

    pub fn with_incremental_depth_limit(mut self, limit: usize) -> Self {
        self.incremental_depth_limit = limit;
        self
    }
}
