//! `marktree` builds concrete syntax trees from a token stream under the control of a hand-written
//! grammar, and can merge the result of reparsing a region into an existing tree.
//!
//! The grammar drives a [`Builder`]: it looks at the current significant token, advances over it,
//! and brackets ranges of tokens with [`Marker`]s. Markers are cheap handles into a flat production
//! list, so the grammar can decide what a node is only after it has seen its contents
//! ([`precede`](Builder::precede), [`done_before`](Builder::done_before)), or backtrack
//! ([`rollback_to`](Builder::rollback_to)). Whitespace and comments are skipped by the cursor and
//! attached to nodes only when the tree is laid out, according to per-edge [binders](EdgeBinder).
//!
//! A finished parse can be turned into
//! - a [`SyntaxTree`], or any other tree through a [`NodeFactory`] ([`Builder::build_tree`]),
//! - a [`LightTree`] that materializes nothing but leaves, on demand ([`Builder::build_light_tree`]),
//! - a [`DiffLog`] of edits against an older tree for the same text ([`Builder::merge`]). Applying the
//!   edits keeps every node that did not change, which [`reparse`] does for a tree shared behind a
//!   lock.
//!
//! Misusing markers (closing them out of order, using a dropped marker, leaving tokens out of the
//! tree) is a bug in the grammar and panics with a message describing the problem. Source text
//! never does: syntax errors are recorded as error nodes.
#![forbid(
    // missing_debug_implementations,
    unconditional_recursion,
    future_incompatible,
    // missing_docs,
)]
#![deny(unsafe_code)]

mod binder;
mod builder;
mod config;
mod diff;
mod error;
mod kind;
mod lexemes;
mod lexer;
mod light;
mod pool;
mod reparse;
#[cfg(feature = "serde1")]
mod serde_impls;
mod tree;

// Reexport types for working with strings.
pub use text_size::{TextLen, TextRange, TextSize};

pub use crate::{
    binder::{EdgeBinder, LeadingComments, TokenTexts, WhitespaceBinder},
    builder::{Builder, CustomComparator, ErrorItem, Marker, MarkerState},
    config::Config,
    diff::{DiffLog, Edit, ThreeState},
    error::ReparseError,
    kind::{Kind, KindSet, LeafCategory},
    lexer::Lexer,
    light::{LightNode, LightToken, LightTree},
    reparse::{reparse, Reparsed},
    tree::{Checkpoint, NodeFactory, NodeId, NodeKind, Preorder, SyntaxTree, TreeBuilder, WalkEvent},
};
