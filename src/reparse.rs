//! Incremental reparsing of a region of a shared tree.

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{Builder, Config, Kind, Lexer, NodeId, ReparseError, SyntaxTree};

/// How [`reparse`] updated the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reparsed {
    /// The new parse was merged into the old subtree with `edits` edits. Unchanged nodes kept their
    /// ids.
    Incremental { edits: usize },
    /// The old subtree was replaced by a completely new one.
    Rebuilt,
}

/// Parses `text`, the new text of the region covered by `target`, and updates `target` in `tree`.
///
/// The grammar runs without holding the lock. Merging and applying the result happen under the
/// write lock, so readers see either the old or the new tree. If the merge is not possible, the
/// new parse is built in full and replaces `target`, and the reason is logged as a warning. An error
/// is only returned if `target` is no longer part of `tree`.
pub fn reparse<K, L, P>(
    tree: &RwLock<SyntaxTree<K>>,
    target: NodeId,
    text: &str,
    lexer: &mut L,
    config: Config<K>,
    parse: P,
) -> Result<Reparsed, ReparseError>
where
    K: Kind,
    L: Lexer<Kind = K> + ?Sized,
    P: FnOnce(&mut Builder<'_, K>),
{
    let mut builder = Builder::new(text, lexer, config);
    parse(&mut builder);

    let mut tree = tree.write();
    let merged = match builder.merge(&mut *tree, target) {
        Ok(log) => log.apply(&mut *tree),
        Err(err) => Err(err),
    };
    match merged {
        Ok(edits) => {
            debug!(edits, "reparsed incrementally");
            Ok(Reparsed::Incremental { edits })
        }
        Err(err) => {
            if !tree.contains(target) {
                return Err(err);
            }
            warn!(%err, "incremental reparse failed, rebuilding the subtree");
            let node = builder.build_tree(&mut *tree);
            tree.replace(target, node)?;
            Ok(Reparsed::Rebuilt)
        }
    }
}
