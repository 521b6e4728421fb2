use thiserror::Error;

use crate::NodeId;

/// Why a new parse could not be merged into an existing tree.
///
/// None of these are fatal: the caller can always fall back to building the new tree in full and
/// swapping it in, which is what [`reparse`](crate::reparse) does.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReparseError {
    #[error("node {0:?} is no longer part of the tree")]
    StaleNode(NodeId),
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {0:?} is still attached to a parent")]
    NotDetached(NodeId),
    #[error("node {0:?} is a leaf and cannot have children")]
    LeafParent(NodeId),
    #[error("cannot insert at position {position} of {parent:?}, which has {len} children")]
    PositionOutOfBounds { parent: NodeId, position: usize, len: usize },
    #[error("the new tree is {depth} levels deep, more than the incremental limit of {limit}")]
    TooDeep { depth: usize, limit: usize },
}
