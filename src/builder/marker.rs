use std::{backtrace::Backtrace, cell::Cell, fmt};

use crate::{pool::RawId, EdgeBinder};

/// An open position in the tree under construction, returned by [`Builder::mark`](crate::Builder::mark).
///
/// Markers are plain handles. Once a marker is dropped or rolled back, its handle goes stale and
/// any further use of it is reported as a misuse of the builder.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker(pub(crate) RawId);

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marker({:?})", self.0)
    }
}

/// A free-standing error recorded with [`Builder::error`](crate::Builder::error).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorItem(pub(crate) RawId);

impl fmt::Debug for ErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorItem({:?})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct DoneId(pub(crate) RawId);

/// Life cycle of a [`Marker`]. A dropped or rolled back marker has no state, its handle is stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MarkerState {
    Open,
    Done,
    /// Closed, and materialized as a single leaf.
    Collapsed,
}

/// One entry of the production list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Production {
    Start(Marker),
    Done(DoneId),
    Error(ErrorItem),
}

pub(crate) struct StartData<K> {
    /// `None` while open, and for markers closed as errors.
    pub(crate) kind:        Option<K>,
    pub(crate) lexeme:      usize,
    pub(crate) state:       MarkerState,
    pub(crate) done:        Option<DoneId>,
    pub(crate) binder:      EdgeBinder<K>,
    pub(crate) parent:      Option<Marker>,
    pub(crate) next:        Option<Production>,
    pub(crate) first_child: Option<Production>,
    pub(crate) last_child:  Option<Production>,
    pub(crate) hc:          Cell<Option<u32>>,
    pub(crate) created_at:  Option<Backtrace>,
}

impl<K> StartData<K> {
    pub(crate) fn new(lexeme: usize, created_at: Option<Backtrace>) -> Self {
        Self {
            kind: None,
            lexeme,
            state: MarkerState::Open,
            done: None,
            binder: EdgeBinder::Leading,
            parent: None,
            next: None,
            first_child: None,
            last_child: None,
            hc: Cell::new(None),
            created_at,
        }
    }
}

pub(crate) struct DoneData<K> {
    pub(crate) start:   Marker,
    pub(crate) lexeme:  usize,
    pub(crate) binder:  EdgeBinder<K>,
    /// Set if the marker was closed as an error node.
    pub(crate) message: Option<String>,
}

pub(crate) struct ErrorData {
    pub(crate) lexeme:  usize,
    pub(crate) message: String,
    pub(crate) parent:  Option<Marker>,
    pub(crate) next:    Option<Production>,
}
