use tracing::debug;

use super::{fatal, Builder, Marker, Production, UNBALANCED_MESSAGE};
use crate::{binder::TokenTexts, EdgeBinder, Kind};

impl<'t, K: Kind> Builder<'t, K> {
    /// Finishes the production list: places all edges among whitespace and comments and links every
    /// marker and error to its parent and siblings. Returns the root marker.
    ///
    /// Runs only once; the production list is frozen afterwards.
    pub(crate) fn prepare(&mut self) -> Marker {
        let root = match self.production.first() {
            Some(&Production::Start(root)) => root,
            Some(_) => fatal(UNBALANCED_MESSAGE),
            None => fatal(format_args!("Parser produced no markers. Text:\n{}", self.text)),
        };
        if self.prepared {
            return root;
        }

        self.kind_checked = true;
        self.balance_white_spaces();

        self.reset_links(Production::Start(root));
        let mut current = Some(root);
        let mut last_error = None;
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for i in 1..self.production.len() {
            let item = self.production[i];
            let parent = match current {
                Some(parent) => parent,
                None => fatal("Unexpected end of the production"),
            };
            match item {
                Production::Start(marker) => {
                    self.reset_links(item);
                    self.add_child(parent, item);
                    current = Some(marker);
                    depth += 1;
                    max_depth = std::cmp::max(depth, max_depth);
                }
                Production::Done(done) => {
                    if self.done_data(done).start != parent {
                        fatal(UNBALANCED_MESSAGE);
                    }
                    current = self.start_data(parent).parent;
                    depth = depth.saturating_sub(1);
                }
                Production::Error(error) => {
                    let lexeme = self.error_data(error).lexeme;
                    if last_error == Some(lexeme) {
                        continue;
                    }
                    last_error = Some(lexeme);
                    self.reset_links(item);
                    self.add_child(parent, item);
                }
            }
        }

        let count = self.lexemes.len();
        if self.current < count {
            let missed = &self.lexemes.kinds()[self.current..];
            fatal(format_args!(
                "Tokens {:?} were not inserted into the tree. Text:\n{}",
                missed, self.text
            ));
        }
        let root_end = self.done_lexeme(root);
        if root_end < count {
            let missed = &self.lexemes.kinds()[root_end..];
            fatal(format_args!(
                "Tokens {:?} are outside of root element {:?}. Text:\n{}",
                missed,
                self.start_data(root).kind,
                self.text
            ));
        }
        if current.is_some() {
            fatal(UNBALANCED_MESSAGE);
        }

        self.depth = max_depth;
        self.prepared = true;
        self.cached_kind = None;
        debug!(markers = self.starts.len(), depth = max_depth, "prepared production list");
        root
    }

    fn reset_links(&mut self, item: Production) {
        match item {
            Production::Start(marker) => {
                let data = self.start_data_mut(marker);
                data.parent = None;
                data.next = None;
                data.first_child = None;
                data.last_child = None;
                data.hc.set(None);
            }
            Production::Error(error) => {
                if let Some(data) = self.errors.get_mut(error.0) {
                    data.parent = None;
                    data.next = None;
                }
            }
            Production::Done(_) => {}
        }
    }

    fn add_child(&mut self, parent: Marker, child: Production) {
        let last = self.start_data(parent).last_child;
        match last {
            Some(Production::Start(prev)) => self.start_data_mut(prev).next = Some(child),
            Some(Production::Error(prev)) => {
                if let Some(data) = self.errors.get_mut(prev.0) {
                    data.next = Some(child);
                }
            }
            _ => self.start_data_mut(parent).first_child = Some(child),
        }
        self.start_data_mut(parent).last_child = Some(child);
        match child {
            Production::Start(marker) => self.start_data_mut(marker).parent = Some(parent),
            Production::Error(error) => {
                if let Some(data) = self.errors.get_mut(error.0) {
                    data.parent = Some(parent);
                }
            }
            Production::Done(_) => {}
        }
    }

    /// Moves every edge next to a run of whitespace and comments to where its binder puts it.
    ///
    /// The root and its done marker are left alone: the root always spans the whole text.
    fn balance_white_spaces(&mut self) {
        let count = self.lexemes.len();
        let size = self.production.len();
        let mut last_index = 0;

        for i in 1..size.saturating_sub(1) {
            let item = self.production[i];
            if let Production::Start(marker) = item {
                if self.start_data(marker).done.is_none() {
                    fatal(UNBALANCED_MESSAGE);
                }
            }

            let binder = self.binder_of(item);
            let recursive = binder.is_recursive();
            let lexeme = self.lexeme_of(item);
            let prev = if recursive { 0 } else { self.lexeme_of(self.production[i - 1]) };

            let mut ws_start = std::cmp::max(lexeme, last_index);
            while ws_start > prev && self.is_trivia(self.lexemes.kind(ws_start - 1)) {
                ws_start -= 1;
            }
            let mut ws_end = lexeme;
            while ws_end < count && self.is_trivia(self.lexemes.kind(ws_end)) {
                ws_end += 1;
            }

            if ws_start < ws_end {
                let kinds = &self.lexemes.kinds()[ws_start..ws_end];
                let texts = TokenTexts::new(self.text, &self.lexemes.starts()[ws_start..]);
                let at_edge = ws_start == 0 || ws_end == count;
                let position = std::cmp::min(binder.edge_position(kinds, at_edge, texts), kinds.len());
                let new_lexeme = ws_start + position;
                self.set_lexeme(item, new_lexeme);
                if recursive {
                    for k in (1..i).rev() {
                        let prev_item = self.production[k];
                        if self.lexeme_of(prev_item) >= new_lexeme {
                            self.set_lexeme(prev_item, new_lexeme);
                        } else {
                            break;
                        }
                    }
                }
            } else if lexeme < ws_start {
                self.set_lexeme(item, ws_start);
            }

            last_index = self.lexeme_of(item);
        }
    }

    fn binder_of(&self, item: Production) -> EdgeBinder<K> {
        match item {
            Production::Start(marker) => self.start_data(marker).binder.clone(),
            Production::Done(done) => self.done_data(done).binder.clone(),
            Production::Error(_) => EdgeBinder::Trailing,
        }
    }

    fn set_lexeme(&mut self, item: Production, lexeme: usize) {
        match item {
            Production::Start(marker) => self.start_data_mut(marker).lexeme = lexeme,
            Production::Done(done) => {
                if let Some(data) = self.dones.get_mut(done.0) {
                    data.lexeme = lexeme;
                }
            }
            Production::Error(error) => {
                if let Some(data) = self.errors.get_mut(error.0) {
                    data.lexeme = lexeme;
                }
            }
        }
    }
}
