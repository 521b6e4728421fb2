//! The lexeme cache: the whole token stream of a text, lexed up front.

use text_size::{TextRange, TextSize};
use tracing::{trace, warn};

use crate::{Kind, Lexer};

/// Token kinds and start offsets in two parallel arrays.
///
/// `starts` holds one entry more than `kinds`: the end sentinel at the text length, so that the end
/// of lexeme `i` is always `starts[i + 1]`.
#[derive(Debug)]
pub(crate) struct LexemeCache<K> {
    starts: Vec<TextSize>,
    kinds:  Vec<K>,
}

impl<K: Kind> LexemeCache<K> {
    /// Runs `lexer` over `text` and records every lexeme.
    pub(crate) fn lex<L>(text: &str, lexer: &mut L) -> Self
    where
        L: Lexer<Kind = K> + ?Sized,
    {
        let approx = std::cmp::max(10, text.len() / 5);
        let mut starts = Vec::with_capacity(approx);
        let mut kinds = Vec::with_capacity(approx);

        lexer.start(text);
        while let Some(kind) = lexer.current_kind() {
            let start = lexer.current_start();
            if let Some(&last) = starts.last() {
                if start < last {
                    warn!(?kind, ?start, previous = ?last, "Token sequence broken");
                }
            }
            if kinds.len() == kinds.capacity() {
                // grow by half of the current size rather than doubling
                let extra = std::cmp::max(1, kinds.len() / 2);
                kinds.reserve_exact(extra);
                starts.reserve_exact(extra + 1);
            }
            starts.push(start);
            kinds.push(kind);
            lexer.advance();
        }
        starts.push(TextSize::from(text.len() as u32));
        trace!(lexemes = kinds.len(), "lexed text");

        Self { starts, kinds }
    }

    /// Number of lexemes, not counting the end sentinel.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub(crate) fn kind(&self, index: usize) -> K {
        self.kinds[index]
    }

    #[inline]
    pub(crate) fn kinds(&self) -> &[K] {
        &self.kinds
    }

    /// Start offsets, followed by the end sentinel.
    #[inline]
    pub(crate) fn starts(&self) -> &[TextSize] {
        &self.starts
    }

    /// Start of lexeme `index`. `index == len()` yields the text length.
    #[inline]
    pub(crate) fn start(&self, index: usize) -> TextSize {
        self.starts[index]
    }

    #[inline]
    pub(crate) fn end(&self, index: usize) -> TextSize {
        self.starts[index + 1]
    }

    #[inline]
    pub(crate) fn range(&self, index: usize) -> TextRange {
        TextRange::new(self.start(index), self.end(index))
    }

    /// Re-tags lexeme `index`. Offsets never change.
    #[inline]
    pub(crate) fn remap(&mut self, index: usize, kind: K) {
        self.kinds[index] = kind;
    }

    /// Text offset of lexeme boundary `index`, clamped to the end sentinel.
    #[inline]
    pub(crate) fn boundary(&self, index: usize) -> TextSize {
        self.starts[std::cmp::min(index, self.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum K {
        Word,
        Space,
    }
    impl Kind for K {}

    struct Words {
        tokens: Vec<(K, TextSize, TextSize)>,
        pos:    usize,
    }

    impl Lexer for Words {
        type Kind = K;

        fn start(&mut self, text: &str) {
            self.tokens.clear();
            self.pos = 0;
            let mut offset = 0;
            for (i, part) in text.split(' ').enumerate() {
                if i > 0 {
                    self.tokens.push((K::Space, (offset as u32).into(), (offset as u32 + 1).into()));
                    offset += 1;
                }
                if !part.is_empty() {
                    let end = offset + part.len();
                    self.tokens.push((K::Word, (offset as u32).into(), (end as u32).into()));
                    offset = end;
                }
            }
        }

        fn current_kind(&self) -> Option<K> {
            self.tokens.get(self.pos).map(|t| t.0)
        }

        fn current_start(&self) -> TextSize {
            self.tokens[self.pos].1
        }

        fn current_end(&self) -> TextSize {
            self.tokens[self.pos].2
        }

        fn advance(&mut self) {
            self.pos += 1;
        }
    }

    #[test]
    fn caches_all_lexemes_with_end_sentinel() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod";
        let mut lexer = Words {
            tokens: Vec::new(),
            pos:    0,
        };
        let cache = LexemeCache::lex(text, &mut lexer);
        assert_eq!(cache.len(), 21);
        assert_eq!(cache.start(cache.len()), TextSize::of(text));
        assert_eq!(cache.kind(0), K::Word);
        assert_eq!(cache.range(2), TextRange::new(6.into(), 11.into()));
        assert_eq!(&text[cache.range(2)], "ipsum");
        for i in 0..cache.len() {
            assert_eq!(cache.end(i), cache.start(i + 1));
        }
    }

    #[test]
    fn remap_keeps_offsets() {
        let mut lexer = Words {
            tokens: Vec::new(),
            pos:    0,
        };
        let mut cache = LexemeCache::lex("a b", &mut lexer);
        let range = cache.range(1);
        cache.remap(1, K::Word);
        assert_eq!(cache.kind(1), K::Word);
        assert_eq!(cache.range(1), range);
        assert_eq!(cache.boundary(100), TextSize::from(3));
    }
}
