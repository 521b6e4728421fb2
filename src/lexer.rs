use text_size::TextSize;

use crate::Kind;

/// A lexer that the builder runs once, eagerly, over the whole text.
///
/// After [`start`](Lexer::start), the builder reads the current lexeme and calls
/// [`advance`](Lexer::advance) until [`current_kind`](Lexer::current_kind) returns `None`. Offsets
/// must be non-decreasing and every lexeme must end where the next one starts.
pub trait Lexer {
    type Kind: Kind;

    /// Resets the lexer to the beginning of `text`.
    fn start(&mut self, text: &str);

    /// The kind of the current lexeme, or `None` at the end of input.
    fn current_kind(&self) -> Option<Self::Kind>;

    fn current_start(&self) -> TextSize;

    fn current_end(&self) -> TextSize;

    fn advance(&mut self);
}

impl<L: Lexer + ?Sized> Lexer for &mut L {
    type Kind = L::Kind;

    fn start(&mut self, text: &str) {
        (**self).start(text)
    }

    fn current_kind(&self) -> Option<Self::Kind> {
        (**self).current_kind()
    }

    fn current_start(&self) -> TextSize {
        (**self).current_start()
    }

    fn current_end(&self) -> TextSize {
        (**self).current_end()
    }

    fn advance(&mut self) {
        (**self).advance()
    }
}
