#![allow(unused)]

use marktree::{Builder, Config, Kind, KindSet, LeafCategory, Lexer, SyntaxTree, TextRange, TextSize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum SyntaxKind {
    Ident = 0,
    Number,
    Plus,
    Star,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Whitespace,
    Comment,
    Error,
    Keyword,

    // composites
    Root,
    Add,
    Mul,
    Paren,
    Block,
    Literal,
    /// Not left-bound: empty nodes of this kind stay right of whitespace.
    Empty,
    /// Empty lexemes of this kind still become leaves.
    Indent,
    /// Compared by text only when merging.
    Lazy,
    Embedded,
}
use SyntaxKind::*;

impl Kind for SyntaxKind {
    fn is_left_bound(self) -> bool {
        self != Empty
    }

    fn is_zero_width_leaf(self) -> bool {
        self == Indent
    }

    fn leaf_category(self) -> LeafCategory {
        match self {
            Lazy => LeafCategory::LazyParseable,
            Embedded => LeafCategory::CustomParsed,
            _ => LeafCategory::Ordinary,
        }
    }

    fn static_text(self) -> Option<&'static str> {
        match self {
            Plus => Some("+"),
            Star => Some("*"),
            LParen => Some("("),
            RParen => Some(")"),
            LBrace => Some("{"),
            RBrace => Some("}"),
            _ => None,
        }
    }
}

const TOKENS: [SyntaxKind; 11] = [
    Ident, Number, Plus, Star, LParen, RParen, LBrace, RBrace, Whitespace, Comment, Error,
];

/// Lexes identifiers, numbers, `+`, `*`, parentheses, braces, whitespace and `#` line comments.
#[derive(Debug, Default)]
pub struct TestLexer {
    tokens: Vec<(SyntaxKind, TextRange)>,
    pos:    usize,
}

impl TestLexer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lexer for TestLexer {
    type Kind = SyntaxKind;

    fn start(&mut self, text: &str) {
        fn tok(t: SyntaxKind) -> m_lexer::TokenKind {
            m_lexer::TokenKind(t as u16)
        }
        fn kind(t: m_lexer::TokenKind) -> SyntaxKind {
            TOKENS[t.0 as usize]
        }

        let lexer = m_lexer::LexerBuilder::new()
            .error_token(tok(Error))
            .tokens(&[
                (tok(Ident), r"[a-zA-Z_][a-zA-Z0-9_]*"),
                (tok(Number), r"[0-9]+"),
                (tok(Plus), r"\+"),
                (tok(Star), r"\*"),
                (tok(LParen), r"\("),
                (tok(RParen), r"\)"),
                (tok(LBrace), r"\{"),
                (tok(RBrace), r"\}"),
                (tok(Whitespace), r"\s+"),
                (tok(Comment), r"#[^\n]*"),
            ])
            .build();

        self.tokens.clear();
        self.pos = 0;
        let mut offset = TextSize::from(0);
        for token in lexer.tokenize(text) {
            let len = TextSize::from(token.len as u32);
            self.tokens.push((kind(token.kind), TextRange::at(offset, len)));
            offset += len;
        }
    }

    fn current_kind(&self) -> Option<SyntaxKind> {
        self.tokens.get(self.pos).map(|(kind, _)| *kind)
    }

    fn current_start(&self) -> TextSize {
        self.tokens[self.pos].1.start()
    }

    fn current_end(&self) -> TextSize {
        self.tokens[self.pos].1.end()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Replays a fixed list of lexemes, which may be empty.
#[derive(Debug)]
pub struct ListLexer {
    tokens: Vec<(SyntaxKind, TextRange)>,
    pos:    usize,
}

impl ListLexer {
    pub fn new(lexemes: &[(SyntaxKind, &str)]) -> Self {
        let mut tokens = Vec::new();
        let mut offset = TextSize::from(0);
        for &(kind, text) in lexemes {
            let range = TextRange::at(offset, TextSize::of(text));
            tokens.push((kind, range));
            offset = range.end();
        }
        Self { tokens, pos: 0 }
    }
}

impl Lexer for ListLexer {
    type Kind = SyntaxKind;

    fn start(&mut self, _text: &str) {
        self.pos = 0;
    }

    fn current_kind(&self) -> Option<SyntaxKind> {
        self.tokens.get(self.pos).map(|(kind, _)| *kind)
    }

    fn current_start(&self) -> TextSize {
        self.tokens[self.pos].1.start()
    }

    fn current_end(&self) -> TextSize {
        self.tokens[self.pos].1.end()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

pub fn config() -> Config<SyntaxKind> {
    Config::new(KindSet::new(&[Whitespace]), KindSet::new(&[Comment])).with_debug_mode(true)
}

pub fn builder(text: &str) -> Builder<'_, SyntaxKind> {
    Builder::new(text, &mut TestLexer::new(), config())
}

/// Parses `text` and builds it into a new tree.
pub fn build(text: &str) -> SyntaxTree<SyntaxKind> {
    let mut builder = builder(text);
    parse(&mut builder);
    builder.finish()
}

pub fn debug(tree: &SyntaxTree<SyntaxKind>) -> String {
    tree.debug(tree.root().unwrap(), true)
}

/// Concatenated text of all leaves, in order.
pub fn leaf_text(tree: &SyntaxTree<SyntaxKind>) -> String {
    let root = tree.root().unwrap();
    tree.leaves(root).map(|leaf| tree.leaf_text(leaf).unwrap()).collect()
}

/// Grammar of sums of products:
///
/// ```text
/// root  := expr*
/// expr  := mul ('+' mul)*
/// mul   := atom ('*' atom)*
/// atom  := Ident | Number | '(' expr ')' | block
/// block := '{' ... '}'          (collapsed into one leaf)
/// ```
pub fn parse(builder: &mut Builder<'_, SyntaxKind>) {
    Parser { b: builder }.root();
}

struct Parser<'a, 't> {
    b: &'a mut Builder<'t, SyntaxKind>,
}

impl Parser<'_, '_> {
    fn at(&mut self, kind: SyntaxKind) -> bool {
        self.b.current_kind() == Some(kind)
    }

    fn root(&mut self) {
        let root = self.b.mark();
        while !self.b.eof() {
            if !self.expr() {
                let m = self.b.mark();
                self.b.advance();
                self.b.error_marker(m, "unexpected token");
            }
        }
        self.b.done(root, Root);
    }

    fn expr(&mut self) -> bool {
        let mut m = self.b.mark();
        if !self.mul() {
            self.b.drop(m);
            return false;
        }
        while self.at(Plus) {
            self.b.advance();
            if !self.mul() {
                self.b.error("expected operand");
            }
            self.b.done(m, Add);
            m = self.b.precede(m);
        }
        self.b.drop(m);
        true
    }

    fn mul(&mut self) -> bool {
        let mut m = self.b.mark();
        if !self.atom() {
            self.b.drop(m);
            return false;
        }
        while self.at(Star) {
            self.b.advance();
            if !self.atom() {
                self.b.error("expected operand");
            }
            self.b.done(m, Mul);
            m = self.b.precede(m);
        }
        self.b.drop(m);
        true
    }

    fn atom(&mut self) -> bool {
        match self.b.current_kind() {
            Some(Ident) | Some(Number) | Some(Keyword) => {
                self.b.advance();
                true
            }
            Some(LParen) => {
                let m = self.b.mark();
                self.b.advance();
                if !self.expr() {
                    self.b.error("expected expression");
                }
                if self.at(RParen) {
                    self.b.advance();
                } else {
                    self.b.error("expected `)`");
                }
                self.b.done(m, Paren);
                true
            }
            Some(LBrace) => {
                let m = self.b.mark();
                self.b.advance();
                let mut depth = 1;
                while let Some(kind) = self.b.current_kind() {
                    self.b.advance();
                    match kind {
                        LBrace => depth += 1,
                        RBrace => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                }
                self.b.collapse(m, Block);
                true
            }
            _ => false,
        }
    }
}
