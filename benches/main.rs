use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use marktree::*;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SyntaxKind {
    Word,
    Newline,
    Space,
    Line,
    Root,
}
impl Kind for SyntaxKind {}

/// Splits text into words, single spaces and newlines.
#[derive(Default)]
pub struct WordLexer {
    tokens: Vec<(SyntaxKind, TextRange)>,
    pos:    usize,
}

impl Lexer for WordLexer {
    type Kind = SyntaxKind;

    fn start(&mut self, text: &str) {
        self.tokens.clear();
        self.pos = 0;
        let mut start = 0;
        for (i, c) in text.char_indices() {
            let kind = match c {
                ' ' => SyntaxKind::Space,
                '\n' => SyntaxKind::Newline,
                _ => continue,
            };
            if start < i {
                self.tokens.push((SyntaxKind::Word, range(start, i)));
            }
            self.tokens.push((kind, range(i, i + 1)));
            start = i + 1;
        }
        if start < text.len() {
            self.tokens.push((SyntaxKind::Word, range(start, text.len())));
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

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new((start as u32).into(), (end as u32).into())
}

fn config() -> Config<SyntaxKind> {
    Config::new(KindSet::new(&[SyntaxKind::Space]), KindSet::empty()).with_debug_mode(false)
}

/// One `Line` node per line of words.
pub fn parse(builder: &mut Builder<'_, SyntaxKind>) {
    let root = builder.mark();
    while !builder.eof() {
        let line = builder.mark();
        while let Some(kind) = builder.current_kind() {
            builder.advance();
            if kind == SyntaxKind::Newline {
                break;
            }
        }
        builder.done(line, SyntaxKind::Line);
    }
    builder.done(root, SyntaxKind::Root);
}

fn text(lines: usize, marker: &str) -> String {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str("lorem ipsum dolor sit amet ");
        text.push_str(if i == lines / 2 { marker } else { "consectetur" });
        text.push('\n');
    }
    text
}

fn build(text: &str) -> SyntaxTree<SyntaxKind> {
    let mut builder = Builder::new(text, &mut WordLexer::default(), config());
    parse(&mut builder);
    builder.finish()
}

pub fn create(c: &mut Criterion) {
    let mut group = c.benchmark_group("builder");
    group.throughput(Throughput::Elements(1));

    let old = text(1_000, "consectetur");
    let new = text(1_000, "adipiscing");

    group.bench_function("build tree", |b| b.iter(|| build(&old)));

    group.bench_function("light tree", |b| {
        b.iter(|| {
            let mut builder = Builder::new(&old, &mut WordLexer::default(), config());
            parse(&mut builder);
            let mut light = builder.build_light_tree();
            let mut children = Vec::new();
            light.children(light.root(), &mut children)
        })
    });

    group.bench_function("merge one changed word", |b| {
        b.iter_batched(
            || build(&old),
            |mut tree| {
                let root = tree.root().unwrap();
                let mut builder = Builder::new(&new, &mut WordLexer::default(), config());
                parse(&mut builder);
                let log = builder.merge(&mut tree, root).unwrap();
                assert_eq!(log.apply(&mut tree), Ok(1));
                tree
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, create);
criterion_main!(benches);
