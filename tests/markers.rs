mod common;

use common::{builder, config, debug, SyntaxKind, SyntaxKind::*, TestLexer};
use marktree::{Builder, EdgeBinder, KindSet, LeadingComments, MarkerState, TokenTexts, WhitespaceBinder};

#[test]
fn done_before() {
    let mut builder = builder("a b");
    let root = builder.mark();
    let first = builder.mark();
    assert_eq!(builder.current_kind(), Some(Ident));
    builder.advance();
    let second = builder.mark();
    assert_eq!(builder.current_kind(), Some(Ident));
    builder.advance();
    builder.done_before(first, Literal, second);
    builder.done(second, Literal);
    assert!(builder.eof());
    builder.done(root, Root);

    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r#"Root@0..3
  Literal@0..1
    Ident@0..1 "a"
  Whitespace@1..2 " "
  Literal@2..3
    Ident@2..3 "b"
"#
    );
}

#[test]
fn done_before_with_error() {
    let mut builder = builder("a b");
    let root = builder.mark();
    let first = builder.mark();
    builder.current_kind();
    builder.advance();
    let second = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done_before_with_error(first, Literal, second, "missing semicolon");
    builder.done(second, Literal);
    builder.eof();
    builder.done(root, Root);

    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r#"Root@0..3
  Literal@0..1
    Ident@0..1 "a"
    Error@1..1 "missing semicolon"
  Whitespace@1..2 " "
  Literal@2..3
    Ident@2..3 "b"
"#
    );
}

#[test]
fn error_before() {
    let mut builder = builder("a b");
    let root = builder.mark();
    let first = builder.mark();
    builder.current_kind();
    builder.advance();
    let second = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.error_before(first, "bad", second);
    builder.done(second, Literal);
    builder.eof();
    builder.done(root, Root);

    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r#"Root@0..3
  Error@0..1 "bad"
    Ident@0..1 "a"
  Whitespace@1..2 " "
  Literal@2..3
    Ident@2..3 "b"
"#
    );
}

#[test]
fn rollback_forgets_speculative_parse() {
    let mut builder = builder("a b");
    let root = builder.mark();
    let attempt = builder.mark();
    builder.current_kind();
    builder.advance();
    let inner = builder.mark();
    builder.error("not what we hoped for");
    builder.drop(inner);
    assert!(builder.has_errors_after(attempt));
    builder.rollback_to(attempt);

    assert_eq!(builder.marker_state(attempt), None);
    assert_eq!(builder.raw_token_index(), 0);
    assert_eq!(builder.current_kind(), Some(Ident));
    assert!(!builder.has_errors_after(root));

    while !builder.eof() {
        builder.advance();
    }
    builder.done(root, Root);
    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r#"Root@0..3
  Ident@0..1 "a"
  Whitespace@1..2 " "
  Ident@2..3 "b"
"#
    );
}

#[test]
fn marker_queries() {
    let mut builder = builder("a");
    let root = builder.mark();
    let m = builder.mark();
    assert_eq!(builder.marker_state(m), Some(MarkerState::Open));
    assert_eq!(builder.marker_kind(m), None);
    assert_eq!(builder.latest_done_marker(), None);

    builder.current_kind();
    builder.advance();
    builder.done(m, Literal);
    assert_eq!(builder.marker_state(m), Some(MarkerState::Done));
    assert_eq!(builder.marker_kind(m), Some(Literal));
    assert_eq!(builder.latest_done_marker(), Some(m));

    builder.remap_marker_kind(m, Paren);
    assert_eq!(builder.marker_kind(m), Some(Paren));

    let outer = builder.precede(m);
    builder.collapse(outer, Block);
    assert_eq!(builder.marker_state(outer), Some(MarkerState::Collapsed));
    assert_eq!(builder.latest_done_marker(), Some(outer));
    assert!(!builder.has_errors_after(root));

    builder.done(root, Root);
    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r#"Root@0..1
  Block@0..1 "a"
"#
    );
}

#[test]
fn error_markers_count_as_errors() {
    let mut builder = builder("a");
    let root = builder.mark();
    let m = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.error_marker(m, "oops");
    assert!(builder.has_errors_after(root));
    assert_eq!(builder.marker_kind(m), None);
    builder.done(root, Root);
}

fn doc_comment_tree(text: &str) -> String {
    let mut builder = builder(text);
    let root = builder.mark();
    builder.current_kind();
    builder.advance();
    let m = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(m, Literal);
    builder.set_edge_binders(
        m,
        Some(EdgeBinder::custom(LeadingComments::new(KindSet::new(&[Comment])))),
        None,
    );
    assert!(builder.eof());
    builder.done(root, Root);
    debug(&builder.finish())
}

#[test]
fn leading_comments_binder() {
    assert_eq!(
        doc_comment_tree("a\n# doc\nb"),
        r##"Root@0..9
  Ident@0..1 "a"
  Whitespace@1..2 "\n"
  Literal@2..9
    Comment@2..7 "# doc"
    Whitespace@7..8 "\n"
    Ident@8..9 "b"
"##
    );
    assert_eq!(
        doc_comment_tree("a\n# doc\n\nb"),
        r##"Root@0..10
  Ident@0..1 "a"
  Whitespace@1..2 "\n"
  Comment@2..7 "# doc"
  Whitespace@7..9 "\n\n"
  Literal@9..10
    Ident@9..10 "b"
"##
    );
}

#[test]
fn trailing_binder_on_the_right_edge() {
    let mut builder = builder("a # c\n");
    let root = builder.mark();
    let m = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.eof();
    builder.done(m, Literal);
    builder.set_edge_binders(m, None, Some(EdgeBinder::Leading));
    builder.done(root, Root);
    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r##"Root@0..6
  Literal@0..6
    Ident@0..1 "a"
    Whitespace@1..2 " "
    Comment@2..5 "# c"
    Whitespace@5..6 "\n"
"##
    );
}

#[test]
#[should_panic = "Marker already done."]
fn done_twice() {
    let mut builder = builder("a");
    let m = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(m, Root);
    builder.done(m, Root);
}

#[test]
#[should_panic = "Another not done marker added after this one. Must be done before this."]
fn done_out_of_order() {
    let mut builder = builder("a");
    let _root = builder.mark();
    let outer = builder.mark();
    let _inner = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(outer, Literal);
}

#[test]
#[should_panic = "Unbalanced tree"]
fn unbalanced_without_debug_mode() {
    let mut builder = Builder::new("a", &mut TestLexer::new(), config().with_debug_mode(false));
    let root = builder.mark();
    let _open = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(root, Root);
    builder.finish();
}

#[test]
#[should_panic = "was dropped or rolled back and can no longer be used"]
fn dropped_marker_cannot_be_done() {
    let mut builder = builder("a");
    let _root = builder.mark();
    let m = builder.mark();
    builder.drop(m);
    builder.done(m, Literal);
}

#[test]
#[should_panic = "The marker must be added before it is dropped."]
fn dropped_marker_cannot_be_dropped() {
    let mut builder = builder("a");
    let m = builder.mark();
    builder.drop(m);
    builder.drop(m);
}

#[test]
#[should_panic = "The marker must be added before rolled back to."]
fn dropped_marker_cannot_be_rolled_back_to() {
    let mut builder = builder("a");
    let m = builder.mark();
    builder.drop(m);
    builder.rollback_to(m);
}

#[test]
#[should_panic = "Cannot precede dropped or rolled-back marker"]
fn rolled_back_marker_cannot_be_preceded() {
    let mut builder = builder("a");
    let _root = builder.mark();
    let m = builder.mark();
    builder.rollback_to(m);
    builder.precede(m);
}

#[test]
#[should_panic = "'Before' marker precedes this one."]
fn done_before_an_earlier_marker() {
    let mut builder = builder("a b");
    let _root = builder.mark();
    let first = builder.mark();
    builder.current_kind();
    builder.advance();
    let second = builder.mark();
    builder.done_before(second, Literal, first);
}

#[test]
#[should_panic = "Cannot set right-edge processor for unclosed marker"]
fn right_binder_on_open_marker() {
    let mut builder = builder("a");
    let m = builder.mark();
    builder.set_edge_binders(m, None, Some(EdgeBinder::Leading));
}

#[test]
#[should_panic = "were not inserted into the tree"]
fn tokens_left_behind() {
    let mut builder = builder("a b");
    let root = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(root, Root);
    builder.finish();
}

#[test]
#[should_panic = "Parser produced no markers"]
fn no_markers() {
    let builder = builder("a");
    builder.finish();
}

#[test]
#[should_panic = "The tree was already built, the production list can no longer change"]
fn frozen_after_build() {
    let mut builder = builder("a");
    let root = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(root, Root);
    assert_eq!(builder.depth(), 0);
    builder.mark();
}

/// Puts the edge before the whole run, and takes earlier edges at the same spot along.
struct WholeRun;

impl WhitespaceBinder<SyntaxKind> for WholeRun {
    fn edge_position(&self, _kinds: &[SyntaxKind], _at_stream_edge: bool, _texts: TokenTexts<'_>) -> usize {
        0
    }

    fn is_recursive(&self) -> bool {
        true
    }
}

#[test]
fn recursive_binder_moves_enclosing_start() {
    let mut builder = builder("a # c\nb");
    let root = builder.mark();
    builder.current_kind();
    builder.advance();
    let outer = builder.mark();
    let inner = builder.mark();
    builder.current_kind();
    builder.advance();
    builder.done(inner, Literal);
    builder.done(outer, Paren);
    builder.set_edge_binders(inner, Some(EdgeBinder::custom(WholeRun)), None);
    assert!(builder.eof());
    builder.done(root, Root);

    let tree = builder.finish();
    assert_eq!(
        debug(&tree),
        r##"Root@0..7
  Ident@0..1 "a"
  Paren@1..7
    Literal@1..7
      Whitespace@1..2 " "
      Comment@2..5 "# c"
      Whitespace@5..6 "\n"
      Ident@6..7 "b"
"##
    );
}
