#![cfg(feature = "serde1")]

mod common;

use common::{build, debug, SyntaxKind};
use marktree::SyntaxTree;

#[test]
fn events_of_a_small_tree() {
    let tree = build("a+b");
    let json = serde_json::to_string(&tree).unwrap();
    assert_eq!(
        json,
        concat!(
            r#"[{"t":"EnterNode","c":"Root"},"#,
            r#"{"t":"EnterNode","c":"Add"},"#,
            r#"{"t":"Token","c":["Ident","a"]},"#,
            r#"{"t":"Token","c":["Plus","+"]},"#,
            r#"{"t":"Token","c":["Ident","b"]},"#,
            r#"{"t":"LeaveNode"},"#,
            r#"{"t":"LeaveNode"}]"#,
        )
    );
}

#[test]
fn errors_are_serialized_with_their_message() {
    let tree = build("a +");
    let json = serde_json::to_string(&tree).unwrap();
    assert!(json.contains(r#"{"t":"EnterError","c":"expected operand"},{"t":"LeaveNode"}"#));
}

#[test]
fn round_trip() {
    let texts = ["(a + b) * {c d}", "a + ) # trailing", "  ((x)", ""];
    for text in texts.iter() {
        let tree = build(text);
        let json = serde_json::to_string(&tree).unwrap();
        let deserialized: SyntaxTree<SyntaxKind> = serde_json::from_str(&json).unwrap();
        assert_eq!(debug(&deserialized), debug(&tree));
        let root = deserialized.root().unwrap();
        assert_eq!(deserialized.hc(root), tree.hc(tree.root().unwrap()));
    }
}

#[test]
fn empty_tree() {
    let tree = SyntaxTree::<SyntaxKind>::new();
    let json = serde_json::to_string(&tree).unwrap();
    assert_eq!(json, "[]");
    let deserialized: SyntaxTree<SyntaxKind> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.root(), None);
}

#[test]
fn malformed_events() {
    let cases = [
        (r#"[{"t":"LeaveNode"}]"#, "unbalanced `LeaveNode` event"),
        (r#"[{"t":"Token","c":["Ident","a"]}]"#, "token outside of any node"),
        (
            r#"[{"t":"EnterNode","c":"Root"},{"t":"LeaveNode"},{"t":"EnterNode","c":"Root"},{"t":"LeaveNode"}]"#,
            "more than one root node",
        ),
        (r#"[{"t":"EnterNode","c":"Root"}]"#, "unfinished nodes at the end of the events"),
    ];
    for (json, message) in cases.iter() {
        let err = serde_json::from_str::<SyntaxTree<SyntaxKind>>(json).unwrap_err();
        assert!(err.to_string().contains(message), "{:?}: {}", json, err);
    }
}
