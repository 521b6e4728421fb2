//! Serialization and Deserialization for syntax trees.
//!
//! A tree is written as the flat list of events of a preorder walk from its root and read back
//! through a [`TreeBuilder`]. Node ids are not preserved.

use crate::{Kind, NodeKind, SyntaxTree, TreeBuilder, WalkEvent};
use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Serialize,
};
use std::{fmt, marker::PhantomData};

#[derive(Deserialize, Serialize)]
#[serde(tag = "t", content = "c")]
enum Event<'text, K> {
    EnterNode(K),
    EnterError(#[serde(borrow)] Option<&'text str>),
    Token(K, &'text str),
    LeaveNode,
}

impl<K> Serialize for SyntaxTree<K>
where
    K: Kind + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let events = self
            .root()
            .into_iter()
            .flat_map(|root| self.preorder(root))
            .filter_map(|event| match event {
                WalkEvent::Enter(node) => Some(match self.node_kind(node) {
                    NodeKind::Composite(kind) => Event::EnterNode(kind),
                    NodeKind::Leaf(kind) => Event::Token(kind, self.leaf_text(node).unwrap_or_default()),
                    NodeKind::Error => Event::EnterError(self.error_message(node)),
                }),
                WalkEvent::Leave(node) if self.is_leaf(node) => None,
                WalkEvent::Leave(_) => Some(Event::LeaveNode),
            });

        serializer.collect_seq(events)
    }
}

impl<'de, K> Deserialize<'de> for SyntaxTree<K>
where
    K: Kind + Deserialize<'de>,
{
    fn deserialize<DE>(deserializer: DE) -> Result<Self, DE::Error>
    where
        DE: serde::Deserializer<'de>,
    {
        struct EventVisitor<K> {
            _marker: PhantomData<SyntaxTree<K>>,
        }

        impl<'de, K> Visitor<'de> for EventVisitor<K>
        where
            K: Kind + Deserialize<'de>,
        {
            type Value = SyntaxTree<K>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a list of tree events")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut builder = TreeBuilder::new();
                let mut depth = 0usize;
                let mut roots = 0usize;

                while let Some(next) = seq.next_element::<Event<'_, K>>()? {
                    match next {
                        Event::EnterNode(kind) => {
                            if depth == 0 {
                                roots += 1;
                            }
                            depth += 1;
                            builder.start_node(kind);
                        }
                        Event::EnterError(message) => {
                            if depth == 0 {
                                roots += 1;
                            }
                            depth += 1;
                            builder.start_error(message);
                        }
                        Event::Token(kind, text) => {
                            if depth == 0 {
                                return Err(de::Error::custom("token outside of any node"));
                            }
                            builder.token(kind, text);
                        }
                        Event::LeaveNode => {
                            if depth == 0 {
                                return Err(de::Error::custom("unbalanced `LeaveNode` event"));
                            }
                            depth -= 1;
                            builder.finish_node();
                        }
                    }
                }

                match (roots, depth) {
                    (0, 0) => Ok(SyntaxTree::new()),
                    (1, 0) => Ok(builder.finish()),
                    (_, 0) => Err(de::Error::custom("more than one root node")),
                    _ => Err(de::Error::custom("unfinished nodes at the end of the events")),
                }
            }
        }

        deserializer.deserialize_seq(EventVisitor { _marker: PhantomData })
    }
}
