//! Domain entities: the document model shared by parser, merge engine and serializer

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::domain::number::Decimal;

/// Identifies the file a node or define was read from.
///
/// Cheap to clone; every node of a file shares one allocation.
pub type SourceId = Arc<Path>;

/// Comparison operator of a keyed numeric statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonOperator {
    #[default]
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    Neq,
}

impl ComparisonOperator {
    /// Longest symbols first, so `<=` is never read as `<` followed by `=`.
    pub const BY_SYMBOL_LENGTH: [ComparisonOperator; 6] = [
        ComparisonOperator::Lte,
        ComparisonOperator::Gte,
        ComparisonOperator::Neq,
        ComparisonOperator::Eq,
        ComparisonOperator::Lt,
        ComparisonOperator::Gt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Neq => "<>",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::BY_SYMBOL_LENGTH
            .into_iter()
            .find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Payload of a node. Exactly one case per node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `name <op> 1.5`, or a bare number inside a block.
    Number { op: ComparisonOperator, value: Decimal },
    /// `name = token`, or a bare token inside a block. Quotes stay part of the token.
    Text(String),
    /// `name = { ... }`, or an anonymous `{ ... }`.
    Block(Vec<Node>),
}

/// A statement of a script file.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// `None` for anonymous list members such as the `1` in `{ 1 2 3 }`.
    pub name: Option<String>,
    pub value: Value,
    /// File this node was parsed from; consulted by the merge engine only.
    pub source: SourceId,
}

impl Node {
    pub fn number(
        name: Option<String>,
        op: ComparisonOperator,
        value: Decimal,
        source: SourceId,
    ) -> Self {
        Self {
            name,
            value: Value::Number { op, value },
            source,
        }
    }

    pub fn text(name: Option<String>, value: impl Into<String>, source: SourceId) -> Self {
        Self {
            name,
            value: Value::Text(value.into()),
            source,
        }
    }

    pub fn block(name: Option<String>, children: Vec<Node>, source: SourceId) -> Self {
        Self {
            name,
            value: Value::Block(children),
            source,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_block(&self) -> bool {
        matches!(self.value, Value::Block(_))
    }

    pub fn children(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Block(children) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.value {
            Value::Block(children) => Some(children),
            _ => None,
        }
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children()?
            .iter()
            .find(|child| child.name() == Some(name))
    }

    /// Directory of the originating file; empty for bare file names.
    pub fn source_dir(&self) -> &Path {
        source_dir(&self.source)
    }
}

/// Directory component of a source path; empty when there is none.
pub fn source_dir(source: &Path) -> &Path {
    source.parent().unwrap_or_else(|| Path::new(""))
}

/// Root-level `@name = number` constant.
///
/// Collected for reporting only; values referencing a define are never substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Define {
    pub name: String,
    pub value: Decimal,
    pub source: SourceId,
}

/// Root nodes plus defines, in the order they were read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forest {
    pub roots: Vec<Node>,
    pub defines: Vec<Define>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another forest after this one, keeping both orders.
    pub fn extend(&mut self, other: Forest) {
        self.roots.extend(other.roots);
        self.defines.extend(other.defines);
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.defines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn src(path: &str) -> SourceId {
        Arc::from(Path::new(path))
    }

    #[rstest]
    #[case(ComparisonOperator::Eq, "=")]
    #[case(ComparisonOperator::Lt, "<")]
    #[case(ComparisonOperator::Gt, ">")]
    #[case(ComparisonOperator::Lte, "<=")]
    #[case(ComparisonOperator::Gte, ">=")]
    #[case(ComparisonOperator::Neq, "<>")]
    fn given_operator_when_mapped_to_symbol_then_roundtrips(
        #[case] op: ComparisonOperator,
        #[case] symbol: &str,
    ) {
        assert_eq!(op.symbol(), symbol);
        assert_eq!(ComparisonOperator::from_symbol(symbol), Some(op));
    }

    #[test]
    fn given_unknown_symbol_when_mapped_then_none() {
        assert_eq!(ComparisonOperator::from_symbol("=="), None);
        assert_eq!(ComparisonOperator::from_symbol(""), None);
    }

    #[test]
    fn given_block_when_querying_children_then_finds_by_name() {
        let s = src("common/a.txt");
        let node = Node::block(
            Some("a".into()),
            vec![
                Node::number(Some("x".into()), ComparisonOperator::Eq, 1.into(), s.clone()),
                Node::text(None, "yes", s.clone()),
            ],
            s,
        );

        assert!(node.is_block());
        assert_eq!(node.children().map(<[Node]>::len), Some(2));
        assert!(node.child("x").is_some());
        assert!(node.child("missing").is_none());
        assert_eq!(node.source_dir(), Path::new("common"));
    }

    #[test]
    fn given_leaf_when_querying_children_then_none() {
        let node = Node::text(Some("a".into()), "b", src("a.txt"));
        assert!(!node.is_block());
        assert!(node.children().is_none());
        assert_eq!(node.source_dir(), Path::new(""));
    }

    #[test]
    fn given_two_forests_when_extended_then_order_is_kept() {
        let mut first = Forest::new();
        first
            .roots
            .push(Node::block(Some("a".into()), vec![], src("d/1.txt")));
        let mut second = Forest::new();
        second
            .roots
            .push(Node::block(Some("b".into()), vec![], src("d/2.txt")));
        second.defines.push(Define {
            name: "cost".into(),
            value: 10.into(),
            source: src("d/2.txt"),
        });

        first.extend(second);

        let names: Vec<_> = first.roots.iter().filter_map(Node::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(first.defines.len(), 1);
        assert!(!first.is_empty());
    }
}
