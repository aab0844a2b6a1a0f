use miette::SourceSpan;
use num_bigint::BigInt;

/// Byte offsets of a node in the source text. Both ends are offsets of
/// characters, so `start <= end`. Nodes read from JSON carry the default span.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The span as a miette label, covering `start..=end`.
    pub fn source_span(&self) -> SourceSpan {
        (self.start, self.end - self.start + 1).into()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AnnotationKind {
    /// `:name`
    TypeAnnotation,
    /// `@name`
    VariableAnnotation,
    /// `%name`
    FieldAnnotation,
}

impl AnnotationKind {
    /// Classifies an annotation by its first character.
    pub fn from_annotation(value: &str) -> Option<Self> {
        match value.chars().next()? {
            ':' => Some(AnnotationKind::TypeAnnotation),
            '@' => Some(AnnotationKind::VariableAnnotation),
            '%' => Some(AnnotationKind::FieldAnnotation),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Annotation {
    pub position: Position,
    pub kind: AnnotationKind,
    /// The full annotation, prefix included: `%amount`.
    pub value: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Prim {
    pub position: Position,
    pub prim: String,
    pub annotations: Vec<Annotation>,
    pub arguments: Vec<Node>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Node {
    /// Hex text including the `0x` prefix.
    Bytes { position: Position, value: String },
    Int { position: Position, value: BigInt },
    String { position: Position, value: String },
    Prim(Prim),
    Sequence {
        position: Position,
        elements: Vec<Node>,
    },
}

impl Node {
    pub fn position(&self) -> Position {
        match self {
            Node::Bytes { position, .. }
            | Node::Int { position, .. }
            | Node::String { position, .. }
            | Node::Sequence { position, .. } => *position,
            Node::Prim(prim) => prim.position,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Bytes { .. } => "bytes",
            Node::Int { .. } => "int",
            Node::String { .. } => "string",
            Node::Prim(_) => "prim",
            Node::Sequence { .. } => "sequence",
        }
    }

    /// Compares two trees, ignoring every position.
    pub fn structurally_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Bytes { value: a, .. }, Node::Bytes { value: b, .. }) => a == b,
            (Node::Int { value: a, .. }, Node::Int { value: b, .. }) => a == b,
            (Node::String { value: a, .. }, Node::String { value: b, .. }) => a == b,
            (Node::Prim(a), Node::Prim(b)) => {
                a.prim == b.prim
                    && a.annotations.len() == b.annotations.len()
                    && a
                        .annotations
                        .iter()
                        .zip(&b.annotations)
                        .all(|(x, y)| x.kind == y.kind && x.value == y.value)
                    && all_structurally_eq(&a.arguments, &b.arguments)
            }
            (Node::Sequence { elements: a, .. }, Node::Sequence { elements: b, .. }) => {
                all_structurally_eq(a, b)
            }
            _ => false,
        }
    }
}

fn all_structurally_eq(a: &[Node], b: &[Node]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_eq(y))
}
