//! Syntax-tree values consumed by the analysis core.
//!
//! The parser is an external collaborator: it hands the core a lowered
//! [`AstNode`] value tree plus the [`SourceText`] it was parsed from. The
//! lowering from a live `tree_sitter::Node` is provided by [`lower`]; tests
//! build trees directly through the builder methods, which keeps the core
//! free of any grammar crate.
//!
//! Node kinds are the closed tag set of the V grammar that the analysis
//! dispatches on. Anything outside the set lowers to [`NodeKind::Unknown`]
//! and is skipped by the walkers.

use std::str::FromStr;

use strum_macros::{Display, EnumString};

/// A row/column position in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(p: tree_sitter::Point) -> Self {
        Self {
            row: p.row,
            column: p.column,
        }
    }
}

/// A byte span plus its row/column endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Range {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Range {
    /// Range with byte endpoints only; points default to row 0.
    pub fn bytes(start_byte: usize, end_byte: usize) -> Self {
        Self {
            start_byte,
            end_byte,
            ..Self::default()
        }
    }

    /// Full constructor used by tests that care about rows.
    pub fn new(start_byte: usize, end_byte: usize, start_point: Point, end_point: Point) -> Self {
        Self {
            start_byte,
            end_byte,
            start_point,
            end_point,
        }
    }

    /// Byte-span containment, inclusive on both ends.
    pub fn contains_byte(&self, byte: usize) -> bool {
        self.start_byte <= byte && byte <= self.end_byte
    }
}

impl From<tree_sitter::Range> for Range {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start_byte: r.start_byte,
            end_byte: r.end_byte,
            start_point: r.start_point.into(),
            end_point: r.end_point.into(),
        }
    }
}

/// Kinds of syntax nodes the analysis dispatches on.
///
/// Serialized names match the grammar's `type_name` strings, so lowering is a
/// straight `from_str` with an [`NodeKind::Unknown`] fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Unknown,

    // Structure
    SourceFile,
    ModuleClause,
    ImportDeclaration,
    ImportPath,
    ImportAlias,
    Block,

    // Declarations
    ConstDeclaration,
    ConstSpec,
    GlobalVarDeclaration,
    GlobalVarSpec,
    FunctionDeclaration,
    Receiver,
    ParameterList,
    ParameterDeclaration,
    StructDeclaration,
    StructFieldDeclaration,
    EmbeddedDefinition,
    EnumDeclaration,
    EnumFieldDefinition,
    InterfaceDeclaration,
    InterfaceMethodDefinition,
    TypeDeclaration,
    SumTypeList,
    ShortVarDeclaration,
    AssignmentStatement,
    ReturnStatement,

    // Expressions
    Identifier,
    TypeIdentifier,
    FieldIdentifier,
    ModuleIdentifier,
    SelectorExpression,
    IndexExpression,
    SliceExpression,
    CallExpression,
    ArgumentList,
    OrBlock,
    UnaryExpression,
    BinaryExpression,
    ParenthesizedExpression,
    IfExpression,
    MatchExpression,
    TypeInitializer,
    FnLiteral,

    // Literals
    IntLiteral,
    FloatLiteral,
    InterpretedStringLiteral,
    RawStringLiteral,
    CStringLiteral,
    RuneLiteral,
    True,
    False,
    None,

    // Types
    PointerType,
    ArrayType,
    FixedArrayType,
    MapType,
    ChannelType,
    OptionType,
    ResultType,
    VariadicType,
    MultiReturnType,
    GenericType,
    FunctionType,
    QualifiedType,
    BuiltinType,
}

impl NodeKind {
    /// Parse a grammar kind string, mapping anything unrecognized to
    /// [`NodeKind::Unknown`].
    pub fn from_grammar(kind: &str) -> Self {
        NodeKind::from_str(kind).unwrap_or(NodeKind::Unknown)
    }

    /// Kinds that denote a type expression.
    pub fn is_type_node(self) -> bool {
        matches!(
            self,
            NodeKind::PointerType
                | NodeKind::ArrayType
                | NodeKind::FixedArrayType
                | NodeKind::MapType
                | NodeKind::ChannelType
                | NodeKind::OptionType
                | NodeKind::ResultType
                | NodeKind::VariadicType
                | NodeKind::MultiReturnType
                | NodeKind::GenericType
                | NodeKind::FunctionType
                | NodeKind::QualifiedType
                | NodeKind::TypeIdentifier
                | NodeKind::BuiltinType
        )
    }
}

/// The source a tree was parsed from.
///
/// Node ranges index into this text; the core never touches the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText {
    text: String,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Slice by byte span, clamped to the text bounds.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.text.len());
        let start = start.min(end);
        &self.text[start..end]
    }
}

impl From<&str> for SourceText {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One lowered syntax node.
///
/// Children keep their grammar field labels so `child_by_field_name` works
/// the same way against lowered trees and test-built trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstNode {
    kind: NodeKind,
    range: Range,
    named: bool,
    field: Option<String>,
    children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: NodeKind, range: Range) -> Self {
        Self {
            kind,
            range,
            named: true,
            field: None,
            children: Vec::new(),
        }
    }

    /// Builder: attach a child under a grammar field label.
    pub fn with_field(mut self, field: &str, mut child: AstNode) -> Self {
        child.field = Some(field.to_string());
        self.children.push(child);
        self
    }

    /// Builder: attach an unlabeled named child.
    pub fn with_child(mut self, child: AstNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: attach an anonymous (unnamed) token child, e.g. an operator.
    pub fn with_token(mut self, kind: NodeKind, range: Range) -> Self {
        self.children.push(AstNode {
            kind,
            range,
            named: false,
            field: None,
            children: Vec::new(),
        });
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn start_byte(&self) -> usize {
        self.range.start_byte
    }

    pub fn end_byte(&self) -> usize {
        self.range.end_byte
    }

    pub fn is_named(&self) -> bool {
        self.named
    }

    /// The grammar field label this node occupies in its parent, if any.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// All children, named and anonymous, in source order.
    pub fn children(&self) -> &[AstNode] {
        &self.children
    }

    /// Iterate the named children only.
    pub fn named_children(&self) -> impl Iterator<Item = &AstNode> {
        self.children.iter().filter(|c| c.named)
    }

    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    pub fn named_child(&self, index: usize) -> Option<&AstNode> {
        self.named_children().nth(index)
    }

    pub fn child_by_field_name(&self, field: &str) -> Option<&AstNode> {
        self.children
            .iter()
            .find(|c| c.field.as_deref() == Some(field))
    }

    /// First named child of the given kind.
    pub fn child_of_kind(&self, kind: NodeKind) -> Option<&AstNode> {
        self.named_children().find(|c| c.kind == kind)
    }

    /// The text this node spans.
    pub fn text<'a>(&self, src: &'a SourceText) -> &'a str {
        src.slice(self.range.start_byte, self.range.end_byte)
    }
}

/// Lower a `tree_sitter` node (usually the tree root) into an owned
/// [`AstNode`] tree.
///
/// Kind strings are mapped through [`NodeKind::from_grammar`]; field labels
/// and named flags are copied as tree-sitter reports them.
pub fn lower(node: tree_sitter::Node<'_>) -> AstNode {
    let mut lowered = AstNode {
        kind: NodeKind::from_grammar(node.kind()),
        range: node.range().into(),
        named: node.is_named(),
        field: None,
        children: Vec::with_capacity(node.child_count()),
    };
    for i in 0..node.child_count() {
        let Some(child) = node.child(i) else { continue };
        let mut lowered_child = lower(child);
        lowered_child.field = node
            .field_name_for_child(i as u32)
            .map(|name| name.to_string());
        lowered.children.push(lowered_child);
    }
    lowered
}
