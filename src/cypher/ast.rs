//! Cypher AST (Abstract Syntax Tree)
//!
//! These types represent Cypher statements. They are pure data: every node
//! owns its children, equality is structural, and nothing here knows how to
//! render or analyse itself. Construction goes through [`super::builder`] or
//! [`super::bridge`]; rendering through [`super::render`]; schema analysis
//! through [`crate::catalog`].

use smallvec::SmallVec;

use crate::model::{SymbolicName, Token};

/// A complete Cypher statement: clauses in the order they were added.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub clauses: Vec<Clause>,
}

/// One clause of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `[OPTIONAL] MATCH pattern, ... [WHERE ...]`
    Match(MatchClause),
    /// `WITH ...` (projection that can also filter)
    With(WithClause),
    /// `RETURN ...`
    Return(Projection),
    /// `CALL { ... }`: nested statement with its own variable scope
    CallSubquery(Box<Statement>),
    /// `CALL db.labels() YIELD label`
    CallProcedure(ProcedureCall),
    Create(CreateClause),
    Merge(MergeClause),
    Delete(DeleteClause),
    Set(SetClause),
    Remove(RemoveClause),
}

impl Clause {
    /// Keyword-level name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Clause::Match(m) if m.optional => "OPTIONAL MATCH",
            Clause::Match(_) => "MATCH",
            Clause::With(_) => "WITH",
            Clause::Return(_) => "RETURN",
            Clause::CallSubquery(_) => "CALL {}",
            Clause::CallProcedure(_) => "CALL",
            Clause::Create(_) => "CREATE",
            Clause::Merge(_) => "MERGE",
            Clause::Delete(_) => "DELETE",
            Clause::Set(_) => "SET",
            Clause::Remove(_) => "REMOVE",
        }
    }
}

/// MATCH clause with patterns and optional WHERE.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub optional: bool,
    pub patterns: Vec<Pattern>,
    pub where_clause: Option<Expr>,
}

/// Projection body shared by WITH and RETURN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
    pub order_by: Vec<OrderExpr>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
}

/// WITH clause (pipeline boundary).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithClause {
    pub projection: Projection,
    pub where_clause: Option<Expr>,
}

/// Single item in RETURN / WITH.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: Expr,
    pub alias: Option<SymbolicName>,
}

/// ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderExpr {
    pub expr: Expr,
    pub ascending: bool,
}

/// Standalone or in-query procedure call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    /// Dotted name split into its segments: `db.labels` is `["db", "labels"]`.
    pub name: Vec<String>,
    pub args: Vec<Expr>,
    pub yields: Vec<SymbolicName>,
}

// ============================================================================
// Patterns
// ============================================================================

/// A path pattern: `p = (a:Person)-[:KNOWS]->(b:Person)`.
///
/// Elements alternate node, relationship, node, ... and start and end with a
/// node. The builder layer guarantees that shape; trees coming from an
/// external bridge are checked when they are traversed.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub variable: Option<SymbolicName>,
    pub elements: Vec<PatternElement>,
}

/// Element of a pattern: a node or a relationship.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Node(NodePattern),
    Relationship(RelPattern),
}

/// How multiple labels on one node pattern combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelJoin {
    /// `:A:B`
    #[default]
    All,
    /// `:A|B`
    Any,
}

/// Node pattern: `(alias:Label1:Label2 {prop: value})`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<SymbolicName>,
    pub labels: SmallVec<[Token; 2]>,
    pub label_join: LabelJoin,
    pub properties: Option<MapExpr>,
}

/// Relationship pattern: `-[alias:TYPE1|TYPE2 *min..max {props}]->`
#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub variable: Option<SymbolicName>,
    /// Alternatives; `[:A|B]` matches either type.
    pub types: SmallVec<[Token; 2]>,
    pub direction: PatternDirection,
    pub properties: Option<MapExpr>,
    pub length: Option<VarLength>,
}

/// Pattern direction, read left to right as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternDirection {
    /// `->`
    Outgoing,
    /// `<-`
    Incoming,
    /// `-`
    Undirected,
}

/// Variable-length path specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

// ============================================================================
// Expressions
// ============================================================================

/// Expression in Cypher.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Variable reference: `n`, `r`, `p`
    Variable(SymbolicName),
    /// Parameter: `$name` or `$0`
    Parameter(Parameter),
    /// Property access: `n.name`
    Property { expr: Box<Expr>, key: String },
    /// Function call: `count(n)`, `id(n)`, `labels(n)`
    FunctionCall { name: String, args: Vec<Expr>, distinct: bool },
    /// Binary operation: `a + b`, `a = b`, `a STARTS WITH b`
    BinaryOp { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },
    /// N-ary boolean chain: `a AND b AND c`
    Compound { op: LogicalOp, operands: Vec<Expr> },
    /// Unary operation: `NOT a`, `-a`, `a IS NULL`
    UnaryOp { op: UnaryOp, expr: Box<Expr> },
    /// Binary operator supplied by the caller; its precedence comes from
    /// the render configuration.
    Custom { symbol: String, left: Box<Expr>, right: Box<Expr> },
    /// List: `[1, 2, 3]`
    List(Vec<Expr>),
    /// Map: `{name: 'Ada', age: 3}`
    Map(MapExpr),
    /// CASE expression
    Case { operand: Option<Box<Expr>>, whens: Vec<(Expr, Expr)>, else_expr: Option<Box<Expr>> },
    /// `EXISTS { (n)-->(m) WHERE ... }`
    Exists(Box<ExistsSubquery>),
    /// Label check: `n:Person:Actor`
    HasLabels { expr: Box<Expr>, labels: Vec<Token> },
    /// Wildcard: `*` (in `RETURN *`, `count(*)`)
    Star,
}

/// Body of an existential subquery.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsSubquery {
    pub patterns: Vec<Pattern>,
    pub where_clause: Option<Expr>,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Not-a-number. Kept apart from `Float` so that equal trees compare equal.
    NaN,
    String(String),
}

impl Literal {
    /// Float literal; `NaN` maps to [`Literal::NaN`].
    pub fn float(value: f64) -> Self {
        if value.is_nan() { Literal::NaN } else { Literal::Float(value) }
    }
}

impl From<bool> for Literal { fn from(v: bool) -> Self { Literal::Bool(v) } }
impl From<i32> for Literal { fn from(v: i32) -> Self { Literal::Int(v as i64) } }
impl From<i64> for Literal { fn from(v: i64) -> Self { Literal::Int(v) } }
impl From<f64> for Literal { fn from(v: f64) -> Self { Literal::float(v) } }
impl From<String> for Literal { fn from(v: String) -> Self { Literal::String(v) } }
impl From<&str> for Literal { fn from(v: &str) -> Self { Literal::String(v.to_owned()) } }

impl From<Literal> for Expr { fn from(v: Literal) -> Self { Expr::Literal(v) } }
impl From<bool> for Expr { fn from(v: bool) -> Self { Expr::Literal(v.into()) } }
impl From<i32> for Expr { fn from(v: i32) -> Self { Expr::Literal(v.into()) } }
impl From<i64> for Expr { fn from(v: i64) -> Self { Expr::Literal(v.into()) } }
impl From<f64> for Expr { fn from(v: f64) -> Self { Expr::Literal(v.into()) } }
impl From<String> for Expr { fn from(v: String) -> Self { Expr::Literal(v.into()) } }
impl From<&str> for Expr { fn from(v: &str) -> Self { Expr::Literal(v.into()) } }

/// Parameter placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    Named(String),
    Positional(usize),
}

/// Insertion-ordered map literal. Re-inserting a key replaces the value in
/// place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapExpr {
    entries: Vec<(String, Expr)>,
}

impl MapExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Expr) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add, Sub, Mul, Div, Mod, Pow,
    // Comparison
    Eq, Neq, Lt, Lte, Gt, Gte,
    // Logical
    And, Or, Xor,
    // String and list predicates
    RegexMatch, StartsWith, EndsWith, Contains, In,
}

/// Operators of n-ary boolean chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

impl LogicalOp {
    /// The equivalent binary operator.
    pub fn as_binary(self) -> BinaryOp {
        match self {
            LogicalOp::And => BinaryOp::And,
            LogicalOp::Or => BinaryOp::Or,
            LogicalOp::Xor => BinaryOp::Xor,
        }
    }
}

/// Unary operators. `IsNull` and `IsNotNull` are postfix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

// ============================================================================
// Write clauses
// ============================================================================

/// CREATE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateClause {
    pub patterns: Vec<Pattern>,
}

/// MERGE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    pub pattern: Pattern,
    pub on_create: Vec<SetItem>,
    pub on_match: Vec<SetItem>,
}

/// Which MERGE action following SET items belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    OnCreate,
    OnMatch,
}

/// DELETE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub exprs: Vec<Expr>,
    pub detach: bool,
}

/// SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub items: Vec<SetItem>,
}

/// Single SET item.
#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    /// SET n.prop = expr
    Property { variable: SymbolicName, key: String, value: Expr },
    /// SET n = {map}
    AllProperties { variable: SymbolicName, value: Expr },
    /// SET n += {map}
    MergeProperties { variable: SymbolicName, value: Expr },
    /// SET n:Label
    Labels { variable: SymbolicName, labels: Vec<Token> },
}

/// REMOVE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveClause {
    pub items: Vec<RemoveItem>,
}

/// Single REMOVE item.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    /// REMOVE n.prop
    Property { variable: SymbolicName, key: String },
    /// REMOVE n:Label
    Labels { variable: SymbolicName, labels: Vec<Token> },
}
