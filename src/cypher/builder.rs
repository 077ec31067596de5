//! Fluent construction of Cypher ASTs.
//!
//! Every step takes its receiver by value and hands back a new node, so a
//! node that has been passed somewhere else can't be changed behind its
//! owner's back. Names are validated when they are supplied, not at render
//! time.
//!
//! ```rust
//! use cypher_dsl::cypher::builder::{node, StatementBuilder};
//! use cypher_dsl::Pattern;
//!
//! # fn example() -> cypher_dsl::Result<()> {
//! let n = node("Person")?.named("n")?;
//! let statement = StatementBuilder::new()
//!     .matching([Pattern::from(n.clone())])?
//!     .returning([n.property("name")?])?
//!     .build()?;
//! assert_eq!(statement.clauses.len(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::cell::Cell;

use tracing::debug;

use super::ast::*;
use crate::model::{SymbolicName, Token};
use crate::{Error, Result};

// ============================================================================
// Nodes
// ============================================================================

/// A node pattern with a single label: `(:Label)`.
pub fn node(label: impl Into<String>) -> Result<NodePattern> {
    NodePattern::default().with_label(label)
}

/// A node pattern without labels: `()`.
pub fn any_node() -> NodePattern {
    NodePattern::default()
}

impl NodePattern {
    pub fn named(mut self, name: impl Into<String>) -> Result<Self> {
        self.variable = Some(SymbolicName::new(name)?);
        Ok(self)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Result<Self> {
        self.labels.push(Token::label(label)?);
        Ok(self)
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        for label in labels {
            self.labels.push(Token::label(label)?);
        }
        Ok(self)
    }

    /// Read the labels as alternatives: `(:A|B)`.
    pub fn any_of_labels(mut self) -> Self {
        self.label_join = LabelJoin::Any;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Result<Self> {
        let key = property_key(key)?;
        self.properties.get_or_insert_with(MapExpr::new).insert(key, value.into());
        Ok(self)
    }

    pub fn with_properties(mut self, properties: MapExpr) -> Self {
        self.properties = Some(properties);
        self
    }

    /// The node's variable as an expression.
    pub fn as_expr(&self) -> Result<Expr> {
        self.variable
            .clone()
            .map(Expr::Variable)
            .ok_or_else(|| Error::NoSymbolicName("node pattern".into()))
    }

    /// `n.key` on this node's variable.
    pub fn property(&self, key: impl Into<String>) -> Result<Expr> {
        self.as_expr()?.property(key)
    }

    /// `(self)-[:TYPES]->(other)`
    pub fn relationship_to(
        self,
        other: NodePattern,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Pattern> {
        Ok(Pattern::new(self).then(RelPattern::outgoing(types)?, other))
    }

    /// `(self)<-[:TYPES]-(other)`
    pub fn relationship_from(
        self,
        other: NodePattern,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Pattern> {
        Ok(Pattern::new(self).then(RelPattern::incoming(types)?, other))
    }

    /// `(self)-[:TYPES]-(other)`
    pub fn relationship_between(
        self,
        other: NodePattern,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Pattern> {
        Ok(Pattern::new(self).then(RelPattern::undirected(types)?, other))
    }
}

// ============================================================================
// Relationships and paths
// ============================================================================

impl RelPattern {
    /// A relationship with an explicit direction and zero or more
    /// alternative types.
    pub fn new(
        direction: PatternDirection,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let types = types
            .into_iter()
            .map(Token::relationship_type)
            .collect::<Result<_>>()?;
        Ok(Self { variable: None, types, direction, properties: None, length: None })
    }

    pub fn outgoing(types: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        Self::new(PatternDirection::Outgoing, types)
    }

    pub fn incoming(types: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        Self::new(PatternDirection::Incoming, types)
    }

    pub fn undirected(types: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        Self::new(PatternDirection::Undirected, types)
    }

    pub fn named(mut self, name: impl Into<String>) -> Result<Self> {
        self.variable = Some(SymbolicName::new(name)?);
        Ok(self)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Result<Self> {
        let key = property_key(key)?;
        self.properties.get_or_insert_with(MapExpr::new).insert(key, value.into());
        Ok(self)
    }

    pub fn with_properties(mut self, properties: MapExpr) -> Self {
        self.properties = Some(properties);
        self
    }

    /// `*min..max`; `None` leaves a bound open.
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.length = Some(VarLength { min, max });
        self
    }

    pub fn as_expr(&self) -> Result<Expr> {
        self.variable
            .clone()
            .map(Expr::Variable)
            .ok_or_else(|| Error::NoSymbolicName("relationship pattern".into()))
    }

    pub fn property(&self, key: impl Into<String>) -> Result<Expr> {
        self.as_expr()?.property(key)
    }
}

impl Pattern {
    /// A path consisting of a single node.
    pub fn new(start: NodePattern) -> Self {
        Self { variable: None, elements: vec![PatternElement::Node(start)] }
    }

    /// Extend the path from its last node.
    pub fn then(mut self, relationship: RelPattern, node: NodePattern) -> Self {
        self.elements.push(PatternElement::Relationship(relationship));
        self.elements.push(PatternElement::Node(node));
        self
    }

    pub fn relationship_to(
        self,
        other: NodePattern,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        Ok(self.then(RelPattern::outgoing(types)?, other))
    }

    pub fn relationship_from(
        self,
        other: NodePattern,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        Ok(self.then(RelPattern::incoming(types)?, other))
    }

    pub fn relationship_between(
        self,
        other: NodePattern,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        Ok(self.then(RelPattern::undirected(types)?, other))
    }

    /// Name the whole path: `p = (a)-->(b)`.
    pub fn named(mut self, name: impl Into<String>) -> Result<Self> {
        self.variable = Some(SymbolicName::new(name)?);
        Ok(self)
    }
}

impl From<NodePattern> for Pattern {
    fn from(node: NodePattern) -> Self {
        Pattern::new(node)
    }
}

// ============================================================================
// Expressions
// ============================================================================

impl Expr {
    pub fn var(name: impl Into<String>) -> Result<Expr> {
        Ok(Expr::Variable(SymbolicName::new(name)?))
    }

    pub fn param(name: impl Into<String>) -> Result<Expr> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidIdentifier { kind: "parameter name".into(), value: name });
        }
        Ok(Expr::Parameter(Parameter::Named(name)))
    }

    pub fn positional_param(index: usize) -> Expr {
        Expr::Parameter(Parameter::Positional(index))
    }

    pub fn null() -> Expr {
        Expr::Literal(Literal::Null)
    }

    pub fn property(self, key: impl Into<String>) -> Result<Expr> {
        Ok(Expr::Property { expr: Box::new(self), key: property_key(key)? })
    }

    fn binary(self, op: BinaryOp, right: impl Into<Expr>) -> Expr {
        Expr::BinaryOp { left: Box::new(self), op, right: Box::new(right.into()) }
    }

    pub fn eq(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Eq, right) }
    pub fn neq(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Neq, right) }
    pub fn lt(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Lt, right) }
    pub fn lte(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Lte, right) }
    pub fn gt(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Gt, right) }
    pub fn gte(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Gte, right) }
    pub fn add(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Add, right) }
    pub fn sub(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Sub, right) }
    pub fn mul(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Mul, right) }
    pub fn div(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Div, right) }
    pub fn modulo(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Mod, right) }
    pub fn pow(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Pow, right) }
    pub fn matches(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::RegexMatch, right) }
    pub fn starts_with(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::StartsWith, right) }
    pub fn ends_with(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::EndsWith, right) }
    pub fn contains(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::Contains, right) }
    pub fn in_list(self, right: impl Into<Expr>) -> Expr { self.binary(BinaryOp::In, right) }

    fn chain(self, op: LogicalOp, right: Expr) -> Expr {
        match self {
            Expr::Compound { op: existing, mut operands } if existing == op => {
                operands.push(right);
                Expr::Compound { op, operands }
            }
            left => Expr::Compound { op, operands: vec![left, right] },
        }
    }

    /// `self AND right`; chains flatten into one compound.
    pub fn and(self, right: Expr) -> Expr { self.chain(LogicalOp::And, right) }
    pub fn or(self, right: Expr) -> Expr { self.chain(LogicalOp::Or, right) }
    pub fn xor(self, right: Expr) -> Expr { self.chain(LogicalOp::Xor, right) }

    /// Conjunction of all conditions. An empty input is `true`.
    pub fn all(conditions: impl IntoIterator<Item = Expr>) -> Expr {
        Self::compound(LogicalOp::And, conditions, true)
    }

    /// Disjunction of all conditions. An empty input is `false`.
    pub fn any(conditions: impl IntoIterator<Item = Expr>) -> Expr {
        Self::compound(LogicalOp::Or, conditions, false)
    }

    fn compound(op: LogicalOp, conditions: impl IntoIterator<Item = Expr>, identity: bool) -> Expr {
        let mut operands: Vec<Expr> = conditions.into_iter().collect();
        match operands.len() {
            0 => Expr::from(identity),
            1 => operands.remove(0),
            _ => Expr::Compound { op, operands },
        }
    }

    fn unary(self, op: UnaryOp) -> Expr {
        Expr::UnaryOp { op, expr: Box::new(self) }
    }

    pub fn not(self) -> Expr { self.unary(UnaryOp::Not) }
    pub fn negate(self) -> Expr { self.unary(UnaryOp::Negate) }
    pub fn is_null(self) -> Expr { self.unary(UnaryOp::IsNull) }
    pub fn is_not_null(self) -> Expr { self.unary(UnaryOp::IsNotNull) }

    /// `self:A:B`
    pub fn has_labels(self, labels: impl IntoIterator<Item = impl Into<String>>) -> Result<Expr> {
        let labels = labels.into_iter().map(Token::label).collect::<Result<Vec<_>>>()?;
        Ok(Expr::HasLabels { expr: Box::new(self), labels })
    }

    /// Apply a caller-defined binary operator. Rendering it needs an entry in
    /// [`super::render::RenderConfig::custom_operators`].
    pub fn custom(self, symbol: impl Into<String>, right: impl Into<Expr>) -> Result<Expr> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(Error::InvalidIdentifier { kind: "operator".into(), value: symbol });
        }
        Ok(Expr::Custom { symbol, left: Box::new(self), right: Box::new(right.into()) })
    }

    pub fn function(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Result<Expr> {
        Ok(Expr::FunctionCall { name: function_name(name)?, args: args.into_iter().collect(), distinct: false })
    }

    /// `name(DISTINCT args)`
    pub fn distinct_function(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Result<Expr> {
        Ok(Expr::FunctionCall { name: function_name(name)?, args: args.into_iter().collect(), distinct: true })
    }

    pub fn count(self) -> Expr {
        Expr::FunctionCall { name: "count".into(), args: vec![self], distinct: false }
    }

    pub fn count_star() -> Expr {
        Expr::FunctionCall { name: "count".into(), args: vec![Expr::Star], distinct: false }
    }

    pub fn list(items: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::List(items.into_iter().collect())
    }

    pub fn map(entries: impl IntoIterator<Item = (impl Into<String>, Expr)>) -> Result<Expr> {
        let mut map = MapExpr::new();
        for (key, value) in entries {
            map.insert(property_key(key)?, value);
        }
        Ok(Expr::Map(map))
    }

    /// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`
    pub fn case(
        operand: Option<Expr>,
        whens: impl IntoIterator<Item = (Expr, Expr)>,
        else_expr: Option<Expr>,
    ) -> Expr {
        Expr::Case {
            operand: operand.map(Box::new),
            whens: whens.into_iter().collect(),
            else_expr: else_expr.map(Box::new),
        }
    }

    /// `EXISTS { patterns [WHERE condition] }`
    pub fn exists(patterns: impl IntoIterator<Item = Pattern>, where_clause: Option<Expr>) -> Expr {
        Expr::Exists(Box::new(ExistsSubquery { patterns: patterns.into_iter().collect(), where_clause }))
    }

    pub fn alias(self, name: impl Into<String>) -> Result<ReturnItem> {
        Ok(ReturnItem { expr: self, alias: Some(SymbolicName::new(name)?) })
    }

    pub fn ascending(self) -> OrderExpr {
        OrderExpr { expr: self, ascending: true }
    }

    pub fn descending(self) -> OrderExpr {
        OrderExpr { expr: self, ascending: false }
    }
}

impl From<SymbolicName> for Expr {
    fn from(name: SymbolicName) -> Self {
        Expr::Variable(name)
    }
}

impl From<Expr> for ReturnItem {
    fn from(expr: Expr) -> Self {
        ReturnItem { expr, alias: None }
    }
}

impl From<Expr> for OrderExpr {
    fn from(expr: Expr) -> Self {
        expr.ascending()
    }
}

pub(crate) fn property_key(key: impl Into<String>) -> Result<String> {
    let key = key.into();
    if key.is_empty() {
        return Err(Error::InvalidIdentifier { kind: "property key".into(), value: key });
    }
    Ok(key)
}

pub(crate) fn function_name(name: impl Into<String>) -> Result<String> {
    let name = name.into();
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(Error::InvalidIdentifier { kind: "function name".into(), value: name });
    }
    Ok(name)
}

// ============================================================================
// Write items
// ============================================================================

impl SetItem {
    pub fn property(variable: impl Into<String>, key: impl Into<String>, value: impl Into<Expr>) -> Result<Self> {
        Ok(SetItem::Property {
            variable: SymbolicName::new(variable)?,
            key: property_key(key)?,
            value: value.into(),
        })
    }

    /// `SET n = value`
    pub fn all_properties(variable: impl Into<String>, value: Expr) -> Result<Self> {
        Ok(SetItem::AllProperties { variable: SymbolicName::new(variable)?, value })
    }

    /// `SET n += value`
    pub fn merge_properties(variable: impl Into<String>, value: Expr) -> Result<Self> {
        Ok(SetItem::MergeProperties { variable: SymbolicName::new(variable)?, value })
    }

    pub fn labels(variable: impl Into<String>, labels: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        Ok(SetItem::Labels {
            variable: SymbolicName::new(variable)?,
            labels: labels.into_iter().map(Token::label).collect::<Result<_>>()?,
        })
    }
}

impl RemoveItem {
    pub fn property(variable: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        Ok(RemoveItem::Property { variable: SymbolicName::new(variable)?, key: property_key(key)? })
    }

    pub fn labels(variable: impl Into<String>, labels: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        Ok(RemoveItem::Labels {
            variable: SymbolicName::new(variable)?,
            labels: labels.into_iter().map(Token::label).collect::<Result<_>>()?,
        })
    }
}

// ============================================================================
// Statements
// ============================================================================

/// Write-once assembly of a [`Statement`].
///
/// Each step consumes the builder and returns the next state. Once
/// [`StatementBuilder::build`] has been called, further steps fail with
/// [`Error::BuilderAlreadyFinalized`]. The builder is deliberately `!Sync`:
/// finalizing one from several threads is not supported.
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    clauses: Vec<Clause>,
    finalized: Cell<bool>,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.get()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized.get() {
            return Err(Error::BuilderAlreadyFinalized);
        }
        Ok(())
    }

    fn push(mut self, clause: Clause) -> Result<Self> {
        self.ensure_open()?;
        self.clauses.push(clause);
        Ok(self)
    }

    fn patterns(what: &str, patterns: impl IntoIterator<Item = Pattern>) -> Result<Vec<Pattern>> {
        let patterns: Vec<Pattern> = patterns.into_iter().collect();
        if patterns.is_empty() {
            return Err(Error::MisplacedClause(format!("{what} requires at least one pattern")));
        }
        Ok(patterns)
    }

    pub fn matching(self, patterns: impl IntoIterator<Item = Pattern>) -> Result<Self> {
        self.ensure_open()?;
        let patterns = Self::patterns("MATCH", patterns)?;
        self.push(Clause::Match(MatchClause { optional: false, patterns, where_clause: None }))
    }

    pub fn optional_matching(self, patterns: impl IntoIterator<Item = Pattern>) -> Result<Self> {
        self.ensure_open()?;
        let patterns = Self::patterns("OPTIONAL MATCH", patterns)?;
        self.push(Clause::Match(MatchClause { optional: true, patterns, where_clause: None }))
    }

    /// Attach a condition to the preceding MATCH or WITH. A second call is
    /// joined to the first with AND.
    pub fn where_(mut self, condition: Expr) -> Result<Self> {
        self.ensure_open()?;
        let slot = match self.clauses.last_mut() {
            Some(Clause::Match(m)) => &mut m.where_clause,
            Some(Clause::With(w)) => &mut w.where_clause,
            other => {
                let after = other.map_or("start of statement", |c| c.kind_name());
                return Err(Error::MisplacedClause(format!("WHERE after {after}")));
            }
        };
        *slot = Some(match slot.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        Ok(self)
    }

    fn projection(what: &str, items: impl IntoIterator<Item = impl Into<ReturnItem>>) -> Result<Projection> {
        let items: Vec<ReturnItem> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err(Error::MisplacedClause(format!("{what} requires at least one item")));
        }
        Ok(Projection { items, ..Default::default() })
    }

    pub fn with(self, items: impl IntoIterator<Item = impl Into<ReturnItem>>) -> Result<Self> {
        self.ensure_open()?;
        let projection = Self::projection("WITH", items)?;
        self.push(Clause::With(WithClause { projection, where_clause: None }))
    }

    pub fn returning(self, items: impl IntoIterator<Item = impl Into<ReturnItem>>) -> Result<Self> {
        self.ensure_open()?;
        let projection = Self::projection("RETURN", items)?;
        self.push(Clause::Return(projection))
    }

    fn last_projection(&mut self, what: &str) -> Result<&mut Projection> {
        self.ensure_open()?;
        match self.clauses.last_mut() {
            Some(Clause::With(w)) => Ok(&mut w.projection),
            Some(Clause::Return(r)) => Ok(r),
            other => {
                let after = other.map_or("start of statement", |c| c.kind_name());
                Err(Error::MisplacedClause(format!("{what} after {after}")))
            }
        }
    }

    /// Make the preceding WITH or RETURN distinct.
    pub fn distinct(mut self) -> Result<Self> {
        self.last_projection("DISTINCT")?.distinct = true;
        Ok(self)
    }

    pub fn order_by(mut self, items: impl IntoIterator<Item = impl Into<OrderExpr>>) -> Result<Self> {
        let projection = self.last_projection("ORDER BY")?;
        projection.order_by.extend(items.into_iter().map(Into::into));
        Ok(self)
    }

    pub fn skip(mut self, count: impl Into<Expr>) -> Result<Self> {
        self.last_projection("SKIP")?.skip = Some(count.into());
        Ok(self)
    }

    pub fn limit(mut self, count: impl Into<Expr>) -> Result<Self> {
        self.last_projection("LIMIT")?.limit = Some(count.into());
        Ok(self)
    }

    /// `CALL { statement }`
    pub fn call_subquery(self, statement: Statement) -> Result<Self> {
        self.push(Clause::CallSubquery(Box::new(statement)))
    }

    /// `CALL name(args) YIELD yields`
    pub fn call(
        self,
        name: impl Into<String>,
        args: impl IntoIterator<Item = Expr>,
        yields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let name = function_name(name)?;
        let call = ProcedureCall {
            name: name.split('.').map(str::to_owned).collect(),
            args: args.into_iter().collect(),
            yields: yields.into_iter().map(SymbolicName::new).collect::<Result<_>>()?,
        };
        self.push(Clause::CallProcedure(call))
    }

    pub fn create(self, patterns: impl IntoIterator<Item = Pattern>) -> Result<Self> {
        self.ensure_open()?;
        let patterns = Self::patterns("CREATE", patterns)?;
        self.push(Clause::Create(CreateClause { patterns }))
    }

    pub fn merge(self, pattern: impl Into<Pattern>) -> Result<Self> {
        self.push(Clause::Merge(MergeClause { pattern: pattern.into(), on_create: vec![], on_match: vec![] }))
    }

    fn merge_action(mut self, action: MergeAction, items: impl IntoIterator<Item = SetItem>) -> Result<Self> {
        self.ensure_open()?;
        let Some(Clause::Merge(merge)) = self.clauses.last_mut() else {
            let what = match action {
                MergeAction::OnCreate => "ON CREATE",
                MergeAction::OnMatch => "ON MATCH",
            };
            return Err(Error::MisplacedClause(format!("{what} without MERGE")));
        };
        match action {
            MergeAction::OnCreate => merge.on_create.extend(items),
            MergeAction::OnMatch => merge.on_match.extend(items),
        }
        Ok(self)
    }

    pub fn on_create_set(self, items: impl IntoIterator<Item = SetItem>) -> Result<Self> {
        self.merge_action(MergeAction::OnCreate, items)
    }

    pub fn on_match_set(self, items: impl IntoIterator<Item = SetItem>) -> Result<Self> {
        self.merge_action(MergeAction::OnMatch, items)
    }

    pub fn delete(self, exprs: impl IntoIterator<Item = Expr>) -> Result<Self> {
        self.push(Clause::Delete(DeleteClause { exprs: exprs.into_iter().collect(), detach: false }))
    }

    pub fn detach_delete(self, exprs: impl IntoIterator<Item = Expr>) -> Result<Self> {
        self.push(Clause::Delete(DeleteClause { exprs: exprs.into_iter().collect(), detach: true }))
    }

    pub fn set(self, items: impl IntoIterator<Item = SetItem>) -> Result<Self> {
        self.push(Clause::Set(SetClause { items: items.into_iter().collect() }))
    }

    pub fn remove(self, items: impl IntoIterator<Item = RemoveItem>) -> Result<Self> {
        self.push(Clause::Remove(RemoveClause { items: items.into_iter().collect() }))
    }

    /// Finalize. Later steps on this builder fail; building again yields an
    /// equal statement.
    pub fn build(&self) -> Result<Statement> {
        if self.clauses.is_empty() {
            return Err(Error::MisplacedClause("statement without clauses".into()));
        }
        if !self.finalized.replace(true) {
            debug!(clauses = self.clauses.len(), "statement finalized");
        }
        Ok(Statement { clauses: self.clauses.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builder() {
        let n = node("Person").unwrap().named("p").unwrap().with_label("Actor").unwrap();
        assert_eq!(n.variable.as_ref().map(|v| v.as_str()), Some("p"));
        assert_eq!(n.labels.len(), 2);
        assert_eq!(n.label_join, LabelJoin::All);
    }

    #[test]
    fn test_invalid_names_fail_immediately() {
        assert!(matches!(node(""), Err(Error::InvalidIdentifier { .. })));
        assert!(any_node().named("").is_err());
        assert!(RelPattern::outgoing(["OK", ""]).is_err());
        assert!(Expr::var("n").unwrap().property("").is_err());
        assert!(Expr::function("a..b", []).is_err());
    }

    #[test]
    fn test_relationship_keeps_direction() {
        let p = node("Movie").unwrap().relationship_from(node("Person").unwrap(), ["ACTED_IN"]).unwrap();
        assert_eq!(p.elements.len(), 3);
        match &p.elements[1] {
            PatternElement::Relationship(r) => {
                assert_eq!(r.direction, PatternDirection::Incoming);
                assert_eq!(r.types[0].value(), "ACTED_IN");
            }
            _ => panic!("Expected relationship"),
        }
    }

    #[test]
    fn test_unnamed_node_has_no_expression() {
        assert!(matches!(any_node().as_expr(), Err(Error::NoSymbolicName(_))));
    }

    #[test]
    fn test_and_flattens() {
        let a = Expr::var("a").unwrap();
        let b = Expr::var("b").unwrap();
        let c = Expr::var("c").unwrap();
        match a.and(b).and(c) {
            Expr::Compound { op: LogicalOp::And, operands } => assert_eq!(operands.len(), 3),
            other => panic!("Expected compound, got {other:?}"),
        }
    }

    #[test]
    fn test_all_of_nothing_is_true() {
        assert_eq!(Expr::all([]), Expr::from(true));
        assert_eq!(Expr::any([Expr::from(1)]), Expr::from(1));
    }

    #[test]
    fn test_where_attaches_to_match() {
        let stmt = StatementBuilder::new()
            .matching([Pattern::from(any_node().named("n").unwrap())])
            .unwrap()
            .where_(Expr::var("n").unwrap().is_not_null())
            .unwrap()
            .where_(Expr::from(true))
            .unwrap()
            .build()
            .unwrap();
        match &stmt.clauses[0] {
            Clause::Match(m) => assert!(matches!(m.where_clause, Some(Expr::Compound { .. }))),
            _ => panic!("Expected MATCH"),
        }
    }

    #[test]
    fn test_where_without_match_is_misplaced() {
        let err = StatementBuilder::new()
            .returning([Expr::from(1)])
            .unwrap()
            .where_(Expr::from(true))
            .unwrap_err();
        assert!(matches!(err, Error::MisplacedClause(_)));
    }

    #[test]
    fn test_mutation_after_build_rejected() {
        let builder = StatementBuilder::new().returning([Expr::from(1)]).unwrap();
        let first = builder.build().unwrap();
        assert!(builder.is_finalized());
        assert_eq!(builder.build().unwrap(), first);
        let err = builder.returning([Expr::from(2)]).unwrap_err();
        assert_eq!(err, Error::BuilderAlreadyFinalized);
    }

    #[test]
    fn test_projection_modifiers() {
        let stmt = StatementBuilder::new()
            .returning([Expr::var("n").unwrap()])
            .unwrap()
            .distinct()
            .unwrap()
            .order_by([Expr::var("n").unwrap().descending()])
            .unwrap()
            .skip(1)
            .unwrap()
            .limit(10)
            .unwrap()
            .build()
            .unwrap();
        match &stmt.clauses[0] {
            Clause::Return(p) => {
                assert!(p.distinct);
                assert!(!p.order_by[0].ascending);
                assert_eq!(p.skip, Some(Expr::from(1)));
                assert_eq!(p.limit, Some(Expr::from(10)));
            }
            _ => panic!("Expected RETURN"),
        }
    }

    #[test]
    fn test_merge_actions_need_merge() {
        let err = StatementBuilder::new()
            .create([Pattern::from(any_node())])
            .unwrap()
            .on_create_set([SetItem::property("n", "x", 1).unwrap()])
            .unwrap_err();
        assert!(matches!(err, Error::MisplacedClause(_)));
    }

    #[test]
    fn test_empty_statement_rejected() {
        assert!(StatementBuilder::new().build().is_err());
    }
}
