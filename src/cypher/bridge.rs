//! Event-driven tree construction for external parsers.
//!
//! A grammar outside this crate walks its own parse tree and reports what it
//! sees as a flat sequence of [`Event`]s. Structural nodes (statements,
//! clauses, patterns) arrive as enter/exit pairs. Expressions arrive in
//! postfix order: operands first, then the operator that consumes them.
//! [`TreeBuilder`] folds the sequence into the same [`Statement`] the builder
//! layer produces.
//!
//! `MATCH (n:Person) WHERE n.age > 30 RETURN n` arrives as:
//!
//! ```text
//! EnterStatement
//!   EnterMatch { optional: false }
//!     EnterPattern { variable: None }
//!       EnterNode { variable: Some("n") }  Labels { ["Person"], All }  ExitNode
//!     ExitPattern
//!     Variable("n")  Property("age")  Literal(Int(30))  Binary(Gt)  Where
//!   ExitMatch
//!   EnterReturn { distinct: false }  Variable("n")  ReturnItem { alias: None }  ExitReturn
//! ExitStatement
//! ```
//!
//! After an error the builder is in an unspecified state and should be
//! dropped.

use tracing::{debug, trace};

use super::ast::*;
use super::builder::{function_name, property_key};
use crate::model::{SymbolicName, Token};
use crate::{Error, Result};

/// One tree-construction callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Statements and clauses
    EnterStatement,
    ExitStatement,
    EnterMatch { optional: bool },
    ExitMatch,
    /// Pops one condition and attaches it to the enclosing MATCH, WITH or EXISTS.
    Where,
    EnterWith { distinct: bool },
    ExitWith,
    EnterReturn { distinct: bool },
    ExitReturn,
    /// Pops one expression as a projection item.
    ReturnItem { alias: Option<String> },
    /// Pops one expression as a sort key.
    OrderBy { ascending: bool },
    Skip,
    Limit,
    EnterCreate,
    ExitCreate,
    EnterMerge,
    ExitMerge,
    /// SET items that follow belong to this MERGE action.
    MergeAction(MergeAction),
    EnterDelete { detach: bool },
    /// Every pending expression becomes a deleted item.
    ExitDelete,
    EnterSet,
    ExitSet,
    /// Pops the assigned value.
    SetProperty { variable: String, key: String },
    /// Pops the assigned value; `merge` selects `+=` over `=`.
    SetAllProperties { variable: String, merge: bool },
    SetLabels { variable: String, labels: Vec<String> },
    EnterRemove,
    ExitRemove,
    RemoveProperty { variable: String, key: String },
    RemoveLabels { variable: String, labels: Vec<String> },
    /// Dotted procedure name, e.g. `db.labels`.
    EnterCallProcedure { name: String },
    /// Every pending expression becomes an argument.
    ExitCallProcedure { yields: Vec<String> },
    EnterSubquery,
    ExitSubquery,

    // Patterns
    EnterPattern { variable: Option<String> },
    ExitPattern,
    EnterNode { variable: Option<String> },
    ExitNode,
    EnterRelationship { variable: Option<String> },
    ExitRelationship { direction: PatternDirection },
    Labels { labels: Vec<String>, join: LabelJoin },
    Types(Vec<String>),
    Length(VarLength),
    /// Pops a map expression as the inline properties of the current node
    /// or relationship.
    Properties,

    // Expressions, postfix
    Literal(Literal),
    Variable(String),
    Parameter(Parameter),
    Star,
    /// Pops the target of `target.key`.
    Property(String),
    Binary(BinaryOp),
    Unary(UnaryOp),
    Custom(String),
    Compound { op: LogicalOp, arity: usize },
    Function { name: String, arity: usize, distinct: bool },
    List(usize),
    /// Pops one value per key, in key order.
    Map(Vec<String>),
    HasLabels(Vec<String>),
    /// Pops `[operand] (when, then)* [else]`.
    Case { has_operand: bool, branches: usize, has_else: bool },
    EnterExists,
    ExitExists,
}

/// Anything that accepts tree-construction events.
pub trait EventSink {
    fn push(&mut self, event: Event) -> Result<()>;
}

/// Records events verbatim.
impl EventSink for Vec<Event> {
    fn push(&mut self, event: Event) -> Result<()> {
        Vec::push(self, event);
        Ok(())
    }
}

#[derive(Debug)]
enum FrameKind {
    Statement(Vec<Clause>),
    Match(MatchClause),
    With(WithClause),
    Return(Projection),
    Create(Vec<Pattern>),
    Merge { pattern: Option<Pattern>, action: Option<MergeAction>, on_create: Vec<SetItem>, on_match: Vec<SetItem> },
    Delete { detach: bool },
    Set(Vec<SetItem>),
    Remove(Vec<RemoveItem>),
    CallProcedure(Vec<String>),
    Pattern(Pattern),
    Node(NodePattern),
    Relationship(RelPattern),
    Exists(ExistsSubquery),
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    operands: Vec<Expr>,
}

/// Folds an [`Event`] sequence into a [`Statement`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    frames: Vec<Frame>,
    finished: Option<Statement>,
    events: usize,
}

fn unexpected(what: impl Into<String>) -> Error {
    Error::UnsupportedNodeKind(what.into())
}

fn name(value: Option<String>) -> Result<Option<SymbolicName>> {
    value.map(SymbolicName::new).transpose()
}

fn labels(values: Vec<String>) -> Result<Vec<Token>> {
    values.into_iter().map(Token::label).collect()
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a complete event sequence.
    pub fn build(events: impl IntoIterator<Item = Event>) -> Result<Statement> {
        let mut builder = Self::new();
        for event in events {
            builder.push(event)?;
        }
        builder.finish()
    }

    /// True once the root statement has been closed.
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// The statement, once `ExitStatement` has been seen.
    pub fn finish(self) -> Result<Statement> {
        self.finished.ok_or_else(|| unexpected("statement was never closed"))
    }

    // ========================================================================
    // Frame helpers
    // ========================================================================

    fn open(&mut self, kind: FrameKind) {
        self.frames.push(Frame { kind, operands: Vec::new() });
    }

    fn top(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| unexpected("event outside of a statement"))
    }

    fn close(&mut self, event: &str) -> Result<Frame> {
        let frame = self.frames.pop().ok_or_else(|| unexpected(format!("{event} without a matching enter")))?;
        if !frame.operands.is_empty() {
            return Err(unexpected(format!("{} unconsumed expression(s) at {event}", frame.operands.len())));
        }
        Ok(frame)
    }

    fn pop_operands(&mut self, n: usize) -> Result<Vec<Expr>> {
        let frame = self.top()?;
        if frame.operands.len() < n {
            return Err(unexpected(format!(
                "expected {n} operand(s), found {}",
                frame.operands.len()
            )));
        }
        let at = frame.operands.len() - n;
        Ok(frame.operands.split_off(at))
    }

    fn pop_operand(&mut self) -> Result<Expr> {
        let mut operands = self.pop_operands(1)?;
        operands.pop().ok_or_else(|| unexpected("missing operand"))
    }

    fn emit(&mut self, expr: Expr) -> Result<()> {
        self.top()?.operands.push(expr);
        Ok(())
    }

    fn add_clause(&mut self, clause: Clause) -> Result<()> {
        match &mut self.top()?.kind {
            FrameKind::Statement(clauses) => {
                clauses.push(clause);
                Ok(())
            }
            _ => Err(unexpected(format!("{} clause nested in another clause", clause.kind_name()))),
        }
    }

    fn add_pattern(&mut self, pattern: Pattern) -> Result<()> {
        match &mut self.top()?.kind {
            FrameKind::Match(m) => m.patterns.push(pattern),
            FrameKind::Create(patterns) => patterns.push(pattern),
            FrameKind::Exists(e) => e.patterns.push(pattern),
            FrameKind::Merge { pattern: slot @ None, .. } => *slot = Some(pattern),
            FrameKind::Merge { .. } => return Err(unexpected("MERGE with more than one pattern")),
            _ => return Err(unexpected("pattern outside MATCH, CREATE, MERGE or EXISTS")),
        }
        Ok(())
    }

    fn add_element(&mut self, element: PatternElement) -> Result<()> {
        match &mut self.top()?.kind {
            FrameKind::Pattern(p) => {
                p.elements.push(element);
                Ok(())
            }
            _ => Err(unexpected("node or relationship outside of a pattern")),
        }
    }

    fn add_set_item(&mut self, item: SetItem) -> Result<()> {
        match &mut self.top()?.kind {
            FrameKind::Set(items) => items.push(item),
            FrameKind::Merge { action: Some(MergeAction::OnCreate), on_create, .. } => on_create.push(item),
            FrameKind::Merge { action: Some(MergeAction::OnMatch), on_match, .. } => on_match.push(item),
            _ => return Err(unexpected("SET item outside SET or a MERGE action")),
        }
        Ok(())
    }

    fn add_remove_item(&mut self, item: RemoveItem) -> Result<()> {
        match &mut self.top()?.kind {
            FrameKind::Remove(items) => {
                items.push(item);
                Ok(())
            }
            _ => Err(unexpected("REMOVE item outside REMOVE")),
        }
    }

    fn projection(&mut self) -> Result<&mut Projection> {
        match &mut self.top()?.kind {
            FrameKind::With(w) => Ok(&mut w.projection),
            FrameKind::Return(p) => Ok(p),
            _ => Err(unexpected("projection item outside WITH or RETURN")),
        }
    }

    // ========================================================================
    // Event dispatch
    // ========================================================================

    fn apply(&mut self, event: Event) -> Result<()> {
        match event {
            Event::EnterStatement => {
                if !self.frames.is_empty() {
                    return Err(unexpected("nested statement outside CALL {}"));
                }
                self.open(FrameKind::Statement(Vec::new()));
            }
            Event::ExitStatement => {
                let frame = self.close("ExitStatement")?;
                let FrameKind::Statement(clauses) = frame.kind else {
                    return Err(unexpected("ExitStatement closes a non-statement"));
                };
                if !self.frames.is_empty() {
                    return Err(unexpected("ExitStatement inside CALL {}"));
                }
                debug!(clauses = clauses.len(), events = self.events, "bridge statement finished");
                self.finished = Some(Statement { clauses });
            }
            Event::EnterSubquery => self.open(FrameKind::Statement(Vec::new())),
            Event::ExitSubquery => {
                let frame = self.close("ExitSubquery")?;
                let FrameKind::Statement(clauses) = frame.kind else {
                    return Err(unexpected("ExitSubquery closes a non-statement"));
                };
                if self.frames.is_empty() {
                    return Err(unexpected("ExitSubquery closes the root statement"));
                }
                self.add_clause(Clause::CallSubquery(Box::new(Statement { clauses })))?;
            }

            Event::EnterMatch { optional } => {
                self.open(FrameKind::Match(MatchClause { optional, patterns: vec![], where_clause: None }))
            }
            Event::ExitMatch => {
                let frame = self.close("ExitMatch")?;
                let FrameKind::Match(m) = frame.kind else {
                    return Err(unexpected("ExitMatch closes a non-MATCH"));
                };
                if m.patterns.is_empty() {
                    return Err(unexpected("MATCH without a pattern"));
                }
                self.add_clause(Clause::Match(m))?;
            }
            Event::Where => {
                let condition = self.pop_operand()?;
                let slot = match &mut self.top()?.kind {
                    FrameKind::Match(m) => &mut m.where_clause,
                    FrameKind::With(w) => &mut w.where_clause,
                    FrameKind::Exists(e) => &mut e.where_clause,
                    _ => return Err(unexpected("WHERE outside MATCH, WITH or EXISTS")),
                };
                if slot.is_some() {
                    return Err(unexpected("second WHERE on one clause"));
                }
                *slot = Some(condition);
            }
            Event::EnterWith { distinct } => self.open(FrameKind::With(WithClause {
                projection: Projection { distinct, ..Default::default() },
                where_clause: None,
            })),
            Event::ExitWith => {
                let frame = self.close("ExitWith")?;
                let FrameKind::With(w) = frame.kind else {
                    return Err(unexpected("ExitWith closes a non-WITH"));
                };
                if w.projection.items.is_empty() {
                    return Err(Error::MisplacedClause("WITH requires at least one item".into()));
                }
                self.add_clause(Clause::With(w))?;
            }
            Event::EnterReturn { distinct } => {
                self.open(FrameKind::Return(Projection { distinct, ..Default::default() }))
            }
            Event::ExitReturn => {
                let frame = self.close("ExitReturn")?;
                let FrameKind::Return(p) = frame.kind else {
                    return Err(unexpected("ExitReturn closes a non-RETURN"));
                };
                if p.items.is_empty() {
                    return Err(Error::MisplacedClause("RETURN requires at least one item".into()));
                }
                self.add_clause(Clause::Return(p))?;
            }
            Event::ReturnItem { alias } => {
                let expr = self.pop_operand()?;
                let alias = name(alias)?;
                self.projection()?.items.push(ReturnItem { expr, alias });
            }
            Event::OrderBy { ascending } => {
                let expr = self.pop_operand()?;
                self.projection()?.order_by.push(OrderExpr { expr, ascending });
            }
            Event::Skip => {
                let expr = self.pop_operand()?;
                self.projection()?.skip = Some(expr);
            }
            Event::Limit => {
                let expr = self.pop_operand()?;
                self.projection()?.limit = Some(expr);
            }

            Event::EnterCreate => self.open(FrameKind::Create(Vec::new())),
            Event::ExitCreate => {
                let frame = self.close("ExitCreate")?;
                let FrameKind::Create(patterns) = frame.kind else {
                    return Err(unexpected("ExitCreate closes a non-CREATE"));
                };
                self.add_clause(Clause::Create(CreateClause { patterns }))?;
            }
            Event::EnterMerge => self.open(FrameKind::Merge {
                pattern: None,
                action: None,
                on_create: vec![],
                on_match: vec![],
            }),
            Event::MergeAction(next) => match &mut self.top()?.kind {
                FrameKind::Merge { action, .. } => *action = Some(next),
                _ => return Err(unexpected("merge action outside MERGE")),
            },
            Event::ExitMerge => {
                let frame = self.close("ExitMerge")?;
                let FrameKind::Merge { pattern, on_create, on_match, .. } = frame.kind else {
                    return Err(unexpected("ExitMerge closes a non-MERGE"));
                };
                let pattern = pattern.ok_or_else(|| unexpected("MERGE without a pattern"))?;
                self.add_clause(Clause::Merge(MergeClause { pattern, on_create, on_match }))?;
            }
            Event::EnterDelete { detach } => self.open(FrameKind::Delete { detach }),
            Event::ExitDelete => {
                let exprs = match self.frames.last_mut() {
                    Some(Frame { kind: FrameKind::Delete { .. }, operands }) => std::mem::take(operands),
                    _ => return Err(unexpected("ExitDelete closes a non-DELETE")),
                };
                let frame = self.close("ExitDelete")?;
                let FrameKind::Delete { detach } = frame.kind else {
                    return Err(unexpected("ExitDelete closes a non-DELETE"));
                };
                self.add_clause(Clause::Delete(DeleteClause { exprs, detach }))?;
            }
            Event::EnterSet => self.open(FrameKind::Set(Vec::new())),
            Event::ExitSet => {
                let frame = self.close("ExitSet")?;
                let FrameKind::Set(items) = frame.kind else {
                    return Err(unexpected("ExitSet closes a non-SET"));
                };
                self.add_clause(Clause::Set(SetClause { items }))?;
            }
            Event::SetProperty { variable, key } => {
                let value = self.pop_operand()?;
                let item = SetItem::Property { variable: SymbolicName::new(variable)?, key: property_key(key)?, value };
                self.add_set_item(item)?;
            }
            Event::SetAllProperties { variable, merge } => {
                let value = self.pop_operand()?;
                let variable = SymbolicName::new(variable)?;
                let item = if merge {
                    SetItem::MergeProperties { variable, value }
                } else {
                    SetItem::AllProperties { variable, value }
                };
                self.add_set_item(item)?;
            }
            Event::SetLabels { variable, labels: values } => {
                let item = SetItem::Labels { variable: SymbolicName::new(variable)?, labels: labels(values)? };
                self.add_set_item(item)?;
            }
            Event::EnterRemove => self.open(FrameKind::Remove(Vec::new())),
            Event::ExitRemove => {
                let frame = self.close("ExitRemove")?;
                let FrameKind::Remove(items) = frame.kind else {
                    return Err(unexpected("ExitRemove closes a non-REMOVE"));
                };
                self.add_clause(Clause::Remove(RemoveClause { items }))?;
            }
            Event::RemoveProperty { variable, key } => {
                let item = RemoveItem::Property { variable: SymbolicName::new(variable)?, key: property_key(key)? };
                self.add_remove_item(item)?;
            }
            Event::RemoveLabels { variable, labels: values } => {
                let item = RemoveItem::Labels { variable: SymbolicName::new(variable)?, labels: labels(values)? };
                self.add_remove_item(item)?;
            }
            Event::EnterCallProcedure { name } => {
                let segments: Vec<String> = name.split('.').map(str::to_owned).collect();
                if segments.iter().any(String::is_empty) {
                    return Err(Error::InvalidIdentifier { kind: "procedure name".into(), value: name });
                }
                self.open(FrameKind::CallProcedure(segments));
            }
            Event::ExitCallProcedure { yields } => {
                let args = match self.frames.last_mut() {
                    Some(Frame { kind: FrameKind::CallProcedure(_), operands }) => std::mem::take(operands),
                    _ => return Err(unexpected("ExitCallProcedure closes a non-CALL")),
                };
                let frame = self.close("ExitCallProcedure")?;
                let FrameKind::CallProcedure(name) = frame.kind else {
                    return Err(unexpected("ExitCallProcedure closes a non-CALL"));
                };
                let yields = yields.into_iter().map(SymbolicName::new).collect::<Result<_>>()?;
                self.add_clause(Clause::CallProcedure(ProcedureCall { name, args, yields }))?;
            }

            Event::EnterPattern { variable } => {
                self.open(FrameKind::Pattern(Pattern { variable: name(variable)?, elements: vec![] }))
            }
            Event::ExitPattern => {
                let frame = self.close("ExitPattern")?;
                let FrameKind::Pattern(pattern) = frame.kind else {
                    return Err(unexpected("ExitPattern closes a non-pattern"));
                };
                self.add_pattern(pattern)?;
            }
            Event::EnterNode { variable } => {
                self.open(FrameKind::Node(NodePattern { variable: name(variable)?, ..Default::default() }))
            }
            Event::ExitNode => {
                let frame = self.close("ExitNode")?;
                let FrameKind::Node(node) = frame.kind else {
                    return Err(unexpected("ExitNode closes a non-node"));
                };
                self.add_element(PatternElement::Node(node))?;
            }
            Event::EnterRelationship { variable } => self.open(FrameKind::Relationship(RelPattern {
                variable: name(variable)?,
                types: Default::default(),
                direction: PatternDirection::Undirected,
                properties: None,
                length: None,
            })),
            Event::ExitRelationship { direction } => {
                let frame = self.close("ExitRelationship")?;
                let FrameKind::Relationship(mut rel) = frame.kind else {
                    return Err(unexpected("ExitRelationship closes a non-relationship"));
                };
                rel.direction = direction;
                self.add_element(PatternElement::Relationship(rel))?;
            }
            Event::Labels { labels: values, join } => {
                let tokens = labels(values)?;
                match &mut self.top()?.kind {
                    FrameKind::Node(node) => {
                        node.labels.extend(tokens);
                        node.label_join = join;
                    }
                    _ => return Err(unexpected("labels outside a node pattern")),
                }
            }
            Event::Types(values) => {
                let tokens = values
                    .into_iter()
                    .map(Token::relationship_type)
                    .collect::<Result<Vec<_>>>()?;
                match &mut self.top()?.kind {
                    FrameKind::Relationship(rel) => rel.types.extend(tokens),
                    _ => return Err(unexpected("types outside a relationship pattern")),
                }
            }
            Event::Length(length) => match &mut self.top()?.kind {
                FrameKind::Relationship(rel) => rel.length = Some(length),
                _ => return Err(unexpected("length outside a relationship pattern")),
            },
            Event::Properties => {
                let Expr::Map(map) = self.pop_operand()? else {
                    return Err(unexpected("inline properties must be a map"));
                };
                match &mut self.top()?.kind {
                    FrameKind::Node(node) => node.properties = Some(map),
                    FrameKind::Relationship(rel) => rel.properties = Some(map),
                    _ => return Err(unexpected("properties outside a node or relationship pattern")),
                }
            }

            Event::Literal(Literal::Float(value)) => self.emit(Expr::Literal(Literal::float(value)))?,
            Event::Literal(lit) => self.emit(Expr::Literal(lit))?,
            Event::Variable(var) => self.emit(Expr::Variable(SymbolicName::new(var)?))?,
            Event::Parameter(Parameter::Named(name)) if name.is_empty() => {
                return Err(Error::InvalidIdentifier { kind: "parameter name".into(), value: name });
            }
            Event::Parameter(p) => self.emit(Expr::Parameter(p))?,
            Event::Star => self.emit(Expr::Star)?,
            Event::Property(key) => {
                let key = property_key(key)?;
                let target = self.pop_operand()?;
                self.emit(Expr::Property { expr: Box::new(target), key })?;
            }
            Event::Binary(op) => {
                let mut operands = self.pop_operands(2)?;
                let right = operands.pop().ok_or_else(|| unexpected("missing right operand"))?;
                let left = operands.pop().ok_or_else(|| unexpected("missing left operand"))?;
                self.emit(Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) })?;
            }
            Event::Unary(op) => {
                let expr = self.pop_operand()?;
                self.emit(Expr::UnaryOp { op, expr: Box::new(expr) })?;
            }
            Event::Custom(symbol) => {
                if symbol.trim().is_empty() {
                    return Err(Error::InvalidIdentifier { kind: "operator".into(), value: symbol });
                }
                let mut operands = self.pop_operands(2)?;
                let right = operands.pop().ok_or_else(|| unexpected("missing right operand"))?;
                let left = operands.pop().ok_or_else(|| unexpected("missing left operand"))?;
                self.emit(Expr::Custom { symbol, left: Box::new(left), right: Box::new(right) })?;
            }
            Event::Compound { op, arity } => {
                if arity == 0 {
                    return Err(unexpected("compound condition without operands"));
                }
                let operands = self.pop_operands(arity)?;
                self.emit(Expr::Compound { op, operands })?;
            }
            Event::Function { name, arity, distinct } => {
                let name = function_name(name)?;
                let args = self.pop_operands(arity)?;
                self.emit(Expr::FunctionCall { name, args, distinct })?;
            }
            Event::List(n) => {
                let items = self.pop_operands(n)?;
                self.emit(Expr::List(items))?;
            }
            Event::Map(keys) => {
                let keys = keys.into_iter().map(property_key).collect::<Result<Vec<_>>>()?;
                let values = self.pop_operands(keys.len())?;
                let mut map = MapExpr::new();
                for (key, value) in keys.into_iter().zip(values) {
                    map.insert(key, value);
                }
                self.emit(Expr::Map(map))?;
            }
            Event::HasLabels(values) => {
                let target = self.pop_operand()?;
                self.emit(Expr::HasLabels { expr: Box::new(target), labels: labels(values)? })?;
            }
            Event::Case { has_operand, branches, has_else } => {
                let count = usize::from(has_operand) + 2 * branches + usize::from(has_else);
                let mut operands = self.pop_operands(count)?.into_iter();
                let operand = if has_operand { operands.next().map(Box::new) } else { None };
                let mut whens = Vec::with_capacity(branches);
                for _ in 0..branches {
                    match (operands.next(), operands.next()) {
                        (Some(when), Some(then)) => whens.push((when, then)),
                        _ => return Err(unexpected("CASE branch without THEN")),
                    }
                }
                let else_expr = operands.next().map(Box::new);
                self.emit(Expr::Case { operand, whens, else_expr })?;
            }
            Event::EnterExists => self.open(FrameKind::Exists(ExistsSubquery { patterns: vec![], where_clause: None })),
            Event::ExitExists => {
                let frame = self.close("ExitExists")?;
                let FrameKind::Exists(sub) = frame.kind else {
                    return Err(unexpected("ExitExists closes a non-EXISTS"));
                };
                if sub.patterns.is_empty() {
                    return Err(unexpected("EXISTS without a pattern"));
                }
                self.emit(Expr::Exists(Box::new(sub)))?;
            }
        }
        Ok(())
    }
}

impl EventSink for TreeBuilder {
    fn push(&mut self, event: Event) -> Result<()> {
        if self.finished.is_some() {
            return Err(Error::BuilderAlreadyFinalized);
        }
        trace!(?event, depth = self.frames.len(), "bridge event");
        self.events += 1;
        self.apply(event)
    }
}
