//! Canonical query text.
//!
//! Rendering is a depth-first walk over the AST. Identical trees render to
//! identical text; the renderer never reorders or deduplicates clauses.
//! Parentheses are emitted only where the precedence table requires them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ast::*;
use super::keywords::{escape_name, escape_parameter};
use super::precedence::{self, binary_operator_of, needs_parens, OperatorInfo, Side};
use crate::model::{SymbolicName, Token};
use crate::{Error, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Backtick every label and relationship type, not only those that need it.
    pub always_escape_names: bool,
    /// One clause per line, subquery bodies indented.
    pub pretty_print: bool,
    /// Indentation width used when pretty printing.
    pub indent: usize,
    /// Precedence of caller-defined binary operators, keyed by symbol.
    pub custom_operators: BTreeMap<String, OperatorInfo>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            always_escape_names: false,
            pretty_print: false,
            indent: 2,
            custom_operators: BTreeMap::new(),
        }
    }
}

impl RenderConfig {
    pub fn pretty() -> Self {
        Self { pretty_print: true, ..Self::default() }
    }

    pub fn with_custom_operator(mut self, symbol: impl Into<String>, info: OperatorInfo) -> Self {
        self.custom_operators.insert(symbol.into(), info);
        self
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Render with the default configuration.
pub fn render(statement: &Statement) -> Result<String> {
    Renderer::new(&RenderConfig::default()).statement(statement)
}

impl Statement {
    /// Canonical text of this statement.
    pub fn cypher(&self) -> Result<String> {
        render(self)
    }

    pub fn cypher_with(&self, config: &RenderConfig) -> Result<String> {
        Renderer::new(config).statement(self)
    }
}

/// Stateless text renderer bound to one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    config: &'a RenderConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    pub fn statement(&self, statement: &Statement) -> Result<String> {
        debug!(clauses = statement.clauses.len(), pretty = self.config.pretty_print, "rendering statement");
        self.clauses(statement, 0)
    }

    /// Render a single expression, as it would appear inside a clause.
    pub fn expression(&self, expr: &Expr) -> Result<String> {
        self.expr(expr)
    }

    /// Render a single path pattern.
    pub fn pattern(&self, pattern: &Pattern) -> Result<String> {
        self.path(pattern)
    }

    // ========================================================================
    // Clauses
    // ========================================================================

    fn clauses(&self, statement: &Statement, depth: usize) -> Result<String> {
        if statement.clauses.is_empty() {
            return Err(Error::UnsupportedNodeKind("statement without clauses".into()));
        }
        let rendered = statement
            .clauses
            .iter()
            .map(|c| self.clause(c, depth))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(&self.separator(depth)))
    }

    fn separator(&self, depth: usize) -> String {
        if self.config.pretty_print {
            format!("\n{}", " ".repeat(depth * self.config.indent))
        } else {
            " ".to_owned()
        }
    }

    fn clause(&self, clause: &Clause, depth: usize) -> Result<String> {
        let text = match clause {
            Clause::Match(m) => {
                let keyword = if m.optional { "OPTIONAL MATCH" } else { "MATCH" };
                let mut s = format!("{keyword} {}", self.paths(&m.patterns)?);
                self.where_suffix(&mut s, m.where_clause.as_ref())?;
                s
            }
            Clause::With(w) => {
                let mut s = format!("WITH {}", self.projection(&w.projection)?);
                self.where_suffix(&mut s, w.where_clause.as_ref())?;
                s
            }
            Clause::Return(p) => format!("RETURN {}", self.projection(p)?),
            Clause::CallSubquery(inner) => {
                let body = self.clauses(inner, depth + 1)?;
                if self.config.pretty_print {
                    let open = self.separator(depth + 1);
                    let close = self.separator(depth);
                    format!("CALL {{{open}{body}{close}}}")
                } else {
                    format!("CALL {{ {body} }}")
                }
            }
            Clause::CallProcedure(call) => {
                let name = call
                    .name
                    .iter()
                    .map(|segment| escape_name(segment, false))
                    .collect::<Vec<_>>()
                    .join(".");
                let mut s = format!("CALL {name}({})", self.expr_list(&call.args)?);
                if !call.yields.is_empty() {
                    s.push_str(" YIELD ");
                    s.push_str(&call.yields.iter().map(|y| self.variable(y)).collect::<Vec<_>>().join(", "));
                }
                s
            }
            Clause::Create(c) => format!("CREATE {}", self.paths(&c.patterns)?),
            Clause::Merge(m) => {
                let mut s = format!("MERGE {}", self.path(&m.pattern)?);
                if !m.on_create.is_empty() {
                    s.push_str(" ON CREATE SET ");
                    s.push_str(&self.set_items(&m.on_create)?);
                }
                if !m.on_match.is_empty() {
                    s.push_str(" ON MATCH SET ");
                    s.push_str(&self.set_items(&m.on_match)?);
                }
                s
            }
            Clause::Delete(d) => {
                let keyword = if d.detach { "DETACH DELETE" } else { "DELETE" };
                format!("{keyword} {}", self.expr_list(&d.exprs)?)
            }
            Clause::Set(s) => format!("SET {}", self.set_items(&s.items)?),
            Clause::Remove(r) => {
                let items = r
                    .items
                    .iter()
                    .map(|item| match item {
                        RemoveItem::Property { variable, key } => {
                            format!("{}.{}", self.variable(variable), escape_name(key, false))
                        }
                        RemoveItem::Labels { variable, labels } => {
                            format!("{}{}", self.variable(variable), self.label_list(labels, LabelJoin::All))
                        }
                    })
                    .collect::<Vec<_>>();
                format!("REMOVE {}", items.join(", "))
            }
        };
        Ok(text)
    }

    fn where_suffix(&self, out: &mut String, condition: Option<&Expr>) -> Result<()> {
        if let Some(condition) = condition {
            out.push_str(" WHERE ");
            out.push_str(&self.expr(condition)?);
        }
        Ok(())
    }

    fn projection(&self, p: &Projection) -> Result<String> {
        if p.items.is_empty() {
            return Err(Error::UnsupportedNodeKind("projection without items".into()));
        }
        let mut s = String::new();
        if p.distinct {
            s.push_str("DISTINCT ");
        }
        let items = p
            .items
            .iter()
            .map(|item| {
                let expr = self.expr(&item.expr)?;
                Ok(match &item.alias {
                    Some(alias) => format!("{expr} AS {}", self.variable(alias)),
                    None => expr,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        s.push_str(&items.join(", "));
        if !p.order_by.is_empty() {
            let order = p
                .order_by
                .iter()
                .map(|o| {
                    let expr = self.expr(&o.expr)?;
                    Ok(if o.ascending { expr } else { format!("{expr} DESC") })
                })
                .collect::<Result<Vec<_>>>()?;
            s.push_str(" ORDER BY ");
            s.push_str(&order.join(", "));
        }
        if let Some(skip) = &p.skip {
            s.push_str(" SKIP ");
            s.push_str(&self.expr(skip)?);
        }
        if let Some(limit) = &p.limit {
            s.push_str(" LIMIT ");
            s.push_str(&self.expr(limit)?);
        }
        Ok(s)
    }

    fn set_items(&self, items: &[SetItem]) -> Result<String> {
        let rendered = items
            .iter()
            .map(|item| {
                Ok(match item {
                    SetItem::Property { variable, key, value } => format!(
                        "{}.{} = {}",
                        self.variable(variable),
                        escape_name(key, false),
                        self.expr(value)?
                    ),
                    SetItem::AllProperties { variable, value } => {
                        format!("{} = {}", self.variable(variable), self.expr(value)?)
                    }
                    SetItem::MergeProperties { variable, value } => {
                        format!("{} += {}", self.variable(variable), self.expr(value)?)
                    }
                    SetItem::Labels { variable, labels } => {
                        format!("{}{}", self.variable(variable), self.label_list(labels, LabelJoin::All))
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    fn paths(&self, patterns: &[Pattern]) -> Result<String> {
        let rendered = patterns.iter().map(|p| self.path(p)).collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    fn path(&self, pattern: &Pattern) -> Result<String> {
        let mut s = String::new();
        if let Some(name) = &pattern.variable {
            s.push_str(&self.variable(name));
            s.push_str(" = ");
        }
        let mut expect_node = true;
        for element in &pattern.elements {
            match (element, expect_node) {
                (PatternElement::Node(n), true) => s.push_str(&self.node(n)?),
                (PatternElement::Relationship(r), false) => s.push_str(&self.relationship(r)?),
                (PatternElement::Node(_), false) => {
                    return Err(Error::UnsupportedNodeKind("adjacent node patterns".into()));
                }
                (PatternElement::Relationship(_), true) => {
                    return Err(Error::UnsupportedNodeKind("relationship without a node before it".into()));
                }
            }
            expect_node = !expect_node;
        }
        if expect_node {
            let what = if pattern.elements.is_empty() { "empty pattern" } else { "dangling relationship" };
            return Err(Error::UnsupportedNodeKind(what.into()));
        }
        Ok(s)
    }

    fn node(&self, node: &NodePattern) -> Result<String> {
        let mut s = String::from("(");
        if let Some(v) = &node.variable {
            s.push_str(&self.variable(v));
        }
        s.push_str(&self.label_list(&node.labels, node.label_join));
        if let Some(props) = &node.properties {
            if s.len() > 1 {
                s.push(' ');
            }
            s.push_str(&self.map(props)?);
        }
        s.push(')');
        Ok(s)
    }

    fn relationship(&self, rel: &RelPattern) -> Result<String> {
        let mut details = String::new();
        if let Some(v) = &rel.variable {
            details.push_str(&self.variable(v));
        }
        if !rel.types.is_empty() {
            details.push(':');
            details.push_str(
                &rel.types.iter().map(|t| self.token(t)).collect::<Vec<_>>().join("|"),
            );
        }
        if let Some(length) = rel.length {
            details.push('*');
            match (length.min, length.max) {
                (None, None) => {}
                (Some(min), Some(max)) if min == max => details.push_str(&min.to_string()),
                (Some(min), None) => details.push_str(&format!("{min}..")),
                (None, Some(max)) => details.push_str(&format!("..{max}")),
                (Some(min), Some(max)) => details.push_str(&format!("{min}..{max}")),
            }
        }
        if let Some(props) = &rel.properties {
            if !details.is_empty() {
                details.push(' ');
            }
            details.push_str(&self.map(props)?);
        }
        let body = if details.is_empty() { String::new() } else { format!("[{details}]") };
        Ok(match rel.direction {
            PatternDirection::Outgoing => format!("-{body}->"),
            PatternDirection::Incoming => format!("<-{body}-"),
            PatternDirection::Undirected => format!("-{body}-"),
        })
    }

    fn label_list(&self, labels: &[Token], join: LabelJoin) -> String {
        if labels.is_empty() {
            return String::new();
        }
        let rendered: Vec<_> = labels.iter().map(|l| self.token(l)).collect();
        match join {
            LabelJoin::All => format!(":{}", rendered.join(":")),
            LabelJoin::Any => format!(":{}", rendered.join("|")),
        }
    }

    fn token(&self, token: &Token) -> String {
        escape_name(token.value(), self.config.always_escape_names).into_owned()
    }

    fn variable(&self, name: &SymbolicName) -> String {
        escape_name(name.as_str(), false).into_owned()
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr_list(&self, exprs: &[Expr]) -> Result<String> {
        let rendered = exprs.iter().map(|e| self.expr(e)).collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    /// Binding strength of an expression as written.
    fn precedence(&self, expr: &Expr) -> Result<u8> {
        Ok(match expr {
            Expr::BinaryOp { op, .. } => op.info().precedence,
            Expr::Compound { operands, .. } if operands.len() == 1 => self.precedence(&operands[0])?,
            Expr::Compound { op, .. } => op.info().precedence,
            Expr::UnaryOp { op, .. } => op.info().precedence,
            Expr::Custom { symbol, .. } => self.custom_info(symbol)?.precedence,
            Expr::Property { .. } | Expr::HasLabels { .. } => precedence::POSTFIX,
            Expr::Literal(Literal::Int(i)) if *i < 0 => precedence::UNARY,
            Expr::Literal(Literal::Float(f)) if f.is_sign_negative() => precedence::UNARY,
            _ => precedence::ATOM,
        })
    }

    fn custom_info(&self, symbol: &str) -> Result<OperatorInfo> {
        self.config
            .custom_operators
            .get(symbol)
            .copied()
            .ok_or_else(|| Error::AmbiguousPrecedence { operator: symbol.to_owned() })
    }

    fn operand(&self, parent: OperatorInfo, child: &Expr, side: Side, same_operator: bool) -> Result<String> {
        let text = self.expr(child)?;
        Ok(if needs_parens(parent, self.precedence(child)?, side, same_operator) {
            format!("({text})")
        } else {
            text
        })
    }

    /// Operand of a postfix or prefix operator: parenthesized only when it
    /// binds looser.
    fn tight_operand(&self, level: u8, child: &Expr) -> Result<String> {
        let text = self.expr(child)?;
        Ok(if self.precedence(child)? < level { format!("({text})") } else { text })
    }

    fn expr(&self, expr: &Expr) -> Result<String> {
        Ok(match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Variable(name) => self.variable(name),
            Expr::Parameter(Parameter::Named(name)) => format!("${}", escape_parameter(name)),
            Expr::Parameter(Parameter::Positional(index)) => format!("${index}"),
            Expr::Property { expr, key } => {
                format!("{}.{}", self.tight_operand(precedence::POSTFIX, expr)?, escape_name(key, false))
            }
            Expr::HasLabels { expr, labels } => format!(
                "{}{}",
                self.tight_operand(precedence::POSTFIX, expr)?,
                self.label_list(labels, LabelJoin::All)
            ),
            Expr::FunctionCall { name, args, distinct } => {
                let name = name.split('.').map(|s| escape_name(s, false)).collect::<Vec<_>>().join(".");
                let prefix = if *distinct { "DISTINCT " } else { "" };
                format!("{name}({prefix}{})", self.expr_list(args)?)
            }
            Expr::BinaryOp { left, op, right } => {
                let info = op.info();
                let same = |e: &Expr| binary_operator_of(e) == Some(*op);
                format!(
                    "{} {} {}",
                    self.operand(info, left, Side::Left, same(left))?,
                    op.symbol(),
                    self.operand(info, right, Side::Right, same(right))?
                )
            }
            Expr::Compound { op, operands } => match operands.as_slice() {
                [] => return Err(Error::UnsupportedNodeKind("empty compound condition".into())),
                [single] => self.expr(single)?,
                _ => {
                    let binary = op.as_binary();
                    let info = binary.info();
                    let rendered = operands
                        .iter()
                        .enumerate()
                        .map(|(i, e)| {
                            let side = if i == 0 { Side::Left } else { Side::Right };
                            self.operand(info, e, side, binary_operator_of(e) == Some(binary))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    rendered.join(&format!(" {} ", binary.symbol()))
                }
            },
            Expr::UnaryOp { op, expr } => match op {
                UnaryOp::Not => format!("NOT {}", self.tight_operand(precedence::NOT, expr)?),
                UnaryOp::Negate => {
                    let inner = self.tight_operand(precedence::UNARY, expr)?;
                    if inner.starts_with('-') { format!("-({inner})") } else { format!("-{inner}") }
                }
                UnaryOp::IsNull | UnaryOp::IsNotNull => format!(
                    "{} {}",
                    self.operand(op.info(), expr, Side::Left, false)?,
                    op.symbol()
                ),
            },
            Expr::Custom { symbol, left, right } => {
                let info = self.custom_info(symbol)?;
                let same = |e: &Expr| matches!(e, Expr::Custom { symbol: s, .. } if s == symbol);
                format!(
                    "{} {symbol} {}",
                    self.operand(info, left, Side::Left, same(left))?,
                    self.operand(info, right, Side::Right, same(right))?
                )
            }
            Expr::List(items) => format!("[{}]", self.expr_list(items)?),
            Expr::Map(map) => self.map(map)?,
            Expr::Case { operand, whens, else_expr } => {
                let mut s = String::from("CASE");
                if let Some(operand) = operand {
                    s.push(' ');
                    s.push_str(&self.expr(operand)?);
                }
                for (when, then) in whens {
                    s.push_str(&format!(" WHEN {} THEN {}", self.expr(when)?, self.expr(then)?));
                }
                if let Some(else_expr) = else_expr {
                    s.push_str(&format!(" ELSE {}", self.expr(else_expr)?));
                }
                s.push_str(" END");
                s
            }
            Expr::Exists(sub) => {
                if sub.patterns.is_empty() {
                    return Err(Error::UnsupportedNodeKind("EXISTS without a pattern".into()));
                }
                let mut s = format!("EXISTS {{ {}", self.paths(&sub.patterns)?);
                self.where_suffix(&mut s, sub.where_clause.as_ref())?;
                s.push_str(" }");
                s
            }
            Expr::Star => "*".to_owned(),
        })
    }

    fn map(&self, map: &MapExpr) -> Result<String> {
        let entries = map
            .iter()
            .map(|(k, v)| Ok(format!("{}: {}", escape_name(k, false), self.expr(v)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{{{}}}", entries.join(", ")))
    }
}

fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Null => "NULL".to_owned(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::NaN => "NaN".to_owned(),
        Literal::Float(f) if f.is_infinite() => {
            if *f > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() }
        }
        Literal::Float(f) if f.is_nan() => "NaN".to_owned(),
        Literal::Float(f) => format!("{f:?}"),
        Literal::String(s) => quote(s),
    }
}

/// Single-quoted string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
