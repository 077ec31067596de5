//! Scope-aware traversal that fills a [`StatementCatalog`].
//!
//! The visitor walks a finished statement once, depth first. It tracks where
//! it is with a small state stack and resolves variables through a
//! [`ScopeChain`], so a variable written with labels in one clause keeps
//! them when it is referenced bare in a later one:
//!
//! ```text
//! MATCH (m:Movie) ... MATCH (m)-[:FOO]->(f:FooNode)
//!                           ^ resolves to {Movie}
//! ```
//!
//! A relationship is recorded once both its endpoints have been resolved.
//! Properties on a variable with no known labels or types are dropped.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::scope::ScopeChain;
use super::{CatalogBuilder, StatementCatalog};
use crate::cypher::ast::*;
use crate::model::{Property, PropertyContainer, SymbolicName, Token};
use crate::{Error, Result};

/// Where in the tree the visitor currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    OutsidePattern,
    InsideNodePattern,
    InsideRelationshipPattern,
    InsidePropertyAccess,
    InsideSubqueryScope,
}

/// Catalog a single statement.
pub fn build_catalog(statement: &Statement) -> Result<StatementCatalog> {
    let mut visitor = CatalogVisitor::new();
    visitor.visit_statement(statement)?;
    Ok(visitor.finish())
}

impl Statement {
    /// Schema facts of this statement.
    pub fn catalog(&self) -> Result<StatementCatalog> {
        build_catalog(self)
    }
}

/// Accumulates schema facts over one or more statements.
#[derive(Debug, Default)]
pub struct CatalogVisitor {
    scopes: ScopeChain,
    states: Vec<VisitState>,
    catalog: CatalogBuilder,
}

impl CatalogVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> VisitState {
        self.states.last().copied().unwrap_or(VisitState::OutsidePattern)
    }

    pub fn scopes(&self) -> &ScopeChain {
        &self.scopes
    }

    pub fn finish(self) -> StatementCatalog {
        let catalog = self.catalog.build();
        debug!(
            labels = catalog.node_labels().len(),
            types = catalog.relationship_types().len(),
            properties = catalog.properties().len(),
            "catalog built"
        );
        catalog
    }

    fn enter(&mut self, state: VisitState) {
        self.states.push(state);
    }

    fn exit(&mut self) {
        self.states.pop();
    }

    fn enter_scope(&mut self) {
        self.scopes.push();
        self.enter(VisitState::InsideSubqueryScope);
        debug!(depth = self.scopes.depth(), "scope pushed");
    }

    fn exit_scope(&mut self) {
        self.exit();
        self.scopes.pop();
        debug!(depth = self.scopes.depth(), "scope popped");
    }

    // ========================================================================
    // Clauses
    // ========================================================================

    pub fn visit_statement(&mut self, statement: &Statement) -> Result<()> {
        for clause in &statement.clauses {
            self.visit_clause(clause)?;
        }
        Ok(())
    }

    fn visit_clause(&mut self, clause: &Clause) -> Result<()> {
        trace!(clause = clause.kind_name(), "visiting clause");
        match clause {
            Clause::Match(m) => {
                for pattern in &m.patterns {
                    self.visit_pattern(pattern)?;
                }
                self.visit_optional(m.where_clause.as_ref())?;
            }
            Clause::With(w) => {
                self.visit_projection(&w.projection)?;
                self.visit_optional(w.where_clause.as_ref())?;
            }
            Clause::Return(p) => self.visit_projection(p)?,
            Clause::CallSubquery(inner) => {
                self.enter_scope();
                let result = self.visit_statement(inner);
                self.exit_scope();
                result?;
            }
            Clause::CallProcedure(call) => {
                for arg in &call.args {
                    self.visit_expr(arg)?;
                }
            }
            Clause::Create(c) => {
                for pattern in &c.patterns {
                    self.visit_pattern(pattern)?;
                }
            }
            Clause::Merge(m) => {
                self.visit_pattern(&m.pattern)?;
                for item in m.on_create.iter().chain(&m.on_match) {
                    self.visit_set_item(item)?;
                }
            }
            Clause::Delete(d) => {
                for expr in &d.exprs {
                    self.visit_expr(expr)?;
                }
            }
            Clause::Set(s) => {
                for item in &s.items {
                    self.visit_set_item(item)?;
                }
            }
            Clause::Remove(r) => {
                for item in &r.items {
                    self.visit_remove_item(item)?;
                }
            }
        }
        Ok(())
    }

    fn visit_projection(&mut self, projection: &Projection) -> Result<()> {
        for item in &projection.items {
            self.visit_expr(&item.expr)?;
            // `WITH m AS movie` carries the binding over to the alias
            if let (Expr::Variable(source), Some(alias)) = (&item.expr, &item.alias) {
                if let Some(binding) = self.scopes.resolve(source.as_str()) {
                    let (kind, tokens) = (binding.kind, binding.tokens.clone());
                    self.scopes.bind(alias.as_str(), kind, tokens);
                }
            }
        }
        for order in &projection.order_by {
            self.visit_expr(&order.expr)?;
        }
        self.visit_optional(projection.skip.as_ref())?;
        self.visit_optional(projection.limit.as_ref())
    }

    fn visit_set_item(&mut self, item: &SetItem) -> Result<()> {
        match item {
            SetItem::Property { variable, key, value } => {
                self.record_variable_property(variable, key)?;
                self.visit_expr(value)
            }
            SetItem::AllProperties { variable, value } | SetItem::MergeProperties { variable, value } => {
                if let Expr::Map(map) = value {
                    for key in map.keys() {
                        self.record_variable_property(variable, key)?;
                    }
                }
                self.visit_expr(value)
            }
            SetItem::Labels { variable, labels } => self.bind_labels(variable, labels),
        }
    }

    fn visit_remove_item(&mut self, item: &RemoveItem) -> Result<()> {
        match item {
            RemoveItem::Property { variable, key } => self.record_variable_property(variable, key),
            RemoveItem::Labels { labels, .. } => {
                for label in labels {
                    self.catalog.add_label(label);
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    fn visit_pattern(&mut self, pattern: &Pattern) -> Result<()> {
        // (relationship, labels on its left) waiting for the node on its right
        let mut pending: Option<(&RelPattern, BTreeSet<Token>)> = None;
        let mut previous: Option<BTreeSet<Token>> = None;

        for element in &pattern.elements {
            match element {
                PatternElement::Node(node) if pending.is_none() && previous.is_none() => {
                    previous = Some(self.visit_node(node)?);
                }
                PatternElement::Node(node) if pending.is_some() => {
                    let right = self.visit_node(node)?;
                    if let Some((rel, left)) = pending.take() {
                        self.record_relationship(rel, &left, &right);
                    }
                    previous = Some(right);
                }
                PatternElement::Relationship(rel) if pending.is_none() => {
                    let left = previous
                        .take()
                        .ok_or_else(|| Error::UnsupportedNodeKind("relationship without a node before it".into()))?;
                    self.visit_relationship(rel)?;
                    pending = Some((rel, left));
                }
                PatternElement::Node(_) => {
                    return Err(Error::UnsupportedNodeKind("adjacent node patterns".into()));
                }
                PatternElement::Relationship(_) => {
                    return Err(Error::UnsupportedNodeKind("adjacent relationship patterns".into()));
                }
            }
        }

        if pending.is_some() {
            return Err(Error::UnsupportedNodeKind("dangling relationship".into()));
        }
        if previous.is_none() {
            return Err(Error::UnsupportedNodeKind("empty pattern".into()));
        }
        Ok(())
    }

    /// Returns the node's resolved labels.
    fn visit_node(&mut self, node: &NodePattern) -> Result<BTreeSet<Token>> {
        self.enter(VisitState::InsideNodePattern);
        let result = self.visit_element(
            node.variable.as_ref(),
            &node.labels,
            node.properties.as_ref(),
            PropertyContainer::Node,
        );
        self.exit();
        result
    }

    fn visit_relationship(&mut self, rel: &RelPattern) -> Result<BTreeSet<Token>> {
        self.enter(VisitState::InsideRelationshipPattern);
        let result = self.visit_element(
            rel.variable.as_ref(),
            &rel.types,
            rel.properties.as_ref(),
            PropertyContainer::Relationship,
        );
        self.exit();
        result
    }

    fn visit_element(
        &mut self,
        variable: Option<&SymbolicName>,
        tokens: &[Token],
        properties: Option<&MapExpr>,
        kind: PropertyContainer,
    ) -> Result<BTreeSet<Token>> {
        for token in tokens {
            match kind {
                PropertyContainer::Node => self.catalog.add_label(token),
                PropertyContainer::Relationship => self.catalog.add_type(token),
            }
        }
        let owners = match variable {
            Some(name) => self.scopes.bind(name.as_str(), kind, tokens.iter().cloned()).tokens.clone(),
            None => tokens.iter().cloned().collect(),
        };
        if let Some(map) = properties {
            for (key, value) in map.iter() {
                self.record_property(key, &owners, kind)?;
                self.visit_expr(value)?;
            }
        }
        Ok(owners)
    }

    fn record_relationship(&mut self, rel: &RelPattern, left: &BTreeSet<Token>, right: &BTreeSet<Token>) {
        for rel_type in &rel.types {
            trace!(rel_type = rel_type.value(), direction = ?rel.direction, "relationship recorded");
            self.catalog.add_relationship(rel_type, rel.direction, left, right);
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn visit_optional(&mut self, expr: Option<&Expr>) -> Result<()> {
        match expr {
            Some(expr) => self.visit_expr(expr),
            None => Ok(()),
        }
    }

    fn visit_exprs<'e>(&mut self, exprs: impl IntoIterator<Item = &'e Expr>) -> Result<()> {
        for expr in exprs {
            self.visit_expr(expr)?;
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) | Expr::Variable(_) | Expr::Star => Ok(()),
            Expr::Parameter(Parameter::Named(name)) => {
                self.catalog.add_parameter(name);
                Ok(())
            }
            Expr::Parameter(Parameter::Positional(_)) => Ok(()),
            Expr::Property { expr: target, key } => match target.as_ref() {
                Expr::Variable(variable) => {
                    self.enter(VisitState::InsidePropertyAccess);
                    let result = self.record_variable_property(variable, key);
                    self.exit();
                    result
                }
                other => self.visit_expr(other),
            },
            Expr::HasLabels { expr: target, labels } => match target.as_ref() {
                Expr::Variable(variable) => self.bind_labels(variable, labels),
                other => {
                    for label in labels {
                        self.catalog.add_label(label);
                    }
                    self.visit_expr(other)
                }
            },
            Expr::FunctionCall { args, .. } => self.visit_exprs(args),
            Expr::BinaryOp { left, right, .. } | Expr::Custom { left, right, .. } => {
                self.visit_expr(left)?;
                self.visit_expr(right)
            }
            Expr::Compound { operands, .. } => self.visit_exprs(operands),
            Expr::UnaryOp { expr, .. } => self.visit_expr(expr),
            Expr::List(items) => self.visit_exprs(items),
            Expr::Map(map) => self.visit_exprs(map.iter().map(|(_, v)| v)),
            Expr::Case { operand, whens, else_expr } => {
                self.visit_optional(operand.as_deref())?;
                for (when, then) in whens {
                    self.visit_expr(when)?;
                    self.visit_expr(then)?;
                }
                self.visit_optional(else_expr.as_deref())
            }
            Expr::Exists(sub) => {
                self.enter_scope();
                let result = self.visit_exists(sub);
                self.exit_scope();
                result
            }
        }
    }

    fn visit_exists(&mut self, sub: &ExistsSubquery) -> Result<()> {
        for pattern in &sub.patterns {
            self.visit_pattern(pattern)?;
        }
        self.visit_optional(sub.where_clause.as_ref())
    }

    // ========================================================================
    // Facts
    // ========================================================================

    /// `r:KNOWS` on a relationship variable tests its type, so the tokens
    /// are recorded as relationship types for such variables.
    fn bind_labels(&mut self, variable: &SymbolicName, labels: &[Token]) -> Result<()> {
        let kind = match self.scopes.resolve(variable.as_str()) {
            Some(binding) => binding.kind,
            None => PropertyContainer::Node,
        };
        let tokens = match kind {
            PropertyContainer::Node => labels.to_vec(),
            PropertyContainer::Relationship => labels
                .iter()
                .map(|label| Token::relationship_type(label.value()))
                .collect::<Result<Vec<_>>>()?,
        };
        for token in &tokens {
            match kind {
                PropertyContainer::Node => self.catalog.add_label(token),
                PropertyContainer::Relationship => self.catalog.add_type(token),
            }
        }
        self.scopes.bind(variable.as_str(), kind, tokens);
        Ok(())
    }

    fn record_variable_property(&mut self, variable: &SymbolicName, key: &str) -> Result<()> {
        match self.scopes.resolve(variable.as_str()) {
            Some(binding) => {
                let (owners, kind) = (binding.tokens.clone(), binding.kind);
                self.record_property(key, &owners, kind)
            }
            None => {
                trace!(variable = variable.as_str(), key, "property on unbound variable dropped");
                Ok(())
            }
        }
    }

    fn record_property(&mut self, key: &str, owners: &BTreeSet<Token>, kind: PropertyContainer) -> Result<()> {
        if owners.is_empty() {
            trace!(key, "property without owning tokens dropped");
            return Ok(());
        }
        let property = Property::new(key, owners.iter().cloned(), kind)?;
        trace!(key, owners = owners.len(), state = ?self.state(), "property recorded");
        self.catalog.add_property(property);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::builder::{any_node, node, StatementBuilder};

    fn label(v: &str) -> Token {
        Token::label(v).unwrap()
    }

    fn rel(v: &str) -> Token {
        Token::relationship_type(v).unwrap()
    }

    #[test]
    fn test_union_binding_across_clauses() {
        let stmt = StatementBuilder::new()
            .matching([Pattern::from(node("Movie").unwrap().named("m").unwrap())])
            .unwrap()
            .matching([any_node()
                .named("m")
                .unwrap()
                .relationship_to(node("FooNode").unwrap().named("f").unwrap(), ["FOO"])
                .unwrap()])
            .unwrap()
            .returning([Expr::var("m").unwrap()])
            .unwrap()
            .build()
            .unwrap();
        let catalog = stmt.catalog().unwrap();
        assert!(catalog.outgoing_types(&label("Movie")).contains(&rel("FOO")));
        assert!(catalog.incoming_types(&label("FooNode")).contains(&rel("FOO")));
    }

    #[test]
    fn test_multi_label_property_owned_by_whole_set() {
        let n = node("Person").unwrap().with_label("Actor").unwrap().any_of_labels().with_property("b", true).unwrap();
        let stmt = StatementBuilder::new()
            .matching([Pattern::from(n)])
            .unwrap()
            .returning([Expr::count_star()])
            .unwrap()
            .build()
            .unwrap();
        let catalog = stmt.catalog().unwrap();
        let expected = Property::on_node("b", [label("Person"), label("Actor")]).unwrap();
        assert_eq!(catalog.properties().iter().collect::<Vec<_>>(), vec![&expected]);
    }

    #[test]
    fn test_unlabeled_property_is_dropped() {
        let stmt = StatementBuilder::new()
            .matching([Pattern::from(any_node().named("n").unwrap())])
            .unwrap()
            .where_(Expr::var("n").unwrap().property("age").unwrap().gt(3))
            .unwrap()
            .returning([Expr::var("n").unwrap()])
            .unwrap()
            .build()
            .unwrap();
        assert!(stmt.catalog().unwrap().properties().is_empty());
    }

    #[test]
    fn test_subquery_bindings_do_not_leak() {
        let inner = StatementBuilder::new()
            .matching([Pattern::from(node("Inner").unwrap().named("x").unwrap())])
            .unwrap()
            .returning([Expr::var("x").unwrap()])
            .unwrap()
            .build()
            .unwrap();
        let mut visitor = CatalogVisitor::new();
        visitor.visit_statement(&Statement { clauses: vec![Clause::CallSubquery(Box::new(inner))] }).unwrap();
        assert!(visitor.scopes().resolve("x").is_none());
        assert_eq!(visitor.state(), VisitState::OutsidePattern);
        assert!(visitor.finish().node_labels().contains(&label("Inner")));
    }

    #[test]
    fn test_relationship_property_and_variable() {
        let p = Pattern::new(node("Person").unwrap().named("p").unwrap()).then(
            RelPattern::outgoing(["ACTED_IN"]).unwrap().named("a").unwrap(),
            node("Movie").unwrap(),
        );
        let stmt = StatementBuilder::new()
            .matching([p])
            .unwrap()
            .where_(Expr::var("a").unwrap().property("starring").unwrap().eq(true))
            .unwrap()
            .returning([Expr::var("p").unwrap()])
            .unwrap()
            .build()
            .unwrap();
        let catalog = stmt.catalog().unwrap();
        let expected = Property::on_relationship("starring", [rel("ACTED_IN")]).unwrap();
        assert!(catalog.properties().contains(&expected));
    }

    #[test]
    fn test_malformed_pattern() {
        let pattern = Pattern {
            variable: None,
            elements: vec![PatternElement::Relationship(RelPattern::outgoing(["R"]).unwrap())],
        };
        let stmt = Statement {
            clauses: vec![Clause::Match(MatchClause { optional: false, patterns: vec![pattern], where_clause: None })],
        };
        assert!(matches!(build_catalog(&stmt), Err(Error::UnsupportedNodeKind(_))));
    }

    #[test]
    fn test_set_labels_extend_binding() {
        let stmt = StatementBuilder::new()
            .matching([Pattern::from(any_node().named("n").unwrap())])
            .unwrap()
            .set([
                SetItem::labels("n", ["Tagged"]).unwrap(),
                SetItem::property("n", "at", 1).unwrap(),
            ])
            .unwrap()
            .build()
            .unwrap();
        let catalog = stmt.catalog().unwrap();
        assert!(catalog.properties().contains(&Property::on_node("at", [label("Tagged")]).unwrap()));
    }

    #[test]
    fn test_label_predicate_on_relationship_is_a_type() {
        // MATCH ()-[r:KNOWS]->() WHERE r:KNOWS RETURN r.since
        let p = Pattern::new(any_node()).then(RelPattern::outgoing(["KNOWS"]).unwrap().named("r").unwrap(), any_node());
        let stmt = StatementBuilder::new()
            .matching([p])
            .unwrap()
            .where_(Expr::var("r").unwrap().has_labels(["KNOWS"]).unwrap())
            .unwrap()
            .returning([Expr::var("r").unwrap().property("since").unwrap()])
            .unwrap()
            .build()
            .unwrap();
        let catalog = stmt.catalog().unwrap();
        assert!(catalog.node_labels().is_empty());
        assert_eq!(catalog.relationship_types(), &BTreeSet::from([rel("KNOWS")]));
        let since = catalog.properties().iter().find(|p| p.name() == "since").unwrap();
        assert_eq!(since.owning_tokens(), &BTreeSet::from([rel("KNOWS")]));
        assert_eq!(since.container(), PropertyContainer::Relationship);
    }

    #[test]
    fn test_label_predicate_types_untyped_relationship() {
        // MATCH ()-[r]->() WHERE r:LIKES RETURN r.weight
        let p = Pattern::new(any_node()).then(RelPattern::outgoing(Vec::<String>::new()).unwrap().named("r").unwrap(), any_node());
        let stmt = StatementBuilder::new()
            .matching([p])
            .unwrap()
            .where_(Expr::var("r").unwrap().has_labels(["LIKES"]).unwrap())
            .unwrap()
            .returning([Expr::var("r").unwrap().property("weight").unwrap()])
            .unwrap()
            .build()
            .unwrap();
        let catalog = stmt.catalog().unwrap();
        assert!(!catalog.node_labels().contains(&label("LIKES")));
        assert!(catalog.properties().contains(&Property::on_relationship("weight", [rel("LIKES")]).unwrap()));
    }
}
