//! End-to-end tests for the builder layer and the canonical renderer.
//!
//! Each test assembles a statement with `StatementBuilder` and checks the
//! exact text it renders to.

use cypher_dsl::cypher::builder::{any_node, node};
use cypher_dsl::cypher::precedence::{Associativity, OperatorInfo};
use cypher_dsl::cypher::ast::{RemoveItem, SetItem};
use cypher_dsl::{Error, Expr, Pattern, RelPattern, RenderConfig, StatementBuilder};
use pretty_assertions::assert_eq;

// ============================================================================
// 1. Reading clauses
// ============================================================================

#[test]
fn test_match_where_return() {
    let movie = node("Movie").unwrap().named("m").unwrap().with_property("title", "The Matrix").unwrap();
    let person = node("Person").unwrap().named("p").unwrap();
    let statement = StatementBuilder::new()
        .matching([movie.relationship_from(person, ["ACTED_IN"]).unwrap()])
        .unwrap()
        .where_(Expr::var("p").unwrap().property("born").unwrap().gte(Expr::param("born").unwrap()))
        .unwrap()
        .returning([Expr::var("p").unwrap()])
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        statement.cypher().unwrap(),
        "MATCH (m:Movie {title: 'The Matrix'})<-[:ACTED_IN]-(p:Person) WHERE p.born >= $born RETURN p"
    );
}

#[test]
fn test_always_escape_names_only_touches_labels_and_types() {
    let movie = node("Movie").unwrap().named("m").unwrap();
    let statement = StatementBuilder::new()
        .matching([movie.relationship_to(any_node(), ["ACTED_IN"]).unwrap()])
        .unwrap()
        .returning([Expr::var("m").unwrap()])
        .unwrap()
        .build()
        .unwrap();

    let config = RenderConfig { always_escape_names: true, ..Default::default() };
    assert_eq!(statement.cypher_with(&config).unwrap(), "MATCH (m:`Movie`)-[:`ACTED_IN`]->() RETURN m");
}

#[test]
fn test_optional_match_with_projection_modifiers() {
    let n = node("Person").unwrap().named("n").unwrap();
    let name = Expr::var("n").unwrap().property("name").unwrap();
    let statement = StatementBuilder::new()
        .optional_matching([Pattern::from(n)])
        .unwrap()
        .with([Expr::var("n").unwrap().alias("person").unwrap()])
        .unwrap()
        .where_(Expr::var("person").unwrap().is_not_null())
        .unwrap()
        .returning([name.clone().alias("name").unwrap()])
        .unwrap()
        .distinct()
        .unwrap()
        .order_by([name.descending()])
        .unwrap()
        .skip(5)
        .unwrap()
        .limit(10)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        statement.cypher().unwrap(),
        "OPTIONAL MATCH (n:Person) WITH n AS person WHERE person IS NOT NULL \
         RETURN DISTINCT n.name AS name ORDER BY n.name DESC SKIP 5 LIMIT 10"
    );
}

#[test]
fn test_second_where_is_joined_with_and() {
    let statement = StatementBuilder::new()
        .matching([Pattern::from(any_node().named("n").unwrap())])
        .unwrap()
        .where_(Expr::var("n").unwrap().property("a").unwrap().eq(1))
        .unwrap()
        .where_(Expr::var("n").unwrap().property("b").unwrap().eq(2))
        .unwrap()
        .returning([Expr::var("n").unwrap()])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(statement.cypher().unwrap(), "MATCH (n) WHERE n.a = 1 AND n.b = 2 RETURN n");
}

#[test]
fn test_multi_label_and_alternation() {
    let both = node("Person").unwrap().named("a").unwrap().with_label("Actor").unwrap();
    let either = any_node().named("b").unwrap().with_labels(["Person", "Actor"]).unwrap().any_of_labels();
    let odd = node("Movie Star").unwrap();
    let statement = StatementBuilder::new()
        .matching([Pattern::from(both), Pattern::from(either), Pattern::from(odd)])
        .unwrap()
        .returning([Expr::count_star()])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        statement.cypher().unwrap(),
        "MATCH (a:Person:Actor), (b:Person|Actor), (:`Movie Star`) RETURN count(*)"
    );
}

#[test]
fn test_relationship_details() {
    let rel = RelPattern::outgoing(["KNOWS", "LIKES"])
        .unwrap()
        .named("r")
        .unwrap()
        .with_length(Some(1), Some(3))
        .with_property("since", 2020)
        .unwrap();
    let path = Pattern::new(any_node().named("a").unwrap())
        .then(rel, any_node().named("b").unwrap())
        .named("p")
        .unwrap();
    let statement = StatementBuilder::new()
        .matching([path])
        .unwrap()
        .returning([Expr::var("p").unwrap()])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        statement.cypher().unwrap(),
        "MATCH p = (a)-[r:KNOWS|LIKES*1..3 {since: 2020}]->(b) RETURN p"
    );
}

#[test]
fn test_call_subquery_and_procedure() {
    let inner = StatementBuilder::new()
        .matching([Pattern::from(node("X").unwrap().named("x").unwrap())])
        .unwrap()
        .returning([Expr::var("x").unwrap()])
        .unwrap()
        .build()
        .unwrap();
    let statement = StatementBuilder::new()
        .call("db.labels", Vec::<Expr>::new(), ["label"])
        .unwrap()
        .call_subquery(inner)
        .unwrap()
        .returning([Expr::var("label").unwrap(), Expr::var("x").unwrap()])
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        statement.cypher().unwrap(),
        "CALL db.labels() YIELD label CALL { MATCH (x:X) RETURN x } RETURN label, x"
    );
    assert_eq!(
        statement.cypher_with(&RenderConfig::pretty()).unwrap(),
        "CALL db.labels() YIELD label\nCALL {\n  MATCH (x:X)\n  RETURN x\n}\nRETURN label, x"
    );
}

// ============================================================================
// 2. Writing clauses
// ============================================================================

#[test]
fn test_create_merge_set_remove_delete() {
    let n = node("Person").unwrap().named("n").unwrap().with_property("id", 1).unwrap();
    let statement = StatementBuilder::new()
        .merge(n)
        .unwrap()
        .on_create_set([SetItem::property("n", "created", true).unwrap()])
        .unwrap()
        .on_match_set([SetItem::property("n", "seen", Expr::var("n").unwrap().property("seen").unwrap().add(1)).unwrap()])
        .unwrap()
        .set([
            SetItem::labels("n", ["Active"]).unwrap(),
            SetItem::merge_properties("n", Expr::map([("flag", Expr::from(true))]).unwrap()).unwrap(),
        ])
        .unwrap()
        .remove([RemoveItem::property("n", "tmp").unwrap(), RemoveItem::labels("n", ["Draft"]).unwrap()])
        .unwrap()
        .detach_delete([Expr::var("n").unwrap()])
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        statement.cypher().unwrap(),
        "MERGE (n:Person {id: 1}) ON CREATE SET n.created = true ON MATCH SET n.seen = n.seen + 1 \
         SET n:Active, n += {flag: true} REMOVE n.tmp, n:Draft DETACH DELETE n"
    );
}

#[test]
fn test_create_multiple_patterns() {
    let statement = StatementBuilder::new()
        .create([
            Pattern::from(node("A").unwrap().named("a").unwrap()),
            node("B").unwrap().named("b").unwrap().relationship_to(node("C").unwrap(), ["REL"]).unwrap(),
        ])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(statement.cypher().unwrap(), "CREATE (a:A), (b:B)-[:REL]->(:C)");
}

// ============================================================================
// 3. Expressions
// ============================================================================

fn render_expr(expr: Expr) -> String {
    let statement = StatementBuilder::new().returning([expr]).unwrap().build().unwrap();
    statement.cypher().unwrap().trim_start_matches("RETURN ").to_owned()
}

#[test]
fn test_expression_precedence() {
    let a = || Expr::var("a").unwrap();
    let b = || Expr::var("b").unwrap();
    let c = || Expr::var("c").unwrap();

    assert_eq!(render_expr(a().add(b()).mul(c())), "(a + b) * c");
    assert_eq!(render_expr(a().mul(b()).add(c())), "a * b + c");
    assert_eq!(render_expr(a().sub(b().sub(c()))), "a - (b - c)");
    assert_eq!(render_expr(a().sub(b()).sub(c())), "a - b - c");
    assert_eq!(render_expr(a().or(b()).and(c())), "(a OR b) AND c");
    assert_eq!(render_expr(a().and(b()).and(c())), "a AND b AND c");
    assert_eq!(render_expr(a().eq(b()).not()), "NOT a = b");
    assert_eq!(render_expr(a().eq(b()).eq(c())), "(a = b) = c");
    assert_eq!(render_expr(Expr::from(-3).negate()), "-(-3)");
}

#[test]
fn test_expression_forms() {
    let n = || Expr::var("n").unwrap();
    assert_eq!(render_expr(n().property("name").unwrap().starts_with("A")), "n.name STARTS WITH 'A'");
    assert_eq!(render_expr(n().has_labels(["Person"]).unwrap()), "n:Person");
    assert_eq!(render_expr(Expr::list([Expr::from(1), Expr::from(2.5), Expr::null()])), "[1, 2.5, NULL]");
    assert_eq!(render_expr(Expr::from("it's")), "'it\\'s'");
    assert_eq!(render_expr(Expr::positional_param(0)), "$0");
    assert_eq!(render_expr(Expr::from(f64::NAN)), "NaN");
    assert_eq!(render_expr(Expr::distinct_function("collect", [n()]).unwrap()), "collect(DISTINCT n)");
    assert_eq!(
        render_expr(Expr::case(None, [(n().is_null(), Expr::from(0))], Some(Expr::from(1)))),
        "CASE WHEN n IS NULL THEN 0 ELSE 1 END"
    );
}

#[test]
fn test_exists_subquery() {
    let pattern = any_node().named("n").unwrap().relationship_to(node("Person").unwrap(), ["KNOWS"]).unwrap();
    let cond = Expr::exists([pattern], Some(Expr::var("n").unwrap().property("age").unwrap().gt(3)));
    assert_eq!(render_expr(cond), "EXISTS { (n)-[:KNOWS]->(:Person) WHERE n.age > 3 }");
}

#[test]
fn test_custom_operator_requires_precedence() {
    let expr = Expr::var("a").unwrap().custom("<=>", Expr::var("b").unwrap()).unwrap();
    let statement = StatementBuilder::new().returning([expr]).unwrap().build().unwrap();

    assert_eq!(
        statement.cypher().unwrap_err(),
        Error::AmbiguousPrecedence { operator: "<=>".into() }
    );

    let config = RenderConfig::default()
        .with_custom_operator("<=>", OperatorInfo::new(5, Associativity::None));
    assert_eq!(statement.cypher_with(&config).unwrap(), "RETURN a <=> b");
}

// ============================================================================
// 4. Builder contract
// ============================================================================

#[test]
fn test_finalized_builder_rejects_steps() {
    let builder = StatementBuilder::new().returning([Expr::from(1)]).unwrap();
    let first = builder.build().unwrap();
    assert!(builder.is_finalized());
    assert_eq!(builder.build().unwrap(), first);

    let err = builder.clone().returning([Expr::from(2)]).unwrap_err();
    assert_eq!(err, Error::BuilderAlreadyFinalized);
}

#[test]
fn test_local_validation() {
    assert!(matches!(node(""), Err(Error::InvalidIdentifier { .. })));
    assert!(matches!(
        StatementBuilder::new().where_(Expr::from(true)),
        Err(Error::MisplacedClause(_))
    ));
    assert!(matches!(StatementBuilder::new().matching(Vec::<Pattern>::new()), Err(Error::MisplacedClause(_))));
    assert!(matches!(StatementBuilder::new().build(), Err(Error::MisplacedClause(_))));
    assert!(matches!(any_node().as_expr(), Err(Error::NoSymbolicName(_))));
}
