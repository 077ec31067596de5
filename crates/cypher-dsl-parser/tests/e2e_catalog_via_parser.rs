//! End-to-end: Cypher text → parser → tree builder → catalog and renderer.

use std::collections::{BTreeMap, BTreeSet};

use cypher_dsl::{Property, PropertyContainer, RenderConfig, Token};
use cypher_dsl_parser::{parse, ParseError};
use pretty_assertions::assert_eq;

fn label(v: &str) -> Token {
    Token::label(v).unwrap()
}

fn rel(v: &str) -> Token {
    Token::relationship_type(v).unwrap()
}

fn labels(vs: &[&str]) -> BTreeSet<Token> {
    vs.iter().map(|v| label(v)).collect()
}

fn types(vs: &[&str]) -> BTreeSet<Token> {
    vs.iter().map(|v| rel(v)).collect()
}

// ============================================================================
// Catalog scenarios
// ============================================================================

#[test]
fn test_simple_show_case() {
    let statement = parse(
        "MATCH (m:`Movie` {title: 'The Matrix'})<-[a:`ACTED_IN`]-(p:`Person`)
         WHERE p.born >= $born
         RETURN p",
    )
    .unwrap();

    let catalog = statement.catalog().unwrap();
    assert_eq!(catalog.node_labels(), &labels(&["Movie", "Person"]));
    assert_eq!(
        catalog.properties(),
        &BTreeSet::from([
            Property::on_node("title", [label("Movie")]).unwrap(),
            Property::on_node("born", [label("Person")]).unwrap(),
        ])
    );

    let config = RenderConfig { always_escape_names: true, ..Default::default() };
    assert_eq!(
        statement.cypher_with(&config).unwrap(),
        "MATCH (m:`Movie` {title: 'The Matrix'})<-[a:`ACTED_IN`]-(p:`Person`) WHERE p.born >= $born RETURN p"
    );
}

#[test]
fn test_map_of_labels_and_properties() {
    let statement = parse(
        "MATCH (m:`Movie` {title: 'The Matrix'})<-[a:`ACTED_IN`]-(p:`Person`|Actor {b:true})
         WHERE p.born >= $born
           AND a.starring = true
         RETURN p",
    )
    .unwrap();
    let catalog = statement.catalog().unwrap();

    assert!(catalog.properties().iter().any(|p| p.owning_tokens() == &labels(&["Person", "Actor"])));

    let mut by_labels: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for property in catalog.properties().iter().filter(|p| p.container() == PropertyContainer::Node) {
        let key = property.owning_tokens().iter().map(Token::value).collect::<Vec<_>>().join(",");
        by_labels.entry(key).or_default().push(property.name().to_owned());
    }
    for names in by_labels.values_mut() {
        names.sort();
    }
    assert_eq!(
        by_labels,
        BTreeMap::from([
            ("Actor,Person".to_owned(), vec!["b".to_owned(), "born".to_owned()]),
            ("Movie".to_owned(), vec!["title".to_owned()]),
        ])
    );

    let acted_in = rel("ACTED_IN");
    let starring: Vec<_> = catalog.properties_of(&acted_in).collect();
    assert_eq!(starring.len(), 1);
    assert_eq!(starring[0].name(), "starring");
    assert_eq!(starring[0].container(), PropertyContainer::Relationship);
}

#[test]
fn test_relationships_sources_and_targets() {
    let statement = parse(
        "MATCH (m:`Movie` {title: 'The Matrix'})<-[a:`ACTED_IN`]-(p:`Person`|Actor {b:true})
         MATCH () -[:WHATEVER]-> (m)
         MATCH (x:X) -[:UNDIRECTED]- (y:Y)
         MATCH (m) -[:UNDIRECTED]- (y)
         WHERE p.born >= $born
           AND a.starring = true
         WITH m
         MATCH (m) -[:FOO]->(f:FooNode)
         CALL {
             MATCH (:LabelA) -[:A_REL]-> (n:X)
         }
         RETURN p",
    )
    .unwrap();
    let catalog = statement.catalog().unwrap();

    assert_eq!(catalog.outgoing_types(&label("Person")), &types(&["ACTED_IN"]));
    assert_eq!(catalog.outgoing_types(&label("Movie")), &types(&["FOO"]));
    assert_eq!(catalog.outgoing_types(&label("Actor")), &types(&["ACTED_IN"]));
    assert_eq!(catalog.outgoing_types(&label("LabelA")), &types(&["A_REL"]));

    assert_eq!(catalog.incoming_types(&label("Movie")), &types(&["ACTED_IN", "WHATEVER"]));
    assert_eq!(catalog.incoming_types(&label("FooNode")), &types(&["FOO"]));
    assert_eq!(catalog.incoming_types(&label("X")), &types(&["A_REL"]));

    assert_eq!(catalog.undirected_types(&label("X")), &types(&["UNDIRECTED"]));

    assert_eq!(catalog.target_labels(&rel("ACTED_IN")), &labels(&["Movie"]));
    assert_eq!(catalog.target_labels(&rel("FOO")), &labels(&["FooNode"]));
    assert_eq!(catalog.target_labels(&rel("A_REL")), &labels(&["X"]));
    assert_eq!(catalog.target_labels(&rel("WHATEVER")), &labels(&["Movie"]));
    assert!(catalog.target_labels(&rel("UNDIRECTED")).is_empty());

    assert_eq!(catalog.source_labels(&rel("ACTED_IN")), &labels(&["Person", "Actor"]));
    assert_eq!(catalog.source_labels(&rel("FOO")), &labels(&["Movie"]));
    assert_eq!(catalog.source_labels(&rel("A_REL")), &labels(&["LabelA"]));
    assert!(catalog.source_labels(&rel("WHATEVER")).is_empty());
    assert!(catalog.source_labels(&rel("UNDIRECTED")).is_empty());
}

#[test]
fn test_label_predicate_on_relationship() {
    let catalog = parse("MATCH ()-[r:KNOWS]->() WHERE r:KNOWS RETURN r.since")
        .unwrap()
        .catalog()
        .unwrap();
    assert!(catalog.node_labels().is_empty());
    assert_eq!(catalog.relationship_types(), &types(&["KNOWS"]));
    assert_eq!(
        catalog.properties(),
        &BTreeSet::from([Property::on_relationship("since", [rel("KNOWS")]).unwrap()])
    );
}

#[test]
fn test_parameters_are_collected() {
    let catalog = parse("MATCH (n:N) WHERE n.a = $a AND n.b IN $bs RETURN n LIMIT $0")
        .unwrap()
        .catalog()
        .unwrap();
    let names: Vec<_> = catalog.parameter_names().iter().map(String::as_str).collect();
    assert_eq!(names, vec!["a", "bs"]);
}

// ============================================================================
// Round trips through the renderer
// ============================================================================

fn round_trip(query: &str) -> String {
    parse(query).unwrap().cypher().unwrap()
}

#[test]
fn test_canonical_rendering() {
    let cases = [
        ("match (n:Person) return n", "MATCH (n:Person) RETURN n"),
        (
            "MATCH (a)-->(b)<--(c)--(d) RETURN a",
            "MATCH (a)-->(b)<--(c)--(d) RETURN a",
        ),
        (
            "MATCH (a)-[r:KNOWS|LIKES*1..3]->(b) RETURN r",
            "MATCH (a)-[r:KNOWS|LIKES*1..3]->(b) RETURN r",
        ),
        (
            "MATCH p = (a)-[*]->(b) RETURN p",
            "MATCH p = (a)-[*]->(b) RETURN p",
        ),
        ("RETURN 1 + 2 * 3, (1 + 2) * 3", "RETURN 1 + 2 * 3, (1 + 2) * 3"),
        ("RETURN -2 ^ 2, -(2 ^ 2)", "RETURN -2 ^ 2, -(2 ^ 2)"),
        (
            "MATCH (n) WHERE n.a = 1 OR n.b = 2 AND NOT n.c RETURN n",
            "MATCH (n) WHERE n.a = 1 OR n.b = 2 AND NOT n.c RETURN n",
        ),
        (
            "MATCH (n) WHERE (n.a = 1 OR n.b = 2) AND n:Person:Actor RETURN count(DISTINCT n) AS c",
            "MATCH (n) WHERE (n.a = 1 OR n.b = 2) AND n:Person:Actor RETURN count(DISTINCT n) AS c",
        ),
        (
            "MATCH (n) RETURN n ORDER BY n.name DESC, n.age SKIP 1 LIMIT 10",
            "MATCH (n) RETURN n ORDER BY n.name DESC, n.age SKIP 1 LIMIT 10",
        ),
        ("RETURN $0, $name, NaN", "RETURN $0, $name, NaN"),
    ];
    for (input, expected) in cases {
        assert_eq!(round_trip(input), expected, "input: {input}");
    }
}

#[test]
fn test_writing_clauses_round_trip() {
    let cases = [
        "CREATE (n:Person {name: 'Ada', age: 3})",
        "MERGE (n:Person {id: 1}) ON CREATE SET n.created = true ON MATCH SET n.seen = n.seen + 1",
        "MATCH (n) DETACH DELETE n",
        "MATCH (n) SET n:Archived, n += {flag: true} REMOVE n.tmp, n:Draft",
        "CALL db.labels() YIELD label RETURN label",
    ];
    for input in cases {
        assert_eq!(round_trip(input), input);
    }
}

#[test]
fn test_rendered_text_parses_to_same_tree() {
    let queries = [
        "MATCH (m:Movie {title: 'The Matrix'})<-[:ACTED_IN]-(p:Person) WHERE p.born >= $born RETURN p",
        "MATCH (n:`Odd Label`) WITH n, n.x AS x WHERE x > 1 RETURN DISTINCT x",
        "MATCH (n) WHERE EXISTS { (n)-[:KNOWS]->(:Person) WHERE n.age > 3 } RETURN CASE n.k WHEN 1 THEN 'a' ELSE 'b' END",
        "CALL { MATCH (n) RETURN n } RETURN n",
        "RETURN [1, 2.5, 'x', null, true], {a: 1, b: [2]}",
    ];
    for query in queries {
        let first = parse(query).unwrap();
        let rendered = first.cypher().unwrap();
        let second = parse(&rendered).unwrap();
        assert_eq!(first, second, "rendered: {rendered}");
    }
}

#[test]
fn test_names_that_look_like_numbers_round_trip() {
    assert_eq!(round_trip("MATCH (`NaN`) RETURN `NaN`, `Infinity`.x, $NaN"), "MATCH (`NaN`) RETURN `NaN`, `Infinity`.x, $NaN");
    assert_eq!(round_trip("RETURN -9223372036854775808"), "RETURN -9223372036854775808");
    for query in ["MATCH (`NaN`) RETURN `NaN`, NaN", "RETURN -9223372036854775808, 1 - -9223372036854775808"] {
        let first = parse(query).unwrap();
        let second = parse(&first.cypher().unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_errors() {
    assert!(matches!(parse("MATCH (n"), Err(ParseError::Syntax { .. })));
    assert!(matches!(parse("RETURN 'open"), Err(ParseError::Syntax { .. })));
    assert!(matches!(parse("CALL { RETURN 1"), Err(ParseError::Syntax { .. })));
}
