//! Cypher recursive descent parser.
//!
//! Walks the token stream and reports every construct to an [`EventSink`]
//! as it is recognized. Supports:
//! - MATCH / OPTIONAL MATCH with patterns and WHERE
//! - WITH, RETURN, ORDER BY, SKIP, LIMIT
//! - CREATE, MERGE with ON CREATE / ON MATCH SET, [DETACH] DELETE, SET, REMOVE
//! - CALL { ... } subqueries and CALL proc(...) YIELD
//! - Full expression parsing with precedence, emitted in postfix order

use cypher_dsl::cypher::ast::{
    BinaryOp, LabelJoin, Literal, LogicalOp, MergeAction, Parameter, PatternDirection, UnaryOp,
    VarLength,
};
use cypher_dsl::{Event, EventSink};

use super::lexer::{Token, TokenKind};
use crate::{ParseError, Result};

/// Parser state: a token slice with a cursor and the sink receiving events.
struct Parser<'t, S: EventSink> {
    tokens: &'t [Token],
    pos: usize,
    sink: &'t mut S,
}

impl<'t, S: EventSink> Parser<'t, S> {
    fn new(tokens: &'t [Token], sink: &'t mut S) -> Self {
        Self { tokens, pos: 0, sink }
    }

    fn peek(&self) -> &'t Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> &'t Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'t Token> {
        let tok = self.peek();
        if tok.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?} '{}'", kind, tok.kind, tok.text)))
        }
    }

    /// An identifier, or a keyword used as a name (`n.end`, `:Match`).
    fn expect_name(&mut self) -> Result<String> {
        let tok = self.peek();
        if tok.kind == TokenKind::Identifier || tok.kind.is_keyword() {
            Ok(self.advance().text.clone())
        } else {
            Err(self.error(format!("Expected a name, got {:?} '{}'", tok.kind, tok.text)))
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: String) -> ParseError {
        ParseError::Syntax { position: self.peek().span.start, message: msg }
    }

    fn emit(&mut self, event: Event) -> Result<()> {
        self.sink.push(event)?;
        Ok(())
    }
}

/// Parse `tokens` as one statement, pushing events into `sink`.
pub(crate) fn parse_tokens<S: EventSink>(tokens: &[Token], sink: &mut S) -> Result<()> {
    let mut p = Parser::new(tokens, sink);
    p.emit(Event::EnterStatement)?;
    parse_clauses(&mut p)?;
    p.eat(TokenKind::Semicolon);
    if !p.at(TokenKind::Eof) {
        return Err(p.error(format!("Unexpected token after statement: {:?} '{}'", p.peek_kind(), p.peek().text)));
    }
    p.emit(Event::ExitStatement)
}

// ============================================================================
// Clauses
// ============================================================================

/// Parse clauses until the end of the statement or the `}` closing a subquery.
fn parse_clauses<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    let mut count = 0;
    loop {
        match p.peek_kind() {
            TokenKind::Match | TokenKind::Optional => parse_match(p)?,
            TokenKind::With => parse_with(p)?,
            TokenKind::Return => parse_return(p)?,
            TokenKind::Create => parse_create(p)?,
            TokenKind::Merge => parse_merge(p)?,
            TokenKind::Delete | TokenKind::Detach => parse_delete(p)?,
            TokenKind::Set => parse_set(p)?,
            TokenKind::Remove => parse_remove(p)?,
            TokenKind::Call => parse_call(p)?,
            TokenKind::Eof | TokenKind::Semicolon | TokenKind::RBrace if count > 0 => return Ok(()),
            kind => return Err(p.error(format!("Unexpected token {:?} at start of clause", kind))),
        }
        count += 1;
    }
}

fn parse_match<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    let optional = p.eat(TokenKind::Optional);
    p.expect(TokenKind::Match)?;
    p.emit(Event::EnterMatch { optional })?;
    parse_pattern_list(p)?;
    parse_where(p)?;
    p.emit(Event::ExitMatch)
}

fn parse_where<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    if p.eat(TokenKind::Where) {
        parse_expr(p)?;
        p.emit(Event::Where)?;
    }
    Ok(())
}

fn parse_with<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::With)?;
    let distinct = p.eat(TokenKind::Distinct);
    p.emit(Event::EnterWith { distinct })?;
    parse_projection_body(p)?;
    parse_where(p)?;
    p.emit(Event::ExitWith)
}

fn parse_return<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::Return)?;
    let distinct = p.eat(TokenKind::Distinct);
    p.emit(Event::EnterReturn { distinct })?;
    parse_projection_body(p)?;
    p.emit(Event::ExitReturn)
}

/// Items, then ORDER BY, SKIP and LIMIT.
fn parse_projection_body<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_return_item(p)?;
    while p.eat(TokenKind::Comma) {
        parse_return_item(p)?;
    }
    if p.eat(TokenKind::Order) {
        p.expect(TokenKind::By)?;
        parse_order_expr(p)?;
        while p.eat(TokenKind::Comma) {
            parse_order_expr(p)?;
        }
    }
    if p.eat(TokenKind::Skip) {
        parse_expr(p)?;
        p.emit(Event::Skip)?;
    }
    if p.eat(TokenKind::Limit) {
        parse_expr(p)?;
        p.emit(Event::Limit)?;
    }
    Ok(())
}

fn parse_return_item<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_expr(p)?;
    let alias = if p.eat(TokenKind::As) { Some(p.expect_name()?) } else { None };
    p.emit(Event::ReturnItem { alias })
}

fn parse_order_expr<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_expr(p)?;
    let ascending = if p.eat(TokenKind::Desc) {
        false
    } else {
        p.eat(TokenKind::Asc);
        true
    };
    p.emit(Event::OrderBy { ascending })
}

fn parse_create<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::Create)?;
    p.emit(Event::EnterCreate)?;
    parse_pattern_list(p)?;
    p.emit(Event::ExitCreate)
}

fn parse_merge<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::Merge)?;
    p.emit(Event::EnterMerge)?;
    parse_pattern(p)?;
    while p.eat(TokenKind::On) {
        let action = if p.eat(TokenKind::Create) {
            MergeAction::OnCreate
        } else if p.eat(TokenKind::Match) {
            MergeAction::OnMatch
        } else {
            return Err(p.error("Expected CREATE or MATCH after ON".into()));
        };
        p.emit(Event::MergeAction(action))?;
        p.expect(TokenKind::Set)?;
        parse_set_items(p)?;
    }
    p.emit(Event::ExitMerge)
}

fn parse_delete<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    let detach = p.eat(TokenKind::Detach);
    p.expect(TokenKind::Delete)?;
    p.emit(Event::EnterDelete { detach })?;
    parse_expr(p)?;
    while p.eat(TokenKind::Comma) {
        parse_expr(p)?;
    }
    p.emit(Event::ExitDelete)
}

fn parse_set<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::Set)?;
    p.emit(Event::EnterSet)?;
    parse_set_items(p)?;
    p.emit(Event::ExitSet)
}

fn parse_set_items<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_set_item(p)?;
    while p.eat(TokenKind::Comma) {
        parse_set_item(p)?;
    }
    Ok(())
}

fn parse_set_item<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    let variable = p.expect(TokenKind::Identifier)?.text.clone();

    if p.eat(TokenKind::Dot) {
        // SET n.prop = expr
        let key = p.expect_name()?;
        p.expect(TokenKind::Eq)?;
        parse_expr(p)?;
        p.emit(Event::SetProperty { variable, key })
    } else if p.eat(TokenKind::PlusEq) {
        // SET n += {map}
        parse_expr(p)?;
        p.emit(Event::SetAllProperties { variable, merge: true })
    } else if p.eat(TokenKind::Eq) {
        // SET n = {map}
        parse_expr(p)?;
        p.emit(Event::SetAllProperties { variable, merge: false })
    } else if p.at(TokenKind::Colon) {
        // SET n:Label:Other
        let labels = parse_label_chain(p)?;
        p.emit(Event::SetLabels { variable, labels })
    } else {
        Err(p.error("Expected '.', '=', '+=', or ':' after SET variable".into()))
    }
}

fn parse_remove<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::Remove)?;
    p.emit(Event::EnterRemove)?;
    parse_remove_item(p)?;
    while p.eat(TokenKind::Comma) {
        parse_remove_item(p)?;
    }
    p.emit(Event::ExitRemove)
}

fn parse_remove_item<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    let variable = p.expect(TokenKind::Identifier)?.text.clone();
    if p.eat(TokenKind::Dot) {
        let key = p.expect_name()?;
        p.emit(Event::RemoveProperty { variable, key })
    } else if p.at(TokenKind::Colon) {
        let labels = parse_label_chain(p)?;
        p.emit(Event::RemoveLabels { variable, labels })
    } else {
        Err(p.error("Expected '.' or ':' after REMOVE variable".into()))
    }
}

/// `:A:B`, at least one label.
fn parse_label_chain<S: EventSink>(p: &mut Parser<S>) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    while p.eat(TokenKind::Colon) {
        labels.push(p.expect_name()?);
    }
    if labels.is_empty() {
        return Err(p.error("Expected ':' and a label".into()));
    }
    Ok(labels)
}

fn parse_call<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::Call)?;

    if p.eat(TokenKind::LBrace) {
        p.emit(Event::EnterSubquery)?;
        parse_clauses(p)?;
        p.expect(TokenKind::RBrace)?;
        return p.emit(Event::ExitSubquery);
    }

    // CALL db.labels() YIELD label
    let mut name = p.expect_name()?;
    while p.eat(TokenKind::Dot) {
        name.push('.');
        name.push_str(&p.expect_name()?);
    }
    p.emit(Event::EnterCallProcedure { name })?;
    if p.eat(TokenKind::LParen) {
        if !p.at(TokenKind::RParen) {
            parse_expr(p)?;
            while p.eat(TokenKind::Comma) {
                parse_expr(p)?;
            }
        }
        p.expect(TokenKind::RParen)?;
    }
    let mut yields = Vec::new();
    if p.eat(TokenKind::Yield) {
        yields.push(p.expect_name()?);
        while p.eat(TokenKind::Comma) {
            yields.push(p.expect_name()?);
        }
    }
    p.emit(Event::ExitCallProcedure { yields })
}

// ============================================================================
// Patterns
// ============================================================================

fn parse_pattern_list<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_pattern(p)?;
    while p.eat(TokenKind::Comma) {
        parse_pattern(p)?;
    }
    Ok(())
}

fn parse_pattern<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    // Named path: p = (a)-->(b)
    let variable = if p.at(TokenKind::Identifier) && p.peek_kind_at(1) == TokenKind::Eq {
        let name = p.advance().text.clone();
        p.advance();
        Some(name)
    } else {
        None
    };
    p.emit(Event::EnterPattern { variable })?;

    // A pattern starts with a node, then alternates relationship and node
    parse_node_pattern(p)?;
    while p.at(TokenKind::Dash) || p.at(TokenKind::LeftArrow) {
        parse_rel_pattern(p)?;
        parse_node_pattern(p)?;
    }

    p.emit(Event::ExitPattern)
}

fn parse_node_pattern<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::LParen)?;

    let variable = if p.at(TokenKind::Identifier) { Some(p.advance().text.clone()) } else { None };
    p.emit(Event::EnterNode { variable })?;

    // Labels: :A:B for all of them, :A|B for any of them
    if p.eat(TokenKind::Colon) {
        let mut labels = vec![p.expect_name()?];
        let mut join = LabelJoin::All;
        loop {
            if p.eat(TokenKind::Colon) {
                labels.push(p.expect_name()?);
            } else if p.eat(TokenKind::Pipe) {
                join = LabelJoin::Any;
                p.eat(TokenKind::Colon);
                labels.push(p.expect_name()?);
            } else {
                break;
            }
        }
        p.emit(Event::Labels { labels, join })?;
    }

    if p.at(TokenKind::LBrace) {
        parse_map_literal(p)?;
        p.emit(Event::Properties)?;
    }

    p.expect(TokenKind::RParen)?;
    p.emit(Event::ExitNode)
}

fn parse_rel_pattern<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    // <-[...]- or -[...]-> or -[...]-
    let left_arrow = p.eat(TokenKind::LeftArrow);
    if !left_arrow {
        p.expect(TokenKind::Dash)?;
    }

    if p.eat(TokenKind::LBracket) {
        let variable = if p.at(TokenKind::Identifier) { Some(p.advance().text.clone()) } else { None };
        p.emit(Event::EnterRelationship { variable })?;

        // Types: :TYPE1|TYPE2, tolerating the older :TYPE1|:TYPE2
        if p.eat(TokenKind::Colon) {
            let mut types = vec![p.expect_name()?];
            while p.eat(TokenKind::Pipe) {
                p.eat(TokenKind::Colon);
                types.push(p.expect_name()?);
            }
            p.emit(Event::Types(types))?;
        }

        // Variable length: *, *n, *min.., *..max, *min..max
        if p.eat(TokenKind::Star) {
            let min = parse_bound(p)?;
            let length = if p.eat(TokenKind::DotDot) {
                VarLength { min, max: parse_bound(p)? }
            } else {
                VarLength { min, max: min }
            };
            p.emit(Event::Length(length))?;
        }

        if p.at(TokenKind::LBrace) {
            parse_map_literal(p)?;
            p.emit(Event::Properties)?;
        }

        p.expect(TokenKind::RBracket)?;
    } else {
        p.emit(Event::EnterRelationship { variable: None })?;
    }

    let right_arrow = if p.eat(TokenKind::Arrow) {
        true
    } else {
        p.expect(TokenKind::Dash)?;
        false
    };
    let direction = match (left_arrow, right_arrow) {
        (true, false) => PatternDirection::Incoming,
        (false, true) => PatternDirection::Outgoing,
        // <-[]-> reads as either direction
        _ => PatternDirection::Undirected,
    };
    p.emit(Event::ExitRelationship { direction })
}

fn parse_bound<S: EventSink>(p: &mut Parser<S>) -> Result<Option<usize>> {
    if !p.at(TokenKind::Integer) {
        return Ok(None);
    }
    let tok = p.advance();
    tok.text.parse::<usize>().map(Some).map_err(|_| ParseError::Syntax {
        position: tok.span.start,
        message: "Invalid path length".into(),
    })
}

// ============================================================================
// Expression parsing (precedence climbing)
// ============================================================================

fn parse_expr<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_or_expr(p)
}

/// `operand (kw operand)*` folded into one n-ary compound condition.
fn parse_compound<S: EventSink>(
    p: &mut Parser<S>,
    keyword: TokenKind,
    op: LogicalOp,
    operand: fn(&mut Parser<S>) -> Result<()>,
) -> Result<()> {
    operand(p)?;
    let mut arity = 1;
    while p.eat(keyword) {
        operand(p)?;
        arity += 1;
    }
    if arity > 1 {
        p.emit(Event::Compound { op, arity })?;
    }
    Ok(())
}

fn parse_or_expr<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_compound(p, TokenKind::Or, LogicalOp::Or, parse_xor_expr)
}

fn parse_xor_expr<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_compound(p, TokenKind::Xor, LogicalOp::Xor, parse_and_expr)
}

fn parse_and_expr<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_compound(p, TokenKind::And, LogicalOp::And, parse_not_expr)
}

fn parse_not_expr<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    if p.eat(TokenKind::Not) {
        parse_not_expr(p)?;
        p.emit(Event::Unary(UnaryOp::Not))
    } else {
        parse_comparison(p)
    }
}

fn parse_comparison<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_predicate(p)?;

    let op = match p.peek_kind() {
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::Neq => BinaryOp::Neq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Lte => BinaryOp::Lte,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Gte => BinaryOp::Gte,
        TokenKind::RegexMatch => BinaryOp::RegexMatch,
        _ => return Ok(()),
    };
    p.advance();
    parse_predicate(p)?;
    p.emit(Event::Binary(op))
}

/// STARTS WITH, ENDS WITH, CONTAINS, IN and IS [NOT] NULL.
fn parse_predicate<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_addition(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Is => {
                p.advance();
                let negated = p.eat(TokenKind::Not);
                p.expect(TokenKind::Null)?;
                let op = if negated { UnaryOp::IsNotNull } else { UnaryOp::IsNull };
                p.emit(Event::Unary(op))?;
                continue;
            }
            TokenKind::Starts => {
                p.advance();
                p.expect(TokenKind::With)?;
                BinaryOp::StartsWith
            }
            TokenKind::Ends => {
                p.advance();
                p.expect(TokenKind::With)?;
                BinaryOp::EndsWith
            }
            TokenKind::Contains => {
                p.advance();
                BinaryOp::Contains
            }
            TokenKind::In => {
                p.advance();
                BinaryOp::In
            }
            _ => return Ok(()),
        };
        parse_addition(p)?;
        p.emit(Event::Binary(op))?;
    }
}

fn parse_addition<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_multiplication(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Dash => BinaryOp::Sub,
            _ => return Ok(()),
        };
        p.advance();
        parse_multiplication(p)?;
        p.emit(Event::Binary(op))?;
    }
}

fn parse_multiplication<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_power(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            _ => return Ok(()),
        };
        p.advance();
        parse_power(p)?;
        p.emit(Event::Binary(op))?;
    }
}

fn parse_power<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    parse_unary(p)?;
    while p.eat(TokenKind::Caret) {
        parse_unary(p)?;
        p.emit(Event::Binary(BinaryOp::Pow))?;
    }
    Ok(())
}

fn parse_unary<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    // i64::MIN has no positive counterpart to negate
    if p.at(TokenKind::Dash) && p.peek_kind_at(1) == TokenKind::Integer {
        let tok = &p.tokens[p.pos + 1];
        if tok.text.parse::<i64>().is_err() {
            if let Ok(val) = format!("-{}", tok.text).parse::<i64>() {
                p.advance();
                p.advance();
                return p.emit(Event::Literal(Literal::Int(val)));
            }
        }
    }
    if p.eat(TokenKind::Dash) {
        parse_unary(p)?;
        p.emit(Event::Unary(UnaryOp::Negate))
    } else {
        p.eat(TokenKind::Plus);
        parse_postfix(p)
    }
}

fn parse_postfix<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    let bare_variable = p.at(TokenKind::Identifier) && !starts_function_call(p);
    parse_primary(p)?;

    // Property access chain: n.name, n.address.city
    let mut accessed = false;
    while p.eat(TokenKind::Dot) {
        let key = p.expect_name()?;
        p.emit(Event::Property(key))?;
        accessed = true;
    }

    // Label check: n:Person:Actor
    if bare_variable && !accessed && p.at(TokenKind::Colon) {
        let labels = parse_label_chain(p)?;
        p.emit(Event::HasLabels(labels))?;
    }
    Ok(())
}

/// `name(` or `a.b.name(` ahead of the cursor.
fn starts_function_call<S: EventSink>(p: &Parser<S>) -> bool {
    let mut offset = 1;
    while p.peek_kind_at(offset) == TokenKind::Dot {
        let name = p.peek_kind_at(offset + 1);
        if name != TokenKind::Identifier && !name.is_keyword() {
            return false;
        }
        offset += 2;
    }
    p.peek_kind_at(offset) == TokenKind::LParen
}

fn parse_primary<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    match p.peek_kind() {
        TokenKind::Integer => {
            let tok = p.advance();
            let val = tok.text.parse::<i64>().map_err(|_| ParseError::Syntax {
                position: tok.span.start,
                message: "Invalid integer".into(),
            })?;
            p.emit(Event::Literal(Literal::Int(val)))
        }
        TokenKind::Float => {
            let tok = p.advance();
            let val = tok.text.parse::<f64>().map_err(|_| ParseError::Syntax {
                position: tok.span.start,
                message: "Invalid float".into(),
            })?;
            p.emit(Event::Literal(Literal::float(val)))
        }
        TokenKind::StringLiteral => {
            let text = p.advance().text.clone();
            p.emit(Event::Literal(Literal::String(text)))
        }
        TokenKind::True => {
            p.advance();
            p.emit(Event::Literal(Literal::Bool(true)))
        }
        TokenKind::False => {
            p.advance();
            p.emit(Event::Literal(Literal::Bool(false)))
        }
        TokenKind::Null => {
            p.advance();
            p.emit(Event::Literal(Literal::Null))
        }

        // $name or $0
        TokenKind::Parameter => {
            let tok = p.advance();
            let param = match tok.text.parse::<usize>() {
                Ok(index) => Parameter::Positional(index),
                Err(_) => Parameter::Named(tok.text.clone()),
            };
            p.emit(Event::Parameter(param))
        }

        // RETURN *, count(*)
        TokenKind::Star => {
            p.advance();
            p.emit(Event::Star)
        }

        TokenKind::LParen => {
            p.advance();
            parse_expr(p)?;
            p.expect(TokenKind::RParen)?;
            Ok(())
        }

        TokenKind::LBracket => {
            p.advance();
            let mut n = 0;
            if !p.at(TokenKind::RBracket) {
                parse_expr(p)?;
                n += 1;
                while p.eat(TokenKind::Comma) {
                    parse_expr(p)?;
                    n += 1;
                }
            }
            p.expect(TokenKind::RBracket)?;
            p.emit(Event::List(n))
        }

        TokenKind::LBrace => parse_map_literal(p),

        TokenKind::Case => {
            p.advance();
            let has_operand = !p.at(TokenKind::When);
            if has_operand {
                parse_expr(p)?;
            }
            let mut branches = 0;
            while p.eat(TokenKind::When) {
                parse_expr(p)?;
                p.expect(TokenKind::Then)?;
                parse_expr(p)?;
                branches += 1;
            }
            if branches == 0 {
                return Err(p.error("CASE without WHEN".into()));
            }
            let has_else = p.eat(TokenKind::Else);
            if has_else {
                parse_expr(p)?;
            }
            p.expect(TokenKind::End)?;
            p.emit(Event::Case { has_operand, branches, has_else })
        }

        // EXISTS { pattern [WHERE cond] }, or the exists(expr) function
        TokenKind::Exists => {
            p.advance();
            if p.eat(TokenKind::LBrace) {
                p.emit(Event::EnterExists)?;
                p.eat(TokenKind::Match);
                parse_pattern_list(p)?;
                parse_where(p)?;
                p.expect(TokenKind::RBrace)?;
                p.emit(Event::ExitExists)
            } else {
                parse_function_args(p, "exists".into())
            }
        }

        TokenKind::Identifier => {
            if starts_function_call(p) {
                let mut name = p.advance().text.clone();
                while p.eat(TokenKind::Dot) {
                    name.push('.');
                    name.push_str(&p.expect_name()?);
                }
                return parse_function_args(p, name);
            }
            let tok = p.advance();
            match tok.text.as_str() {
                "NaN" if !tok.quoted => p.emit(Event::Literal(Literal::NaN)),
                "Infinity" if !tok.quoted => p.emit(Event::Literal(Literal::Float(f64::INFINITY))),
                _ => p.emit(Event::Variable(tok.text.clone())),
            }
        }

        _ => Err(p.error(format!("Unexpected token in expression: {:?} '{}'", p.peek_kind(), p.peek().text))),
    }
}

/// `(DISTINCT? args)` after a function name.
fn parse_function_args<S: EventSink>(p: &mut Parser<S>, name: String) -> Result<()> {
    p.expect(TokenKind::LParen)?;
    let distinct = p.eat(TokenKind::Distinct);
    let mut arity = 0;
    if !p.at(TokenKind::RParen) {
        parse_expr(p)?;
        arity += 1;
        while p.eat(TokenKind::Comma) {
            parse_expr(p)?;
            arity += 1;
        }
    }
    p.expect(TokenKind::RParen)?;
    p.emit(Event::Function { name, arity, distinct })
}

fn parse_map_literal<S: EventSink>(p: &mut Parser<S>) -> Result<()> {
    p.expect(TokenKind::LBrace)?;
    let mut keys = Vec::new();
    if !p.at(TokenKind::RBrace) {
        loop {
            keys.push(p.expect_name()?);
            p.expect(TokenKind::Colon)?;
            parse_expr(p)?;
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
    }
    p.expect(TokenKind::RBrace)?;
    p.emit(Event::Map(keys))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn events(query: &str) -> Vec<Event> {
        let tokens = tokenize(query).unwrap();
        let mut recorded = Vec::new();
        parse_tokens(&tokens, &mut recorded).unwrap();
        recorded
    }

    fn expression_events(expr: &str) -> Vec<Event> {
        let all = events(&format!("RETURN {expr}"));
        // EnterStatement, EnterReturn, ..., ReturnItem, ExitReturn, ExitStatement
        all[2..all.len() - 3].to_vec()
    }

    #[test]
    fn test_simple_match_return() {
        assert_eq!(events("MATCH (n:Person) RETURN n"), vec![
            Event::EnterStatement,
            Event::EnterMatch { optional: false },
            Event::EnterPattern { variable: None },
            Event::EnterNode { variable: Some("n".into()) },
            Event::Labels { labels: vec!["Person".into()], join: LabelJoin::All },
            Event::ExitNode,
            Event::ExitPattern,
            Event::ExitMatch,
            Event::EnterReturn { distinct: false },
            Event::Variable("n".into()),
            Event::ReturnItem { alias: None },
            Event::ExitReturn,
            Event::ExitStatement,
        ]);
    }

    #[test]
    fn test_precedence_is_postfix() {
        assert_eq!(expression_events("1 + 2 * 3"), vec![
            Event::Literal(Literal::Int(1)),
            Event::Literal(Literal::Int(2)),
            Event::Literal(Literal::Int(3)),
            Event::Binary(BinaryOp::Mul),
            Event::Binary(BinaryOp::Add),
        ]);
    }

    #[test]
    fn test_and_chain_is_one_compound() {
        assert_eq!(expression_events("a AND b AND c"), vec![
            Event::Variable("a".into()),
            Event::Variable("b".into()),
            Event::Variable("c".into()),
            Event::Compound { op: LogicalOp::And, arity: 3 },
        ]);
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_power() {
        assert_eq!(expression_events("-2 ^ 2"), vec![
            Event::Literal(Literal::Int(2)),
            Event::Unary(UnaryOp::Negate),
            Event::Literal(Literal::Int(2)),
            Event::Binary(BinaryOp::Pow),
        ]);
    }

    #[test]
    fn test_string_predicates() {
        assert_eq!(expression_events("n.name STARTS WITH 'A'"), vec![
            Event::Variable("n".into()),
            Event::Property("name".into()),
            Event::Literal(Literal::String("A".into())),
            Event::Binary(BinaryOp::StartsWith),
        ]);
        assert_eq!(expression_events("x IS NOT NULL"), vec![
            Event::Variable("x".into()),
            Event::Unary(UnaryOp::IsNotNull),
        ]);
    }

    #[test]
    fn test_label_check_and_functions() {
        assert_eq!(expression_events("n:A:B"), vec![
            Event::Variable("n".into()),
            Event::HasLabels(vec!["A".into(), "B".into()]),
        ]);
        assert_eq!(expression_events("count(DISTINCT n)"), vec![
            Event::Variable("n".into()),
            Event::Function { name: "count".into(), arity: 1, distinct: true },
        ]);
        assert_eq!(expression_events("apoc.text.join(xs, ',')"), vec![
            Event::Variable("xs".into()),
            Event::Literal(Literal::String(",".into())),
            Event::Function { name: "apoc.text.join".into(), arity: 2, distinct: false },
        ]);
    }

    #[test]
    fn test_parameters_and_nan() {
        assert_eq!(expression_events("$0"), vec![Event::Parameter(Parameter::Positional(0))]);
        assert_eq!(expression_events("$born"), vec![Event::Parameter(Parameter::Named("born".into()))]);
        assert_eq!(expression_events("NaN"), vec![Event::Literal(Literal::NaN)]);
        assert_eq!(expression_events("`NaN`"), vec![Event::Variable("NaN".into())]);
        assert_eq!(expression_events("`Infinity`"), vec![Event::Variable("Infinity".into())]);
    }

    #[test]
    fn test_smallest_integer_is_one_literal() {
        assert_eq!(
            expression_events("-9223372036854775808"),
            vec![Event::Literal(Literal::Int(i64::MIN))]
        );
        assert_eq!(
            expression_events("-5"),
            vec![Event::Literal(Literal::Int(5)), Event::Unary(UnaryOp::Negate)]
        );
        assert!(parse_tokens(&tokenize("RETURN 9223372036854775808").unwrap(), &mut Vec::<Event>::new()).is_err());
    }

    #[test]
    fn test_relationship_directions() {
        let all = events("MATCH (a)<-[r:KNOWS|LIKES*1..3]-(b)--(c) RETURN a");
        assert!(all.contains(&Event::EnterRelationship { variable: Some("r".into()) }));
        assert!(all.contains(&Event::Types(vec!["KNOWS".into(), "LIKES".into()])));
        assert!(all.contains(&Event::Length(VarLength { min: Some(1), max: Some(3) })));
        assert!(all.contains(&Event::ExitRelationship { direction: PatternDirection::Incoming }));
        assert!(all.contains(&Event::ExitRelationship { direction: PatternDirection::Undirected }));
    }

    #[test]
    fn test_label_alternation() {
        let all = events("MATCH (p:Person|Actor) RETURN p");
        assert!(all.contains(&Event::Labels {
            labels: vec!["Person".into(), "Actor".into()],
            join: LabelJoin::Any,
        }));
    }

    #[test]
    fn test_merge_actions() {
        let all = events("MERGE (n:P {id: 1}) ON CREATE SET n.c = 1 ON MATCH SET n.m = 2");
        let actions: Vec<_> = all.iter().filter(|e| matches!(e, Event::MergeAction(_))).collect();
        assert_eq!(actions, vec![
            &Event::MergeAction(MergeAction::OnCreate),
            &Event::MergeAction(MergeAction::OnMatch),
        ]);
    }

    #[test]
    fn test_subquery_and_procedure() {
        let all = events("CALL { MATCH (n) RETURN n } CALL db.labels() YIELD label RETURN label");
        assert!(all.contains(&Event::EnterSubquery));
        assert!(all.contains(&Event::ExitSubquery));
        assert!(all.contains(&Event::EnterCallProcedure { name: "db.labels".into() }));
        assert!(all.contains(&Event::ExitCallProcedure { yields: vec!["label".into()] }));
    }

    #[test]
    fn test_syntax_errors_carry_position() {
        let tokens = tokenize("MATCH (n RETURN n").unwrap();
        let err = parse_tokens(&tokens, &mut Vec::<Event>::new()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { position: 9, .. }));

        let tokens = tokenize("").unwrap();
        assert!(parse_tokens(&tokens, &mut Vec::<Event>::new()).is_err());

        let tokens = tokenize("RETURN 1 )").unwrap();
        assert!(parse_tokens(&tokens, &mut Vec::<Event>::new()).is_err());
    }
}
