//! Cypher lexer: splits query text into tokens.

use crate::{ParseError, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Unescaped text: string contents without quotes, identifiers without
    /// backticks, parameter names without `$`.
    pub text: String,
    /// Written between backticks.
    pub quoted: bool,
}

/// Byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Match, Optional, Where, Return, With,
    Create, Merge, Delete, Detach, Set, Remove,
    Order, By, Skip, Limit, Asc, Desc, Distinct,
    And, Or, Not, Xor, Is, Null, True, False, In,
    As, Case, When, Then, Else, End, Exists,
    Starts, Ends, Contains, On, Call, Yield,

    // Literals
    Integer, Float, StringLiteral,

    // Identifiers and parameters
    Identifier, Parameter,

    // Punctuation
    LParen, RParen, LBracket, RBracket, LBrace, RBrace,
    Dot, Comma, Colon, Semicolon, Pipe, Star,
    Arrow,      // ->
    LeftArrow,  // <-
    Dash,       // - (also binary and unary minus)
    DotDot,     // ..

    // Operators
    Eq, Neq, Lt, Lte, Gt, Gte,
    Plus, Slash, Percent, Caret,
    PlusEq,     // +=
    RegexMatch, // =~

    Eof,
}

impl TokenKind {
    /// Reserved words, which may still appear where a name is expected
    /// (property keys, labels, aliases).
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Match | Optional | Where | Return | With | Create | Merge | Delete | Detach | Set
                | Remove | Order | By | Skip | Limit | Asc | Desc | Distinct | And | Or | Not
                | Xor | Is | Null | True | False | In | As | Case | When | Then | Else | End
                | Exists | Starts | Ends | Contains | On | Call | Yield
        )
    }
}

fn syntax(position: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax { position, message: message.into() }
}

/// Tokenize a Cypher query string. The last token is always [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }

            // Block comments /* ... */
            '/' if matches!(chars.clone().nth(1), Some((_, '*'))) => {
                chars.next();
                chars.next();
                loop {
                    match chars.next() {
                        Some((_, '*')) if matches!(chars.peek(), Some(&(_, '/'))) => {
                            chars.next();
                            break;
                        }
                        Some(_) => {}
                        None => return Err(syntax(pos, "Unterminated block comment")),
                    }
                }
            }

            // Line comments
            '/' if matches!(chars.clone().nth(1), Some((_, '/'))) => {
                while chars.peek().is_some_and(|&(_, c)| c != '\n') {
                    chars.next();
                }
            }

            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => s.push('\n'),
                            Some((_, 't')) => s.push('\t'),
                            Some((_, 'r')) => s.push('\r'),
                            Some((_, c @ ('\\' | '\'' | '"'))) => s.push(c),
                            Some((_, c)) => {
                                s.push('\\');
                                s.push(c);
                            }
                            None => return Err(syntax(pos, "Unterminated string literal")),
                        },
                        Some((end, c)) if c == quote => {
                            tokens.push(Token {
                                kind: TokenKind::StringLiteral,
                                span: Span { start: pos, end: end + 1 },
                                text: s,
                                quoted: false,
                            });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => return Err(syntax(pos, "Unterminated string literal")),
                    }
                }
            }

            // Quoted identifiers; a doubled backtick stands for one backtick
            '`' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) if matches!(chars.peek(), Some(&(_, '`'))) => {
                            chars.next();
                            s.push('`');
                        }
                        Some((end, '`')) => {
                            if s.is_empty() {
                                return Err(syntax(pos, "Empty quoted identifier"));
                            }
                            tokens.push(Token {
                                kind: TokenKind::Identifier,
                                span: Span { start: pos, end: end + 1 },
                                text: s,
                                quoted: true,
                            });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => return Err(syntax(pos, "Unterminated quoted identifier")),
                    }
                }
            }

            c if c.is_ascii_digit() => {
                let mut num = String::new();
                let mut is_float = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                        chars.next();
                    } else if c == '.'
                        && !is_float
                        && chars.clone().nth(1).is_some_and(|(_, d)| d.is_ascii_digit())
                    {
                        // `1..3` is a range, `1.5` a float
                        is_float = true;
                        num.push(c);
                        chars.next();
                    } else if matches!(c, 'e' | 'E') && exponent_follows(chars.clone()) {
                        is_float = true;
                        num.push(c);
                        chars.next();
                        if let Some(&(_, sign @ ('+' | '-'))) = chars.peek() {
                            num.push(sign);
                            chars.next();
                        }
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: if is_float { TokenKind::Float } else { TokenKind::Integer },
                    span: Span { start: pos, end: pos + num.len() },
                    text: num,
                    quoted: false,
                });
            }

            // Parameters: $name or $0
            '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(syntax(pos, "Expected a parameter name after '$'"));
                }
                tokens.push(Token {
                    kind: TokenKind::Parameter,
                    span: Span { start: pos, end: pos + name.len() + 1 },
                    text: name,
                    quoted: false,
                });
            }

            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: keyword_or_ident(&ident),
                    span: Span { start: pos, end: pos + ident.len() },
                    text: ident,
                    quoted: false,
                });
            }

            '(' => { chars.next(); tokens.push(punct(TokenKind::LParen, pos, "(")); }
            ')' => { chars.next(); tokens.push(punct(TokenKind::RParen, pos, ")")); }
            '[' => { chars.next(); tokens.push(punct(TokenKind::LBracket, pos, "[")); }
            ']' => { chars.next(); tokens.push(punct(TokenKind::RBracket, pos, "]")); }
            '{' => { chars.next(); tokens.push(punct(TokenKind::LBrace, pos, "{")); }
            '}' => { chars.next(); tokens.push(punct(TokenKind::RBrace, pos, "}")); }
            ',' => { chars.next(); tokens.push(punct(TokenKind::Comma, pos, ",")); }
            ':' => { chars.next(); tokens.push(punct(TokenKind::Colon, pos, ":")); }
            ';' => { chars.next(); tokens.push(punct(TokenKind::Semicolon, pos, ";")); }
            '|' => { chars.next(); tokens.push(punct(TokenKind::Pipe, pos, "|")); }
            '*' => { chars.next(); tokens.push(punct(TokenKind::Star, pos, "*")); }
            '/' => { chars.next(); tokens.push(punct(TokenKind::Slash, pos, "/")); }
            '%' => { chars.next(); tokens.push(punct(TokenKind::Percent, pos, "%")); }
            '^' => { chars.next(); tokens.push(punct(TokenKind::Caret, pos, "^")); }
            '.' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '.'))) {
                    chars.next();
                    tokens.push(punct(TokenKind::DotDot, pos, ".."));
                } else {
                    tokens.push(punct(TokenKind::Dot, pos, "."));
                }
            }
            '+' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::PlusEq, pos, "+="));
                } else {
                    tokens.push(punct(TokenKind::Plus, pos, "+"));
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '~'))) {
                    chars.next();
                    tokens.push(punct(TokenKind::RegexMatch, pos, "=~"));
                } else {
                    tokens.push(punct(TokenKind::Eq, pos, "="));
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Neq, pos, "!="));
                } else {
                    return Err(syntax(pos, "Unexpected character: '!'"));
                }
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(punct(TokenKind::Lte, pos, "<="));
                    }
                    Some(&(_, '-')) => {
                        chars.next();
                        tokens.push(punct(TokenKind::LeftArrow, pos, "<-"));
                    }
                    Some(&(_, '>')) => {
                        chars.next();
                        tokens.push(punct(TokenKind::Neq, pos, "<>"));
                    }
                    _ => tokens.push(punct(TokenKind::Lt, pos, "<")),
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Gte, pos, ">="));
                } else {
                    tokens.push(punct(TokenKind::Gt, pos, ">"));
                }
            }
            '-' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '>'))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Arrow, pos, "->"));
                } else {
                    tokens.push(punct(TokenKind::Dash, pos, "-"));
                }
            }

            other => return Err(syntax(pos, format!("Unexpected character: '{other}'"))),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
        quoted: false,
    });

    Ok(tokens)
}

/// True when the iterator sits on `e`/`E` followed by an optionally signed digit.
fn exponent_follows(mut chars: impl Iterator<Item = (usize, char)>) -> bool {
    chars.next();
    match chars.next() {
        Some((_, d)) if d.is_ascii_digit() => true,
        Some((_, '+' | '-')) => chars.next().is_some_and(|(_, d)| d.is_ascii_digit()),
        _ => false,
    }
}

fn punct(kind: TokenKind, pos: usize, text: &str) -> Token {
    Token {
        kind,
        span: Span { start: pos, end: pos + text.len() },
        text: text.to_string(),
        quoted: false,
    }
}

fn keyword_or_ident(s: &str) -> TokenKind {
    match s.to_uppercase().as_str() {
        "MATCH" => TokenKind::Match,
        "OPTIONAL" => TokenKind::Optional,
        "WHERE" => TokenKind::Where,
        "RETURN" => TokenKind::Return,
        "WITH" => TokenKind::With,
        "CREATE" => TokenKind::Create,
        "MERGE" => TokenKind::Merge,
        "DELETE" => TokenKind::Delete,
        "DETACH" => TokenKind::Detach,
        "SET" => TokenKind::Set,
        "REMOVE" => TokenKind::Remove,
        "ORDER" => TokenKind::Order,
        "BY" => TokenKind::By,
        "SKIP" => TokenKind::Skip,
        "LIMIT" => TokenKind::Limit,
        "ASC" | "ASCENDING" => TokenKind::Asc,
        "DESC" | "DESCENDING" => TokenKind::Desc,
        "DISTINCT" => TokenKind::Distinct,
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "XOR" => TokenKind::Xor,
        "IS" => TokenKind::Is,
        "NULL" => TokenKind::Null,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        "IN" => TokenKind::In,
        "AS" => TokenKind::As,
        "CASE" => TokenKind::Case,
        "WHEN" => TokenKind::When,
        "THEN" => TokenKind::Then,
        "ELSE" => TokenKind::Else,
        "END" => TokenKind::End,
        "EXISTS" => TokenKind::Exists,
        "STARTS" => TokenKind::Starts,
        "ENDS" => TokenKind::Ends,
        "CONTAINS" => TokenKind::Contains,
        "ON" => TokenKind::On,
        "CALL" => TokenKind::Call,
        "YIELD" => TokenKind::Yield,
        _ => TokenKind::Identifier,
    }
}
