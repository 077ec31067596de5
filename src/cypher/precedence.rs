//! Operator precedence and associativity.
//!
//! Levels, loosest to tightest:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `OR` |
//! | 2 | `XOR` |
//! | 3 | `AND` |
//! | 4 | `NOT` |
//! | 5 | `=` `<>` `<` `<=` `>` `>=` `=~` |
//! | 6 | `STARTS WITH` `ENDS WITH` `CONTAINS` `IN` `IS [NOT] NULL` |
//! | 7 | `+` `-` |
//! | 8 | `*` `/` `%` |
//! | 9 | `^` |
//! | 10 | unary `-` |
//! | 11 | property access, label check |
//! | 12 | atoms |

use serde::{Deserialize, Serialize};

use super::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};

pub const OR: u8 = 1;
pub const XOR: u8 = 2;
pub const AND: u8 = 3;
pub const NOT: u8 = 4;
pub const COMPARISON: u8 = 5;
pub const PREDICATE: u8 = 6;
pub const ADDITIVE: u8 = 7;
pub const MULTIPLICATIVE: u8 = 8;
pub const POWER: u8 = 9;
pub const UNARY: u8 = 10;
pub const POSTFIX: u8 = 11;
pub const ATOM: u8 = 12;

/// How operands of equal precedence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Associativity {
    /// Grouping never changes the result: `a AND b AND c`.
    Full,
    /// Groups left to right: `a - b - c` is `(a - b) - c`.
    Left,
    /// Cannot be chained without parentheses: `(a = b) = c`.
    None,
}

/// Precedence entry of one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    pub precedence: u8,
    pub associativity: Associativity,
}

impl OperatorInfo {
    pub const fn new(precedence: u8, associativity: Associativity) -> Self {
        Self { precedence, associativity }
    }
}

impl BinaryOp {
    pub fn info(self) -> OperatorInfo {
        use Associativity::*;
        match self {
            BinaryOp::Or => OperatorInfo::new(OR, Full),
            BinaryOp::Xor => OperatorInfo::new(XOR, Full),
            BinaryOp::And => OperatorInfo::new(AND, Full),
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Lte
            | BinaryOp::Gt | BinaryOp::Gte | BinaryOp::RegexMatch => OperatorInfo::new(COMPARISON, None),
            BinaryOp::StartsWith | BinaryOp::EndsWith | BinaryOp::Contains
            | BinaryOp::In => OperatorInfo::new(PREDICATE, None),
            BinaryOp::Add => OperatorInfo::new(ADDITIVE, Full),
            BinaryOp::Sub => OperatorInfo::new(ADDITIVE, Left),
            BinaryOp::Mul => OperatorInfo::new(MULTIPLICATIVE, Full),
            BinaryOp::Div | BinaryOp::Mod => OperatorInfo::new(MULTIPLICATIVE, Left),
            BinaryOp::Pow => OperatorInfo::new(POWER, Left),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::RegexMatch => "=~",
            BinaryOp::StartsWith => "STARTS WITH",
            BinaryOp::EndsWith => "ENDS WITH",
            BinaryOp::Contains => "CONTAINS",
            BinaryOp::In => "IN",
        }
    }
}

impl LogicalOp {
    pub fn info(self) -> OperatorInfo {
        self.as_binary().info()
    }
}

impl UnaryOp {
    pub fn info(self) -> OperatorInfo {
        match self {
            UnaryOp::Not => OperatorInfo::new(NOT, Associativity::Full),
            UnaryOp::Negate => OperatorInfo::new(UNARY, Associativity::Full),
            UnaryOp::IsNull | UnaryOp::IsNotNull => OperatorInfo::new(PREDICATE, Associativity::None),
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::IsNull | UnaryOp::IsNotNull)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Negate => "-",
            UnaryOp::IsNull => "IS NULL",
            UnaryOp::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Operator identity of an expression, if it is an operator application.
/// Compound chains count as their binary counterpart.
pub(crate) fn binary_operator_of(expr: &Expr) -> Option<BinaryOp> {
    match expr {
        Expr::BinaryOp { op, .. } => Some(*op),
        Expr::Compound { op, .. } => Some(op.as_binary()),
        _ => None,
    }
}

/// Which side of a binary operator an operand sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Whether a child at `child` precedence needs parentheses under a parent
/// with `parent` info. `same_operator` is true when the child applies the
/// parent's own operator.
pub(crate) fn needs_parens(parent: OperatorInfo, child: u8, side: Side, same_operator: bool) -> bool {
    if child != parent.precedence {
        return child < parent.precedence;
    }
    match parent.associativity {
        Associativity::None => true,
        Associativity::Left => side == Side::Right,
        Associativity::Full => side == Side::Right && !same_operator,
    }
}
