//! Abstract syntax tree for the condition language.

use serde_json::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
        }
    }
}

/// Built-in boolean functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Has,
    Contains,
    RegexMatch,
    StartsWith,
    EndsWith,
    Length,
}

impl Func {
    /// Resolve a function by name; `None` for unknown functions.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "has" => Func::Has,
            "contains" => Func::Contains,
            "regex_match" => Func::RegexMatch,
            "starts_with" => Func::StartsWith,
            "ends_with" => Func::EndsWith,
            "length" => Func::Length,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Has => "has",
            Func::Contains => "contains",
            Func::RegexMatch => "regex_match",
            Func::StartsWith => "starts_with",
            Func::EndsWith => "ends_with",
            Func::Length => "length",
        }
    }

    /// Number of arguments the function requires.
    pub fn arity(self) -> usize {
        match self {
            Func::Has | Func::Length => 1,
            Func::Contains | Func::RegexMatch | Func::StartsWith | Func::EndsWith => 2,
        }
    }
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    /// Membership test: LHS value, RHS array.
    In(Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
    Literal(Value),
    /// Dot-separated field path resolved against the context.
    Path(String),
}
