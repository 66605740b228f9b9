//! Restricted boolean condition language for compliance rules.
//!
//! Conditions are boolean-typed expressions over a dynamically typed request
//! context: logical `||`/`&&`/`!`, comparisons, membership `in`, literals,
//! dot-separated field paths and a fixed set of boolean functions (`has`,
//! `contains`, `regex_match`, `starts_with`, `ends_with`, `length`).
//!
//! Evaluation is pure: the same context and source always produce the same
//! outcome. Any structural failure (mismatched parentheses, unknown
//! function, wrong arity, malformed regex) surfaces as [`ExprError`]; the
//! policy engine treats such failures as non-matches, never as decisions.
//!
//! Parsed ASTs are cached keyed by source string so repeated evaluation of
//! the same rule condition does not re-parse.

#![deny(unsafe_code)]

mod ast;
mod eval;
mod parser;

pub use ast::{CmpOp, Expr, Func};
pub use eval::{eval_bool, values_equal};
pub use parser::parse;

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors raised while parsing or evaluating a condition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExprError {
    #[error("{0}")]
    Parse(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Function {name} expects {expected} arguments, got {got}")]
    Arity { name: &'static str, expected: usize, got: usize },
    #[error("Invalid regex pattern")]
    InvalidRegex,
}

const CACHE_CAP: usize = 1024;

static AST_CACHE: Lazy<RwLock<HashMap<String, Arc<Expr>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Parse a condition, consulting the process-wide AST cache.
pub fn parse_cached(src: &str) -> Result<Arc<Expr>, ExprError> {
    if let Some(hit) = AST_CACHE.read().expect("ast cache poisoned").get(src) {
        return Ok(hit.clone());
    }
    let parsed = Arc::new(parse(src)?);
    let mut cache = AST_CACHE.write().expect("ast cache poisoned");
    if cache.len() >= CACHE_CAP {
        cache.clear();
    }
    cache.insert(src.to_string(), parsed.clone());
    Ok(parsed)
}

/// Parse (cached) and evaluate a condition against a context.
pub fn evaluate(src: &str, ctx: &Value) -> Result<bool, ExprError> {
    let ast = parse_cached(src)?;
    eval_bool(&ast, ctx)
}
