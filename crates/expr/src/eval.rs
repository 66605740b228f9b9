//! Structural evaluation of parsed conditions against a context.

use crate::ast::{CmpOp, Expr, Func};
use crate::ExprError;
use regex::RegexBuilder;
use serde_json::Value;
use std::cmp::Ordering;
use warden_core::context::{resolve_path, truthy};

/// Evaluate a parsed expression to its boolean outcome.
pub fn eval_bool(expr: &Expr, ctx: &Value) -> Result<bool, ExprError> {
    match expr {
        Expr::Or(a, b) => {
            if eval_bool(a, ctx)? {
                return Ok(true);
            }
            eval_bool(b, ctx)
        }
        Expr::And(a, b) => {
            if !eval_bool(a, ctx)? {
                return Ok(false);
            }
            eval_bool(b, ctx)
        }
        Expr::Not(inner) => Ok(!eval_bool(inner, ctx)?),
        Expr::Cmp(op, lhs, rhs) => {
            let l = eval_value(lhs, ctx)?;
            let r = eval_value(rhs, ctx)?;
            Ok(compare(*op, &l, &r))
        }
        Expr::In(lhs, rhs) => {
            let needle = eval_value(lhs, ctx)?;
            let hay = eval_value(rhs, ctx)?;
            // Non-array RHS is a non-match, not an error, so compound AND
            // conditions fall through cleanly.
            match hay {
                Some(Value::Array(items)) => {
                    let needle = needle.unwrap_or(Value::Null);
                    Ok(items.iter().any(|item| values_equal(item, &needle)))
                }
                _ => Ok(false),
            }
        }
        Expr::Call(func, args) => eval_call(*func, args, ctx),
        Expr::Literal(v) => Ok(truthy(v)),
        Expr::Path(p) => Ok(resolve_path(ctx, p).map(truthy).unwrap_or(false)),
    }
}

/// Evaluate an expression to a value; `None` is an unresolved field path.
fn eval_value(expr: &Expr, ctx: &Value) -> Result<Option<Value>, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(Some(v.clone())),
        Expr::Path(p) => Ok(resolve_path(ctx, p).cloned()),
        other => Ok(Some(Value::Bool(eval_bool(other, ctx)?))),
    }
}

fn eval_call(func: Func, args: &[Expr], ctx: &Value) -> Result<bool, ExprError> {
    match func {
        Func::Has => {
            let path = path_argument(&args[0])?;
            Ok(resolve_path(ctx, &path).is_some())
        }
        Func::Contains => {
            match (string_value(&args[0], ctx)?, string_value(&args[1], ctx)?) {
                (Some(hay), Some(needle)) => {
                    Ok(hay.to_lowercase().contains(&needle.to_lowercase()))
                }
                _ => Ok(false),
            }
        }
        Func::RegexMatch => {
            let value = match string_value(&args[0], ctx)? {
                Some(s) => s,
                None => return Ok(false),
            };
            let pattern = match string_value(&args[1], ctx)? {
                Some(s) => s,
                None => return Ok(false),
            };
            let re = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|_| ExprError::InvalidRegex)?;
            Ok(re.is_match(&value))
        }
        Func::StartsWith => {
            match (string_value(&args[0], ctx)?, string_value(&args[1], ctx)?) {
                (Some(v), Some(prefix)) => {
                    Ok(v.to_lowercase().starts_with(&prefix.to_lowercase()))
                }
                _ => Ok(false),
            }
        }
        Func::EndsWith => match (string_value(&args[0], ctx)?, string_value(&args[1], ctx)?) {
            (Some(v), Some(suffix)) => Ok(v.to_lowercase().ends_with(&suffix.to_lowercase())),
            _ => Ok(false),
        },
        Func::Length => {
            let len = match eval_value(&args[0], ctx)? {
                Some(Value::String(s)) => s.chars().count(),
                Some(Value::Array(a)) => a.len(),
                Some(Value::Object(m)) => m.len(),
                _ => 0,
            };
            Ok(len > 0)
        }
    }
}

/// `has()` takes a field path: either a bare path or a quoted one.
fn path_argument(arg: &Expr) -> Result<String, ExprError> {
    match arg {
        Expr::Path(p) => Ok(p.clone()),
        Expr::Literal(Value::String(s)) => Ok(s.clone()),
        _ => Err(ExprError::Parse("has() requires a field path".into())),
    }
}

fn string_value(arg: &Expr, ctx: &Value) -> Result<Option<String>, ExprError> {
    Ok(match eval_value(arg, ctx)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn compare(op: CmpOp, lhs: &Option<Value>, rhs: &Option<Value>) -> bool {
    let l = lhs.as_ref().unwrap_or(&Value::Null);
    let r = rhs.as_ref().unwrap_or(&Value::Null);
    match op {
        CmpOp::Eq => values_equal(l, r),
        CmpOp::Ne => !values_equal(l, r),
        CmpOp::Gt | CmpOp::Ge | CmpOp::Lt | CmpOp::Le => match ordering(l, r) {
            Some(ord) => match op {
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Ge => ord != Ordering::Less,
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Le => ord != Ordering::Greater,
                _ => unreachable!(),
            },
            // Mixed or non-comparable types are a non-match, not an error.
            None => false,
        },
    }
}

/// Ordering is defined for number/number and string/string pairs only.
fn ordering(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Deep structural equality with numeric coercion across integer/float.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).map(|w| values_equal(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    fn eval(src: &str, ctx: &Value) -> bool {
        eval_bool(&parse(src).unwrap(), ctx).unwrap()
    }

    #[test]
    fn numeric_equality_coerces_int_float() {
        let ctx = json!({"n": 1.0});
        assert!(eval("n == 1", &ctx));
        assert!(!eval("n != 1", &ctx));
    }

    #[test]
    fn mixed_type_ordering_is_false() {
        let ctx = json!({"s": "abc", "n": 3});
        assert!(!eval("s > n", &ctx));
        assert!(!eval("s <= n", &ctx));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let ctx = json!({"a": "apple", "b": "banana"});
        assert!(eval("a < b", &ctx));
        assert!(eval("b >= a", &ctx));
    }

    #[test]
    fn in_on_non_array_is_false() {
        let ctx = json!({"x": "v", "bag": "not-an-array"});
        assert!(!eval("x in bag", &ctx));
        assert!(!eval("x in missing", &ctx));
    }

    #[test]
    fn undefined_leaf_is_false_in_boolean_position() {
        let ctx = json!({});
        assert!(!eval("some.missing.path", &ctx));
        assert!(eval("!some.missing.path", &ctx));
    }

    #[test]
    fn short_circuit_skips_rhs_errors() {
        // RHS has an invalid regex, but the LHS already decides the outcome.
        let ctx = json!({"x": false, "s": "abc"});
        assert!(!eval("x && regex_match(s, '(unclosed')", &ctx));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let ctx = json!({"s": "abc"});
        let err = eval_bool(&parse("regex_match(s, '(unclosed')").unwrap(), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "Invalid regex pattern");
    }

    #[test]
    fn case_insensitive_string_functions() {
        let ctx = json!({"s": "Hello World"});
        assert!(eval("contains(s, 'WORLD')", &ctx));
        assert!(eval("starts_with(s, 'hello')", &ctx));
        assert!(eval("ends_with(s, 'WORLD')", &ctx));
        assert!(eval("regex_match(s, 'hello\\s+world')", &ctx));
    }

    #[test]
    fn contains_on_non_string_is_false() {
        let ctx = json!({"n": 42, "s": "x"});
        assert!(!eval("contains(n, s)", &ctx));
        assert!(!eval("contains(s, n)", &ctx));
    }

    #[test]
    fn length_counts_strings_arrays_objects() {
        let ctx = json!({"s": "ab", "a": [], "o": {"k": 1}});
        assert!(eval("length(s)", &ctx));
        assert!(!eval("length(a)", &ctx));
        assert!(eval("length(o)", &ctx));
        assert!(!eval("length(missing)", &ctx));
    }
}
