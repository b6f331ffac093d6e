//! Tree-walking evaluator for directive expressions

use super::ast::*;
use super::builtins;
use super::parser::{ParseError, parse_expression};
use super::value::Value;
use crate::scope::Scope;

/// Name under which the global value is visible to expressions
pub const GLOBAL_NAME: &str = "global";

/// Failure while evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The expression text did not parse
    Parse(ParseError),
    /// An identifier resolved nowhere
    Reference(String),
    /// Member access on `undefined`/`null`, calling a non-function
    Type(String),
    /// Argument out of range for a built-in
    Range(String),
    /// A `?.` hit a nullish receiver; resolved to `undefined` at the chain boundary
    ShortCircuit,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Parse(e) => write!(f, "SyntaxError: {}", e),
            EvalError::Reference(name) => write!(f, "ReferenceError: {} is not defined", name),
            EvalError::Type(msg) => write!(f, "TypeError: {}", msg),
            EvalError::Range(msg) => write!(f, "RangeError: {}", msg),
            EvalError::ShortCircuit => write!(f, "optional chain short-circuited"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        EvalError::Parse(e)
    }
}

/// Evaluate an expression, swallowing failures into `undefined`
///
/// Failures are logged at warn level with the expression text.
pub fn evaluate(expression: &str, scope: &Scope<'_>, global: &Value) -> Value {
    match try_evaluate(expression, scope, global) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Expression '{}' evaluated to undefined: {}", expression, e);
            Value::Undefined
        }
    }
}

/// Parse and evaluate an expression
pub fn try_evaluate(expression: &str, scope: &Scope<'_>, global: &Value) -> Result<Value, EvalError> {
    let expr = parse_expression(expression)?;
    eval_expr(&expr, scope, global)
}

/// Resolve a bare name: scope chain, then `global`, then built-ins
fn resolve_identifier(
    name: &str,
    scope: &Scope<'_>,
    global: &Value,
) -> Result<Value, EvalError> {
    if let Some(value) = scope.lookup(name) {
        return Ok(value.clone());
    }
    if name == GLOBAL_NAME {
        return Ok(global.clone());
    }
    builtins::lookup_global(name).ok_or_else(|| EvalError::Reference(name.to_string()))
}

/// Evaluate a parsed expression
pub fn eval_expr(expr: &Expr, scope: &Scope<'_>, global: &Value) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Identifier(name) => resolve_identifier(name, scope, global),

        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|item| eval_expr(item, scope, global))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array(values))
        }

        Expr::Member {
            object,
            property,
            optional,
        } => {
            let target = eval_expr(object, scope, global)?;
            if *optional && target.is_nullish() {
                return Err(EvalError::ShortCircuit);
            }
            builtins::property(&target, property)
        }

        Expr::Index {
            object,
            index,
            optional,
        } => {
            let target = eval_expr(object, scope, global)?;
            if *optional && target.is_nullish() {
                return Err(EvalError::ShortCircuit);
            }
            let key = eval_expr(index, scope, global)?;
            builtins::property(&target, &key.to_string())
        }

        Expr::Call { callee, args } => {
            let function = eval_expr(callee, scope, global)?;
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, scope, global))
                .collect::<Result<Vec<_>, _>>()?;
            match function {
                Value::Function(func) => builtins::call(&func, &args),
                _ => Err(EvalError::Type(format!(
                    "{} is not a function",
                    describe(callee)
                ))),
            }
        }

        Expr::OptionalChain(inner) => match eval_expr(inner, scope, global) {
            Err(EvalError::ShortCircuit) => Ok(Value::Undefined),
            other => other,
        },

        Expr::Unary { op, operand } => {
            // `typeof missing` is "undefined", not a reference error
            if *op == UnaryOp::TypeOf {
                if let Expr::Identifier(name) = operand.as_ref() {
                    let value = resolve_identifier(name, scope, global).unwrap_or_default();
                    return Ok(Value::from(value.type_of()));
                }
            }
            let value = eval_expr(operand, scope, global)?;
            Ok(eval_unary(*op, &value))
        }

        Expr::Binary { left, op, right } => {
            let left_val = eval_expr(left, scope, global)?;
            let right_val = eval_expr(right, scope, global)?;
            Ok(eval_binary(&left_val, *op, &right_val))
        }

        Expr::Logical { left, op, right } => {
            let left_val = eval_expr(left, scope, global)?;
            let short_circuits = match op {
                LogicalOp::And => !left_val.is_truthy(),
                LogicalOp::Or => left_val.is_truthy(),
                LogicalOp::Coalesce => !left_val.is_nullish(),
            };
            if short_circuits {
                Ok(left_val)
            } else {
                eval_expr(right, scope, global)
            }
        }

        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            let cond_val = eval_expr(condition, scope, global)?;
            if cond_val.is_truthy() {
                eval_expr(then_expr, scope, global)
            } else {
                eval_expr(else_expr, scope, global)
            }
        }
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!value.is_truthy()),
        UnaryOp::Negate => Value::Number(-value.to_number()),
        UnaryOp::Plus => Value::Number(value.to_number()),
        UnaryOp::TypeOf => Value::from(value.type_of()),
    }
}

fn eval_binary(left: &Value, op: BinaryOp, right: &Value) -> Value {
    use std::cmp::Ordering;

    match op {
        BinaryOp::Add => left.add(right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Bool(left.compare(right) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(left.compare(right) == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(
            left.compare(right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Ge => Value::Bool(matches!(
            left.compare(right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
    }
}

/// Source-like name of a callee for error messages
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{}", describe(object), property),
        Expr::OptionalChain(inner) => describe(inner),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_with(expression: &str, data: serde_json::Value) -> Value {
        let scope = Scope::root(Value::from(&data));
        let global = Value::from(&data);
        try_evaluate(expression, &scope, &global).unwrap()
    }

    fn eval(expression: &str) -> Value {
        eval_with(expression, json!({}))
    }

    #[test]
    fn test_eval_member_path() {
        let data = json!({"user": {"profile": {"name": "Alice"}}});
        assert_eq!(eval_with("user.profile.name", data), Value::from("Alice"));
    }

    #[test]
    fn test_eval_arithmetic_and_concat() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("'$' + 999"), Value::from("$999"));
        assert_eq!(eval("7 % 3"), Value::Number(1.0));
        assert_eq!(eval("-'3' + 1"), Value::Number(-2.0));
        assert!(eval("1 / 0").to_number().is_infinite());
    }

    #[test]
    fn test_eval_comparison_and_equality() {
        let data = json!({"age": 25, "role": "editor"});
        assert_eq!(eval_with("age >= 18", data.clone()), Value::Bool(true));
        assert_eq!(eval_with("role === 'editor'", data.clone()), Value::Bool(true));
        assert_eq!(eval_with("age == '25'", data.clone()), Value::Bool(true));
        assert_eq!(eval_with("age === '25'", data), Value::Bool(false));
        assert_eq!(eval("null == undefined"), Value::Bool(true));
        assert_eq!(eval("null === undefined"), Value::Bool(false));
    }

    #[test]
    fn test_eval_logical_returns_operands() {
        let data = json!({"name": "", "nick": "Al", "count": 0});
        assert_eq!(eval_with("name || nick", data.clone()), Value::from("Al"));
        assert_eq!(eval_with("nick && count", data.clone()), Value::Number(0.0));
        assert_eq!(eval_with("count ?? 5", data.clone()), Value::Number(0.0));
        assert_eq!(eval_with("missing ?? 5", json!({"missing": null})), Value::Number(5.0));
    }

    #[test]
    fn test_eval_ternary() {
        let data = json!({"active": true});
        assert_eq!(eval_with("active ? 'on' : 'off'", data), Value::from("on"));
        assert_eq!(eval("0 ? 'a' : '' ? 'b' : 'c'"), Value::from("c"));
    }

    #[test]
    fn test_eval_methods_and_builtins() {
        let data = json!({"name": "alice", "tags": ["a", "b"], "price": 3.5});
        assert_eq!(eval_with("name.toUpperCase()", data.clone()), Value::from("ALICE"));
        assert_eq!(eval_with("tags.length", data.clone()), Value::Number(2.0));
        assert_eq!(eval_with("tags.join('-')", data.clone()), Value::from("a-b"));
        assert_eq!(eval_with("tags[1]", data.clone()), Value::from("b"));
        assert_eq!(eval_with("price.toFixed(2)", data.clone()), Value::from("3.50"));
        assert_eq!(eval_with("Math.max(price, 10)", data), Value::Number(10.0));
        assert_eq!(eval("String(12) + 1"), Value::from("121"));
    }

    #[test]
    fn test_eval_global_name() {
        let scope = Scope::root(Value::from(json!({"x": 1})));
        let global = Value::from(json!({"company": "Tech Corp"}));
        assert_eq!(
            try_evaluate("global.company", &scope, &global).unwrap(),
            Value::from("Tech Corp")
        );

        // A context member named `global` shadows the injected value
        let scope = Scope::root(Value::from(json!({"global": {"company": "Local"}})));
        assert_eq!(
            try_evaluate("global.company", &scope, &global).unwrap(),
            Value::from("Local")
        );
    }

    #[test]
    fn test_eval_loop_binding_shadows_root() {
        let root = Scope::root(Value::from(json!({"item": "root", "suffix": "!"})));
        let child = root.child("item", Value::from("inner"));
        let global = Value::Undefined;
        assert_eq!(
            try_evaluate("item + suffix", &child, &global).unwrap(),
            Value::from("inner!")
        );
    }

    #[test]
    fn test_eval_optional_chaining() {
        let data = json!({"user": null, "profile": {"age": 3}});
        assert_eq!(eval_with("user?.name", data.clone()), Value::Undefined);
        assert_eq!(eval_with("user?.name.first", data.clone()), Value::Undefined);
        assert_eq!(eval_with("profile?.age", data), Value::Number(3.0));
    }

    #[test]
    fn test_eval_typeof() {
        assert_eq!(eval("typeof missing"), Value::from("undefined"));
        assert_eq!(eval("typeof 'x'"), Value::from("string"));
        assert_eq!(eval("typeof Math.max"), Value::from("function"));
    }

    #[test]
    fn test_eval_errors() {
        let scope = Scope::root(Value::from(json!({"user": null})));
        let global = Value::Undefined;

        assert_eq!(
            try_evaluate("missing", &scope, &global),
            Err(EvalError::Reference("missing".to_string()))
        );
        assert!(matches!(
            try_evaluate("user.name", &scope, &global),
            Err(EvalError::Type(_))
        ));
        assert!(matches!(
            try_evaluate("user()", &scope, &global),
            Err(EvalError::Type(msg)) if msg == "user is not a function"
        ));
        assert!(matches!(
            try_evaluate("a +", &scope, &global),
            Err(EvalError::Parse(_))
        ));
    }

    #[test]
    fn test_evaluate_swallows_errors() {
        let scope = Scope::root(Value::from(json!({})));
        let global = Value::Undefined;
        assert_eq!(evaluate("missing.deep.path", &scope, &global), Value::Undefined);
        assert_eq!(evaluate("((", &scope, &global), Value::Undefined);
        assert_eq!(evaluate("1 + 1", &scope, &global), Value::Number(2.0));
    }
}
