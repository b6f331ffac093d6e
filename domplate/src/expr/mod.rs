//! Directive expressions: parsing, values and evaluation
//!
//! Expressions are a fixed subset of JavaScript: literals, member and index
//! access (with `?.`), calls to allow-listed built-ins, unary, arithmetic,
//! comparison, logical and conditional operators.

pub mod ast;
pub mod builtins;
pub mod eval;
pub mod parser;
pub mod value;

pub use ast::Expr;
pub use eval::{EvalError, GLOBAL_NAME, eval_expr, evaluate, try_evaluate};
pub use parser::{ParseError, parse_expression};
pub use value::Value;
