//! AST types for directive expressions

use super::value::Value;

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant: `'text'`, `42`, `true`, `null`, `undefined`
    Literal(Value),
    /// A bare name resolved through the scope chain: `user`
    Identifier(String),
    /// Array literal: `[a, b]`
    Array(Vec<Expr>),
    /// Property access: `user.name`, `user?.name`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// Computed access: `items[0]`, `row[key]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    /// Function call: `Math.max(a, b)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Boundary of a chain containing `?.`; a nullish hit inside yields `undefined`
    OptionalChain(Box<Expr>),
    /// Prefix operator: `!a`, `-a`, `typeof a`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Arithmetic, comparison and equality: `a + b`, `a === b`
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Short-circuit operators: `a && b`, `a || b`, `a ?? b`
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    /// Ternary: `cond ? a : b`
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

impl Expr {
    /// Names referenced as bare identifiers, in first-seen order
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_identifiers(self, &mut names);
        names
    }
}

fn collect_identifiers<'a>(expr: &'a Expr, names: &mut Vec<&'a str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Identifier(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        Expr::Array(items) => {
            for item in items {
                collect_identifiers(item, names);
            }
        }
        Expr::Member { object, .. } => collect_identifiers(object, names),
        Expr::Index { object, index, .. } => {
            collect_identifiers(object, names);
            collect_identifiers(index, names);
        }
        Expr::Call { callee, args } => {
            collect_identifiers(callee, names);
            for arg in args {
                collect_identifiers(arg, names);
            }
        }
        Expr::OptionalChain(inner) => collect_identifiers(inner, names),
        Expr::Unary { operand, .. } => collect_identifiers(operand, names),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            collect_identifiers(left, names);
            collect_identifiers(right, names);
        }
        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            collect_identifiers(condition, names);
            collect_identifiers(then_expr, names);
            collect_identifiers(else_expr, names);
        }
    }
}
