//! Recursive descent parser for directive expressions
//!
//! Precedence (lowest to highest):
//!   conditional -> `??` -> `||` -> `&&` -> equality -> relational ->
//!   additive -> multiplicative -> unary -> postfix -> primary

use super::ast::*;
use super::value::Value;

/// Parse error with position information
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    pub context: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse an expression string into an AST
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}

/// Token types for the expression lexer
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Ident(String),
    Number(f64),
    String(String),
    True,
    False,
    Null,
    Undefined,
    TypeOf,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Question,
    QuestionDot,
    DoubleQuestion,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // End of input
    Eof,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Lexer for expression tokens
struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn current_pos(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    fn error(&self, message: impl Into<String>, pos: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position: pos,
            context: self.input[pos..].chars().take(20).collect(),
        }
    }

    /// Consume `ch` if it is next
    fn eat(&mut self, ch: char) -> bool {
        if let Some(&(_, c)) = self.chars.peek() {
            if c == ch {
                self.chars.next();
                return true;
            }
        }
        false
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        // Single-char tokens
        let single = match ch {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = single {
            self.chars.next();
            return Ok(token);
        }

        // Multi-char operators
        match ch {
            '?' => {
                self.chars.next();
                if self.eat('?') {
                    return Ok(Token::DoubleQuestion);
                }
                // `a?.5:1` is a ternary, not optional chaining
                let rest = &self.input[pos + 1..];
                if rest.starts_with('.') && !rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
                    self.chars.next();
                    return Ok(Token::QuestionDot);
                }
                return Ok(Token::Question);
            }
            '=' => {
                self.chars.next();
                if self.eat('=') {
                    if self.eat('=') {
                        return Ok(Token::EqEqEq);
                    }
                    return Ok(Token::EqEq);
                }
                return Err(self.error("assignment is not supported, use '==' or '==='", pos));
            }
            '!' => {
                self.chars.next();
                if self.eat('=') {
                    if self.eat('=') {
                        return Ok(Token::NotEqEq);
                    }
                    return Ok(Token::NotEq);
                }
                return Ok(Token::Bang);
            }
            '<' => {
                self.chars.next();
                if self.eat('=') {
                    return Ok(Token::Le);
                }
                return Ok(Token::Lt);
            }
            '>' => {
                self.chars.next();
                if self.eat('=') {
                    return Ok(Token::Ge);
                }
                return Ok(Token::Gt);
            }
            '&' => {
                self.chars.next();
                if self.eat('&') {
                    return Ok(Token::AndAnd);
                }
                return Err(self.error("bitwise '&' is not supported, use '&&'", pos));
            }
            '|' => {
                self.chars.next();
                if self.eat('|') {
                    return Ok(Token::OrOr);
                }
                return Err(self.error("bitwise '|' is not supported, use '||'", pos));
            }
            _ => {}
        }

        // String literal
        if ch == '\'' || ch == '"' {
            return self.read_string(ch, pos);
        }

        // Number, including `.5`
        let starts_fraction = ch == '.'
            && self.input[pos + 1..].starts_with(|c: char| c.is_ascii_digit());
        if ch.is_ascii_digit() || starts_fraction {
            return self.read_number(pos);
        }

        if ch == '.' {
            self.chars.next();
            return Ok(Token::Dot);
        }

        // Identifier or keyword
        if is_ident_start(ch) {
            let start = pos;
            while let Some(&(_, c)) = self.chars.peek() {
                if is_ident_continue(c) {
                    self.chars.next();
                } else {
                    break;
                }
            }
            let end = self.current_pos();
            let ident = &self.input[start..end];

            return Ok(match ident {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                "undefined" => Token::Undefined,
                "typeof" => Token::TypeOf,
                _ => Token::Ident(ident.to_string()),
            });
        }

        Err(self.error(format!("unexpected character: '{}'", ch), pos))
    }

    fn read_string(&mut self, quote: char, pos: usize) -> Result<Token, ParseError> {
        self.chars.next(); // consume opening quote
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => {
                    let Some((esc_pos, esc)) = self.chars.next() else {
                        return Err(self.error("unclosed string literal", pos));
                    };
                    match esc {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        '0' => s.push('\0'),
                        'u' => {
                            let hex: String = (0..4).filter_map(|_| self.chars.next()).map(|(_, c)| c).collect();
                            let decoded = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| self.error("invalid unicode escape", esc_pos))?;
                            s.push(decoded);
                        }
                        other => s.push(other),
                    }
                }
                Some((_, c)) => s.push(c),
                None => return Err(self.error("unclosed string literal", pos)),
            }
        }
        Ok(Token::String(s))
    }

    fn read_number(&mut self, start: usize) -> Result<Token, ParseError> {
        let mut seen_dot = false;
        let mut seen_exp = false;

        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else if c == '.' && !seen_dot && !seen_exp {
                // `1.toFixed` is not valid anyway; only take the dot before a digit
                if !self.input[i + 1..].starts_with(|d: char| d.is_ascii_digit()) {
                    break;
                }
                seen_dot = true;
                self.chars.next();
            } else if (c == 'e' || c == 'E') && !seen_exp {
                let rest = &self.input[i + 1..];
                let rest = rest.strip_prefix(['+', '-']).unwrap_or(rest);
                if !rest.starts_with(|d: char| d.is_ascii_digit()) {
                    break;
                }
                seen_exp = true;
                self.chars.next();
                if let Some(&(_, sign)) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        self.chars.next();
                    }
                }
            } else {
                break;
            }
        }

        let end = self.current_pos();
        let num_str = &self.input[start..end];
        let n: f64 = num_str.parse().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
            context: num_str.to_string(),
        })?;
        Ok(Token::Number(n))
    }
}

/// Expression parser
struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// Start offset of `current`
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        lexer.skip_whitespace();
        let position = lexer.current_pos();
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            position,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.lexer.skip_whitespace();
        self.position = self.lexer.current_pos();
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.position,
            context: self.lexer.input[self.position..].chars().take(20).collect(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.current == expected {
            self.advance()
        } else {
            Err(self.error(format!(
                "expected {:?}, found {:?}",
                expected, self.current
            )))
        }
    }

    /// Parse the full expression
    fn parse(&mut self) -> Result<Expr, ParseError> {
        if self.current == Token::Eof {
            return Err(self.error("empty expression"));
        }

        let expr = self.parse_conditional()?;

        if self.current != Token::Eof {
            return Err(self.error(format!(
                "unexpected token after expression: {:?}",
                self.current
            )));
        }

        Ok(expr)
    }

    /// conditional = coalesce ("?" conditional ":" conditional)?
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_coalesce()?;

        if self.current == Token::Question {
            self.advance()?;
            let then_expr = self.parse_conditional()?; // Right-associative
            self.expect(Token::Colon)?;
            let else_expr = self.parse_conditional()?;

            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }

        Ok(condition)
    }

    /// coalesce = or ("??" or)*
    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_or()?;
        while self.current == Token::DoubleQuestion {
            self.advance()?;
            let right = self.parse_or()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::Coalesce,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// or = and ("||" and)*
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.current == Token::OrOr {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// and = equality ("&&" equality)*
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.current == Token::AndAnd {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Left-associative binary level over `next`
    fn parse_binary_level(
        &mut self,
        ops: fn(&Token) -> Option<BinaryOp>,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        while let Some(op) = ops(&self.current) {
            self.advance()?;
            let right = next(self)?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// equality = relational (("==" | "!=" | "===" | "!==") relational)*
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::EqEq => Some(BinaryOp::Eq),
                Token::NotEq => Some(BinaryOp::Ne),
                Token::EqEqEq => Some(BinaryOp::StrictEq),
                Token::NotEqEq => Some(BinaryOp::StrictNe),
                _ => None,
            },
            Self::parse_relational,
        )
    }

    /// relational = additive (("<" | "<=" | ">" | ">=") additive)*
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Lt => Some(BinaryOp::Lt),
                Token::Le => Some(BinaryOp::Le),
                Token::Gt => Some(BinaryOp::Gt),
                Token::Ge => Some(BinaryOp::Ge),
                _ => None,
            },
            Self::parse_additive,
        )
    }

    /// additive = multiplicative (("+" | "-") multiplicative)*
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Plus => Some(BinaryOp::Add),
                Token::Minus => Some(BinaryOp::Sub),
                _ => None,
            },
            Self::parse_multiplicative,
        )
    }

    /// multiplicative = unary (("*" | "/" | "%") unary)*
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Star => Some(BinaryOp::Mul),
                Token::Slash => Some(BinaryOp::Div),
                Token::Percent => Some(BinaryOp::Rem),
                _ => None,
            },
            Self::parse_unary,
        )
    }

    /// unary = ("!" | "-" | "+" | "typeof") unary | postfix
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current {
            Token::Bang => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Negate),
            Token::Plus => Some(UnaryOp::Plus),
            Token::TypeOf => Some(UnaryOp::TypeOf),
            _ => None,
        };

        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_postfix()
    }

    /// postfix = primary ("." ident | "?." ident | "[" expr "]" | "(" args ")")*
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let mut has_optional = false;

        loop {
            match self.current {
                Token::Dot | Token::QuestionDot => {
                    let optional = self.current == Token::QuestionDot;
                    has_optional |= optional;
                    self.advance()?;

                    // `a?.[0]` and `a?.(x)`
                    if optional && self.current == Token::LBracket {
                        expr = self.parse_index(expr, true)?;
                        continue;
                    }

                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional,
                    };
                }
                Token::LBracket => {
                    expr = self.parse_index(expr, false)?;
                }
                Token::LParen => {
                    self.advance()?;
                    let args = self.parse_list(Token::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }

        if has_optional {
            expr = Expr::OptionalChain(Box::new(expr));
        }
        Ok(expr)
    }

    /// Identifier after a dot; keywords are valid property names
    fn property_name(&mut self) -> Result<String, ParseError> {
        let name = match &self.current {
            Token::Ident(name) => name.clone(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::Null => "null".to_string(),
            Token::Undefined => "undefined".to_string(),
            Token::TypeOf => "typeof".to_string(),
            other => {
                return Err(self.error(format!("expected property name, found {:?}", other)));
            }
        };
        self.advance()?;
        Ok(name)
    }

    fn parse_index(&mut self, object: Expr, optional: bool) -> Result<Expr, ParseError> {
        self.expect(Token::LBracket)?;
        let index = self.parse_conditional()?;
        self.expect(Token::RBracket)?;
        Ok(Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            optional,
        })
    }

    /// Comma-separated expressions up to `close`, which is consumed
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while self.current != close {
            items.push(self.parse_conditional()?);
            if self.current == Token::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    /// primary = literal | ident | "(" expr ")" | "[" list "]"
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let expr = match &self.current {
            Token::Number(n) => Expr::Literal(Value::Number(*n)),
            Token::String(s) => Expr::Literal(Value::String(s.clone())),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Null => Expr::Literal(Value::Null),
            Token::Undefined => Expr::Literal(Value::Undefined),
            Token::Ident(name) => Expr::Identifier(name.clone()),
            Token::LParen => {
                self.advance()?;
                let inner = self.parse_conditional()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => {
                self.advance()?;
                let items = self.parse_list(Token::RBracket)?;
                return Ok(Expr::Array(items));
            }
            Token::Eof => return Err(self.error("unexpected end of expression")),
            other => return Err(self.error(format!("unexpected token: {:?}", other))),
        };
        self.advance()?;
        Ok(expr)
    }
}
