use super::lexer::{tokenize, Spanned, Token};
use super::ExprError;
use flowcore::Value;

pub(crate) const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

pub(crate) fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: source.len(),
    };
    if parser.tokens.is_empty() {
        return Err(ExprError::syntax(0, "empty expression"));
    }
    let expr = parser.expression()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(ExprError::syntax(
            extra.offset,
            format!("unexpected {:?} after expression", extra.token),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(ExprError::syntax(self.offset(), format!("expected {}", what)))
        }
    }

    /// Account for one more level of AST nesting
    fn nest(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(ExprError::TooDeep(MAX_DEPTH))
        } else {
            Ok(())
        }
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.nest()?;
        let expr = self.conditional();
        self.depth -= 1;
        expr
    }

    fn conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let then = self.expression()?;
        self.expect(Token::Colon, "':' in conditional")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ExprError>,
        ops: &[(Token, BinaryOp)],
    ) -> Result<Expr, ExprError> {
        let mut left = next(self)?;
        let mut nested = 0;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    self.nest()?;
                    nested += 1;
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            self.depth -= nested;
            return Ok(left);
        }
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(Self::and, &[(Token::OrOr, BinaryOp::Or)])
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(Self::equality, &[(Token::AndAnd, BinaryOp::And)])
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            Self::comparison,
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
        )
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            Self::additive,
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            Self::term,
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
        )
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            Self::unary,
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = if self.eat(&Token::Bang) {
            UnaryOp::Not
        } else if self.eat(&Token::Minus) {
            UnaryOp::Negate
        } else {
            return self.postfix();
        };
        self.nest()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        let start_depth = self.depth;
        loop {
            if matches!(
                self.peek(),
                Some(Token::Dot | Token::LBracket | Token::LParen)
            ) {
                self.nest()?;
            }
            if self.eat(&Token::Dot) {
                let offset = self.offset();
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::Member(Box::new(expr), name),
                    _ => return Err(ExprError::syntax(offset, "expected property name after '.'")),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek() == Some(&Token::LParen) {
                let Expr::Ident(name) = expr else {
                    return Err(ExprError::syntax(
                        self.offset(),
                        "only built-in functions can be called",
                    ));
                };
                self.pos += 1;
                let args = self.list(Token::RParen, "')'")?;
                expr = Expr::Call(name, args);
            } else {
                self.depth = start_depth;
                return Ok(expr);
            }
        }
    }

    fn list(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(&close) {
                return Ok(items);
            }
            self.expect(Token::Comma, &format!("',' or {}", what))?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        let Some(token) = self.advance() else {
            return Err(ExprError::syntax(offset, "unexpected end of expression"));
        };
        match token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let expr = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => Ok(Expr::Array(self.list(Token::RBracket, "']'")?)),
            Token::LBrace => self.object(),
            other => Err(ExprError::syntax(offset, format!("unexpected {:?}", other))),
        }
    }

    fn object(&mut self) -> Result<Expr, ExprError> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Object(entries));
        }
        loop {
            let offset = self.offset();
            let key = match self.advance() {
                Some(Token::Ident(name)) => name,
                Some(Token::Str(s)) => s,
                _ => return Err(ExprError::syntax(offset, "expected object key")),
            };
            self.expect(Token::Colon, "':' after object key")?;
            let value = self.expression()?;
            entries.push((key, value));
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries));
            }
            self.expect(Token::Comma, "',' or '}'")?;
        }
    }
}
