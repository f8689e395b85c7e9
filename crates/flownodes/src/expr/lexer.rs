use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut lexer = Lexer {
        source,
        chars: source.char_indices().peekable(),
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Spanned>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), ExprError> {
        while let Some((offset, c)) = self.chars.next() {
            let token = match c {
                c if c.is_whitespace() => continue,
                '0'..='9' => self.number(offset)?,
                '"' | '\'' => self.string(offset, c)?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.word(offset),
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '.' => Token::Dot,
                ',' => Token::Comma,
                ':' => Token::Colon,
                '?' => Token::Question,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '%' => Token::Percent,
                '!' => {
                    if self.eat('=') {
                        // `!==` and `!=` compare the same way
                        self.eat('=');
                        Token::NotEq
                    } else {
                        Token::Bang
                    }
                }
                '=' => {
                    if self.eat('=') {
                        self.eat('=');
                        Token::EqEq
                    } else {
                        return Err(ExprError::syntax(offset, "assignment is not allowed"));
                    }
                }
                '<' => {
                    if self.eat('=') {
                        Token::Le
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    if self.eat('=') {
                        Token::Ge
                    } else {
                        Token::Gt
                    }
                }
                '&' => {
                    if self.eat('&') {
                        Token::AndAnd
                    } else {
                        return Err(ExprError::syntax(offset, "expected '&&'"));
                    }
                }
                '|' => {
                    if self.eat('|') {
                        Token::OrOr
                    } else {
                        return Err(ExprError::syntax(offset, "expected '||'"));
                    }
                }
                other => {
                    return Err(ExprError::syntax(
                        offset,
                        format!("unexpected character '{}'", other),
                    ))
                }
            };
            self.tokens.push(Spanned { token, offset });
        }
        Ok(())
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().map(|(_, c)| *c) == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn end_of(&mut self, start: usize, accept: impl Fn(char) -> bool) -> usize {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !accept(c) {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        end
    }

    fn number(&mut self, start: usize) -> Result<Token, ExprError> {
        let mut end = self.end_of(start, |c| c.is_ascii_digit()).max(start + 1);

        // Fraction only when a digit follows the dot, so `1.toString` style
        // member access still fails loudly in the parser.
        let mut lookahead = self.chars.clone();
        if let (Some((_, '.')), Some((_, d))) = (lookahead.next(), lookahead.next()) {
            if d.is_ascii_digit() {
                self.chars.next();
                end = self.end_of(end, |c| c.is_ascii_digit());
            }
        }

        if let Some(&(_, 'e' | 'E')) = self.chars.peek() {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let signed = matches!(lookahead.peek(), Some((_, '+' | '-')));
            if signed {
                lookahead.next();
            }
            if matches!(lookahead.peek(), Some((_, d)) if d.is_ascii_digit()) {
                self.chars.next();
                if signed {
                    self.chars.next();
                }
                end = self.end_of(end, |c| c.is_ascii_digit());
            }
        }

        let text = &self.source[start..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::syntax(start, format!("invalid number '{}'", text)))
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, ExprError> {
        let mut value = String::new();
        loop {
            let Some((offset, c)) = self.chars.next() else {
                return Err(ExprError::syntax(start, "unterminated string"));
            };
            match c {
                c if c == quote => return Ok(Token::Str(value)),
                '\\' => {
                    let Some((_, escaped)) = self.chars.next() else {
                        return Err(ExprError::syntax(offset, "unterminated escape"));
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        '\\' | '\'' | '"' => escaped,
                        other => {
                            return Err(ExprError::syntax(
                                offset,
                                format!("unknown escape '\\{}'", other),
                            ))
                        }
                    });
                }
                c => value.push(c),
            }
        }
    }

    fn word(&mut self, start: usize) -> Token {
        let end = self
            .end_of(start, |c| c.is_alphanumeric() || c == '_' || c == '$')
            .max(start + self.source[start..].chars().next().map_or(1, char::len_utf8));
        match &self.source[start..end] {
            "true" => Token::True,
            "false" => Token::False,
            "null" | "undefined" => Token::Null,
            word => Token::Ident(word.to_string()),
        }
    }
}
