//! Sandboxed expression language for `transform` and `condition` nodes
//!
//! Expressions are parsed once into a small AST and evaluated against a
//! read-only view of a node's inputs. The grammar covers literals, field
//! and index access, arithmetic, comparisons, boolean operators, the
//! conditional operator, array/object literals and a fixed set of pure
//! functions. Nothing in it can reach the host: no assignment, no loops,
//! no user-defined functions.

mod eval;
mod lexer;
mod parser;

use flowcore::{Outputs, Value};
use thiserror::Error;

/// Longest accepted expression source, in bytes
pub const MAX_SOURCE_LEN: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("expression is longer than {0} bytes")]
    TooLong(usize),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        ExprError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// A parsed expression, ready to evaluate any number of times
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: parser::Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        if source.len() > MAX_SOURCE_LEN {
            return Err(ExprError::TooLong(MAX_SOURCE_LEN));
        }
        let ast = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `data`/`inputs` bound to `inputs`, and every key of
    /// `inputs` also reachable as a bare identifier.
    pub fn evaluate(&self, inputs: &Outputs) -> Result<Value, ExprError> {
        eval::evaluate(&self.ast, &eval::Scope::new(inputs))
    }
}

/// Parse and evaluate in one step
pub fn evaluate(source: &str, inputs: &Outputs) -> Result<Value, ExprError> {
    Expression::parse(source)?.evaluate(inputs)
}
