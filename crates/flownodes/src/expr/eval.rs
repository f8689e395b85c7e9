use super::parser::{BinaryOp, Expr, UnaryOp};
use super::ExprError;
use flowcore::{Outputs, Value};
use std::borrow::Cow;

/// Read-only bindings an expression is evaluated against
pub(crate) struct Scope<'a> {
    inputs: &'a Outputs,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(inputs: &'a Outputs) -> Self {
        Self { inputs }
    }

    fn lookup(&self, name: &str) -> Result<Cow<'a, Value>, ExprError> {
        match name {
            "data" | "inputs" => Ok(Cow::Owned(Value::Object(self.inputs.clone()))),
            _ => self
                .inputs
                .get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| ExprError::UnknownIdentifier(name.to_string())),
        }
    }
}

pub(crate) fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, ExprError> {
    Ok(eval(expr, scope)?.into_owned())
}

fn eval<'s>(expr: &Expr, scope: &Scope<'s>) -> Result<Cow<'s, Value>, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Owned(value.clone())),
        Expr::Ident(name) => scope.lookup(name),
        Expr::Member(target, name) => {
            // `data.x` and `inputs.x` read straight from the bindings
            if let Expr::Ident(root) = target.as_ref() {
                if root == "data" || root == "inputs" {
                    return Ok(scope
                        .inputs
                        .get(name)
                        .map(Cow::Borrowed)
                        .unwrap_or(Cow::Owned(Value::Null)));
                }
            }
            let target = eval(target, scope)?;
            Ok(Cow::Owned(member(&target, name)))
        }
        Expr::Index(target, index) => {
            let target = eval(target, scope)?;
            let index = eval(index, scope)?;
            Ok(Cow::Owned(index_into(&target, &index)))
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope).map(Cow::into_owned))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, args).map(Cow::Owned)
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Cow::Owned(Value::Bool(!value.is_truthy()))),
                UnaryOp::Negate => Ok(Cow::Owned(Value::Number(-number(&value, "-")?))),
            }
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = eval(left, scope)?;
            if left.is_truthy() {
                eval(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = eval(left, scope)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval(right, scope)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            binary(*op, &left, &right).map(Cow::Owned)
        }
        Expr::Conditional(test, then, otherwise) => {
            if eval(test, scope)?.is_truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, scope).map(Cow::into_owned))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Cow::Owned(Value::Array(items))),
        Expr::Object(entries) => entries
            .iter()
            .map(|(key, value)| -> Result<(String, Value), ExprError> {
                Ok((key.clone(), eval(value, scope)?.into_owned()))
            })
            .collect::<Result<Outputs, _>>()
            .map(|map| Cow::Owned(Value::Object(map))),
    }
}

fn member(target: &Value, name: &str) -> Value {
    match (target, name) {
        (Value::Object(map), _) => map.get(name).cloned().unwrap_or(Value::Null),
        (Value::Array(items), "length") => Value::Number(items.len() as f64),
        (Value::String(s), "length") => Value::Number(s.chars().count() as f64),
        _ => Value::Null,
    }
}

fn index_into(target: &Value, index: &Value) -> Value {
    match (target, index) {
        (Value::Object(map), Value::String(key)) => map.get(key).cloned().unwrap_or(Value::Null),
        (Value::Array(items), Value::Number(n)) => position(*n)
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::String(s), Value::Number(n)) => position(*n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        (_, Value::String(key)) => member(target, key),
        _ => Value::Null,
    }
}

fn position(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn number(value: &Value, op: &str) -> Result<f64, ExprError> {
    value.as_f64().ok_or_else(|| {
        ExprError::Type(format!(
            "operator '{}' expects a number, got {}",
            op,
            value.type_name()
        ))
    })
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let symbol = match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    };

    let value = match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{}{}", left, right))
            }
            _ => {
                return Err(ExprError::Type(format!(
                    "operator '+' cannot combine {} and {}",
                    left.type_name(),
                    right.type_name()
                )))
            }
        },
        BinaryOp::Sub => Value::Number(number(left, symbol)? - number(right, symbol)?),
        BinaryOp::Mul => Value::Number(number(left, symbol)? * number(right, symbol)?),
        BinaryOp::Div | BinaryOp::Rem => {
            let (a, b) = (number(left, symbol)?, number(right, symbol)?);
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            Value::Number(if op == BinaryOp::Div { a / b } else { a % b })
        }
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::NotEq => Value::Bool(left != right),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(ExprError::Type(format!(
                        "operator '{}' cannot compare {} and {}",
                        symbol,
                        left.type_name(),
                        right.type_name()
                    )))
                }
            };
            let Some(ordering) = ordering else {
                // NaN compares false
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::And => {
            if left.is_truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinaryOp::Or => {
            if left.is_truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
    };
    Ok(value)
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), ExprError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Arity {
            function: name.to_string(),
            expected,
            actual: args.len(),
        })
    }
}

fn string_arg<'v>(name: &str, value: &'v Value) -> Result<&'v str, ExprError> {
    value.as_str().ok_or_else(|| {
        ExprError::Type(format!(
            "{}() expects a string, got {}",
            name,
            value.type_name()
        ))
    })
}

/// The whitelisted built-in functions
fn call(name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match name {
        "len" => {
            arity(name, &args, 1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => {
                    return Err(ExprError::Type(format!(
                        "len() expects a string, array or object, got {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Number(len as f64))
        }
        "lower" => {
            arity(name, &args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.to_lowercase()))
        }
        "upper" => {
            arity(name, &args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.to_uppercase()))
        }
        "trim" => {
            arity(name, &args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.trim().to_string()))
        }
        "str" => {
            arity(name, &args, 1)?;
            Ok(Value::String(args[0].to_string()))
        }
        "num" => {
            arity(name, &args, 1)?;
            match &args[0] {
                Value::Number(n) => Ok(Value::Number(*n)),
                Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
                Value::String(s) => s.trim().parse::<f64>().map(Value::Number).map_err(|_| {
                    ExprError::Type(format!("num() cannot parse '{}' as a number", s))
                }),
                other => Err(ExprError::Type(format!(
                    "num() cannot convert {}",
                    other.type_name()
                ))),
            }
        }
        "contains" => {
            arity(name, &args, 2)?;
            let found = match (&args[0], &args[1]) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::Array(items), needle) => items.contains(needle),
                (Value::Object(map), Value::String(key)) => map.contains_key(key),
                (other, _) => {
                    return Err(ExprError::Type(format!(
                        "contains() cannot search {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Bool(found))
        }
        "keys" => {
            arity(name, &args, 1)?;
            let Value::Object(map) = &args[0] else {
                return Err(ExprError::Type(format!(
                    "keys() expects an object, got {}",
                    args[0].type_name()
                )));
            };
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Ok(Value::Array(
                keys.into_iter().map(|k| Value::String(k.clone())).collect(),
            ))
        }
        "abs" => {
            arity(name, &args, 1)?;
            Ok(Value::Number(number(&args[0], "abs")?.abs()))
        }
        "round" => {
            arity(name, &args, 1)?;
            Ok(Value::Number(number(&args[0], "round")?.round()))
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}
