// crates/flownodes/tests/expression_test.rs

use flowcore::{Outputs, Value};
use flownodes::expr::{evaluate, ExprError, Expression, MAX_SOURCE_LEN};
use serde_json::json;

fn scope(value: serde_json::Value) -> Outputs {
    match Value::from(value) {
        Value::Object(map) => map,
        other => panic!("scope must be an object, got {}", other.type_name()),
    }
}

fn eval(source: &str, value: serde_json::Value) -> Value {
    evaluate(source, &scope(value)).unwrap()
}

#[test]
fn test_arithmetic_and_precedence() {
    assert_eq!(eval("1 + 2 * 3", json!({})), Value::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3", json!({})), Value::Number(9.0));
    assert_eq!(eval("10 % 4 - 1", json!({})), Value::Number(1.0));
    assert_eq!(eval("-x + 1", json!({"x": 3})), Value::Number(-2.0));
    assert_eq!(eval("1.5e2 / 3", json!({})), Value::Number(50.0));
}

#[test]
fn test_data_member_access() {
    assert_eq!(eval("data.x * 2", json!({"x": 5})), Value::Number(10.0));
    assert_eq!(eval("inputs.x", json!({"x": "a"})), Value::from("a"));
    assert_eq!(eval("x * 2", json!({"x": 5})), Value::Number(10.0));
    assert_eq!(
        eval("data.user.name", json!({"user": {"name": "ada"}})),
        Value::from("ada")
    );
    assert_eq!(eval("data.items[1]", json!({"items": [1, 2, 3]})), Value::Number(2.0));
    assert_eq!(eval("data['x']", json!({"x": true})), Value::Bool(true));
    assert_eq!(eval("items.length", json!({"items": [1, 2, 3]})), Value::Number(3.0));
}

#[test]
fn test_missing_members_are_null() {
    assert_eq!(eval("data.missing", json!({})), Value::Null);
    assert_eq!(eval("data.x.y.z", json!({"x": 1})), Value::Null);
    assert_eq!(eval("data.items[10]", json!({"items": []})), Value::Null);
}

#[test]
fn test_unknown_identifier_is_an_error() {
    let err = evaluate("nope + 1", &Outputs::new()).unwrap_err();
    assert_eq!(err, ExprError::UnknownIdentifier("nope".to_string()));
}

#[test]
fn test_comparisons_and_equality() {
    let data = json!({"amount": 50, "name": "bob"});
    assert_eq!(eval("data.amount > 100", data.clone()), Value::Bool(false));
    assert_eq!(eval("data.amount <= 50", data.clone()), Value::Bool(true));
    assert_eq!(eval("data.name == 'bob'", data.clone()), Value::Bool(true));
    assert_eq!(eval("data.name === \"bob\"", data.clone()), Value::Bool(true));
    assert_eq!(eval("data.name !== 'alice'", data.clone()), Value::Bool(true));
    assert_eq!(eval("'abc' < 'abd'", data.clone()), Value::Bool(true));
    assert_eq!(eval("[1, {a: 2}] == [1, {a: 2}]", data), Value::Bool(true));
    // no coercion
    assert_eq!(eval("1 == '1'", json!({})), Value::Bool(false));
}

#[test]
fn test_comparing_mismatched_types_fails() {
    let err = evaluate("1 < 'a'", &Outputs::new()).unwrap_err();
    assert!(matches!(err, ExprError::Type(_)));
}

#[test]
fn test_boolean_operators_short_circuit() {
    assert_eq!(eval("x > 1 && x < 10", json!({"x": 5})), Value::Bool(true));
    assert_eq!(eval("!x", json!({"x": 0})), Value::Bool(true));
    // the right side would fail if it were evaluated
    assert_eq!(eval("false && nope", json!({})), Value::Bool(false));
    assert_eq!(eval("true || nope", json!({})), Value::Bool(true));
    assert_eq!(eval("data.name || 'anonymous'", json!({})), Value::from("anonymous"));
}

#[test]
fn test_conditional_operator() {
    assert_eq!(
        eval("x > 100 ? 'big' : x > 10 ? 'medium' : 'small'", json!({"x": 50})),
        Value::from("medium")
    );
}

#[test]
fn test_string_concatenation() {
    assert_eq!(
        eval("'order-' + data.id", json!({"id": 42})),
        Value::from("order-42")
    );
    assert_eq!(eval("'a' + true", json!({})), Value::from("atrue"));
}

#[test]
fn test_arithmetic_on_non_numbers_fails() {
    assert!(matches!(
        evaluate("data.x * 2", &scope(json!({"x": "five"}))),
        Err(ExprError::Type(_))
    ));
    assert!(matches!(
        evaluate("null + 1", &Outputs::new()),
        Err(ExprError::Type(_))
    ));
}

#[test]
fn test_division_by_zero_fails() {
    assert_eq!(
        evaluate("1 / 0", &Outputs::new()),
        Err(ExprError::DivisionByZero)
    );
    assert_eq!(
        evaluate("1 % 0", &Outputs::new()),
        Err(ExprError::DivisionByZero)
    );
}

#[test]
fn test_literals() {
    assert_eq!(
        eval("{total: x * 2, tags: ['a', 'b'], none: null}", json!({"x": 2})),
        Value::from(json!({"total": 4, "tags": ["a", "b"], "none": null}))
    );
    assert_eq!(eval("'it\\'s'", json!({})), Value::from("it's"));
}

#[test]
fn test_builtin_functions() {
    let data = json!({"name": "  Ada  ", "items": [1, 2, 3], "obj": {"b": 1, "a": 2}});
    assert_eq!(eval("len(items)", data.clone()), Value::Number(3.0));
    assert_eq!(eval("upper(trim(name))", data.clone()), Value::from("ADA"));
    assert_eq!(eval("lower('ABC')", data.clone()), Value::from("abc"));
    assert_eq!(eval("contains(items, 2)", data.clone()), Value::Bool(true));
    assert_eq!(eval("contains(name, 'Ada')", data.clone()), Value::Bool(true));
    assert_eq!(eval("keys(obj)", data.clone()), Value::from(json!(["a", "b"])));
    assert_eq!(eval("num('12.5') + 1", data.clone()), Value::Number(13.5));
    assert_eq!(eval("str(12) + 'px'", data.clone()), Value::from("12px"));
    assert_eq!(eval("abs(-2)", data.clone()), Value::Number(2.0));
    assert_eq!(eval("round(2.6)", data), Value::Number(3.0));
}

#[test]
fn test_function_errors() {
    assert_eq!(
        evaluate("eval('1')", &Outputs::new()),
        Err(ExprError::UnknownFunction("eval".to_string()))
    );
    assert!(matches!(
        evaluate("len(1, 2)", &Outputs::new()),
        Err(ExprError::Arity { expected: 1, actual: 2, .. })
    ));
}

#[test]
fn test_host_code_is_rejected() {
    for source in [
        "x = 1",
        "data.constructor('return process')()",
        "function() {}",
        "while (true) {}",
        "a; b",
    ] {
        assert!(
            evaluate(source, &scope(json!({"x": 1, "a": 1, "b": 2}))).is_err(),
            "{} should not evaluate",
            source
        );
    }
}

#[test]
fn test_syntax_errors_carry_offsets() {
    match Expression::parse("1 + ") {
        Err(ExprError::Syntax { offset, .. }) => assert_eq!(offset, 4),
        other => panic!("expected syntax error, got {:?}", other),
    }
    assert!(matches!(Expression::parse(""), Err(ExprError::Syntax { .. })));
    assert!(matches!(Expression::parse("'open"), Err(ExprError::Syntax { .. })));
}

#[test]
fn test_limits() {
    let long = "1".repeat(MAX_SOURCE_LEN + 1);
    assert_eq!(
        Expression::parse(&long).unwrap_err(),
        ExprError::TooLong(MAX_SOURCE_LEN)
    );

    let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
    assert!(matches!(
        Expression::parse(&deep),
        Err(ExprError::TooDeep(_))
    ));

    let chain = vec!["1"; 500].join(" + ");
    assert!(matches!(
        Expression::parse(&chain),
        Err(ExprError::TooDeep(_))
    ));
}

#[test]
fn test_parsed_expression_is_reusable() {
    let expression = Expression::parse("amount > 100").unwrap();
    assert_eq!(expression.source(), "amount > 100");
    assert_eq!(
        expression.evaluate(&scope(json!({"amount": 150}))).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        expression.evaluate(&scope(json!({"amount": 50}))).unwrap(),
        Value::Bool(false)
    );
}
