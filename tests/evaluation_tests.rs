// tests/evaluation_tests.rs

use std::collections::BTreeMap;

use rstest::rstest;
use stroomql::{FieldIndex, Parser, Val, ValType};

fn fields() -> FieldIndex {
    FieldIndex::with_fields(["val1", "val2"])
}

fn eval_rows(expression: &str, rows: &[Vec<Val>]) -> Val {
    let expression = Parser::default().parse(&fields(), expression).unwrap();
    let mut generator = expression.create_generator();
    for row in rows {
        generator.set(row);
    }
    generator.eval()
}

fn eval(expression: &str) -> Val {
    eval_rows(expression, &[])
}

// ============================================================================
// Worked examples
// ============================================================================

#[test]
fn test_min_over_rows() {
    let rows: Vec<Vec<Val>> = [300.0, 180.0, 500.0].into_iter().map(|v| vec![Val::Double(v)]).collect();
    assert_eq!(eval_rows("min(${val1})", &rows), Val::Double(180.0));
}

#[test]
fn test_concat_with_field() {
    assert_eq!(
        eval_rows("concat(${val1}, ' is ', 'it')", &[vec![Val::from("this")]]),
        Val::from("this is it")
    );
}

#[test]
fn test_divide_by_zero() {
    let result = eval("8/0");
    assert_eq!(result.val_type(), ValType::Error);
}

#[test]
fn test_cast_and_type_of() {
    assert_eq!(eval("toBoolean('true')"), Val::Boolean(true));
    assert_eq!(eval("typeOf(1.234)"), Val::from("double"));
}

#[test]
fn test_field_plus_count_rounded() {
    let rows = [vec![Val::Double(1.34)], vec![Val::Double(1.8655)]];
    assert_eq!(eval_rows("round(${val1}+count(), 2)", &rows), Val::Double(3.87));
}

// ============================================================================
// Arithmetic
// ============================================================================

#[rstest]
#[case("1+2", Val::Double(3.0))]
#[case("7/2", Val::Double(3.5))]
#[case("2^10", Val::Double(1024.0))]
#[case("10%4", Val::Double(2.0))]
#[case("2+3*4", Val::Double(14.0))]
#[case("(2+3)*4", Val::Double(20.0))]
#[case("8-2-1", Val::Double(5.0))]
#[case("16/4/2", Val::Double(2.0))]
#[case("2^3^2", Val::Double(64.0))]
#[case("-(2*3)", Val::Double(-6.0))]
#[case("1 - -1", Val::Double(2.0))]
#[case("'a'+1", Val::from("a1"))]
#[case("1+'a'", Val::from("1a"))]
#[case("'5'*2", Val::Double(10.0))]
#[case("null()+1", Val::Null)]
fn test_arithmetic(#[case] expression: &str, #[case] expected: Val) {
    assert_eq!(eval(expression), expected);
}

#[test]
fn test_integral_values_stay_integral() {
    let rows = vec![vec![Val::Long(3)]; 3];
    assert_eq!(eval_rows("count()", &rows), Val::Long(3));
    assert_eq!(eval_rows("count() + count()", &rows), Val::Long(6));
    assert_eq!(eval_rows("${val1} * ${val1}", &rows), Val::Long(9));
    assert_eq!(eval_rows("${val1} / 2", &rows), Val::Double(1.5));
}

#[rstest]
#[case("8/0")]
#[case("8%0")]
#[case("'abc' - 1")]
#[case("-'abc'")]
fn test_arithmetic_errors(#[case] expression: &str) {
    assert!(eval(expression).is_error(), "{expression}");
}

// ============================================================================
// Aggregates nested in scalar functions
// ============================================================================

#[rstest]
#[case("max(max(${val1}), count())", &[3.0, 1.0, 2.0], Val::Double(3.0))]
#[case("max(max(${val1}), count())", &[3.0, 1.0, 2.0, 1.0], Val::Long(4))]
#[case("sum(sum(${val1}), count())", &[3.0, 1.0, 2.0], Val::Double(9.0))]
#[case("sum(sum(${val1}), count())", &[3.0, 4.0], Val::Double(9.0))]
#[case("min(min(${val1}), 100, 30, 8, count(), 55)", &[3.0, 1.0, 2.0], Val::Double(1.0))]
#[case("min(min(${val1}), 100, 30, 8, count(), 55)", &[9.0, 12.0], Val::Long(2))]
#[case("average(${val1}, count())", &[3.0, 1.0, 2.0], Val::Double(2.5))]
#[case("average(${val1}, count())", &[8.0, 6.0], Val::Double(4.0))]
fn test_nested_aggregates(#[case] expression: &str, #[case] values: &[f64], #[case] expected: Val) {
    let rows: Vec<Vec<Val>> = values.iter().map(|v| vec![Val::Double(*v)]).collect();
    assert_eq!(eval_rows(expression, &rows), expected, "{expression}");
}

// ============================================================================
// Comparison
// ============================================================================

#[rstest]
#[case("1 = 1", true)]
#[case("1 != 2", true)]
#[case("2 >= 3", false)]
#[case("2 <= 2", true)]
#[case("'10' > '9'", true)]
#[case("'abc' < 'abd'", true)]
#[case("'1.0' = 1", true)]
#[case("true() = 'true'", true)]
#[case("1+2 = 3", true)]
fn test_comparison(#[case] expression: &str, #[case] expected: bool) {
    assert_eq!(eval(expression), Val::Boolean(expected));
}

#[rstest]
#[case("null() = null()")]
#[case("null() < 1")]
#[case("1 > null()")]
#[case("${val2} = 'x'")]
fn test_null_comparison_is_error(#[case] expression: &str) {
    assert!(eval_rows(expression, &[vec![Val::from("a")]]).is_error(), "{expression}");
}

// ============================================================================
// Error absorption
// ============================================================================

#[rstest]
fn test_errors_absorb(
    #[values("+", "-", "*", "/", "%", "^", "=", "!=", "<", "<=", ">", ">=", " and ", " or ")] op: &str,
    #[values("1", "'a'", "null()", "true()", "false()", "0")] other: &str,
) {
    let left = format!("err(){op}{other}");
    let right = format!("{other}{op}err()");
    assert!(eval(&left).is_error(), "{left}");
    assert!(eval(&right).is_error(), "{right}");
}

#[test]
fn test_error_keeps_message() {
    assert_eq!(eval("1 + 8/0").error_message(), Some("Division by zero"));
}

// ============================================================================
// Logic
// ============================================================================

#[rstest]
#[case("true() and false()", Val::Boolean(false))]
#[case("true() or false()", Val::Boolean(true))]
#[case("true() and null()", Val::Null)]
#[case("false() and null()", Val::Boolean(false))]
#[case("true() or null()", Val::Boolean(true))]
#[case("null() or false()", Val::Null)]
#[case("not(true())", Val::Boolean(false))]
#[case("not(null())", Val::Null)]
#[case("'true' and 'false'", Val::Boolean(false))]
#[case("1 < 2 and 3 > 2", Val::Boolean(true))]
#[case("if(1 < 2, 'yes', 'no')", Val::from("yes"))]
#[case("if(true(), 1, 8/0)", Val::Double(1.0))]
fn test_logic(#[case] expression: &str, #[case] expected: Val) {
    assert_eq!(eval(expression), expected);
}

#[test]
fn test_non_boolean_text_in_logic() {
    assert_eq!(
        eval("'maybe' and true()").error_message(),
        Some("Expected a boolean but found 'maybe'")
    );
    assert!(eval("if(null(), 1, 2)").is_error());
}

// ============================================================================
// Error strictness
// ============================================================================

#[test]
fn test_strict_functions_return_first_error() {
    assert!(eval("concat(8/0, 'x')").is_error());
    assert!(eval("upperCase(err())").is_error());
}

#[test]
fn test_lenient_functions_see_errors() {
    assert_eq!(eval("isError(8/0)"), Val::Boolean(true));
    assert_eq!(eval("isNull(8/0)"), Val::Boolean(false));
    assert_eq!(eval("typeOf(8/0)"), Val::from("error"));
}

// ============================================================================
// Generator behaviour
// ============================================================================

#[test]
fn test_eval_is_repeatable() {
    let expression = Parser::default().parse(&fields(), "sum(${val1})").unwrap();
    let mut generator = expression.create_generator();
    generator.set(&[Val::Double(2.0)]);
    assert_eq!(generator.eval(), generator.eval());
    generator.set(&[Val::Double(3.0)]);
    assert_eq!(generator.eval(), Val::Double(5.0));
}

#[test]
fn test_fresh_generator() {
    assert_eq!(eval("${val1}"), Val::Null);
    assert_eq!(eval("count()"), Val::Long(0));
    assert_eq!(eval("sum(${val1})"), Val::Null);
}

#[test]
fn test_short_rows_read_null() {
    assert_eq!(eval_rows("${val2}", &[vec![Val::from("a")]]), Val::Null);
}

#[test]
fn test_generators_are_independent() {
    let expression = Parser::default().parse(&fields(), "count()").unwrap();
    let mut a = expression.create_generator();
    let b = expression.create_generator();
    a.set(&[]);
    assert_eq!(a.eval(), Val::Long(1));
    assert_eq!(b.eval(), Val::Long(0));
}

#[test]
fn test_static_mapped_values() {
    let mut expression = Parser::default().parse(&fields(), "concat(param('user'), ':', params())").unwrap();
    let mut values = BTreeMap::new();
    values.insert("user".to_string(), "jbloggs".to_string());
    values.insert("dept".to_string(), "ops".to_string());
    expression.set_static_mapped_values(values);

    assert_eq!(
        expression.create_generator().eval(),
        Val::from("jbloggs:dept=\"ops\" user=\"jbloggs\"")
    );
}
