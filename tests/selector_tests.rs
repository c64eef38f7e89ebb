// tests/selector_tests.rs

use rstest::rstest;
use stroomql::{ChildData, Expression, FieldIndex, Generator, Parser, Selector, Val};

fn expression(text: &str) -> Expression {
    let fields = FieldIndex::with_fields(["val1"]);
    Parser::default().parse(&fields, text).unwrap()
}

/// One child group per value, each fed a single row.
fn children(expression: &Expression, values: impl IntoIterator<Item = f64>) -> Vec<Generator> {
    values
        .into_iter()
        .map(|v| {
            let mut child = expression.create_generator();
            child.set(&[Val::Double(v)]);
            child
        })
        .collect()
}

fn select(text: &str, values: impl IntoIterator<Item = f64>) -> Val {
    let expression = expression(text);
    let children = children(&expression, values);
    expression.create_generator().eval_with(&children)
}

// ============================================================================
// Selection across child groups
// ============================================================================

#[rstest]
#[case("top(${val1}, ',', 3)", Val::from("1,2,3"))]
#[case("bottom(${val1}, ',', 3)", Val::from("8,9,10"))]
#[case("top(${val1}, ' ', 20)", Val::from("1 2 3 4 5 6 7 8 9 10"))]
#[case("first(${val1})", Val::Double(1.0))]
#[case("any(${val1})", Val::Double(1.0))]
#[case("last(${val1})", Val::Double(10.0))]
#[case("nth(${val1}, 4)", Val::Double(4.0))]
#[case("nth(${val1}, 11)", Val::Null)]
#[case("countGroups()", Val::Long(10))]
fn test_select_over_ten_children(#[case] text: &str, #[case] expected: Val) {
    assert_eq!(select(text, (1..=10).map(f64::from)), expected);
}

#[test]
fn test_children_keep_supplied_order() {
    assert_eq!(select("top(${val1}, ',', 2)", [5.0, 3.0, 9.0]), Val::from("5,3"));
    assert_eq!(select("last(${val1})", [5.0, 3.0, 9.0]), Val::Double(9.0));
}

#[test]
fn test_no_children() {
    assert_eq!(select("first(${val1})", []), Val::Null);
    assert_eq!(select("top(${val1}, ',', 3)", []), Val::from(""));
    assert_eq!(select("countGroups()", []), Val::Long(0));
}

#[test]
fn test_selection_inside_scalar() {
    assert_eq!(
        select("concat('>', first(${val1}), '<')", [7.0, 8.0]),
        Val::from(">7<")
    );
    assert_eq!(select("last(${val1}) * 2", [7.0, 8.0]), Val::Double(16.0));
}

#[test]
fn test_select_over_child_aggregates() {
    let expression = expression("top(sum(${val1}), ',', 2)");
    let mut children = Vec::new();
    for group in [[1.0, 2.0], [10.0, 20.0], [100.0, 200.0]] {
        let mut child = expression.create_generator();
        for v in group {
            child.set(&[Val::Double(v)]);
        }
        children.push(child);
    }
    assert_eq!(expression.create_generator().eval_with(&children), Val::from("3,30"));
}

#[test]
fn test_child_errors_propagate() {
    let expression = expression("top(10 / ${val1}, ',', 3)");
    let children = children(&expression, [1.0, 0.0, 2.0]);
    assert!(expression.create_generator().eval_with(&children).is_error());
}

// ============================================================================
// Selector protocol
// ============================================================================

#[test]
fn test_as_selector() {
    let expression = expression("first(${val1})");
    let parent = expression.create_generator();
    let selector = parent.as_selector().unwrap();
    let children = children(&expression, [4.0, 5.0]);
    assert_eq!(selector.select(&children), Val::Double(4.0));

    let plain = self::expression("sum(${val1})").create_generator();
    assert!(plain.as_selector().is_none());
}

#[test]
fn test_select_does_not_alter_parent() {
    let expression = expression("last(${val1})");
    let mut parent = expression.create_generator();
    parent.set(&[Val::Double(42.0)]);
    let children = children(&expression, [1.0, 2.0]);

    assert_eq!(parent.eval_with(&children), Val::Double(2.0));
    assert_eq!(parent.eval(), Val::Double(42.0));
}

#[test]
fn test_borrowed_children() {
    struct Groups<'a>(Vec<&'a Generator>);

    impl ChildData for Groups<'_> {
        fn child_generators(&self) -> Vec<&Generator> {
            self.0.clone()
        }
    }

    let expression = expression("nth(${val1}, 2)");
    let owned = children(&expression, [1.0, 2.0, 3.0]);
    let groups = Groups(owned.iter().rev().collect());
    assert_eq!(expression.create_generator().eval_with(&groups), Val::Double(2.0));

    let slice: &[&Generator] = &[&owned[2], &owned[0]];
    assert_eq!(expression.create_generator().eval_with(slice), Val::Double(1.0));
}
