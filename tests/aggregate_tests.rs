// tests/aggregate_tests.rs

use rstest::rstest;
use stroomql::{Expression, FieldIndex, Generator, Parser, StateError, Val};

fn expression(text: &str) -> Expression {
    let fields = FieldIndex::with_fields(["val1", "val2"]);
    Parser::default().parse(&fields, text).unwrap()
}

fn rows() -> Vec<Vec<Val>> {
    [12.0, 7.0, 30.0, 7.0, 1.0, 18.0, 25.0, 4.0, 9.0, 16.0, 3.0, 30.0]
        .into_iter()
        .map(|v| vec![Val::Double(v), Val::from(format!("k{}", v % 4.0))])
        .collect()
}

fn single(expression: &Expression, rows: &[Vec<Val>]) -> Generator {
    let mut generator = expression.create_generator();
    for row in rows {
        generator.set(row);
    }
    generator
}

/// Spread rows over `partitions` generators, round-robin.
fn partials(expression: &Expression, rows: &[Vec<Val>], partitions: usize) -> Vec<Generator> {
    let mut partials: Vec<Generator> = (0..partitions).map(|_| expression.create_generator()).collect();
    for (i, row) in rows.iter().enumerate() {
        partials[i % partitions].set(row);
    }
    partials
}

fn merge_all<'a>(expression: &Expression, parts: impl Iterator<Item = &'a Generator>) -> Generator {
    let mut result = expression.create_generator();
    for part in parts {
        result.merge(part).unwrap();
    }
    result
}

fn assert_close(actual: &Val, expected: &Val) {
    match (actual, expected) {
        (Val::Double(a), Val::Double(b)) => assert!((a - b).abs() < 1e-9, "{a} != {b}"),
        _ => assert_eq!(actual, expected),
    }
}

// ============================================================================
// Merging partial generators
// ============================================================================

#[rstest]
fn test_merge_matches_single_generator(
    #[values(
        "count()",
        "sum(${val1})",
        "min(${val1})",
        "max(${val1})",
        "average(${val1})",
        "stDev(${val1})",
        "variance(${val1})",
        "countUnique(${val1})",
        "countUnique(${val2})",
        "distinct(${val1}, ',', 4)",
        "distinct(${val2})",
        "joining(${val1}, ',')",
        "joining(${val2}, ',', 4)",
        "min(${val2})",
        "max(${val2})",
        "round(sum(${val1}) / count(), 3)",
        "max(${val1}) - min(${val1})"
    )]
    text: &str,
    #[values(2, 3, 5)] partitions: usize,
) {
    let expression = expression(text);
    let expected = single(&expression, &rows()).eval();
    let parts = partials(&expression, &rows(), partitions);

    let forward = merge_all(&expression, parts.iter()).eval();
    let reverse = merge_all(&expression, parts.iter().rev()).eval();
    assert_close(&forward, &expected);
    assert_close(&reverse, &expected);
}

#[test]
fn test_merge_is_associative() {
    let expression = expression("stDev(${val1})");
    let parts = partials(&expression, &rows(), 3);

    // (a + b) + c
    let mut left = parts[0].clone();
    left.merge(&parts[1]).unwrap();
    left.merge(&parts[2]).unwrap();

    // a + (b + c)
    let mut inner = parts[1].clone();
    inner.merge(&parts[2]).unwrap();
    let mut right = parts[0].clone();
    right.merge(&inner).unwrap();

    assert_close(&left.eval(), &right.eval());
}

#[test]
fn test_joining_keeps_lowest_values_with_duplicates() {
    let expression = expression("joining(${val1}, ',')");
    let rows = rows();
    let (first, second) = rows.split_at(5);
    let a = single(&expression, first);
    let b = single(&expression, second);

    let mut ab = a.clone();
    ab.merge(&b).unwrap();
    let mut ba = b.clone();
    ba.merge(&a).unwrap();
    assert_eq!(ab.eval(), single(&expression, &rows).eval());
    assert_eq!(ba.eval(), ab.eval());
    assert_eq!(ab.eval(), Val::from("1,3,4,7,7,9,12,16,18,25"));
}

#[rstest]
#[case("min(${val1})")]
#[case("max(${val1})")]
#[case("distinct(${val1}, ',')")]
#[case("joining(${val1}, ',')")]
fn test_equal_values_merge_the_same_either_way(#[case] text: &str) {
    let expression = expression(text);
    let a = single(&expression, &[vec![Val::from("2")]]);
    let b = single(&expression, &[vec![Val::from("2.0")], vec![Val::Integer(2)]]);

    let mut ab = a.clone();
    ab.merge(&b).unwrap();
    let mut ba = b.clone();
    ba.merge(&a).unwrap();
    assert_eq!(ab.eval(), ba.eval(), "{text}");
}

#[test]
fn test_distinct_keeps_lowest_values() {
    let expression = expression("distinct(${val1}, ',', 3)");
    let parts = partials(&expression, &rows(), 4);
    assert_eq!(merge_all(&expression, parts.iter()).eval(), Val::from("1,3,4"));
}

#[test]
fn test_merge_with_empty_generator() {
    let expression = expression("sum(${val1})");
    let full = single(&expression, &rows());
    let mut merged = expression.create_generator();
    merged.merge(&full).unwrap();
    merged.merge(&expression.create_generator()).unwrap();
    assert_eq!(merged.eval(), full.eval());
}

#[test]
fn test_errors_survive_merge() {
    let expression = expression("sum(${val1} / ${val2})");
    let mut a = expression.create_generator();
    a.set(&[Val::Double(1.0), Val::Double(0.0)]);
    let mut b = expression.create_generator();
    b.set(&[Val::Double(1.0), Val::Double(2.0)]);

    let mut ab = a.clone();
    ab.merge(&b).unwrap();
    let mut ba = b.clone();
    ba.merge(&a).unwrap();
    assert!(ab.eval().is_error());
    assert_eq!(ab.eval(), ba.eval());
}

#[test]
fn test_merge_rejects_other_expression() {
    let mut a = expression("sum(${val1})").create_generator();
    let b = expression("count() + 1").create_generator();
    assert!(matches!(a.merge(&b), Err(StateError::ShapeMismatch(_))));
}

// ============================================================================
// Serialized state
// ============================================================================

#[rstest]
#[case("sum(${val1})")]
#[case("average(${val1})")]
#[case("variance(${val1})")]
#[case("distinct(${val2}, '|')")]
#[case("joining(${val1}, ',', 5)")]
#[case("concat(${val2}, ':', count())")]
#[case("countUnique(${val1}) * 2")]
#[case("${val1}")]
fn test_read_write_preserves_result(#[case] text: &str) {
    let expression = expression(text);
    let original = single(&expression, &rows());

    let mut buffer = Vec::new();
    original.write(&mut buffer).unwrap();

    let mut restored = expression.create_generator();
    let mut input = buffer.as_slice();
    restored.read(&mut input).unwrap();
    assert!(input.is_empty());
    assert_eq!(restored.eval(), original.eval());
}

#[test]
fn test_restored_generator_keeps_accumulating() {
    let expression = expression("count()");
    let mut buffer = Vec::new();
    single(&expression, &rows()).write(&mut buffer).unwrap();

    let mut restored = expression.create_generator();
    restored.read(&mut buffer.as_slice()).unwrap();
    restored.set(&[]);
    assert_eq!(restored.eval(), Val::Long(13));
}

#[test]
fn test_frames_read_back_in_sequence() {
    let expression = expression("max(${val1})");
    let parts = partials(&expression, &rows(), 3);
    let mut buffer = Vec::new();
    for part in &parts {
        part.write(&mut buffer).unwrap();
    }

    let mut input = buffer.as_slice();
    for part in &parts {
        let mut restored = expression.create_generator();
        restored.read(&mut input).unwrap();
        assert_eq!(restored.eval(), part.eval());
    }
    assert!(input.is_empty());
}

#[test]
fn test_read_rejects_bad_state() {
    let expression = expression("sum(${val1})");
    let mut buffer = Vec::new();
    single(&expression, &rows()).write(&mut buffer).unwrap();

    let mut truncated = &buffer[..buffer.len() - 1];
    assert!(matches!(
        expression.create_generator().read(&mut truncated),
        Err(StateError::Truncated { .. })
    ));

    let mut wrong_version = buffer.clone();
    wrong_version[0] = 99;
    assert!(matches!(
        expression.create_generator().read(&mut wrong_version.as_slice()),
        Err(StateError::UnsupportedVersion { found: 99, .. })
    ));

    let mut other = self::expression("count()").create_generator();
    assert!(matches!(other.read(&mut buffer.as_slice()), Err(StateError::ShapeMismatch(_))));
}
