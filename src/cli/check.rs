//! Evaluate an expression over JSON rows

use tracing::debug;

use super::{CliError, json_to_val, val_to_json};
use crate::{ExpressionContext, FieldIndex, Generator, Parser, Val};

/// Options for the check command
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// The expression to evaluate
    pub expression: String,
    /// Field names in slot order; object rows add their keys after these
    pub fields: Vec<String>,
    /// JSON array of rows, each an array of values or an object keyed by field
    pub rows: Option<String>,
    /// Number of partial generators the rows are spread over before merging
    pub partitions: usize,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
    pub context: ExpressionContext,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            expression: String::new(),
            fields: Vec::new(),
            rows: None,
            partitions: 1,
            syntax_only: false,
            context: ExpressionContext::default(),
        }
    }
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed; holds the canonical form of the expression
    SyntaxValid(String),
    /// Expression evaluated with JSON output
    Success(serde_json::Value),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let rows: Vec<serde_json::Value> = match &options.rows {
        Some(text) => serde_json::from_str(text)?,
        None => Vec::new(),
    };

    let mut fields = FieldIndex::with_fields(options.fields.iter().cloned());
    for row in &rows {
        if let serde_json::Value::Object(map) = row {
            for key in map.keys() {
                fields.create(key.as_str());
            }
        }
    }

    let expression = Parser::with_context(options.context.clone()).parse(&fields, &options.expression)?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid(expression.to_string()));
    }

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| to_row(&fields, i, row))
        .collect::<Result<Vec<_>, _>>()?;

    // Contiguous chunks, merged back in row order
    let partitions = options.partitions.max(1);
    let chunk = rows.len().div_ceil(partitions).max(1);
    let mut partials: Vec<Generator> = (0..partitions).map(|_| expression.create_generator()).collect();
    for (i, row) in rows.iter().enumerate() {
        partials[i / chunk].set(row);
    }

    // Ship every partial through its serialized form, as a remote node would
    let mut buffer = Vec::new();
    for partial in &partials {
        partial.write(&mut buffer)?;
    }
    debug!(partitions, bytes = buffer.len(), "merging partial generators");

    let mut input = buffer.as_slice();
    let mut result = expression.create_generator();
    for _ in 0..partitions {
        let mut partial = expression.create_generator();
        partial.read(&mut input)?;
        result.merge(&partial)?;
    }

    Ok(CheckResult::Success(val_to_json(result.eval())))
}

fn to_row(fields: &FieldIndex, index: usize, row: serde_json::Value) -> Result<Vec<Val>, CliError> {
    match row {
        serde_json::Value::Array(values) => Ok(values.into_iter().map(json_to_val).collect()),
        serde_json::Value::Object(map) => {
            let mut values = vec![Val::Null; fields.len()];
            for (key, value) in map {
                if let Some(slot) = fields.get(&key) {
                    values[slot] = json_to_val(value);
                }
            }
            Ok(values)
        }
        other => Err(CliError::InvalidRows(format!(
            "row {} must be an array or an object, found {}",
            index, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(expression: &str, rows: &str, partitions: usize) -> serde_json::Value {
        let options = CheckOptions {
            expression: expression.to_string(),
            fields: vec!["val1".to_string()],
            rows: Some(rows.to_string()),
            partitions,
            ..CheckOptions::default()
        };
        match execute_check(&options).unwrap() {
            CheckResult::Success(value) => value,
            CheckResult::SyntaxValid(_) => panic!("expected a result"),
        }
    }

    #[test]
    fn test_partitions_agree() {
        let rows = "[[300], [180], [500], [20], [7]]";
        for partitions in 1..=4 {
            assert_eq!(check("min(${val1})", rows, partitions), json!(7));
            assert_eq!(check("sum(${val1})", rows, partitions), json!(1007.0));
            assert_eq!(check("count()", rows, partitions), json!(5));
        }
    }

    #[test]
    fn test_partitions_keep_order_sensitive_results() {
        let rows = "[[4], [2], [3], [1], [2]]";
        for expression in ["joining(${val1}, ',')", "distinct(${val1}, ',')", "${val1}"] {
            let whole = check(expression, rows, 1);
            for partitions in 2..=5 {
                assert_eq!(check(expression, rows, partitions), whole, "{expression} / {partitions}");
            }
        }
        assert_eq!(check("joining(${val1}, ',')", rows, 2), json!("1,2,2,3,4"));
    }

    #[test]
    fn test_object_rows() {
        let rows = r#"[{"val1": "this", "other": 1}]"#;
        assert_eq!(check("concat(${val1}, ' is ', 'it')", rows, 1), json!("this is it"));
        assert_eq!(check("${other} + 1", rows, 1), json!(2.0));
    }

    #[test]
    fn test_syntax_only() {
        let options = CheckOptions {
            expression: "1 +2".to_string(),
            syntax_only: true,
            ..CheckOptions::default()
        };
        assert!(matches!(
            execute_check(&options).unwrap(),
            CheckResult::SyntaxValid(canonical) if canonical == "1+2"
        ));
    }

    #[test]
    fn test_rejects_scalar_rows() {
        let options = CheckOptions {
            expression: "1".to_string(),
            rows: Some("[1]".to_string()),
            ..CheckOptions::default()
        };
        assert!(matches!(execute_check(&options), Err(CliError::InvalidRows(_))));
    }
}
