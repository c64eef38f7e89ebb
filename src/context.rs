use serde::Deserialize;

/// Settings that shape how an expression evaluates.
///
/// Loaded from JSON by the CLI (`--context`), otherwise [`Default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpressionContext {
    /// Offset applied by date functions that are not given a zone, e.g. `Z`,
    /// `+0400` or `-05:00`
    pub time_zone: String,
    /// Upper bound for the `limit` of `joining` and `distinct`
    pub max_string_length: usize,
    /// Pattern used by `formatDate` and `parseDate` when none is given
    pub default_date_format: String,
}

impl Default for ExpressionContext {
    fn default() -> Self {
        ExpressionContext {
            time_zone: "Z".to_string(),
            max_string_length: 100,
            default_date_format: "yyyy-MM-dd'T'HH:mm:ss.SSSXX".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let ctx: ExpressionContext = serde_json::from_str(r#"{"timeZone": "+0200"}"#).unwrap();
        assert_eq!(ctx.time_zone, "+0200");
        assert_eq!(ctx.max_string_length, 100);
    }
}
