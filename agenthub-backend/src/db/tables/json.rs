//! Helpers for the JSON-in-TEXT columns.

/// Parse an optional JSON column, treating NULL and malformed text as None.
pub fn parse_opt(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

/// Parse a JSON string-list column, defaulting to empty on NULL or bad data.
pub fn parse_string_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Parse a JSON float-list column, defaulting to empty on NULL or bad data.
pub fn parse_float_list(raw: Option<String>) -> Vec<f64> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Serialize an optional JSON value for storage.
pub fn to_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_treated_as_absent() {
        assert_eq!(parse_opt(Some("{not json".to_string())), None);
        assert!(parse_string_list(Some("oops".to_string())).is_empty());
        assert_eq!(
            parse_string_list(Some("[\"a\",\"b\"]".to_string())),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(parse_float_list(Some("[1.0,2.5]".to_string())), vec![1.0, 2.5]);
    }
}
