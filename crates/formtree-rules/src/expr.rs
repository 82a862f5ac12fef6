//! Rule expression parsing.
//!
//! A validation spec is either a string of `|`-separated rule expressions
//! with `:`-separated positional arguments (`"required|length:5"`) or a
//! structured list of `[name, args...]` tuples. Both parse to the same
//! [`RuleExpr`] sequence. A leading `?` on a rule name marks the rule
//! non-blocking: its failure is recorded but does not stop the chain.

use serde_json::Value;

use crate::error::{Result, RuleError};

/// One parsed rule reference: name, positional args, blocking flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleExpr {
    pub name: String,
    pub args: Vec<String>,
    pub blocking: bool,
}

impl RuleExpr {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            blocking: true,
        }
    }

    pub fn non_blocking(mut self) -> Self {
        self.blocking = false;
        self
    }
}

/// The two accepted shapes of a validation spec.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationSpec {
    /// `"required|length:5,25"` style expression string.
    Text(String),
    /// JSON list of `[name, args...]` tuples (args stringified).
    Structured(Value),
}

/// Parse a validation spec into its rule expressions.
pub fn parse_validation(spec: &ValidationSpec) -> Result<Vec<RuleExpr>> {
    match spec {
        ValidationSpec::Text(text) => parse_text(text),
        ValidationSpec::Structured(value) => parse_structured(value),
    }
}

fn parse_text(text: &str) -> Result<Vec<RuleExpr>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed.split('|').map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Result<RuleExpr> {
    let segment = segment.trim();
    if segment.is_empty() {
        return Err(RuleError::EmptyExpression);
    }
    let mut parts = segment.split(':');
    let raw_name = parts.next().unwrap_or_default().trim();
    if raw_name.is_empty() || raw_name == "?" {
        return Err(RuleError::EmptyExpression);
    }
    let (name, blocking) = match raw_name.strip_prefix('?') {
        Some(rest) => (rest, false),
        None => (raw_name, true),
    };
    Ok(RuleExpr {
        name: name.to_string(),
        args: parts.map(|a| a.trim().to_string()).collect(),
        blocking,
    })
}

fn parse_structured(value: &Value) -> Result<Vec<RuleExpr>> {
    let Value::Array(entries) = value else {
        return Err(RuleError::MalformedSpec(
            "expected a list of rule tuples".to_string(),
        ));
    };
    entries.iter().map(parse_tuple).collect()
}

fn parse_tuple(entry: &Value) -> Result<RuleExpr> {
    match entry {
        // A bare string tuple is a single rule expression segment, so the
        // structured form can mix `"required"` with `["length", 5]`.
        Value::String(segment) => parse_segment(segment),
        Value::Array(parts) => {
            let Some(Value::String(raw_name)) = parts.first() else {
                return Err(RuleError::MalformedSpec(
                    "rule tuple must start with a rule name".to_string(),
                ));
            };
            if raw_name.is_empty() || raw_name == "?" {
                return Err(RuleError::EmptyExpression);
            }
            let (name, blocking) = match raw_name.strip_prefix('?') {
                Some(rest) => (rest, false),
                None => (raw_name.as_str(), true),
            };
            let args = parts[1..]
                .iter()
                .map(|arg| match arg {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            Ok(RuleExpr {
                name: name.to_string(),
                args,
                blocking,
            })
        }
        other => Err(RuleError::MalformedSpec(format!(
            "unsupported rule tuple: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_piped_expressions() {
        let spec = ValidationSpec::Text("required|length:5:25".to_string());
        let exprs = parse_validation(&spec).unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0], RuleExpr::new("required", vec![]));
        assert_eq!(
            exprs[1],
            RuleExpr::new("length", vec!["5".to_string(), "25".to_string()])
        );
    }

    #[test]
    fn question_mark_marks_non_blocking() {
        let spec = ValidationSpec::Text("?email".to_string());
        let exprs = parse_validation(&spec).unwrap();
        assert!(!exprs[0].blocking);
        assert_eq!(exprs[0].name, "email");
    }

    #[test]
    fn empty_segment_rejected() {
        let spec = ValidationSpec::Text("required||email".to_string());
        assert!(matches!(
            parse_validation(&spec),
            Err(RuleError::EmptyExpression)
        ));
    }

    #[test]
    fn empty_spec_is_no_rules() {
        let spec = ValidationSpec::Text("  ".to_string());
        assert!(parse_validation(&spec).unwrap().is_empty());
    }

    #[test]
    fn structured_tuples() {
        let spec = ValidationSpec::Structured(json!([["length", 5, 25], "required", ["?email"]]));
        let exprs = parse_validation(&spec).unwrap();
        assert_eq!(
            exprs[0],
            RuleExpr::new("length", vec!["5".to_string(), "25".to_string()])
        );
        assert_eq!(exprs[1], RuleExpr::new("required", vec![]));
        assert!(!exprs[2].blocking);
    }

    #[test]
    fn structured_must_be_array() {
        let spec = ValidationSpec::Structured(json!({"rule": "required"}));
        assert!(matches!(
            parse_validation(&spec),
            Err(RuleError::MalformedSpec(_))
        ));
    }
}
