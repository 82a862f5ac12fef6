//! Built-in validation rules.
//!
//! Malformed rule arguments (a non-numeric bound for `length`, an invalid
//! pattern for `matches`) make the rule inert rather than failing the
//! node: bad configuration is advisory, user input is what rules judge.

use std::sync::OnceLock;

use regex::Regex;

use crate::registry::{Rule, RuleCheck, RuleContext};

/// Every built-in rule, in registration order.
pub fn all() -> Vec<Rule> {
    vec![
        required(),
        length(),
        min(),
        max(),
        between(),
        email(),
        number(),
        matches(),
        starts_with(),
        ends_with(),
        is(),
    ]
}

fn required() -> Rule {
    Rule::new("required", "{label} is required.", |ctx: &RuleContext<'_>| {
        RuleCheck::from(!ctx.value_is_empty())
    })
    .run_on_empty()
}

fn value_length(ctx: &RuleContext<'_>) -> usize {
    match ctx.value {
        serde_json::Value::String(s) => s.chars().count(),
        serde_json::Value::Array(a) => a.len(),
        serde_json::Value::Object(o) => o.len(),
        _ => ctx.value_text().chars().count(),
    }
}

fn length() -> Rule {
    Rule::new(
        "length",
        "{label} must be between {arg0} and {arg1} characters.",
        |ctx: &RuleContext<'_>| {
            let len = value_length(ctx);
            let min: usize = match ctx.args.first().map(|a| a.parse()) {
                Some(Ok(n)) => n,
                _ => return RuleCheck::Pass,
            };
            let max: Option<usize> = match ctx.args.get(1).map(|a| a.parse()) {
                Some(Ok(n)) => Some(n),
                Some(Err(_)) => return RuleCheck::Pass,
                None => None,
            };
            RuleCheck::from(len >= min && max.is_none_or(|m| len <= m))
        },
    )
}

fn min() -> Rule {
    Rule::new("min", "{label} must be at least {arg0}.", |ctx: &RuleContext<'_>| {
        let Some(bound) = ctx.args.first().and_then(|a| a.parse::<f64>().ok()) else {
            return RuleCheck::Pass;
        };
        match ctx.value_number() {
            Some(n) => RuleCheck::from(n >= bound),
            None => RuleCheck::Fail,
        }
    })
}

fn max() -> Rule {
    Rule::new("max", "{label} must be at most {arg0}.", |ctx: &RuleContext<'_>| {
        let Some(bound) = ctx.args.first().and_then(|a| a.parse::<f64>().ok()) else {
            return RuleCheck::Pass;
        };
        match ctx.value_number() {
            Some(n) => RuleCheck::from(n <= bound),
            None => RuleCheck::Fail,
        }
    })
}

fn between() -> Rule {
    Rule::new(
        "between",
        "{label} must be between {arg0} and {arg1}.",
        |ctx: &RuleContext<'_>| {
            let (Some(lo), Some(hi)) = (
                ctx.args.first().and_then(|a| a.parse::<f64>().ok()),
                ctx.args.get(1).and_then(|a| a.parse::<f64>().ok()),
            ) else {
                return RuleCheck::Pass;
            };
            match ctx.value_number() {
                Some(n) => RuleCheck::from(n >= lo && n <= hi),
                None => RuleCheck::Fail,
            }
        },
    )
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn email() -> Rule {
    Rule::new("email", "{label} must be a valid email address.", |ctx: &RuleContext<'_>| {
        RuleCheck::from(email_pattern().is_match(&ctx.value_text()))
    })
}

fn number() -> Rule {
    Rule::new("number", "{label} must be a number.", |ctx: &RuleContext<'_>| {
        RuleCheck::from(ctx.value_number().is_some())
    })
}

fn matches() -> Rule {
    Rule::new("matches", "{label} is not in the expected format.", |ctx: &RuleContext<'_>| {
        let Some(pattern) = ctx.args.first() else {
            return RuleCheck::Pass;
        };
        match Regex::new(pattern) {
            Ok(re) => RuleCheck::from(re.is_match(&ctx.value_text())),
            Err(_) => RuleCheck::Pass,
        }
    })
}

fn starts_with() -> Rule {
    Rule::new(
        "starts_with",
        "{label} must start with {arg0}.",
        |ctx: &RuleContext<'_>| {
            let Some(prefix) = ctx.args.first() else {
                return RuleCheck::Pass;
            };
            RuleCheck::from(ctx.value_text().starts_with(prefix.as_str()))
        },
    )
}

fn ends_with() -> Rule {
    Rule::new(
        "ends_with",
        "{label} must end with {arg0}.",
        |ctx: &RuleContext<'_>| {
            let Some(suffix) = ctx.args.first() else {
                return RuleCheck::Pass;
            };
            RuleCheck::from(ctx.value_text().ends_with(suffix.as_str()))
        },
    )
}

fn is() -> Rule {
    Rule::new("is", "{label} is not an allowed value.", |ctx: &RuleContext<'_>| {
        let text = ctx.value_text();
        RuleCheck::from(ctx.args.iter().any(|allowed| allowed == &text))
    })
}
