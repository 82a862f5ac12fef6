use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule expression segment was empty, e.g. `"required||email"`.
    #[error("empty rule expression segment")]
    EmptyExpression,
    /// The structured spec was not a list of `[name, args...]` tuples.
    #[error("malformed structured validation spec: {0}")]
    MalformedSpec(String),
    /// A rule name was not found in the registry.
    #[error("unknown validation rule: {0}")]
    UnknownRule(String),
}

pub type Result<T> = std::result::Result<T, RuleError>;
