//! Validation rules for the formtree engine.
//!
//! The pure half of the Validation Engine: rule expression parsing (string
//! and structured forms), the rule registry with built-ins, bound chains
//! with blocking/non-blocking and suspension semantics, and message
//! templates. Everything here is synchronous and node-agnostic; debounce,
//! supersession and the display state machine live in `formtree-engine`.

pub mod builtin;
pub mod chain;
pub mod error;
pub mod expr;
pub mod registry;
pub mod template;

pub use chain::{BoundRule, ChainOutcome, RuleFailure, StepResult, ValidationChain};
pub use error::{Result, RuleError};
pub use expr::{RuleExpr, ValidationSpec, parse_validation};
pub use registry::{Rule, RuleCheck, RuleContext, RuleFn, RuleRegistry, RuleTarget};
pub use template::render_message;
