//! Bound validation chains.
//!
//! A chain is the ordered sequence of rules a node's validation spec
//! resolved to. Execution short-circuits on the first blocking failure
//! (logical AND); non-blocking failures are recorded and the chain keeps
//! going. A `Defer` from a rule suspends the chain at that position so the
//! engine can resume it once the deferred boolean arrives.

use crate::error::{Result, RuleError};
use crate::expr::RuleExpr;
use crate::registry::{Rule, RuleCheck, RuleRegistry, RuleTarget};

/// One rule expression resolved against a registry.
#[derive(Debug, Clone)]
pub struct BoundRule {
    pub expr: RuleExpr,
    pub rule: Rule,
}

/// A failed rule, carrying what the message renderer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub name: String,
    pub args: Vec<String>,
    pub blocking: bool,
}

impl RuleFailure {
    fn of(bound: &BoundRule) -> Self {
        Self {
            name: bound.expr.name.clone(),
            args: bound.expr.args.clone(),
            blocking: bound.expr.blocking,
        }
    }
}

/// Final result of a chain run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    pub failures: Vec<RuleFailure>,
}

impl ChainOutcome {
    pub fn valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Either the chain ran to a conclusion or it parked on a deferred rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Done(ChainOutcome),
    /// Suspended at `position` (the index of the deferred rule), with the
    /// non-blocking failures collected so far.
    Suspended {
        position: usize,
        failures: Vec<RuleFailure>,
    },
}

/// An ordered rule chain bound to a specific registry.
#[derive(Debug, Clone, Default)]
pub struct ValidationChain {
    rules: Vec<BoundRule>,
}

impl ValidationChain {
    /// Resolve parsed expressions against a registry. Unknown rule names
    /// fail the whole bind, so a typo surfaces at spec time rather than as
    /// a silently-missing rule.
    pub fn bind(exprs: Vec<RuleExpr>, registry: &RuleRegistry) -> Result<Self> {
        let rules = exprs
            .into_iter()
            .map(|expr| {
                let rule = registry
                    .get(&expr.name)
                    .cloned()
                    .ok_or_else(|| RuleError::UnknownRule(expr.name.clone()))?;
                Ok(BoundRule { expr, rule })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[BoundRule] {
        &self.rules
    }

    /// Run the chain from the top.
    pub fn execute(&self, target: &RuleTarget<'_>) -> StepResult {
        self.execute_from(0, Vec::new(), target)
    }

    /// Run the chain starting at `from`, carrying failures collected by an
    /// earlier (suspended) portion of the same run.
    pub fn execute_from(
        &self,
        from: usize,
        mut failures: Vec<RuleFailure>,
        target: &RuleTarget<'_>,
    ) -> StepResult {
        for (index, bound) in self.rules.iter().enumerate().skip(from) {
            let ctx = target.context(&bound.expr.args);
            if bound.rule.skip_empty && ctx.value_is_empty() {
                continue;
            }
            match (bound.rule.check)(&ctx) {
                RuleCheck::Pass => {}
                RuleCheck::Defer => {
                    return StepResult::Suspended {
                        position: index,
                        failures,
                    };
                }
                RuleCheck::Fail => {
                    let failure = RuleFailure::of(bound);
                    let blocking = failure.blocking;
                    failures.push(failure);
                    if blocking {
                        return StepResult::Done(ChainOutcome { failures });
                    }
                }
            }
        }
        StepResult::Done(ChainOutcome { failures })
    }

    /// Resume a suspended run at `position` with the deferred result, then
    /// continue with the rest of the chain.
    pub fn resume(
        &self,
        position: usize,
        passed: bool,
        mut failures: Vec<RuleFailure>,
        target: &RuleTarget<'_>,
    ) -> StepResult {
        if let Some(bound) = self.rules.get(position)
            && !passed
        {
            let failure = RuleFailure::of(bound);
            let blocking = failure.blocking;
            failures.push(failure);
            if blocking {
                return StepResult::Done(ChainOutcome { failures });
            }
        }
        self.execute_from(position + 1, failures, target)
    }
}
