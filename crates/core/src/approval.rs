//! Budget-gated approval rule.
//!
//! The spend ceiling for a decision is a configurable fraction of the revenue
//! snapshot taken at evaluation time. A cost exactly equal to the threshold is
//! approved. The rule itself is pure; callers are responsible for serializing
//! evaluations against a consistent snapshot.

use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BudgetRule {
    pub ratio: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BudgetEvaluation {
    pub approved: bool,
    pub cost: Decimal,
    pub revenue: Decimal,
    pub threshold: Decimal,
    pub ratio: Decimal,
}

impl BudgetRule {
    pub fn new(ratio: Decimal) -> Self {
        Self { ratio }
    }

    pub fn evaluate(&self, cost: Decimal, revenue: Decimal) -> BudgetEvaluation {
        let threshold = revenue * self.ratio;
        BudgetEvaluation {
            approved: cost <= threshold,
            cost,
            revenue,
            threshold,
            ratio: self.ratio,
        }
    }
}

impl BudgetEvaluation {
    /// Machine-generated decision rationale recorded in the request notes.
    /// Carries the raw numbers so the audit trail is self-contained.
    pub fn rationale(&self) -> String {
        if self.approved {
            format!(
                "auto-approved: cost {} within budget threshold {} (ratio {} of revenue {})",
                self.cost, self.threshold, self.ratio, self.revenue
            )
        } else {
            format!(
                "auto-rejected: cost {} exceeds budget threshold {} (ratio {} of revenue {})",
                self.cost, self.threshold, self.ratio, self.revenue
            )
        }
    }
}
