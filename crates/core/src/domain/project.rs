use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One budgeted project from the ERP registry.
///
/// `name` is stored trimmed and lower-cased; the [`crate::ledger::Ledger`]
/// indexes every project under both its name and its id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub budget: Decimal,
}

impl Project {
    /// Whether `amount` fits inside the project budget. Spending the budget
    /// exactly is allowed.
    pub fn within_budget(&self, amount: u64) -> bool {
        Decimal::from(amount) <= self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(budget: u64) -> Project {
        Project {
            id: ProjectId("7".to_string()),
            name: "alpha".to_string(),
            budget: Decimal::from(budget),
        }
    }

    #[test]
    fn amount_below_budget_fits() {
        assert!(project(200).within_budget(100));
    }

    #[test]
    fn amount_equal_to_budget_fits() {
        assert!(project(200).within_budget(200));
    }

    #[test]
    fn amount_above_budget_does_not_fit() {
        assert!(!project(200).within_budget(201));
    }
}
