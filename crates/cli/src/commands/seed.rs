use std::fs;
use std::path::Path;

use fundy_core::config::AppConfig;
use fundy_core::ledger::parse_registry;

use crate::bootstrap::load_options;
use crate::commands::CommandResult;

/// Small registry that exercises every shape the loader accepts: prose lines,
/// blank lines, and project entries with comma-grouped budgets.
const DEMO_REGISTRY: &str = "\
ERP assistant instructions

Approved projects for fund requests:

- Project ID: 101 | Name: Marketing | Budget: 20,000 Riyals
- Project ID: 102 | Name: Mobile App | Budget: 55,000 Riyals
- Project ID: 103 | Name: Data Platform | Budget: 120,000 Riyals
- Project ID: 223 | Name: Tools | Budget: 8,000 Riyals

Requests must name a project and an amount in riyals.
";

pub fn run(config_path: Option<&Path>, force: bool) -> CommandResult {
    let config = match AppConfig::load(load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let path = &config.registry.path;
    if path.exists() && !force {
        return CommandResult::failure(
            "seed",
            "already_exists",
            format!("`{}` already exists; pass --force to overwrite it", path.display()),
            3,
        );
    }

    if let Err(error) = fs::write(path, DEMO_REGISTRY) {
        return CommandResult::failure(
            "seed",
            "write",
            format!("could not write `{}`: {error}", path.display()),
            4,
        );
    }

    let projects = parse_registry(DEMO_REGISTRY).ledger.len();
    CommandResult::success(
        "seed",
        format!("demo registry with {projects} project(s) written to `{}`", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_registry_parses_without_skips() {
        let report = parse_registry(DEMO_REGISTRY);

        assert_eq!(report.ledger.len(), 4);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn demo_registry_covers_budget_extremes() {
        let report = parse_registry(DEMO_REGISTRY);

        assert!(report.ledger.approves("tools", 8_000));
        assert!(!report.ledger.approves("tools", 8_001));
        assert!(report.ledger.approves("data platform", 120_000));
    }
}
