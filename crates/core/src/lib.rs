pub mod config;
pub mod domain;
pub mod ledger;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::order::OrderRecord;
pub use domain::project::{Project, ProjectId};
pub use ledger::{Ledger, LoadReport, SkipReason, SkippedLine};
