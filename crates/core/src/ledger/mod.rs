use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::project::{Project, ProjectId};

/// Shape of a budgeted project line in the registry file. Anything after
/// the budget unit is ignored, matching how the registry is hand-edited.
static PROJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- Project ID: (\d+) \| Name: (.+?) \| Budget: ([\d,]+) Riyals")
        .expect("project line pattern compiles")
});

/// Loose probe for lines that are trying to be project lines. Lines that
/// hit the probe but not [`PROJECT_LINE`] get reported instead of silently
/// dropped; all other prose stays invisible to the loader.
static PROJECT_PROBE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- Project ID:").expect("project probe pattern compiles"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Probe matched but the full project shape did not.
    MalformedLine,
    /// Project shape matched but the budget field did not parse.
    UnreadableBudget,
    /// The line would register a lookup key another project already owns.
    ConflictingKey { key: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedLine => f.write_str("malformed project line"),
            Self::UnreadableBudget => f.write_str("unreadable budget"),
            Self::ConflictingKey { key } => write!(f, "key `{key}` already registered"),
        }
    }
}

/// A registry line the loader refused, kept for operator reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the registry file.
    pub line_number: usize,
    pub reason: SkipReason,
    pub content: String,
}

/// Project ledger with one canonical record per project, indexed under
/// both the lower-cased name and the numeric id string.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    projects: Vec<Project>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// All lookup keys with the project each resolves to. A project
    /// normally appears twice, once per key.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Project)> {
        self.index.iter().map(|(key, slot)| (key.as_str(), &self.projects[*slot]))
    }

    /// Looks up a project by name or id. Keys are compared trimmed and
    /// lower-cased.
    pub fn resolve(&self, key: &str) -> Option<&Project> {
        let key = key.trim().to_lowercase();
        self.index.get(&key).map(|slot| &self.projects[*slot])
    }

    /// Budget check: the key must resolve and the amount must not exceed
    /// the project budget. Spending the budget exactly is approved.
    pub fn approves(&self, key: &str, amount: u64) -> bool {
        self.resolve(key).is_some_and(|project| project.within_budget(amount))
    }

    /// Registers a project under both keys. A redeclaration of the same id
    /// replaces the earlier record (returned as `Ok(Some(_))`); a key owned
    /// by a different project rejects the whole line.
    fn register(&mut self, project: Project) -> Result<Option<Project>, SkipReason> {
        let id_key = project.id.0.clone();
        let name_key = project.name.clone();

        match self.index.get(&id_key).copied() {
            Some(slot) if self.projects[slot].id == project.id => {
                let name_taken = self.index.get(&name_key).is_some_and(|other| *other != slot);
                if name_taken {
                    return Err(SkipReason::ConflictingKey { key: name_key });
                }
                let previous = std::mem::replace(&mut self.projects[slot], project);
                if previous.name != name_key {
                    self.index.remove(&previous.name);
                }
                self.index.insert(name_key, slot);
                Ok(Some(previous))
            }
            Some(_) => Err(SkipReason::ConflictingKey { key: id_key }),
            None => {
                if self.index.contains_key(&name_key) {
                    return Err(SkipReason::ConflictingKey { key: name_key });
                }
                let slot = self.projects.len();
                self.projects.push(project);
                self.index.insert(id_key, slot);
                self.index.insert(name_key, slot);
                Ok(None)
            }
        }
    }
}

/// Outcome of one registry load: whatever parsed plus whatever did not.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    pub ledger: Ledger,
    pub skipped: Vec<SkippedLine>,
}

/// Reads the registry file and builds the ledger. A missing or unreadable
/// file degrades to an empty ledger; it is not fatal because the assistant
/// can still converse, it just cannot approve anything.
pub fn load_registry(path: &Path) -> LoadReport {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(
                event_name = "registry.load.unreadable",
                path = %path.display(),
                %error,
                "project registry could not be read; starting with an empty ledger"
            );
            return LoadReport::default();
        }
    };

    let report = parse_registry(&raw);
    if !report.skipped.is_empty() {
        warn!(
            event_name = "registry.load.skipped_lines",
            path = %path.display(),
            skipped = report.skipped.len(),
            "some registry lines were skipped during load"
        );
    }
    debug!(
        event_name = "registry.load.completed",
        path = %path.display(),
        projects = report.ledger.len(),
        "project registry loaded"
    );
    report
}

/// Parses registry text line by line. Lines that look like project entries
/// but fail to parse are skipped individually and reported; the rest of
/// the file still loads.
pub fn parse_registry(raw: &str) -> LoadReport {
    let mut report = LoadReport::default();

    for (index, line) in raw.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim_end();

        let Some(captures) = PROJECT_LINE.captures(trimmed) else {
            if PROJECT_PROBE.is_match(trimmed) {
                report.skipped.push(SkippedLine {
                    line_number,
                    reason: SkipReason::MalformedLine,
                    content: trimmed.to_string(),
                });
            }
            continue;
        };

        let id = ProjectId(captures[1].to_string());
        let name = captures[2].trim().to_lowercase();
        if name.is_empty() {
            report.skipped.push(SkippedLine {
                line_number,
                reason: SkipReason::MalformedLine,
                content: trimmed.to_string(),
            });
            continue;
        }

        let budget_raw = captures[3].replace(',', "");
        let Ok(budget) = budget_raw.parse::<Decimal>() else {
            report.skipped.push(SkippedLine {
                line_number,
                reason: SkipReason::UnreadableBudget,
                content: trimmed.to_string(),
            });
            continue;
        };

        match report.ledger.register(Project { id, name, budget }) {
            Ok(None) => {}
            Ok(Some(previous)) => {
                warn!(
                    event_name = "registry.load.replaced",
                    line = line_number,
                    project_id = %previous.id,
                    "project id redeclared; the later line wins"
                );
            }
            Err(reason) => {
                report.skipped.push(SkippedLine {
                    line_number,
                    reason,
                    content: trimmed.to_string(),
                });
            }
        }
    }

    report
}
