use serde::{Deserialize, Serialize};

use crate::domain::project::Project;

/// One approved fund request, as persisted to the order store.
///
/// The wire shape is exactly these three fields, one JSON object per line.
/// Field order matters to nobody but humans reading the file, so it mirrors
/// the order details are spoken in: which project, its name, how much.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub project_id: String,
    pub project_name: String,
    pub amount: u64,
}

impl OrderRecord {
    pub fn new(project: &Project, amount: u64) -> Self {
        Self {
            project_id: project.id.0.clone(),
            project_name: project.name.clone(),
            amount,
        }
    }
}
