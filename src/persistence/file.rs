use super::{PersistenceResult, PlanStore};
use crate::store::TaskStore;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanSnapshot {
    #[serde(default = "full_allocation")]
    allocation_percentage: u32,
    tasks: Vec<Task>,
}

fn full_allocation() -> u32 {
    100
}

impl PlanSnapshot {
    fn from_plan(plan: &TaskStore) -> PersistenceResult<Self> {
        super::validate_tasks(plan.tasks())?;
        Ok(Self {
            allocation_percentage: plan.allocation_percentage(),
            tasks: plan.tasks().to_vec(),
        })
    }

    fn into_plan(self) -> PersistenceResult<TaskStore> {
        super::validate_tasks(&self.tasks)?;
        Ok(TaskStore::from_parts(self.tasks, self.allocation_percentage)?)
    }
}

pub fn save_plan_to_json<P: AsRef<Path>>(plan: &TaskStore, path: P) -> PersistenceResult<()> {
    let snapshot = PlanSnapshot::from_plan(plan)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_plan_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<TaskStore> {
    let file = File::open(path)?;
    let snapshot: PlanSnapshot = serde_json::from_reader(file)?;
    snapshot.into_plan()
}

/// Plan kept in a single JSON file; a missing file means nothing was saved yet.
pub struct JsonPlanStore {
    path: PathBuf,
}

impl JsonPlanStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlanStore for JsonPlanStore {
    fn save_plan(&self, plan: &TaskStore) -> PersistenceResult<()> {
        save_plan_to_json(plan, &self.path)
    }

    fn load_plan(&self) -> PersistenceResult<Option<TaskStore>> {
        match File::open(&self.path) {
            Ok(file) => {
                let snapshot: PlanSnapshot = serde_json::from_reader(file)?;
                snapshot.into_plan().map(Some)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
