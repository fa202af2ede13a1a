use crate::error::PlannerError;
use crate::store::TaskStore;
use crate::task::Task;
use crate::task_validation;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Durable home of a plan between sessions.
pub trait PlanStore {
    fn save_plan(&self, plan: &TaskStore) -> PersistenceResult<()>;
    fn load_plan(&self) -> PersistenceResult<Option<TaskStore>>;
}

pub fn validate_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub mod csv_io;
pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use csv_io::{
    CsvFormat, EXPORT_HEADER, detect_format, export_csv, export_csv_file, import_csv,
    import_csv_file, parse_csv,
};
pub use file::{JsonPlanStore, load_plan_from_json, save_plan_to_json};
