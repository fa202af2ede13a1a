pub mod calculations;
pub mod calendar;
pub mod config;
pub mod diagnostics;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod store;
pub mod sync;
pub mod table;
pub mod task;
pub(crate) mod task_validation;
pub mod timeline;

pub use calculations::{
    ALLOCATION_PRESETS, Slot, find_next_available_slot, insert_task, recalculate_allocation,
};
pub use config::PlannerConfig;
pub use diagnostics::{LogBuffer, LogEntry, LogLevel, LogSummary};
pub use error::{PlannerError, PlannerResult};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqlitePlanStore;
pub use persistence::{
    CsvFormat, JsonPlanStore, PersistenceError, PersistenceResult, PlanStore, detect_format,
    export_csv, import_csv, load_plan_from_json, save_plan_to_json, validate_tasks,
};
pub use store::{MergeMode, ResourceOverview, TaskStore};
pub use sync::{JsonFileSource, RecordFilter, SourceRecord, SyncMode, TaskSource, normalize_records};
pub use task::{NewTask, Task, TaskKind};
pub use timeline::{DateRange, Granularity, HeaderCell};
