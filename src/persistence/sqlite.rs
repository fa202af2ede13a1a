use super::{PersistenceResult, PlanStore};
use crate::store::TaskStore;
use crate::task::Task;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;

pub struct SqlitePlanStore {
    connection: Mutex<Connection>,
}

impl SqlitePlanStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS plan_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                allocation_percentage INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                position INTEGER NOT NULL,
                task_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn save_settings(tx: &Transaction, plan: &TaskStore) -> PersistenceResult<()> {
        tx.execute("DELETE FROM plan_settings", [])?;
        tx.execute(
            "INSERT INTO plan_settings (id, allocation_percentage) VALUES (1, ?1)",
            params![plan.allocation_percentage()],
        )?;
        Ok(())
    }

    fn save_tasks(tx: &Transaction, plan: &TaskStore) -> PersistenceResult<()> {
        tx.execute("DELETE FROM tasks", [])?;
        let mut stmt =
            tx.prepare("INSERT INTO tasks (id, position, task_json) VALUES (?1, ?2, ?3)")?;
        for (position, task) in plan.tasks().iter().enumerate() {
            let json = serde_json::to_string(task)?;
            stmt.execute(params![task.id, position as i64, json])?;
        }
        Ok(())
    }
}

impl PlanStore for SqlitePlanStore {
    fn save_plan(&self, plan: &TaskStore) -> PersistenceResult<()> {
        super::validate_tasks(plan.tasks())?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        Self::save_settings(&tx, plan)?;
        Self::save_tasks(&tx, plan)?;
        tx.commit()?;
        tracing::debug!(tasks = plan.len(), "plan saved to sqlite");
        Ok(())
    }

    fn load_plan(&self) -> PersistenceResult<Option<TaskStore>> {
        let conn = self.connection.lock();

        let percentage: Option<u32> = conn
            .query_row(
                "SELECT allocation_percentage FROM plan_settings WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(percentage) = percentage else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT task_json FROM tasks ORDER BY position ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for json in rows {
            let task: Task = serde_json::from_str(&json?)?;
            tasks.push(task);
        }

        super::validate_tasks(&tasks)?;
        Ok(Some(TaskStore::from_parts(tasks, percentage)?))
    }
}
