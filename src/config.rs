use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::calculations::allocation::validate_percentage;
use crate::error::{PlannerError, PlannerResult};
use crate::persistence::{PersistenceError, PersistenceResult};
use crate::sync::RecordFilter;
use crate::task::TaskKind;
use crate::timeline::Granularity;

pub const ENV_PREFIX: &str = "GANTT_PLANNER_";
pub const CONFIG_PATH_VAR: &str = "GANTT_PLANNER_CONFIG";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Connection settings for the read-only project backend.
///
/// The password is never written to or read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    pub project_id: Option<i64>,
    pub tag_filter: Option<String>,
}

impl SourceConfig {
    pub fn is_configured(&self) -> bool {
        [&self.url, &self.database, &self.username, &self.password]
            .iter()
            .all(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// `user@url/database` for a fully configured backend; the password is
    /// never part of it.
    pub fn backend_label(&self) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        Some(format!(
            "{}@{}/{}",
            self.username.as_deref().unwrap_or_default(),
            self.url.as_deref().unwrap_or_default(),
            self.database.as_deref().unwrap_or_default()
        ))
    }

    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            project_id: self.project_id,
            tag_fragment: self.tag_filter.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    pub source: SourceConfig,
    pub default_resource: Option<String>,
    #[serde(rename = "defaultType")]
    pub default_kind: TaskKind,
    pub allocation_percentage: u32,
    pub granularity: Granularity,
    pub store_path: Option<PathBuf>,
    pub http_addr: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            default_resource: None,
            default_kind: TaskKind::default(),
            allocation_percentage: 100,
            granularity: Granularity::default(),
            store_path: None,
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`PlannerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        match Self::load(path) {
            Err(PersistenceError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PersistenceResult<()> {
        self.validate()?;
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// File named by `GANTT_PLANNER_CONFIG` (if any) with process
    /// environment overrides applied on top.
    pub fn from_env() -> PersistenceResult<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::load_or_default(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `GANTT_PLANNER_*` values returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> PlannerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            lookup(&format!("{ENV_PREFIX}{suffix}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = var("SOURCE_URL") {
            self.source.url = Some(url);
        }
        if let Some(database) = var("SOURCE_DATABASE") {
            self.source.database = Some(database);
        }
        if let Some(username) = var("SOURCE_USERNAME") {
            self.source.username = Some(username);
        }
        if let Some(password) = var("SOURCE_PASSWORD") {
            self.source.password = Some(password);
        }
        if let Some(project) = var("SOURCE_PROJECT_ID") {
            let id = project.parse().map_err(|_| {
                PlannerError::validation(format!("{ENV_PREFIX}SOURCE_PROJECT_ID is not an integer: '{project}'"))
            })?;
            self.source.project_id = Some(id);
        }
        if let Some(tag) = var("SOURCE_TAG_FILTER") {
            self.source.tag_filter = Some(tag);
        }
        if let Some(resource) = var("DEFAULT_RESOURCE") {
            self.default_resource = Some(resource);
        }
        if let Some(kind) = var("DEFAULT_TYPE") {
            self.default_kind = TaskKind::parse(&kind);
        }
        if let Some(percentage) = var("ALLOCATION") {
            self.allocation_percentage = percentage.parse().map_err(|_| {
                PlannerError::validation(format!("{ENV_PREFIX}ALLOCATION is not a percentage: '{percentage}'"))
            })?;
        }
        if let Some(granularity) = var("GRANULARITY") {
            self.granularity = granularity.parse()?;
        }
        if let Some(path) = var("STORE_PATH") {
            self.store_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = var("HTTP_ADDR") {
            self.http_addr = addr;
        }
        self.validate()
    }

    pub fn validate(&self) -> PlannerResult<()> {
        validate_percentage(self.allocation_percentage)?;
        if self.http_addr.trim().is_empty() {
            return Err(PlannerError::validation("http address must not be empty"));
        }
        Ok(())
    }
}
