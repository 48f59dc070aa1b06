//! Configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::prompt::parse_prompt_time;
use crate::store::default_db_path;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub plan: PlanConfig,
    pub prompt: PromptConfig,
    pub links: LinksConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Tasks database file. `TASKS_DB` and the platform data directory are used when unset.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanConfig {
    /// Budget used when `plan` is run without minutes and when the dashboard opens.
    pub default_budget: u32,
    /// Roll recurring tasks forward before `plan` and when the dashboard opens.
    /// Off by default: planning only reads, `timebox roll` moves tasks.
    pub roll_on_plan: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            default_budget: 60,
            roll_on_plan: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    /// Name of the daily prompt job; setting a new time replaces the job with this name.
    pub job_name: String,
    /// Time of the daily prompt until one is set, `HH:MM`.
    pub default_time: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            job_name: "daily-prompt".to_string(),
            default_time: "08:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinksConfig {
    /// Prefix of the per-task edit link, rendered as `<base_url>/edit/<id>`.
    pub base_url: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_url: "timebox://task".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// 1. explicit path (errors are fatal)
    /// 2. `./.timebox.yml`
    /// 3. `<config dir>/timebox/timebox.yml`
    /// 4. defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        Ok(Self::load_first(&Self::fallback_paths()))
    }

    /// Files tried, in order, when no explicit path is given.
    pub fn fallback_paths() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(".timebox.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("timebox").join("timebox.yml"));
        }
        candidates
    }

    /// First candidate that loads cleanly. Files that fail are logged and skipped.
    fn load_first(candidates: &[PathBuf]) -> Self {
        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to load config from {}: {}", candidate.display(), e),
            }
        }

        info!("No config file found, using defaults");
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| TrackerError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.default_prompt_time()?;
        if self.prompt.job_name.trim().is_empty() {
            return Err(TrackerError::Config("prompt.job_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// The tasks database path this configuration resolves to.
    pub fn db_path(&self) -> PathBuf {
        self.storage.db_path.clone().unwrap_or_else(default_db_path)
    }

    pub fn default_prompt_time(&self) -> Result<NaiveTime> {
        parse_prompt_time(&self.prompt.default_time)
            .map_err(|e| TrackerError::Config(format!("prompt.default_time: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.plan.default_budget, 60);
        assert!(!config.plan.roll_on_plan);
        assert_eq!(config.prompt.job_name, "daily-prompt");
        assert_eq!(
            config.default_prompt_time().unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("timebox.yml");
        fs::write(&path, "plan:\n  default_budget: 90\nstorage:\n  db_path: /tmp/x.json\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.plan.default_budget, 90);
        assert!(!config.plan.roll_on_plan);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/x.json"));
        assert_eq!(config.links.base_url, "timebox://task");
    }

    #[test]
    fn bad_prompt_time_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("timebox.yml");
        fs::write(&path, "prompt:\n  default_time: \"25:00\"\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn working_directory_file_is_tried_first() {
        let paths = Config::fallback_paths();
        assert_eq!(paths[0], PathBuf::from(".timebox.yml"));
        if let Some(config_dir) = dirs::config_dir() {
            assert_eq!(paths[1], config_dir.join("timebox").join("timebox.yml"));
        }
    }

    #[test]
    fn fallback_skips_unparsable_file() {
        let dir = tempdir().unwrap();
        let local = dir.path().join(".timebox.yml");
        let user = dir.path().join("timebox.yml");
        fs::write(&local, "plan: [not, a, map").unwrap();
        fs::write(&user, "plan:\n  default_budget: 45\n").unwrap();

        let config = Config::load_first(&[local.clone(), user]);
        assert_eq!(config.plan.default_budget, 45);

        let config = Config::load_first(&[local, dir.path().join("absent.yml")]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn fallback_prefers_first_valid_file() {
        let dir = tempdir().unwrap();
        let local = dir.path().join(".timebox.yml");
        let user = dir.path().join("timebox.yml");
        fs::write(&local, "links:\n  base_url: http://localhost:5000\n").unwrap();
        fs::write(&user, "plan:\n  default_budget: 45\n").unwrap();

        let config = Config::load_first(&[local, user]);
        assert_eq!(config.links.base_url, "http://localhost:5000");
        assert_eq!(config.plan.default_budget, 60);
    }
}
