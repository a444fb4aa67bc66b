//! Batch configuration loaded from a TOML file.
//!
//! ```toml
//! [settings]
//! macro_params = ["T", "P"]
//! output_path = "batch_cases"
//! max_threads = 4
//! sim_parallel_number = 1
//!
//! [param_mapping]
//! T = "Temperature"
//!
//! [replace_rules]
//! CaseName = "CASE_NUMBER"
//!
//! [batch_state]
//! process_required_templates = true
//! process_sim_command = true
//! process_custom_templates = false
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use simbatch_core::batch::{SimCommand, DEFAULT_PARALLELISM, DEFAULT_SIM_EXECUTABLE};
use simbatch_core::rules::ReplacementRuleSet;
use simbatch_pipeline::{RunFlags, RunSettings};
use validator::{Validate, ValidationError};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SIMBATCH_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "simbatch.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// The `[settings]` section.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// Placeholders substituted with case plan values, in substitution order.
    #[validate(
        length(min = 1, message = "at least one placeholder is required"),
        custom(function = "no_blank_names")
    )]
    pub macro_params: Vec<String>,

    /// Output directory, relative to `template_dir` unless absolute.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Simulation jobs run at the same time.
    #[serde(default = "default_max_threads")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub max_threads: usize,

    /// Worker processes per simulation job (`-np`).
    #[serde(default = "default_sim_parallel_number")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub sim_parallel_number: usize,

    /// Directory holding the `template_*` files, the case plan and the run log.
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Case plan CSV, relative to `template_dir` unless absolute.
    #[serde(default = "default_case_plan")]
    pub case_plan: PathBuf,

    #[serde(default = "default_sim_executable")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub sim_executable: String,

    /// Flags passed between `-np N` and the case file.
    #[serde(default = "default_sim_extra_args")]
    pub sim_extra_args: Vec<String>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("batch_cases")
}

fn default_max_threads() -> usize {
    DEFAULT_PARALLELISM
}

fn default_sim_parallel_number() -> usize {
    1
}

fn default_template_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_case_plan() -> PathBuf {
    PathBuf::from("CasePlan.csv")
}

fn default_sim_executable() -> String {
    DEFAULT_SIM_EXECUTABLE.to_string()
}

fn default_sim_extra_args() -> Vec<String> {
    vec!["-power".to_string()]
}

// validator passes custom checks a reference to the field type.
#[allow(clippy::ptr_arg)]
fn no_blank_names(names: &Vec<String>) -> Result<(), ValidationError> {
    if names.iter().any(|n| n.trim().is_empty()) {
        let mut err = ValidationError::new("blank_placeholder");
        err.message = Some("placeholder names must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Complete batch configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchConfig {
    #[validate(nested)]
    pub settings: Settings,

    /// Placeholder -> case plan column.
    pub param_mapping: HashMap<String, String>,

    /// Extra literal rules for auxiliary templates, applied in key order.
    #[serde(default)]
    pub replace_rules: BTreeMap<String, String>,

    /// Phase switches; an absent section disables every phase.
    #[serde(default)]
    pub batch_state: RunFlags,
}

impl BatchConfig {
    /// Load the file named by `SIMBATCH_CONFIG`.
    ///
    /// | Env Var           | Default         |
    /// |-------------------|-----------------|
    /// | `SIMBATCH_CONFIG` | `simbatch.toml` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.into_validated()
    }

    /// Parse configuration text that did not come from a file.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.into_validated()
    }

    fn into_validated(mut self) -> Result<Self, ConfigError> {
        self.validate()?;
        for name in &mut self.settings.macro_params {
            *name = name.trim().to_string();
        }
        Ok(self)
    }

    pub fn template_dir(&self) -> &Path {
        &self.settings.template_dir
    }

    pub fn output_dir(&self) -> PathBuf {
        self.settings.template_dir.join(&self.settings.output_path)
    }

    pub fn case_plan_path(&self) -> PathBuf {
        self.settings.template_dir.join(&self.settings.case_plan)
    }

    pub fn sim_command(&self) -> SimCommand {
        SimCommand {
            executable: self.settings.sim_executable.clone(),
            workers_per_job: self.settings.sim_parallel_number,
            extra_args: self.settings.sim_extra_args.clone(),
        }
    }

    /// `CaseName -> CASE_NUMBER` followed by the configured rules.
    pub fn replacement_rules(&self) -> ReplacementRuleSet {
        ReplacementRuleSet::with_overrides(&self.replace_rules)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            output_dir: self.output_dir(),
            flags: self.batch_state,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
