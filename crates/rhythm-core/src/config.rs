use crate::error::{Result, RhythmError};
use crate::paths;
use crate::persist::PersistMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_MANUAL_PRIORITY: u32 = 5;
pub const DEFAULT_PORT: u16 = 3141;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub mode: PersistMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritiesConfig {
    /// Highest level offered by the manual priority picker.
    #[serde(default = "default_max_manual")]
    pub max_manual: u32,
}

impl Default for PrioritiesConfig {
    fn default() -> Self {
        Self {
            max_manual: DEFAULT_MAX_MANUAL_PRIORITY,
        }
    }
}

fn default_max_manual() -> u32 {
    DEFAULT_MAX_MANUAL_PRIORITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub priorities: PrioritiesConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            persistence: PersistenceConfig::default(),
            priorities: PrioritiesConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RhythmError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::config_path(root), self)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.project.name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "project.name is empty".to_string(),
            });
        }

        if self.priorities.max_manual == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "priorities.max_manual is 0; no priority can be picked".to_string(),
            });
        } else if self.priorities.max_manual > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "priorities.max_manual={} (levels above 5 display as Unranked)",
                    self.priorities.max_manual
                ),
            });
        }

        if self.persistence.mode == PersistMode::Sequential {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "persistence.mode is sequential: a failed reorder can leave rows \
                          partly written"
                    .to_string(),
            });
        }

        if self.server.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.port is 0; a random port is picked at startup".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
