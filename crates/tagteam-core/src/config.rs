//! Team configuration loaded from TOML.
//!
//! ```toml
//! name = "pair"
//! max_consecutive_turns = 3
//! step_budget = 40
//!
//! [[agents]]
//! name = "driver"
//!
//! [[agents]]
//! name = "navigator"
//! max_consecutive_turns = 1
//! share_only_tool_results = true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Participant;

pub const DEFAULT_MAX_CONSECUTIVE_TURNS: u32 = 3;
pub const DEFAULT_MAX_REQUERIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("team has no agents")]
    NoAgents,

    #[error("agent #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate agent name: {name}")]
    DuplicateName { name: String },

    #[error("agent {name}: max_consecutive_turns must be at least 1")]
    ZeroTurnBudget { name: String },
}

fn default_team_name() -> String {
    "team".to_string()
}

fn default_max_consecutive_turns() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_TURNS
}

fn default_max_requeries() -> u32 {
    DEFAULT_MAX_REQUERIES
}

fn default_true() -> bool {
    true
}

/// Whole-team settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamConfig {
    #[serde(default = "default_team_name")]
    pub name: String,
    /// Default turn budget for agents that do not set their own.
    #[serde(default = "default_max_consecutive_turns")]
    pub max_consecutive_turns: u32,
    /// Hard ceiling on the global step count, retries included.
    #[serde(default)]
    pub step_budget: Option<u64>,
    /// Problem statement seeded into every history.
    #[serde(default)]
    pub task: Option<String>,
    /// Agents in rotation order.
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub max_consecutive_turns: Option<u32>,
    #[serde(default = "default_max_requeries")]
    pub max_requeries: u32,
    #[serde(default)]
    pub share_only_tool_results: bool,
    #[serde(default = "default_true")]
    pub enable_handoff_tool: bool,
    #[serde(default)]
    pub max_observation_chars: Option<usize>,
}

impl AgentConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_consecutive_turns: None,
            max_requeries: DEFAULT_MAX_REQUERIES,
            share_only_tool_results: false,
            enable_handoff_tool: true,
            max_observation_chars: None,
        }
    }
}

impl TeamConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: TeamConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        let mut seen = HashSet::new();
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { index });
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    name: agent.name.clone(),
                });
            }
            if self.turn_budget(agent) == 0 {
                return Err(ConfigError::ZeroTurnBudget {
                    name: agent.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn turn_budget(&self, agent: &AgentConfig) -> u32 {
        agent
            .max_consecutive_turns
            .unwrap_or(self.max_consecutive_turns)
    }

    /// Effective participants in rotation order.
    pub fn participants(&self) -> Vec<Participant> {
        self.agents
            .iter()
            .enumerate()
            .map(|(position, agent)| {
                Participant::new(agent.name.clone(), position, self.turn_budget(agent))
                    .with_max_requeries(agent.max_requeries)
                    .sharing_only_tool_results(agent.share_only_tool_results)
                    .with_handoff(agent.enable_handoff_tool)
                    .with_max_observation_chars(agent.max_observation_chars)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: &str = r#"
name = "pair"
step_budget = 20

[[agents]]
name = "driver"

[[agents]]
name = "navigator"
max_consecutive_turns = 1
max_requeries = 0
share_only_tool_results = true
enable_handoff_tool = false
max_observation_chars = 200
"#;

    #[test]
    fn parses_and_applies_defaults() {
        let config = TeamConfig::from_toml_str(PAIR).unwrap();
        assert_eq!(config.name, "pair");
        assert_eq!(config.step_budget, Some(20));

        let participants = config.participants();
        let driver = &participants[0];
        assert_eq!(driver.max_consecutive_turns, DEFAULT_MAX_CONSECUTIVE_TURNS);
        assert_eq!(driver.max_requeries, DEFAULT_MAX_REQUERIES);
        assert!(driver.handoff_enabled);

        let navigator = &participants[1];
        assert_eq!(navigator.position, 1);
        assert_eq!(navigator.max_consecutive_turns, 1);
        assert_eq!(navigator.max_requeries, 0);
        assert!(navigator.share_only_tool_results);
        assert!(!navigator.handoff_enabled);
        assert_eq!(navigator.max_observation_chars, Some(200));
    }

    #[test]
    fn rejects_empty_team() {
        let err = TeamConfig::from_toml_str("name = \"nobody\"").unwrap_err();
        assert!(matches!(err, ConfigError::NoAgents));
    }

    #[test]
    fn rejects_duplicate_names() {
        let toml = "[[agents]]\nname = \"a\"\n[[agents]]\nname = \"a\"\n";
        let err = TeamConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { .. }));
    }

    #[test]
    fn rejects_zero_turn_budget_from_team_default() {
        let toml = "max_consecutive_turns = 0\n[[agents]]\nname = \"a\"\n";
        let err = TeamConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTurnBudget { .. }));
    }

    #[test]
    fn rejects_unknown_fields() {
        let toml = "[[agents]]\nname = \"a\"\nmax_turns = 2\n";
        assert!(matches!(
            TeamConfig::from_toml_str(toml).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
