//! Declarative agent description.
//!
//! An agent file names the model, its instructions, optional knowledge and
//! session storage, and the toolkits it may call. Deskhand validates it and
//! hands it, with the tool manifest, to the runtime that drives the model.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::toolkits::Toolkit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model: ModelConfig,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<KnowledgeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<SessionStorage>,
    #[serde(default = "default_true")]
    pub markdown: bool,
    #[serde(default = "default_true")]
    pub add_history_to_messages: bool,
    pub toolkits: Vec<Toolkit>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    OpenAI,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Vector,
    Keyword,
    #[default]
    Hybrid,
}

/// PDF knowledge base indexed into a vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Directory holding the source documents.
    pub path: String,
    pub vector_db_url: String,
    pub table: String,
    #[serde(default)]
    pub search_type: SearchType,
}

/// Where the runtime keeps conversation sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionStorage {
    pub table: String,
    pub db_file: String,
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read agent description {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid agent description {}", path.display()))?;
        tracing::debug!(agent = %config.name, path = %path.display(), "agent description loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("agent name must not be empty");
        }
        if self.model.id.trim().is_empty() {
            bail!("model id must not be empty");
        }
        if self.toolkits.is_empty() {
            bail!("agent must use at least one toolkit");
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.toolkits.iter().find(|t| !seen.insert(**t)) {
            bail!("toolkit `{dup}` listed twice");
        }

        if let Some(knowledge) = &self.knowledge {
            if knowledge.table.trim().is_empty() {
                bail!("knowledge table must not be empty");
            }
            if !knowledge.vector_db_url.contains("://") {
                bail!("knowledge vector_db_url `{}` is not a URL", knowledge.vector_db_url);
            }
        }

        if let Some(storage) = &self.storage
            && (storage.table.trim().is_empty() || storage.db_file.trim().is_empty())
        {
            bail!("storage table and db_file must not be empty");
        }

        Ok(())
    }
}
