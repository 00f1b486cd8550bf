// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Store Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - where workspace files and the audit log live
// - default and per-owner quota limits
// - seed records for the in-memory actor directory

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::actor::{Actor, ActorId, Team, TeamId, TeamKind};
use crate::domain::quota::{QuotaLimits, QuotaPolicy};
use crate::domain::workspace::WorkspaceOwner;

pub const API_VERSION: &str = "strongroom/v1";
pub const KIND: &str = "StoreConfig";
pub const CONFIG_PATH_ENV: &str = "STRONGROOM_CONFIG_PATH";
pub const STORAGE_ROOT_ENV: &str = "STRONGROOM_STORAGE_ROOT";
pub const AUDIT_LOG_ENV: &str = "STRONGROOM_AUDIT_LOG";

const DEFAULT_STORAGE_ROOT: &str = "./strongroom-data";
const DEFAULT_AUDIT_FILE: &str = "audit.jsonl";

/// Top-level store configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfigManifest {
    /// API version (must be "strongroom/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "StoreConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: StoreConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfigSpec {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub quotas: QuotaConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subtree per organization
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines audit file. Defaults to `<storage.root>/audit.jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "QuotaLimits::agent_default")]
    pub agent: QuotaLimits,

    #[serde(default = "QuotaLimits::team_default")]
    pub team: QuotaLimits,

    #[serde(default)]
    pub overrides: Vec<QuotaOverride>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            agent: QuotaLimits::agent_default(),
            team: QuotaLimits::team_default(),
            overrides: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Agent,
    Team,
}

/// Limits for one specific actor or team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaOverride {
    pub owner: OwnerKind,
    pub id: String,
    #[serde(flatten)]
    pub limits: QuotaLimits,
}

impl QuotaOverride {
    fn workspace_owner(&self) -> WorkspaceOwner {
        match self.owner {
            OwnerKind::Agent => WorkspaceOwner::Agent(ActorId::new(self.id.clone())),
            OwnerKind::Team => WorkspaceOwner::Team(TeamId::new(self.id.clone())),
        }
    }
}

/// Seed records for the in-memory directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub actors: Vec<Actor>,

    #[serde(default)]
    pub teams: Vec<Team>,
}

impl Default for StoreConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "strongroom".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: StoreConfigSpec::default(),
        }
    }
}

impl StoreConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. STRONGROOM_CONFIG_PATH environment variable
    /// 2. ./strongroom-config.yaml (working directory)
    /// 3. ~/.strongroom/config.yaml (user home)
    /// 4. /etc/strongroom/config.yaml (system, Unix) or C:\ProgramData\Strongroom\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./strongroom-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".strongroom").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/strongroom/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Strongroom\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup(STORAGE_ROOT_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}={}", STORAGE_ROOT_ENV, root);
            self.spec.storage.root = PathBuf::from(root);
        }

        if let Some(path) = lookup(AUDIT_LOG_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}={}", AUDIT_LOG_ENV, path);
            self.spec.audit.path = Some(PathBuf::from(path));
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.spec.storage.root
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.spec
            .audit
            .path
            .clone()
            .unwrap_or_else(|| self.spec.storage.root.join(DEFAULT_AUDIT_FILE))
    }

    pub fn quota_policy(&self) -> QuotaPolicy {
        let quotas = &self.spec.quotas;
        quotas.overrides.iter().fold(
            QuotaPolicy {
                agent: quotas.agent,
                team: quotas.team,
                overrides: HashMap::new(),
            },
            |policy, o| policy.with_override(o.workspace_owner(), o.limits),
        )
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.storage.root.as_os_str().is_empty() {
            anyhow::bail!("spec.storage.root cannot be empty");
        }

        let quotas = &self.spec.quotas;
        check_limits("spec.quotas.agent", &quotas.agent)?;
        check_limits("spec.quotas.team", &quotas.team)?;

        let mut seen_overrides = HashSet::new();
        for o in &quotas.overrides {
            if o.id.is_empty() {
                anyhow::bail!("Quota override id cannot be empty");
            }
            check_limits(&format!("quota override '{}'", o.id), &o.limits)?;
            if !seen_overrides.insert((o.owner, o.id.as_str())) {
                anyhow::bail!("Duplicate quota override for {:?} '{}'", o.owner, o.id);
            }
        }

        let directory = &self.spec.directory;
        let mut actor_ids = HashSet::new();
        for actor in &directory.actors {
            if actor.id.as_str().is_empty() {
                anyhow::bail!("Actor id cannot be empty");
            }
            if !actor_ids.insert(&actor.id) {
                anyhow::bail!("Duplicate actor id '{}'", actor.id);
            }
        }

        let mut team_ids = HashSet::new();
        let mut special = HashSet::new();
        for team in &directory.teams {
            if team.id.as_str().is_empty() {
                anyhow::bail!("Team id cannot be empty");
            }
            if !team_ids.insert(&team.id) {
                anyhow::bail!("Duplicate team id '{}'", team.id);
            }
            if team.kind.is_special() && !special.insert((&team.organization_id, team.kind)) {
                anyhow::bail!(
                    "Organization '{}' already has a {:?} team",
                    team.organization_id,
                    team.kind
                );
            }
        }

        Ok(())
    }

    /// Kind of the team named by `id` in the seed directory
    pub fn team_kind(&self, id: &TeamId) -> Option<TeamKind> {
        self.spec
            .directory
            .teams
            .iter()
            .find(|t| &t.id == id)
            .map(|t| t.kind)
    }
}

fn check_limits(label: &str, limits: &QuotaLimits) -> anyhow::Result<()> {
    if limits.max_files == 0 {
        anyhow::bail!("{}: maxFiles must be greater than zero", label);
    }
    if limits.max_storage_bytes == 0 {
        anyhow::bail!("{}: maxStorageBytes must be greater than zero", label);
    }
    Ok(())
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}
