use anyhow::{Context, Result};
use callscreen_lookup::Principal;
use callscreen_store::{FirestoreConfig, DEFAULT_BASE_URL, DEFAULT_DATABASE};
use clap::ValueEnum;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "callscreen.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Firestore,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Stdout,
    Webhook,
    #[serde(rename = "none")]
    #[value(name = "none")]
    Disabled,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    pub fixture: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FirestoreSection {
    pub project_id: Option<String>,
    pub database: String,
    pub token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for FirestoreSection {
    fn default() -> Self {
        Self {
            project_id: None,
            database: DEFAULT_DATABASE.to_string(),
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl FirestoreSection {
    pub fn to_store_config(&self) -> Result<FirestoreConfig> {
        let project_id = self
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .context(
                "Firestore backend requires firestore.project_id (or CALLSCREEN_FIRESTORE_PROJECT)",
            )?;
        Ok(FirestoreConfig {
            project_id,
            database: self.database.clone(),
            token: self.token.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanionSection {
    pub sink: SinkKind,
    pub webhook_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub caller_dismiss_secs: u64,
    pub fallback_dismiss_secs: u64,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            caller_dismiss_secs: 45,
            fallback_dismiss_secs: 40,
        }
    }
}

impl DisplaySection {
    pub fn caller_dismiss(&self) -> Option<Duration> {
        (self.caller_dismiss_secs > 0).then(|| Duration::from_secs(self.caller_dismiss_secs))
    }

    pub fn fallback_dismiss(&self) -> Option<Duration> {
        (self.fallback_dismiss_secs > 0).then(|| Duration::from_secs(self.fallback_dismiss_secs))
    }
}

/// Layered settings: TOML file, then `CALLSCREEN_*` environment, then command-line flags.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreSection,
    pub firestore: FirestoreSection,
    pub companion: CompanionSection,
    pub display: DisplaySection,
    /// When present, lookups are checked against this user's permissions.
    pub principal: Option<Principal>,
}

impl CliConfig {
    /// Reads `path`, or `callscreen.toml` in the working directory when no path is
    /// given. A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(Into::into)
    }

    fn with_env(mut self) -> Self {
        if let Some(backend) = env_value("CALLSCREEN_STORE") {
            match StoreBackend::from_str(&backend, true) {
                Ok(parsed) => self.store.backend = parsed,
                Err(_) => log::warn!("Ignoring unknown CALLSCREEN_STORE '{backend}'"),
            }
        }
        if let Some(fixture) = env_value("CALLSCREEN_FIXTURE") {
            self.store.fixture = Some(PathBuf::from(fixture));
        }
        if let Some(project) = env_value("CALLSCREEN_FIRESTORE_PROJECT") {
            self.firestore.project_id = Some(project);
        }
        if let Some(token) = env_value("CALLSCREEN_FIRESTORE_TOKEN") {
            self.firestore.token = Some(token);
        }
        if let Some(sink) = env_value("CALLSCREEN_SINK") {
            match SinkKind::from_str(&sink, true) {
                Ok(parsed) => self.companion.sink = parsed,
                Err(_) => log::warn!("Ignoring unknown CALLSCREEN_SINK '{sink}'"),
            }
        }
        if let Some(url) = env_value("CALLSCREEN_WEBHOOK_URL") {
            self.companion.webhook_url = Some(url);
        }
        self
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
