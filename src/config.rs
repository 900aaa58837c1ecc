use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub commit: CommitConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Pin a tool instead of auto-detecting. Accepts a bare name or a
    /// full path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Auto-detection order when no tool is pinned.
    pub search_order: Vec<String>,
    /// Flags prepended to every invocation (e.g. "--hidden").
    pub base_flags: Vec<String>,
    /// Exit codes that count as success; unset means exactly zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_codes: Option<Vec<i32>>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            default: None,
            search_order: vec!["rg".into(), "ag".into(), "pt".into(), "ack".into()],
            base_flags: vec![],
            success_codes: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub colors: bool,
    pub emoji: bool,
    /// Shorten $HOME prefixes to ~ in result listings.
    pub abbreviate_home: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            colors: true,
            emoji: true,
            abbreviate_home: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Master persist switch. Off means every commit behaves like
    /// --dry-run: validated, reported, never written.
    pub persist: bool,
    /// fsync written files and their parent dir.
    pub durable: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            persist: true,
            durable: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = get_config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = get_config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn create_default() -> Result<PathBuf> {
        let config = Config::default();
        config.save()?;
        get_config_path()
    }
}

fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(config_dir.join("rge").join("config.toml"))
}

pub fn show_config() -> Result<()> {
    let path = get_config_path()?;
    println!("Config: {}", path.display());
    println!();

    if path.exists() {
        let config = Config::load()?;
        println!("{}", toml::to_string_pretty(&config)?);
    } else {
        println!("(default config, file not created)");
        println!();
        let config = Config::default();
        println!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}
